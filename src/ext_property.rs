//! Extension properties: `type`/`value` pairs stored as
//! `itemMetaExtProperty` / `contentMetaExtProperty` elements, unique per
//! `type` within their section.

use tracing::debug;

use crate::dom::{NodeId, attr_eq};
use crate::error::{Error, Result};
use crate::events::{Action, Change};
use crate::model::ExtProperty;
use crate::news_item::{MetaSection, NewsItem};

impl NewsItem<'_> {
    /// Value of the ext property of `property_type`.
    pub fn ext_property(&self, section: MetaSection, property_type: &str) -> Option<String> {
        let node = self.ext_property_node(section, property_type)?;
        self.dom().attr(node, "value").map(str::to_string)
    }

    /// The ext property element itself.
    pub fn ext_property_node(&self, section: MetaSection, property_type: &str) -> Option<NodeId> {
        let container = self.meta_section(section)?;
        self.dom().find_one(
            container,
            &[section.ext_property_name()],
            attr_eq("type", property_type),
        )
    }

    /// Create or update the ext property of `property_type`.
    pub fn set_ext_property(
        &mut self,
        actor: &str,
        section: MetaSection,
        property_type: &str,
        value: &str,
    ) -> Result<()> {
        let property = self.write_ext_property(section, property_type, value)?;
        self.emit(
            actor,
            Change::new(section.ext_property_name(), Action::Set, serde_json::to_value(property)?),
        )
    }

    /// Remove the ext property of `property_type`; a no-op when absent.
    pub fn delete_ext_property(
        &mut self,
        actor: &str,
        section: MetaSection,
        property_type: &str,
    ) -> Result<()> {
        if let Some(removed) = self.take_ext_property(section, property_type) {
            self.emit(
                actor,
                Change::new(section.ext_property_name(), Action::Delete, serde_json::to_value(removed)?),
            )?;
        }
        Ok(())
    }

    /// Set `type` and `value` without notifying; used by accessors that
    /// report under their own entity name.
    pub(crate) fn write_ext_property(
        &mut self,
        section: MetaSection,
        property_type: &str,
        value: &str,
    ) -> Result<ExtProperty> {
        if property_type.is_empty() {
            return Err(Error::Validation("ext property type is required".into()));
        }

        let node = match self.ext_property_node(section, property_type) {
            Some(node) => node,
            None => {
                let container = self.ensure_section(section)?;
                let dom = self.dom_mut();
                let node = dom
                    .create_element(container, section.ext_property_name())
                    .ok_or_else(|| Error::MissingElement(section.element_name().into()))?;
                dom.set_attr(node, "type", property_type);
                dom.append(container, node);
                node
            }
        };
        self.dom_mut().set_attr(node, "value", value);
        debug!(%section, property_type, value, "ext property written");

        Ok(ExtProperty {
            property_type: property_type.to_string(),
            value: value.to_string(),
        })
    }

    /// Detach the ext property without notifying; returns its last state.
    pub(crate) fn take_ext_property(
        &mut self,
        section: MetaSection,
        property_type: &str,
    ) -> Option<ExtProperty> {
        let node = self.ext_property_node(section, property_type)?;
        let snapshot = ExtProperty::read(self.dom(), node);
        self.dom_mut().detach(node);
        debug!(%section, property_type, "ext property removed");
        Some(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{XmlDom, any_element};
    use crate::events::EventLog;
    use serde_json::json;

    const DOC: &str = r#"<newsItem xmlns="http://iptc.org/std/nar/2006-10-01/">
  <itemMeta>
    <itemMetaExtProperty type="imext:uri" value="im://article/1"/>
  </itemMeta>
</newsItem>"#;

    #[test]
    fn test_set_replaces_value_in_place() {
        let mut dom = XmlDom::parse(DOC).unwrap();
        let mut log = EventLog::new();
        let mut item = NewsItem::new(&mut dom, &mut log);

        item.set_ext_property("a", MetaSection::ItemMeta, "imext:pubstart", "T1").unwrap();
        item.set_ext_property("a", MetaSection::ItemMeta, "imext:pubstart", "T2").unwrap();

        let item_meta = item.meta_section(MetaSection::ItemMeta).unwrap();
        let nodes = item.dom().find_all(
            item_meta,
            &["itemMetaExtProperty"],
            attr_eq("type", "imext:pubstart"),
        );
        assert_eq!(nodes.len(), 1);
        assert_eq!(item.ext_property(MetaSection::ItemMeta, "imext:pubstart").as_deref(), Some("T2"));
        assert_eq!(item.ext_property(MetaSection::ItemMeta, "imext:uri").as_deref(), Some("im://article/1"));

        assert_eq!(log.len(), 2);
        assert_eq!(log.events()[1].change.action, Action::Set);
        assert_eq!(log.events()[1].change.data, json!({"type": "imext:pubstart", "value": "T2"}));
    }

    #[test]
    fn test_content_meta_section_is_created_lazily() {
        let mut dom = XmlDom::parse(DOC).unwrap();
        let mut log = EventLog::new();
        let mut item = NewsItem::new(&mut dom, &mut log);

        item.set_ext_property("a", MetaSection::ContentMeta, "imext:type", "x-im/article").unwrap();
        let content_meta = item.meta_section(MetaSection::ContentMeta).unwrap();
        let props = item.dom().find_all(content_meta, &["contentMetaExtProperty"], any_element);
        assert_eq!(props.len(), 1);
        assert_eq!(item.dom().namespace(props[0]), Some("http://iptc.org/std/nar/2006-10-01/"));
    }

    #[test]
    fn test_delete_notifies_only_when_something_was_removed() {
        let mut dom = XmlDom::parse(DOC).unwrap();
        let mut log = EventLog::new();
        let mut item = NewsItem::new(&mut dom, &mut log);

        item.delete_ext_property("a", MetaSection::ItemMeta, "imext:missing").unwrap();
        item.delete_ext_property("a", MetaSection::ItemMeta, "imext:uri").unwrap();
        assert!(item.ext_property(MetaSection::ItemMeta, "imext:uri").is_none());

        assert_eq!(log.len(), 1);
        let event = &log.events()[0];
        assert_eq!(event.change.entity_type, "itemMetaExtProperty");
        assert_eq!(event.change.action, Action::Delete);
        assert_eq!(event.change.data["value"], "im://article/1");
    }

    #[test]
    fn test_empty_type_is_rejected() {
        let mut dom = XmlDom::parse(DOC).unwrap();
        let mut log = EventLog::new();
        let mut item = NewsItem::new(&mut dom, &mut log);

        let err = item.set_ext_property("a", MetaSection::ItemMeta, "", "x").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(log.is_empty());
    }
}
