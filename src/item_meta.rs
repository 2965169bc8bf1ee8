//! Administrative metadata in `itemMeta`: publication status and window,
//! editorial note, timestamps and a few well-known ext properties.

use serde_json::{Value, json};
use tracing::debug;

use crate::error::{Error, Result};
use crate::events::{Action, Change};
use crate::model::{ExtProperty, PubStatus, PubWindow};
use crate::news_item::{MetaSection, NewsItem};

const PUB_STATUS: &str = "pubStatus";
const ED_NOTE: &str = "edNote";

const PUB_START_TYPE: &str = "imext:pubstart";
const PUB_STOP_TYPE: &str = "imext:pubstop";
const HAS_PUBLISHED_VERSION_TYPE: &str = "imext:haspublishedversion";
const DOCUMENT_URI_TYPE: &str = "imext:uri";
const NEWSPILOT_ID_TYPE: &str = "npext:articleid";

/// Which half of the publication window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PubBound {
    Start,
    Stop,
}

impl PubBound {
    fn property_type(self) -> &'static str {
        match self {
            PubBound::Start => PUB_START_TYPE,
            PubBound::Stop => PUB_STOP_TYPE,
        }
    }

    fn entity_type(self) -> &'static str {
        match self {
            PubBound::Start => "pubStart",
            PubBound::Stop => "pubStop",
        }
    }
}

impl NewsItem<'_> {
    fn item_meta_text(&self, section: MetaSection, local: &str) -> Option<String> {
        let container = self.meta_section(section)?;
        let node = self.dom().child(container, local)?;
        Some(self.dom().text(node))
    }

    fn item_ext_property(&self, property_type: &str) -> Option<ExtProperty> {
        let node = self.ext_property_node(MetaSection::ItemMeta, property_type)?;
        Some(ExtProperty::read(self.dom(), node))
    }

    // Publication status

    pub fn pub_status(&self) -> Option<PubStatus> {
        let item_meta = self.meta_section(MetaSection::ItemMeta)?;
        let node = self.dom().child(item_meta, PUB_STATUS)?;
        Some(PubStatus {
            qcode: self.dom().attr(node, "qcode").unwrap_or_default().to_string(),
        })
    }

    /// Set the `pubStatus` qcode, creating the element if needed.
    pub fn set_pub_status(&mut self, actor: &str, qcode: &str) -> Result<()> {
        if qcode.is_empty() {
            return Err(Error::Validation("pubStatus qcode is required".into()));
        }
        let item_meta = self.ensure_section(MetaSection::ItemMeta)?;
        let node = self.ensure_child(item_meta, PUB_STATUS)?;
        self.dom_mut().set_attr(node, "qcode", qcode);

        let status = PubStatus {
            qcode: qcode.to_string(),
        };
        self.emit(
            actor,
            Change::new(PUB_STATUS, Action::Set, serde_json::to_value(status)?),
        )
    }

    // Publication window

    pub fn pub_start(&self) -> Option<ExtProperty> {
        self.item_ext_property(PUB_START_TYPE)
    }

    pub fn pub_stop(&self) -> Option<ExtProperty> {
        self.item_ext_property(PUB_STOP_TYPE)
    }

    pub fn pub_window(&self) -> PubWindow {
        PubWindow {
            start: self.pub_start(),
            stop: self.pub_stop(),
        }
    }

    pub fn set_pub_start(&mut self, actor: &str, value: &str) -> Result<()> {
        self.set_pub_bound(actor, PubBound::Start, value)
    }

    pub fn set_pub_stop(&mut self, actor: &str, value: &str) -> Result<()> {
        self.set_pub_bound(actor, PubBound::Stop, value)
    }

    /// Remove the start of the window. Only notifies when it was set.
    pub fn remove_pub_start(&mut self, actor: &str) -> Result<()> {
        self.remove_pub_bound(actor, PubBound::Start)
    }

    /// Remove the end of the window. Only notifies when it was set.
    pub fn remove_pub_stop(&mut self, actor: &str) -> Result<()> {
        self.remove_pub_bound(actor, PubBound::Stop)
    }

    fn set_pub_bound(&mut self, actor: &str, bound: PubBound, value: &str) -> Result<()> {
        let property = self.write_ext_property(MetaSection::ItemMeta, bound.property_type(), value)?;
        self.emit(
            actor,
            Change::new(bound.entity_type(), Action::Set, serde_json::to_value(property)?),
        )
    }

    fn remove_pub_bound(&mut self, actor: &str, bound: PubBound) -> Result<()> {
        match self.take_ext_property(MetaSection::ItemMeta, bound.property_type()) {
            Some(removed) => self.emit(
                actor,
                Change::new(bound.entity_type(), Action::Delete, serde_json::to_value(removed)?),
            ),
            None => Ok(()),
        }
    }

    // Editorial note

    /// Text of `edNote`; empty when there is none.
    pub fn ed_note(&self) -> String {
        self.item_meta_text(MetaSection::ItemMeta, ED_NOTE)
            .unwrap_or_default()
    }

    /// Set the editorial note. `None` or an empty string removes it.
    pub fn set_ed_note(&mut self, actor: &str, content: Option<&str>) -> Result<()> {
        let existing = self
            .meta_section(MetaSection::ItemMeta)
            .and_then(|item_meta| self.dom().child(item_meta, ED_NOTE));

        let Some(content) = content.filter(|c| !c.is_empty()) else {
            if let Some(node) = existing {
                self.dom_mut().detach(node);
                debug!("edNote removed");
                self.emit(actor, Change::new(ED_NOTE, Action::Delete, Value::Null))?;
            }
            return Ok(());
        };

        let item_meta = self.ensure_section(MetaSection::ItemMeta)?;
        let node = self.ensure_child(item_meta, ED_NOTE)?;
        self.dom_mut().set_text(node, content);
        self.emit(
            actor,
            Change::new(ED_NOTE, Action::Set, Value::String(content.to_string())),
        )
    }

    // Timestamps, as stored

    pub fn version_created(&self) -> Option<String> {
        self.item_meta_text(MetaSection::ItemMeta, "versionCreated")
    }

    pub fn first_created(&self) -> Option<String> {
        self.item_meta_text(MetaSection::ItemMeta, "firstCreated")
    }

    pub fn content_created(&self) -> Option<String> {
        self.item_meta_text(MetaSection::ContentMeta, "contentCreated")
    }

    pub fn content_modified(&self) -> Option<String> {
        self.item_meta_text(MetaSection::ContentMeta, "contentModified")
    }

    // Well-known ext properties

    /// Article id in Newspilot, if the article came from there.
    pub fn newspilot_article_id(&self) -> Option<String> {
        self.ext_property(MetaSection::ItemMeta, NEWSPILOT_ID_TYPE)
    }

    pub fn has_published_version(&self) -> bool {
        self.ext_property(MetaSection::ItemMeta, HAS_PUBLISHED_VERSION_TYPE)
            .is_some_and(|value| value == "true")
    }

    pub fn set_has_published_version(&mut self, actor: &str, value: bool) -> Result<()> {
        self.write_ext_property(
            MetaSection::ItemMeta,
            HAS_PUBLISHED_VERSION_TYPE,
            if value { "true" } else { "false" },
        )?;
        self.emit(
            actor,
            Change::new("hasPublishedVersion", Action::Set, Value::Bool(value)),
        )
    }

    /// Drop the `imext:uri` property, e.g. before saving a copy as a new
    /// article.
    pub fn remove_document_uri(&mut self, actor: &str) -> Result<()> {
        match self.take_ext_property(MetaSection::ItemMeta, DOCUMENT_URI_TYPE) {
            Some(removed) => self.emit(
                actor,
                Change::new("documentUri", Action::Delete, json!({ "uri": removed.value })),
            ),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::XmlDom;
    use crate::events::EventLog;

    const DOC: &str = r#"<newsItem xmlns="http://iptc.org/std/nar/2006-10-01/" guid="a1">
  <itemMeta>
    <versionCreated>2016-03-03T16:09:55+01:00</versionCreated>
    <firstCreated>2016-03-03T16:09:55+01:00</firstCreated>
    <pubStatus qcode="imext:draft"/>
    <edNote>Check the quotes</edNote>
    <itemMetaExtProperty type="imext:uri" value="im://article/a1"/>
    <itemMetaExtProperty type="npext:articleid" value="4711"/>
    <itemMetaExtProperty type="imext:pubstart" value="2016-03-04T06:00:00+01:00"/>
  </itemMeta>
  <contentMeta>
    <contentCreated>2016-03-03T16:00:00+01:00</contentCreated>
  </contentMeta>
</newsItem>"#;

    fn parse() -> XmlDom {
        XmlDom::parse(DOC).unwrap()
    }

    #[test]
    fn test_reads() {
        let mut dom = parse();
        let mut log = EventLog::new();
        let item = NewsItem::new(&mut dom, &mut log);

        assert_eq!(item.pub_status().unwrap().qcode, "imext:draft");
        assert_eq!(item.ed_note(), "Check the quotes");
        assert_eq!(item.first_created().as_deref(), Some("2016-03-03T16:09:55+01:00"));
        assert_eq!(item.content_created().as_deref(), Some("2016-03-03T16:00:00+01:00"));
        assert!(item.content_modified().is_none());
        assert_eq!(item.newspilot_article_id().as_deref(), Some("4711"));
        assert!(!item.has_published_version());

        let window = item.pub_window();
        assert_eq!(window.start.unwrap().value, "2016-03-04T06:00:00+01:00");
        assert!(window.stop.is_none());
    }

    #[test]
    fn test_set_pub_status() {
        let mut dom = parse();
        let mut log = EventLog::new();
        let mut item = NewsItem::new(&mut dom, &mut log);

        item.set_pub_status("a", "stat:usable").unwrap();
        assert_eq!(item.pub_status().unwrap().qcode, "stat:usable");
        assert!(matches!(item.set_pub_status("a", ""), Err(Error::Validation(_))));

        assert_eq!(log.len(), 1);
        assert_eq!(log.events()[0].change.data, json!({"qcode": "stat:usable"}));
    }

    #[test]
    fn test_pub_window_round_trip() {
        let mut dom = parse();
        let mut log = EventLog::new();
        let mut item = NewsItem::new(&mut dom, &mut log);

        item.set_pub_stop("a", "2016-03-10T00:00:00+01:00").unwrap();
        item.set_pub_start("a", "2016-03-05T06:00:00+01:00").unwrap();
        item.remove_pub_start("a").unwrap();
        item.remove_pub_start("a").unwrap();

        let window = item.pub_window();
        assert!(window.start.is_none());
        assert_eq!(window.stop.unwrap().property_type, PUB_STOP_TYPE);

        let events: Vec<_> = log
            .events()
            .iter()
            .map(|e| (e.change.entity_type.as_str(), e.change.action))
            .collect();
        assert_eq!(
            events,
            vec![
                ("pubStop", Action::Set),
                ("pubStart", Action::Set),
                ("pubStart", Action::Delete),
            ]
        );
    }

    #[test]
    fn test_ed_note() {
        let mut dom = parse();
        let mut log = EventLog::new();
        let mut item = NewsItem::new(&mut dom, &mut log);

        item.set_ed_note("a", Some("Updated note")).unwrap();
        assert_eq!(item.ed_note(), "Updated note");

        item.set_ed_note("a", Some("")).unwrap();
        assert_eq!(item.ed_note(), "");
        item.set_ed_note("a", None).unwrap();

        assert_eq!(log.len(), 2);
        assert_eq!(log.events()[1].change.action, Action::Delete);
    }

    #[test]
    fn test_has_published_version_and_document_uri() {
        let mut dom = parse();
        let mut log = EventLog::new();
        let mut item = NewsItem::new(&mut dom, &mut log);

        item.set_has_published_version("a", true).unwrap();
        assert!(item.has_published_version());
        item.set_has_published_version("a", false).unwrap();
        assert!(!item.has_published_version());

        item.remove_document_uri("a").unwrap();
        item.remove_document_uri("a").unwrap();
        assert!(item.ext_property(MetaSection::ItemMeta, DOCUMENT_URI_TYPE).is_none());

        assert_eq!(log.len(), 3);
        assert_eq!(log.events()[2].change.data, json!({"uri": "im://article/a1"}));
    }
}
