//! Channel and section services.
//!
//! Both are `service` elements directly under `itemMeta`, told apart by the
//! qcode prefix (`imchn` / `imsection` by default). At most one channel
//! carries the main marker in `why`, and at most one section exists.
//! Removing a service that is not there is silently ignored.

use serde_json::json;
use tracing::{debug, warn};

use crate::dom::NodeId;
use crate::error::{Error, Result};
use crate::events::{Action, Change};
use crate::model::{SectionInput, Service};
use crate::news_item::{MetaSection, NewsItem};

const SERVICE: &str = "service";

impl NewsItem<'_> {
    fn service_nodes(&self) -> Vec<NodeId> {
        let Some(item_meta) = self.meta_section(MetaSection::ItemMeta) else {
            return Vec::new();
        };
        self.dom()
            .find_all(item_meta, &[SERVICE], |dom, node| dom.attr(node, "qcode").is_some())
    }

    fn services_with_prefix(&self, prefix: &str) -> Vec<Service> {
        let services: Vec<Service> = self
            .service_nodes()
            .into_iter()
            .map(|node| Service::read(self.dom(), node))
            .filter(|service| service.qcode.contains(prefix))
            .collect();
        if services.is_empty() {
            debug!(prefix, "no services found");
        }
        services
    }

    fn service_by_qcode(&self, qcode: &str) -> Option<NodeId> {
        self.service_nodes()
            .into_iter()
            .find(|&node| self.dom().attr(node, "qcode") == Some(qcode))
    }

    /// Append a `service` under `itemMeta` in its namespace.
    fn append_service(&mut self, service: &Service) -> Result<NodeId> {
        let item_meta = self.ensure_section(MetaSection::ItemMeta)?;
        let dom = self.dom_mut();
        let node = dom
            .create_element(item_meta, SERVICE)
            .ok_or_else(|| Error::MissingElement("itemMeta".into()))?;
        dom.set_attr(node, "qcode", service.qcode.as_str());
        if let Some(pubconstraint) = &service.pubconstraint {
            dom.set_attr(node, "pubconstraint", pubconstraint.as_str());
        }
        if let Some(why) = &service.why {
            dom.set_attr(node, "why", why.as_str());
        }
        if let Some(name) = &service.name {
            let name_node = dom
                .create_element(node, "name")
                .ok_or_else(|| Error::MissingElement(SERVICE.into()))?;
            dom.set_text(name_node, name.as_str());
            dom.append(node, name_node);
        }
        dom.append(item_meta, node);
        debug!(qcode = %service.qcode, "service appended");
        Ok(node)
    }

    /// Detach the service with `qcode` and report it under `entity_type`.
    /// Nothing happens when it is missing.
    fn remove_service(&mut self, actor: &str, entity_type: &str, qcode: &str) -> Result<()> {
        let Some(node) = self.service_by_qcode(qcode) else {
            debug!(entity_type, qcode, "service to remove not found, ignoring");
            return Ok(());
        };
        let removed = Service::read(self.dom(), node);
        self.dom_mut().detach(node);
        self.emit(
            actor,
            Change::new(entity_type, Action::Delete, serde_json::to_value(removed)?),
        )
    }

    // Channels

    pub fn channels(&self) -> Vec<Service> {
        self.services_with_prefix(&self.config().channel_qcode_prefix)
    }

    /// The channel marked as main, if any.
    pub fn main_channel(&self) -> Option<Service> {
        let marker = self.config().main_channel_marker.as_str();
        let main = self
            .service_nodes()
            .into_iter()
            .find(|&node| self.dom().attr(node, "why") == Some(marker))
            .map(|node| Service::read(self.dom(), node));
        if main.is_none() {
            warn!("no main channel on document");
        }
        main
    }

    /// Add the channel `qcode`, replacing any channel with the same qcode.
    ///
    /// With `as_main`, the main marker is moved from every other service to
    /// this one.
    pub fn add_channel(&mut self, actor: &str, qcode: &str, as_main: bool) -> Result<()> {
        if qcode.is_empty() {
            return Err(Error::Validation("channel qcode is required".into()));
        }
        if self.channels().iter().any(|channel| channel.qcode == qcode) {
            self.remove_channel(actor, qcode)?;
        }

        let marker = self.config().main_channel_marker.clone();
        let mut channel = Service {
            qcode: qcode.to_string(),
            ..Service::default()
        };
        if as_main {
            let flagged: Vec<NodeId> = self
                .service_nodes()
                .into_iter()
                .filter(|&node| self.dom().attr(node, "why") == Some(marker.as_str()))
                .collect();
            for node in flagged {
                self.dom_mut().remove_attr(node, "why");
            }
            channel.why = Some(marker);
        }
        self.append_service(&channel)?;

        self.emit(
            actor,
            Change::new("channel", Action::Add, json!({ "qcode": qcode })),
        )
    }

    pub fn remove_channel(&mut self, actor: &str, qcode: &str) -> Result<()> {
        self.remove_service(actor, "channel", qcode)
    }

    // Sections

    pub fn sections(&self) -> Vec<Service> {
        self.services_with_prefix(&self.config().section_qcode_prefix)
    }

    /// The single section, if any. More than one is an invariant violation.
    pub fn section(&self) -> Result<Option<Service>> {
        let mut sections = self.sections();
        if sections.len() > 1 {
            return Err(Error::InvariantViolation(format!(
                "only one section is allowed on an article, found {}",
                sections.len()
            )));
        }
        Ok(sections.pop())
    }

    /// Install `section` as the article's section, removing the current one
    /// first.
    pub fn update_section(&mut self, actor: &str, section: &SectionInput) -> Result<()> {
        if section.qcode.is_empty() {
            return Err(Error::Validation("section qcode is required".into()));
        }
        if let Some(current) = self.section()? {
            self.remove_section(actor, &current.qcode)?;
        }

        self.append_service(&Service {
            qcode: section.qcode.clone(),
            name: section.name.clone(),
            pubconstraint: section.product.clone(),
            why: None,
        })?;

        self.emit(
            actor,
            Change::new("section", Action::Update, serde_json::to_value(section)?),
        )
    }

    pub fn remove_section(&mut self, actor: &str, qcode: &str) -> Result<()> {
        self.remove_service(actor, "section", qcode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::XmlDom;
    use crate::events::EventLog;

    const DOC: &str = r#"<newsItem xmlns="http://iptc.org/std/nar/2006-10-01/">
  <itemMeta>
    <service qcode="imchn:web" why="imext:main"/>
    <service qcode="imchn:print"/>
    <service qcode="imsection:sport" pubconstraint="improd:daily"><name>Sport</name></service>
  </itemMeta>
</newsItem>"#;

    fn parse() -> XmlDom {
        XmlDom::parse(DOC).unwrap()
    }

    #[test]
    fn test_read_channels_and_section() {
        let mut dom = parse();
        let mut log = EventLog::new();
        let item = NewsItem::new(&mut dom, &mut log);

        let qcodes: Vec<_> = item.channels().into_iter().map(|c| c.qcode).collect();
        assert_eq!(qcodes, vec!["imchn:web", "imchn:print"]);
        assert_eq!(item.main_channel().unwrap().qcode, "imchn:web");

        let section = item.section().unwrap().unwrap();
        assert_eq!(section.name.as_deref(), Some("Sport"));
        assert_eq!(section.pubconstraint.as_deref(), Some("improd:daily"));
    }

    #[test]
    fn test_main_channel_is_exclusive() {
        let mut dom = parse();
        let mut log = EventLog::new();
        let mut item = NewsItem::new(&mut dom, &mut log);

        item.add_channel("a", "imchn:x", true).unwrap();
        item.add_channel("a", "imchn:y", true).unwrap();

        assert_eq!(item.main_channel().unwrap().qcode, "imchn:y");
        let flagged: Vec<_> = item
            .channels()
            .into_iter()
            .filter(|c| c.why.is_some())
            .collect();
        assert_eq!(flagged.len(), 1);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_re_adding_a_channel_replaces_it() {
        let mut dom = parse();
        let mut log = EventLog::new();
        let mut item = NewsItem::new(&mut dom, &mut log);

        item.add_channel("a", "imchn:print", true).unwrap();
        let qcodes: Vec<_> = item.channels().into_iter().map(|c| c.qcode).collect();
        assert_eq!(qcodes, vec!["imchn:web", "imchn:print"]);
        assert_eq!(item.main_channel().unwrap().qcode, "imchn:print");

        let actions: Vec<_> = log.events().iter().map(|e| e.change.action).collect();
        assert_eq!(actions, vec![Action::Delete, Action::Add]);
    }

    #[test]
    fn test_missing_service_removal_is_silent() {
        let mut dom = parse();
        let mut log = EventLog::new();
        let mut item = NewsItem::new(&mut dom, &mut log);

        item.remove_channel("a", "imchn:missing").unwrap();
        item.remove_section("a", "imsection:missing").unwrap();
        item.remove_channel("a", "imchn:print").unwrap();

        assert_eq!(item.channels().len(), 1);
        assert_eq!(log.len(), 1);
        assert_eq!(log.events()[0].change.data["qcode"], "imchn:print");
    }

    #[test]
    fn test_update_section_replaces_current() {
        let mut dom = parse();
        let mut log = EventLog::new();
        let mut item = NewsItem::new(&mut dom, &mut log);

        let section = SectionInput {
            qcode: "imsection:culture".into(),
            name: Some("Culture".into()),
            product: None,
        };
        item.update_section("a", &section).unwrap();

        let sections = item.sections();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].qcode, "imsection:culture");
        assert!(sections[0].pubconstraint.is_none());

        let empty = SectionInput::default();
        assert!(matches!(item.update_section("a", &empty), Err(Error::Validation(_))));

        let kinds: Vec<_> = log
            .events()
            .iter()
            .map(|e| (e.change.entity_type.as_str(), e.change.action))
            .collect();
        assert_eq!(kinds, vec![("section", Action::Delete), ("section", Action::Update)]);
    }

    #[test]
    fn test_two_sections_are_an_invariant_violation() {
        let mut dom = XmlDom::parse(
            r#"<newsItem><itemMeta>
  <service qcode="imsection:a"/>
  <service qcode="imsection:b"/>
</itemMeta></newsItem>"#,
        )
        .unwrap();
        let mut log = EventLog::new();
        let mut item = NewsItem::new(&mut dom, &mut log);

        assert!(matches!(item.section(), Err(Error::InvariantViolation(_))));
        let section = SectionInput {
            qcode: "imsection:c".into(),
            ..SectionInput::default()
        };
        assert!(matches!(
            item.update_section("a", &section),
            Err(Error::InvariantViolation(_))
        ));
        assert!(log.is_empty());
    }
}
