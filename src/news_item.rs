//! The [`NewsItem`] accessor.
//!
//! A `NewsItem` borrows a host-owned [`XmlDom`] and a [`ChangeSink`] for
//! the duration of a batch of reads and edits. It keeps no state of its own
//! besides [`Config`]; the tree is the only source of truth.
//!
//! Accessors are grouped by what they touch:
//!
//! | Module | Elements |
//! |---|---|
//! | `document` | root `guid`, `contentSet > inlineXML > idf` |
//! | `item_meta` | `pubStatus`, `edNote`, dates, pub window |
//! | `ext_property` | `itemMetaExtProperty`, `contentMetaExtProperty` |
//! | `metadata_object` | `contentMeta > metadata > object` |
//! | `links` | `itemMeta > links`, `contentMeta > links` |
//! | `services` | `itemMeta > service` (channels and section) |

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::config::Config;
use crate::dom::{NodeId, XmlDom};
use crate::error::{Error, Result};
use crate::events::{Change, ChangeSink};

/// One of the two metadata sections of a news item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaSection {
    ItemMeta,
    ContentMeta,
}

impl MetaSection {
    /// Element name of the section.
    pub fn element_name(self) -> &'static str {
        match self {
            MetaSection::ItemMeta => "itemMeta",
            MetaSection::ContentMeta => "contentMeta",
        }
    }

    /// Element name of ext properties stored in this section.
    pub fn ext_property_name(self) -> &'static str {
        match self {
            MetaSection::ItemMeta => "itemMetaExtProperty",
            MetaSection::ContentMeta => "contentMetaExtProperty",
        }
    }
}

impl fmt::Display for MetaSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.element_name())
    }
}

impl FromStr for MetaSection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "itemMeta" => Ok(MetaSection::ItemMeta),
            "contentMeta" => Ok(MetaSection::ContentMeta),
            other => Err(Error::Validation(format!(
                "section must be itemMeta or contentMeta, got `{other}`"
            ))),
        }
    }
}

/// Typed metadata access over a NewsML-G2 news item.
///
/// Reads take `&self` and never fail on absent data; they return `None` or
/// an empty vector. Mutations take `&mut self` plus the `actor` to attribute
/// the change to, and report each committed change to the sink before
/// returning.
///
/// ```
/// use newsitem::{Author, EventLog, NewsItem, XmlDom};
///
/// let mut dom = XmlDom::parse(r#"<newsItem xmlns="http://iptc.org/std/nar/2006-10-01/" guid="a1"><itemMeta/><contentMeta/></newsItem>"#).unwrap();
/// let mut log = EventLog::new();
///
/// let mut item = NewsItem::new(&mut dom, &mut log);
/// item.add_author("byline", &Author { uuid: "u1".into(), name: "Jane".into() }).unwrap();
/// assert_eq!(item.authors()[0].title, "Jane");
///
/// assert_eq!(log.len(), 1);
/// ```
pub struct NewsItem<'a> {
    dom: &'a mut XmlDom,
    sink: &'a mut dyn ChangeSink,
    config: Config,
}

impl<'a> NewsItem<'a> {
    pub fn new(dom: &'a mut XmlDom, sink: &'a mut dyn ChangeSink) -> Self {
        Self {
            dom,
            sink,
            config: Config::default(),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The underlying tree.
    pub fn dom(&self) -> &XmlDom {
        &*self.dom
    }

    pub(crate) fn dom_mut(&mut self) -> &mut XmlDom {
        &mut *self.dom
    }

    /// The `newsItem` element.
    pub(crate) fn root(&self) -> Result<NodeId> {
        self.dom
            .document_element()
            .ok_or_else(|| Error::MissingElement("newsItem root element".into()))
    }

    pub(crate) fn meta_section(&self, section: MetaSection) -> Option<NodeId> {
        let root = self.dom.document_element()?;
        self.dom.child(root, section.element_name())
    }

    /// The section element, created under the root if missing.
    pub(crate) fn ensure_section(&mut self, section: MetaSection) -> Result<NodeId> {
        match self.meta_section(section) {
            Some(node) => Ok(node),
            None => {
                let root = self.root()?;
                self.ensure_child(root, section.element_name())
            }
        }
    }

    /// First child named `local`, created (in the parent's namespace) if
    /// missing.
    pub(crate) fn ensure_child(&mut self, parent: NodeId, local: &str) -> Result<NodeId> {
        if let Some(existing) = self.dom.child(parent, local) {
            return Ok(existing);
        }
        let node = self
            .dom
            .create_element(parent, local)
            .ok_or_else(|| Error::MissingElement(format!("element to hold <{local}>")))?;
        self.dom.append(parent, node);
        debug!(element = local, "created container");
        Ok(node)
    }

    /// Report a committed change.
    pub(crate) fn emit(&mut self, actor: &str, change: Change) -> Result<()> {
        debug!(
            actor,
            entity = %change.entity_type,
            action = ?change.action,
            "change committed"
        );
        self.sink
            .notify(actor, &change)
            .map_err(Error::Subscriber)
    }
}
