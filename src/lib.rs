//! # newsitem
//!
//! Typed metadata access for NewsML-G2 news items.
//!
//! A news item is an XML document whose `itemMeta` and `contentMeta`
//! sections hold the article's metadata: links (authors, tags, channels,
//! locations, stories, concepts, ...), extension properties, publication
//! status and window, and typed metadata objects. This crate treats the tree
//! as the store: every read materializes entities from it, every mutation
//! edits it in place and then reports the change to a [`ChangeSink`].
//!
//! ## Quick Start
//!
//! ```
//! use newsitem::{EventLog, NewsItem, Tag, XmlDom};
//!
//! let mut dom = XmlDom::parse(
//!     r#"<newsItem xmlns="http://iptc.org/std/nar/2006-10-01/" guid="a1"><itemMeta/></newsItem>"#,
//! )?;
//! let mut log = EventLog::new();
//! let mut item = NewsItem::new(&mut dom, &mut log);
//!
//! item.add_tag("tagger", &Tag::new("u1", "Olof Palme", "x-im/person"))?;
//! item.add_channel("tagger", "imchn:web", true)?;
//! assert_eq!(item.tags(&["x-im/person"]).len(), 1);
//! assert_eq!(item.main_channel().map(|c| c.qcode).as_deref(), Some("imchn:web"));
//!
//! assert_eq!(log.len(), 2);
//! # Ok::<(), newsitem::Error>(())
//! ```
//!
//! ## Reading a document from disk
//!
//! ```no_run
//! use newsitem::{NewsItem, NullSink, XmlDom};
//!
//! let bytes = std::fs::read("article.xml")?;
//! let mut dom = XmlDom::parse_bytes(&bytes)?;
//! let mut sink = NullSink;
//! let item = NewsItem::new(&mut dom, &mut sink);
//! println!("{:?}", item.guid());
//! # Ok::<(), newsitem::Error>(())
//! ```

pub mod codec;
pub mod config;
pub mod dom;
pub mod error;
pub mod events;
pub mod links;
pub mod model;
pub(crate) mod util;

mod document;
mod ext_property;
mod item_meta;
mod metadata_object;
mod news_item;
mod services;

pub use config::Config;
pub use document::LocaleResolver;
pub use dom::{NodeId, XmlDom};
pub use error::{Error, Result};
pub use events::{Action, Change, ChangeEvent, ChangeSink, EventLog, NodeInfo, NullSink, SinkError};
pub use links::{Concept, RelatedConcept, Relation, RelationLink, flatten_relations};
pub use metadata_object::NEWS_VALUE_TYPE;
pub use model::{
    Author, AuthorUpdate, ExtProperty, GeoPolygon, LanguageParts, Link, LinkRef, Location,
    LocationFilter, MetadataObject, NIL_UUID, PubStatus, PubWindow, SectionInput, Service, Tag,
};
pub use news_item::{MetaSection, NewsItem};
