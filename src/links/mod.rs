//! Link registry.
//!
//! Every link-shaped entity (authors, tags, locations, stories, concepts,
//! categories, content profiles, channel links) lives as a `link` element in
//! the `links` container of `itemMeta` or `contentMeta`. This module holds
//! the shared primitives and the generic link operations; the per-kind
//! wrappers are in `kinds` and concept relations in `concept`.
//!
//! Identity is `uuid` when present, else `uri`. Adds are idempotent on
//! identity (plus `rel` for generic links). Removal of a missing target
//! fails loudly here; service removal in [`crate::services`] does not.

mod concept;
mod kinds;

pub use concept::{Concept, Relation, RelatedConcept, RelationLink, flatten_relations};

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::codec;
use crate::dom::{NodeId, XmlDom, attr_eq, attr_in};
use crate::error::{Error, Result};
use crate::events::{Action, Change, NodeInfo};
use crate::model::Link;
use crate::news_item::{MetaSection, NewsItem};

pub(crate) const LINKS: &str = "links";
pub(crate) const LINK: &str = "link";
pub(crate) const DATA: &str = "data";

impl NewsItem<'_> {
    /// Link elements of `section` matching `predicate`, in document order.
    pub(crate) fn link_nodes<P>(&self, section: MetaSection, predicate: P) -> Vec<NodeId>
    where
        P: Fn(&XmlDom, NodeId) -> bool,
    {
        match self.meta_section(section) {
            Some(container) => self.dom().find_all(container, &[LINKS, LINK], predicate),
            None => Vec::new(),
        }
    }

    pub(crate) fn link_node<P>(&self, section: MetaSection, predicate: P) -> Option<NodeId>
    where
        P: Fn(&XmlDom, NodeId) -> bool,
    {
        let container = self.meta_section(section)?;
        self.dom().find_one(container, &[LINKS, LINK], predicate)
    }

    pub(crate) fn read_links<P>(&self, section: MetaSection, predicate: P) -> Vec<Link>
    where
        P: Fn(&XmlDom, NodeId) -> bool,
    {
        self.link_nodes(section, predicate)
            .into_iter()
            .map(|node| Link::read(self.dom(), node))
            .collect()
    }

    /// `itemMeta` link with `uuid`, whatever its type.
    pub(crate) fn item_link_by_uuid(&self, uuid: &str) -> Option<NodeId> {
        self.link_node(MetaSection::ItemMeta, attr_eq("uuid", uuid))
    }

    /// The section's `links` container, created in the section's namespace
    /// if missing.
    pub(crate) fn ensure_links(&mut self, section: MetaSection) -> Result<NodeId> {
        let container = self.ensure_section(section)?;
        self.ensure_child(container, LINKS)
    }

    /// Encode `link` and append it as the last link of `section`.
    pub(crate) fn insert_link(&mut self, section: MetaSection, link: &Link) -> Result<NodeId> {
        let links = self.ensure_links(section)?;
        let ns = self.dom().namespace(links).map(str::to_string);
        let node = codec::encode(self.dom_mut(), &link.to_object(), ns.as_deref(), LINK)?;
        self.dom_mut().append(links, node);
        debug!(%section, link_type = %link.link_type, rel = %link.rel, "link inserted");
        Ok(node)
    }

    /// Build a detached `data` element for `link` from a non-empty payload.
    ///
    /// Nothing is attached, so a rejected payload leaves the link as it was.
    pub(crate) fn encode_data(
        &mut self,
        link: NodeId,
        data: Option<&Map<String, Value>>,
    ) -> Result<Option<NodeId>> {
        let Some(data) = data.filter(|d| !d.is_empty()) else {
            return Ok(None);
        };
        let ns = self.dom().namespace(link).map(str::to_string);
        let node = codec::encode(self.dom_mut(), &Value::Object(data.clone()), ns.as_deref(), DATA)?;
        Ok(Some(node))
    }

    /// Swap the link's `data` child for `data_node`. Old and new fields are
    /// never merged.
    pub(crate) fn swap_data(&mut self, link: NodeId, data_node: Option<NodeId>) {
        if let Some(existing) = self.dom().child(link, DATA) {
            self.dom_mut().detach(existing);
        }
        if let Some(data_node) = data_node {
            self.dom_mut().append(link, data_node);
        }
    }

    /// Detach a link, returning its identity snapshot.
    pub(crate) fn detach_link(&mut self, node: NodeId) -> NodeInfo {
        let info = NodeInfo::from_element(self.dom(), node);
        self.dom_mut().detach(node);
        debug!(uuid = ?info.uuid, link_type = ?info.node_type, "link removed");
        info
    }

    /// Add a link to `itemMeta`.
    ///
    /// A no-op when a link with the same identity and `rel` already exists.
    pub fn add_link(&mut self, actor: &str, link: &Link) -> Result<()> {
        self.add_generic_link(actor, MetaSection::ItemMeta, link)
    }

    /// Add a link to `contentMeta`, with the same idempotency as
    /// [`add_link`](Self::add_link).
    pub fn add_content_meta_link(&mut self, actor: &str, link: &Link) -> Result<()> {
        self.add_generic_link(actor, MetaSection::ContentMeta, link)
    }

    fn add_generic_link(&mut self, actor: &str, section: MetaSection, link: &Link) -> Result<()> {
        if let Some((key, value)) = link.identity() {
            let exists = self
                .link_node(section, |dom, node| {
                    dom.attr(node, key) == Some(value) && dom.attr(node, "rel") == Some(link.rel.as_str())
                })
                .is_some();
            if exists {
                info!(%section, key, value, rel = %link.rel, "link already exists");
                return Ok(());
            }
        }

        let node = self.insert_link(section, link)?;
        let info = NodeInfo::from_element(self.dom(), node);
        self.emit(
            actor,
            Change::new("link", Action::Add, serde_json::to_value(link)?).with_node(info),
        )
    }

    /// Update the link in `section` with `link`'s identity: `title`, `rel`
    /// and `type` are overwritten when non-empty and `data` is rebuilt when
    /// given.
    pub fn update_link(&mut self, actor: &str, section: MetaSection, link: &Link) -> Result<()> {
        let (key, value) = link
            .identity()
            .ok_or_else(|| Error::Validation("link needs a uuid or uri to be updated".into()))?;
        let node = self
            .link_node(section, attr_eq(key, value))
            .ok_or_else(|| Error::not_found("link", format!("{key} {value}")))?;

        let data_node = match &link.data {
            Some(data) => Some(self.encode_data(node, Some(data))?),
            None => None,
        };

        let dom = self.dom_mut();
        for (name, attr_value) in [("title", &link.title), ("rel", &link.rel), ("type", &link.link_type)] {
            if !attr_value.is_empty() {
                dom.set_attr(node, name, attr_value.as_str());
            }
        }
        if let Some(data_node) = data_node {
            self.swap_data(node, data_node);
        }

        let info = NodeInfo::from_element(self.dom(), node);
        self.emit(
            actor,
            Change::new("link", Action::Update, serde_json::to_value(link)?).with_node(info),
        )
    }

    /// Change the `rel` of the `itemMeta` link with `link.uuid`.
    pub fn update_link_rel(&mut self, actor: &str, link: &Link) -> Result<()> {
        let uuid = link.uuid.as_deref().unwrap_or_default();
        let node = self
            .item_link_by_uuid(uuid)
            .ok_or_else(|| Error::not_found("link", format!("uuid {uuid}")))?;
        self.dom_mut().set_attr(node, "rel", link.rel.as_str());
        self.emit(
            actor,
            Change::new(link.link_type.as_str(), Action::Update, serde_json::to_value(link)?),
        )
    }

    /// `itemMeta` links of any of `types` with relation `rel` (`subject`
    /// when `None`), in document order.
    pub fn links_by_type(&self, types: &[&str], rel: Option<&str>) -> Vec<Link> {
        let rel = rel.unwrap_or("subject");
        let of_type = attr_in("type", types);
        self.read_links(MetaSection::ItemMeta, |dom, node| {
            dom.attr(node, "rel") == Some(rel) && of_type(dom, node)
        })
    }

    pub fn link_by_type_and_rel(&self, link_type: &str, rel: &str) -> Vec<Link> {
        self.read_links(MetaSection::ItemMeta, |dom, node| {
            dom.attr(node, "type") == Some(link_type) && dom.attr(node, "rel") == Some(rel)
        })
    }

    /// All links of `link_type` in `section`, whatever their relation.
    pub fn links_of_type(&self, section: MetaSection, link_type: &str) -> Vec<Link> {
        self.read_links(section, attr_eq("type", link_type))
    }

    pub fn remove_link_by_uuid(&mut self, actor: &str, uuid: &str) -> Result<()> {
        let node = self
            .item_link_by_uuid(uuid)
            .ok_or_else(|| Error::not_found("link", format!("uuid {uuid}")))?;
        let info = self.detach_link(node);
        self.emit(
            actor,
            Change::new("tag", Action::Delete, Value::String(uuid.to_string())).with_node(info),
        )
    }

    pub fn remove_link_by_uri(&mut self, actor: &str, uri: &str) -> Result<()> {
        let node = self
            .link_node(MetaSection::ItemMeta, attr_eq("uri", uri))
            .ok_or_else(|| Error::not_found("link", format!("uri {uri}")))?;
        let info = self.detach_link(node);
        self.emit(
            actor,
            Change::new("link", Action::Delete, Value::String(uri.to_string())).with_node(info),
        )
    }

    pub fn remove_link_by_uuid_and_rel(&mut self, actor: &str, uuid: &str, rel: &str) -> Result<()> {
        let node = self
            .link_node(MetaSection::ItemMeta, |dom, node| {
                dom.attr(node, "uuid") == Some(uuid) && dom.attr(node, "rel") == Some(rel)
            })
            .ok_or_else(|| Error::not_found("link", format!("uuid {uuid} and rel {rel}")))?;
        let info = self.detach_link(node);
        self.emit(
            actor,
            Change::new("link", Action::Delete, Value::String(rel.to_string())).with_node(info),
        )
    }

    /// Remove every `itemMeta` link of `link_type`, reporting each removal
    /// in document order. Fails when nothing matched.
    pub fn remove_all_links_by_type(&mut self, actor: &str, link_type: &str) -> Result<()> {
        let nodes = self.link_nodes(MetaSection::ItemMeta, attr_eq("type", link_type));
        if nodes.is_empty() {
            return Err(Error::not_found("link", format!("type {link_type}")));
        }
        let removed: Vec<NodeInfo> = nodes.into_iter().map(|node| self.detach_link(node)).collect();
        for info in removed {
            self.emit(
                actor,
                Change::new("link", Action::DeleteAll, Value::String(link_type.to_string()))
                    .with_node(info),
            )?;
        }
        Ok(())
    }

    /// Remove every `contentMeta` link with `link_type` and `rel`. Fails
    /// when nothing matched.
    pub fn remove_content_meta_links_by_type_and_rel(
        &mut self,
        actor: &str,
        link_type: &str,
        rel: &str,
    ) -> Result<()> {
        let nodes = self.link_nodes(MetaSection::ContentMeta, |dom, node| {
            dom.attr(node, "type") == Some(link_type) && dom.attr(node, "rel") == Some(rel)
        });
        if nodes.is_empty() {
            return Err(Error::not_found(
                "link",
                format!("type {link_type} and rel {rel}"),
            ));
        }
        let removed: Vec<NodeInfo> = nodes.into_iter().map(|node| self.detach_link(node)).collect();
        for info in removed {
            self.emit(
                actor,
                Change::new("link", Action::Delete, Value::String(rel.to_string())).with_node(info),
            )?;
        }
        Ok(())
    }

    /// Remove the `contentMeta` links of `link_type` accepted by `filter`.
    /// Matching nothing is not an error.
    pub fn remove_content_meta_links_matching<F>(
        &mut self,
        actor: &str,
        link_type: &str,
        filter: F,
    ) -> Result<()>
    where
        F: Fn(&Link) -> bool,
    {
        let nodes: Vec<NodeId> = self
            .link_nodes(MetaSection::ContentMeta, attr_eq("type", link_type))
            .into_iter()
            .filter(|&node| filter(&Link::read(self.dom(), node)))
            .collect();
        let removed: Vec<NodeInfo> = nodes.into_iter().map(|node| self.detach_link(node)).collect();
        for info in removed {
            self.emit(
                actor,
                Change::new("link", Action::Delete, Value::String(link_type.to_string()))
                    .with_node(info),
            )?;
        }
        Ok(())
    }
}
