//! Typed objects under `contentMeta > metadata`, unique per `id`.

use serde_json::Value;
use tracing::{debug, warn};

use crate::codec;
use crate::dom::{NodeId, attr_eq};
use crate::error::{Error, Result};
use crate::events::{Action, Change};
use crate::model::MetadataObject;
use crate::news_item::{MetaSection, NewsItem};

const METADATA: &str = "metadata";
const OBJECT: &str = "object";

/// Object type holding the news value (priority, lifetime, format).
pub const NEWS_VALUE_TYPE: &str = "x-im/newsvalue";

impl NewsItem<'_> {
    fn metadata_container(&self) -> Option<NodeId> {
        let content_meta = self.meta_section(MetaSection::ContentMeta)?;
        self.dom().child(content_meta, METADATA)
    }

    fn object_nodes<P>(&self, predicate: P) -> Vec<NodeId>
    where
        P: Fn(&crate::dom::XmlDom, NodeId) -> bool,
    {
        match self.metadata_container() {
            Some(container) => self.dom().find_all(container, &[OBJECT], predicate),
            None => Vec::new(),
        }
    }

    /// All content-meta objects of `object_type`, in document order.
    pub fn content_meta_objects_by_type(&self, object_type: &str) -> Vec<MetadataObject> {
        let objects: Vec<_> = self
            .object_nodes(attr_eq("type", object_type))
            .into_iter()
            .map(|node| MetadataObject::read(self.dom(), node))
            .collect();
        if objects.is_empty() {
            warn!(object_type, "content meta objects not found");
        }
        objects
    }

    pub fn content_meta_object(&self, id: &str) -> Option<MetadataObject> {
        let node = self.object_nodes(attr_eq("id", id)).into_iter().next();
        if node.is_none() {
            warn!(id, "content meta object not found");
        }
        node.map(|node| MetadataObject::read(self.dom(), node))
    }

    /// Insert `object`, replacing any object with the same id.
    pub fn set_content_meta_object(&mut self, actor: &str, object: &MetadataObject) -> Result<()> {
        self.replace_object(object, |_| false)?;
        self.emit(
            actor,
            Change::new("contentmetaobject", Action::Set, serde_json::to_value(object)?),
        )
    }

    /// Remove the object with `id`; a no-op when absent.
    pub fn remove_content_meta_object(&mut self, actor: &str, id: &str) -> Result<()> {
        let Some(node) = self.object_nodes(attr_eq("id", id)).into_iter().next() else {
            return Ok(());
        };
        self.dom_mut().detach(node);
        debug!(id, "content meta object removed");
        self.emit(
            actor,
            Change::new("contentmetaobject", Action::Delete, Value::String(id.to_string())),
        )
    }

    /// The `x-im/newsvalue` object, if any.
    pub fn news_priority(&self) -> Option<MetadataObject> {
        let node = self.object_nodes(attr_eq("type", NEWS_VALUE_TYPE)).into_iter().next();
        if node.is_none() {
            warn!("news priority not found in document");
        }
        node.map(|node| MetadataObject::read(self.dom(), node))
    }

    /// Replace the news value object. An empty type is filled in; any other
    /// type is rejected.
    pub fn set_news_priority(&mut self, actor: &str, object: &MetadataObject) -> Result<()> {
        let mut object = object.clone();
        if object.object_type.is_empty() {
            object.object_type = NEWS_VALUE_TYPE.to_string();
        } else if object.object_type != NEWS_VALUE_TYPE {
            return Err(Error::Validation(format!(
                "news priority must have type {NEWS_VALUE_TYPE}, got {}",
                object.object_type
            )));
        }

        self.replace_object(&object, |dom_type| dom_type == Some(NEWS_VALUE_TYPE))?;
        let data = serde_json::to_value(self.news_priority())?;
        self.emit(actor, Change::new("newsPriority", Action::Update, data))
    }

    /// Encode `object`, detach objects sharing its id (and any matching
    /// `also_remove` on their type), then append it under a lazily created
    /// `metadata` container.
    fn replace_object<F>(&mut self, object: &MetadataObject, also_remove: F) -> Result<()>
    where
        F: Fn(Option<&str>) -> bool,
    {
        if object.id.is_empty() {
            return Err(Error::Validation("metadata object is missing an id".into()));
        }
        if object.object_type.is_empty() {
            return Err(Error::Validation(format!(
                "metadata object {} is missing a type",
                object.id
            )));
        }

        let content_meta = self.ensure_section(MetaSection::ContentMeta)?;
        let container = self.ensure_child(content_meta, METADATA)?;
        let ns = self.dom().namespace(container).map(str::to_string);
        // Encoded detached, so a rejected payload leaves the store untouched
        let node = codec::encode(self.dom_mut(), &object.to_object(), ns.as_deref(), OBJECT)?;

        let stale: Vec<NodeId> = self.object_nodes(|dom, node| {
            dom.attr(node, "id") == Some(object.id.as_str()) || also_remove(dom.attr(node, "type"))
        });
        for node in stale {
            self.dom_mut().detach(node);
        }
        self.dom_mut().append(container, node);
        debug!(id = %object.id, object_type = %object.object_type, "content meta object stored");
        Ok(())
    }
}
