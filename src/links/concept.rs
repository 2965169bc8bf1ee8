//! Concept links and their relation lists.
//!
//! A concept link may carry a nested `links` container listing broader and
//! associated concepts. The list is rebuilt wholesale on every update from a
//! flattened view of the concept's relation tree.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::{LINK, LINKS};
use crate::error::{Error, Result};
use crate::events::{Action, Change, NodeInfo};
use crate::news_item::NewsItem;

/// A concept as supplied by a concept search or editor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Concept {
    pub uuid: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub concept_type: String,
    /// Article-specific fields written to the link's `data` element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_data: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broader: Option<Box<RelatedConcept>>,
    /// Accepts a single object or a list.
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub associated_with: Vec<RelatedConcept>,
}

/// A concept reached through a relation; may itself have a broader one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedConcept {
    pub uuid: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub concept_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broader: Option<Box<RelatedConcept>>,
}

impl RelatedConcept {
    pub fn new(uuid: impl Into<String>, name: impl Into<String>, concept_type: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            concept_type: concept_type.into(),
            broader: None,
        }
    }

    pub fn with_broader(mut self, broader: RelatedConcept) -> Self {
        self.broader = Some(Box::new(broader));
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<RelatedConcept>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<OneOrMany<RelatedConcept>>::deserialize(deserializer)? {
        Some(OneOrMany::One(one)) => vec![one],
        Some(OneOrMany::Many(many)) => many,
        None => Vec::new(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Relation {
    Broader,
    AssociatedWith,
}

impl Relation {
    pub fn as_str(self) -> &'static str {
        match self {
            Relation::Broader => "broader",
            Relation::AssociatedWith => "associated-with",
        }
    }
}

/// One entry of a concept's flattened relation list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationLink {
    pub relation: Relation,
    pub uuid: String,
    pub title: String,
    pub link_type: String,
}

impl RelationLink {
    fn new(relation: Relation, concept: &RelatedConcept) -> Self {
        Self {
            relation,
            uuid: concept.uuid.clone(),
            title: concept.name.clone(),
            link_type: concept.concept_type.clone(),
        }
    }
}

/// Flatten a concept's relations: the broader chain first, then each
/// associated concept followed by its own broader chain.
pub fn flatten_relations(concept: &Concept) -> Vec<RelationLink> {
    let mut out = Vec::new();
    push_broader_chain(concept.broader.as_deref(), &mut out);
    for associated in &concept.associated_with {
        out.push(RelationLink::new(Relation::AssociatedWith, associated));
        push_broader_chain(associated.broader.as_deref(), &mut out);
    }
    out
}

fn push_broader_chain(mut next: Option<&RelatedConcept>, out: &mut Vec<RelationLink>) {
    while let Some(concept) = next {
        out.push(RelationLink::new(Relation::Broader, concept));
        next = concept.broader.as_deref();
    }
}

/// Falsy article data values are not written.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

impl NewsItem<'_> {
    /// Rewrite the `itemMeta` concept link with `concept.uuid`: title, data
    /// and the nested relation list.
    pub fn update_concept(&mut self, actor: &str, concept: &Concept) -> Result<()> {
        let node = self
            .item_link_by_uuid(&concept.uuid)
            .ok_or_else(|| Error::not_found("concept", format!("uuid {}", concept.uuid)))?;

        let article_data = concept.article_data.as_ref().map(|data| {
            data.iter()
                .filter(|(_, value)| !is_blank(value))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect::<Map<String, Value>>()
        });
        let data_node = self.encode_data(node, article_data.as_ref())?;

        self.dom_mut().set_attr(node, "title", concept.name.as_str());
        self.swap_data(node, data_node);

        if let Some(existing) = self.dom().child(node, LINKS) {
            self.dom_mut().detach(existing);
        }
        let relations = flatten_relations(concept);
        if !relations.is_empty() {
            let dom = self.dom_mut();
            let container = dom
                .create_element(node, LINKS)
                .ok_or_else(|| Error::MissingElement("concept link".into()))?;
            dom.append(node, container);
            for relation in &relations {
                let link = dom
                    .create_element(node, LINK)
                    .ok_or_else(|| Error::MissingElement("concept link".into()))?;
                dom.set_attr(link, "rel", relation.relation.as_str());
                dom.set_attr(link, "title", relation.title.as_str());
                dom.set_attr(link, "type", relation.link_type.as_str());
                dom.set_attr(link, "uuid", relation.uuid.as_str());
                dom.append(container, link);
            }
        }
        debug!(uuid = %concept.uuid, relations = relations.len(), "concept rewritten");

        let entity_type = if concept.concept_type.is_empty() {
            "concept"
        } else {
            concept.concept_type.as_str()
        };
        let info = NodeInfo::from_element(self.dom(), node);
        self.emit(
            actor,
            Change::new(entity_type, Action::Update, serde_json::to_value(concept)?).with_node(info),
        )
    }
}
