//! Typed views of the entities stored in a news item.
//!
//! Entities are materialized from the tree on every read and written back
//! on every mutation; nothing here is cached.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::codec::{self, ATTR_PREFIX};
use crate::dom::{NodeId, XmlDom, any_element};

/// Uuid given to authors that only have a name.
pub const NIL_UUID: &str = "00000000-0000-0000-0000-000000000000";

pub fn is_nil_uuid(uuid: &str) -> bool {
    uuid == NIL_UUID
}

/// A `link` element: tag, author, story, channel, concept, ...
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Link {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub rel: String,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub link_type: String,
    /// Decoded `data` child, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    /// Nested `links > link` children (concept relations).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

impl Link {
    pub fn new(
        uuid: impl Into<String>,
        title: impl Into<String>,
        rel: impl Into<String>,
        link_type: impl Into<String>,
    ) -> Self {
        Self {
            uuid: Some(uuid.into()),
            title: title.into(),
            rel: rel.into(),
            link_type: link_type.into(),
            ..Self::default()
        }
    }

    /// A link identified by `uri` instead of `uuid`.
    pub fn with_uri(
        uri: impl Into<String>,
        title: impl Into<String>,
        rel: impl Into<String>,
        link_type: impl Into<String>,
    ) -> Self {
        Self {
            uri: Some(uri.into()),
            title: title.into(),
            rel: rel.into(),
            link_type: link_type.into(),
            ..Self::default()
        }
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = Some(data);
        self
    }

    /// Identity key: `("uuid", value)` when a uuid is set, else `("uri", value)`.
    pub fn identity(&self) -> Option<(&'static str, &str)> {
        match (&self.uuid, &self.uri) {
            (Some(uuid), _) if !uuid.is_empty() => Some(("uuid", uuid.as_str())),
            (_, Some(uri)) if !uri.is_empty() => Some(("uri", uri.as_str())),
            _ => None,
        }
    }

    /// Materialize a link from its element.
    pub fn read(dom: &XmlDom, id: NodeId) -> Self {
        let attr = |name: &str| dom.attr(id, name).map(str::to_string);
        let data = dom.child(id, "data").map(|node| codec::decode(dom, node));
        let links = dom
            .find_all(id, &["links", "link"], any_element)
            .into_iter()
            .map(|node| Link::read(dom, node))
            .collect();

        Self {
            uuid: attr("uuid"),
            uri: attr("uri"),
            title: attr("title").unwrap_or_default(),
            rel: attr("rel").unwrap_or_default(),
            link_type: attr("type").unwrap_or_default(),
            data,
            links,
        }
    }

    /// Codec form, attributes first in `title, uuid, uri, rel, type` order.
    pub fn to_object(&self) -> Value {
        let mut map = Map::new();
        let mut attr = |name: &str, value: &str| {
            if !value.is_empty() {
                map.insert(format!("{ATTR_PREFIX}{name}"), Value::String(value.to_string()));
            }
        };
        attr("title", &self.title);
        attr("uuid", self.uuid.as_deref().unwrap_or_default());
        attr("uri", self.uri.as_deref().unwrap_or_default());
        attr("rel", &self.rel);
        attr("type", &self.link_type);

        if let Some(data) = &self.data {
            map.insert("data".to_string(), Value::Object(data.clone()));
        }
        if !self.links.is_empty() {
            let nested: Vec<Value> = self.links.iter().map(Link::to_object).collect();
            map.insert("links".to_string(), json!({ "link": nested }));
        }
        Value::Object(map)
    }

    /// Text of a `data` child, if present.
    pub fn data_text(&self, key: &str) -> Option<&str> {
        self.data.as_ref()?.get(key)?.as_str()
    }
}

/// A `service` element in `itemMeta` (channel or section).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub qcode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubconstraint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub why: Option<String>,
}

impl Service {
    pub fn read(dom: &XmlDom, id: NodeId) -> Self {
        Self {
            qcode: dom.attr(id, "qcode").unwrap_or_default().to_string(),
            name: dom.child(id, "name").map(|node| dom.text(node)),
            pubconstraint: dom.attr(id, "pubconstraint").map(str::to_string),
            why: dom.attr(id, "why").map(str::to_string),
        }
    }
}

/// Input for installing the article's section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionInput {
    pub qcode: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Product the section belongs to; stored as `pubconstraint`.
    #[serde(default)]
    pub product: Option<String>,
}

/// A `type`/`value` pair stored as `itemMetaExtProperty` or
/// `contentMetaExtProperty`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtProperty {
    #[serde(rename = "type")]
    pub property_type: String,
    pub value: String,
}

impl ExtProperty {
    pub fn read(dom: &XmlDom, id: NodeId) -> Self {
        Self {
            property_type: dom.attr(id, "type").unwrap_or_default().to_string(),
            value: dom.attr(id, "value").unwrap_or_default().to_string(),
        }
    }
}

/// Publication window; each half is an ext property.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubWindow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<ExtProperty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<ExtProperty>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubStatus {
    pub qcode: String,
}

/// An `object` element in `contentMeta > metadata`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataObject {
    pub id: String,
    #[serde(rename = "type")]
    pub object_type: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl MetadataObject {
    pub fn new(id: impl Into<String>, object_type: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            object_type: object_type.into(),
            data,
        }
    }

    pub fn read(dom: &XmlDom, id: NodeId) -> Self {
        let mut map = codec::decode(dom, id);
        let mut take = |key: &str| match map.remove(key) {
            Some(Value::String(s)) => s,
            _ => String::new(),
        };
        let object_id = take("@id");
        let object_type = take("@type");
        Self {
            id: object_id,
            object_type,
            data: map.remove("data").unwrap_or(Value::Null),
        }
    }

    pub fn to_object(&self) -> Value {
        let mut map = Map::new();
        map.insert("@id".to_string(), Value::String(self.id.clone()));
        map.insert("@type".to_string(), Value::String(self.object_type.clone()));
        if !self.data.is_null() {
            map.insert("data".to_string(), self.data.clone());
        }
        Value::Object(map)
    }
}

/// Author reference added to the byline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub uuid: String,
    pub name: String,
}

/// New details for an existing author link.
///
/// Empty fields are left out of the rebuilt `data` element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthorUpdate {
    pub name: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub facebook_url: Option<String>,
    pub twitter_url: Option<String>,
    pub short_description: Option<String>,
    pub long_description: Option<String>,
}

impl AuthorUpdate {
    /// Non-empty data fields as `(element name, text)`, in storage order.
    pub fn data_fields(&self) -> Vec<(&'static str, &str)> {
        [
            ("email", &self.email),
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("phone", &self.phone),
            ("facebookUrl", &self.facebook_url),
            ("twitterUrl", &self.twitter_url),
            ("shortDescription", &self.short_description),
            ("longDescription", &self.long_description),
        ]
        .into_iter()
        .filter_map(|(name, value)| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|v| (name, v))
        })
        .collect()
    }
}

/// Subject tag (person, organisation, topic, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub uuid: String,
    pub name: String,
    #[serde(rename = "type")]
    pub tag_type: String,
    /// Relation to store on update; `subject` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel: Option<String>,
}

impl Tag {
    pub fn new(uuid: impl Into<String>, name: impl Into<String>, tag_type: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            tag_type: tag_type.into(),
            rel: None,
        }
    }
}

/// Place, polygon or position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub uuid: String,
    pub title: String,
    #[serde(rename = "type")]
    pub location_type: String,
    /// WKT geometry, e.g. `POINT(13.0 55.6)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

/// Which locations to return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationFilter {
    #[default]
    All,
    Position,
    Polygon,
}

impl LocationFilter {
    /// Locations are either typed precisely or stored as `x-im/place` with
    /// their geometry in `data`.
    pub fn matches(&self, link: &Link) -> bool {
        let geometry = link.data_text("geometry").unwrap_or_default();
        match self {
            LocationFilter::All => true,
            LocationFilter::Polygon => {
                link.link_type == "x-im/polygon" || geometry.contains("POLYGON")
            }
            LocationFilter::Position => {
                link.link_type == "x-im/position" || geometry.starts_with("POINT")
            }
        }
    }
}

impl std::str::FromStr for LocationFilter {
    type Err = std::convert::Infallible;

    /// Anything but `position` or `polygon` means all.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "position" => LocationFilter::Position,
            "polygon" => LocationFilter::Polygon,
            _ => LocationFilter::All,
        })
    }
}

/// Story, category or content profile reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRef {
    pub uuid: String,
    pub title: String,
}

impl LinkRef {
    pub fn new(uuid: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            title: title.into(),
        }
    }
}

/// Polygon referenced from the `related-geo` link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoPolygon {
    pub uuid: String,
    pub title: String,
}

/// Language of the article body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageParts {
    /// Language subtag, e.g. `sv`.
    pub lang: Option<String>,
    /// Region subtag, e.g. `SE`.
    pub region: Option<String>,
    /// Text direction as stored in `dir`.
    pub direction: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_link_with_data_and_relations() {
        let dom = XmlDom::parse(
            r#"<link title="Malmö" uuid="c1" rel="subject" type="x-im/place">
  <data><geometry>POINT(13.0 55.6)</geometry></data>
  <links>
    <link rel="broader" title="Skåne" type="x-im/place" uuid="c2"/>
  </links>
</link>"#,
        )
        .unwrap();

        let link = Link::read(&dom, dom.document_element().unwrap());
        assert_eq!(link.identity(), Some(("uuid", "c1")));
        assert_eq!(link.data_text("geometry"), Some("POINT(13.0 55.6)"));
        assert_eq!(link.links.len(), 1);
        assert_eq!(link.links[0].rel, "broader");
        assert!(LocationFilter::Position.matches(&link));
        assert!(!LocationFilter::Polygon.matches(&link));
    }

    #[test]
    fn test_link_object_shape() {
        let link = Link::with_uri("im://article/1", "Related", "related", "x-im/article");
        assert_eq!(link.identity(), Some(("uri", "im://article/1")));
        assert_eq!(
            link.to_object(),
            json!({
                "@title": "Related",
                "@uri": "im://article/1",
                "@rel": "related",
                "@type": "x-im/article"
            })
        );
    }

    #[test]
    fn test_author_update_skips_empty_fields() {
        let update = AuthorUpdate {
            name: "Jane Doe".into(),
            email: Some("jane@example.com".into()),
            phone: Some(String::new()),
            twitter_url: Some("https://twitter.com/jane".into()),
            ..AuthorUpdate::default()
        };
        assert_eq!(
            update.data_fields(),
            vec![("email", "jane@example.com"), ("twitterUrl", "https://twitter.com/jane")]
        );

        let parsed: AuthorUpdate =
            serde_json::from_value(json!({"name": "J", "firstName": "Jane"})).unwrap();
        assert_eq!(parsed.first_name.as_deref(), Some("Jane"));
    }

    #[test]
    fn test_location_filter_from_str() {
        assert_eq!("polygon".parse::<LocationFilter>().unwrap(), LocationFilter::Polygon);
        assert_eq!("anything".parse::<LocationFilter>().unwrap(), LocationFilter::All);
    }

    #[test]
    fn test_metadata_object_round_trip_through_tree() {
        let mut dom = XmlDom::new();
        let object = MetadataObject::new("o1", "x-im/newsvalue", json!({"score": "5"}));
        let node = codec::encode(&mut dom, &object.to_object(), None, "object").unwrap();
        assert_eq!(MetadataObject::read(&dom, node), object);
    }
}
