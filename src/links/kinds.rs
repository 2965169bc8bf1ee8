//! Per-kind link wrappers: authors, tags, locations, stories, categories,
//! content profiles and the few read-only kinds.

use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::info;

use super::{DATA, LINKS, LINK};
use crate::dom::{attr_contains, attr_eq, attr_in};
use crate::error::{Error, Result};
use crate::events::{Action, Change, NodeInfo};
use crate::model::{
    Author, AuthorUpdate, GeoPolygon, Link, LinkRef, Location, LocationFilter, NIL_UUID, Tag,
    is_nil_uuid,
};
use crate::news_item::{MetaSection, NewsItem};

const AUTHOR_TYPE: &str = "x-im/author";
const STORY_TYPE: &str = "x-im/story";
const CATEGORY_TYPE: &str = "x-im/category";
const CONTENT_PROFILE_TYPE: &str = "x-im/content-profile";
const CONCEPT_SECTION_TYPE: &str = "x-im/section";
const CHANNEL_TYPE: &str = "x-im/channel";
const RELATED_GEO_REL: &str = "related-geo";

impl NewsItem<'_> {
    fn item_links_of_type(&self, link_type: &str) -> Vec<Link> {
        self.links_of_type(MetaSection::ItemMeta, link_type)
    }

    /// Insert `link` into `itemMeta` unless a link with its uuid exists.
    fn add_unique_link<T: Serialize>(
        &mut self,
        actor: &str,
        entity_type: &str,
        link: &Link,
        payload: &T,
    ) -> Result<()> {
        let uuid = link.uuid.as_deref().unwrap_or_default();
        if self.item_link_by_uuid(uuid).is_some() {
            info!(entity_type, uuid, "link with uuid already exists");
            return Ok(());
        }
        let node = self.insert_link(MetaSection::ItemMeta, link)?;
        let info = NodeInfo::from_element(self.dom(), node);
        self.emit(
            actor,
            Change::new(entity_type, Action::Add, serde_json::to_value(payload)?).with_node(info),
        )
    }

    /// Retitle the `itemMeta` link with `uuid`.
    fn retitle_link<T: Serialize>(
        &mut self,
        actor: &str,
        entity_type: &str,
        uuid: &str,
        title: &str,
        payload: &T,
    ) -> Result<()> {
        let node = self
            .item_link_by_uuid(uuid)
            .ok_or_else(|| Error::not_found("link", format!("uuid {uuid}")))?;
        self.dom_mut().set_attr(node, "title", title);
        let info = NodeInfo::from_element(self.dom(), node);
        self.emit(
            actor,
            Change::new(entity_type, Action::Update, serde_json::to_value(payload)?).with_node(info),
        )
    }

    // Authors

    /// Author links, deduplicated: uuid-less authors by title, the rest by
    /// uuid.
    pub fn authors(&self) -> Vec<Link> {
        let mut authors: Vec<Link> = Vec::new();
        for author in self.item_links_of_type(AUTHOR_TYPE) {
            let duplicate = authors.iter().any(|existing| {
                let existing_uuid = existing.uuid.as_deref().unwrap_or_default();
                if is_nil_uuid(existing_uuid) {
                    existing.title == author.title
                } else {
                    existing.uuid == author.uuid
                }
            });
            if !duplicate {
                authors.push(author);
            }
        }
        authors
    }

    pub fn add_author(&mut self, actor: &str, author: &Author) -> Result<()> {
        let link = Link::new(&author.uuid, &author.name, "author", AUTHOR_TYPE);
        self.add_unique_link(actor, "author", &link, author)
    }

    /// Add an author known only by name, under the nil uuid.
    ///
    /// A no-op when a nil-uuid author with the same name exists.
    pub fn add_simple_author(&mut self, actor: &str, name: &str) -> Result<()> {
        let exists = self
            .link_node(MetaSection::ItemMeta, |dom, node| {
                dom.attr(node, "type") == Some(AUTHOR_TYPE)
                    && dom.attr(node, "uuid") == Some(NIL_UUID)
                    && dom.attr(node, "title") == Some(name)
            })
            .is_some();
        if exists {
            info!(name, "simple author already exists");
            return Ok(());
        }
        let node = self.insert_link(
            MetaSection::ItemMeta,
            &Link::new(NIL_UUID, name, "author", AUTHOR_TYPE),
        )?;
        let info = NodeInfo::from_element(self.dom(), node);
        self.emit(
            actor,
            Change::new("author", Action::Add, Value::String(name.to_string())).with_node(info),
        )
    }

    /// Retitle an author and rebuild its `data` from the update's non-empty
    /// contact fields.
    pub fn update_author(&mut self, actor: &str, uuid: &str, author: &AuthorUpdate) -> Result<()> {
        let node = self
            .link_node(MetaSection::ItemMeta, |dom, node| {
                dom.attr(node, "type") == Some(AUTHOR_TYPE) && dom.attr(node, "uuid") == Some(uuid)
            })
            .ok_or_else(|| Error::not_found("author", format!("uuid {uuid}")))?;

        let data: Map<String, Value> = author
            .data_fields()
            .into_iter()
            .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
            .collect();
        let data_node = self.encode_data(node, Some(&data))?;
        self.dom_mut().set_attr(node, "title", author.name.as_str());
        self.swap_data(node, data_node);

        let info = NodeInfo::from_element(self.dom(), node);
        self.emit(
            actor,
            Change::new("author", Action::Update, serde_json::to_value(author)?).with_node(info),
        )
    }

    pub fn remove_author_by_uuid(&mut self, actor: &str, uuid: &str) -> Result<()> {
        let node = self
            .link_node(MetaSection::ItemMeta, |dom, node| {
                dom.attr(node, "type") == Some(AUTHOR_TYPE) && dom.attr(node, "uuid") == Some(uuid)
            })
            .ok_or_else(|| Error::not_found("author", format!("uuid {uuid}")))?;
        let removed = Link::read(self.dom(), node);
        let info = self.detach_link(node);
        self.emit(
            actor,
            Change::new("author", Action::Delete, serde_json::to_value(removed)?).with_node(info),
        )
    }

    /// Remove the first author whose title contains `name`.
    pub fn remove_author_by_title(&mut self, actor: &str, name: &str) -> Result<()> {
        let contains = attr_contains("title", name);
        let node = self
            .link_node(MetaSection::ItemMeta, |dom, node| {
                dom.attr(node, "type") == Some(AUTHOR_TYPE) && contains(dom, node)
            })
            .ok_or_else(|| Error::not_found("author", format!("title {name}")))?;
        let info = self.detach_link(node);
        self.emit(
            actor,
            Change::new("author", Action::Delete, Value::String(name.to_string())).with_node(info),
        )
    }

    // Tags

    /// Subject links of any of `types`.
    pub fn tags(&self, types: &[&str]) -> Vec<Link> {
        self.links_by_type(types, None)
    }

    pub fn add_tag(&mut self, actor: &str, tag: &Tag) -> Result<()> {
        let rel = tag.rel.as_deref().unwrap_or("subject");
        let link = Link::new(&tag.uuid, &tag.name, rel, &tag.tag_type);
        self.add_unique_link(actor, "tag", &link, tag)
    }

    /// Overwrite title, type and relation (`subject` unless the tag names
    /// one) of the tag with `uuid`.
    pub fn update_tag(&mut self, actor: &str, uuid: &str, tag: &Tag) -> Result<()> {
        let node = self
            .item_link_by_uuid(uuid)
            .ok_or_else(|| Error::not_found("link", format!("uuid {uuid}")))?;
        let dom = self.dom_mut();
        dom.set_attr(node, "title", tag.name.as_str());
        dom.set_attr(node, "rel", tag.rel.as_deref().unwrap_or("subject"));
        dom.set_attr(node, "type", tag.tag_type.as_str());
        let info = NodeInfo::from_element(self.dom(), node);
        self.emit(
            actor,
            Change::new("tag", Action::Update, serde_json::to_value(tag)?).with_node(info),
        )
    }

    // Locations

    /// Locations of every configured location type, narrowed by `filter`.
    pub fn locations(&self, filter: LocationFilter) -> Vec<Link> {
        self.read_links(MetaSection::ItemMeta, attr_in("type", &self.config().location_types))
            .into_iter()
            .filter(|link| filter.matches(link))
            .collect()
    }

    pub fn add_location(&mut self, actor: &str, location: &Location) -> Result<()> {
        let mut link = Link::new(&location.uuid, &location.title, "subject", &location.location_type);
        if let Some(position) = &location.position {
            let mut data = Map::new();
            data.insert("geometry".to_string(), Value::String(position.clone()));
            link = link.with_data(data);
        }
        self.add_unique_link(actor, "location", &link, location)
    }

    /// Retitle a location and, when a position is given, write it to
    /// `data > geometry` (created if missing).
    pub fn update_location(&mut self, actor: &str, location: &Location) -> Result<()> {
        let node = self
            .item_link_by_uuid(&location.uuid)
            .ok_or_else(|| Error::not_found("link", format!("uuid {}", location.uuid)))?;
        self.dom_mut().set_attr(node, "title", location.title.as_str());

        if let Some(position) = &location.position {
            let data = self.ensure_child(node, DATA)?;
            let geometry = self.ensure_child(data, "geometry")?;
            self.dom_mut().set_text(geometry, position.as_str());
        }

        let info = NodeInfo::from_element(self.dom(), node);
        self.emit(
            actor,
            Change::new("location", Action::Update, serde_json::to_value(location)?).with_node(info),
        )
    }

    // Stories, categories, content profiles

    pub fn stories(&self) -> Vec<Link> {
        self.item_links_of_type(STORY_TYPE)
    }

    pub fn add_story(&mut self, actor: &str, story: &LinkRef) -> Result<()> {
        let link = Link::new(&story.uuid, &story.title, "subject", STORY_TYPE);
        self.add_unique_link(actor, "story", &link, story)
    }

    pub fn update_story(&mut self, actor: &str, story: &LinkRef) -> Result<()> {
        self.retitle_link(actor, "story", &story.uuid, &story.title, story)
    }

    pub fn categories(&self) -> Vec<Link> {
        self.item_links_of_type(CATEGORY_TYPE)
    }

    pub fn add_category(&mut self, actor: &str, category: &LinkRef) -> Result<()> {
        let link = Link::new(&category.uuid, &category.title, "subject", CATEGORY_TYPE);
        self.add_unique_link(actor, "category", &link, category)
    }

    pub fn content_profiles(&self) -> Vec<Link> {
        self.item_links_of_type(CONTENT_PROFILE_TYPE)
    }

    pub fn add_content_profile(&mut self, actor: &str, profile: &LinkRef) -> Result<()> {
        let link = Link::new(&profile.uuid, &profile.title, "subject", CONTENT_PROFILE_TYPE);
        self.add_unique_link(actor, "contentprofile", &link, profile)
    }

    pub fn update_content_profile(&mut self, actor: &str, profile: &LinkRef) -> Result<()> {
        self.retitle_link(actor, "contentprofile", &profile.uuid, &profile.title, profile)
    }

    #[deprecated(note = "use `add_content_profile`")]
    pub fn add_concept_profile(&mut self, actor: &str, profile: &LinkRef) -> Result<()> {
        self.add_content_profile(actor, profile)
    }

    #[deprecated(note = "use `update_content_profile`")]
    pub fn update_concept_profile(&mut self, actor: &str, profile: &LinkRef) -> Result<()> {
        self.update_content_profile(actor, profile)
    }

    // Read-only kinds

    /// Section concepts (`x-im/section` links), not to be confused with the
    /// section service.
    pub fn concept_sections(&self) -> Vec<Link> {
        self.item_links_of_type(CONCEPT_SECTION_TYPE)
    }

    /// Channel concept links (`x-im/channel`, rel `channel`).
    pub fn normalized_channels(&self) -> Vec<Link> {
        self.link_by_type_and_rel(CHANNEL_TYPE, "channel")
    }

    /// The `itemMeta` link with `uuid`, whatever its kind.
    pub fn concept_by_uuid(&self, uuid: &str) -> Option<Link> {
        self.item_link_by_uuid(uuid)
            .map(|node| Link::read(self.dom(), node))
    }

    /// Replace the `related-geo` link with one listing `polygons` in its
    /// `data`. An empty list just removes the link.
    pub fn create_extended_geo_link(&mut self, actor: &str, polygons: &[GeoPolygon]) -> Result<()> {
        let existing = self.link_node(MetaSection::ItemMeta, attr_eq("rel", RELATED_GEO_REL));
        if let Some(node) = existing {
            self.dom_mut().detach(node);
        }
        if polygons.is_empty() {
            if existing.is_some() {
                self.emit(actor, Change::new(RELATED_GEO_REL, Action::Delete, json!([])))?;
            }
            return Ok(());
        }

        let links = self.ensure_links(MetaSection::ItemMeta)?;
        let dom = self.dom_mut();
        let missing = || Error::MissingElement(LINKS.into());
        let link = dom.create_element(links, LINK).ok_or_else(missing)?;
        dom.set_attr(link, "rel", RELATED_GEO_REL);
        let data = dom.create_element(links, DATA).ok_or_else(missing)?;
        for polygon in polygons {
            let uuid = dom.create_element(links, "uuid").ok_or_else(missing)?;
            dom.set_attr(uuid, "title", polygon.title.as_str());
            dom.set_text(uuid, polygon.uuid.as_str());
            dom.append(data, uuid);
        }
        dom.append(link, data);
        dom.append(links, link);

        self.emit(
            actor,
            Change::new(RELATED_GEO_REL, Action::Set, serde_json::to_value(polygons)?),
        )
    }
}
