//! Entities, links and entity collections.

use crate::model::value::{Annotation, Property};

/// A link from an entity (or linked complex value) to a related resource.
///
/// A navigation link carries at most one inline payload: a single entity
/// for to-one navigation or an entity set for to-many.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Link {
    /// Navigation property name (or link title).
    pub title: String,
    pub rel: Option<String>,
    pub href: Option<String>,
    /// Atom link `type`, e.g. `application/atom+xml;type=entry`.
    pub link_type: Option<String>,
    pub media_etag: Option<String>,
    pub inline: Option<Inline>,
    /// Target URLs of a to-many binding (`Orders@odata.bind: [...]`).
    pub bindings: Vec<String>,
}

impl Link {
    pub fn new(title: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            href: Some(href.into()),
            ..Default::default()
        }
    }

    /// Link with an inline entity or entity set and no href.
    pub fn expanded(title: impl Into<String>, inline: Inline) -> Self {
        Self {
            title: title.into(),
            inline: Some(inline),
            ..Default::default()
        }
    }

    pub fn inline_entity(&self) -> Option<&Entity> {
        match &self.inline {
            Some(Inline::Entity(e)) => Some(e),
            _ => None,
        }
    }

    pub fn inline_entity_set(&self) -> Option<&EntityCollection> {
        match &self.inline {
            Some(Inline::EntitySet(set)) => Some(set),
            _ => None,
        }
    }
}

/// Inline payload of an expanded navigation link.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Inline {
    Entity(Box<Entity>),
    EntitySet(EntityCollection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Action,
    Function,
}

/// A bound action or function advertised on an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Operation {
    pub kind: OperationKind,
    /// `#Namespace.Action`, relative to the metadata document.
    pub metadata_anchor: String,
    pub title: Option<String>,
    pub target: Option<String>,
}

/// An entity instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Entity {
    /// Canonical id; absent before the entity is persisted.
    pub id: Option<String>,
    pub type_name: Option<String>,
    pub etag: Option<String>,
    pub self_link: Option<Link>,
    pub edit_link: Option<Link>,
    pub association_links: Vec<Link>,
    pub navigation_links: Vec<Link>,
    pub media_edit_links: Vec<Link>,
    pub binding_links: Vec<Link>,
    pub properties: Vec<Property>,
    pub operations: Vec<Operation>,
    pub media_content_type: Option<String>,
    pub media_content_source: Option<String>,
    pub media_etag: Option<String>,
    pub annotations: Vec<Annotation>,
}

impl Entity {
    pub fn new() -> Self {
        Self::default()
    }

    /// An entity is a media entity when it carries a media stream.
    pub fn is_media_entity(&self) -> bool {
        self.media_content_source.is_some() || self.media_content_type.is_some()
    }

    /// Looks up a property by name.
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn navigation_link(&self, title: &str) -> Option<&Link> {
        self.navigation_links.iter().find(|l| l.title == title)
    }

    /// True when the entity carries nothing but an id, i.e. it is a reference.
    pub fn is_reference(&self) -> bool {
        let Entity {
            id: _,
            type_name,
            etag,
            self_link,
            edit_link,
            association_links,
            navigation_links,
            media_edit_links,
            binding_links,
            properties,
            operations,
            media_content_type,
            media_content_source,
            media_etag,
            annotations,
        } = self;
        type_name.is_none()
            && etag.is_none()
            && self_link.is_none()
            && edit_link.is_none()
            && media_content_type.is_none()
            && media_content_source.is_none()
            && media_etag.is_none()
            && association_links.is_empty()
            && navigation_links.is_empty()
            && media_edit_links.is_empty()
            && binding_links.is_empty()
            && properties.is_empty()
            && operations.is_empty()
            && annotations.is_empty()
    }
}

/// An ordered entity set / feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct EntityCollection {
    pub id: Option<String>,
    pub entities: Vec<Entity>,
    pub count: Option<i64>,
    pub next: Option<String>,
    pub delta_link: Option<String>,
    pub annotations: Vec<Annotation>,
}

impl EntityCollection {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self {
            entities,
            ..Default::default()
        }
    }
}

/// A decoded payload together with the document-level control information.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<T> {
    pub context_url: Option<String>,
    pub metadata_etag: Option<String>,
    pub payload: T,
}

impl<T> Envelope<T> {
    pub fn new(payload: T) -> Self {
        Self {
            context_url: None,
            metadata_etag: None,
            payload,
        }
    }
}
