//! Delta (change-set) payloads.

use crate::model::entity::Entity;

/// Why an entity disappeared from a tracked set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeletedReason {
    #[default]
    Deleted,
    /// The entity still exists but no longer belongs to the set.
    Changed,
}

impl DeletedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeletedReason::Deleted => "deleted",
            DeletedReason::Changed => "changed",
        }
    }

    pub fn parse(s: &str) -> Option<DeletedReason> {
        match s {
            "deleted" => Some(DeletedReason::Deleted),
            "changed" => Some(DeletedReason::Changed),
            _ => None,
        }
    }
}

/// A deleted-entity record. The id is required on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DeletedEntity {
    pub id: Option<String>,
    pub reason: DeletedReason,
}

impl DeletedEntity {
    pub fn new(id: impl Into<String>, reason: DeletedReason) -> Self {
        Self {
            id: Some(id.into()),
            reason,
        }
    }
}

/// An added or deleted relationship. All three fields are required on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DeltaLink {
    pub source: Option<String>,
    pub relationship: Option<String>,
    pub target: Option<String>,
}

impl DeltaLink {
    pub fn new(source: impl Into<String>, relationship: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            relationship: Some(relationship.into()),
            target: Some(target.into()),
        }
    }
}

/// Four ordered record lists plus paging information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Delta {
    pub entities: Vec<Entity>,
    pub deleted_entities: Vec<DeletedEntity>,
    pub added_links: Vec<DeltaLink>,
    pub deleted_links: Vec<DeltaLink>,
    pub count: Option<i64>,
    pub next: Option<String>,
    pub delta_link: Option<String>,
}

impl Delta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
            && self.deleted_entities.is_empty()
            && self.added_links.is_empty()
            && self.deleted_links.is_empty()
    }
}
