//! Per-dialect wire names.
//!
//! Every spelling that differs between protocol versions lives here: JSON
//! control keys and property-annotation suffixes in [`json`], XML qualified
//! names and namespaces in [`atom`]. Tables are built once per version and
//! never mutated, so a `&'static` table can be shared freely across threads.

pub mod atom;
pub mod json;

pub use atom::{atom_names, AtomNames, QName};
pub use json::{json_names, JsonNames};

/// Logical control fields with a version-specific spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Etag,
    Type,
    ReadLink,
    EditLink,
    MediaReadLink,
    MediaEditLink,
    MediaContentType,
    MediaEtag,
    AssociationLink,
    NavigationLink,
    Count,
    NextLink,
    DeltaLink,
    Context,
    MetadataEtag,
    Bind,
    Removed,
    Deferred,
}

impl Field {
    pub const ALL: [Field; 19] = [
        Field::Id,
        Field::Etag,
        Field::Type,
        Field::ReadLink,
        Field::EditLink,
        Field::MediaReadLink,
        Field::MediaEditLink,
        Field::MediaContentType,
        Field::MediaEtag,
        Field::AssociationLink,
        Field::NavigationLink,
        Field::Count,
        Field::NextLink,
        Field::DeltaLink,
        Field::Context,
        Field::MetadataEtag,
        Field::Bind,
        Field::Removed,
        Field::Deferred,
    ];
}
