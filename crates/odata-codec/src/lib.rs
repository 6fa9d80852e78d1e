//! OData payload codec.
//!
//! This crate converts between an in-memory entity/value model and the two
//! OData wire formats, JSON and Atom/XML, for protocol versions 2.0, 3.0,
//! 4.0 and 4.01.
//!
//! # Overview
//!
//! - **One model, four dialects**: every version difference is a lookup in
//!   the per-version name tables ([`names`]), never a literal in codec code
//! - **Metadata levels**: JSON output at `none`, `minimal` or `full`; the
//!   minimal level omits anything a generic reader could re-derive
//! - **Deltas**: change sets are validated and ordered before any byte is
//!   written
//!
//! # Quick Start
//!
//! ```rust
//! use odata_codec::codec::json::{JsonDeserializer, JsonOptions, JsonSerializer};
//! use odata_codec::context::SerializeContext;
//! use odata_codec::model::EntityBuilder;
//! use odata_codec::version::{MetadataLevel, ODataVersion};
//!
//! let entity = EntityBuilder::new()
//!     .id("People('russell')")
//!     .type_name("NS.Person")
//!     .string("UserName", "russell")
//!     .int32("Age", 42)
//!     .build();
//!
//! let ctx = SerializeContext::new(ODataVersion::V4).metadata(MetadataLevel::Full);
//! let mut bytes = Vec::new();
//! JsonSerializer::new(JsonOptions::server())
//!     .serialize_entity(&mut bytes, &entity, &ctx)
//!     .unwrap();
//!
//! let decoded = JsonDeserializer::new(ODataVersion::V4).entity(&bytes).unwrap();
//! assert_eq!(decoded.payload, entity);
//! ```
//!
//! # Modules
//!
//! - [`model`]: Values, properties, entities, deltas, errors and builders
//! - [`codec`]: JSON and Atom serializers and deserializers
//! - [`edm`]: Type expressions, primitive kinds and the EDM provider seam
//! - [`names`]: Per-version wire spellings
//! - [`query`]: `$select` / `$expand` trees
//! - [`context`]: Per-call serialization context and context URLs
//! - [`validate`]: Facet validation against an EDM provider
//! - [`error`]: Error types
//! - [`limits`]: Decoding and expansion limits
//!
//! # Security
//!
//! The deserializers are designed to safely handle untrusted input:
//! - Nesting depth is bounded for both JSON and XML
//! - Expansion of cyclic navigation graphs terminates
//! - Invalid documents are rejected with descriptive errors

pub mod codec;
pub mod context;
pub mod edm;
pub mod error;
pub mod limits;
pub mod model;
pub mod names;
pub mod query;
pub mod validate;
pub mod version;

// Re-export commonly used types at crate root
pub use codec::atom::{AtomDeserializer, AtomSerializer};
pub use codec::json::{JsonDeserializer, JsonMode, JsonOptions, JsonSerializer};
pub use context::{ContextKind, ContextUrl, NavigationResolver, SerializeContext};
pub use edm::{EdmPrimitiveKind, EdmProvider, SchemaContext, TypeInfo};
pub use error::{DecodeError, EncodeError, ErrorCode, TypeExpressionError, ValidationError};
pub use model::{
    Annotation, Collection, DeletedEntity, DeletedReason, Delta, DeltaLink, Entity, EntityBuilder, EntityCollection,
    Envelope, Geospatial, Inline, Link, Property, ServerError, Value, ValueKind,
};
pub use query::{ExpandItem, ExpandTree, Levels, SelectTree};
pub use validate::validate_entity;
pub use version::{MetadataLevel, ODataVersion};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
