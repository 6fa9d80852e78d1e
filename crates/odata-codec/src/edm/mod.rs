//! Type information consumed by the codecs.

pub mod kind;
pub mod literal;
pub mod schema;
pub mod type_info;

pub use kind::{EdmPrimitiveKind, EDM_NAMESPACE};
pub use literal::{check_literal, decimal_digits, LiteralError};
pub use schema::{EdmProvider, PropertyFacets, SchemaContext};
pub use type_info::TypeInfo;
