//! Data model types for OData payloads.
//!
//! This module contains the in-memory representation both codecs read and
//! write:
//! - Values (tagged union over primitive, enum, geospatial, complex, collection)
//! - Entities, links and entity collections
//! - Delta change sets
//! - Service error documents
//! - Builders (ergonomic construction)

pub mod builder;
pub mod delta;
pub mod entity;
pub mod geo;
pub mod server_error;
pub mod value;

pub use builder::{ComplexBuilder, DeltaBuilder, EntityBuilder};
pub use delta::{DeletedEntity, DeletedReason, Delta, DeltaLink};
pub use entity::{Entity, EntityCollection, Envelope, Inline, Link, Operation, OperationKind};
pub use geo::{Dimension, GeoShape, Geospatial, Line, Polygon, Position};
pub use server_error::{ErrorDetail, ServerError};
pub use value::{Annotation, Collection, LinkedComplex, Property, Value, ValueKind};
