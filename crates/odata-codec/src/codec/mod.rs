//! Payload encoding/decoding.
//!
//! Two formats share the model: JSON ([`json`], all four dialects) and Atom
//! ([`atom`], 2.0 through 4.0). The expansion walk, delta record ordering
//! and type resolution are format-neutral and live beside them.

pub mod atom;
pub mod delta;
pub mod expand;
pub mod json;
pub mod primitive;

pub use atom::{AtomDeserializer, AtomSerializer};
pub use delta::{assemble, DeltaRecord, LinkRecord};
pub use expand::{expansion_target, ExpandGuard, Visit};
pub use json::{JsonDeserializer, JsonGenerator, JsonMode, JsonOptions, JsonSerializer};
