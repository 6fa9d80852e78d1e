//! Atom (XML) payload format.
//!
//! Covers the 2.0, 3.0 and 4.0 Atom dialects. Namespaces, relation URIs
//! and the element that carries collection items differ per version and
//! are looked up in [`crate::names::AtomNames`].

mod deserializer;
mod geo;
mod reader;
mod serializer;
mod writer;

pub use deserializer::AtomDeserializer;
pub use reader::{Element, Node, XmlAttribute, XmlCursor};
pub use serializer::AtomSerializer;
pub use writer::{Attrs, XmlWriter};

/// Media type of an inline or top-level entry.
pub const ENTRY_CONTENT_TYPE: &str = "application/atom+xml;type=entry";
/// Media type of an inline or top-level feed.
pub const FEED_CONTENT_TYPE: &str = "application/atom+xml;type=feed";
pub const XML_CONTENT_TYPE: &str = "application/xml";
