//! JSON payload format.
//!
//! One serializer and one deserializer cover the four dialects: 4.0 and
//! 4.01 JSON, 3.0 JSON light and the 2.0 verbose format (`{"d": ...}`).
//! Every dialect difference is looked up in [`crate::names::JsonNames`].

mod deserializer;
mod generator;
mod geo;
mod serializer;

pub use deserializer::JsonDeserializer;
pub use generator::JsonGenerator;
pub use serializer::JsonSerializer;

/// Which side of the protocol a serializer writes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonMode {
    /// Request payloads: bindings (`Nav@odata.bind`) instead of links.
    Client,
    /// Response payloads: association/navigation links and operations.
    #[default]
    Server,
}

/// Options for JSON serialization.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonOptions {
    /// Client or server payload shape. Fixed per serializer.
    pub mode: JsonMode,
    /// Write `Edm.Int64` and `Edm.Decimal` values (and counts) as JSON
    /// strings, for readers that parse every number as a double.
    pub ieee754_compatible: bool,
}

impl JsonOptions {
    /// Server mode, numbers as numbers.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn server() -> Self {
        Self::default()
    }

    pub fn client() -> Self {
        Self {
            mode: JsonMode::Client,
            ..Self::default()
        }
    }

    /// Enables `IEEE754Compatible=true` output.
    pub fn ieee754(mut self) -> Self {
        self.ieee754_compatible = true;
        self
    }
}
