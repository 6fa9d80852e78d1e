//! The EDM collaborator seam.
//!
//! The codec never owns the entity data model. It asks an [`EdmProvider`]
//! for the facets of a declared property and for the base type of a
//! structured type, which is enough to validate values and to decide when
//! a derived type has to be announced on the wire. Readers also ask which
//! types are enumerations and which properties are navigation properties,
//! for payloads whose shape alone leaves that open.

use rustc_hash::{FxHashMap, FxHashSet};

/// Declared facets of a structural property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyFacets {
    /// Declared type expression, e.g. `Edm.String` or `Collection(NS.Address)`.
    pub type_name: String,
    pub nullable: bool,
    pub max_length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
}

impl PropertyFacets {
    /// Nullable property of the given type with no other facets.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            nullable: true,
            max_length: None,
            precision: None,
            scale: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn precision(mut self, precision: u32, scale: Option<u32>) -> Self {
        self.precision = Some(precision);
        self.scale = scale;
        self
    }
}

/// Type lookups the codec consumes from an external EDM model.
pub trait EdmProvider {
    /// Facets of `property` as declared directly on `type_name`.
    fn property_facets(&self, type_name: &str, property: &str) -> Option<&PropertyFacets>;

    /// Direct base type of a structured type, if it derives from one.
    fn base_type(&self, type_name: &str) -> Option<&str>;

    /// True when `type_name` is an enumeration type.
    fn is_enum_type(&self, _type_name: &str) -> bool {
        false
    }

    /// True when `property` is a navigation property declared directly on
    /// `type_name`.
    fn navigation_property(&self, _type_name: &str, _property: &str) -> bool {
        false
    }

    /// [`EdmProvider::navigation_property`] on `type_name` or any ancestor.
    fn is_navigation(&self, type_name: &str, property: &str) -> bool {
        let mut current = type_name;
        for _ in 0..MAX_INHERITANCE_DEPTH {
            if self.navigation_property(current, property) {
                return true;
            }
            match self.base_type(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
        false
    }

    /// Facets of `property` declared on `type_name` or any of its ancestors.
    fn resolve_facets(&self, type_name: &str, property: &str) -> Option<&PropertyFacets> {
        let mut current = type_name;
        for _ in 0..MAX_INHERITANCE_DEPTH {
            if let Some(facets) = self.property_facets(current, property) {
                return Some(facets);
            }
            current = self.base_type(current)?;
        }
        None
    }

    /// True when `derived` is `base` or inherits from it.
    fn derives_from(&self, derived: &str, base: &str) -> bool {
        let mut current = derived;
        for _ in 0..MAX_INHERITANCE_DEPTH {
            if current == base {
                return true;
            }
            match self.base_type(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
        false
    }
}

/// Guards against cyclic base-type declarations in a broken model.
const MAX_INHERITANCE_DEPTH: usize = 64;

/// In-memory [`EdmProvider`].
///
/// Applications and tests register the properties they care about; lookups
/// for anything unregistered return `None`, which the codec treats as
/// "no constraint".
#[derive(Debug, Clone, Default)]
pub struct SchemaContext {
    properties: FxHashMap<(String, String), PropertyFacets>,
    base_types: FxHashMap<String, String>,
    enum_types: FxHashSet<String>,
    navigation: FxHashSet<(String, String)>,
}

impl SchemaContext {
    /// Creates a new empty schema context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a property of a structured type.
    pub fn add_property(
        &mut self,
        type_name: impl Into<String>,
        property: impl Into<String>,
        facets: PropertyFacets,
    ) -> &mut Self {
        self.properties.insert((type_name.into(), property.into()), facets);
        self
    }

    /// Declares that `derived` inherits from `base`.
    pub fn add_base_type(&mut self, derived: impl Into<String>, base: impl Into<String>) -> &mut Self {
        self.base_types.insert(derived.into(), base.into());
        self
    }

    /// Registers an enumeration type.
    pub fn add_enum_type(&mut self, type_name: impl Into<String>) -> &mut Self {
        self.enum_types.insert(type_name.into());
        self
    }

    /// Registers a navigation property of an entity or complex type.
    pub fn add_navigation(&mut self, type_name: impl Into<String>, property: impl Into<String>) -> &mut Self {
        self.navigation.insert((type_name.into(), property.into()));
        self
    }
}

impl EdmProvider for SchemaContext {
    fn property_facets(&self, type_name: &str, property: &str) -> Option<&PropertyFacets> {
        self.properties
            .get(&(type_name.to_string(), property.to_string()))
    }

    fn base_type(&self, type_name: &str) -> Option<&str> {
        self.base_types.get(type_name).map(String::as_str)
    }

    fn is_enum_type(&self, type_name: &str) -> bool {
        self.enum_types.contains(type_name)
    }

    fn navigation_property(&self, type_name: &str, property: &str) -> bool {
        self.navigation
            .contains(&(type_name.to_string(), property.to_string()))
    }
}
