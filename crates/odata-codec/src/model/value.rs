//! Values and properties.
//!
//! Primitive scalars travel as their literal string form; the declared type
//! (when known) is carried on the [`Property`], not on the value.

use crate::model::entity::Link;
use crate::model::geo::Geospatial;

/// Shape of a value, independent of its concrete type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Primitive,
    Enum,
    Geospatial,
    Complex,
    CollectionPrimitive,
    CollectionEnum,
    CollectionGeospatial,
    CollectionComplex,
}

impl ValueKind {
    /// The non-collection kind (identity for non-collections).
    pub fn base(self) -> ValueKind {
        match self {
            ValueKind::CollectionPrimitive => ValueKind::Primitive,
            ValueKind::CollectionEnum => ValueKind::Enum,
            ValueKind::CollectionGeospatial => ValueKind::Geospatial,
            ValueKind::CollectionComplex => ValueKind::Complex,
            other => other,
        }
    }

    /// The collection kind whose elements have this kind's base.
    pub fn collection_of(self) -> ValueKind {
        match self.base() {
            ValueKind::Primitive => ValueKind::CollectionPrimitive,
            ValueKind::Enum => ValueKind::CollectionEnum,
            ValueKind::Geospatial => ValueKind::CollectionGeospatial,
            _ => ValueKind::CollectionComplex,
        }
    }

    pub fn is_collection(self) -> bool {
        self != self.base()
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Primitive => "primitive",
            ValueKind::Enum => "enum",
            ValueKind::Geospatial => "geospatial",
            ValueKind::Complex => "complex",
            ValueKind::CollectionPrimitive => "primitive collection",
            ValueKind::CollectionEnum => "enum collection",
            ValueKind::CollectionGeospatial => "geospatial collection",
            ValueKind::CollectionComplex => "complex collection",
        }
    }
}

/// An OData value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Null,
    /// String-encoded scalar, e.g. `"42"`, `"true"`, `"2024-01-01"`.
    Primitive(String),
    /// Enum member name(s), e.g. `"Red"` or `"Red,Green"` for flags.
    Enum(String),
    Geospatial(Geospatial),
    Complex(Vec<Property>),
    LinkedComplex(LinkedComplex),
    Collection(Collection),
}

impl Value {
    pub fn primitive(literal: impl Into<String>) -> Value {
        Value::Primitive(literal.into())
    }

    pub fn enum_member(member: impl Into<String>) -> Value {
        Value::Enum(member.into())
    }

    /// Shape of this value. `Null` reports `Primitive`.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null | Value::Primitive(_) => ValueKind::Primitive,
            Value::Enum(_) => ValueKind::Enum,
            Value::Geospatial(_) => ValueKind::Geospatial,
            Value::Complex(_) | Value::LinkedComplex(_) => ValueKind::Complex,
            Value::Collection(c) => c.kind(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_collection(&self) -> bool {
        self.kind().is_collection()
    }

    pub fn as_primitive(&self) -> Option<&str> {
        match self {
            Value::Primitive(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&str> {
        match self {
            Value::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_geospatial(&self) -> Option<&Geospatial> {
        match self {
            Value::Geospatial(g) => Some(g),
            _ => None,
        }
    }

    /// Properties of a complex or linked-complex value.
    pub fn as_complex(&self) -> Option<&[Property]> {
        match self {
            Value::Complex(props) => Some(props),
            Value::LinkedComplex(lc) => Some(&lc.properties),
            _ => None,
        }
    }

    pub fn as_linked_complex(&self) -> Option<&LinkedComplex> {
        match self {
            Value::LinkedComplex(lc) => Some(lc),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&Collection> {
        match self {
            Value::Collection(c) => Some(c),
            _ => None,
        }
    }
}

/// A complex value that also carries links (complex properties of entities
/// may expose navigation properties of their own).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LinkedComplex {
    pub properties: Vec<Property>,
    pub association_links: Vec<Link>,
    pub navigation_links: Vec<Link>,
    pub binding_links: Vec<Link>,
}

/// A homogeneous collection whose element kind is fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Collection {
    element: ValueKind,
    items: Vec<Value>,
}

impl Collection {
    /// Creates an empty collection of `element`'s base kind.
    pub fn new(element: ValueKind) -> Self {
        Self {
            element: element.base(),
            items: Vec::new(),
        }
    }

    /// Creates a collection from items, rejecting the first mismatched one.
    pub fn from_items(element: ValueKind, items: impl IntoIterator<Item = Value>) -> Result<Self, Value> {
        let mut collection = Self::new(element);
        for item in items {
            collection.push(item)?;
        }
        Ok(collection)
    }

    /// Appends an item. Nulls are always accepted; anything whose kind
    /// differs from the element kind is handed back.
    pub fn push(&mut self, value: Value) -> Result<(), Value> {
        if value.is_null() || value.kind() == self.element {
            self.items.push(value);
            Ok(())
        } else {
            Err(value)
        }
    }

    /// Collection kind, e.g. `CollectionComplex`.
    pub fn kind(&self) -> ValueKind {
        self.element.collection_of()
    }

    pub fn element_kind(&self) -> ValueKind {
        self.element
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }
}

/// A named, optionally typed value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Property {
    pub name: String,
    /// Unresolved type expression, e.g. `Edm.Int32` or `Collection(NS.Address)`.
    pub type_name: Option<String>,
    pub value: Value,
    pub annotations: Vec<Annotation>,
}

impl Property {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            type_name: None,
            value,
            annotations: Vec::new(),
        }
    }

    pub fn typed(name: impl Into<String>, type_name: impl Into<String>, value: Value) -> Self {
        Self {
            type_name: Some(type_name.into()),
            ..Self::new(name, value)
        }
    }

    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }
}

/// An instance annotation (`@NS.term`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Annotation {
    /// Qualified term name without the leading `@`.
    pub term: String,
    pub type_name: Option<String>,
    pub value: Value,
}

impl Annotation {
    pub fn new(term: impl Into<String>, value: Value) -> Self {
        Self {
            term: term.into(),
            type_name: None,
            value,
        }
    }

    pub fn typed(term: impl Into<String>, type_name: impl Into<String>, value: Value) -> Self {
        Self {
            type_name: Some(type_name.into()),
            ..Self::new(term, value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_base() {
        assert_eq!(ValueKind::CollectionComplex.base(), ValueKind::Complex);
        assert_eq!(ValueKind::Enum.collection_of(), ValueKind::CollectionEnum);
        assert!(ValueKind::CollectionPrimitive.is_collection());
        assert!(!ValueKind::Geospatial.is_collection());
        assert_eq!(Value::Null.kind(), ValueKind::Primitive);
    }

    #[test]
    fn test_collection_element_kind_is_fixed() {
        let mut c = Collection::new(ValueKind::Primitive);
        assert!(c.push(Value::primitive("1")).is_ok());
        assert!(c.push(Value::Null).is_ok());
        let rejected = c.push(Value::Complex(vec![])).unwrap_err();
        assert_eq!(rejected, Value::Complex(vec![]));
        assert_eq!(c.len(), 2);
        assert_eq!(c.kind(), ValueKind::CollectionPrimitive);

        let v = Value::Collection(c);
        assert!(v.is_collection());
        assert!(v.as_primitive().is_none());
    }

    #[test]
    fn test_collection_of_collection_kind_normalizes() {
        let c = Collection::new(ValueKind::CollectionEnum);
        assert_eq!(c.element_kind(), ValueKind::Enum);
    }

    #[test]
    fn test_accessors_return_none_on_mismatch() {
        let v = Value::enum_member("Red");
        assert_eq!(v.as_enum(), Some("Red"));
        assert!(v.as_primitive().is_none());
        assert!(v.as_complex().is_none());
        assert!(v.as_collection().is_none());

        let lc = Value::LinkedComplex(LinkedComplex {
            properties: vec![Property::new("City", Value::primitive("Oslo"))],
            ..Default::default()
        });
        assert_eq!(lc.as_complex().map(|p| p.len()), Some(1));
        assert!(lc.as_linked_complex().is_some());
    }
}
