//! Builder API for ergonomic entity construction.
//!
//! # Example
//!
//! ```rust
//! use odata_codec::model::EntityBuilder;
//!
//! let entity = EntityBuilder::new()
//!     .id("People('russell')")
//!     .type_name("NS.Person")
//!     .string("UserName", "russell")
//!     .int32("Age", 42)
//!     .complex("Address", "NS.Address", |a| a.string("City", "Oslo"))
//!     .navigation("Friends", "People('russell')/Friends")
//!     .build();
//!
//! assert_eq!(entity.properties.len(), 3);
//! ```

use crate::model::{
    Annotation, Collection, Delta, DeletedEntity, DeletedReason, DeltaLink, Entity,
    EntityCollection, Geospatial, Inline, Link, Operation, OperationKind, Property, Value,
};

/// Typed property helpers shared by entity and complex builders.
macro_rules! property_helpers {
    () => {
        /// Adds an untyped property.
        pub fn value(mut self, name: impl Into<String>, value: Value) -> Self {
            self.properties.push(Property::new(name, value));
            self
        }

        /// Adds a property with an explicit type expression.
        pub fn typed(mut self, name: impl Into<String>, type_name: impl Into<String>, value: Value) -> Self {
            self.properties.push(Property::typed(name, type_name, value));
            self
        }

        /// Adds a pre-built property.
        pub fn property(mut self, property: Property) -> Self {
            self.properties.push(property);
            self
        }

        /// Adds an Edm.String value.
        pub fn string(self, name: impl Into<String>, value: impl Into<String>) -> Self {
            self.typed(name, "Edm.String", Value::Primitive(value.into()))
        }

        /// Adds an Edm.Int32 value.
        pub fn int32(self, name: impl Into<String>, value: i32) -> Self {
            self.typed(name, "Edm.Int32", Value::Primitive(value.to_string()))
        }

        /// Adds an Edm.Int64 value.
        pub fn int64(self, name: impl Into<String>, value: i64) -> Self {
            self.typed(name, "Edm.Int64", Value::Primitive(value.to_string()))
        }

        /// Adds an Edm.Double value.
        pub fn double(self, name: impl Into<String>, value: f64) -> Self {
            self.typed(name, "Edm.Double", Value::Primitive(format_double(value)))
        }

        /// Adds an Edm.Decimal value from its literal.
        pub fn decimal(self, name: impl Into<String>, literal: impl Into<String>) -> Self {
            self.typed(name, "Edm.Decimal", Value::Primitive(literal.into()))
        }

        /// Adds an Edm.Boolean value.
        pub fn boolean(self, name: impl Into<String>, value: bool) -> Self {
            self.typed(name, "Edm.Boolean", Value::Primitive(value.to_string()))
        }

        /// Adds a typed null.
        pub fn null(self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
            self.typed(name, type_name, Value::Null)
        }

        /// Adds an enum member.
        pub fn enum_member(
            self,
            name: impl Into<String>,
            type_name: impl Into<String>,
            member: impl Into<String>,
        ) -> Self {
            self.typed(name, type_name, Value::Enum(member.into()))
        }

        /// Adds a geospatial value typed by its own kind.
        pub fn geo(self, name: impl Into<String>, value: Geospatial) -> Self {
            let type_name = value.edm_kind().full_name();
            self.typed(name, type_name, Value::Geospatial(value))
        }

        /// Adds a collection under `Collection(element_type)`.
        pub fn collection(self, name: impl Into<String>, element_type: &str, items: Collection) -> Self {
            self.typed(name, format!("Collection({element_type})"), Value::Collection(items))
        }

        /// Adds a complex value built by `f`.
        pub fn complex<F>(self, name: impl Into<String>, type_name: impl Into<String>, f: F) -> Self
        where
            F: FnOnce(ComplexBuilder) -> ComplexBuilder,
        {
            let builder = f(ComplexBuilder::new());
            self.typed(name, type_name, Value::Complex(builder.properties))
        }
    };
}

/// Renders a double the way JSON readers print it back (`1.0`, not `1`).
fn format_double(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        let literal = if value > 0.0 { "INF" } else { "-INF" };
        literal.to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Builder for a complex value's property list.
#[derive(Debug, Clone, Default)]
pub struct ComplexBuilder {
    properties: Vec<Property>,
}

impl ComplexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    property_helpers!();

    pub fn build(self) -> Vec<Property> {
        self.properties
    }
}

/// Builder for constructing an Entity.
#[derive(Debug, Clone, Default)]
pub struct EntityBuilder {
    entity: Entity,
    properties: Vec<Property>,
}

impl EntityBuilder {
    /// Creates a new empty EntityBuilder.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.entity.id = Some(id.into());
        self
    }

    pub fn type_name(mut self, type_name: impl Into<String>) -> Self {
        self.entity.type_name = Some(type_name.into());
        self
    }

    pub fn etag(mut self, etag: impl Into<String>) -> Self {
        self.entity.etag = Some(etag.into());
        self
    }

    pub fn read_link(mut self, href: impl Into<String>) -> Self {
        self.entity.self_link = Some(Link::new("", href));
        self
    }

    pub fn edit_link(mut self, href: impl Into<String>) -> Self {
        self.entity.edit_link = Some(Link::new("", href));
        self
    }

    property_helpers!();

    // =========================================================================
    // Links
    // =========================================================================

    /// Adds an unexpanded navigation link.
    pub fn navigation(mut self, title: impl Into<String>, href: impl Into<String>) -> Self {
        self.entity.navigation_links.push(Link::new(title, href));
        self
    }

    /// Adds a navigation link with an inline entity.
    pub fn expand_entity(mut self, title: impl Into<String>, entity: Entity) -> Self {
        self.entity
            .navigation_links
            .push(Link::expanded(title, Inline::Entity(Box::new(entity))));
        self
    }

    /// Adds a navigation link with an inline entity set.
    pub fn expand_set(mut self, title: impl Into<String>, set: EntityCollection) -> Self {
        self.entity
            .navigation_links
            .push(Link::expanded(title, Inline::EntitySet(set)));
        self
    }

    pub fn association(mut self, title: impl Into<String>, href: impl Into<String>) -> Self {
        self.entity.association_links.push(Link::new(title, href));
        self
    }

    /// Binds a to-one navigation property to an existing entity.
    pub fn bind(mut self, title: impl Into<String>, target: impl Into<String>) -> Self {
        self.entity.binding_links.push(Link::new(title, target));
        self
    }

    /// Binds a to-many navigation property to existing entities.
    pub fn bind_many(mut self, title: impl Into<String>, targets: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.entity.binding_links.push(Link {
            title: title.into(),
            bindings: targets.into_iter().map(Into::into).collect(),
            ..Default::default()
        });
        self
    }

    pub fn media_edit_link(mut self, title: impl Into<String>, href: impl Into<String>) -> Self {
        self.entity.media_edit_links.push(Link::new(title, href));
        self
    }

    // =========================================================================
    // Media, operations, annotations
    // =========================================================================

    pub fn media(mut self, content_type: impl Into<String>, source: impl Into<String>) -> Self {
        self.entity.media_content_type = Some(content_type.into());
        self.entity.media_content_source = Some(source.into());
        self
    }

    pub fn media_etag(mut self, etag: impl Into<String>) -> Self {
        self.entity.media_etag = Some(etag.into());
        self
    }

    pub fn action(mut self, anchor: impl Into<String>, target: impl Into<String>) -> Self {
        self.entity.operations.push(Operation {
            kind: OperationKind::Action,
            metadata_anchor: anchor.into(),
            title: None,
            target: Some(target.into()),
        });
        self
    }

    pub fn function(mut self, anchor: impl Into<String>, target: impl Into<String>) -> Self {
        self.entity.operations.push(Operation {
            kind: OperationKind::Function,
            metadata_anchor: anchor.into(),
            title: None,
            target: Some(target.into()),
        });
        self
    }

    pub fn annotation(mut self, annotation: Annotation) -> Self {
        self.entity.annotations.push(annotation);
        self
    }

    /// Builds the entity.
    pub fn build(self) -> Entity {
        Entity {
            properties: self.properties,
            ..self.entity
        }
    }
}

/// Builder for constructing a Delta.
#[derive(Debug, Clone, Default)]
pub struct DeltaBuilder {
    delta: Delta,
}

impl DeltaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a changed or added entity.
    pub fn entity(mut self, entity: Entity) -> Self {
        self.delta.entities.push(entity);
        self
    }

    pub fn deleted(mut self, id: impl Into<String>, reason: DeletedReason) -> Self {
        self.delta.deleted_entities.push(DeletedEntity::new(id, reason));
        self
    }

    pub fn added_link(
        mut self,
        source: impl Into<String>,
        relationship: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        self.delta.added_links.push(DeltaLink::new(source, relationship, target));
        self
    }

    pub fn deleted_link(
        mut self,
        source: impl Into<String>,
        relationship: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        self.delta.deleted_links.push(DeltaLink::new(source, relationship, target));
        self
    }

    pub fn delta_link(mut self, href: impl Into<String>) -> Self {
        self.delta.delta_link = Some(href.into());
        self
    }

    pub fn build(self) -> Delta {
        self.delta
    }
}
