//! Facet validation against an EDM provider.
//!
//! Structural checks (literal coercibility for explicitly typed values)
//! happen inside the codecs. Facet checks need the declared model: a
//! property's nullability, max length, precision and scale. Properties the
//! provider does not know about are accepted.

use crate::edm::{decimal_digits, check_literal, EdmPrimitiveKind, EdmProvider, PropertyFacets, TypeInfo};
use crate::error::ValidationError;
use crate::model::{Entity, Property, Value};

/// Validates every property of `entity` against the facets `edm` declares
/// for the entity's type. Entities without a type name are not checked.
pub fn validate_entity(entity: &Entity, edm: &dyn EdmProvider) -> Result<(), ValidationError> {
    let Some(type_name) = entity.type_name.as_deref() else {
        return Ok(());
    };
    validate_properties(type_name, &entity.properties, edm)
}

/// Validates the members of a structured value of type `type_name`.
pub fn validate_properties(
    type_name: &str,
    properties: &[Property],
    edm: &dyn EdmProvider,
) -> Result<(), ValidationError> {
    for property in properties {
        let Some(facets) = edm.resolve_facets(type_name, &property.name) else {
            continue;
        };
        validate_value(&property.name, &property.value, property.type_name.as_deref(), facets, edm)?;
    }
    Ok(())
}

fn wrong(property: &str, reason: impl Into<String>) -> ValidationError {
    ValidationError::WrongPropertyValue {
        property: property.to_string(),
        reason: reason.into(),
    }
}

fn validate_value(
    property: &str,
    value: &Value,
    actual_type: Option<&str>,
    facets: &PropertyFacets,
    edm: &dyn EdmProvider,
) -> Result<(), ValidationError> {
    let declared = TypeInfo::parse(&facets.type_name)
        .map_err(|e| wrong(property, format!("declared type: {e}")))?;

    match value {
        Value::Null if !facets.nullable => Err(ValidationError::NullNotAllowed {
            property: property.to_string(),
        }),
        Value::Null => Ok(()),
        Value::Collection(items) => {
            if !declared.is_collection() {
                return Err(wrong(property, format!("collection value for {declared}")));
            }
            let element = declared.element();
            for item in items.iter() {
                // Null members are governed by the same nullability facet.
                validate_single(property, item, None, &element, facets, edm)?;
            }
            Ok(())
        }
        single => {
            if declared.is_collection() {
                return Err(wrong(property, format!("single value for {declared}")));
            }
            validate_single(property, single, actual_type, &declared, facets, edm)
        }
    }
}

fn validate_single(
    property: &str,
    value: &Value,
    actual_type: Option<&str>,
    declared: &TypeInfo,
    facets: &PropertyFacets,
    edm: &dyn EdmProvider,
) -> Result<(), ValidationError> {
    match value {
        Value::Null if !facets.nullable => Err(ValidationError::NullNotAllowed {
            property: property.to_string(),
        }),
        Value::Primitive(literal) => match declared.primitive_kind() {
            Some(kind) => validate_literal(property, kind, literal, facets),
            None => Ok(()),
        },
        Value::Complex(_) | Value::LinkedComplex(_) => {
            let type_name = actual_type
                .map(str::to_string)
                .unwrap_or_else(|| declared.qualified_name());
            if let Some(actual) = actual_type {
                if !edm.derives_from(actual, &declared.qualified_name()) {
                    return Err(wrong(
                        property,
                        format!("{actual} does not derive from {declared}"),
                    ));
                }
            }
            let members = value.as_complex().unwrap_or_default();
            validate_properties(&type_name, members, edm)
        }
        _ => Ok(()),
    }
}

fn validate_literal(
    property: &str,
    kind: EdmPrimitiveKind,
    literal: &str,
    facets: &PropertyFacets,
) -> Result<(), ValidationError> {
    check_literal(kind, literal).map_err(|e| wrong(property, e.message))?;

    if let Some(max) = facets.max_length {
        if kind == EdmPrimitiveKind::String && literal.chars().count() > max as usize {
            return Err(wrong(property, format!("length exceeds max length {max}")));
        }
    }

    if kind == EdmPrimitiveKind::Decimal {
        if let Some((int_digits, frac_digits)) = decimal_digits(literal) {
            if let Some(scale) = facets.scale {
                if frac_digits > scale as usize {
                    return Err(wrong(property, format!("more than {scale} digits after the point")));
                }
            }
            if let Some(precision) = facets.precision {
                if int_digits + frac_digits > precision as usize {
                    return Err(wrong(property, format!("more than {precision} significant digits")));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edm::SchemaContext;
    use crate::model::{Collection, EntityBuilder, ValueKind};

    fn schema() -> SchemaContext {
        let mut schema = SchemaContext::new();
        schema
            .add_property("NS.Person", "Name", PropertyFacets::new("Edm.String").not_null().max_length(5))
            .add_property("NS.Person", "Salary", PropertyFacets::new("Edm.Decimal").precision(5, Some(2)))
            .add_property("NS.Person", "Tags", PropertyFacets::new("Collection(Edm.Int32)"))
            .add_property("NS.Person", "Home", PropertyFacets::new("NS.Address"))
            .add_property("NS.Address", "Zip", PropertyFacets::new("Edm.Int32").not_null());
        schema
    }

    #[test]
    fn test_valid_entity_passes() {
        let entity = EntityBuilder::new()
            .type_name("NS.Person")
            .string("Name", "Ann")
            .decimal("Salary", "123.45")
            .string("Unknown", "anything goes")
            .complex("Home", "NS.Address", |a| a.int32("Zip", 150))
            .build();
        assert_eq!(validate_entity(&entity, &schema()), Ok(()));
    }

    #[test]
    fn test_max_length() {
        let entity = EntityBuilder::new().type_name("NS.Person").string("Name", "Annabelle").build();
        assert!(matches!(
            validate_entity(&entity, &schema()),
            Err(ValidationError::WrongPropertyValue { property, .. }) if property == "Name"
        ));
    }

    #[test]
    fn test_nullability() {
        let entity = EntityBuilder::new().type_name("NS.Person").null("Name", "Edm.String").build();
        assert_eq!(
            validate_entity(&entity, &schema()),
            Err(ValidationError::NullNotAllowed {
                property: "Name".to_string()
            })
        );
    }

    #[test]
    fn test_precision_and_scale() {
        let schema = schema();
        let too_fine = EntityBuilder::new().type_name("NS.Person").decimal("Salary", "1.234").build();
        assert!(validate_entity(&too_fine, &schema).is_err());
        let too_big = EntityBuilder::new().type_name("NS.Person").decimal("Salary", "12345.6").build();
        assert!(validate_entity(&too_big, &schema).is_err());
    }

    #[test]
    fn test_collection_items_and_nested_complex() {
        let schema = schema();
        let tags = Collection::from_items(ValueKind::Primitive, vec![Value::primitive("x")]).unwrap();
        let entity = EntityBuilder::new()
            .type_name("NS.Person")
            .collection("Tags", "Edm.Int32", tags)
            .build();
        assert!(validate_entity(&entity, &schema).is_err());

        let entity = EntityBuilder::new()
            .type_name("NS.Person")
            .complex("Home", "NS.Address", |a| a.null("Zip", "Edm.Int32"))
            .build();
        assert!(matches!(
            validate_entity(&entity, &schema),
            Err(ValidationError::NullNotAllowed { .. })
        ));
    }

    #[test]
    fn test_untyped_entity_is_skipped() {
        let entity = EntityBuilder::new().string("Name", "far too long a name").build();
        assert_eq!(validate_entity(&entity, &schema()), Ok(()));
    }
}
