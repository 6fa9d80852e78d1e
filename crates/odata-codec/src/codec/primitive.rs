//! Primitive literal shaping and the minimal-metadata annotation rule.
//!
//! Both directions of the JSON codec agree on one question: given a
//! literal and (maybe) its declared kind, what JSON shape does it take, and
//! what kind would a reader with no type information infer back from that
//! shape? The minimal-metadata economy rule is the difference between the
//! two.
//!
//! [`resolve_type`] and [`check_value`] are format-neutral and shared with
//! the Atom serializer.

use serde_json::Number;

use crate::edm::{check_literal, EdmPrimitiveKind, TypeInfo};
use crate::error::EncodeError;
use crate::model::{Property, Value};

/// JSON shape of a primitive literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    Number,
    Boolean,
    String,
}

/// True when `literal` is a JSON number token as written.
pub fn is_json_number(literal: &str) -> bool {
    !literal.is_empty()
        && literal.trim() == literal
        && serde_json::from_str::<Number>(literal).is_ok()
}

/// Decides how a literal is written.
///
/// Numeric kinds become numbers and `Edm.Boolean` a boolean; with no kind
/// the literal's own form decides. In IEEE754-compatible mode `Int64` and
/// `Decimal` are always strings.
pub fn json_shape(kind: Option<EdmPrimitiveKind>, literal: &str, ieee754: bool) -> JsonShape {
    match kind {
        Some(EdmPrimitiveKind::Int64 | EdmPrimitiveKind::Decimal) if ieee754 => JsonShape::String,
        Some(k) if k.is_numeric() => {
            if is_json_number(literal) {
                JsonShape::Number
            } else {
                // NaN, INF and -INF have no JSON number form.
                JsonShape::String
            }
        }
        Some(EdmPrimitiveKind::Boolean) if is_boolean(literal) => JsonShape::Boolean,
        Some(_) => JsonShape::String,
        None if is_json_number(literal) => JsonShape::Number,
        None if is_boolean(literal) => JsonShape::Boolean,
        None => JsonShape::String,
    }
}

fn is_boolean(literal: &str) -> bool {
    literal == "true" || literal == "false"
}

/// The kind a reader without type information infers from a written shape.
pub fn inferred_kind(shape: JsonShape, literal: &str) -> EdmPrimitiveKind {
    match shape {
        JsonShape::Boolean => EdmPrimitiveKind::Boolean,
        JsonShape::String => EdmPrimitiveKind::String,
        JsonShape::Number => {
            if literal.parse::<i32>().is_ok() {
                EdmPrimitiveKind::Int32
            } else if literal.parse::<i64>().is_ok() {
                EdmPrimitiveKind::Int64
            } else if literal.bytes().all(|b| b.is_ascii_digit() || b == b'-') {
                EdmPrimitiveKind::Decimal
            } else {
                EdmPrimitiveKind::Double
            }
        }
    }
}

/// True when a typed primitive must carry its type at minimal metadata:
/// its written shape would be read back as a different kind.
pub fn primitive_needs_annotation(kind: EdmPrimitiveKind, literal: &str, ieee754: bool) -> bool {
    if kind.is_geospatial() {
        return true;
    }
    if !(kind.is_numeric() || kind == EdmPrimitiveKind::Boolean) {
        return false;
    }
    let shape = json_shape(Some(kind), literal, ieee754);
    inferred_kind(shape, literal) != kind
}

/// Minimal-metadata rule for a whole value of declared type `info`.
///
/// Complex values are handled by the caller, which knows the EDM-declared
/// base type.
pub fn value_needs_annotation(info: &TypeInfo, value: &Value, ieee754: bool) -> bool {
    let Some(kind) = info.primitive_kind() else {
        return value.is_null();
    };
    match value {
        Value::Null => true,
        Value::Primitive(literal) => primitive_needs_annotation(kind, literal, ieee754),
        Value::Geospatial(_) => true,
        Value::Collection(items) => items.iter().any(|item| match item {
            Value::Primitive(literal) => primitive_needs_annotation(kind, literal, ieee754),
            Value::Geospatial(_) => true,
            _ => false,
        }),
        _ => false,
    }
}

/// Checks a literal against its declared kind.
pub fn check_property_literal(
    property: &str,
    kind: EdmPrimitiveKind,
    literal: &str,
) -> Result<(), EncodeError> {
    check_literal(kind, literal).map_err(|e| EncodeError::WrongPropertyValue {
        property: property.to_string(),
        reason: e.message,
    })
}

/// Literal text of a scalar JSON node (`None` for null, arrays and objects).
pub fn scalar_literal(node: &serde_json::Value) -> Option<String> {
    match node {
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// Type of a property: explicit, else declared by the model, else implied
/// by a geospatial value.
pub fn resolve_type(property: &Property, declared: Option<&str>) -> Result<Option<TypeInfo>, EncodeError> {
    let expr = property
        .type_name
        .clone()
        .or_else(|| declared.map(str::to_string))
        .or_else(|| match &property.value {
            Value::Geospatial(geo) => Some(geo.edm_kind().full_name()),
            Value::Collection(items) => items
                .iter()
                .find_map(Value::as_geospatial)
                .map(|geo| format!("Collection({})", geo.edm_kind().full_name())),
            _ => None,
        });
    Ok(expr.as_deref().map(TypeInfo::parse).transpose()?)
}

/// Literal coercibility and "enum needs a type" checks.
pub fn check_value(name: &str, info: Option<&TypeInfo>, value: &Value) -> Result<(), EncodeError> {
    match value {
        Value::Primitive(literal) => {
            if let Some(kind) = info.and_then(TypeInfo::primitive_kind) {
                check_property_literal(name, kind, literal)?;
            }
            Ok(())
        }
        Value::Enum(_) if info.is_none() => Err(EncodeError::UnsupportedValueKind {
            property: name.to_string(),
            kind: "enum",
        }),
        Value::Collection(items) => {
            let element = info.map(TypeInfo::element);
            items
                .iter()
                .try_for_each(|item| check_value(name, element.as_ref(), item))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use EdmPrimitiveKind::*;

    #[test]
    fn test_json_number_detection() {
        assert!(is_json_number("42"));
        assert!(is_json_number("-1.5e10"));
        assert!(!is_json_number("+5"));
        assert!(!is_json_number(" 5"));
        assert!(!is_json_number("1."));
        assert!(!is_json_number("INF"));
        assert!(!is_json_number(""));
    }

    #[test]
    fn test_shapes_follow_declared_kind() {
        assert_eq!(json_shape(Some(Int32), "42", false), JsonShape::Number);
        assert_eq!(json_shape(Some(String), "42", false), JsonShape::String);
        assert_eq!(json_shape(Some(Boolean), "true", false), JsonShape::Boolean);
        assert_eq!(json_shape(Some(Double), "NaN", false), JsonShape::String);
        assert_eq!(json_shape(None, "42", false), JsonShape::Number);
        assert_eq!(json_shape(None, "false", false), JsonShape::Boolean);
        assert_eq!(json_shape(None, "abc", false), JsonShape::String);
    }

    #[test]
    fn test_ieee754_forces_strings_for_wide_kinds() {
        assert_eq!(json_shape(Some(Int64), "9223372036854775807", true), JsonShape::String);
        assert_eq!(json_shape(Some(Decimal), "34", true), JsonShape::String);
        assert_eq!(json_shape(Some(Int32), "34", true), JsonShape::Number);
        assert_eq!(json_shape(Some(Int64), "9223372036854775807", false), JsonShape::Number);
    }

    #[test]
    fn test_minimal_annotation_rule() {
        assert!(!primitive_needs_annotation(Int32, "42", false));
        assert!(primitive_needs_annotation(Int64, "42", false));
        assert!(!primitive_needs_annotation(Int64, "9223372036854775807", false));
        assert!(primitive_needs_annotation(Int64, "9223372036854775807", true));
        assert!(primitive_needs_annotation(Decimal, "34", false));
        assert!(!primitive_needs_annotation(Double, "1.5", false));
        assert!(primitive_needs_annotation(Double, "2", false));
        assert!(!primitive_needs_annotation(Boolean, "true", false));
        assert!(!primitive_needs_annotation(String, "x", false));
        assert!(!primitive_needs_annotation(Guid, "01234567-89ab-cdef-0123-456789abcdef", false));
        assert!(primitive_needs_annotation(GeographyPoint, "", false));
    }

    #[test]
    fn test_typed_null_is_annotated() {
        let info = TypeInfo::primitive(String);
        assert!(value_needs_annotation(&info, &Value::Null, false));
        assert!(!value_needs_annotation(&info, &Value::primitive("x"), false));
    }
}
