//! Error types for OData payload encoding/decoding and validation.

use thiserror::Error;

/// Error categories shared by every codec entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// E001: Unbalanced or empty type expression
    MalformedTypeExpression,
    /// E002: Structurally incomplete JSON/XML document
    MalformedDocument,
    /// E003: Entity set where an entity was expected, or vice versa
    UnexpectedCollectionShape,
    /// E004: Delta record missing id/source/relationship/target
    MissingRequiredField,
    /// E005: Value not coercible to its declared kind or violating a facet
    WrongPropertyValue,
    /// E006: Value kind that needs type context the caller did not supply
    UnsupportedValueKind,
    /// E007: The output sink rejected a write
    WriteFailed,
}

impl ErrorCode {
    /// Returns the error code string (e.g., "E001").
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::MalformedTypeExpression => "E001",
            ErrorCode::MalformedDocument => "E002",
            ErrorCode::UnexpectedCollectionShape => "E003",
            ErrorCode::MissingRequiredField => "E004",
            ErrorCode::WrongPropertyValue => "E005",
            ErrorCode::UnsupportedValueKind => "E006",
            ErrorCode::WriteFailed => "E007",
        }
    }
}

/// A type expression such as `Collection(NS.Type` could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[E001] malformed type expression {expr:?}: {reason}")]
pub struct TypeExpressionError {
    pub expr: String,
    pub reason: &'static str,
}

impl TypeExpressionError {
    pub(crate) fn new(expr: &str, reason: &'static str) -> Self {
        Self { expr: expr.to_string(), reason }
    }

    pub fn code(&self) -> ErrorCode {
        ErrorCode::MalformedTypeExpression
    }
}

/// Error while reading a JSON or Atom payload.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    // === E001 ===
    #[error(transparent)]
    TypeExpression(#[from] TypeExpressionError),

    // === E002: Malformed document ===
    #[error("[E002] invalid JSON: {0}")]
    InvalidJson(String),

    #[error("[E002] invalid XML: {0}")]
    InvalidXml(String),

    #[error("[E002] unexpected end of document while reading {context}")]
    UnexpectedEof { context: &'static str },

    #[error("[E002] expected {expected} but found {found}")]
    UnexpectedElement { expected: &'static str, found: String },

    #[error("[E002] {context}: {detail}")]
    MalformedDocument { context: &'static str, detail: String },

    #[error("[E002] document nesting exceeds maximum depth {max}")]
    NestingTooDeep { max: usize },

    // === E003 ===
    #[error("[E003] expected {expected} payload but found {found}")]
    UnexpectedCollectionShape {
        expected: &'static str,
        found: &'static str,
    },

    // === E004 ===
    #[error("[E004] {record} record is missing required field {field}")]
    MissingRequiredField {
        record: &'static str,
        field: &'static str,
    },

    // === E005 ===
    #[error("[E005] wrong value for property {property}: {reason}")]
    WrongPropertyValue { property: String, reason: String },
}

impl DecodeError {
    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            DecodeError::TypeExpression(_) => ErrorCode::MalformedTypeExpression,
            DecodeError::UnexpectedCollectionShape { .. } => ErrorCode::UnexpectedCollectionShape,
            DecodeError::MissingRequiredField { .. } => ErrorCode::MissingRequiredField,
            DecodeError::WrongPropertyValue { .. } => ErrorCode::WrongPropertyValue,
            _ => ErrorCode::MalformedDocument,
        }
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        DecodeError::InvalidJson(err.to_string())
    }
}

impl From<quick_xml::Error> for DecodeError {
    fn from(err: quick_xml::Error) -> Self {
        DecodeError::InvalidXml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for DecodeError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        DecodeError::InvalidXml(err.to_string())
    }
}

/// Error while writing a JSON or Atom payload.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error(transparent)]
    TypeExpression(#[from] TypeExpressionError),

    #[error("[E004] {record} record is missing required field {field}")]
    MissingRequiredField {
        record: &'static str,
        field: &'static str,
    },

    #[error("[E005] wrong value for property {property}: {reason}")]
    WrongPropertyValue { property: String, reason: String },

    #[error("[E006] {kind} value of property {property} cannot be written without type information")]
    UnsupportedValueKind { property: String, kind: &'static str },

    #[error("[E006] {payload} payloads are not defined for OData {version}")]
    UnsupportedPayload {
        payload: &'static str,
        version: &'static str,
    },

    #[error("[E007] write failed: {0}")]
    WriteFailed(String),
}

impl EncodeError {
    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            EncodeError::TypeExpression(_) => ErrorCode::MalformedTypeExpression,
            EncodeError::MissingRequiredField { .. } => ErrorCode::MissingRequiredField,
            EncodeError::WrongPropertyValue { .. } => ErrorCode::WrongPropertyValue,
            EncodeError::UnsupportedValueKind { .. } | EncodeError::UnsupportedPayload { .. } => {
                ErrorCode::UnsupportedValueKind
            }
            EncodeError::WriteFailed(_) => ErrorCode::WriteFailed,
        }
    }
}

impl From<std::io::Error> for EncodeError {
    fn from(err: std::io::Error) -> Self {
        EncodeError::WriteFailed(err.to_string())
    }
}

impl From<quick_xml::Error> for EncodeError {
    fn from(err: quick_xml::Error) -> Self {
        EncodeError::WriteFailed(err.to_string())
    }
}

impl From<ValidationError> for EncodeError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::WrongPropertyValue { property, reason } => {
                EncodeError::WrongPropertyValue { property, reason }
            }
            ValidationError::NullNotAllowed { property } => EncodeError::WrongPropertyValue {
                property,
                reason: "null value for non-nullable property".to_string(),
            },
        }
    }
}

/// Error during facet validation against an EDM provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("[E005] wrong value for property {property}: {reason}")]
    WrongPropertyValue { property: String, reason: String },

    #[error("[E005] property {property} is not nullable")]
    NullNotAllowed { property: String },
}

impl ValidationError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::WrongPropertyValue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_prefixed_in_messages() {
        let err = DecodeError::UnexpectedCollectionShape {
            expected: "entity",
            found: "entity set",
        };
        assert_eq!(err.code(), ErrorCode::UnexpectedCollectionShape);
        assert!(err.to_string().starts_with("[E003]"));

        let err = EncodeError::MissingRequiredField {
            record: "added link",
            field: "relationship",
        };
        assert_eq!(err.code().code(), "E004");
        assert!(err.to_string().contains("relationship"));
    }

    #[test]
    fn test_validation_error_converts_to_wrong_property_value() {
        let err: EncodeError = ValidationError::NullNotAllowed {
            property: "Name".to_string(),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::WrongPropertyValue);
    }

    #[test]
    fn test_type_expression_error_keeps_its_code() {
        let err: DecodeError = TypeExpressionError::new("Collection(", "unbalanced").into();
        assert_eq!(err.code(), ErrorCode::MalformedTypeExpression);
    }
}
