//! Type-expression parsing and per-version rendering.
//!
//! A type expression is what travels in `@odata.type`, `m:type` and
//! `category/@term`: `Edm.Int32`, `#Int32`, `Collection(Edm.String)`,
//! `#Collection(NS.Address)`, `NS.Person`, or (pre-v4) a bare `Person`.

use std::fmt;

use crate::edm::kind::{EdmPrimitiveKind, EDM_NAMESPACE};
use crate::error::TypeExpressionError;
use crate::version::ODataVersion;

const COLLECTION_PREFIX: &str = "Collection(";

/// A parsed type expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    collection: bool,
    namespace: String,
    name: String,
    primitive: Option<EdmPrimitiveKind>,
}

impl TypeInfo {
    /// Parses a type expression.
    ///
    /// Fails when parentheses are unbalanced, when anything other than
    /// `Collection(...)` uses them, or when the (inner) name is empty.
    pub fn parse(expr: &str) -> Result<TypeInfo, TypeExpressionError> {
        let trimmed = expr.trim();
        let body = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if body.is_empty() {
            return Err(TypeExpressionError::new(expr, "empty expression"));
        }

        let opens = body.matches('(').count();
        let closes = body.matches(')').count();
        if opens != closes {
            return Err(TypeExpressionError::new(expr, "unbalanced parentheses"));
        }

        let (collection, inner) = if opens == 0 {
            (false, body)
        } else {
            let inner = body
                .strip_prefix(COLLECTION_PREFIX)
                .and_then(|rest| rest.strip_suffix(')'))
                .ok_or_else(|| TypeExpressionError::new(expr, "parentheses outside Collection(...)"))?;
            if inner.contains('(') || inner.contains(')') {
                return Err(TypeExpressionError::new(expr, "nested collection"));
            }
            (true, inner.trim())
        };

        if inner.is_empty() {
            return Err(TypeExpressionError::new(expr, "empty inner expression"));
        }

        let mut info = Self::named(inner);
        info.collection = collection;
        Ok(info)
    }

    /// Type info for a primitive kind.
    pub fn primitive(kind: EdmPrimitiveKind) -> TypeInfo {
        TypeInfo {
            collection: false,
            namespace: EDM_NAMESPACE.to_string(),
            name: kind.name().to_string(),
            primitive: Some(kind),
        }
    }

    /// Type info for a (possibly qualified) non-collection name.
    fn named(qualified: &str) -> TypeInfo {
        if let Some(kind) = EdmPrimitiveKind::from_name(qualified) {
            return Self::primitive(kind);
        }
        let (namespace, name) = match qualified.rfind('.') {
            Some(dot) => (&qualified[..dot], &qualified[dot + 1..]),
            None => ("", qualified),
        };
        TypeInfo {
            collection: false,
            namespace: namespace.to_string(),
            name: name.to_string(),
            primitive: None,
        }
    }

    /// Returns the collection type whose element is `self`.
    pub fn into_collection(mut self) -> TypeInfo {
        self.collection = true;
        self
    }

    /// Returns the element type (identity for non-collections).
    pub fn element(&self) -> TypeInfo {
        TypeInfo {
            collection: false,
            ..self.clone()
        }
    }

    pub fn is_collection(&self) -> bool {
        self.collection
    }

    pub fn is_primitive(&self) -> bool {
        self.primitive.is_some()
    }

    pub fn is_geospatial(&self) -> bool {
        self.primitive.is_some_and(|k| k.is_geospatial())
    }

    pub fn primitive_kind(&self) -> Option<EdmPrimitiveKind> {
        self.primitive
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `Namespace.Name`, or just `Name` for un-namespaced pre-v4 names.
    pub fn qualified_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    /// Renders the expression as it appears on the wire for `version`.
    ///
    /// v4 and v4.01 write primitive types unqualified and prefix the whole
    /// expression with `#` (`#Int32`, `#Collection(NS.Address)`). Earlier
    /// dialects write the qualified name unchanged (`Edm.Int32`,
    /// `Collection(Edm.String)`). Existing clients depend on both spellings.
    pub fn render_external(&self, version: ODataVersion) -> String {
        let base = match (version.is_v4(), self.primitive) {
            (true, Some(kind)) => kind.name().to_string(),
            _ => self.qualified_name(),
        };
        let wrapped = if self.collection {
            format!("{COLLECTION_PREFIX}{base})")
        } else {
            base
        };
        if version.is_v4() {
            format!("#{wrapped}")
        } else {
            wrapped
        }
    }
}

impl fmt::Display for TypeInfo {
    /// Canonical internal spelling: `Collection(Edm.Int32)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.collection {
            write!(f, "{COLLECTION_PREFIX}{})", self.qualified_name())
        } else {
            f.write_str(&self.qualified_name())
        }
    }
}
