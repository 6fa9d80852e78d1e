//! Edm primitive type kinds.

/// Namespace of the built-in primitive types.
pub const EDM_NAMESPACE: &str = "Edm";

/// Built-in primitive types (CSDL), including the pre-v4 `DateTime` and `Time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdmPrimitiveKind {
    Binary,
    Boolean,
    Byte,
    Date,
    DateTime,
    DateTimeOffset,
    Decimal,
    Double,
    Duration,
    Guid,
    Int16,
    Int32,
    Int64,
    SByte,
    Single,
    Stream,
    String,
    Time,
    TimeOfDay,
    Geography,
    GeographyPoint,
    GeographyLineString,
    GeographyPolygon,
    GeographyMultiPoint,
    GeographyMultiLineString,
    GeographyMultiPolygon,
    GeographyCollection,
    Geometry,
    GeometryPoint,
    GeometryLineString,
    GeometryPolygon,
    GeometryMultiPoint,
    GeometryMultiLineString,
    GeometryMultiPolygon,
    GeometryCollection,
}

const ALL_KINDS: [EdmPrimitiveKind; 35] = [
    EdmPrimitiveKind::Binary,
    EdmPrimitiveKind::Boolean,
    EdmPrimitiveKind::Byte,
    EdmPrimitiveKind::Date,
    EdmPrimitiveKind::DateTime,
    EdmPrimitiveKind::DateTimeOffset,
    EdmPrimitiveKind::Decimal,
    EdmPrimitiveKind::Double,
    EdmPrimitiveKind::Duration,
    EdmPrimitiveKind::Guid,
    EdmPrimitiveKind::Int16,
    EdmPrimitiveKind::Int32,
    EdmPrimitiveKind::Int64,
    EdmPrimitiveKind::SByte,
    EdmPrimitiveKind::Single,
    EdmPrimitiveKind::Stream,
    EdmPrimitiveKind::String,
    EdmPrimitiveKind::Time,
    EdmPrimitiveKind::TimeOfDay,
    EdmPrimitiveKind::Geography,
    EdmPrimitiveKind::GeographyPoint,
    EdmPrimitiveKind::GeographyLineString,
    EdmPrimitiveKind::GeographyPolygon,
    EdmPrimitiveKind::GeographyMultiPoint,
    EdmPrimitiveKind::GeographyMultiLineString,
    EdmPrimitiveKind::GeographyMultiPolygon,
    EdmPrimitiveKind::GeographyCollection,
    EdmPrimitiveKind::Geometry,
    EdmPrimitiveKind::GeometryPoint,
    EdmPrimitiveKind::GeometryLineString,
    EdmPrimitiveKind::GeometryPolygon,
    EdmPrimitiveKind::GeometryMultiPoint,
    EdmPrimitiveKind::GeometryMultiLineString,
    EdmPrimitiveKind::GeometryMultiPolygon,
    EdmPrimitiveKind::GeometryCollection,
];

impl EdmPrimitiveKind {
    /// Unqualified name, e.g. `Int32`.
    pub fn name(&self) -> &'static str {
        use EdmPrimitiveKind::*;
        match self {
            Binary => "Binary",
            Boolean => "Boolean",
            Byte => "Byte",
            Date => "Date",
            DateTime => "DateTime",
            DateTimeOffset => "DateTimeOffset",
            Decimal => "Decimal",
            Double => "Double",
            Duration => "Duration",
            Guid => "Guid",
            Int16 => "Int16",
            Int32 => "Int32",
            Int64 => "Int64",
            SByte => "SByte",
            Single => "Single",
            Stream => "Stream",
            String => "String",
            Time => "Time",
            TimeOfDay => "TimeOfDay",
            Geography => "Geography",
            GeographyPoint => "GeographyPoint",
            GeographyLineString => "GeographyLineString",
            GeographyPolygon => "GeographyPolygon",
            GeographyMultiPoint => "GeographyMultiPoint",
            GeographyMultiLineString => "GeographyMultiLineString",
            GeographyMultiPolygon => "GeographyMultiPolygon",
            GeographyCollection => "GeographyCollection",
            Geometry => "Geometry",
            GeometryPoint => "GeometryPoint",
            GeometryLineString => "GeometryLineString",
            GeometryPolygon => "GeometryPolygon",
            GeometryMultiPoint => "GeometryMultiPoint",
            GeometryMultiLineString => "GeometryMultiLineString",
            GeometryMultiPolygon => "GeometryMultiPolygon",
            GeometryCollection => "GeometryCollection",
        }
    }

    /// Namespace-qualified name, e.g. `Edm.Int32`.
    pub fn full_name(&self) -> String {
        format!("{EDM_NAMESPACE}.{}", self.name())
    }

    /// Looks up a kind by unqualified (`Int32`) or qualified (`Edm.Int32`) name.
    pub fn from_name(name: &str) -> Option<EdmPrimitiveKind> {
        let bare = name.strip_prefix("Edm.").unwrap_or(name);
        ALL_KINDS.iter().copied().find(|k| k.name() == bare)
    }

    /// Kinds written as JSON numbers.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            EdmPrimitiveKind::Byte
                | EdmPrimitiveKind::SByte
                | EdmPrimitiveKind::Int16
                | EdmPrimitiveKind::Int32
                | EdmPrimitiveKind::Int64
                | EdmPrimitiveKind::Single
                | EdmPrimitiveKind::Double
                | EdmPrimitiveKind::Decimal
        )
    }

    /// Integral kinds.
    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            EdmPrimitiveKind::Byte
                | EdmPrimitiveKind::SByte
                | EdmPrimitiveKind::Int16
                | EdmPrimitiveKind::Int32
                | EdmPrimitiveKind::Int64
        )
    }

    pub fn is_geospatial(&self) -> bool {
        self.is_geography() || self.is_geometry()
    }

    pub fn is_geography(&self) -> bool {
        self.name().starts_with("Geography")
    }

    pub fn is_geometry(&self) -> bool {
        self.name().starts_with("Geometry")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_accepts_both_spellings() {
        assert_eq!(EdmPrimitiveKind::from_name("Int32"), Some(EdmPrimitiveKind::Int32));
        assert_eq!(EdmPrimitiveKind::from_name("Edm.Int32"), Some(EdmPrimitiveKind::Int32));
        assert_eq!(EdmPrimitiveKind::from_name("NS.Int32"), None);
        assert_eq!(EdmPrimitiveKind::from_name("Person"), None);
    }

    #[test]
    fn test_names_roundtrip_for_every_kind() {
        for kind in ALL_KINDS {
            assert_eq!(EdmPrimitiveKind::from_name(&kind.full_name()), Some(kind));
        }
    }

    #[test]
    fn test_kind_families() {
        assert!(EdmPrimitiveKind::Decimal.is_numeric());
        assert!(!EdmPrimitiveKind::Decimal.is_integral());
        assert!(!EdmPrimitiveKind::Boolean.is_numeric());
        assert!(EdmPrimitiveKind::GeographyPoint.is_geography());
        assert!(EdmPrimitiveKind::GeometryCollection.is_geometry());
        assert!(!EdmPrimitiveKind::Guid.is_geospatial());
    }
}
