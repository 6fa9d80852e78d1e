//! Geospatial values.

use std::hash::{Hash, Hasher};

use crate::edm::EdmPrimitiveKind;
use crate::limits::{DEFAULT_GEOGRAPHY_SRID, DEFAULT_GEOMETRY_SRID};

/// Round-earth geography or flat-earth geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Geography,
    Geometry,
}

/// A coordinate. Equality is bitwise so positions can be hashed.
#[derive(Debug, Clone, Copy)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }

    pub fn with_z(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z: Some(z) }
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.x.to_bits() == other.x.to_bits()
            && self.y.to_bits() == other.y.to_bits()
            && self.z.map(f64::to_bits) == other.z.map(f64::to_bits)
    }
}

impl Eq for Position {}

impl Hash for Position {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.x.to_bits().hash(state);
        self.y.to_bits().hash(state);
        self.z.map(f64::to_bits).hash(state);
    }
}

/// Linear ring or line: an ordered list of positions.
pub type Line = Vec<Position>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Polygon {
    pub exterior: Line,
    pub interiors: Vec<Line>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GeoShape {
    Point(Position),
    LineString(Line),
    Polygon(Polygon),
    MultiPoint(Vec<Position>),
    MultiLineString(Vec<Line>),
    MultiPolygon(Vec<Polygon>),
    Collection(Vec<GeoShape>),
}

impl GeoShape {
    /// GeoJSON `type` / GML element stem.
    pub fn type_name(&self) -> &'static str {
        match self {
            GeoShape::Point(_) => "Point",
            GeoShape::LineString(_) => "LineString",
            GeoShape::Polygon(_) => "Polygon",
            GeoShape::MultiPoint(_) => "MultiPoint",
            GeoShape::MultiLineString(_) => "MultiLineString",
            GeoShape::MultiPolygon(_) => "MultiPolygon",
            GeoShape::Collection(_) => "GeometryCollection",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Geospatial {
    pub dimension: Dimension,
    pub srid: Option<u32>,
    pub shape: GeoShape,
}

impl Geospatial {
    pub fn new(dimension: Dimension, shape: GeoShape) -> Self {
        Self {
            dimension,
            srid: None,
            shape,
        }
    }

    pub fn point(dimension: Dimension, x: f64, y: f64) -> Self {
        Self::new(dimension, GeoShape::Point(Position::new(x, y)))
    }

    pub fn with_srid(mut self, srid: u32) -> Self {
        self.srid = Some(srid);
        self
    }

    /// SRID to put on the wire: explicit, or the dimension's default.
    pub fn effective_srid(&self) -> u32 {
        self.srid.unwrap_or(match self.dimension {
            Dimension::Geography => DEFAULT_GEOGRAPHY_SRID,
            Dimension::Geometry => DEFAULT_GEOMETRY_SRID,
        })
    }

    /// The Edm primitive kind describing this value.
    pub fn edm_kind(&self) -> EdmPrimitiveKind {
        use EdmPrimitiveKind::*;
        match (self.dimension, &self.shape) {
            (Dimension::Geography, GeoShape::Point(_)) => GeographyPoint,
            (Dimension::Geography, GeoShape::LineString(_)) => GeographyLineString,
            (Dimension::Geography, GeoShape::Polygon(_)) => GeographyPolygon,
            (Dimension::Geography, GeoShape::MultiPoint(_)) => GeographyMultiPoint,
            (Dimension::Geography, GeoShape::MultiLineString(_)) => GeographyMultiLineString,
            (Dimension::Geography, GeoShape::MultiPolygon(_)) => GeographyMultiPolygon,
            (Dimension::Geography, GeoShape::Collection(_)) => GeographyCollection,
            (Dimension::Geometry, GeoShape::Point(_)) => GeometryPoint,
            (Dimension::Geometry, GeoShape::LineString(_)) => GeometryLineString,
            (Dimension::Geometry, GeoShape::Polygon(_)) => GeometryPolygon,
            (Dimension::Geometry, GeoShape::MultiPoint(_)) => GeometryMultiPoint,
            (Dimension::Geometry, GeoShape::MultiLineString(_)) => GeometryMultiLineString,
            (Dimension::Geometry, GeoShape::MultiPolygon(_)) => GeometryMultiPolygon,
            (Dimension::Geometry, GeoShape::Collection(_)) => GeometryCollection,
        }
    }
}

impl Dimension {
    /// Dimension of a geospatial Edm kind.
    pub fn of(kind: EdmPrimitiveKind) -> Option<Dimension> {
        if kind.is_geography() {
            Some(Dimension::Geography)
        } else if kind.is_geometry() {
            Some(Dimension::Geometry)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edm_kind_and_default_srid() {
        let p = Geospatial::point(Dimension::Geography, 10.0, 59.9);
        assert_eq!(p.edm_kind(), EdmPrimitiveKind::GeographyPoint);
        assert_eq!(p.effective_srid(), 4326);

        let g = Geospatial::new(Dimension::Geometry, GeoShape::MultiPoint(vec![])).with_srid(3857);
        assert_eq!(g.edm_kind(), EdmPrimitiveKind::GeometryMultiPoint);
        assert_eq!(g.effective_srid(), 3857);
    }

    #[test]
    fn test_position_equality_is_bitwise() {
        assert_eq!(Position::new(1.0, 2.0), Position::new(1.0, 2.0));
        assert_ne!(Position::new(1.0, 2.0), Position::with_z(1.0, 2.0, 0.0));
        assert_eq!(Position::new(f64::NAN, 0.0), Position::new(f64::NAN, 0.0));
    }
}
