//! GeoJSON sub-codec.

use std::io::Write;

use serde_json::{Map, Number, Value as Json};

use super::generator::JsonGenerator;
use crate::error::{DecodeError, EncodeError};
use crate::model::{Dimension, GeoShape, Geospatial, Line, Polygon, Position};

// =============================================================================
// ENCODING
// =============================================================================

pub fn write_geo<W: Write>(g: &mut JsonGenerator<W>, geo: &Geospatial, property: &str) -> Result<(), EncodeError> {
    g.begin_object()?;
    write_shape_members(g, &geo.shape, property)?;
    if let Some(srid) = geo.srid {
        g.key("crs")?;
        g.begin_object()?;
        g.string_field("type", "name")?;
        g.key("properties")?;
        g.begin_object()?;
        g.string_field("name", &format!("EPSG:{srid}"))?;
        g.end_object()?;
        g.end_object()?;
    }
    g.end_object()
}

fn write_shape<W: Write>(g: &mut JsonGenerator<W>, shape: &GeoShape, property: &str) -> Result<(), EncodeError> {
    g.begin_object()?;
    write_shape_members(g, shape, property)?;
    g.end_object()
}

fn write_shape_members<W: Write>(
    g: &mut JsonGenerator<W>,
    shape: &GeoShape,
    property: &str,
) -> Result<(), EncodeError> {
    g.string_field("type", shape.type_name())?;
    if let GeoShape::Collection(members) = shape {
        g.key("geometries")?;
        g.begin_array()?;
        for member in members {
            write_shape(g, member, property)?;
        }
        return g.end_array();
    }

    g.key("coordinates")?;
    match shape {
        GeoShape::Point(p) => write_position(g, p, property),
        GeoShape::LineString(line) | GeoShape::MultiPoint(line) => write_line(g, line, property),
        GeoShape::Polygon(polygon) => write_polygon(g, polygon, property),
        GeoShape::MultiLineString(lines) => {
            g.begin_array()?;
            for line in lines {
                write_line(g, line, property)?;
            }
            g.end_array()
        }
        GeoShape::MultiPolygon(polygons) => {
            g.begin_array()?;
            for polygon in polygons {
                write_polygon(g, polygon, property)?;
            }
            g.end_array()
        }
        GeoShape::Collection(_) => Ok(()),
    }
}

fn write_coordinate<W: Write>(g: &mut JsonGenerator<W>, value: f64, property: &str) -> Result<(), EncodeError> {
    let number = Number::from_f64(value).ok_or_else(|| EncodeError::WrongPropertyValue {
        property: property.to_string(),
        reason: format!("coordinate {value} is not finite"),
    })?;
    g.number(&number.to_string())
}

fn write_position<W: Write>(g: &mut JsonGenerator<W>, p: &Position, property: &str) -> Result<(), EncodeError> {
    g.begin_array()?;
    write_coordinate(g, p.x, property)?;
    write_coordinate(g, p.y, property)?;
    if let Some(z) = p.z {
        write_coordinate(g, z, property)?;
    }
    g.end_array()
}

fn write_line<W: Write>(g: &mut JsonGenerator<W>, line: &Line, property: &str) -> Result<(), EncodeError> {
    g.begin_array()?;
    for p in line {
        write_position(g, p, property)?;
    }
    g.end_array()
}

fn write_polygon<W: Write>(g: &mut JsonGenerator<W>, polygon: &Polygon, property: &str) -> Result<(), EncodeError> {
    g.begin_array()?;
    write_line(g, &polygon.exterior, property)?;
    for ring in &polygon.interiors {
        write_line(g, ring, property)?;
    }
    g.end_array()
}

// =============================================================================
// DECODING
// =============================================================================

fn wrong(property: &str, reason: impl Into<String>) -> DecodeError {
    DecodeError::WrongPropertyValue {
        property: property.to_string(),
        reason: reason.into(),
    }
}

/// Reads a GeoJSON object of the given dimension.
pub fn read_geo(node: &Json, dimension: Dimension, property: &str) -> Result<Geospatial, DecodeError> {
    let obj = node
        .as_object()
        .ok_or_else(|| wrong(property, "geospatial value must be a GeoJSON object"))?;
    let shape = read_shape(obj, property)?;
    let srid = obj
        .get("crs")
        .and_then(|crs| crs.pointer("/properties/name"))
        .and_then(Json::as_str)
        .map(|name| {
            name.rsplit(':')
                .next()
                .and_then(|code| code.parse::<u32>().ok())
                .ok_or_else(|| wrong(property, format!("unrecognized crs name {name:?}")))
        })
        .transpose()?;
    Ok(Geospatial { dimension, srid, shape })
}

fn read_shape(obj: &Map<String, Json>, property: &str) -> Result<GeoShape, DecodeError> {
    let kind = obj
        .get("type")
        .and_then(Json::as_str)
        .ok_or_else(|| wrong(property, "GeoJSON object without type"))?;

    if kind == "GeometryCollection" {
        let members = obj
            .get("geometries")
            .and_then(Json::as_array)
            .ok_or_else(|| wrong(property, "GeometryCollection without geometries"))?;
        return members
            .iter()
            .map(|m| {
                m.as_object()
                    .ok_or_else(|| wrong(property, "geometry must be an object"))
                    .and_then(|o| read_shape(o, property))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(GeoShape::Collection);
    }

    let coords = obj
        .get("coordinates")
        .ok_or_else(|| wrong(property, "GeoJSON object without coordinates"))?;
    match kind {
        "Point" => Ok(GeoShape::Point(read_position(coords, property)?)),
        "LineString" => Ok(GeoShape::LineString(read_line(coords, property)?)),
        "MultiPoint" => Ok(GeoShape::MultiPoint(read_line(coords, property)?)),
        "Polygon" => Ok(GeoShape::Polygon(read_polygon(coords, property)?)),
        "MultiLineString" => Ok(GeoShape::MultiLineString(
            array(coords, property)?
                .iter()
                .map(|l| read_line(l, property))
                .collect::<Result<_, _>>()?,
        )),
        "MultiPolygon" => Ok(GeoShape::MultiPolygon(
            array(coords, property)?
                .iter()
                .map(|p| read_polygon(p, property))
                .collect::<Result<_, _>>()?,
        )),
        other => Err(wrong(property, format!("unknown GeoJSON type {other:?}"))),
    }
}

fn array<'a>(node: &'a Json, property: &str) -> Result<&'a Vec<Json>, DecodeError> {
    node.as_array()
        .ok_or_else(|| wrong(property, "coordinates must be arrays"))
}

fn read_position(node: &Json, property: &str) -> Result<Position, DecodeError> {
    let values = array(node, property)?
        .iter()
        .map(|v| v.as_f64().ok_or_else(|| wrong(property, "coordinate must be a number")))
        .collect::<Result<Vec<f64>, _>>()?;
    match values.as_slice() {
        [x, y] => Ok(Position::new(*x, *y)),
        [x, y, z, ..] => Ok(Position::with_z(*x, *y, *z)),
        _ => Err(wrong(property, "position needs at least two coordinates")),
    }
}

fn read_line(node: &Json, property: &str) -> Result<Line, DecodeError> {
    array(node, property)?
        .iter()
        .map(|p| read_position(p, property))
        .collect()
}

fn read_polygon(node: &Json, property: &str) -> Result<Polygon, DecodeError> {
    let mut rings = array(node, property)?
        .iter()
        .map(|r| read_line(r, property))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter();
    let exterior = rings.next().unwrap_or_default();
    Ok(Polygon {
        exterior,
        interiors: rings.collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(geo: &Geospatial) -> String {
        let mut buf = Vec::new();
        let mut g = JsonGenerator::new(&mut buf);
        write_geo(&mut g, geo, "Location").unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_point_with_crs() {
        let geo = Geospatial::point(Dimension::Geography, 10.5, 59.0).with_srid(4326);
        let json = encode(&geo);
        assert_eq!(
            json,
            r#"{"type":"Point","coordinates":[10.5,59.0],"crs":{"type":"name","properties":{"name":"EPSG:4326"}}}"#
        );
        let node: Json = serde_json::from_str(&json).unwrap();
        assert_eq!(read_geo(&node, Dimension::Geography, "Location").unwrap(), geo);
    }

    #[test]
    fn test_polygon_and_collection() {
        let ring = vec![
            Position::new(0.0, 0.0),
            Position::new(1.0, 0.0),
            Position::new(1.0, 1.0),
            Position::new(0.0, 0.0),
        ];
        let shape = GeoShape::Collection(vec![
            GeoShape::Polygon(Polygon {
                exterior: ring.clone(),
                interiors: vec![],
            }),
            GeoShape::MultiPoint(ring),
        ]);
        let geo = Geospatial::new(Dimension::Geometry, shape);
        let node: Json = serde_json::from_str(&encode(&geo)).unwrap();
        assert_eq!(read_geo(&node, Dimension::Geometry, "Area").unwrap(), geo);
    }

    #[test]
    fn test_non_finite_coordinate_rejected() {
        let geo = Geospatial::point(Dimension::Geometry, f64::NAN, 0.0);
        let mut buf = Vec::new();
        let mut g = JsonGenerator::new(&mut buf);
        assert!(write_geo(&mut g, &geo, "P").is_err());
    }
}
