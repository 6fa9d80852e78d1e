//! GML sub-codec.
//!
//! Positions are written as `gml:pos` ("x y" or "x y z"). The SRID rides on
//! the outermost shape as an EPSG `gml:srsName`.

use std::io::Write;

use super::reader::{Element, XmlCursor};
use super::writer::{Attrs, XmlWriter};
use crate::error::{DecodeError, EncodeError};
use crate::model::{Dimension, GeoShape, Geospatial, Line, Polygon, Position};
use crate::names::atom::{QName, GML_NS};

const SRS_PREFIX: &str = "http://www.opengis.net/def/crs/EPSG/0/";

const fn gml(local: &'static str) -> QName {
    QName::new(GML_NS, "gml", local)
}

const SRS_NAME: QName = gml("srsName");

// =============================================================================
// ENCODING
// =============================================================================

/// Writes `geo` as the content of the current element.
pub fn write_gml<W: Write>(w: &mut XmlWriter<W>, geo: &Geospatial, property: &str) -> Result<(), EncodeError> {
    let srs = geo.srid.map(|srid| format!("{SRS_PREFIX}{srid}"));
    write_shape(w, &geo.shape, srs.as_deref(), property)
}

fn element_name(shape: &GeoShape) -> &'static str {
    match shape {
        GeoShape::Point(_) => "Point",
        GeoShape::LineString(_) => "LineString",
        GeoShape::Polygon(_) => "Polygon",
        GeoShape::MultiPoint(_) => "MultiPoint",
        GeoShape::MultiLineString(_) => "MultiCurve",
        GeoShape::MultiPolygon(_) => "MultiSurface",
        GeoShape::Collection(_) => "MultiGeometry",
    }
}

fn write_shape<W: Write>(
    w: &mut XmlWriter<W>,
    shape: &GeoShape,
    srs: Option<&str>,
    property: &str,
) -> Result<(), EncodeError> {
    let attrs = match srs {
        Some(srs) => Attrs::new().qualified(&SRS_NAME, srs),
        None => Attrs::new(),
    };
    w.start(&gml(element_name(shape)).prefixed(), attrs)?;
    match shape {
        GeoShape::Point(p) => write_pos(w, p, property)?,
        GeoShape::LineString(line) => write_line(w, line, property)?,
        GeoShape::Polygon(polygon) => write_rings(w, polygon, property)?,
        GeoShape::MultiPoint(points) => {
            w.start("gml:pointMembers", Attrs::new())?;
            for p in points {
                w.start("gml:Point", Attrs::new())?;
                write_pos(w, p, property)?;
                w.end()?;
            }
            w.end()?;
        }
        GeoShape::MultiLineString(lines) => {
            w.start("gml:curveMembers", Attrs::new())?;
            for line in lines {
                w.start("gml:LineString", Attrs::new())?;
                write_line(w, line, property)?;
                w.end()?;
            }
            w.end()?;
        }
        GeoShape::MultiPolygon(polygons) => {
            w.start("gml:surfaceMembers", Attrs::new())?;
            for polygon in polygons {
                w.start("gml:Polygon", Attrs::new())?;
                write_rings(w, polygon, property)?;
                w.end()?;
            }
            w.end()?;
        }
        GeoShape::Collection(members) => {
            w.start("gml:geometryMembers", Attrs::new())?;
            for member in members {
                write_shape(w, member, None, property)?;
            }
            w.end()?;
        }
    }
    w.end()
}

fn coordinate(value: f64, property: &str) -> Result<String, EncodeError> {
    if !value.is_finite() {
        return Err(EncodeError::WrongPropertyValue {
            property: property.to_string(),
            reason: format!("coordinate {value} is not finite"),
        });
    }
    Ok(value.to_string())
}

fn write_pos<W: Write>(w: &mut XmlWriter<W>, p: &Position, property: &str) -> Result<(), EncodeError> {
    let mut text = format!("{} {}", coordinate(p.x, property)?, coordinate(p.y, property)?);
    if let Some(z) = p.z {
        text.push(' ');
        text.push_str(&coordinate(z, property)?);
    }
    w.text_element("gml:pos", Attrs::new(), &text)
}

fn write_line<W: Write>(w: &mut XmlWriter<W>, line: &Line, property: &str) -> Result<(), EncodeError> {
    for p in line {
        write_pos(w, p, property)?;
    }
    Ok(())
}

fn write_rings<W: Write>(w: &mut XmlWriter<W>, polygon: &Polygon, property: &str) -> Result<(), EncodeError> {
    let rings = std::iter::once(("gml:exterior", &polygon.exterior))
        .chain(polygon.interiors.iter().map(|ring| ("gml:interior", ring)));
    for (tag, ring) in rings {
        w.start(tag, Attrs::new())?;
        w.start("gml:LinearRing", Attrs::new())?;
        write_line(w, ring, property)?;
        w.end()?;
        w.end()?;
    }
    Ok(())
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

/// Reads the GML shape `element` (already consumed as a start tag).
pub fn read_gml(
    cursor: &mut XmlCursor<'_>,
    element: &Element,
    dimension: Dimension,
    property: &str,
) -> Result<Geospatial, DecodeError> {
    let srid = element
        .attr(&SRS_NAME)
        .map(|name| {
            name.rsplit(|c| c == '/' || c == ':')
                .next()
                .and_then(|code| code.parse::<u32>().ok())
                .ok_or_else(|| wrong(property, format!("unrecognized srsName {name:?}")))
        })
        .transpose()?;
    let shape = read_shape(cursor, element, property)?;
    Ok(Geospatial { dimension, srid, shape })
}

fn read_shape(cursor: &mut XmlCursor<'_>, element: &Element, property: &str) -> Result<GeoShape, DecodeError> {
    if element.namespace != GML_NS {
        return Err(wrong(property, format!("expected a GML shape, found {}", element.display_name())));
    }
    match element.local.as_str() {
        "Point" => read_positions(cursor, element, property)?
            .into_iter()
            .next()
            .map(GeoShape::Point)
            .ok_or_else(|| wrong(property, "Point without a position")),
        "LineString" => Ok(GeoShape::LineString(read_positions(cursor, element, property)?)),
        "Polygon" => Ok(GeoShape::Polygon(read_rings(cursor, element, property)?)),
        "MultiPoint" => read_members(cursor, element, property)?
            .into_iter()
            .map(|member| match member {
                GeoShape::Point(p) => Ok(p),
                other => Err(wrong(property, format!("{} inside MultiPoint", other.type_name()))),
            })
            .collect::<Result<_, _>>()
            .map(GeoShape::MultiPoint),
        "MultiCurve" | "MultiLineString" => read_members(cursor, element, property)?
            .into_iter()
            .map(|member| match member {
                GeoShape::LineString(line) => Ok(line),
                other => Err(wrong(property, format!("{} inside MultiCurve", other.type_name()))),
            })
            .collect::<Result<_, _>>()
            .map(GeoShape::MultiLineString),
        "MultiSurface" | "MultiPolygon" => read_members(cursor, element, property)?
            .into_iter()
            .map(|member| match member {
                GeoShape::Polygon(polygon) => Ok(polygon),
                other => Err(wrong(property, format!("{} inside MultiSurface", other.type_name()))),
            })
            .collect::<Result<_, _>>()
            .map(GeoShape::MultiPolygon),
        "MultiGeometry" => Ok(GeoShape::Collection(read_members(cursor, element, property)?)),
        other => Err(wrong(property, format!("unsupported GML element {other}"))),
    }
}

fn parse_position(text: &str, property: &str) -> Result<Position, DecodeError> {
    let values = text
        .split_whitespace()
        .map(|v| v.parse::<f64>().map_err(|_| wrong(property, format!("bad coordinate {v:?}"))))
        .collect::<Result<Vec<f64>, _>>()?;
    match values.as_slice() {
        [x, y] => Ok(Position::new(*x, *y)),
        [x, y, z] => Ok(Position::with_z(*x, *y, *z)),
        _ => Err(wrong(property, "position needs two or three coordinates")),
    }
}

/// `gml:pos` children; `gml:posList` is read as two-dimensional pairs.
fn read_positions(cursor: &mut XmlCursor<'_>, element: &Element, property: &str) -> Result<Line, DecodeError> {
    let mut line = Vec::new();
    cursor.read_children(element, |cursor, child| {
        match child.local.as_str() {
            "pos" => line.push(parse_position(&cursor.read_text(&child)?, property)?),
            "posList" => {
                let text = cursor.read_text(&child)?;
                let values: Vec<&str> = text.split_whitespace().collect();
                if values.len() % 2 != 0 {
                    return Err(wrong(property, "posList with an odd number of coordinates"));
                }
                for pair in values.chunks(2) {
                    line.push(parse_position(&pair.join(" "), property)?);
                }
            }
            _ => cursor.skip(&child)?,
        }
        Ok(())
    })?;
    Ok(line)
}

fn read_rings(cursor: &mut XmlCursor<'_>, element: &Element, property: &str) -> Result<Polygon, DecodeError> {
    let mut exterior = None;
    let mut interiors = Vec::new();
    cursor.read_children(element, |cursor, boundary| {
        let mut ring = Vec::new();
        cursor.read_children(&boundary, |cursor, linear| {
            ring.extend(read_positions(cursor, &linear, property)?);
            Ok(())
        })?;
        match boundary.local.as_str() {
            "exterior" => exterior = Some(ring),
            "interior" => interiors.push(ring),
            other => return Err(wrong(property, format!("unexpected polygon boundary {other}"))),
        }
        Ok(())
    })?;
    Ok(Polygon {
        exterior: exterior.unwrap_or_default(),
        interiors,
    })
}

/// Shapes under a `*Members` (or repeated `*Member`) wrapper.
fn read_members(cursor: &mut XmlCursor<'_>, element: &Element, property: &str) -> Result<Vec<GeoShape>, DecodeError> {
    let mut members = Vec::new();
    cursor.read_children(element, |cursor, child| {
        if child.local.ends_with("Members") || child.local.ends_with("Member") {
            cursor.read_children(&child, |cursor, shape| {
                members.push(read_shape(cursor, &shape, property)?);
                Ok(())
            })
        } else {
            members.push(read_shape(cursor, &child, property)?);
            Ok(())
        }
    })?;
    Ok(members)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(geo: &Geospatial) -> String {
        let mut buf = Vec::new();
        let mut w = XmlWriter::new(&mut buf);
        write_gml(&mut w, geo, "Location").unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn decode(xml: &str, dimension: Dimension) -> Result<Geospatial, DecodeError> {
        let wrapped = format!(r#"<d:Location xmlns:d="urn:d" xmlns:gml="{GML_NS}">{xml}</d:Location>"#);
        let mut cursor = XmlCursor::new(wrapped.as_bytes());
        let root = cursor.root().unwrap();
        let mut result = None;
        cursor.read_children(&root, |cursor, shape| {
            result = Some(read_gml(cursor, &shape, dimension, "Location"));
            Ok(())
        })?;
        result.unwrap()
    }

    #[test]
    fn test_point_with_srs() {
        let geo = Geospatial::point(Dimension::Geography, 10.5, 59.0).with_srid(4326);
        let xml = encode(&geo);
        assert_eq!(
            xml,
            r#"<gml:Point gml:srsName="http://www.opengis.net/def/crs/EPSG/0/4326"><gml:pos>10.5 59</gml:pos></gml:Point>"#
        );
        assert_eq!(decode(&xml, Dimension::Geography).unwrap(), geo);
    }

    #[test]
    fn test_polygon_and_collection() {
        let ring = vec![
            Position::new(0.0, 0.0),
            Position::new(1.0, 0.0),
            Position::with_z(1.0, 1.0, 2.5),
            Position::new(0.0, 0.0),
        ];
        let shape = GeoShape::Collection(vec![
            GeoShape::Polygon(Polygon {
                exterior: ring.clone(),
                interiors: vec![ring.clone()],
            }),
            GeoShape::MultiPoint(ring.clone()),
            GeoShape::MultiLineString(vec![ring.clone(), ring]),
        ]);
        let geo = Geospatial::new(Dimension::Geometry, shape);
        assert_eq!(decode(&encode(&geo), Dimension::Geometry).unwrap(), geo);
    }

    #[test]
    fn test_pos_list_and_bad_input() {
        let line = decode(
            r#"<gml:LineString><gml:posList>1 2 3 4</gml:posList></gml:LineString>"#,
            Dimension::Geometry,
        )
        .unwrap();
        assert_eq!(
            line.shape,
            GeoShape::LineString(vec![Position::new(1.0, 2.0), Position::new(3.0, 4.0)])
        );

        assert!(decode(r#"<gml:Point><gml:pos>1</gml:pos></gml:Point>"#, Dimension::Geometry).is_err());
        assert!(decode(r#"<gml:Blob/>"#, Dimension::Geometry).is_err());
    }

    #[test]
    fn test_non_finite_coordinate_rejected() {
        let geo = Geospatial::point(Dimension::Geometry, f64::INFINITY, 0.0);
        let mut buf = Vec::new();
        let mut w = XmlWriter::new(&mut buf);
        assert!(write_gml(&mut w, &geo, "P").is_err());
    }
}
