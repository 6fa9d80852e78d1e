//! Property tests over generated entities.

use std::collections::BTreeSet;

use odata_codec::codec::atom::{AtomDeserializer, AtomSerializer};
use odata_codec::codec::json::{JsonDeserializer, JsonSerializer};
use odata_codec::context::SerializeContext;
use odata_codec::model::{Collection, Dimension, Entity, EntityBuilder, Geospatial, Property, Value, ValueKind};
use odata_codec::version::{MetadataLevel, ODataVersion};
use proptest::prelude::*;
use serde_json::Value as Json;

#[derive(Debug, Clone)]
enum Scalar {
    Str(String),
    Int32(i32),
    Int64(i64),
    Bool(bool),
    Double(f64),
}

fn typed_scalar() -> impl Strategy<Value = Scalar> {
    prop_oneof![
        "[a-zA-Z0-9 <>&'\"]{0,12}".prop_map(Scalar::Str),
        any::<i32>().prop_map(Scalar::Int32),
        any::<i64>().prop_map(Scalar::Int64),
        any::<bool>().prop_map(Scalar::Bool),
        (-1.0e9f64..1.0e9).prop_map(Scalar::Double),
    ]
}

/// Untyped values whose JSON shape gives the literal back unchanged.
fn untyped_scalar() -> impl Strategy<Value = Scalar> {
    prop_oneof![
        "s[a-z]{0,8}".prop_map(Scalar::Str),
        any::<i32>().prop_map(Scalar::Int32),
        any::<bool>().prop_map(Scalar::Bool),
    ]
}

/// Typed values a reader without type information reads back as the same
/// kind: strings that do not look like numbers or booleans, and numbers
/// whose written form already tells Int32 from Double.
fn self_describing_scalar() -> impl Strategy<Value = Scalar> {
    prop_oneof![
        "s[a-z]{0,8}".prop_map(Scalar::Str),
        any::<i32>().prop_map(Scalar::Int32),
        any::<bool>().prop_map(Scalar::Bool),
        (-1.0e9f64..1.0e9).prop_map(Scalar::Double),
    ]
}

fn scalar_property(name: String, scalar: Scalar) -> Property {
    let (type_name, literal) = match scalar {
        Scalar::Str(s) => return EntityBuilder::new().string(name, s).build().properties.remove(0),
        Scalar::Double(v) => return EntityBuilder::new().double(name, v).build().properties.remove(0),
        Scalar::Int32(n) => ("Edm.Int32", n.to_string()),
        Scalar::Int64(n) => ("Edm.Int64", n.to_string()),
        Scalar::Bool(v) => ("Edm.Boolean", v.to_string()),
    };
    Property::typed(name, type_name, Value::primitive(literal))
}

fn build(id: u32, scalars: Vec<Scalar>, typed: bool) -> Entity {
    let builder = EntityBuilder::new()
        .id(format!("People({id})"))
        .type_name("NS.Person");
    scalars
        .into_iter()
        .enumerate()
        .fold(builder, |b, (i, scalar)| {
            let name = format!("P{i}");
            if typed {
                return b.property(scalar_property(name, scalar));
            }
            let literal = match scalar {
                Scalar::Str(s) => s,
                Scalar::Int32(n) => n.to_string(),
                Scalar::Int64(n) => n.to_string(),
                Scalar::Bool(v) => v.to_string(),
                Scalar::Double(v) => v.to_string(),
            };
            b.value(name, Value::primitive(literal))
        })
        .build()
}

/// A version together with an entity shaped for it: typed properties from
/// 3.0 on, untyped ones for 2.0.
fn versioned_entity() -> impl Strategy<Value = (ODataVersion, Entity)> {
    prop::sample::select(ODataVersion::ALL.to_vec()).prop_flat_map(|version| {
        let typed = version != ODataVersion::V2;
        let scalars = if typed {
            prop::collection::vec(typed_scalar(), 1..6).boxed()
        } else {
            prop::collection::vec(untyped_scalar(), 1..6).boxed()
        };
        (Just(version), 0u32..1000, scalars).prop_map(move |(version, id, scalars)| (version, build(id, scalars, typed)))
    })
}

/// Versions with a non-verbose JSON format.
fn json_version() -> impl Strategy<Value = ODataVersion> {
    prop::sample::select(vec![ODataVersion::V3, ODataVersion::V4, ODataVersion::V401])
}

/// Entities whose minimal JSON carries no control information at all: no
/// id, no etag, nothing a reader could mistake for another kind.
fn anonymous_entity() -> impl Strategy<Value = (ODataVersion, Entity)> {
    (json_version(), prop::collection::vec(self_describing_scalar(), 1..6)).prop_map(|(version, scalars)| {
        let entity = scalars
            .into_iter()
            .enumerate()
            .fold(EntityBuilder::new().type_name("NS.Person"), |b, (i, scalar)| {
                b.property(scalar_property(format!("P{i}"), scalar))
            })
            .build();
        (version, entity)
    })
}

// =============================================================================
// Structured values
// =============================================================================

const COLORS: [&str; 3] = ["Red", "Green", "Blue"];

/// A value together with its type expression.
type Typed = (String, Value);

fn coordinate() -> impl Strategy<Value = f64> {
    (-720i32..720).prop_map(|quarters| f64::from(quarters) / 4.0)
}

fn geo_point() -> impl Strategy<Value = Geospatial> {
    (
        prop::sample::select(vec![Dimension::Geography, Dimension::Geometry]),
        coordinate(),
        coordinate(),
        prop::option::of(Just(4326u32)),
    )
        .prop_map(|(dimension, x, y, srid)| {
            let point = Geospatial::point(dimension, x, y);
            match srid {
                Some(srid) => point.with_srid(srid),
                None => point,
            }
        })
}

fn typed_leaf() -> impl Strategy<Value = Typed> {
    prop_oneof![
        4 => typed_scalar().prop_map(|scalar| {
            let property = scalar_property(String::new(), scalar);
            (property.type_name.unwrap_or_default(), property.value)
        }),
        1 => prop::sample::select(COLORS.to_vec()).prop_map(|member| ("NS.Color".to_string(), Value::enum_member(member))),
        1 => geo_point().prop_map(|geo| (geo.edm_kind().full_name().to_string(), Value::Geospatial(geo))),
        1 => prop::collection::vec(any::<i32>(), 0..4).prop_map(|items| {
            let items = items.into_iter().map(|n| Value::primitive(n.to_string()));
            collection_of("Edm.Int32", ValueKind::Primitive, items)
        }),
        1 => prop::collection::vec("[a-z ]{0,6}", 0..4).prop_map(|items| {
            collection_of("Edm.String", ValueKind::Primitive, items.into_iter().map(Value::primitive))
        }),
        // An empty enum collection reads back as complex without a model.
        1 => prop::collection::vec(prop::sample::select(COLORS.to_vec()), 1..4).prop_map(|items| {
            collection_of("NS.Color", ValueKind::Enum, items.into_iter().map(Value::enum_member))
        }),
    ]
}

fn collection_of(element: &str, kind: ValueKind, items: impl IntoIterator<Item = Value>) -> Typed {
    let collection = Collection::from_items(kind, items).unwrap();
    (format!("Collection({element})"), Value::Collection(collection))
}

fn members(values: Vec<Typed>) -> Vec<Property> {
    values
        .into_iter()
        .enumerate()
        .map(|(i, (type_name, value))| Property::typed(format!("P{i}"), type_name, value))
        .collect()
}

/// Scalars, enums, points and collections of them, nested in complex values
/// and complex collections.
fn typed_value() -> impl Strategy<Value = Typed> {
    typed_leaf().prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4)
                .prop_map(|values| ("NS.Address".to_string(), Value::Complex(members(values)))),
            prop::collection::vec(prop::collection::vec(inner, 0..3), 0..3).prop_map(|items| {
                let items = items.into_iter().map(|values| Value::Complex(members(values)));
                collection_of("NS.Address", ValueKind::Complex, items)
            }),
        ]
    })
}

fn structured_entity() -> impl Strategy<Value = Entity> {
    (0u32..1000, prop::collection::vec(typed_value(), 1..5)).prop_map(|(id, values)| {
        members(values)
            .into_iter()
            .fold(EntityBuilder::new().id(format!("People({id})")).type_name("NS.Person"), |b, property| {
                b.property(property)
            })
            .build()
    })
}

// =============================================================================
// Rendering helpers
// =============================================================================

fn json_at(entity: &Entity, version: ODataVersion, level: MetadataLevel) -> String {
    let ctx = SerializeContext::new(version).metadata(level);
    let mut buf = Vec::new();
    JsonSerializer::default().serialize_entity(&mut buf, entity, &ctx).unwrap();
    String::from_utf8(buf).unwrap()
}

fn atom(entity: &Entity, version: ODataVersion) -> String {
    let ctx = SerializeContext::new(version).metadata(MetadataLevel::Full);
    let mut buf = Vec::new();
    AtomSerializer::new().serialize_entity(&mut buf, entity, &ctx).unwrap();
    String::from_utf8(buf).unwrap()
}

/// Every object key in the document, qualified by its path.
fn key_paths(node: &Json, prefix: &str, out: &mut BTreeSet<String>) {
    match node {
        Json::Object(map) => {
            for (key, value) in map {
                let path = format!("{prefix}/{key}");
                key_paths(value, &path, out);
                out.insert(path);
            }
        }
        Json::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                key_paths(item, &format!("{prefix}[{i}]"), out);
            }
        }
        _ => {}
    }
}

fn keys_at(entity: &Entity, version: ODataVersion, level: MetadataLevel) -> BTreeSet<String> {
    let doc: Json = serde_json::from_str(&json_at(entity, version, level)).unwrap();
    let mut keys = BTreeSet::new();
    key_paths(&doc, "", &mut keys);
    keys
}

/// Drops instance control keys (`@odata.id`, `odata.type`, `@id`) and
/// property annotations (`Name@odata.type`) at every depth.
fn strip_control(node: &mut Json) {
    match node {
        Json::Object(map) => {
            map.retain(|key, _| !key.contains('@') && !key.starts_with("odata."));
            map.values_mut().for_each(strip_control);
        }
        Json::Array(items) => items.iter_mut().for_each(strip_control),
        _ => {}
    }
}

/// Inserts `pad` wherever the text between two tags cannot carry a value:
/// before a start tag, and after an end or empty tag.
fn pad_between_tags(xml: &str, pad: &str) -> String {
    let bytes = xml.as_bytes();
    let mut out = String::with_capacity(xml.len() * 2);
    let mut tag_start = 0;
    for (i, c) in xml.char_indices() {
        if c == '<' {
            tag_start = i;
        }
        out.push(c);
        if c != '>' || bytes.get(i + 1) != Some(&b'<') {
            continue;
        }
        let before_start_tag = !matches!(bytes.get(i + 2), Some(b'/'));
        let closed = matches!(bytes.get(tag_start + 1), Some(b'/') | Some(b'?')) || bytes[i - 1] == b'/';
        if before_start_tag || closed {
            out.push_str(pad);
        }
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_json_full_metadata_round_trip((version, entity) in versioned_entity()) {
        let json = json_at(&entity, version, MetadataLevel::Full);
        let decoded = JsonDeserializer::new(version).entity(json.as_bytes()).unwrap().payload;
        prop_assert_eq!(decoded, entity, "{}", json);
    }

    #[test]
    fn test_json_structured_values_round_trip(version in json_version(), entity in structured_entity()) {
        let json = json_at(&entity, version, MetadataLevel::Full);
        let decoded = JsonDeserializer::new(version).entity(json.as_bytes()).unwrap().payload;
        prop_assert_eq!(decoded, entity, "{}", json);
    }

    #[test]
    fn test_atom_round_trip((version, entity) in versioned_entity()) {
        let xml = atom(&entity, version);
        let decoded = AtomDeserializer::new(version).entity(xml.as_bytes()).unwrap().payload;
        prop_assert_eq!(decoded, entity, "{}", xml);
    }

    #[test]
    fn test_atom_structured_values_round_trip(
        version in prop::sample::select(ODataVersion::ALL.to_vec()),
        entity in structured_entity(),
    ) {
        let xml = atom(&entity, version);
        let decoded = AtomDeserializer::new(version).entity(xml.as_bytes()).unwrap().payload;
        prop_assert_eq!(decoded, entity, "{}", xml);
    }

    #[test]
    fn test_metadata_levels_only_add_keys((version, entity) in versioned_entity()) {
        let none = keys_at(&entity, version, MetadataLevel::None);
        let minimal = keys_at(&entity, version, MetadataLevel::Minimal);
        let full = keys_at(&entity, version, MetadataLevel::Full);
        prop_assert!(none.is_subset(&minimal), "none {:?} minimal {:?}", none, minimal);
        prop_assert!(minimal.is_subset(&full), "minimal {:?} full {:?}", minimal, full);
    }

    #[test]
    fn test_minimal_output_survives_stripped_full_output((version, entity) in anonymous_entity()) {
        let full = json_at(&entity, version, MetadataLevel::Full);
        let mut doc: Json = serde_json::from_str(&full).unwrap();
        strip_control(&mut doc);
        let stripped = serde_json::to_string(&doc).unwrap();

        let rebuilt = JsonDeserializer::new(version).entity(stripped.as_bytes()).unwrap().payload;
        prop_assert_eq!(
            json_at(&rebuilt, version, MetadataLevel::Minimal),
            json_at(&entity, version, MetadataLevel::Minimal),
            "{}",
            stripped
        );
    }

    #[test]
    fn test_atom_ignores_whitespace_between_elements(
        (version, entity) in versioned_entity(),
        pad in "[ \t\n]{1,4}",
    ) {
        let xml = atom(&entity, version);
        let padded = pad_between_tags(&xml, &pad);
        let reader = AtomDeserializer::new(version);
        let decoded = reader.entity(padded.as_bytes()).unwrap().payload;
        prop_assert_eq!(decoded, reader.entity(xml.as_bytes()).unwrap().payload, "{}", padded);
    }
}

#[test]
fn test_minimal_annotations_are_what_stripping_loses() {
    // Where the written shape is ambiguous the minimal form keeps the type,
    // so stripping it changes what a reader sees.
    let entity = EntityBuilder::new().id("P(1)").int64("Big", 7).build();
    let minimal = json_at(&entity, ODataVersion::V4, MetadataLevel::Minimal);
    assert_eq!(minimal, r##"{"@odata.id":"P(1)","Big@odata.type":"#Int64","Big":7}"##);

    let mut doc: Json = serde_json::from_str(&minimal).unwrap();
    strip_control(&mut doc);
    assert_eq!(serde_json::to_string(&doc).unwrap(), r#"{"Big":7}"#);
    let rebuilt = JsonDeserializer::new(ODataVersion::V4)
        .entity(br#"{"Big":7}"#)
        .unwrap()
        .payload;
    assert_eq!(rebuilt.property("Big").and_then(|p| p.type_name.as_deref()), None);
}
