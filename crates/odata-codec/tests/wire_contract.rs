//! Byte-level wire contracts shared with existing clients.

use odata_codec::codec::atom::{AtomDeserializer, AtomSerializer};
use odata_codec::codec::json::{JsonDeserializer, JsonOptions, JsonSerializer};
use odata_codec::context::{NavigationResolver, SerializeContext};
use odata_codec::error::{EncodeError, ErrorCode};
use odata_codec::model::{
    DeletedReason, DeltaBuilder, DeltaLink, Entity, EntityBuilder, EntityCollection, Inline,
};
use odata_codec::query::{ExpandItem, ExpandTree, Levels};
use odata_codec::version::{MetadataLevel, ODataVersion};

fn render(f: impl FnOnce(&mut Vec<u8>) -> Result<(), EncodeError>) -> String {
    let mut buf = Vec::new();
    f(&mut buf).unwrap();
    String::from_utf8(buf).unwrap()
}

fn position(haystack: &str, needle: &str) -> usize {
    haystack
        .find(needle)
        .unwrap_or_else(|| panic!("{needle:?} not found in {haystack}"))
}

// =============================================================================
// IEEE754Compatible
// =============================================================================

#[test]
fn test_ieee754_int64_and_decimal_become_strings() {
    let entity = EntityBuilder::new()
        .int64("PropertyInt64", i64::MAX)
        .decimal("PropertyDecimal", "34")
        .build();
    let ctx = SerializeContext::new(ODataVersion::V4);

    let plain = render(|buf| JsonSerializer::new(JsonOptions::new()).serialize_entity(buf, &entity, &ctx));
    assert!(plain.contains(r#""PropertyInt64":9223372036854775807"#));
    assert!(plain.contains(r#""PropertyDecimal":34"#));

    let serializer = JsonSerializer::new(JsonOptions::new().ieee754());
    let compatible = render(|buf| serializer.serialize_entity(buf, &entity, &ctx));
    assert!(compatible.contains(r#""PropertyInt64":"9223372036854775807""#));
    assert!(compatible.contains(r#""PropertyDecimal":"34""#));

    let full = ctx.clone().metadata(MetadataLevel::Full);
    assert_eq!(
        serializer.content_type(&full),
        "application/json;odata.metadata=full;IEEE754Compatible=true"
    );

    // The reader takes both spellings back to the same literal.
    let decoded = JsonDeserializer::new(ODataVersion::V4)
        .entity(compatible.as_bytes())
        .unwrap()
        .payload;
    assert_eq!(
        decoded.property("PropertyInt64").and_then(|p| p.value.as_primitive()),
        Some("9223372036854775807")
    );
}

#[test]
fn test_ieee754_count_is_a_string() {
    let set = EntityCollection::new(vec![EntityBuilder::new().string("Name", "Ann").build()]);
    let ctx = SerializeContext::new(ODataVersion::V4).with_count();
    let json = render(|buf| {
        JsonSerializer::new(JsonOptions::new().ieee754()).serialize_entity_collection(buf, &set, &ctx)
    });
    assert!(json.contains(r#""@odata.count":"1""#), "{json}");
}

// =============================================================================
// Entry-ref compaction
// =============================================================================

#[test]
fn test_untyped_empty_entity_is_an_entry_ref() {
    let entity = EntityBuilder::new().id("People(7)").build();
    for version in [ODataVersion::V4, ODataVersion::V401] {
        let xml = render(|buf| AtomSerializer::new().serialize_entity(buf, &entity, &SerializeContext::new(version)));
        assert!(xml.contains("<m:ref "), "{xml}");
        assert!(xml.ends_with(r#"id="People(7)"/>"#), "{xml}");
        assert!(!xml.contains("<entry"));

        let decoded = AtomDeserializer::new(version).entity(xml.as_bytes()).unwrap().payload;
        assert_eq!(decoded, entity);
    }

    // A type alone is enough to make it a full entry.
    let typed = EntityBuilder::new().id("People(7)").type_name("NS.Person").build();
    let xml = render(|buf| {
        AtomSerializer::new().serialize_entity(buf, &typed, &SerializeContext::new(ODataVersion::V4))
    });
    assert!(xml.contains("<entry"));
    assert!(!xml.contains("<m:ref"));

    // Links and an etag keep the full entry, and survive the trip.
    let linked = EntityBuilder::new()
        .id("People(7)")
        .etag("W/\"7\"")
        .navigation("Friends", "People(7)/Friends")
        .build();
    let xml = render(|buf| {
        AtomSerializer::new().serialize_entity(buf, &linked, &SerializeContext::new(ODataVersion::V4))
    });
    assert!(xml.contains("<entry"), "{xml}");
    assert!(!xml.contains("<m:ref"));
    let decoded = AtomDeserializer::new(ODataVersion::V4).entity(xml.as_bytes()).unwrap().payload;
    assert_eq!(decoded, linked);
}

// =============================================================================
// Delta ordering and validation
// =============================================================================

fn mixed_delta() -> odata_codec::model::Delta {
    DeltaBuilder::new()
        .added_link("People(1)", "Friends", "People(2)")
        .deleted("People(3)", DeletedReason::Deleted)
        .entity(EntityBuilder::new().id("People(4)").string("Name", "Dee").build())
        .build()
}

#[test]
fn test_json_delta_records_in_fixed_order() {
    let ctx = SerializeContext::new(ODataVersion::V4).entity_set("People");
    let json = render(|buf| JsonSerializer::default().serialize_delta(buf, &mixed_delta(), &ctx));

    let entity = position(&json, r#""@odata.id":"People(4)""#);
    let deleted = position(&json, "$deletedEntity");
    let link = position(&json, "$link");
    assert!(entity < deleted && deleted < link, "{json}");
    assert!(!json.contains("$deletedLink"));
}

#[test]
fn test_atom_delta_records_in_fixed_order() {
    let ctx = SerializeContext::new(ODataVersion::V4);
    let xml = render(|buf| AtomSerializer::new().serialize_delta(buf, &mixed_delta(), &ctx));

    let entity = position(&xml, "<entry");
    let deleted = position(&xml, "<at:deleted-entry");
    let link = position(&xml, "<m:link ");
    assert!(entity < deleted && deleted < link, "{xml}");
    assert!(!xml.contains("m:deleted-link"));

    let decoded = AtomDeserializer::new(ODataVersion::V4).delta(xml.as_bytes()).unwrap().payload;
    assert_eq!(decoded, mixed_delta());
}

#[test]
fn test_link_without_relationship_is_rejected_before_writing() {
    let mut delta = mixed_delta();
    delta.added_links.push(DeltaLink {
        source: Some("People(1)".to_string()),
        relationship: None,
        target: Some("People(5)".to_string()),
    });
    let ctx = SerializeContext::new(ODataVersion::V4);

    let mut buf = Vec::new();
    let err = JsonSerializer::default().serialize_delta(&mut buf, &delta, &ctx).unwrap_err();
    assert_eq!(err.code(), ErrorCode::MissingRequiredField);
    assert!(buf.is_empty());

    let mut buf = Vec::new();
    let err = AtomSerializer::new().serialize_delta(&mut buf, &delta, &ctx).unwrap_err();
    assert_eq!(err.code(), ErrorCode::MissingRequiredField);
    assert!(buf.is_empty());
}

// =============================================================================
// Cycle termination
// =============================================================================

/// A befriends B, B befriends A and C, C befriends B.
struct Triangle;

impl NavigationResolver for Triangle {
    fn resolve(&self, source: &Entity, navigation: &str) -> Option<Inline> {
        if navigation != "Friends" {
            return None;
        }
        let friends: &[&str] = match source.id.as_deref()? {
            "A" => &["B"],
            "B" => &["A", "C"],
            "C" => &["B"],
            _ => return None,
        };
        let entities = friends
            .iter()
            .map(|id| EntityBuilder::new().id(*id).string("Name", *id).build())
            .collect();
        Some(Inline::EntitySet(EntityCollection::new(entities)))
    }
}

#[test]
fn test_cycle_with_levels_max_terminates_in_references() {
    let a = EntityBuilder::new().id("A").string("Name", "A").build();
    let resolver = Triangle;
    let ctx = SerializeContext::new(ODataVersion::V4)
        .expand(ExpandTree::new(vec![ExpandItem::new("Friends").levels(Levels::Max)]))
        .resolver(&resolver);

    let json = render(|buf| JsonSerializer::default().serialize_entity(buf, &a, &ctx));
    assert_eq!(
        json,
        r#"{"@odata.id":"A","Name":"A","Friends":[{"@odata.id":"B","Name":"B","Friends":[{"@odata.id":"A"},{"@odata.id":"C","Name":"C","Friends":[{"@odata.id":"B"}]}]}]}"#
    );

    let xml = render(|buf| AtomSerializer::new().serialize_entity(buf, &a, &ctx));
    assert_eq!(xml.matches("<entry").count(), 3, "{xml}");
    assert!(xml.contains(r#"<m:ref id="A"/>"#));
    assert!(xml.contains(r#"<m:ref id="B"/>"#));
}

// =============================================================================
// Atom whitespace tolerance
// =============================================================================

#[test]
fn test_atom_pretty_printed_entry_reads_like_compact_one() {
    let entity = EntityBuilder::new()
        .id("People(1)")
        .type_name("NS.Person")
        .string("Name", "Ann")
        .int32("Age", 42)
        .complex("Home", "NS.Address", |a| a.string("City", "Oslo"))
        .navigation("Friends", "People(1)/Friends")
        .build();
    let ctx = SerializeContext::new(ODataVersion::V4);
    let compact = render(|buf| AtomSerializer::new().serialize_entity(buf, &entity, &ctx));
    let pretty = compact
        .replace("><entry", ">\n<entry")
        .replace("><id>", ">\n  <id>")
        .replace("><category", ">\n  <category")
        .replace("><link", ">\n  <link")
        .replace("><content", ">\n  <content")
        .replace("><m:properties>", ">\n    <m:properties>")
        .replace("><d:", ">\n      <d:")
        .replace("></m:properties>", ">\n    </m:properties>")
        .replace("></content>", ">\n  </content>")
        .replace("></entry>", ">\n</entry>");
    assert_ne!(pretty, compact);

    let reader = AtomDeserializer::new(ODataVersion::V4);
    let from_compact = reader.entity(compact.as_bytes()).unwrap().payload;
    let from_pretty = reader.entity(pretty.as_bytes()).unwrap().payload;
    assert_eq!(from_compact, from_pretty);
    assert_eq!(from_pretty, entity);
}
