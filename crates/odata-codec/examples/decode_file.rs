//! Simple decoder to inspect OData payload files.
//!
//! Usage: `decode_file <path> [version]`. The format is picked from the
//! first byte (`{` JSON, `<` Atom); the version defaults to 4.0.

use std::fs;

use odata_codec::{AtomDeserializer, DecodeError, Entity, EntityCollection, Envelope, JsonDeserializer, ODataVersion, Value};

fn format_value(v: &Value) -> String {
    match v {
        Value::Null => "null".to_string(),
        Value::Primitive(literal) => {
            let preview: String = literal.chars().take(80).collect();
            if literal.len() > 80 {
                format!("\"{}...\"", preview)
            } else {
                format!("\"{}\"", preview)
            }
        }
        Value::Enum(member) => format!("ENUM({})", member),
        Value::Geospatial(geo) => format!("{}(srid={})", geo.shape.type_name(), geo.effective_srid()),
        Value::Complex(members) => format!("COMPLEX[{}]", members.len()),
        Value::LinkedComplex(linked) => format!("COMPLEX[{}] +links", linked.properties.len()),
        Value::Collection(items) => format!("{}[{}]", items.kind().name(), items.len()),
    }
}

fn print_entity(i: usize, entity: &Entity) {
    println!(
        "[{}] {} {}",
        i,
        entity.type_name.as_deref().unwrap_or("<untyped>"),
        entity.id.as_deref().unwrap_or("<no id>")
    );
    for property in entity.properties.iter().take(5) {
        let type_name = property.type_name.as_deref().unwrap_or("?");
        println!("      {}: {} = {}", property.name, type_name, format_value(&property.value));
    }
    if entity.properties.len() > 5 {
        println!("      ... and {} more properties", entity.properties.len() - 5);
    }
    for link in &entity.navigation_links {
        let expanded = if link.inline.is_some() { " (expanded)" } else { "" };
        println!("      -> {}{}", link.title, expanded);
    }
}

fn decode(data: &[u8], version: ODataVersion) -> Result<Envelope<EntityCollection>, DecodeError> {
    let json = data.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'{');
    let set = if json {
        JsonDeserializer::new(version).entity_collection(data)
    } else {
        AtomDeserializer::new(version).entity_collection(data)
    };
    match set {
        Err(DecodeError::UnexpectedCollectionShape { .. }) => {
            let entity = if json {
                JsonDeserializer::new(version).entity(data)?
            } else {
                AtomDeserializer::new(version).entity(data)?
            };
            let mut envelope = Envelope::new(EntityCollection::new(vec![entity.payload]));
            envelope.context_url = entity.context_url;
            Ok(envelope)
        }
        other => other,
    }
}

fn main() {
    let mut args = std::env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "payload.json".to_string());
    let version: ODataVersion = args
        .next()
        .map(|v| v.parse().expect("Unknown OData version"))
        .unwrap_or(ODataVersion::V4);

    println!("Reading: {} (OData {})", path, version);

    let data = fs::read(&path).expect("Failed to read file");
    println!("File size: {} bytes", data.len());

    let envelope = decode(&data, version).expect("Failed to decode");

    println!("\n=== Document ===");
    if let Some(context) = &envelope.context_url {
        println!("Context: {}", context);
    }
    let set = envelope.payload;
    if let Some(count) = set.count {
        println!("Count: {}", count);
    }
    if let Some(next) = &set.next {
        println!("Next: {}", next);
    }

    println!("\n=== Entities ({}) ===", set.entities.len());
    for (i, entity) in set.entities.iter().take(20).enumerate() {
        print_entity(i, entity);
    }
    if set.entities.len() > 20 {
        println!("... and {} more entities", set.entities.len() - 20);
    }
}
