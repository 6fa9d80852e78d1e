//! JSON control-key spellings per dialect.
//!
//! | field      | 2.0 (verbose)        | 3.0 (light)             | 4.0                  | 4.01        |
//! |------------|----------------------|-------------------------|----------------------|-------------|
//! | Type       | `__metadata.type`    | `odata.type`            | `@odata.type`        | `@type`     |
//! | Id         | `__metadata.uri`     | `odata.id`              | `@odata.id`          | `@id`       |
//! | Context    | -                    | `odata.metadata`        | `@odata.context`     | `@context`  |
//! | Count      | `__count`            | `odata.count`           | `@odata.count`       | `@count`    |
//!
//! Property-scoped annotations (`Name@odata.type`) use a separate suffix
//! table because 3.0 spells them differently from instance-level keys.

use lazy_static::lazy_static;
use rustc_hash::FxHashMap;

use super::Field;
use crate::version::ODataVersion;

/// Keys of a deleted-entity record body.
pub const DELETED_ID: &str = "id";
pub const DELETED_REASON: &str = "reason";

/// Keys of a delta link record body.
pub const LINK_SOURCE: &str = "source";
pub const LINK_RELATIONSHIP: &str = "relationship";
pub const LINK_TARGET: &str = "target";

/// The JSON name table for one protocol version.
#[derive(Debug)]
pub struct JsonNames {
    pub version: ODataVersion,
    /// Root wrapper object (`d` for 2.0).
    pub wrapper: Option<&'static str>,
    /// Key of the entity/value array in collections.
    pub value_key: &'static str,
    /// Object that groups entity control fields (`__metadata` for 2.0).
    pub metadata_object: Option<&'static str>,
    /// Top-level key of error documents.
    pub error_key: &'static str,
    /// Key carrying a reference URL (`@odata.id`, `@id`, 3.0 `url`, 2.0 `uri`).
    pub reference_key: &'static str,
    /// Marker of a null property document (`@odata.null`).
    pub null_key: Option<&'static str>,
    instance: FxHashMap<Field, &'static str>,
    suffixes: FxHashMap<Field, &'static str>,
    accepted: FxHashMap<&'static str, Field>,
    accepted_suffixes: Vec<(&'static str, Field)>,
}

const V2_INSTANCE: &[(Field, &str)] = &[
    (Field::Id, "uri"),
    (Field::Type, "type"),
    (Field::Etag, "etag"),
    (Field::MediaReadLink, "media_src"),
    (Field::MediaEditLink, "edit_media"),
    (Field::MediaContentType, "content_type"),
    (Field::MediaEtag, "media_etag"),
    (Field::Count, "__count"),
    (Field::NextLink, "__next"),
    (Field::Deferred, "__deferred"),
];

const V3_INSTANCE: &[(Field, &str)] = &[
    (Field::Id, "odata.id"),
    (Field::Etag, "odata.etag"),
    (Field::Type, "odata.type"),
    (Field::ReadLink, "odata.readLink"),
    (Field::EditLink, "odata.editLink"),
    (Field::MediaReadLink, "odata.mediaReadLink"),
    (Field::MediaEditLink, "odata.mediaEditLink"),
    (Field::MediaContentType, "odata.mediaContentType"),
    (Field::MediaEtag, "odata.mediaEtag"),
    (Field::Count, "odata.count"),
    (Field::NextLink, "odata.nextLink"),
    (Field::DeltaLink, "odata.deltaLink"),
    (Field::Context, "odata.metadata"),
];

const V3_SUFFIXES: &[(Field, &str)] = &[
    (Field::Type, "@odata.type"),
    (Field::NavigationLink, "@odata.navigationLinkUrl"),
    (Field::AssociationLink, "@odata.associationLinkUrl"),
    (Field::MediaReadLink, "@odata.mediaReadLink"),
    (Field::MediaEditLink, "@odata.mediaEditLink"),
    (Field::MediaContentType, "@odata.mediaContentType"),
    (Field::MediaEtag, "@odata.mediaEtag"),
    (Field::Bind, "@odata.bind"),
];

const V4_INSTANCE: &[(Field, &str)] = &[
    (Field::Id, "@odata.id"),
    (Field::Etag, "@odata.etag"),
    (Field::Type, "@odata.type"),
    (Field::ReadLink, "@odata.readLink"),
    (Field::EditLink, "@odata.editLink"),
    (Field::MediaReadLink, "@odata.mediaReadLink"),
    (Field::MediaEditLink, "@odata.mediaEditLink"),
    (Field::MediaContentType, "@odata.mediaContentType"),
    (Field::MediaEtag, "@odata.mediaEtag"),
    (Field::AssociationLink, "@odata.associationLink"),
    (Field::NavigationLink, "@odata.navigationLink"),
    (Field::Count, "@odata.count"),
    (Field::NextLink, "@odata.nextLink"),
    (Field::DeltaLink, "@odata.deltaLink"),
    (Field::Context, "@odata.context"),
    (Field::MetadataEtag, "@odata.metadataEtag"),
    (Field::Bind, "@odata.bind"),
];

const V401_INSTANCE: &[(Field, &str)] = &[
    (Field::Id, "@id"),
    (Field::Etag, "@etag"),
    (Field::Type, "@type"),
    (Field::ReadLink, "@readLink"),
    (Field::EditLink, "@editLink"),
    (Field::MediaReadLink, "@mediaReadLink"),
    (Field::MediaEditLink, "@mediaEditLink"),
    (Field::MediaContentType, "@mediaContentType"),
    (Field::MediaEtag, "@mediaEtag"),
    (Field::AssociationLink, "@associationLink"),
    (Field::NavigationLink, "@navigationLink"),
    (Field::Count, "@count"),
    (Field::NextLink, "@nextLink"),
    (Field::DeltaLink, "@deltaLink"),
    (Field::Context, "@context"),
    (Field::MetadataEtag, "@metadataEtag"),
    (Field::Bind, "@bind"),
    (Field::Removed, "@removed"),
];

/// Fields that may appear as `Property<suffix>` in 4.x payloads.
const V4_PROPERTY_FIELDS: &[Field] = &[
    Field::Type,
    Field::NavigationLink,
    Field::AssociationLink,
    Field::MediaReadLink,
    Field::MediaEditLink,
    Field::MediaContentType,
    Field::MediaEtag,
    Field::Bind,
    Field::Count,
    Field::NextLink,
];

fn property_suffixes(instance: &[(Field, &'static str)]) -> Vec<(Field, &'static str)> {
    instance
        .iter()
        .filter(|(field, _)| V4_PROPERTY_FIELDS.contains(field))
        .copied()
        .collect()
}

impl JsonNames {
    fn build(version: ODataVersion) -> Self {
        let (instance, suffixes): (&[(Field, &'static str)], Vec<(Field, &'static str)>) = match version {
            ODataVersion::V2 => (V2_INSTANCE, Vec::new()),
            ODataVersion::V3 => (V3_INSTANCE, V3_SUFFIXES.to_vec()),
            ODataVersion::V4 => (V4_INSTANCE, property_suffixes(V4_INSTANCE)),
            ODataVersion::V401 => (V401_INSTANCE, property_suffixes(V401_INSTANCE)),
        };

        let mut accepted: FxHashMap<&'static str, Field> =
            instance.iter().map(|(field, token)| (*token, *field)).collect();
        let mut accepted_suffixes: Vec<(&'static str, Field)> =
            suffixes.iter().map(|(field, token)| (*token, *field)).collect();

        // 4.01 readers also understand the 4.0 spellings.
        if version == ODataVersion::V401 {
            for (field, token) in V4_INSTANCE {
                accepted.entry(*token).or_insert(*field);
            }
            accepted_suffixes.extend(property_suffixes(V4_INSTANCE).into_iter().map(|(f, t)| (t, f)));
        }
        // Longest suffix first, so `@odata.navigationLinkUrl` wins over shorter tails.
        accepted_suffixes.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        let reference_key = match version {
            ODataVersion::V2 => "uri",
            ODataVersion::V3 => "url",
            ODataVersion::V4 => "@odata.id",
            ODataVersion::V401 => "@id",
        };

        let null_key = match version {
            ODataVersion::V2 => None,
            ODataVersion::V3 => Some("odata.null"),
            ODataVersion::V4 => Some("@odata.null"),
            ODataVersion::V401 => Some("@null"),
        };

        JsonNames {
            version,
            wrapper: (version == ODataVersion::V2).then_some("d"),
            value_key: if version == ODataVersion::V2 { "results" } else { "value" },
            metadata_object: (version == ODataVersion::V2).then_some("__metadata"),
            error_key: if version == ODataVersion::V3 { "odata.error" } else { "error" },
            reference_key,
            null_key,
            instance: instance.iter().copied().collect(),
            suffixes: suffixes.into_iter().collect(),
            accepted,
            accepted_suffixes,
        }
    }

    /// Instance-level spelling of `field` (inside `__metadata` for 2.0).
    pub fn get(&self, field: Field) -> Option<&'static str> {
        self.instance.get(&field).copied()
    }

    /// Property-annotation suffix of `field`, e.g. `@odata.type`.
    pub fn suffix(&self, field: Field) -> Option<&'static str> {
        self.suffixes.get(&field).copied()
    }

    /// `Name@odata.type`-style key for a property-scoped annotation.
    pub fn property_key(&self, property: &str, field: Field) -> Option<String> {
        self.suffix(field).map(|suffix| format!("{property}{suffix}"))
    }

    /// Recognizes an instance-level control key.
    pub fn control_field(&self, key: &str) -> Option<Field> {
        self.accepted.get(key).copied()
    }

    /// True when `key` spells `field` at instance level in this dialect.
    pub fn matches(&self, key: &str, field: Field) -> bool {
        self.control_field(key) == Some(field)
    }

    /// Splits `Name@odata.navigationLink` into (`Name`, NavigationLink).
    pub fn split_property_key<'k>(&self, key: &'k str) -> Option<(&'k str, Field)> {
        self.accepted_suffixes.iter().find_map(|(suffix, field)| {
            key.strip_suffix(suffix)
                .filter(|name| !name.is_empty())
                .map(|name| (name, *field))
        })
    }

    /// True when this dialect carries custom instance annotations (`@NS.term`).
    pub fn supports_annotations(&self) -> bool {
        self.version.is_v4()
    }

    /// Splits a custom annotation key into (target property, term).
    ///
    /// `@NS.term` targets the enclosing instance; `Name@NS.term` targets a
    /// property. Returns `None` for plain property names.
    pub fn split_annotation<'k>(&self, key: &'k str) -> Option<(Option<&'k str>, &'k str)> {
        if !self.supports_annotations() {
            return None;
        }
        let at = key.find('@')?;
        let term = &key[at + 1..];
        if term.is_empty() {
            return None;
        }
        let target = (at > 0).then(|| &key[..at]);
        Some((target, term))
    }
}

lazy_static! {
    static ref V2_NAMES: JsonNames = JsonNames::build(ODataVersion::V2);
    static ref V3_NAMES: JsonNames = JsonNames::build(ODataVersion::V3);
    static ref V4_NAMES: JsonNames = JsonNames::build(ODataVersion::V4);
    static ref V401_NAMES: JsonNames = JsonNames::build(ODataVersion::V401);
}

/// Returns the shared JSON name table for `version`.
pub fn json_names(version: ODataVersion) -> &'static JsonNames {
    match version {
        ODataVersion::V2 => &V2_NAMES,
        ODataVersion::V3 => &V3_NAMES,
        ODataVersion::V4 => &V4_NAMES,
        ODataVersion::V401 => &V401_NAMES,
    }
}
