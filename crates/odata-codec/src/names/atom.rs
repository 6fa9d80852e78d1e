//! Atom/XML qualified names per dialect.

use lazy_static::lazy_static;

use crate::version::ODataVersion;

pub const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
pub const APP_NS: &str = "http://www.w3.org/2007/app";
pub const TOMBSTONE_NS: &str = "http://purl.org/atompub/tombstones/1.0";
pub const GML_NS: &str = "http://www.opengis.net/gml";
pub const GEORSS_NS: &str = "http://www.georss.org/georss";
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

const V3_METADATA_NS: &str = "http://schemas.microsoft.com/ado/2007/08/dataservices/metadata";
const V3_DATA_NS: &str = "http://schemas.microsoft.com/ado/2007/08/dataservices";
const V3_SCHEME: &str = "http://schemas.microsoft.com/ado/2007/08/dataservices/scheme";
const V3_RELATED: &str = "http://schemas.microsoft.com/ado/2007/08/dataservices/related/";
const V3_RELATED_LINKS: &str = "http://schemas.microsoft.com/ado/2007/08/dataservices/relatedlinks/";
const V3_EDIT_MEDIA: &str = "http://schemas.microsoft.com/ado/2007/08/dataservices/edit-media/";
const V3_MEDIA_RESOURCE: &str = "http://schemas.microsoft.com/ado/2007/08/dataservices/mediaresource/";

const V4_METADATA_NS: &str = "http://docs.oasis-open.org/odata/ns/metadata";
const V4_DATA_NS: &str = "http://docs.oasis-open.org/odata/ns/data";
const V4_SCHEME: &str = "http://docs.oasis-open.org/odata/ns/scheme";
const V4_RELATED: &str = "http://docs.oasis-open.org/odata/ns/related/";
const V4_RELATED_LINKS: &str = "http://docs.oasis-open.org/odata/ns/relatedlinks/";
const V4_EDIT_MEDIA: &str = "http://docs.oasis-open.org/odata/ns/edit-media/";
const V4_MEDIA_RESOURCE: &str = "http://docs.oasis-open.org/odata/ns/mediaresource/";
const V4_DELTA: &str = "http://docs.oasis-open.org/odata/ns/delta";

/// A namespace-qualified XML name with the prefix the writer binds it to.
///
/// An empty namespace means an unqualified attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QName {
    pub namespace: &'static str,
    pub prefix: &'static str,
    pub local: &'static str,
}

impl QName {
    pub const fn new(namespace: &'static str, prefix: &'static str, local: &'static str) -> Self {
        Self { namespace, prefix, local }
    }

    /// Unqualified attribute name.
    pub const fn plain(local: &'static str) -> Self {
        Self::new("", "", local)
    }

    /// Name as written: `m:etag`, or just `entry` for the default namespace.
    pub fn prefixed(&self) -> String {
        if self.prefix.is_empty() {
            self.local.to_string()
        } else {
            format!("{}:{}", self.prefix, self.local)
        }
    }

    pub fn matches(&self, namespace: &str, local: &str) -> bool {
        self.namespace == namespace && self.local == local
    }
}

pub const FEED: QName = QName::new(ATOM_NS, "", "feed");
pub const ENTRY: QName = QName::new(ATOM_NS, "", "entry");
pub const ID: QName = QName::new(ATOM_NS, "", "id");
pub const TITLE: QName = QName::new(ATOM_NS, "", "title");
pub const SUMMARY: QName = QName::new(ATOM_NS, "", "summary");
pub const UPDATED: QName = QName::new(ATOM_NS, "", "updated");
pub const AUTHOR: QName = QName::new(ATOM_NS, "", "author");
pub const NAME: QName = QName::new(ATOM_NS, "", "name");
pub const LINK: QName = QName::new(ATOM_NS, "", "link");
pub const CATEGORY: QName = QName::new(ATOM_NS, "", "category");
pub const CONTENT: QName = QName::new(ATOM_NS, "", "content");
pub const DELETED_ENTRY: QName = QName::new(TOMBSTONE_NS, "at", "deleted-entry");

/// Link relations with fixed spellings.
pub const REL_SELF: &str = "self";
pub const REL_EDIT: &str = "edit";
pub const REL_EDIT_MEDIA: &str = "edit-media";
pub const REL_NEXT: &str = "next";

/// The Atom name table for one protocol version.
#[derive(Debug)]
pub struct AtomNames {
    pub version: ODataVersion,
    pub metadata_ns: &'static str,
    pub data_ns: &'static str,
    pub scheme: &'static str,
    pub related_prefix: &'static str,
    pub related_links_prefix: &'static str,
    pub edit_media_prefix: &'static str,
    pub media_resource_prefix: &'static str,
    /// Relation of the delta link on a delta feed.
    pub delta_rel: &'static str,

    pub etag: QName,
    pub metadata_etag: QName,
    pub type_attr: QName,
    pub null: QName,
    pub count: QName,
    pub inline: QName,
    pub action: QName,
    pub function: QName,
    pub properties: QName,
    pub element: QName,
    pub uri: QName,
    pub links: QName,
    pub context: QName,
    pub entry_ref: QName,
    pub value: QName,
    pub reason: QName,
    pub link: QName,
    pub deleted_link: QName,
    pub annotation: QName,
    pub error: QName,
    pub error_code: QName,
    pub error_message: QName,
    pub error_target: QName,
}

impl AtomNames {
    fn build(version: ODataVersion) -> Self {
        let v4 = version.is_v4();
        let metadata_ns = if v4 { V4_METADATA_NS } else { V3_METADATA_NS };
        let data_ns = if v4 { V4_DATA_NS } else { V3_DATA_NS };
        let m = |local| QName::new(metadata_ns, "m", local);
        let d = |local| QName::new(data_ns, "d", local);

        AtomNames {
            version,
            metadata_ns,
            data_ns,
            scheme: if v4 { V4_SCHEME } else { V3_SCHEME },
            related_prefix: if v4 { V4_RELATED } else { V3_RELATED },
            related_links_prefix: if v4 { V4_RELATED_LINKS } else { V3_RELATED_LINKS },
            edit_media_prefix: if v4 { V4_EDIT_MEDIA } else { V3_EDIT_MEDIA },
            media_resource_prefix: if v4 { V4_MEDIA_RESOURCE } else { V3_MEDIA_RESOURCE },
            delta_rel: if v4 { V4_DELTA } else { "http://odata.org/delta" },

            etag: m("etag"),
            metadata_etag: m("metadata-etag"),
            type_attr: m("type"),
            null: m("null"),
            count: m("count"),
            inline: m("inline"),
            action: m("action"),
            function: m("function"),
            properties: m("properties"),
            // Collection items moved from the data to the metadata namespace in 4.0.
            element: if v4 { m("element") } else { d("element") },
            uri: d("uri"),
            links: d("links"),
            context: m("context"),
            entry_ref: m("ref"),
            value: m("value"),
            reason: QName::plain("reason"),
            link: m("link"),
            deleted_link: m("deleted-link"),
            annotation: m("annotation"),
            error: m("error"),
            error_code: m("code"),
            error_message: m("message"),
            error_target: m("target"),
        }
    }

    /// True for a navigation relation (`.../related/Name`).
    pub fn is_navigation_rel(&self, rel: &str) -> bool {
        rel.starts_with(self.related_prefix)
    }

    /// True for an association relation (`.../relatedlinks/Name`).
    pub fn is_association_rel(&self, rel: &str) -> bool {
        rel.starts_with(self.related_links_prefix)
    }

    /// True for a named media-edit relation (`.../edit-media/Name`).
    pub fn is_media_edit_rel(&self, rel: &str) -> bool {
        rel.starts_with(self.edit_media_prefix)
    }

    /// Strips the relation namespace, leaving the property name.
    pub fn rel_title<'r>(&self, rel: &'r str) -> &'r str {
        [
            self.related_prefix,
            self.related_links_prefix,
            self.edit_media_prefix,
            self.media_resource_prefix,
        ]
        .iter()
        .find_map(|prefix| rel.strip_prefix(prefix))
        .unwrap_or(rel)
    }
}

lazy_static! {
    static ref V2_NAMES: AtomNames = AtomNames::build(ODataVersion::V2);
    static ref V3_NAMES: AtomNames = AtomNames::build(ODataVersion::V3);
    static ref V4_NAMES: AtomNames = AtomNames::build(ODataVersion::V4);
    static ref V401_NAMES: AtomNames = AtomNames::build(ODataVersion::V401);
}

/// Returns the shared Atom name table for `version`.
pub fn atom_names(version: ODataVersion) -> &'static AtomNames {
    match version {
        ODataVersion::V2 => &V2_NAMES,
        ODataVersion::V3 => &V3_NAMES,
        ODataVersion::V4 => &V4_NAMES,
        ODataVersion::V401 => &V401_NAMES,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_namespace_moves_in_v4() {
        let v3 = atom_names(ODataVersion::V3);
        let v4 = atom_names(ODataVersion::V4);
        assert_eq!(v3.element.namespace, V3_DATA_NS);
        assert_eq!(v3.element.prefixed(), "d:element");
        assert_eq!(v4.element.namespace, V4_METADATA_NS);
        assert_eq!(v4.element.prefixed(), "m:element");
    }

    #[test]
    fn test_metadata_namespace_per_version() {
        assert_eq!(atom_names(ODataVersion::V2).etag.namespace, V3_METADATA_NS);
        assert_eq!(atom_names(ODataVersion::V401).etag.namespace, V4_METADATA_NS);
        assert!(atom_names(ODataVersion::V4).type_attr.matches(V4_METADATA_NS, "type"));
    }

    #[test]
    fn test_relations() {
        let names = atom_names(ODataVersion::V4);
        let rel = "http://docs.oasis-open.org/odata/ns/related/Orders";
        assert!(names.is_navigation_rel(rel));
        assert!(!names.is_association_rel(rel));
        assert_eq!(names.rel_title(rel), "Orders");
        assert_eq!(names.rel_title("self"), "self");
    }
}
