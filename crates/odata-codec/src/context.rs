//! Per-call serialization context and context-URL composition.

use std::fmt;

use crate::edm::EdmProvider;
use crate::model::{Entity, Inline};
use crate::query::{ExpandTree, SelectTree};
use crate::version::{MetadataLevel, ODataVersion};

/// Supplies expanded navigation targets on demand.
///
/// Entity graphs with cycles (A befriends B befriends A) cannot be owned as
/// inline trees; a resolver hands out targets lazily while the serializer
/// walks the expand tree.
pub trait NavigationResolver {
    fn resolve(&self, source: &Entity, navigation: &str) -> Option<Inline>;
}

/// Kind of payload a context URL describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    EntitySet,
    Entity,
    Property,
    Delta,
    DeletedEntity,
    Link,
    DeletedLink,
    Reference,
    References,
}

/// Builds `@odata.context` values such as
/// `http://host/svc/$metadata#People(Name,Friends(Name))/$entity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextUrl {
    metadata_url: String,
    path: Option<String>,
    select: Option<String>,
    kind: ContextKind,
}

impl ContextUrl {
    /// `service_root` is the service base URL (`http://host/svc/`); an empty
    /// root yields relative context URLs (`#People`).
    pub fn new(service_root: &str, kind: ContextKind) -> Self {
        let metadata_url = if service_root.is_empty() {
            String::new()
        } else if service_root.ends_with('/') {
            format!("{service_root}$metadata")
        } else {
            format!("{service_root}/$metadata")
        };
        Self {
            metadata_url,
            path: None,
            select: None,
            kind,
        }
    }

    /// Entity set, singleton or type path.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Projection from `$select`/`$expand`.
    pub fn projection(mut self, select: &SelectTree, expand: &ExpandTree, version: ODataVersion) -> Self {
        let parts: Vec<String> = select
            .to_clause()
            .into_iter()
            .chain(expand.to_clause(version))
            .collect();
        self.select = (!parts.is_empty()).then(|| parts.join(","));
        self
    }

    pub fn build(&self) -> String {
        let mut out = format!("{}#", self.metadata_url);
        match (self.kind, &self.path) {
            (ContextKind::Reference, _) => {
                out.push_str("$ref");
                return out;
            }
            (ContextKind::References, _) => {
                out.push_str("Collection($ref)");
                return out;
            }
            (_, Some(path)) => out.push_str(path),
            (_, None) => {}
        }
        if let Some(select) = &self.select {
            out.push('(');
            out.push_str(select);
            out.push(')');
        }
        let suffix = match self.kind {
            ContextKind::Entity => "/$entity",
            ContextKind::Delta => "/$delta",
            ContextKind::DeletedEntity => "/$deletedEntity",
            ContextKind::Link => "/$link",
            ContextKind::DeletedLink => "/$deletedLink",
            _ => "",
        };
        if self.path.is_none() {
            out.push_str(suffix.trim_start_matches('/'));
        } else {
            out.push_str(suffix);
        }
        out
    }
}

impl fmt::Display for ContextUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.build())
    }
}

/// Everything one serialize call needs to know besides the payload.
///
/// Built once per call and threaded read-only through the serializer.
#[derive(Clone)]
pub struct SerializeContext<'a> {
    pub version: ODataVersion,
    pub metadata: MetadataLevel,
    /// Service root, used for computed context URLs and `xml:base`.
    pub base_url: Option<String>,
    /// Explicit context URL; computed from `base_url` + `entity_set` when absent.
    pub context_url: Option<String>,
    pub metadata_etag: Option<String>,
    /// Entity set (or other path) the payload belongs to.
    pub entity_set: Option<String>,
    pub select: SelectTree,
    pub expand: ExpandTree,
    /// Write `@odata.count` on collections.
    pub count: bool,
    /// Declared entity type of the payload; derived types get annotated.
    pub expected_type: Option<String>,
    pub edm: Option<&'a dyn EdmProvider>,
    pub resolver: Option<&'a dyn NavigationResolver>,
}

impl fmt::Debug for SerializeContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializeContext")
            .field("version", &self.version)
            .field("metadata", &self.metadata)
            .field("base_url", &self.base_url)
            .field("context_url", &self.context_url)
            .field("entity_set", &self.entity_set)
            .field("select", &self.select)
            .field("expand", &self.expand)
            .field("count", &self.count)
            .field("expected_type", &self.expected_type)
            .field("edm", &self.edm.is_some())
            .field("resolver", &self.resolver.is_some())
            .finish_non_exhaustive()
    }
}

impl<'a> SerializeContext<'a> {
    /// Context for `version` at minimal metadata, selecting everything.
    pub fn new(version: ODataVersion) -> Self {
        Self {
            version,
            metadata: MetadataLevel::Minimal,
            base_url: None,
            context_url: None,
            metadata_etag: None,
            entity_set: None,
            select: SelectTree::all(),
            expand: ExpandTree::default(),
            count: false,
            expected_type: None,
            edm: None,
            resolver: None,
        }
    }

    pub fn metadata(mut self, metadata: MetadataLevel) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn context_url(mut self, context_url: impl Into<String>) -> Self {
        self.context_url = Some(context_url.into());
        self
    }

    pub fn metadata_etag(mut self, etag: impl Into<String>) -> Self {
        self.metadata_etag = Some(etag.into());
        self
    }

    pub fn entity_set(mut self, entity_set: impl Into<String>) -> Self {
        self.entity_set = Some(entity_set.into());
        self
    }

    pub fn select(mut self, select: SelectTree) -> Self {
        self.select = select;
        self
    }

    pub fn expand(mut self, expand: ExpandTree) -> Self {
        self.expand = expand;
        self
    }

    pub fn with_count(mut self) -> Self {
        self.count = true;
        self
    }

    pub fn expected_type(mut self, type_name: impl Into<String>) -> Self {
        self.expected_type = Some(type_name.into());
        self
    }

    pub fn edm(mut self, edm: &'a dyn EdmProvider) -> Self {
        self.edm = Some(edm);
        self
    }

    pub fn resolver(mut self, resolver: &'a dyn NavigationResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// The context URL for a top-level payload of `kind`: explicit, or
    /// composed from the entity set and projection. `None` when neither
    /// is available.
    pub fn resolve_context_url(&self, kind: ContextKind) -> Option<String> {
        if let Some(url) = &self.context_url {
            return Some(url.clone());
        }
        let set = self.entity_set.as_ref()?;
        let root = self.base_url.as_deref().unwrap_or("");
        Some(
            ContextUrl::new(root, kind)
                .path(set.clone())
                .projection(&self.select, &self.expand, self.version)
                .build(),
        )
    }

    /// Context value of a delta record (`#People/$deletedEntity`).
    pub fn delta_record_context(&self, kind: ContextKind) -> String {
        let mut url = ContextUrl::new("", kind);
        if let Some(set) = &self.entity_set {
            url = url.path(set.clone());
        }
        url.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ExpandItem;

    #[test]
    fn test_context_url_for_entity_with_projection() {
        let select = SelectTree::from_paths(["Name"]);
        let expand = ExpandTree::new(vec![ExpandItem::new("Friends").select(SelectTree::from_paths(["Name"]))]);
        let url = ContextUrl::new("http://host/svc/", ContextKind::Entity)
            .path("People")
            .projection(&select, &expand, ODataVersion::V4)
            .build();
        assert_eq!(url, "http://host/svc/$metadata#People(Name,Friends(Name))/$entity");
    }

    #[test]
    fn test_delta_record_contexts() {
        let ctx = SerializeContext::new(ODataVersion::V4).entity_set("People");
        assert_eq!(ctx.delta_record_context(ContextKind::DeletedEntity), "#People/$deletedEntity");
        assert_eq!(ctx.delta_record_context(ContextKind::Link), "#People/$link");

        let bare = SerializeContext::new(ODataVersion::V4);
        assert_eq!(bare.delta_record_context(ContextKind::DeletedLink), "#$deletedLink");
    }

    #[test]
    fn test_reference_contexts() {
        assert_eq!(ContextUrl::new("http://h/", ContextKind::Reference).build(), "http://h/$metadata#$ref");
        assert_eq!(
            ContextUrl::new("", ContextKind::References).build(),
            "#Collection($ref)"
        );
    }

    #[test]
    fn test_resolve_context_url_prefers_explicit() {
        let ctx = SerializeContext::new(ODataVersion::V4)
            .base_url("http://host/svc")
            .entity_set("People");
        assert_eq!(
            ctx.resolve_context_url(ContextKind::EntitySet).as_deref(),
            Some("http://host/svc/$metadata#People")
        );
        let ctx = ctx.context_url("$metadata#Custom");
        assert_eq!(ctx.resolve_context_url(ContextKind::Entity).as_deref(), Some("$metadata#Custom"));
        assert_eq!(SerializeContext::new(ODataVersion::V4).resolve_context_url(ContextKind::Entity), None);
    }
}
