//! Atom serializer.
//!
//! Atom has no metadata levels: every control item the model carries is
//! written. Instance annotations exist only in 4.0 and later
//! (`m:annotation`); earlier dialects skip them.

use std::io::Write;

use tracing::{debug, trace, warn};

use super::geo::write_gml;
use super::writer::{Attrs, XmlWriter};
use super::{ENTRY_CONTENT_TYPE, FEED_CONTENT_TYPE, XML_CONTENT_TYPE};
use crate::codec::delta::{assemble, DeltaRecord, LinkRecord};
use crate::codec::expand::{expansion_target, ExpandGuard, Visit};
use crate::codec::primitive::{check_value, resolve_type};
use crate::context::{ContextKind, ContextUrl, SerializeContext};
use crate::edm::TypeInfo;
use crate::error::EncodeError;
use crate::model::{
    Annotation, DeletedReason, Delta, Entity, EntityCollection, Inline, Link, OperationKind, Property, ServerError,
    Value,
};
use crate::names::atom::{
    atom_names, AtomNames, QName, ATOM_NS, DELETED_ENTRY, GEORSS_NS, GML_NS, REL_EDIT, REL_EDIT_MEDIA, REL_NEXT,
    REL_SELF, TOMBSTONE_NS,
};
use crate::query::{ExpandItem, ExpandTree, SelectTree};
use crate::validate::validate_entity;
use crate::version::ODataVersion;

const ASSOCIATION_LINK_TYPE: &str = "application/xml";

/// Writes OData Atom documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomSerializer;

impl AtomSerializer {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Writes a single `<entry>` document, or `<m:ref>` for an entity that
    /// carries neither a type nor properties.
    pub fn serialize_entity<W: Write>(
        &self,
        writer: W,
        entity: &Entity,
        ctx: &SerializeContext<'_>,
    ) -> Result<(), EncodeError> {
        debug!(version = %ctx.version, payload = "entity", "serializing Atom");
        if let Some(edm) = ctx.edm {
            validate_entity(entity, edm)?;
        }
        let session = Session::new(ctx);
        let mut w = XmlWriter::new(writer);
        w.declaration()?;
        session.write_entry(
            &mut w,
            entity,
            &ctx.select,
            &ctx.expand,
            &ExpandGuard::root(entity),
            session.root_attrs(Some(ContextKind::Entity), false),
        )?;
        w.flush()
    }

    /// Writes a `<feed>` document.
    pub fn serialize_entity_collection<W: Write>(
        &self,
        writer: W,
        set: &EntityCollection,
        ctx: &SerializeContext<'_>,
    ) -> Result<(), EncodeError> {
        debug!(
            version = %ctx.version,
            payload = "entity set",
            entities = set.entities.len(),
            "serializing Atom"
        );
        if let Some(edm) = ctx.edm {
            for entity in &set.entities {
                validate_entity(entity, edm)?;
            }
        }
        let session = Session::new(ctx);
        let mut w = XmlWriter::new(writer);
        w.declaration()?;
        let count = ctx
            .count
            .then(|| set.count.unwrap_or(set.entities.len() as i64));
        session.open_feed(&mut w, ContextKind::EntitySet, set.id.as_deref(), count, &set.annotations, false)?;
        for entity in &set.entities {
            session.write_entry(
                &mut w,
                entity,
                &ctx.select,
                &ctx.expand,
                &ExpandGuard::root(entity),
                Attrs::new(),
            )?;
        }
        session.close_feed(&mut w, set.next.as_deref(), set.delta_link.as_deref())?;
        w.flush()
    }

    /// Writes a `<feed>` from a lazily produced sequence.
    ///
    /// Same contract as the JSON stream: entries are rendered whole before
    /// reaching `writer`, a failure hands the sink to `on_error` and the call
    /// still returns `Ok`. The feed element is left open in that case.
    pub fn serialize_entity_stream<W, I, F>(
        &self,
        writer: W,
        entities: I,
        ctx: &SerializeContext<'_>,
        on_error: F,
    ) -> Result<(), EncodeError>
    where
        W: Write,
        I: IntoIterator<Item = Result<Entity, EncodeError>>,
        F: FnOnce(&EncodeError, &mut W) -> std::io::Result<()>,
    {
        debug!(version = %ctx.version, payload = "entity stream", "serializing Atom");
        let session = Session::new(ctx);
        let mut w = XmlWriter::new(writer);
        w.declaration()?;
        session.open_feed(&mut w, ContextKind::EntitySet, None, None, &[], false)?;
        for (index, item) in entities.into_iter().enumerate() {
            match item.and_then(|entity| session.render_entry(&entity)) {
                Ok(bytes) => w.get_mut().write_all(&bytes)?,
                Err(err) => {
                    warn!(index, error = %err, "entity stream stopped");
                    w.flush()?;
                    on_error(&err, w.get_mut())?;
                    return w.flush();
                }
            }
        }
        session.close_feed(&mut w, None, None)?;
        w.flush()
    }

    // =========================================================================
    // Properties, references, deltas, errors
    // =========================================================================

    /// Writes an individual property document: `<m:value>` in 4.0 and
    /// later, `<d:Name>` before.
    pub fn serialize_property<W: Write>(
        &self,
        writer: W,
        property: &Property,
        ctx: &SerializeContext<'_>,
    ) -> Result<(), EncodeError> {
        debug!(version = %ctx.version, payload = "property", "serializing Atom");
        let session = Session::new(ctx);
        let declared = session.declared_type(ctx.expected_type.as_deref(), &property.name);
        let info = resolve_type(property, declared.as_deref())?;
        check_value(&property.name, info.as_ref(), &property.value)?;

        let tag = if ctx.version.is_v4() {
            session.names.value.prefixed()
        } else {
            data_element(&property.name)
        };
        let mut w = XmlWriter::new(writer);
        w.declaration()?;
        session.write_value(
            &mut w,
            &tag,
            session.root_attrs(Some(ContextKind::Property), false),
            info.as_ref(),
            true,
            &property.value,
            &SelectTree::all(),
        )?;
        w.flush()
    }

    /// Writes an entity reference document.
    pub fn serialize_reference<W: Write>(
        &self,
        writer: W,
        id: &str,
        ctx: &SerializeContext<'_>,
    ) -> Result<(), EncodeError> {
        debug!(version = %ctx.version, payload = "reference", "serializing Atom");
        let session = Session::new(ctx);
        let mut w = XmlWriter::new(writer);
        w.declaration()?;
        if ctx.version.is_v4() {
            let attrs = session.reference_root_attrs(ContextKind::Reference, false).with("id", id);
            w.empty(&session.names.entry_ref.prefixed(), attrs)?;
        } else {
            w.text_element(
                session.names.uri.local,
                Attrs::new().with("xmlns", session.names.data_ns),
                id,
            )?;
        }
        w.flush()
    }

    /// Writes a collection of entity references.
    pub fn serialize_references<W: Write, S: AsRef<str>>(
        &self,
        writer: W,
        ids: &[S],
        ctx: &SerializeContext<'_>,
    ) -> Result<(), EncodeError> {
        debug!(version = %ctx.version, payload = "references", count = ids.len(), "serializing Atom");
        let session = Session::new(ctx);
        let mut w = XmlWriter::new(writer);
        w.declaration()?;
        if ctx.version.is_v4() {
            w.start("feed", session.reference_root_attrs(ContextKind::References, true))?;
            for id in ids {
                w.empty(&session.names.entry_ref.prefixed(), Attrs::new().with("id", id.as_ref()))?;
            }
        } else {
            w.start(
                session.names.links.local,
                Attrs::new().with("xmlns", session.names.data_ns),
            )?;
            for id in ids {
                w.text_element(session.names.uri.local, Attrs::new(), id.as_ref())?;
            }
        }
        w.end()?;
        w.flush()
    }

    /// Writes a delta feed. Every record is validated before the first byte
    /// is written; 2.0 has no delta payload.
    pub fn serialize_delta<W: Write>(
        &self,
        writer: W,
        delta: &Delta,
        ctx: &SerializeContext<'_>,
    ) -> Result<(), EncodeError> {
        debug!(version = %ctx.version, payload = "delta", "serializing Atom");
        if ctx.version == ODataVersion::V2 {
            return Err(EncodeError::UnsupportedPayload {
                payload: "delta",
                version: ctx.version.as_str(),
            });
        }
        let records = assemble(delta)?;
        if let Some(edm) = ctx.edm {
            for entity in &delta.entities {
                validate_entity(entity, edm)?;
            }
        }

        let session = Session::new(ctx);
        let mut w = XmlWriter::new(writer);
        w.declaration()?;
        session.open_feed(&mut w, ContextKind::Delta, None, delta.count, &[], true)?;
        for record in records {
            match record {
                DeltaRecord::Entity(entity) => session.write_entry(
                    &mut w,
                    entity,
                    &ctx.select,
                    &ctx.expand,
                    &ExpandGuard::root(entity),
                    Attrs::new(),
                )?,
                DeltaRecord::Deleted { id, reason } => session.write_deleted_entry(&mut w, id, reason)?,
                DeltaRecord::AddedLink(link) => session.write_delta_link(&mut w, &session.names.link, link)?,
                DeltaRecord::DeletedLink(link) => session.write_delta_link(&mut w, &session.names.deleted_link, link)?,
            }
        }
        session.close_feed(&mut w, delta.next.as_deref(), delta.delta_link.as_deref())?;
        w.flush()
    }

    /// Writes an `<m:error>` document.
    pub fn serialize_error<W: Write>(
        &self,
        writer: W,
        error: &ServerError,
        version: ODataVersion,
    ) -> Result<(), EncodeError> {
        debug!(version = %version, payload = "error", code = %error.code, "serializing Atom");
        let names = atom_names(version);
        let mut w = XmlWriter::new(writer);
        w.declaration()?;
        w.start(
            &names.error.prefixed(),
            Attrs::new().with("xmlns:m", names.metadata_ns),
        )?;
        write_error_fields(&mut w, names, &error.code, &error.message, error.target.as_deref())?;
        if !error.details.is_empty() {
            w.start(&metadata_element(names, "details"), Attrs::new())?;
            for detail in &error.details {
                w.start(&metadata_element(names, "detail"), Attrs::new())?;
                write_error_fields(&mut w, names, &detail.code, &detail.message, detail.target.as_deref())?;
                w.end()?;
            }
            w.end()?;
        }
        if !error.inner_error.is_empty() {
            w.start(&metadata_element(names, "innererror"), Attrs::new())?;
            for (key, raw) in &error.inner_error {
                w.text_element(&metadata_element(names, key), Attrs::new(), raw)?;
            }
            w.end()?;
        }
        w.end()?;
        w.flush()
    }
}

fn data_element(name: &str) -> String {
    format!("d:{name}")
}

fn metadata_element(names: &AtomNames, local: &str) -> String {
    format!("{}:{local}", names.error.prefix)
}

/// 4.x messages are plain; earlier dialects tag them with a language.
fn write_error_fields<W: Write>(
    w: &mut XmlWriter<W>,
    names: &AtomNames,
    code: &str,
    message: &str,
    target: Option<&str>,
) -> Result<(), EncodeError> {
    w.text_element(&names.error_code.prefixed(), Attrs::new(), code)?;
    let lang = if names.version.is_v4() {
        Attrs::new()
    } else {
        Attrs::new().with("xml:lang", "en-US")
    };
    w.text_element(&names.error_message.prefixed(), lang, message)?;
    if let Some(target) = target {
        w.text_element(&names.error_target.prefixed(), Attrs::new(), target)?;
    }
    Ok(())
}

// =============================================================================
// SESSION
// =============================================================================

/// Read-only state of one serialize call.
struct Session<'s, 'a> {
    ctx: &'s SerializeContext<'a>,
    names: &'static AtomNames,
}

impl<'s, 'a> Session<'s, 'a> {
    fn new(ctx: &'s SerializeContext<'a>) -> Self {
        Self {
            ctx,
            names: atom_names(ctx.version),
        }
    }

    fn version(&self) -> ODataVersion {
        self.ctx.version
    }

    // -------------------------------------------------------------------------
    // Document frame
    // -------------------------------------------------------------------------

    /// Namespace declarations and document-level control attributes.
    fn root_attrs(&self, kind: Option<ContextKind>, tombstones: bool) -> Attrs {
        let mut attrs = Attrs::new()
            .with("xmlns", ATOM_NS)
            .with("xmlns:m", self.names.metadata_ns)
            .with("xmlns:d", self.names.data_ns)
            .with("xmlns:georss", GEORSS_NS)
            .with("xmlns:gml", GML_NS);
        if tombstones {
            attrs.push("xmlns:at", TOMBSTONE_NS);
        }
        if let Some(base) = &self.ctx.base_url {
            attrs.push("xml:base", base.as_str());
        }
        if self.version().is_v4() {
            if let Some(url) = kind.and_then(|kind| self.ctx.resolve_context_url(kind)) {
                attrs.push(self.names.context.prefixed(), url);
            }
            if let Some(etag) = &self.ctx.metadata_etag {
                attrs.push(self.names.metadata_etag.prefixed(), etag.as_str());
            }
        }
        attrs
    }

    /// Reference documents take their context from the service root only.
    fn reference_root_attrs(&self, kind: ContextKind, atom: bool) -> Attrs {
        let mut attrs = if atom {
            Attrs::new().with("xmlns", ATOM_NS)
        } else {
            Attrs::new()
        };
        attrs.push("xmlns:m", self.names.metadata_ns);
        let url = self.ctx.context_url.clone().or_else(|| {
            self.ctx
                .base_url
                .as_deref()
                .map(|root| ContextUrl::new(root, kind).build())
        });
        if let Some(url) = url {
            attrs.push(self.names.context.prefixed(), url);
        }
        attrs
    }

    fn open_feed<W: Write>(
        &self,
        w: &mut XmlWriter<W>,
        kind: ContextKind,
        id: Option<&str>,
        count: Option<i64>,
        annotations: &[Annotation],
        tombstones: bool,
    ) -> Result<(), EncodeError> {
        w.start("feed", self.root_attrs(Some(kind), tombstones))?;
        if let Some(count) = count {
            w.text_element(&self.names.count.prefixed(), Attrs::new(), &count.to_string())?;
        }
        if let Some(id) = id {
            w.text_element("id", Attrs::new(), id)?;
        }
        self.write_annotations(w, annotations, None)
    }

    fn close_feed<W: Write>(
        &self,
        w: &mut XmlWriter<W>,
        next: Option<&str>,
        delta_link: Option<&str>,
    ) -> Result<(), EncodeError> {
        if let Some(next) = next {
            w.empty("link", Attrs::new().with("rel", REL_NEXT).with("href", next))?;
        }
        if let Some(delta_link) = delta_link {
            w.empty("link", Attrs::new().with("rel", self.names.delta_rel).with("href", delta_link))?;
        }
        w.end()
    }

    // -------------------------------------------------------------------------
    // Entries
    // -------------------------------------------------------------------------

    /// Renders one entry on its own, for streaming.
    fn render_entry(&self, entity: &Entity) -> Result<Vec<u8>, EncodeError> {
        if let Some(edm) = self.ctx.edm {
            validate_entity(entity, edm)?;
        }
        let mut w = XmlWriter::new(Vec::new());
        self.write_entry(
            &mut w,
            entity,
            &self.ctx.select,
            &self.ctx.expand,
            &ExpandGuard::root(entity),
            Attrs::new(),
        )?;
        Ok(w.into_inner())
    }

    fn write_entry_ref<W: Write>(&self, w: &mut XmlWriter<W>, id: Option<&str>, attrs: Attrs) -> Result<(), EncodeError> {
        w.empty(&self.names.entry_ref.prefixed(), attrs.with_opt("id", id))
    }

    fn write_entry<W: Write>(
        &self,
        w: &mut XmlWriter<W>,
        entity: &Entity,
        select: &SelectTree,
        expand: &ExpandTree,
        guard: &ExpandGuard,
        attrs: Attrs,
    ) -> Result<(), EncodeError> {
        trace!(id = entity.id.as_deref().unwrap_or(""), depth = guard.depth(), "writing entry");
        if entity.is_reference() {
            return self.write_entry_ref(w, entity.id.as_deref(), attrs);
        }

        let attrs = match &entity.etag {
            Some(etag) => attrs.qualified(&self.names.etag, etag.as_str()),
            None => attrs,
        };
        w.start("entry", attrs)?;
        if let Some(id) = &entity.id {
            w.text_element("id", Attrs::new(), id)?;
        }
        if let Some(type_name) = &entity.type_name {
            let term = TypeInfo::parse(type_name)?.render_external(self.version());
            w.empty(
                "category",
                Attrs::new().with("term", term).with("scheme", self.names.scheme),
            )?;
        }
        self.write_entry_links(w, entity)?;
        self.write_navigation(w, entity, select, expand, guard)?;
        self.write_bindings(w, &entity.binding_links)?;

        for operation in &entity.operations {
            let name = match operation.kind {
                OperationKind::Action => &self.names.action,
                OperationKind::Function => &self.names.function,
            };
            let attrs = Attrs::new()
                .with("metadata", operation.metadata_anchor.as_str())
                .with_opt("title", operation.title.as_deref())
                .with_opt("target", operation.target.as_deref());
            w.empty(&name.prefixed(), attrs)?;
        }

        self.write_annotations(w, &entity.annotations, None)?;
        for property in &entity.properties {
            if select.is_selected(&property.name) {
                self.write_annotations(w, &property.annotations, Some(&property.name))?;
            }
        }

        match &entity.media_content_source {
            Some(source) => {
                let attrs = Attrs::new()
                    .with_opt("type", entity.media_content_type.as_deref())
                    .with("src", source.as_str());
                w.empty("content", attrs)?;
                self.write_properties(w, entity.type_name.as_deref(), &entity.properties, select)?;
            }
            None => {
                w.start("content", Attrs::new().with("type", XML_CONTENT_TYPE))?;
                self.write_properties(w, entity.type_name.as_deref(), &entity.properties, select)?;
                w.end()?;
            }
        }
        w.end()
    }

    /// Self, edit, media and association links.
    fn write_entry_links<W: Write>(&self, w: &mut XmlWriter<W>, entity: &Entity) -> Result<(), EncodeError> {
        if let Some(href) = entity.self_link.as_ref().and_then(|l| l.href.as_deref()) {
            w.empty("link", Attrs::new().with("rel", REL_SELF).with("href", href))?;
        }
        if let Some(href) = entity.edit_link.as_ref().and_then(|l| l.href.as_deref()) {
            w.empty("link", Attrs::new().with("rel", REL_EDIT).with("href", href))?;
        }
        for link in &entity.media_edit_links {
            // The entity's own stream is untitled; named streams are titled.
            let (rel, etag) = if link.title.is_empty() {
                (REL_EDIT_MEDIA.to_string(), entity.media_etag.as_deref())
            } else {
                (
                    format!("{}{}", self.names.edit_media_prefix, link.title),
                    link.media_etag.as_deref(),
                )
            };
            let attrs = Attrs::new()
                .with("rel", rel)
                .with_opt("title", non_empty(&link.title))
                .with_opt("type", link.link_type.as_deref())
                .with_opt("href", link.href.as_deref());
            let attrs = match etag {
                Some(etag) => attrs.qualified(&self.names.etag, etag),
                None => attrs,
            };
            w.empty("link", attrs)?;
        }
        for link in &entity.association_links {
            let attrs = Attrs::new()
                .with("rel", format!("{}{}", self.names.related_links_prefix, link.title))
                .with("type", ASSOCIATION_LINK_TYPE)
                .with("title", link.title.as_str())
                .with_opt("href", link.href.as_deref());
            w.empty("link", attrs)?;
        }
        Ok(())
    }

    fn write_deleted_entry<W: Write>(
        &self,
        w: &mut XmlWriter<W>,
        id: &str,
        reason: DeletedReason,
    ) -> Result<(), EncodeError> {
        let attrs = Attrs::new()
            .with("ref", id)
            .with(self.names.reason.prefixed(), reason.as_str());
        w.empty(&DELETED_ENTRY.prefixed(), attrs)
    }

    fn write_delta_link<W: Write>(
        &self,
        w: &mut XmlWriter<W>,
        name: &QName,
        link: LinkRecord<'_>,
    ) -> Result<(), EncodeError> {
        let attrs = Attrs::new()
            .with("source", link.source)
            .with("relationship", link.relationship)
            .with("target", link.target);
        w.empty(&name.prefixed(), attrs)
    }

    // -------------------------------------------------------------------------
    // Links and expansion
    // -------------------------------------------------------------------------

    fn write_navigation<W: Write>(
        &self,
        w: &mut XmlWriter<W>,
        source: &Entity,
        select: &SelectTree,
        expand: &ExpandTree,
        guard: &ExpandGuard,
    ) -> Result<(), EncodeError> {
        for link in &source.navigation_links {
            if let Some(rel) = &link.rel {
                let attrs = Attrs::new()
                    .with("rel", rel.as_str())
                    .with_opt("title", non_empty(&link.title))
                    .with_opt("type", link.link_type.as_deref())
                    .with_opt("href", link.href.as_deref());
                w.empty("link", attrs)?;
                continue;
            }
            let item = expand.get(&link.title);
            if item.is_none() && link.inline.is_none() && !select.is_selected(&link.title) {
                continue;
            }
            let resolver = item.and(self.ctx.resolver);
            let target = expansion_target(source, Some(link), &link.title, resolver);
            self.write_navigation_link(w, &link.title, link.href.as_deref(), target.as_deref(), item, guard)?;
        }

        // Expansions the entity carries no link for come from the resolver.
        for item in expand.items() {
            if source.navigation_links.iter().any(|l| l.title == item.navigation) {
                continue;
            }
            if let Some(inline) = expansion_target(source, None, &item.navigation, self.ctx.resolver) {
                self.write_navigation_link(w, &item.navigation, None, Some(&*inline), Some(item), guard)?;
            }
        }
        Ok(())
    }

    fn write_navigation_link<W: Write>(
        &self,
        w: &mut XmlWriter<W>,
        title: &str,
        href: Option<&str>,
        inline: Option<&Inline>,
        item: Option<&ExpandItem>,
        guard: &ExpandGuard,
    ) -> Result<(), EncodeError> {
        let link_type = inline.map(|inline| match inline {
            Inline::Entity(_) => ENTRY_CONTENT_TYPE,
            Inline::EntitySet(_) => FEED_CONTENT_TYPE,
        });
        let attrs = Attrs::new()
            .with("rel", format!("{}{}", self.names.related_prefix, title))
            .with_opt("type", link_type)
            .with("title", title)
            .with_opt("href", href);
        let Some(inline) = inline else {
            return w.empty("link", attrs);
        };

        let select = item.map_or_else(SelectTree::all, |i| i.select.clone());
        let expand = item.map(ExpandItem::next_level).unwrap_or_default();
        w.start("link", attrs)?;
        w.start(&self.names.inline.prefixed(), Attrs::new())?;
        match inline {
            Inline::Entity(target) => self.write_inline_member(w, target, &select, &expand, guard)?,
            Inline::EntitySet(set) => {
                w.start("feed", Attrs::new())?;
                if item.is_some_and(|i| i.count) {
                    let count = set.count.unwrap_or(set.entities.len() as i64);
                    w.text_element(&self.names.count.prefixed(), Attrs::new(), &count.to_string())?;
                }
                for member in &set.entities {
                    self.write_inline_member(w, member, &select, &expand, guard)?;
                }
                if let Some(next) = &set.next {
                    w.empty("link", Attrs::new().with("rel", REL_NEXT).with("href", next.as_str()))?;
                }
                w.end()?;
            }
        }
        w.end()?;
        w.end()
    }

    fn write_inline_member<W: Write>(
        &self,
        w: &mut XmlWriter<W>,
        target: &Entity,
        select: &SelectTree,
        expand: &ExpandTree,
        guard: &ExpandGuard,
    ) -> Result<(), EncodeError> {
        match guard.enter(target) {
            Visit::Expand(next) => self.write_entry(w, target, select, expand, &next, Attrs::new()),
            Visit::Reference(id) => self.write_entry_ref(w, Some(&id), Attrs::new()),
            Visit::Truncate => Ok(()),
        }
    }

    /// Bindings travel as plain navigation links, one per target.
    fn write_bindings<W: Write>(&self, w: &mut XmlWriter<W>, bindings: &[Link]) -> Result<(), EncodeError> {
        for link in bindings {
            let (targets, link_type): (Vec<&str>, _) = if link.bindings.is_empty() {
                (link.href.as_deref().into_iter().collect(), ENTRY_CONTENT_TYPE)
            } else {
                (link.bindings.iter().map(String::as_str).collect(), FEED_CONTENT_TYPE)
            };
            for target in targets {
                let attrs = Attrs::new()
                    .with("rel", format!("{}{}", self.names.related_prefix, link.title))
                    .with("type", link_type)
                    .with("title", link.title.as_str())
                    .with("href", target);
                w.empty("link", attrs)?;
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Properties and values
    // -------------------------------------------------------------------------

    /// `m:type` value. 4.0 writes primitives unqualified and without the
    /// `#` that marks model types (`Int32`, `#NS.Address`).
    fn type_attr(&self, info: &TypeInfo) -> String {
        let rendered = info.render_external(self.version());
        if info.is_primitive() {
            rendered.trim_start_matches('#').to_string()
        } else {
            rendered
        }
    }

    fn declared_type(&self, owner: Option<&str>, property: &str) -> Option<String> {
        let edm = self.ctx.edm?;
        let owner = owner?;
        edm.resolve_facets(owner, property).map(|f| f.type_name.clone())
    }

    fn write_annotations<W: Write>(
        &self,
        w: &mut XmlWriter<W>,
        annotations: &[Annotation],
        target: Option<&str>,
    ) -> Result<(), EncodeError> {
        if annotations.is_empty() {
            return Ok(());
        }
        if !self.version().is_v4() {
            trace!(count = annotations.len(), version = %self.version(), "instance annotations skipped");
            return Ok(());
        }
        let tag = self.names.annotation.prefixed();
        for annotation in annotations {
            let info = annotation.type_name.as_deref().map(TypeInfo::parse).transpose()?;
            check_value(&annotation.term, info.as_ref(), &annotation.value)?;
            let attrs = Attrs::new()
                .with("term", annotation.term.as_str())
                .with_opt("target", target);
            self.write_value(w, &tag, attrs, info.as_ref(), true, &annotation.value, &SelectTree::all())?;
        }
        Ok(())
    }

    fn write_properties<W: Write>(
        &self,
        w: &mut XmlWriter<W>,
        owner: Option<&str>,
        properties: &[Property],
        select: &SelectTree,
    ) -> Result<(), EncodeError> {
        w.start(&self.names.properties.prefixed(), Attrs::new())?;
        for property in properties {
            self.write_property(w, owner, property, select)?;
        }
        w.end()
    }

    fn write_property<W: Write>(
        &self,
        w: &mut XmlWriter<W>,
        owner: Option<&str>,
        property: &Property,
        select: &SelectTree,
    ) -> Result<(), EncodeError> {
        if !select.is_selected(&property.name) {
            return Ok(());
        }
        let declared = self.declared_type(owner, &property.name);
        let info = resolve_type(property, declared.as_deref())?;
        check_value(&property.name, info.as_ref(), &property.value)?;
        self.write_value(
            w,
            &data_element(&property.name),
            Attrs::new(),
            info.as_ref(),
            true,
            &property.value,
            &select.child(&property.name),
        )
    }

    /// Writes `value` as element `tag`. `typed` adds `m:type` when the type
    /// is known; collection items never repeat it.
    #[allow(clippy::too_many_arguments)]
    fn write_value<W: Write>(
        &self,
        w: &mut XmlWriter<W>,
        tag: &str,
        attrs: Attrs,
        info: Option<&TypeInfo>,
        typed: bool,
        value: &Value,
        select: &SelectTree,
    ) -> Result<(), EncodeError> {
        let attrs = match info {
            Some(info) if typed => attrs.qualified(&self.names.type_attr, self.type_attr(info)),
            _ => attrs,
        };
        match value {
            Value::Null => w.empty(tag, attrs.qualified(&self.names.null, "true")),
            Value::Primitive(literal) | Value::Enum(literal) => w.text_element(tag, attrs, literal),
            Value::Geospatial(geo) => {
                w.start(tag, attrs)?;
                write_gml(w, geo, tag)?;
                w.end()
            }
            Value::Complex(members) => self.write_members(w, tag, attrs, info, members, select),
            Value::LinkedComplex(linked) => {
                if !linked.navigation_links.is_empty() || !linked.association_links.is_empty() {
                    trace!(property = tag, "links of complex values have no Atom form");
                }
                self.write_members(w, tag, attrs, info, &linked.properties, select)
            }
            Value::Collection(items) => {
                let element = info.map(TypeInfo::element);
                let item_tag = self.names.element.prefixed();
                w.start(tag, attrs)?;
                for item in items.iter() {
                    self.write_value(w, &item_tag, Attrs::new(), element.as_ref(), false, item, select)?;
                }
                w.end()
            }
        }
    }

    fn write_members<W: Write>(
        &self,
        w: &mut XmlWriter<W>,
        tag: &str,
        attrs: Attrs,
        info: Option<&TypeInfo>,
        members: &[Property],
        select: &SelectTree,
    ) -> Result<(), EncodeError> {
        let owner = info.map(TypeInfo::qualified_name);
        w.start(tag, attrs)?;
        for member in members {
            self.write_property(w, owner.as_deref(), member, select)?;
        }
        w.end()
    }
}

fn non_empty(text: &str) -> Option<&str> {
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edm::{PropertyFacets, SchemaContext};
    use crate::error::ErrorCode;
    use crate::model::{Collection, DeltaBuilder, Dimension, EntityBuilder, Geospatial, ValueKind};
    use crate::query::Levels;

    fn render(f: impl FnOnce(&mut Vec<u8>) -> Result<(), EncodeError>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn person() -> Entity {
        EntityBuilder::new()
            .id("People(1)")
            .type_name("NS.Person")
            .etag("W/\"1\"")
            .string("Name", "Ann & Bob")
            .int32("Age", 42)
            .build()
    }

    #[test]
    fn test_entry_layout() {
        let ctx = SerializeContext::new(ODataVersion::V4).context_url("$metadata#People/$entity");
        let xml = render(|buf| AtomSerializer::new().serialize_entity(buf, &person(), &ctx));
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="utf-8"?><entry xmlns="http://www.w3.org/2005/Atom""#));
        assert!(xml.contains(r#"m:context="$metadata#People/$entity""#));
        assert!(xml.contains(r#"m:etag="W/&quot;1&quot;""#));
        assert!(xml.contains("<id>People(1)</id>"));
        assert!(xml.contains(
            r##"<category term="#NS.Person" scheme="http://docs.oasis-open.org/odata/ns/scheme"/>"##
        ));
        assert!(xml.contains(
            r#"<content type="application/xml"><m:properties><d:Name m:type="String">Ann &amp; Bob</d:Name><d:Age m:type="Int32">42</d:Age></m:properties></content>"#
        ));
        assert!(xml.ends_with("</entry>"));
    }

    #[test]
    fn test_bare_entity_becomes_entry_ref() {
        let entity = EntityBuilder::new().id("People(7)").build();
        let ctx = SerializeContext::new(ODataVersion::V4);
        let xml = render(|buf| AtomSerializer::new().serialize_entity(buf, &entity, &ctx));
        assert!(xml.contains("<m:ref xmlns="));
        assert!(xml.ends_with(r#"id="People(7)"/>"#));
        assert!(!xml.contains("<entry"));
    }

    #[test]
    fn test_v3_typing_and_element_namespace() {
        let tags = Collection::from_items(ValueKind::Primitive, vec![Value::primitive("a"), Value::Null]).unwrap();
        let entity = EntityBuilder::new()
            .type_name("NS.Person")
            .collection("Tags", "Edm.String", tags)
            .null("Nick", "Edm.String")
            .build();
        let ctx = SerializeContext::new(ODataVersion::V3).context_url("ignored");
        let xml = render(|buf| AtomSerializer::new().serialize_entity(buf, &entity, &ctx));
        assert!(!xml.contains("m:context"));
        assert!(xml.contains(r#"<category term="NS.Person""#));
        assert!(xml.contains(
            r#"<d:Tags m:type="Collection(Edm.String)"><d:element>a</d:element><d:element m:null="true"/></d:Tags>"#
        ));
        assert!(xml.contains(r#"<d:Nick m:type="Edm.String" m:null="true"/>"#));
    }

    #[test]
    fn test_links_media_and_operations() {
        let entity = EntityBuilder::new()
            .id("Photos(1)")
            .type_name("NS.Photo")
            .read_link("Photos(1)")
            .edit_link("Photos(1)")
            .media("image/png", "Photos(1)/$value")
            .media_edit_link("", "Photos(1)/$value")
            .media_etag("m1")
            .media_edit_link("Thumb", "Photos(1)/Thumb")
            .association("Owner", "Photos(1)/Owner/$ref")
            .navigation("Owner", "Photos(1)/Owner")
            .action("#NS.Rotate", "Photos(1)/NS.Rotate")
            .string("Caption", "hi")
            .build();
        let ctx = SerializeContext::new(ODataVersion::V4);
        let xml = render(|buf| AtomSerializer::new().serialize_entity(buf, &entity, &ctx));
        assert!(xml.contains(r#"<link rel="self" href="Photos(1)"/>"#));
        assert!(xml.contains(r#"<link rel="edit-media" href="Photos(1)/$value" m:etag="m1"/>"#));
        assert!(xml.contains(
            r#"<link rel="http://docs.oasis-open.org/odata/ns/edit-media/Thumb" title="Thumb" href="Photos(1)/Thumb"/>"#
        ));
        assert!(xml.contains(
            r#"<link rel="http://docs.oasis-open.org/odata/ns/relatedlinks/Owner" type="application/xml" title="Owner" href="Photos(1)/Owner/$ref"/>"#
        ));
        assert!(xml.contains(
            r#"<link rel="http://docs.oasis-open.org/odata/ns/related/Owner" title="Owner" href="Photos(1)/Owner"/>"#
        ));
        assert!(xml.contains(r##"<m:action metadata="#NS.Rotate" target="Photos(1)/NS.Rotate"/>"##));
        assert!(xml.contains(r#"<content type="image/png" src="Photos(1)/$value"/><m:properties>"#));
    }

    #[test]
    fn test_inline_feed_with_count_and_cycle() {
        let a = EntityBuilder::new().id("A").type_name("NS.Node").string("Name", "a").build();
        let b = EntityBuilder::new()
            .id("B")
            .type_name("NS.Node")
            .string("Name", "b")
            .expand_entity("Next", a.clone())
            .build();
        let root = EntityBuilder::new()
            .id("A")
            .type_name("NS.Node")
            .string("Name", "a")
            .expand_set("Kids", EntityCollection::new(vec![b]))
            .build();
        let expand = ExpandTree::new(vec![ExpandItem::new("Kids")
            .with_count()
            .levels(Levels::Max)]);
        let ctx = SerializeContext::new(ODataVersion::V4).expand(expand);
        let xml = render(|buf| AtomSerializer::new().serialize_entity(buf, &root, &ctx));
        assert!(xml.contains(r#"type="application/atom+xml;type=feed" title="Kids""#));
        assert!(xml.contains("<m:inline><feed><m:count>1</m:count><entry>"));
        // A is already on the branch, so B's link to it is a reference.
        assert!(xml.contains(r#"<m:inline><m:ref id="A"/></m:inline>"#));
    }

    #[test]
    fn test_geography_and_annotations() {
        let entity = EntityBuilder::new()
            .type_name("NS.Place")
            .geo("Where", Geospatial::point(Dimension::Geography, 1.0, 2.0))
            .annotation(Annotation::new("NS.note", Value::primitive("x")))
            .build();
        let v4 = render(|buf| {
            AtomSerializer::new().serialize_entity(buf, &entity, &SerializeContext::new(ODataVersion::V4))
        });
        assert!(v4.contains(r#"<d:Where m:type="GeographyPoint"><gml:Point><gml:pos>1 2</gml:pos></gml:Point></d:Where>"#));
        assert!(v4.contains(r#"<m:annotation term="NS.note">x</m:annotation>"#));

        let v3 = render(|buf| {
            AtomSerializer::new().serialize_entity(buf, &entity, &SerializeContext::new(ODataVersion::V3))
        });
        assert!(!v3.contains("m:annotation"));
        assert!(v3.contains(r#"m:type="Edm.GeographyPoint""#));
    }

    #[test]
    fn test_declared_types_and_literal_checks() {
        let mut schema = SchemaContext::new();
        schema.add_property("NS.Person", "Age", PropertyFacets::new("Edm.Int32"));
        let entity = EntityBuilder::new()
            .type_name("NS.Person")
            .value("Age", Value::primitive("7"))
            .build();
        let ctx = SerializeContext::new(ODataVersion::V4).edm(&schema);
        let xml = render(|buf| AtomSerializer::new().serialize_entity(buf, &entity, &ctx));
        assert!(xml.contains(r#"<d:Age m:type="Int32">7</d:Age>"#));

        let bad = EntityBuilder::new()
            .type_name("NS.Person")
            .value("Age", Value::primitive("seven"))
            .build();
        let err = AtomSerializer::new()
            .serialize_entity(Vec::new(), &bad, &ctx)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::WrongPropertyValue);
    }

    #[test]
    fn test_feed_delta_and_references() {
        let set = EntityCollection {
            next: Some("People?$skip=1".to_string()),
            ..EntityCollection::new(vec![person()])
        };
        let ctx = SerializeContext::new(ODataVersion::V4).with_count();
        let xml = render(|buf| AtomSerializer::new().serialize_entity_collection(buf, &set, &ctx));
        assert!(xml.contains("<m:count>1</m:count>"));
        assert!(xml.ends_with(r#"<link rel="next" href="People?$skip=1"/></feed>"#));

        let delta = DeltaBuilder::new()
            .deleted_link("People(1)", "Friends", "People(2)")
            .deleted("People(3)", DeletedReason::Changed)
            .added_link("People(1)", "Friends", "People(4)")
            .delta_link("People?$deltatoken=9")
            .build();
        let xml = render(|buf| AtomSerializer::new().serialize_delta(buf, &delta, &SerializeContext::new(ODataVersion::V4)));
        let deleted = xml.find(r#"<at:deleted-entry ref="People(3)" reason="changed"/>"#).unwrap();
        let added = xml.find(r#"<m:link source="People(1)" relationship="Friends" target="People(4)"/>"#).unwrap();
        let removed = xml.find("<m:deleted-link ").unwrap();
        assert!(deleted < added && added < removed);
        assert!(xml.contains(r#"xmlns:at="http://purl.org/atompub/tombstones/1.0""#));
        assert!(xml.contains(r#"<link rel="http://docs.oasis-open.org/odata/ns/delta" href="People?$deltatoken=9"/>"#));

        assert!(matches!(
            AtomSerializer::new().serialize_delta(Vec::new(), &delta, &SerializeContext::new(ODataVersion::V2)),
            Err(EncodeError::UnsupportedPayload { .. })
        ));

        let refs = render(|buf| {
            AtomSerializer::new().serialize_references(buf, &["People(1)"], &SerializeContext::new(ODataVersion::V3))
        });
        assert!(refs.ends_with(
            r#"<links xmlns="http://schemas.microsoft.com/ado/2007/08/dataservices"><uri>People(1)</uri></links>"#
        ));
    }

    #[test]
    fn test_property_and_error_documents() {
        let property = Property::typed("Age", "Edm.Int32", Value::primitive("42"));
        let v4 = render(|buf| AtomSerializer::new().serialize_property(buf, &property, &SerializeContext::new(ODataVersion::V4)));
        assert!(v4.contains("<m:value xmlns="));
        assert!(v4.ends_with(r#"m:type="Int32">42</m:value>"#));
        let v3 = render(|buf| AtomSerializer::new().serialize_property(buf, &property, &SerializeContext::new(ODataVersion::V3)));
        assert!(v3.ends_with(r#"m:type="Edm.Int32">42</d:Age>"#));

        let mut error = ServerError::new("E1", "boom");
        error.inner_error.insert("trace".to_string(), "x".to_string());
        let xml = render(|buf| AtomSerializer::new().serialize_error(buf, &error, ODataVersion::V3));
        assert!(xml.contains(r#"<m:code>E1</m:code><m:message xml:lang="en-US">boom</m:message>"#));
        assert!(xml.contains("<m:innererror><m:trace>x</m:trace></m:innererror>"));
    }
}
