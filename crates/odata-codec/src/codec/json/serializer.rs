//! JSON serializer.
//!
//! Entry points write one complete document to a sink. Control information
//! is gated by the metadata level of the [`SerializeContext`]; its spelling
//! comes from the dialect's [`JsonNames`].

use std::io::Write;

use serde_json::Value as Json;
use tracing::{debug, trace, warn};

use super::generator::JsonGenerator;
use super::geo::write_geo;
use super::{JsonMode, JsonOptions};
use crate::codec::delta::{assemble, DeltaRecord, LinkRecord};
use crate::codec::expand::{expansion_target, ExpandGuard, Visit};
use crate::codec::primitive::{check_value, json_shape, resolve_type, value_needs_annotation, JsonShape};
use crate::context::{ContextKind, ContextUrl, SerializeContext};
use crate::edm::{EdmPrimitiveKind, TypeInfo};
use crate::error::EncodeError;
use crate::model::{
    Annotation, DeletedReason, Delta, Entity, EntityCollection, Inline, Link, Property, ServerError, Value,
};
use crate::names::json::{DELETED_ID, DELETED_REASON, LINK_RELATIONSHIP, LINK_SOURCE, LINK_TARGET};
use crate::names::{json_names, Field, JsonNames};
use crate::query::{ExpandItem, ExpandTree, SelectTree};
use crate::validate::validate_entity;
use crate::version::{MetadataLevel, ODataVersion};

/// Writes OData JSON documents.
///
/// The serializer itself only holds [`JsonOptions`]; everything that varies
/// per call travels in the [`SerializeContext`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer {
    options: JsonOptions,
}

impl JsonSerializer {
    pub fn new(options: JsonOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> JsonOptions {
        self.options
    }

    /// Content type announcing what this serializer writes for `ctx`.
    pub fn content_type(&self, ctx: &SerializeContext<'_>) -> String {
        match ctx.version {
            ODataVersion::V2 => "application/json;odata=verbose".to_string(),
            ODataVersion::V3 => format!("application/json;odata={}metadata", ctx.metadata.as_str()),
            ODataVersion::V4 | ODataVersion::V401 => {
                let mut content_type = format!("application/json;odata.metadata={}", ctx.metadata.as_str());
                if self.options.ieee754_compatible {
                    content_type.push_str(";IEEE754Compatible=true");
                }
                content_type
            }
        }
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Writes a single-entity document.
    pub fn serialize_entity<W: Write>(
        &self,
        writer: W,
        entity: &Entity,
        ctx: &SerializeContext<'_>,
    ) -> Result<(), EncodeError> {
        debug!(version = %ctx.version, metadata = ctx.metadata.as_str(), payload = "entity", "serializing JSON");
        if let Some(edm) = ctx.edm {
            validate_entity(entity, edm)?;
        }
        let session = Session::new(ctx, self.options);
        let mut g = JsonGenerator::new(writer);
        session.open_document(&mut g)?;
        session.write_header(&mut g, ContextKind::Entity)?;
        session.write_entity_members(
            &mut g,
            entity,
            &ctx.select,
            &ctx.expand,
            &ExpandGuard::root(entity),
            ctx.expected_type.as_deref(),
        )?;
        session.close_document(&mut g)?;
        g.flush()
    }

    /// Writes an entity-set document.
    pub fn serialize_entity_collection<W: Write>(
        &self,
        writer: W,
        set: &EntityCollection,
        ctx: &SerializeContext<'_>,
    ) -> Result<(), EncodeError> {
        debug!(
            version = %ctx.version,
            metadata = ctx.metadata.as_str(),
            payload = "entity set",
            entities = set.entities.len(),
            "serializing JSON"
        );
        if let Some(edm) = ctx.edm {
            for entity in &set.entities {
                validate_entity(entity, edm)?;
            }
        }
        let session = Session::new(ctx, self.options);
        let mut g = JsonGenerator::new(writer);
        session.open_document(&mut g)?;
        session.write_header(&mut g, ContextKind::EntitySet)?;
        let count = ctx
            .count
            .then(|| set.count.unwrap_or(set.entities.len() as i64));
        session.write_collection_head(&mut g, count, &set.annotations)?;
        session.begin_value_array(&mut g)?;
        for entity in &set.entities {
            session.write_entity(
                &mut g,
                entity,
                &ctx.select,
                &ctx.expand,
                &ExpandGuard::root(entity),
                ctx.expected_type.as_deref(),
            )?;
        }
        g.end_array()?;
        session.write_collection_tail(&mut g, set.next.as_deref(), set.delta_link.as_deref())?;
        session.close_document(&mut g)?;
        g.flush()
    }

    /// Writes an entity-set document from a lazily produced sequence.
    ///
    /// Each entity is rendered completely before any of its bytes reach
    /// `writer`, so the output always ends on an entity boundary. When
    /// pulling or rendering an entity fails, the bytes written so far stay
    /// as they are, `on_error` may append an out-of-band marker, and the
    /// call returns `Ok`. Only a failing sink is reported as `Err`.
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
        debug!(version = %ctx.version, metadata = ctx.metadata.as_str(), payload = "entity stream", "serializing JSON");
        let session = Session::new(ctx, self.options);
        let mut g = JsonGenerator::new(writer);
        session.open_document(&mut g)?;
        session.write_header(&mut g, ContextKind::EntitySet)?;
        session.begin_value_array(&mut g)?;
        for (index, item) in entities.into_iter().enumerate() {
            match item.and_then(|entity| session.render_entity(&entity)) {
                Ok(bytes) => g.raw_value(&bytes)?,
                Err(err) => {
                    warn!(index, error = %err, "entity stream stopped");
                    g.flush()?;
                    on_error(&err, g.writer_mut())?;
                    return g.flush();
                }
            }
        }
        g.end_array()?;
        session.close_document(&mut g)?;
        g.flush()
    }

    // =========================================================================
    // Properties, references, deltas, errors
    // =========================================================================

    /// Writes an individual property document.
    pub fn serialize_property<W: Write>(
        &self,
        writer: W,
        property: &Property,
        ctx: &SerializeContext<'_>,
    ) -> Result<(), EncodeError> {
        debug!(version = %ctx.version, metadata = ctx.metadata.as_str(), payload = "property", "serializing JSON");
        let session = Session::new(ctx, self.options);
        let mut g = JsonGenerator::new(writer);
        session.write_property_document(&mut g, property)?;
        g.flush()
    }

    /// Writes an entity reference document (`$ref`).
    pub fn serialize_reference<W: Write>(
        &self,
        writer: W,
        id: &str,
        ctx: &SerializeContext<'_>,
    ) -> Result<(), EncodeError> {
        debug!(version = %ctx.version, payload = "reference", "serializing JSON");
        let session = Session::new(ctx, self.options);
        let mut g = JsonGenerator::new(writer);
        session.open_document(&mut g)?;
        session.write_reference_context(&mut g, ContextKind::Reference)?;
        g.string_field(session.names.reference_key, id)?;
        session.close_document(&mut g)?;
        g.flush()
    }

    /// Writes a collection of entity references.
    pub fn serialize_references<W: Write, S: AsRef<str>>(
        &self,
        writer: W,
        ids: &[S],
        ctx: &SerializeContext<'_>,
    ) -> Result<(), EncodeError> {
        debug!(version = %ctx.version, payload = "references", count = ids.len(), "serializing JSON");
        let session = Session::new(ctx, self.options);
        let mut g = JsonGenerator::new(writer);
        session.open_document(&mut g)?;
        session.write_reference_context(&mut g, ContextKind::References)?;
        session.begin_value_array(&mut g)?;
        for id in ids {
            g.begin_object()?;
            g.string_field(session.names.reference_key, id.as_ref())?;
            g.end_object()?;
        }
        g.end_array()?;
        session.close_document(&mut g)?;
        g.flush()
    }

    /// Writes a delta document.
    ///
    /// Every record is validated before the first byte is written. 2.0 has
    /// no delta payload.
    pub fn serialize_delta<W: Write>(
        &self,
        writer: W,
        delta: &Delta,
        ctx: &SerializeContext<'_>,
    ) -> Result<(), EncodeError> {
        debug!(version = %ctx.version, metadata = ctx.metadata.as_str(), payload = "delta", "serializing JSON");
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

        let session = Session::new(ctx, self.options);
        let mut g = JsonGenerator::new(writer);
        session.open_document(&mut g)?;
        session.write_header(&mut g, ContextKind::Delta)?;
        session.write_collection_head(&mut g, delta.count, &[])?;
        session.begin_value_array(&mut g)?;
        for record in records {
            match record {
                DeltaRecord::Entity(entity) => session.write_entity(
                    &mut g,
                    entity,
                    &ctx.select,
                    &ctx.expand,
                    &ExpandGuard::root(entity),
                    ctx.expected_type.as_deref(),
                )?,
                DeltaRecord::Deleted { id, reason } => session.write_deleted_entity(&mut g, id, reason)?,
                DeltaRecord::AddedLink(link) => session.write_delta_link(&mut g, ContextKind::Link, link)?,
                DeltaRecord::DeletedLink(link) => session.write_delta_link(&mut g, ContextKind::DeletedLink, link)?,
            }
        }
        g.end_array()?;
        session.write_collection_tail(&mut g, delta.next.as_deref(), delta.delta_link.as_deref())?;
        session.close_document(&mut g)?;
        g.flush()
    }

    /// Writes an error document.
    pub fn serialize_error<W: Write>(
        &self,
        writer: W,
        error: &ServerError,
        version: ODataVersion,
    ) -> Result<(), EncodeError> {
        debug!(version = %version, payload = "error", code = %error.code, "serializing JSON");
        let names = json_names(version);
        let mut g = JsonGenerator::new(writer);
        g.begin_object()?;
        g.key(names.error_key)?;
        g.begin_object()?;
        g.string_field("code", &error.code)?;
        write_error_message(&mut g, &error.message, version)?;
        if let Some(target) = &error.target {
            g.string_field("target", target)?;
        }
        if !error.details.is_empty() {
            g.key("details")?;
            g.begin_array()?;
            for detail in &error.details {
                g.begin_object()?;
                g.string_field("code", &detail.code)?;
                write_error_message(&mut g, &detail.message, version)?;
                if let Some(target) = &detail.target {
                    g.string_field("target", target)?;
                }
                g.end_object()?;
            }
            g.end_array()?;
        }
        if !error.inner_error.is_empty() {
            g.key("innererror")?;
            g.begin_object()?;
            for (key, raw) in &error.inner_error {
                g.key(key)?;
                write_raw_text(&mut g, raw)?;
            }
            g.end_object()?;
        }
        g.end_object()?;
        g.end_object()?;
        g.flush()
    }
}

/// 4.x messages are strings; earlier dialects wrap them with a language.
fn write_error_message<W: Write>(
    g: &mut JsonGenerator<W>,
    message: &str,
    version: ODataVersion,
) -> Result<(), EncodeError> {
    g.key("message")?;
    if version.is_v4() {
        return g.string(message);
    }
    g.begin_object()?;
    g.string_field("lang", "en-US")?;
    g.string_field("value", message)?;
    g.end_object()
}

/// Inner-error values keep their JSON form when they have one.
fn write_raw_text<W: Write>(g: &mut JsonGenerator<W>, raw: &str) -> Result<(), EncodeError> {
    match serde_json::from_str::<Json>(raw) {
        Ok(node) if !node.is_string() => {
            let bytes = serde_json::to_vec(&node).map_err(|e| EncodeError::WriteFailed(e.to_string()))?;
            g.raw_value(&bytes)
        }
        _ => g.string(raw),
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// Read-only state of one serialize call.
struct Session<'s, 'a> {
    ctx: &'s SerializeContext<'a>,
    names: &'static JsonNames,
    options: JsonOptions,
}

impl<'s, 'a> Session<'s, 'a> {
    fn new(ctx: &'s SerializeContext<'a>, options: JsonOptions) -> Self {
        Self {
            ctx,
            names: json_names(ctx.version),
            options,
        }
    }

    fn version(&self) -> ODataVersion {
        self.ctx.version
    }

    /// 2.0 verbose JSON has no metadata levels and always writes everything.
    fn verbose(&self) -> bool {
        self.version() == ODataVersion::V2
    }

    fn level(&self) -> MetadataLevel {
        if self.verbose() {
            MetadataLevel::Full
        } else {
            self.ctx.metadata
        }
    }

    fn server(&self) -> bool {
        self.options.mode == JsonMode::Server
    }

    /// Verbose JSON writes 64-bit integers and decimals as strings too.
    fn ieee754(&self) -> bool {
        self.options.ieee754_compatible || self.verbose()
    }

    // -------------------------------------------------------------------------
    // Document frame
    // -------------------------------------------------------------------------

    fn open_document<W: Write>(&self, g: &mut JsonGenerator<W>) -> Result<(), EncodeError> {
        g.begin_object()?;
        if let Some(wrapper) = self.names.wrapper {
            g.key(wrapper)?;
            g.begin_object()?;
        }
        Ok(())
    }

    fn close_document<W: Write>(&self, g: &mut JsonGenerator<W>) -> Result<(), EncodeError> {
        if self.names.wrapper.is_some() {
            g.end_object()?;
        }
        g.end_object()
    }

    fn write_header<W: Write>(&self, g: &mut JsonGenerator<W>, kind: ContextKind) -> Result<(), EncodeError> {
        if self.level() == MetadataLevel::None || self.verbose() {
            return Ok(());
        }
        if let (Some(key), Some(url)) = (self.names.get(Field::Context), self.ctx.resolve_context_url(kind)) {
            g.string_field(key, &url)?;
        }
        if let (Some(key), Some(etag)) = (self.names.get(Field::MetadataEtag), self.ctx.metadata_etag.as_deref()) {
            g.string_field(key, etag)?;
        }
        Ok(())
    }

    fn write_reference_context<W: Write>(
        &self,
        g: &mut JsonGenerator<W>,
        kind: ContextKind,
    ) -> Result<(), EncodeError> {
        if self.level() == MetadataLevel::None || self.verbose() {
            return Ok(());
        }
        let url = self.ctx.context_url.clone().or_else(|| {
            self.ctx
                .base_url
                .as_deref()
                .map(|root| ContextUrl::new(root, kind).build())
        });
        if let (Some(key), Some(url)) = (self.names.get(Field::Context), url) {
            g.string_field(key, &url)?;
        }
        Ok(())
    }

    fn write_collection_head<W: Write>(
        &self,
        g: &mut JsonGenerator<W>,
        count: Option<i64>,
        annotations: &[Annotation],
    ) -> Result<(), EncodeError> {
        if self.level() == MetadataLevel::None {
            return Ok(());
        }
        if let (Some(count), Some(key)) = (count, self.names.get(Field::Count)) {
            g.key(key)?;
            self.write_count(g, count)?;
        }
        self.write_annotations(g, &Entity::new(), None, annotations, &ExpandGuard::empty())
    }

    fn begin_value_array<W: Write>(&self, g: &mut JsonGenerator<W>) -> Result<(), EncodeError> {
        g.key(self.names.value_key)?;
        g.begin_array()
    }

    fn write_collection_tail<W: Write>(
        &self,
        g: &mut JsonGenerator<W>,
        next: Option<&str>,
        delta_link: Option<&str>,
    ) -> Result<(), EncodeError> {
        if self.level() == MetadataLevel::None {
            return Ok(());
        }
        if let Some(next) = next {
            self.control(g, Field::NextLink, next)?;
        }
        if let Some(delta_link) = delta_link {
            self.control(g, Field::DeltaLink, delta_link)?;
        }
        Ok(())
    }

    fn write_count<W: Write>(&self, g: &mut JsonGenerator<W>, count: i64) -> Result<(), EncodeError> {
        let literal = count.to_string();
        if self.ieee754() {
            g.string(&literal)
        } else {
            g.number(&literal)
        }
    }

    /// Writes an instance-level control field, if the dialect spells it.
    fn control<W: Write>(&self, g: &mut JsonGenerator<W>, field: Field, value: &str) -> Result<(), EncodeError> {
        match self.names.get(field) {
            Some(key) => g.string_field(key, value),
            None => Ok(()),
        }
    }

    // -------------------------------------------------------------------------
    // Entities
    // -------------------------------------------------------------------------

    /// Renders one entity on its own, for streaming.
    fn render_entity(&self, entity: &Entity) -> Result<Vec<u8>, EncodeError> {
        if let Some(edm) = self.ctx.edm {
            validate_entity(entity, edm)?;
        }
        let mut g = JsonGenerator::new(Vec::new());
        self.write_entity(
            &mut g,
            entity,
            &self.ctx.select,
            &self.ctx.expand,
            &ExpandGuard::root(entity),
            self.ctx.expected_type.as_deref(),
        )?;
        Ok(g.into_inner())
    }

    fn write_entity<W: Write>(
        &self,
        g: &mut JsonGenerator<W>,
        entity: &Entity,
        select: &SelectTree,
        expand: &ExpandTree,
        guard: &ExpandGuard,
        expected_type: Option<&str>,
    ) -> Result<(), EncodeError> {
        g.begin_object()?;
        self.write_entity_members(g, entity, select, expand, guard, expected_type)?;
        g.end_object()
    }

    fn write_entity_members<W: Write>(
        &self,
        g: &mut JsonGenerator<W>,
        entity: &Entity,
        select: &SelectTree,
        expand: &ExpandTree,
        guard: &ExpandGuard,
        expected_type: Option<&str>,
    ) -> Result<(), EncodeError> {
        trace!(id = entity.id.as_deref().unwrap_or(""), depth = guard.depth(), "writing entity");
        if self.verbose() {
            self.write_verbose_metadata(g, entity)?;
        } else {
            self.write_entity_control(g, entity, expected_type, guard)?;
        }
        for property in &entity.properties {
            self.write_property(g, entity, entity.type_name.as_deref(), property, select, guard)?;
        }
        self.write_named_streams(g, entity)?;
        self.write_links(
            g,
            entity,
            LinkSet {
                navigation: &entity.navigation_links,
                association: &entity.association_links,
                binding: &entity.binding_links,
            },
            select,
            expand,
            guard,
        )
    }

    fn write_entity_control<W: Write>(
        &self,
        g: &mut JsonGenerator<W>,
        entity: &Entity,
        expected_type: Option<&str>,
        guard: &ExpandGuard,
    ) -> Result<(), EncodeError> {
        let level = self.level();
        if level == MetadataLevel::None {
            return Ok(());
        }
        let full = level == MetadataLevel::Full;

        if let Some(type_name) = entity.type_name.as_deref() {
            if full || expected_type.is_some_and(|expected| expected != type_name) {
                let rendered = TypeInfo::parse(type_name)?.render_external(self.version());
                self.control(g, Field::Type, &rendered)?;
            }
        }
        if let Some(id) = &entity.id {
            self.control(g, Field::Id, id)?;
        }
        if let Some(etag) = &entity.etag {
            self.control(g, Field::Etag, etag)?;
        }
        if full {
            if let Some(href) = entity.self_link.as_ref().and_then(|l| l.href.as_deref()) {
                self.control(g, Field::ReadLink, href)?;
            }
            if let Some(href) = entity.edit_link.as_ref().and_then(|l| l.href.as_deref()) {
                self.control(g, Field::EditLink, href)?;
            }
            if let Some(source) = &entity.media_content_source {
                self.control(g, Field::MediaReadLink, source)?;
            }
            if let Some(href) = entity_media_edit_link(entity) {
                self.control(g, Field::MediaEditLink, href)?;
            }
        }
        if let Some(content_type) = &entity.media_content_type {
            self.control(g, Field::MediaContentType, content_type)?;
        }
        if let Some(etag) = &entity.media_etag {
            self.control(g, Field::MediaEtag, etag)?;
        }
        self.write_annotations(g, entity, None, &entity.annotations, guard)?;

        if full && self.server() {
            for operation in &entity.operations {
                let key = if operation.metadata_anchor.starts_with('#') {
                    operation.metadata_anchor.clone()
                } else {
                    format!("#{}", operation.metadata_anchor)
                };
                g.key(&key)?;
                g.begin_object()?;
                if let Some(title) = &operation.title {
                    g.string_field("title", title)?;
                }
                if let Some(target) = &operation.target {
                    g.string_field("target", target)?;
                }
                g.end_object()?;
            }
        }
        Ok(())
    }

    /// 2.0 groups entity control fields in `__metadata`.
    fn write_verbose_metadata<W: Write>(&self, g: &mut JsonGenerator<W>, entity: &Entity) -> Result<(), EncodeError> {
        let Some(object) = self.names.metadata_object else {
            return Ok(());
        };
        let fields: Vec<(Field, &str)> = [
            (Field::Id, entity.id.as_deref()),
            (Field::Type, entity.type_name.as_deref()),
            (Field::Etag, entity.etag.as_deref()),
            (Field::MediaReadLink, entity.media_content_source.as_deref()),
            (Field::MediaEditLink, entity_media_edit_link(entity)),
            (Field::MediaContentType, entity.media_content_type.as_deref()),
            (Field::MediaEtag, entity.media_etag.as_deref()),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.map(|v| (field, v)))
        .collect();
        if fields.is_empty() {
            return Ok(());
        }
        g.key(object)?;
        g.begin_object()?;
        for (field, value) in fields {
            self.control(g, field, value)?;
        }
        g.end_object()
    }

    fn write_named_streams<W: Write>(&self, g: &mut JsonGenerator<W>, entity: &Entity) -> Result<(), EncodeError> {
        if self.verbose() || self.level() != MetadataLevel::Full {
            return Ok(());
        }
        for link in entity.media_edit_links.iter().filter(|l| !l.title.is_empty()) {
            let suffixed = [
                (Field::MediaEditLink, link.href.as_deref()),
                (Field::MediaContentType, link.link_type.as_deref()),
                (Field::MediaEtag, link.media_etag.as_deref()),
            ];
            for (field, value) in suffixed {
                if let (Some(value), Some(key)) = (value, self.names.property_key(&link.title, field)) {
                    g.string_field(&key, value)?;
                }
            }
        }
        Ok(())
    }

    fn write_deleted_entity<W: Write>(
        &self,
        g: &mut JsonGenerator<W>,
        id: &str,
        reason: DeletedReason,
    ) -> Result<(), EncodeError> {
        g.begin_object()?;
        if let Some(removed) = self.names.get(Field::Removed) {
            g.key(removed)?;
            g.begin_object()?;
            g.string_field(DELETED_REASON, reason.as_str())?;
            g.end_object()?;
            self.control(g, Field::Id, id)?;
        } else {
            self.write_record_context(g, ContextKind::DeletedEntity)?;
            g.string_field(DELETED_ID, id)?;
            g.string_field(DELETED_REASON, reason.as_str())?;
        }
        g.end_object()
    }

    fn write_delta_link<W: Write>(
        &self,
        g: &mut JsonGenerator<W>,
        kind: ContextKind,
        link: LinkRecord<'_>,
    ) -> Result<(), EncodeError> {
        g.begin_object()?;
        self.write_record_context(g, kind)?;
        g.string_field(LINK_SOURCE, link.source)?;
        g.string_field(LINK_RELATIONSHIP, link.relationship)?;
        g.string_field(LINK_TARGET, link.target)?;
        g.end_object()
    }

    fn write_record_context<W: Write>(&self, g: &mut JsonGenerator<W>, kind: ContextKind) -> Result<(), EncodeError> {
        self.control(g, Field::Context, &self.ctx.delta_record_context(kind))
    }

    // -------------------------------------------------------------------------
    // Links and expansion
    // -------------------------------------------------------------------------

    fn write_links<W: Write>(
        &self,
        g: &mut JsonGenerator<W>,
        source: &Entity,
        links: LinkSet<'_>,
        select: &SelectTree,
        expand: &ExpandTree,
        guard: &ExpandGuard,
    ) -> Result<(), EncodeError> {
        let advertise = self.server() && self.level() == MetadataLevel::Full && !self.verbose();

        if advertise {
            for link in links.association {
                if let (Some(href), Some(key)) = (
                    link.href.as_deref(),
                    self.names.property_key(&link.title, Field::AssociationLink),
                ) {
                    g.string_field(&key, href)?;
                }
            }
        }

        for link in links.navigation {
            let item = expand.get(&link.title);
            if item.is_none() && link.inline.is_none() && !select.is_selected(&link.title) {
                continue;
            }
            if advertise {
                if let (Some(href), Some(key)) = (
                    link.href.as_deref(),
                    self.names.property_key(&link.title, Field::NavigationLink),
                ) {
                    g.string_field(&key, href)?;
                }
            }
            let resolver = item.and(self.ctx.resolver);
            match expansion_target(source, Some(link), &link.title, resolver) {
                Some(inline) => self.write_inline(g, &link.title, &inline, item, guard)?,
                None if self.verbose() && self.server() => self.write_deferred(g, link)?,
                None => {}
            }
        }

        // Expansions the entity carries no link for come from the resolver.
        for item in expand.items() {
            if links.navigation.iter().any(|l| l.title == item.navigation) {
                continue;
            }
            if let Some(inline) = expansion_target(source, None, &item.navigation, self.ctx.resolver) {
                self.write_inline(g, &item.navigation, &inline, Some(item), guard)?;
            }
        }

        if !self.server() {
            self.write_bindings(g, links.binding)?;
        }
        Ok(())
    }

    fn write_inline<W: Write>(
        &self,
        g: &mut JsonGenerator<W>,
        title: &str,
        inline: &Inline,
        item: Option<&ExpandItem>,
        guard: &ExpandGuard,
    ) -> Result<(), EncodeError> {
        let select = item.map_or_else(SelectTree::all, |i| i.select.clone());
        let expand = item.map(ExpandItem::next_level).unwrap_or_default();

        match inline {
            Inline::Entity(target) => match guard.enter(target) {
                Visit::Expand(next) => {
                    g.key(title)?;
                    self.write_entity(g, target, &select, &expand, &next, None)
                }
                Visit::Reference(id) => {
                    g.key(title)?;
                    self.write_reference_object(g, &id)
                }
                Visit::Truncate => Ok(()),
            },
            Inline::EntitySet(set) => {
                let annotate = !self.verbose() && self.level() != MetadataLevel::None;
                if annotate && item.is_some_and(|i| i.count) {
                    if let Some(key) = self.names.property_key(title, Field::Count) {
                        g.key(&key)?;
                        self.write_count(g, set.count.unwrap_or(set.entities.len() as i64))?;
                    }
                }
                g.key(title)?;
                if self.verbose() {
                    g.begin_object()?;
                    g.key(self.names.value_key)?;
                }
                g.begin_array()?;
                for member in &set.entities {
                    match guard.enter(member) {
                        Visit::Expand(next) => self.write_entity(g, member, &select, &expand, &next, None)?,
                        Visit::Reference(id) => self.write_reference_object(g, &id)?,
                        Visit::Truncate => {}
                    }
                }
                g.end_array()?;
                if self.verbose() {
                    if let Some(next) = &set.next {
                        self.control(g, Field::NextLink, next)?;
                    }
                    g.end_object()?;
                } else if annotate {
                    if let (Some(next), Some(key)) = (&set.next, self.names.property_key(title, Field::NextLink)) {
                        g.string_field(&key, next)?;
                    }
                }
                Ok(())
            }
        }
    }

    /// `{"@odata.id": id}`, or `{"__metadata":{"uri": id}}` in 2.0.
    fn write_reference_object<W: Write>(&self, g: &mut JsonGenerator<W>, id: &str) -> Result<(), EncodeError> {
        g.begin_object()?;
        match self.names.metadata_object {
            Some(object) => {
                g.key(object)?;
                g.begin_object()?;
                self.control(g, Field::Id, id)?;
                g.end_object()?;
            }
            None => self.control(g, Field::Id, id)?,
        }
        g.end_object()
    }

    fn write_deferred<W: Write>(&self, g: &mut JsonGenerator<W>, link: &Link) -> Result<(), EncodeError> {
        let (Some(href), Some(deferred)) = (link.href.as_deref(), self.names.get(Field::Deferred)) else {
            return Ok(());
        };
        g.key(&link.title)?;
        g.begin_object()?;
        g.key(deferred)?;
        g.begin_object()?;
        self.control(g, Field::Id, href)?;
        g.end_object()?;
        g.end_object()
    }

    fn write_bindings<W: Write>(&self, g: &mut JsonGenerator<W>, bindings: &[Link]) -> Result<(), EncodeError> {
        for link in bindings {
            let many = !link.bindings.is_empty();
            let targets: Vec<&str> = if many {
                link.bindings.iter().map(String::as_str).collect()
            } else {
                link.href.as_deref().into_iter().collect()
            };
            let Some(first) = targets.first().copied() else {
                continue;
            };

            if self.verbose() {
                g.key(&link.title)?;
                if many {
                    g.begin_array()?;
                    for target in &targets {
                        self.write_reference_object(g, target)?;
                    }
                    g.end_array()?;
                } else {
                    self.write_reference_object(g, first)?;
                }
                continue;
            }

            let Some(key) = self.names.property_key(&link.title, Field::Bind) else {
                continue;
            };
            g.key(&key)?;
            if many {
                g.begin_array()?;
                for target in &targets {
                    g.string(target)?;
                }
                g.end_array()?;
            } else {
                g.string(first)?;
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Properties and values
    // -------------------------------------------------------------------------

    fn write_property_document<W: Write>(&self, g: &mut JsonGenerator<W>, property: &Property) -> Result<(), EncodeError> {
        let detached = Entity::new();
        let guard = ExpandGuard::empty();
        let declared = self.declared_type(self.ctx.expected_type.as_deref(), &property.name);
        let info = resolve_type(property, declared.as_deref())?;
        check_value(&property.name, info.as_ref(), &property.value)?;

        self.open_document(g)?;
        if self.verbose() {
            let inner = structured(&property.value).then_some(info.as_ref()).flatten();
            g.key(&property.name)?;
            self.write_value(g, &detached, &property.name, info.as_ref(), &property.value, inner, &SelectTree::all(), &guard)?;
            return self.close_document(g);
        }

        self.write_header(g, ContextKind::Property)?;
        let annotate = self.annotate(declared.as_deref(), property, info.as_ref());
        match &property.value {
            Value::Null => {
                if let Some(key) = self.names.null_key {
                    g.bool_field(key, true)?;
                }
            }
            value if structured(value) => {
                let inner = annotate.then_some(info.as_ref()).flatten();
                self.write_complex_members(g, &detached, &property.name, info.as_ref(), value, inner, &SelectTree::all(), &guard)?;
            }
            value => {
                if let (true, Some(info)) = (annotate, info.as_ref()) {
                    self.control(g, Field::Type, &info.render_external(self.version()))?;
                }
                g.key(self.names.value_key)?;
                self.write_value(g, &detached, &property.name, info.as_ref(), value, None, &SelectTree::all(), &guard)?;
            }
        }
        self.close_document(g)
    }

    fn declared_type(&self, owner: Option<&str>, property: &str) -> Option<String> {
        let edm = self.ctx.edm?;
        let owner = owner?;
        edm.resolve_facets(owner, property).map(|f| f.type_name.clone())
    }

    /// The minimal-metadata economy rule, or "always"/"never" at the other levels.
    fn annotate(&self, declared: Option<&str>, property: &Property, info: Option<&TypeInfo>) -> bool {
        match self.level() {
            MetadataLevel::None => false,
            MetadataLevel::Full => info.is_some(),
            MetadataLevel::Minimal => match &property.value {
                Value::Complex(_) | Value::LinkedComplex(_) | Value::Enum(_) => {
                    match (property.type_name.as_deref(), declared) {
                        (Some(actual), Some(declared)) => actual != declared,
                        _ => false,
                    }
                }
                value => info.is_some_and(|info| value_needs_annotation(info, value, self.ieee754())),
            },
        }
    }

    fn write_property<W: Write>(
        &self,
        g: &mut JsonGenerator<W>,
        source: &Entity,
        owner: Option<&str>,
        property: &Property,
        select: &SelectTree,
        guard: &ExpandGuard,
    ) -> Result<(), EncodeError> {
        if !select.is_selected(&property.name) {
            return Ok(());
        }
        let declared = self.declared_type(owner, &property.name);
        let info = resolve_type(property, declared.as_deref())?;
        check_value(&property.name, info.as_ref(), &property.value)?;

        self.write_annotations(g, source, Some(&property.name), &property.annotations, guard)?;

        let annotate = self.annotate(declared.as_deref(), property, info.as_ref());
        let is_structured = structured(&property.value);
        if annotate && !is_structured {
            if let (Some(key), Some(info)) = (self.names.property_key(&property.name, Field::Type), info.as_ref()) {
                g.string_field(&key, &info.render_external(self.version()))?;
            }
        }
        g.key(&property.name)?;
        let inner = (annotate && is_structured).then_some(info.as_ref()).flatten();
        self.write_value(
            g,
            source,
            &property.name,
            info.as_ref(),
            &property.value,
            inner,
            &select.child(&property.name),
            guard,
        )
    }

    /// Writes instance annotations (`@NS.term` or `Name@NS.term`).
    fn write_annotations<W: Write>(
        &self,
        g: &mut JsonGenerator<W>,
        source: &Entity,
        target: Option<&str>,
        annotations: &[Annotation],
        guard: &ExpandGuard,
    ) -> Result<(), EncodeError> {
        if annotations.is_empty() || self.level() == MetadataLevel::None {
            return Ok(());
        }
        if !self.names.supports_annotations() {
            trace!(count = annotations.len(), version = %self.version(), "instance annotations skipped");
            return Ok(());
        }
        for annotation in annotations {
            let key = match target {
                Some(target) => format!("{target}@{}", annotation.term),
                None => format!("@{}", annotation.term),
            };
            let info = annotation.type_name.as_deref().map(TypeInfo::parse).transpose()?;
            check_value(&key, info.as_ref(), &annotation.value)?;
            let inner = (structured(&annotation.value) && self.level() == MetadataLevel::Full)
                .then_some(info.as_ref())
                .flatten();
            g.key(&key)?;
            self.write_value(g, source, &key, info.as_ref(), &annotation.value, inner, &SelectTree::all(), guard)?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn write_value<W: Write>(
        &self,
        g: &mut JsonGenerator<W>,
        source: &Entity,
        name: &str,
        info: Option<&TypeInfo>,
        value: &Value,
        type_annotation: Option<&TypeInfo>,
        select: &SelectTree,
        guard: &ExpandGuard,
    ) -> Result<(), EncodeError> {
        match value {
            Value::Null => g.null(),
            Value::Primitive(literal) => self.write_primitive(g, info.and_then(TypeInfo::primitive_kind), literal),
            Value::Enum(member) => g.string(member),
            Value::Geospatial(geo) => write_geo(g, geo, name),
            Value::Complex(_) | Value::LinkedComplex(_) => {
                g.begin_object()?;
                self.write_complex_members(g, source, name, info, value, type_annotation, select, guard)?;
                g.end_object()
            }
            Value::Collection(items) => {
                let element = info.map(TypeInfo::element);
                g.begin_array()?;
                for item in items.iter() {
                    self.write_value(g, source, name, element.as_ref(), item, None, select, guard)?;
                }
                g.end_array()
            }
        }
    }

    fn write_primitive<W: Write>(
        &self,
        g: &mut JsonGenerator<W>,
        kind: Option<EdmPrimitiveKind>,
        literal: &str,
    ) -> Result<(), EncodeError> {
        match json_shape(kind, literal, self.ieee754()) {
            JsonShape::Number => g.number(literal),
            JsonShape::Boolean => g.boolean(literal == "true"),
            JsonShape::String => g.string(literal),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn write_complex_members<W: Write>(
        &self,
        g: &mut JsonGenerator<W>,
        source: &Entity,
        name: &str,
        info: Option<&TypeInfo>,
        value: &Value,
        type_annotation: Option<&TypeInfo>,
        select: &SelectTree,
        guard: &ExpandGuard,
    ) -> Result<(), EncodeError> {
        if let Some(annotation) = type_annotation {
            let rendered = annotation.render_external(self.version());
            match self.names.metadata_object {
                Some(object) => {
                    g.key(object)?;
                    g.begin_object()?;
                    self.control(g, Field::Type, &rendered)?;
                    g.end_object()?;
                }
                None => self.control(g, Field::Type, &rendered)?,
            }
        }

        let owner = info.map(TypeInfo::qualified_name);
        let (members, linked) = match value {
            Value::Complex(members) => (members.as_slice(), None),
            Value::LinkedComplex(linked) => (linked.properties.as_slice(), Some(linked)),
            _ => {
                return Err(EncodeError::WrongPropertyValue {
                    property: name.to_string(),
                    reason: "expected a complex value".to_string(),
                });
            }
        };
        for member in members {
            self.write_property(g, source, owner.as_deref(), member, select, guard)?;
        }
        if let Some(linked) = linked {
            self.write_links(
                g,
                source,
                LinkSet {
                    navigation: &linked.navigation_links,
                    association: &linked.association_links,
                    binding: &linked.binding_links,
                },
                select,
                &ExpandTree::default(),
                guard,
            )?;
        }
        Ok(())
    }
}

/// The three link lists of an entity or linked complex value.
#[derive(Clone, Copy)]
struct LinkSet<'e> {
    navigation: &'e [Link],
    association: &'e [Link],
    binding: &'e [Link],
}

fn structured(value: &Value) -> bool {
    matches!(value, Value::Complex(_) | Value::LinkedComplex(_))
}

/// The entity's own edit-media link (named stream links carry a title).
fn entity_media_edit_link(entity: &Entity) -> Option<&str> {
    entity
        .media_edit_links
        .iter()
        .find(|l| l.title.is_empty())
        .and_then(|l| l.href.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NavigationResolver;
    use crate::edm::{PropertyFacets, SchemaContext};
    use crate::error::ErrorCode;
    use crate::model::{Collection, DeltaBuilder, EntityBuilder, ValueKind};
    use crate::query::{ExpandItem, Levels};

    fn render(f: impl FnOnce(&mut Vec<u8>) -> Result<(), EncodeError>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn person() -> Entity {
        EntityBuilder::new()
            .id("People(1)")
            .type_name("NS.Person")
            .string("Name", "Ann")
            .int32("Age", 42)
            .int64("Big", 7)
            .build()
    }

    #[test]
    fn test_minimal_entity() {
        let ctx = SerializeContext::new(ODataVersion::V4)
            .base_url("http://host/svc/")
            .entity_set("People");
        let json = render(|buf| JsonSerializer::default().serialize_entity(buf, &person(), &ctx));
        assert_eq!(
            json,
            r##"{"@odata.context":"http://host/svc/$metadata#People/$entity","@odata.id":"People(1)","Name":"Ann","Age":42,"Big@odata.type":"#Int64","Big":7}"##
        );
    }

    #[test]
    fn test_full_and_none_levels() {
        let full = SerializeContext::new(ODataVersion::V401).metadata(MetadataLevel::Full);
        let json = render(|buf| JsonSerializer::default().serialize_entity(buf, &person(), &full));
        assert_eq!(
            json,
            r##"{"@type":"#NS.Person","@id":"People(1)","Name@type":"#String","Name":"Ann","Age@type":"#Int32","Age":42,"Big@type":"#Int64","Big":7}"##
        );

        let none = SerializeContext::new(ODataVersion::V4).metadata(MetadataLevel::None);
        let json = render(|buf| JsonSerializer::default().serialize_entity(buf, &person(), &none));
        assert_eq!(json, r#"{"Name":"Ann","Age":42,"Big":7}"#);
    }

    #[test]
    fn test_ieee754_strings() {
        let entity = EntityBuilder::new()
            .int64("PropertyInt64", i64::MAX)
            .decimal("PropertyDecimal", "34")
            .build();
        let ctx = SerializeContext::new(ODataVersion::V4);
        let plain = render(|buf| JsonSerializer::default().serialize_entity(buf, &entity, &ctx));
        assert!(plain.contains(r#""PropertyInt64":9223372036854775807"#));
        assert!(plain.contains(r#""PropertyDecimal":34"#));

        let serializer = JsonSerializer::new(JsonOptions::new().ieee754());
        let compatible = render(|buf| serializer.serialize_entity(buf, &entity, &ctx));
        assert!(compatible.contains(r#""PropertyInt64":"9223372036854775807""#));
        assert!(compatible.contains(r#""PropertyDecimal":"34""#));
        assert_eq!(
            serializer.content_type(&ctx),
            "application/json;odata.metadata=minimal;IEEE754Compatible=true"
        );
    }

    #[test]
    fn test_verbose_entity() {
        let entity = EntityBuilder::new()
            .id("People(1)")
            .type_name("NS.Person")
            .string("Name", "Ann")
            .navigation("Friends", "People(1)/Friends")
            .build();
        let ctx = SerializeContext::new(ODataVersion::V2);
        let json = render(|buf| JsonSerializer::default().serialize_entity(buf, &entity, &ctx));
        assert_eq!(
            json,
            r#"{"d":{"__metadata":{"uri":"People(1)","type":"NS.Person"},"Name":"Ann","Friends":{"__deferred":{"uri":"People(1)/Friends"}}}}"#
        );
    }

    #[test]
    fn test_client_bindings() {
        let entity = EntityBuilder::new()
            .string("Name", "Ann")
            .bind("BestFriend", "People(2)")
            .bind_many("Friends", ["People(3)"])
            .build();
        let ctx = SerializeContext::new(ODataVersion::V4);
        let json = render(|buf| JsonSerializer::new(JsonOptions::client()).serialize_entity(buf, &entity, &ctx));
        assert_eq!(
            json,
            r#"{"Name":"Ann","BestFriend@odata.bind":"People(2)","Friends@odata.bind":["People(3)"]}"#
        );
    }

    #[test]
    fn test_server_links_at_full() {
        let entity = EntityBuilder::new()
            .id("People(1)")
            .navigation("Friends", "People(1)/Friends")
            .association("Friends", "People(1)/Friends/$ref")
            .action("#NS.Promote", "People(1)/NS.Promote")
            .build();
        let ctx = SerializeContext::new(ODataVersion::V4).metadata(MetadataLevel::Full);
        let json = render(|buf| JsonSerializer::default().serialize_entity(buf, &entity, &ctx));
        assert_eq!(
            json,
            r##"{"@odata.id":"People(1)","#NS.Promote":{"target":"People(1)/NS.Promote"},"Friends@odata.associationLink":"People(1)/Friends/$ref","Friends@odata.navigationLink":"People(1)/Friends"}"##
        );
    }

    #[test]
    fn test_expanded_set_with_count() {
        let friend = EntityBuilder::new().id("People(2)").string("Name", "Bo").build();
        let mut set = EntityCollection::new(vec![friend]);
        set.count = Some(1);
        let entity = EntityBuilder::new().id("People(1)").expand_set("Friends", set).build();
        let ctx = SerializeContext::new(ODataVersion::V4)
            .expand(ExpandTree::new(vec![ExpandItem::new("Friends").with_count()]));
        let json = render(|buf| JsonSerializer::default().serialize_entity(buf, &entity, &ctx));
        assert_eq!(
            json,
            r#"{"@odata.id":"People(1)","Friends@odata.count":1,"Friends":[{"@odata.id":"People(2)","Name":"Bo"}]}"#
        );
    }

    struct Friends;

    impl NavigationResolver for Friends {
        fn resolve(&self, source: &Entity, navigation: &str) -> Option<Inline> {
            if navigation != "Friends" {
                return None;
            }
            let next = match source.id.as_deref()? {
                "A" => "B",
                "B" => "A",
                _ => return None,
            };
            let target = EntityBuilder::new().id(next).string("Name", next).build();
            Some(Inline::EntitySet(EntityCollection::new(vec![target])))
        }
    }

    #[test]
    fn test_cycle_becomes_reference() {
        let a = EntityBuilder::new().id("A").string("Name", "A").build();
        let resolver = Friends;
        let ctx = SerializeContext::new(ODataVersion::V4)
            .expand(ExpandTree::new(vec![ExpandItem::new("Friends").levels(Levels::Max)]))
            .resolver(&resolver);
        let json = render(|buf| JsonSerializer::default().serialize_entity(buf, &a, &ctx));
        assert_eq!(
            json,
            r#"{"@odata.id":"A","Name":"A","Friends":[{"@odata.id":"B","Name":"B","Friends":[{"@odata.id":"A"}]}]}"#
        );
    }

    #[test]
    fn test_collection_with_count_and_next() {
        let mut set = EntityCollection::new(vec![EntityBuilder::new().string("Name", "Ann").build()]);
        set.next = Some("People?$skip=1".to_string());
        let ctx = SerializeContext::new(ODataVersion::V4).entity_set("People").with_count();
        let json = render(|buf| JsonSerializer::default().serialize_entity_collection(buf, &set, &ctx));
        assert_eq!(
            json,
            r##"{"@odata.context":"#People","@odata.count":1,"value":[{"Name":"Ann"}],"@odata.nextLink":"People?$skip=1"}"##
        );

        let verbose = SerializeContext::new(ODataVersion::V2).with_count();
        let json = render(|buf| JsonSerializer::default().serialize_entity_collection(buf, &set, &verbose));
        assert_eq!(
            json,
            r#"{"d":{"__count":"1","results":[{"Name":"Ann"}],"__next":"People?$skip=1"}}"#
        );
    }

    #[test]
    fn test_stream_stops_at_failure() {
        let ctx = SerializeContext::new(ODataVersion::V4).metadata(MetadataLevel::None);
        let items = vec![
            Ok(EntityBuilder::new().string("Name", "Ann").build()),
            Err(EncodeError::WriteFailed("source closed".to_string())),
            Ok(EntityBuilder::new().string("Name", "Bo").build()),
        ];
        let json = render(|buf| {
            JsonSerializer::default().serialize_entity_stream(buf, items, &ctx, |_, w| w.write_all(b"<!--error-->"))
        });
        assert_eq!(json, r#"{"value":[{"Name":"Ann"}<!--error-->"#);
    }

    #[test]
    fn test_delta_order_and_records() {
        let delta = DeltaBuilder::new()
            .added_link("People(1)", "Friends", "People(2)")
            .deleted("People(3)", DeletedReason::Deleted)
            .entity(EntityBuilder::new().id("People(4)").build())
            .build();
        let ctx = SerializeContext::new(ODataVersion::V4).entity_set("People");
        let json = render(|buf| JsonSerializer::default().serialize_delta(buf, &delta, &ctx));
        assert_eq!(
            json,
            r##"{"@odata.context":"#People/$delta","value":[{"@odata.id":"People(4)"},{"@odata.context":"#People/$deletedEntity","id":"People(3)","reason":"deleted"},{"@odata.context":"#People/$link","source":"People(1)","relationship":"Friends","target":"People(2)"}]}"##
        );

        let v401 = SerializeContext::new(ODataVersion::V401);
        let delta = DeltaBuilder::new().deleted("People(3)", DeletedReason::Changed).build();
        let json = render(|buf| JsonSerializer::default().serialize_delta(buf, &delta, &v401));
        assert_eq!(json, r#"{"value":[{"@removed":{"reason":"changed"},"@id":"People(3)"}]}"#);
    }

    #[test]
    fn test_empty_delta_and_v2_delta() {
        let ctx = SerializeContext::new(ODataVersion::V4);
        let json = render(|buf| JsonSerializer::default().serialize_delta(buf, &Delta::new(), &ctx));
        assert_eq!(json, r#"{"value":[]}"#);

        let err = JsonSerializer::default()
            .serialize_delta(Vec::new(), &Delta::new(), &SerializeContext::new(ODataVersion::V2))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedValueKind);
    }

    #[test]
    fn test_property_documents() {
        let ctx = SerializeContext::new(ODataVersion::V4).context_url("$metadata#People(1)/Age");
        let age = Property::typed("Age", "Edm.Int64", Value::primitive("5"));
        let json = render(|buf| JsonSerializer::default().serialize_property(buf, &age, &ctx));
        assert_eq!(
            json,
            r##"{"@odata.context":"$metadata#People(1)/Age","@odata.type":"#Int64","value":5}"##
        );

        let null = Property::typed("Age", "Edm.Int32", Value::Null);
        let json = render(|buf| JsonSerializer::default().serialize_property(buf, &null, &ctx));
        assert_eq!(json, r#"{"@odata.context":"$metadata#People(1)/Age","@odata.null":true}"#);

        let tags = Collection::from_items(ValueKind::Primitive, vec![Value::primitive("a")]).unwrap();
        let tags = Property::typed("Tags", "Collection(Edm.String)", Value::Collection(tags));
        let json = render(|buf| JsonSerializer::default().serialize_property(buf, &tags, &SerializeContext::new(ODataVersion::V2)));
        assert_eq!(json, r#"{"d":{"Tags":["a"]}}"#);
    }

    #[test]
    fn test_complex_annotation_against_model() {
        let mut schema = SchemaContext::new();
        schema
            .add_property("NS.Person", "Home", PropertyFacets::new("NS.Address"))
            .add_base_type("NS.HomeAddress", "NS.Address");
        let entity = EntityBuilder::new()
            .type_name("NS.Person")
            .complex("Home", "NS.HomeAddress", |a| a.string("City", "Oslo"))
            .complex("Work", "NS.Address", |a| a.string("City", "Bergen"))
            .build();
        let ctx = SerializeContext::new(ODataVersion::V4).edm(&schema);
        let json = render(|buf| JsonSerializer::default().serialize_entity(buf, &entity, &ctx));
        assert_eq!(
            json,
            r##"{"Home":{"@odata.type":"#NS.HomeAddress","City":"Oslo"},"Work":{"City":"Bergen"}}"##
        );
    }

    #[test]
    fn test_untyped_enum_is_unsupported() {
        let entity = EntityBuilder::new().value("Color", Value::enum_member("Red")).build();
        let err = JsonSerializer::default()
            .serialize_entity(Vec::new(), &entity, &SerializeContext::new(ODataVersion::V4))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedValueKind);
    }

    #[test]
    fn test_wrong_literal_rejected() {
        let entity = EntityBuilder::new()
            .typed("Age", "Edm.Int32", Value::primitive("forty"))
            .build();
        let err = JsonSerializer::default()
            .serialize_entity(Vec::new(), &entity, &SerializeContext::new(ODataVersion::V4))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::WrongPropertyValue);
    }

    #[test]
    fn test_references() {
        let ctx = SerializeContext::new(ODataVersion::V4).base_url("http://host/svc/");
        let json = render(|buf| JsonSerializer::default().serialize_references(buf, &["People(1)"], &ctx));
        assert_eq!(
            json,
            r#"{"@odata.context":"http://host/svc/$metadata#Collection($ref)","value":[{"@odata.id":"People(1)"}]}"#
        );
        let v3 = SerializeContext::new(ODataVersion::V3);
        let json = render(|buf| JsonSerializer::default().serialize_reference(buf, "People(1)", &v3));
        assert_eq!(json, r#"{"url":"People(1)"}"#);
    }

    #[test]
    fn test_error_documents() {
        let mut error = ServerError::new("400", "Bad request");
        error.inner_error.insert("depth".to_string(), "3".to_string());
        error.inner_error.insert("trace".to_string(), "at line 1".to_string());
        let json = render(|buf| JsonSerializer::default().serialize_error(buf, &error, ODataVersion::V4));
        assert_eq!(
            json,
            r#"{"error":{"code":"400","message":"Bad request","innererror":{"depth":3,"trace":"at line 1"}}}"#
        );
        let json = render(|buf| JsonSerializer::default().serialize_error(buf, &ServerError::new("1", "x"), ODataVersion::V3));
        assert_eq!(json, r#"{"odata.error":{"code":"1","message":{"lang":"en-US","value":"x"}}}"#);
    }
}
