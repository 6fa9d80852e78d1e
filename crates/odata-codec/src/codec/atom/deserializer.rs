//! Atom deserializer.
//!
//! Recursive descent over [`XmlCursor`]. Each reader consumes exactly the
//! element it is handed, so unknown elements are skipped wholesale and
//! whitespace between elements never matters.

use std::fmt;

use tracing::{debug, trace};

use super::geo::read_gml;
use super::reader::{malformed, Element, Node, XmlCursor};
use crate::edm::{check_literal, EdmProvider, TypeInfo};
use crate::error::DecodeError;
use crate::model::{
    Annotation, Collection, DeletedEntity, DeletedReason, Delta, DeltaLink, Dimension, Entity, EntityCollection,
    Envelope, ErrorDetail, Inline, Link, Operation, OperationKind, Property, ServerError, Value, ValueKind,
};
use crate::names::atom::{
    atom_names, AtomNames, CATEGORY, CONTENT, DELETED_ENTRY, ENTRY, FEED, GML_NS, ID, LINK, REL_EDIT,
    REL_EDIT_MEDIA, REL_NEXT, REL_SELF,
};
use crate::version::ODataVersion;

fn wrong(property: &str, reason: impl Into<String>) -> DecodeError {
    DecodeError::WrongPropertyValue {
        property: property.to_string(),
        reason: reason.into(),
    }
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}

fn canonical_type(raw: &str) -> Result<String, DecodeError> {
    Ok(TypeInfo::parse(raw)?.to_string())
}

/// Reads OData Atom documents of one protocol version.
///
/// With an [`EdmProvider`] attached, untyped property elements are read
/// against their declared types, and empty elements of an enumeration type
/// become enum values rather than empty complex values.
#[derive(Clone, Copy)]
pub struct AtomDeserializer<'a> {
    version: ODataVersion,
    names: &'static AtomNames,
    edm: Option<&'a dyn EdmProvider>,
}

impl fmt::Debug for AtomDeserializer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomDeserializer")
            .field("version", &self.version)
            .field("edm", &self.edm.is_some())
            .finish_non_exhaustive()
    }
}

impl<'a> AtomDeserializer<'a> {
    pub fn new(version: ODataVersion) -> Self {
        Self {
            version,
            names: atom_names(version),
            edm: None,
        }
    }

    pub fn edm(mut self, edm: &'a dyn EdmProvider) -> Self {
        self.edm = Some(edm);
        self
    }

    pub fn version(&self) -> ODataVersion {
        self.version
    }

    fn declared_type(&self, owner: Option<&str>, property: &str) -> Result<Option<TypeInfo>, DecodeError> {
        let (Some(edm), Some(owner)) = (self.edm, owner) else {
            return Ok(None);
        };
        Ok(edm
            .resolve_facets(owner, property)
            .map(|facets| TypeInfo::parse(&facets.type_name))
            .transpose()?)
    }

    fn is_enum(&self, info: &TypeInfo) -> bool {
        self.edm
            .is_some_and(|edm| edm.is_enum_type(&info.qualified_name()))
    }

    fn open<'i>(&self, input: &'i [u8], payload: &'static str) -> Result<(XmlCursor<'i>, Element), DecodeError> {
        debug!(version = %self.version, payload, bytes = input.len(), "deserializing Atom");
        let mut cursor = XmlCursor::new(input);
        let root = cursor.root()?;
        Ok((cursor, root))
    }

    fn envelope<T>(&self, root: &Element, payload: T) -> Envelope<T> {
        let mut envelope = Envelope::new(payload);
        if self.version.is_v4() {
            envelope.context_url = root.attr(&self.names.context).map(str::to_string);
            envelope.metadata_etag = root.attr(&self.names.metadata_etag).map(str::to_string);
        }
        envelope
    }

    // =========================================================================
    // DOCUMENTS
    // =========================================================================

    /// Single `<entry>` (or `<m:ref>`). A `<feed>` is rejected.
    pub fn entity(&self, input: &[u8]) -> Result<Envelope<Entity>, DecodeError> {
        let (mut cursor, root) = self.open(input, "entity")?;
        let entity = if root.is(&ENTRY) {
            self.read_entry(&mut cursor, &root)?
        } else if root.is(&self.names.entry_ref) {
            self.read_entry_ref(&mut cursor, &root)?
        } else if root.is(&FEED) {
            return Err(DecodeError::UnexpectedCollectionShape {
                expected: "entity",
                found: "entity set",
            });
        } else {
            return Err(DecodeError::UnexpectedElement {
                expected: "entry",
                found: root.display_name(),
            });
        };
        Ok(self.envelope(&root, entity))
    }

    pub fn entity_collection(&self, input: &[u8]) -> Result<Envelope<EntityCollection>, DecodeError> {
        let (mut cursor, root) = self.open(input, "entity set")?;
        if root.is(&ENTRY) || root.is(&self.names.entry_ref) {
            return Err(DecodeError::UnexpectedCollectionShape {
                expected: "entity set",
                found: "entity",
            });
        }
        if !root.is(&FEED) {
            return Err(DecodeError::UnexpectedElement {
                expected: "feed",
                found: root.display_name(),
            });
        }
        let set = self.read_feed(&mut cursor, &root)?;
        Ok(self.envelope(&root, set))
    }

    /// Individual property document. The 4.0 `<m:value>` root carries no
    /// property name, so the result is named `""` there.
    pub fn property(&self, input: &[u8]) -> Result<Envelope<Property>, DecodeError> {
        let (mut cursor, root) = self.open(input, "property")?;
        let name = if root.is(&self.names.value) {
            String::new()
        } else if root.namespace == self.names.data_ns {
            root.local.clone()
        } else {
            return Err(DecodeError::UnexpectedElement {
                expected: "property",
                found: root.display_name(),
            });
        };
        let property = self.read_named_property(&mut cursor, &root, name, None)?;
        Ok(self.envelope(&root, property))
    }

    pub fn delta(&self, input: &[u8]) -> Result<Envelope<Delta>, DecodeError> {
        if self.version == ODataVersion::V2 {
            return Err(malformed("delta", "version 2.0 has no delta payload"));
        }
        let (mut cursor, root) = self.open(input, "delta")?;
        if !root.is(&FEED) {
            return Err(DecodeError::UnexpectedCollectionShape {
                expected: "delta",
                found: "entity",
            });
        }

        let mut delta = Delta::new();
        cursor.read_children(&root, |cursor, child| {
            if child.is(&ENTRY) {
                delta.entities.push(self.read_entry(cursor, &child)?);
            } else if child.is(&DELETED_ENTRY) {
                delta.deleted_entities.push(DeletedEntity {
                    id: child.plain("ref").map(str::to_string),
                    reason: child
                        .attr(&self.names.reason)
                        .and_then(DeletedReason::parse)
                        .unwrap_or_default(),
                });
                cursor.skip(&child)?;
            } else if child.is(&self.names.link) {
                delta.added_links.push(read_delta_link(&child));
                cursor.skip(&child)?;
            } else if child.is(&self.names.deleted_link) {
                delta.deleted_links.push(read_delta_link(&child));
                cursor.skip(&child)?;
            } else if child.is(&self.names.count) {
                delta.count = Some(self.read_count(cursor, &child)?);
            } else if child.is(&LINK) {
                match child.plain("rel") {
                    Some(REL_NEXT) => delta.next = child.plain("href").map(str::to_string),
                    Some(rel) if rel == self.names.delta_rel => {
                        delta.delta_link = child.plain("href").map(str::to_string);
                    }
                    _ => {}
                }
                cursor.skip(&child)?;
            } else {
                cursor.skip(&child)?;
            }
            Ok(())
        })?;
        Ok(self.envelope(&root, delta))
    }

    /// Entity reference documents: `<m:ref>` or a feed of them in 4.0,
    /// `<uri>` or `<links>` before.
    pub fn references(&self, input: &[u8]) -> Result<Vec<String>, DecodeError> {
        let (mut cursor, root) = self.open(input, "references")?;
        let mut ids = Vec::new();
        if root.is(&self.names.entry_ref) {
            ids.push(self.read_entry_ref(&mut cursor, &root)?.id.unwrap_or_default());
        } else if root.is(&self.names.uri) {
            ids.push(cursor.read_text(&root)?);
        } else if root.is(&FEED) || root.is(&self.names.links) {
            cursor.read_children(&root, |cursor, child| {
                if child.is(&self.names.entry_ref) {
                    ids.push(self.read_entry_ref(cursor, &child)?.id.unwrap_or_default());
                } else if child.is(&self.names.uri) {
                    ids.push(cursor.read_text(&child)?);
                } else {
                    cursor.skip(&child)?;
                }
                Ok(())
            })?;
        } else {
            return Err(DecodeError::UnexpectedElement {
                expected: "reference",
                found: root.display_name(),
            });
        }
        Ok(ids)
    }

    /// `<m:error>` document. Only the first `code`, `message` and `target`
    /// count; repeats are ignored.
    pub fn error(&self, input: &[u8]) -> Result<ServerError, DecodeError> {
        let (mut cursor, root) = self.open(input, "error")?;
        if !root.is(&self.names.error) {
            return Err(DecodeError::UnexpectedElement {
                expected: "error",
                found: root.display_name(),
            });
        }

        let mut fields = ErrorFields::default();
        let mut details = Vec::new();
        let mut inner_error = std::collections::BTreeMap::new();
        cursor.read_children(&root, |cursor, child| {
            if child.namespace != self.names.metadata_ns {
                return cursor.skip(&child);
            }
            match child.local.as_str() {
                "details" => cursor.read_children(&child, |cursor, detail| {
                    let mut detail_fields = ErrorFields::default();
                    cursor.read_children(&detail, |cursor, field| self.read_error_field(cursor, &field, &mut detail_fields))?;
                    details.push(detail_fields.into_detail());
                    Ok(())
                }),
                "innererror" => cursor.read_children(&child, |cursor, entry| {
                    let text = cursor.read_text(&entry)?;
                    inner_error.insert(entry.local.clone(), text);
                    Ok(())
                }),
                _ => self.read_error_field(cursor, &child, &mut fields),
            }
        })?;

        let detail = fields.into_detail();
        let mut error = ServerError::new(detail.code, detail.message);
        error.target = detail.target;
        error.details = details;
        error.inner_error = inner_error;
        Ok(error)
    }

    fn read_error_field(&self, cursor: &mut XmlCursor<'_>, field: &Element, fields: &mut ErrorFields) -> Result<(), DecodeError> {
        let slot = if field.is(&self.names.error_code) {
            &mut fields.code
        } else if field.is(&self.names.error_message) {
            &mut fields.message
        } else if field.is(&self.names.error_target) {
            &mut fields.target
        } else {
            return cursor.skip(field);
        };
        let text = cursor.read_text(field)?;
        if slot.is_none() {
            *slot = Some(text);
        } else {
            trace!(field = %field.local, "repeated error field ignored");
        }
        Ok(())
    }

    // =========================================================================
    // FEEDS AND ENTRIES
    // =========================================================================

    fn read_feed(&self, cursor: &mut XmlCursor<'_>, feed: &Element) -> Result<EntityCollection, DecodeError> {
        let mut set = EntityCollection::default();
        cursor.read_children(feed, |cursor, child| {
            if child.is(&ENTRY) {
                set.entities.push(self.read_entry(cursor, &child)?);
            } else if child.is(&self.names.entry_ref) {
                set.entities.push(self.read_entry_ref(cursor, &child)?);
            } else if child.is(&ID) {
                set.id = non_empty(cursor.read_text(&child)?);
            } else if child.is(&self.names.count) {
                set.count = Some(self.read_count(cursor, &child)?);
            } else if child.is(&LINK) {
                match child.plain("rel") {
                    Some(REL_NEXT) => set.next = child.plain("href").map(str::to_string),
                    Some(rel) if rel == self.names.delta_rel => {
                        set.delta_link = child.plain("href").map(str::to_string);
                    }
                    _ => {}
                }
                cursor.skip(&child)?;
            } else if child.is(&self.names.annotation) && self.version.is_v4() {
                set.annotations.push(self.read_annotation(cursor, &child)?.1);
            } else {
                cursor.skip(&child)?;
            }
            Ok(())
        })?;
        Ok(set)
    }

    fn read_count(&self, cursor: &mut XmlCursor<'_>, element: &Element) -> Result<i64, DecodeError> {
        let text = cursor.read_text(element)?;
        text.trim()
            .parse()
            .map_err(|_| malformed("count", format!("{text:?} is not an integer")))
    }

    fn read_entry_ref(&self, cursor: &mut XmlCursor<'_>, element: &Element) -> Result<Entity, DecodeError> {
        let id = element.plain("id").map(str::to_string);
        cursor.skip(element)?;
        Ok(Entity { id, ..Entity::default() })
    }

    fn read_entry(&self, cursor: &mut XmlCursor<'_>, element: &Element) -> Result<Entity, DecodeError> {
        let mut entity = Entity::new();
        entity.etag = element.attr(&self.names.etag).map(str::to_string);
        // Property annotations precede the properties they target.
        let mut targeted: Vec<(String, Annotation)> = Vec::new();

        cursor.read_children(element, |cursor, child| {
            if child.is(&ID) {
                entity.id = non_empty(cursor.read_text(&child)?);
            } else if child.is(&CATEGORY) {
                if let Some(term) = child.plain("term") {
                    entity.type_name = Some(canonical_type(term)?);
                }
                cursor.skip(&child)?;
            } else if child.is(&LINK) {
                self.read_entry_link(cursor, &child, &mut entity)?;
            } else if child.is(&CONTENT) {
                if let Some(source) = child.plain("src") {
                    entity.media_content_source = Some(source.to_string());
                    entity.media_content_type = child.plain("type").map(str::to_string);
                    cursor.skip(&child)?;
                } else {
                    cursor.read_children(&child, |cursor, inner| {
                        if inner.is(&self.names.properties) {
                            entity.properties = self.read_properties(cursor, &inner, entity.type_name.as_deref())?;
                            Ok(())
                        } else {
                            cursor.skip(&inner)
                        }
                    })?;
                }
            } else if child.is(&self.names.properties) {
                entity.properties = self.read_properties(cursor, &child, entity.type_name.as_deref())?;
            } else if child.is(&self.names.action) || child.is(&self.names.function) {
                let kind = if child.is(&self.names.action) {
                    OperationKind::Action
                } else {
                    OperationKind::Function
                };
                entity.operations.push(Operation {
                    kind,
                    metadata_anchor: child.plain("metadata").unwrap_or_default().to_string(),
                    title: child.plain("title").map(str::to_string),
                    target: child.plain("target").map(str::to_string),
                });
                cursor.skip(&child)?;
            } else if child.is(&self.names.annotation) && self.version.is_v4() {
                match self.read_annotation(cursor, &child)? {
                    (Some(target), annotation) => targeted.push((target, annotation)),
                    (None, annotation) => entity.annotations.push(annotation),
                }
            } else {
                trace!(element = %child.display_name(), "skipping entry child");
                cursor.skip(&child)?;
            }
            Ok(())
        })?;

        for (target, annotation) in targeted {
            match entity.properties.iter_mut().find(|p| p.name == target) {
                Some(property) => property.annotations.push(annotation),
                None => trace!(annotation_target = %target, "annotation target not found"),
            }
        }
        Ok(entity)
    }

    fn read_entry_link(&self, cursor: &mut XmlCursor<'_>, link: &Element, entity: &mut Entity) -> Result<(), DecodeError> {
        let rel = link.plain("rel").unwrap_or("alternate");
        let href = link.plain("href").map(str::to_string);
        let link_type = link.plain("type").map(str::to_string);

        match rel {
            REL_SELF => entity.self_link = href.map(|href| Link::new("", href)),
            REL_EDIT => entity.edit_link = href.map(|href| Link::new("", href)),
            REL_EDIT_MEDIA => {
                if let Some(etag) = link.attr(&self.names.etag) {
                    entity.media_etag = Some(etag.to_string());
                }
                entity.media_edit_links.insert(
                    0,
                    Link {
                        href,
                        link_type,
                        ..Link::default()
                    },
                );
            }
            rel if self.names.is_media_edit_rel(rel) => entity.media_edit_links.push(Link {
                title: self.names.rel_title(rel).to_string(),
                href,
                link_type,
                media_etag: link.attr(&self.names.etag).map(str::to_string),
                ..Link::default()
            }),
            rel if self.names.is_association_rel(rel) => entity.association_links.push(Link {
                title: self.names.rel_title(rel).to_string(),
                href,
                ..Link::default()
            }),
            rel if self.names.is_navigation_rel(rel) => {
                let inline = self.read_link_inline(cursor, link)?;
                entity.navigation_links.push(Link {
                    title: self.names.rel_title(rel).to_string(),
                    href,
                    inline,
                    ..Link::default()
                });
                return Ok(());
            }
            other => {
                trace!(rel = other, "keeping link with unrecognized relation");
                entity.navigation_links.push(Link {
                    title: link.plain("title").unwrap_or_default().to_string(),
                    rel: Some(other.to_string()),
                    href,
                    link_type,
                    ..Link::default()
                });
            }
        }
        cursor.skip(link)
    }

    fn read_link_inline(&self, cursor: &mut XmlCursor<'_>, link: &Element) -> Result<Option<Inline>, DecodeError> {
        let mut inline = None;
        cursor.read_children(link, |cursor, child| {
            if !child.is(&self.names.inline) {
                return cursor.skip(&child);
            }
            cursor.read_children(&child, |cursor, payload| {
                if payload.is(&ENTRY) {
                    inline = Some(Inline::Entity(Box::new(self.read_entry(cursor, &payload)?)));
                } else if payload.is(&self.names.entry_ref) {
                    inline = Some(Inline::Entity(Box::new(self.read_entry_ref(cursor, &payload)?)));
                } else if payload.is(&FEED) {
                    inline = Some(Inline::EntitySet(self.read_feed(cursor, &payload)?));
                } else {
                    cursor.skip(&payload)?;
                }
                Ok(())
            })
        })?;
        Ok(inline)
    }

    // =========================================================================
    // PROPERTIES AND VALUES
    // =========================================================================

    fn read_properties(
        &self,
        cursor: &mut XmlCursor<'_>,
        element: &Element,
        owner: Option<&str>,
    ) -> Result<Vec<Property>, DecodeError> {
        let mut properties = Vec::new();
        cursor.read_children(element, |cursor, child| {
            let name = child.local.clone();
            properties.push(self.read_named_property(cursor, &child, name, owner)?);
            Ok(())
        })?;
        Ok(properties)
    }

    /// Reads one property element. `m:type` wins over the type `owner`
    /// declares for it; only the wire type is kept on the property.
    fn read_named_property(
        &self,
        cursor: &mut XmlCursor<'_>,
        element: &Element,
        name: String,
        owner: Option<&str>,
    ) -> Result<Property, DecodeError> {
        let info = element.attr(&self.names.type_attr).map(TypeInfo::parse).transpose()?;
        let declared = match info {
            Some(_) => None,
            None => self.declared_type(owner, &name)?,
        };
        let value = self.read_value(cursor, element, info.as_ref().or(declared.as_ref()), &name)?;
        Ok(Property {
            name,
            type_name: info.map(|info| info.to_string()),
            value,
            annotations: Vec::new(),
        })
    }

    /// `<m:annotation term=".." [target=".."]>`, with the target it names.
    fn read_annotation(&self, cursor: &mut XmlCursor<'_>, element: &Element) -> Result<(Option<String>, Annotation), DecodeError> {
        let term = element
            .plain("term")
            .ok_or(DecodeError::MissingRequiredField {
                record: "annotation",
                field: "term",
            })?
            .to_string();
        let target = element.plain("target").map(str::to_string);
        let property = self.read_named_property(cursor, element, term, None)?;
        Ok((
            target,
            Annotation {
                term: property.name,
                type_name: property.type_name,
                value: property.value,
            },
        ))
    }

    /// Reads the content of a value-bearing element: text for primitives
    /// and enums, `m:element` items for collections, a GML shape for
    /// geospatial values, member elements for complex values.
    fn read_value(
        &self,
        cursor: &mut XmlCursor<'_>,
        element: &Element,
        info: Option<&TypeInfo>,
        name: &str,
    ) -> Result<Value, DecodeError> {
        if element.attr(&self.names.null) == Some("true") {
            cursor.skip(element)?;
            return Ok(Value::Null);
        }

        let mut text = String::new();
        let first = loop {
            match cursor.next_child(element)? {
                None => break None,
                Some(Node::Text(chunk)) => text.push_str(&chunk),
                Some(Node::Element(child)) => break Some(child),
            }
        };
        let Some(first) = first else {
            return self.leaf_value(info, text, name);
        };
        if !text.trim().is_empty() {
            return Err(wrong(name, "mixed character data and elements"));
        }

        if first.is(&self.names.element) {
            return self.read_collection(cursor, element, first, info, name);
        }
        if first.namespace == GML_NS {
            let dimension = info
                .and_then(TypeInfo::primitive_kind)
                .and_then(Dimension::of)
                .unwrap_or(Dimension::Geography);
            let geo = read_gml(cursor, &first, dimension, name)?;
            cursor.read_children(element, |cursor, extra| cursor.skip(&extra))?;
            return Ok(Value::Geospatial(geo));
        }
        if info.is_some_and(TypeInfo::is_primitive) {
            return Err(wrong(name, format!("element content for primitive type {}", first.display_name())));
        }

        let owner = info.map(TypeInfo::qualified_name);
        trace!(property = name, owner = owner.as_deref().unwrap_or(""), "reading complex value");
        let mut members = vec![self.read_named_property(cursor, &first, first.local.clone(), owner.as_deref())?];
        cursor.read_children(element, |cursor, child| {
            let member = child.local.clone();
            members.push(self.read_named_property(cursor, &child, member, owner.as_deref())?);
            Ok(())
        })?;
        Ok(Value::Complex(members))
    }

    fn leaf_value(&self, info: Option<&TypeInfo>, text: String, name: &str) -> Result<Value, DecodeError> {
        let Some(info) = info else {
            return Ok(Value::Primitive(text));
        };
        if info.is_collection() {
            let element = info.element();
            return Ok(Value::Collection(Collection::new(self.element_kind(&element, None))));
        }
        match info.primitive_kind() {
            Some(kind) => {
                check_literal(kind, &text).map_err(|e| wrong(name, e.message))?;
                Ok(Value::Primitive(text))
            }
            None if text.trim().is_empty() && !self.is_enum(info) => Ok(Value::Complex(Vec::new())),
            None => Ok(Value::Enum(text)),
        }
    }

    /// Element kind of a typed collection: fixed for primitive element
    /// types, otherwise taken from the first non-null item. An empty one is
    /// complex unless the model says the element type is an enumeration.
    fn element_kind(&self, element: &TypeInfo, first: Option<&Value>) -> ValueKind {
        if element.is_geospatial() {
            ValueKind::Geospatial
        } else if element.is_primitive() {
            ValueKind::Primitive
        } else if let Some(first) = first {
            first.kind()
        } else if self.is_enum(element) {
            ValueKind::Enum
        } else {
            ValueKind::Complex
        }
    }

    fn read_collection(
        &self,
        cursor: &mut XmlCursor<'_>,
        parent: &Element,
        first: Element,
        info: Option<&TypeInfo>,
        name: &str,
    ) -> Result<Value, DecodeError> {
        let element = info.map(TypeInfo::element);
        let mut items = vec![self.read_value(cursor, &first, element.as_ref(), name)?];
        cursor.read_children(parent, |cursor, child| {
            if child.is(&self.names.element) {
                items.push(self.read_value(cursor, &child, element.as_ref(), name)?);
                Ok(())
            } else {
                trace!(element = %child.display_name(), "skipping non-item in collection");
                cursor.skip(&child)
            }
        })?;

        let kind = match element.as_ref() {
            Some(e) => self.element_kind(e, items.iter().find(|v| !v.is_null())),
            None => items
                .iter()
                .find(|v| !v.is_null())
                .map_or(ValueKind::Primitive, Value::kind),
        };
        let mut collection = Collection::new(kind);
        for item in items {
            collection
                .push(item)
                .map_err(|v| wrong(name, format!("{} item in a collection of {}", v.kind().name(), kind.name())))?;
        }
        Ok(Value::Collection(collection))
    }
}

fn read_delta_link(element: &Element) -> DeltaLink {
    DeltaLink {
        source: element.plain("source").map(str::to_string),
        relationship: element.plain("relationship").map(str::to_string),
        target: element.plain("target").map(str::to_string),
    }
}

/// First-seen `code`, `message` and `target` of an error or detail.
#[derive(Default)]
struct ErrorFields {
    code: Option<String>,
    message: Option<String>,
    target: Option<String>,
}

impl ErrorFields {
    fn into_detail(self) -> ErrorDetail {
        ErrorDetail {
            code: self.code.unwrap_or_default(),
            message: self.message.unwrap_or_default(),
            target: self.target,
        }
    }
}
