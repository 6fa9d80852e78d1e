//! JSON deserializer.
//!
//! Documents are parsed into a `serde_json::Value` tree first (key order is
//! preserved) and then walked with the dialect's name table. Keys are
//! classified in this order: instance control keys, operation anchors
//! (`#Container.Action`), property-scoped suffixes (`Name@odata.type`),
//! custom annotations (`@NS.term`, `Name@NS.term`), and finally plain
//! property names. Unknown control keys are ignored.
//!
//! Expanded navigation content is told apart from complex values by an id
//! key, a paired `navigationLink`/`associationLink` key, or the navigation
//! properties an attached [`EdmProvider`] declares.

use std::fmt;

use rustc_hash::FxHashMap;
use serde_json::{Map, Value as Json};
use tracing::{debug, trace};

use super::geo::read_geo;
use crate::codec::primitive::scalar_literal;
use crate::edm::{check_literal, EdmProvider, TypeInfo};
use crate::error::DecodeError;
use crate::limits::MAX_NESTING_DEPTH;
use crate::model::{
    Annotation, Collection, DeletedEntity, DeletedReason, Delta, DeltaLink, Dimension, Entity, EntityCollection,
    Envelope, ErrorDetail, Inline, Link, LinkedComplex, Operation, OperationKind, Property, ServerError, Value,
    ValueKind,
};
use crate::names::json::{DELETED_ID, DELETED_REASON, LINK_RELATIONSHIP, LINK_SOURCE, LINK_TARGET};
use crate::names::{json_names, Field, JsonNames};
use crate::version::ODataVersion;

type Object = Map<String, Json>;

fn malformed(context: &'static str, detail: impl Into<String>) -> DecodeError {
    DecodeError::MalformedDocument {
        context,
        detail: detail.into(),
    }
}

fn wrong(property: &str, reason: impl Into<String>) -> DecodeError {
    DecodeError::WrongPropertyValue {
        property: property.to_string(),
        reason: reason.into(),
    }
}

fn json_kind(node: &Json) -> &'static str {
    match node {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

fn count_of(node: &Json) -> Option<i64> {
    match node {
        Json::Number(n) => n.as_i64(),
        Json::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn owned(node: Option<&Json>) -> Option<String> {
    node.and_then(Json::as_str).map(str::to_string)
}

fn canonical_type(raw: &str) -> Result<String, DecodeError> {
    Ok(TypeInfo::parse(raw)?.to_string())
}

/// Reads JSON payloads of one protocol version.
#[derive(Clone, Copy)]
pub struct JsonDeserializer<'a> {
    version: ODataVersion,
    names: &'static JsonNames,
    edm: Option<&'a dyn EdmProvider>,
}

impl fmt::Debug for JsonDeserializer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonDeserializer")
            .field("version", &self.version)
            .field("edm", &self.edm.is_some())
            .finish_non_exhaustive()
    }
}

impl<'a> JsonDeserializer<'a> {
    pub fn new(version: ODataVersion) -> Self {
        Self {
            version,
            names: json_names(version),
            edm: None,
        }
    }

    /// Consults `edm` for navigation properties and enumeration types.
    pub fn edm(mut self, edm: &'a dyn EdmProvider) -> Self {
        self.edm = Some(edm);
        self
    }

    pub fn version(&self) -> ODataVersion {
        self.version
    }

    fn verbose(&self) -> bool {
        self.version == ODataVersion::V2
    }

    fn parse(&self, input: &[u8], payload: &'static str) -> Result<Json, DecodeError> {
        debug!(version = %self.version, payload, bytes = input.len(), "deserializing JSON");
        Ok(serde_json::from_slice(input)?)
    }

    /// Single entity. A top-level `value` array means the document is a
    /// collection and is rejected.
    pub fn entity(&self, input: &[u8]) -> Result<Envelope<Entity>, DecodeError> {
        let doc = self.parse(input, "entity")?;
        let root = self.unwrap_document(&doc)?;
        let obj = match root {
            Json::Object(obj) => obj,
            Json::Array(_) => {
                return Err(DecodeError::UnexpectedCollectionShape {
                    expected: "entity",
                    found: "entity set",
                });
            }
            other => {
                return Err(DecodeError::UnexpectedCollectionShape {
                    expected: "entity",
                    found: json_kind(other),
                });
            }
        };
        if obj.get(self.names.value_key).is_some_and(Json::is_array) {
            return Err(DecodeError::UnexpectedCollectionShape {
                expected: "entity",
                found: "entity set",
            });
        }
        let entity = self.read_entity(obj, 0)?;
        Ok(self.envelope(obj, entity))
    }

    pub fn entity_collection(&self, input: &[u8]) -> Result<Envelope<EntityCollection>, DecodeError> {
        let doc = self.parse(input, "entity set")?;
        match self.unwrap_document(&doc)? {
            // 2.0 services may answer `{"d": [...]}` without a results wrapper.
            Json::Array(items) if self.verbose() => Ok(Envelope::new(EntityCollection::new(self.read_entities(items, 1)?))),
            Json::Object(obj) => {
                let Some(Json::Array(items)) = obj.get(self.names.value_key) else {
                    return Err(DecodeError::UnexpectedCollectionShape {
                        expected: "entity set",
                        found: "entity",
                    });
                };
                let mut set = EntityCollection::new(self.read_entities(items, 1)?);
                let controls = self.read_collection_controls(obj)?;
                set.count = controls.count;
                set.next = controls.next;
                set.delta_link = controls.delta_link;
                set.annotations = controls.annotations;
                Ok(self.envelope(obj, set))
            }
            other => Err(DecodeError::UnexpectedCollectionShape {
                expected: "entity set",
                found: json_kind(other),
            }),
        }
    }

    /// Individual property document. 3.0 and later property documents do
    /// not carry the property name, so the result is named `""` there.
    pub fn property(&self, input: &[u8]) -> Result<Envelope<Property>, DecodeError> {
        let doc = self.parse(input, "property")?;
        let root = self.unwrap_document(&doc)?;
        let obj = root
            .as_object()
            .ok_or_else(|| malformed("property", format!("expected an object, found {}", json_kind(root))))?;

        if self.verbose() {
            let (name, node) = obj
                .iter()
                .find(|(key, _)| !key.starts_with("__"))
                .ok_or_else(|| malformed("property", "empty property document"))?;
            let property = self.read_property(name, None, node, 1)?;
            return Ok(Envelope::new(property));
        }

        let null = self
            .names
            .null_key
            .and_then(|key| obj.get(key))
            .is_some_and(|node| node == &Json::Bool(true));
        let property = if null {
            Property::new("", Value::Null)
        } else if let Some(node) = obj.get(self.names.value_key) {
            let type_name = self.find_control(obj, Field::Type);
            self.read_property("", type_name, node, 1)?
        } else {
            self.read_property("", None, root, 1)?
        };
        Ok(self.envelope(obj, property))
    }

    pub fn delta(&self, input: &[u8]) -> Result<Envelope<Delta>, DecodeError> {
        if self.verbose() {
            return Err(malformed("delta", "version 2.0 has no delta payload"));
        }
        let doc = self.parse(input, "delta")?;
        let obj = doc.as_object().ok_or(DecodeError::UnexpectedCollectionShape {
            expected: "delta",
            found: json_kind(&doc),
        })?;
        let Some(Json::Array(items)) = obj.get(self.names.value_key) else {
            return Err(DecodeError::UnexpectedCollectionShape {
                expected: "delta",
                found: "entity",
            });
        };

        let mut delta = Delta::new();
        for item in items {
            let record = item
                .as_object()
                .ok_or_else(|| malformed("delta", format!("record must be an object, found {}", json_kind(item))))?;
            self.read_delta_record(record, &mut delta)?;
        }
        let controls = self.read_collection_controls(obj)?;
        delta.count = controls.count;
        delta.next = controls.next;
        delta.delta_link = controls.delta_link;
        Ok(self.envelope(obj, delta))
    }

    /// Entity reference documents: one reference or a collection of them.
    pub fn references(&self, input: &[u8]) -> Result<Vec<String>, DecodeError> {
        let doc = self.parse(input, "references")?;
        let root = self.unwrap_document(&doc)?;
        match root {
            Json::Array(items) => items.iter().map(|item| self.reference_of(item)).collect(),
            Json::Object(obj) => match obj.get(self.names.value_key) {
                Some(Json::Array(items)) => items.iter().map(|item| self.reference_of(item)).collect(),
                _ => Ok(vec![self.reference_of(root)?]),
            },
            other => Err(malformed("references", format!("expected an object, found {}", json_kind(other)))),
        }
    }

    /// Service error document.
    pub fn error(&self, input: &[u8]) -> Result<ServerError, DecodeError> {
        let doc = self.parse(input, "error")?;
        let body = [self.names.error_key, "error", "odata.error"]
            .into_iter()
            .find_map(|key| doc.get(key))
            .and_then(Json::as_object)
            .ok_or_else(|| malformed("error", "missing error object"))?;

        let (code, message, target) = read_error_fields(body);
        let mut error = ServerError::new(code, message);
        error.target = target;
        if let Some(details) = body.get("details").and_then(Json::as_array) {
            error.details = details
                .iter()
                .filter_map(Json::as_object)
                .map(|detail| {
                    let (code, message, target) = read_error_fields(detail);
                    ErrorDetail { code, message, target }
                })
                .collect();
        }
        if let Some(inner) = body.get("innererror").and_then(Json::as_object) {
            for (key, node) in inner {
                let raw = match node {
                    Json::String(s) => s.clone(),
                    other => other.to_string(),
                };
                error.inner_error.insert(key.clone(), raw);
            }
        }
        Ok(error)
    }

    // =========================================================================
    // DOCUMENT FRAME
    // =========================================================================

    fn unwrap_document<'j>(&self, doc: &'j Json) -> Result<&'j Json, DecodeError> {
        let Some(wrapper) = self.names.wrapper else {
            return Ok(doc);
        };
        doc.get(wrapper)
            .ok_or_else(|| malformed("document", format!("missing \"{wrapper}\" wrapper")))
    }

    fn envelope<T>(&self, obj: &Object, payload: T) -> Envelope<T> {
        let mut envelope = Envelope::new(payload);
        for (key, node) in obj {
            match self.names.control_field(key) {
                Some(Field::Context) => envelope.context_url = owned(Some(node)),
                Some(Field::MetadataEtag) => envelope.metadata_etag = owned(Some(node)),
                _ => {}
            }
        }
        envelope
    }

    fn find_control<'j>(&self, obj: &'j Object, field: Field) -> Option<&'j str> {
        obj.iter()
            .find(|(key, _)| self.names.matches(key, field))
            .and_then(|(_, node)| node.as_str())
    }

    fn read_collection_controls(&self, obj: &Object) -> Result<CollectionControls, DecodeError> {
        let mut controls = CollectionControls::default();
        for (key, node) in obj {
            if key == self.names.value_key {
                continue;
            }
            match self.names.control_field(key) {
                Some(Field::Count) => controls.count = count_of(node),
                Some(Field::NextLink) => controls.next = owned(Some(node)),
                Some(Field::DeltaLink) => controls.delta_link = owned(Some(node)),
                Some(_) => {}
                None => match self.names.split_annotation(key) {
                    Some((None, term)) if !term.starts_with("odata.") => {
                        controls.annotations.push(self.read_annotation(term, node, 1)?);
                    }
                    _ => trace!(key = key.as_str(), "ignoring collection member"),
                },
            }
        }
        Ok(controls)
    }

    // =========================================================================
    // ENTITIES
    // =========================================================================

    fn read_entities(&self, items: &[Json], depth: usize) -> Result<Vec<Entity>, DecodeError> {
        items
            .iter()
            .map(|item| match item {
                Json::Object(obj) => self.read_entity(obj, depth),
                other => Err(malformed("entity set", format!("expected entity objects, found {}", json_kind(other)))),
            })
            .collect()
    }

    fn read_entity(&self, obj: &Object, depth: usize) -> Result<Entity, DecodeError> {
        let members = self.read_members(obj, depth, None)?;
        let mut control = members.control;

        let mut entity = Entity::new();
        entity.id = control.remove(&Field::Id);
        entity.type_name = control.remove(&Field::Type).map(|t| canonical_type(&t)).transpose()?;
        entity.etag = control.remove(&Field::Etag);
        entity.self_link = control.remove(&Field::ReadLink).map(|href| Link::new("", href));
        entity.edit_link = control.remove(&Field::EditLink).map(|href| Link::new("", href));
        entity.media_content_source = control.remove(&Field::MediaReadLink);
        entity.media_content_type = control.remove(&Field::MediaContentType);
        entity.media_etag = control.remove(&Field::MediaEtag);
        entity.media_edit_links = members.media_edit_links;
        if let Some(href) = control.remove(&Field::MediaEditLink) {
            entity.media_edit_links.insert(0, Link::new("", href));
        }
        entity.association_links = members.association_links;
        entity.navigation_links = members.navigation_links;
        entity.binding_links = members.binding_links;
        entity.properties = members.properties;
        entity.operations = members.operations;
        entity.annotations = members.annotations;
        Ok(entity)
    }

    /// Walks the keys of one structured instance (entity or complex value).
    /// `owner` is the declared type, used when the instance names none.
    fn read_members(&self, obj: &Object, depth: usize, owner: Option<&str>) -> Result<Members, DecodeError> {
        if depth > MAX_NESTING_DEPTH {
            return Err(DecodeError::NestingTooDeep { max: MAX_NESTING_DEPTH });
        }
        let mut members = Members::default();
        let mut pending: Vec<(&str, Pending<'_>)> = Vec::new();
        let mut index: FxHashMap<&str, usize> = FxHashMap::default();

        for (key, node) in obj {
            if self.verbose() {
                if Some(key.as_str()) == self.names.metadata_object {
                    self.read_verbose_metadata(node, &mut members.control);
                    continue;
                }
                if key.starts_with("__") {
                    trace!(key = key.as_str(), "ignoring verbose control key");
                    continue;
                }
            } else if let Some(field) = self.names.control_field(key) {
                if let Some(text) = node.as_str() {
                    members.control.insert(field, text.to_string());
                }
                continue;
            }

            if key.starts_with('#') {
                members.operations.push(read_operation(key, node));
                continue;
            }

            if !self.verbose() {
                if let Some((name, field)) = self.names.split_property_key(key) {
                    let slot = slot(&mut pending, &mut index, name);
                    match field {
                        Field::Type => slot.type_name = node.as_str(),
                        Field::NavigationLink => slot.navigation = node.as_str(),
                        Field::AssociationLink => slot.association = node.as_str(),
                        Field::MediaEditLink => slot.media_edit = node.as_str(),
                        Field::MediaContentType => slot.media_type = node.as_str(),
                        Field::MediaEtag => slot.media_etag = node.as_str(),
                        Field::Bind => slot.bind = Some(node),
                        Field::Count => slot.count = Some(node),
                        Field::NextLink => slot.next = node.as_str(),
                        other => trace!(key = key.as_str(), ?other, "ignoring property control key"),
                    }
                    continue;
                }
                if let Some((target, term)) = self.names.split_annotation(key) {
                    if term.starts_with("odata.") {
                        trace!(key = key.as_str(), "ignoring unknown control key");
                        continue;
                    }
                    match target {
                        Some(name) => slot(&mut pending, &mut index, name).annotations.push((term, node)),
                        None => members.annotations.push(self.read_annotation(term, node, depth)?),
                    }
                    continue;
                }
            }

            slot(&mut pending, &mut index, key).value = Some(node);
        }

        let own_type = members.control.get(&Field::Type).map(String::as_str).map(canonical_type).transpose()?;
        let owner = own_type.as_deref().or(owner);
        for (name, slot) in pending {
            self.settle(&mut members, owner, name, slot, depth)?;
        }
        Ok(members)
    }

    fn read_verbose_metadata(&self, node: &Json, control: &mut FxHashMap<Field, String>) {
        let Some(obj) = node.as_object() else {
            return;
        };
        for (key, node) in obj {
            match (self.names.control_field(key), node.as_str()) {
                (Some(field), Some(text)) => {
                    control.insert(field, text.to_string());
                }
                _ => trace!(key = key.as_str(), "ignoring __metadata member"),
            }
        }
    }

    /// Turns everything collected under one property name into links or a
    /// property value.
    fn settle(
        &self,
        members: &mut Members,
        owner: Option<&str>,
        name: &str,
        slot: Pending<'_>,
        depth: usize,
    ) -> Result<(), DecodeError> {
        if let Some(bind) = slot.bind {
            match read_binding(name, bind) {
                Some(link) => members.binding_links.push(link),
                None => trace!(property = name, "ignoring malformed binding"),
            }
        }
        if slot.media_edit.is_some() || slot.media_type.is_some() || slot.media_etag.is_some() {
            members.media_edit_links.push(Link {
                title: name.to_string(),
                href: slot.media_edit.map(str::to_string),
                link_type: slot.media_type.map(str::to_string),
                media_etag: slot.media_etag.map(str::to_string),
                ..Link::default()
            });
        }
        if let Some(href) = slot.association {
            members.association_links.push(Link::new(name, href));
        }

        if let Some(href) = slot.value.and_then(|node| self.deferred_uri(node)) {
            members.navigation_links.push(Link::new(name, href));
            return Ok(());
        }

        let structured = slot.value.is_some_and(|node| node.is_object() || node.is_array());
        let navigation = slot.navigation.is_some()
            || slot.count.is_some()
            || slot.next.is_some()
            || (structured && slot.association.is_some())
            || owner.is_some_and(|owner| self.edm.is_some_and(|edm| edm.is_navigation(owner, name)))
            || slot.value.is_some_and(|node| self.looks_like_entity(node));
        if navigation {
            let mut link = Link {
                title: name.to_string(),
                href: slot.navigation.map(str::to_string),
                ..Link::default()
            };
            if let Some(node) = slot.value {
                link.inline = self.read_inline(node, &slot, depth + 1)?;
            }
            members.navigation_links.push(link);
            return Ok(());
        }

        let Some(node) = slot.value else {
            if slot.type_name.is_some() || !slot.annotations.is_empty() {
                trace!(property = name, "annotations without a property value ignored");
            }
            return Ok(());
        };
        let annotations = slot
            .annotations
            .iter()
            .map(|(term, node)| self.read_annotation(term, node, depth))
            .collect::<Result<Vec<_>, _>>()?;
        let mut property = self.read_property(name, slot.type_name, node, depth)?;
        property.annotations = annotations;
        members.properties.push(property);
        Ok(())
    }

    /// 2.0 `{"__deferred":{"uri": ...}}`.
    fn deferred_uri<'j>(&self, node: &'j Json) -> Option<&'j str> {
        let deferred = self.names.get(Field::Deferred)?;
        let uri = self.names.get(Field::Id)?;
        node.get(deferred)?.get(uri)?.as_str()
    }

    /// Expanded navigation content is recognized by entity identity: an
    /// id control key (or `__metadata.uri` in 2.0) on the object or on every
    /// member of a non-empty array.
    fn looks_like_entity(&self, node: &Json) -> bool {
        match node {
            Json::Object(obj) => self.is_entity_object(obj),
            Json::Array(items) => {
                !items.is_empty()
                    && items
                        .iter()
                        .all(|item| item.as_object().is_some_and(|obj| self.is_entity_object(obj)))
            }
            _ => false,
        }
    }

    fn is_entity_object(&self, obj: &Object) -> bool {
        match self.names.metadata_object {
            Some(object) => {
                let uri = self.names.get(Field::Id).unwrap_or("uri");
                obj.get(object).and_then(|m| m.get(uri)).is_some()
                    || obj.get(self.names.value_key).is_some_and(Json::is_array)
            }
            None => obj.keys().any(|key| self.names.matches(key, Field::Id)),
        }
    }

    fn read_inline(&self, node: &Json, slot: &Pending<'_>, depth: usize) -> Result<Option<Inline>, DecodeError> {
        match node {
            Json::Null => Ok(None),
            Json::Object(obj) => {
                if self.verbose() {
                    if let Some(Json::Array(items)) = obj.get(self.names.value_key) {
                        let mut set = EntityCollection::new(self.read_entities(items, depth)?);
                        set.count = self.find_verbose_count(obj);
                        set.next = owned(obj.iter().find(|(k, _)| self.names.matches(k, Field::NextLink)).map(|(_, v)| v));
                        return Ok(Some(Inline::EntitySet(set)));
                    }
                }
                Ok(Some(Inline::Entity(Box::new(self.read_entity(obj, depth)?))))
            }
            Json::Array(items) => {
                let mut set = EntityCollection::new(self.read_entities(items, depth)?);
                set.count = slot.count.and_then(count_of);
                set.next = slot.next.map(str::to_string);
                Ok(Some(Inline::EntitySet(set)))
            }
            other => Err(malformed(
                "navigation property",
                format!("expanded content must be an object or array, found {}", json_kind(other)),
            )),
        }
    }

    fn find_verbose_count(&self, obj: &Object) -> Option<i64> {
        obj.iter()
            .find(|(key, _)| self.names.matches(key, Field::Count))
            .and_then(|(_, node)| count_of(node))
    }

    // =========================================================================
    // PROPERTIES AND VALUES
    // =========================================================================

    fn read_property(
        &self,
        name: &str,
        type_name: Option<&str>,
        node: &Json,
        depth: usize,
    ) -> Result<Property, DecodeError> {
        let raw = type_name.or_else(|| node.as_object().and_then(|obj| self.inner_type(obj)));
        let info = raw.map(TypeInfo::parse).transpose()?;
        let value = self.read_value(name, info.as_ref(), node, depth)?;
        Ok(Property {
            name: name.to_string(),
            type_name: info.map(|info| info.to_string()),
            value,
            annotations: Vec::new(),
        })
    }

    /// Type name carried inside a structured value.
    fn inner_type<'j>(&self, obj: &'j Object) -> Option<&'j str> {
        match self.names.metadata_object {
            Some(object) => obj.get(object)?.get(self.names.get(Field::Type)?)?.as_str(),
            None => self.find_control(obj, Field::Type),
        }
    }

    fn read_annotation(&self, term: &str, node: &Json, depth: usize) -> Result<Annotation, DecodeError> {
        let property = self.read_property(term, None, node, depth)?;
        Ok(Annotation {
            term: term.to_string(),
            type_name: property.type_name,
            value: property.value,
        })
    }

    fn read_value(&self, name: &str, info: Option<&TypeInfo>, node: &Json, depth: usize) -> Result<Value, DecodeError> {
        match node {
            Json::Null => Ok(Value::Null),
            Json::Object(obj) => {
                if let Some(kind) = info.and_then(TypeInfo::primitive_kind) {
                    let dimension = Dimension::of(kind)
                        .ok_or_else(|| wrong(name, format!("object value for {}", kind.full_name())))?;
                    return Ok(Value::Geospatial(read_geo(node, dimension, name)?));
                }
                let owner = info.map(TypeInfo::qualified_name);
                self.read_complex(obj, depth + 1, owner.as_deref())
            }
            Json::Array(items) => self.read_collection(name, info, items, depth + 1),
            scalar => {
                let literal = scalar_literal(scalar).unwrap_or_default();
                match info {
                    Some(info) => match info.primitive_kind() {
                        Some(kind) => {
                            check_literal(kind, &literal).map_err(|e| wrong(name, e.message))?;
                            Ok(Value::Primitive(literal))
                        }
                        None if scalar.is_string() => Ok(Value::Enum(literal)),
                        None => Ok(Value::Primitive(literal)),
                    },
                    None => Ok(Value::Primitive(literal)),
                }
            }
        }
    }

    fn read_complex(&self, obj: &Object, depth: usize, owner: Option<&str>) -> Result<Value, DecodeError> {
        let members = self.read_members(obj, depth, owner)?;
        if !members.annotations.is_empty() {
            trace!(count = members.annotations.len(), "dropping instance annotations on complex value");
        }
        if members.navigation_links.is_empty() && members.association_links.is_empty() && members.binding_links.is_empty() {
            return Ok(Value::Complex(members.properties));
        }
        Ok(Value::LinkedComplex(LinkedComplex {
            properties: members.properties,
            association_links: members.association_links,
            navigation_links: members.navigation_links,
            binding_links: members.binding_links,
        }))
    }

    fn read_collection(
        &self,
        name: &str,
        info: Option<&TypeInfo>,
        items: &[Json],
        depth: usize,
    ) -> Result<Value, DecodeError> {
        if depth > MAX_NESTING_DEPTH {
            return Err(DecodeError::NestingTooDeep { max: MAX_NESTING_DEPTH });
        }
        let element = info.map(TypeInfo::element);
        let kind = match element.as_ref() {
            Some(e) if e.is_geospatial() => ValueKind::Geospatial,
            Some(e) if e.is_primitive() => ValueKind::Primitive,
            _ => match items.iter().find(|item| !item.is_null()) {
                Some(Json::Object(_)) => ValueKind::Complex,
                Some(Json::String(_)) if element.is_some() => ValueKind::Enum,
                None => match element.as_ref() {
                    Some(e) if self.edm.is_some_and(|edm| edm.is_enum_type(&e.qualified_name())) => ValueKind::Enum,
                    Some(_) => ValueKind::Complex,
                    None => ValueKind::Primitive,
                },
                _ => ValueKind::Primitive,
            },
        };

        let mut collection = Collection::new(kind);
        for item in items {
            let value = self.read_value(name, element.as_ref(), item, depth)?;
            collection
                .push(value)
                .map_err(|v| wrong(name, format!("{} item in a collection of {}", v.kind().name(), kind.name())))?;
        }
        Ok(Value::Collection(collection))
    }

    // =========================================================================
    // DELTA AND REFERENCES
    // =========================================================================

    fn read_delta_record(&self, record: &Object, delta: &mut Delta) -> Result<(), DecodeError> {
        let mut context = None;
        let mut removed = None;
        for (key, node) in record {
            match self.names.control_field(key) {
                Some(Field::Context) => context = node.as_str(),
                Some(Field::Removed) => removed = Some(node),
                _ => {}
            }
        }

        if let Some(removed) = removed {
            let reason = removed
                .get(DELETED_REASON)
                .and_then(Json::as_str)
                .and_then(DeletedReason::parse)
                .unwrap_or_default();
            delta.deleted_entities.push(DeletedEntity {
                id: self.find_control(record, Field::Id).map(str::to_string),
                reason,
            });
            return Ok(());
        }

        let field = |key: &str| owned(record.get(key));
        match context.map(RecordKind::of).unwrap_or(RecordKind::Entity) {
            RecordKind::DeletedEntity => delta.deleted_entities.push(DeletedEntity {
                id: field(DELETED_ID),
                reason: field(DELETED_REASON)
                    .as_deref()
                    .and_then(DeletedReason::parse)
                    .unwrap_or_default(),
            }),
            RecordKind::Link => delta.added_links.push(DeltaLink {
                source: field(LINK_SOURCE),
                relationship: field(LINK_RELATIONSHIP),
                target: field(LINK_TARGET),
            }),
            RecordKind::DeletedLink => delta.deleted_links.push(DeltaLink {
                source: field(LINK_SOURCE),
                relationship: field(LINK_RELATIONSHIP),
                target: field(LINK_TARGET),
            }),
            RecordKind::Entity => delta.entities.push(self.read_entity(record, 1)?),
        }
        Ok(())
    }

    fn reference_of(&self, node: &Json) -> Result<String, DecodeError> {
        let obj = node
            .as_object()
            .ok_or_else(|| malformed("references", format!("expected an object, found {}", json_kind(node))))?;
        obj.get(self.names.reference_key)
            .and_then(Json::as_str)
            .or_else(|| self.find_control(obj, Field::Id))
            .or_else(|| self.inner_type_uri(obj))
            .map(str::to_string)
            .ok_or(DecodeError::MissingRequiredField {
                record: "reference",
                field: self.names.reference_key,
            })
    }

    /// 2.0 references written as `{"__metadata":{"uri": ...}}`.
    fn inner_type_uri<'j>(&self, obj: &'j Object) -> Option<&'j str> {
        obj.get(self.names.metadata_object?)?
            .get(self.names.get(Field::Id)?)?
            .as_str()
    }
}

// =============================================================================
// HELPERS
// =============================================================================

#[derive(Default)]
struct CollectionControls {
    count: Option<i64>,
    next: Option<String>,
    delta_link: Option<String>,
    annotations: Vec<Annotation>,
}

/// Everything read from one structured JSON object.
#[derive(Default)]
struct Members {
    control: FxHashMap<Field, String>,
    properties: Vec<Property>,
    navigation_links: Vec<Link>,
    association_links: Vec<Link>,
    binding_links: Vec<Link>,
    media_edit_links: Vec<Link>,
    operations: Vec<Operation>,
    annotations: Vec<Annotation>,
}

/// Keys collected for one property name before it is settled.
#[derive(Default)]
struct Pending<'j> {
    type_name: Option<&'j str>,
    navigation: Option<&'j str>,
    association: Option<&'j str>,
    media_edit: Option<&'j str>,
    media_type: Option<&'j str>,
    media_etag: Option<&'j str>,
    bind: Option<&'j Json>,
    count: Option<&'j Json>,
    next: Option<&'j str>,
    annotations: Vec<(&'j str, &'j Json)>,
    value: Option<&'j Json>,
}

fn slot<'p, 'j>(
    pending: &'p mut Vec<(&'j str, Pending<'j>)>,
    index: &mut FxHashMap<&'j str, usize>,
    name: &'j str,
) -> &'p mut Pending<'j> {
    let at = *index.entry(name).or_insert_with(|| {
        pending.push((name, Pending::default()));
        pending.len() - 1
    });
    &mut pending[at].1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordKind {
    Entity,
    DeletedEntity,
    Link,
    DeletedLink,
}

impl RecordKind {
    fn of(context: &str) -> RecordKind {
        if context.ends_with("$deletedEntity") {
            RecordKind::DeletedEntity
        } else if context.ends_with("$deletedLink") {
            RecordKind::DeletedLink
        } else if context.ends_with("$link") {
            RecordKind::Link
        } else {
            RecordKind::Entity
        }
    }
}

fn read_operation(key: &str, node: &Json) -> Operation {
    // Actions and functions share one JSON shape.
    Operation {
        kind: OperationKind::Action,
        metadata_anchor: key.to_string(),
        title: owned(node.get("title")),
        target: owned(node.get("target")),
    }
}

fn read_binding(name: &str, node: &Json) -> Option<Link> {
    match node {
        Json::String(href) => Some(Link::new(name, href.as_str())),
        Json::Array(items) => Some(Link {
            title: name.to_string(),
            bindings: items.iter().filter_map(Json::as_str).map(str::to_string).collect(),
            ..Link::default()
        }),
        _ => None,
    }
}

fn read_error_fields(obj: &Object) -> (String, String, Option<String>) {
    let code = obj.get("code").and_then(scalar_literal).unwrap_or_default();
    let message = match obj.get("message") {
        Some(Json::String(message)) => message.clone(),
        Some(Json::Object(message)) => owned(message.get("value")).unwrap_or_default(),
        _ => String::new(),
    };
    (code, message, owned(obj.get("target")))
}
