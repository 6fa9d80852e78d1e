//! Forward-only XML cursor.
//!
//! Wraps a namespace-resolving pull parser and hands out owned elements.
//! All element-scoped reading goes through three combinators:
//! [`XmlCursor::read_text`] collects character data up to the element's end
//! tag, [`XmlCursor::read_children`] dispatches each child element to a
//! handler, and [`XmlCursor::skip`] discards a subtree. Whitespace between
//! elements is insignificant everywhere.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;

use crate::error::DecodeError;
use crate::limits::MAX_NESTING_DEPTH;
use crate::names::atom::QName;

/// An attribute with its namespace resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    pub namespace: String,
    pub local: String,
    pub value: String,
}

/// A start tag with its namespace resolved. Namespace declarations are not
/// kept as attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub namespace: String,
    pub local: String,
    pub attributes: Vec<XmlAttribute>,
}

impl Element {
    pub fn is(&self, name: &QName) -> bool {
        name.matches(&self.namespace, &self.local)
    }

    pub fn attr(&self, name: &QName) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| name.matches(&a.namespace, &a.local))
            .map(|a| a.value.as_str())
    }

    /// Unqualified attribute.
    pub fn plain(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.is_empty() && a.local == local)
            .map(|a| a.value.as_str())
    }

    /// `{namespace}local`, for messages.
    pub fn display_name(&self) -> String {
        if self.namespace.is_empty() {
            self.local.clone()
        } else {
            format!("{{{}}}{}", self.namespace, self.local)
        }
    }
}

/// Content of an element: a child element or a run of character data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

enum XmlEvent {
    Start(Element),
    End,
    Text(String),
    Eof,
}

pub(crate) fn malformed(context: &'static str, detail: impl Into<String>) -> DecodeError {
    DecodeError::MalformedDocument {
        context,
        detail: detail.into(),
    }
}

fn namespace_of(resolved: &ResolveResult<'_>) -> String {
    match resolved {
        ResolveResult::Bound(ns) => String::from_utf8_lossy(ns.as_ref()).into_owned(),
        _ => String::new(),
    }
}

pub struct XmlCursor<'i> {
    reader: NsReader<&'i [u8]>,
    depth: usize,
}

impl<'i> XmlCursor<'i> {
    pub fn new(input: &'i [u8]) -> Self {
        let mut reader = NsReader::from_reader(input);
        // `<a/>` arrives as a start/end pair, so every element has an end.
        reader.expand_empty_elements(true);
        Self { reader, depth: 0 }
    }

    /// Current element depth (the document element is 1).
    pub fn depth(&self) -> usize {
        self.depth
    }

    fn next_event(&mut self) -> Result<XmlEvent, DecodeError> {
        loop {
            let (resolved, event) = self.reader.read_resolved_event()?;
            let namespace = namespace_of(&resolved);
            match event {
                Event::Start(start) => {
                    self.depth += 1;
                    if self.depth > MAX_NESTING_DEPTH {
                        return Err(DecodeError::NestingTooDeep {
                            max: MAX_NESTING_DEPTH,
                        });
                    }
                    return Ok(XmlEvent::Start(self.element(namespace, &start)?));
                }
                Event::End(_) => {
                    self.depth = self.depth.saturating_sub(1);
                    return Ok(XmlEvent::End);
                }
                Event::Text(text) => return Ok(XmlEvent::Text(text.unescape()?.into_owned())),
                Event::CData(data) => {
                    return Ok(XmlEvent::Text(String::from_utf8_lossy(&data).into_owned()));
                }
                Event::Eof => return Ok(XmlEvent::Eof),
                // Declarations, comments, processing instructions, doctypes.
                _ => {}
            }
        }
    }

    fn element(&self, namespace: String, start: &BytesStart<'_>) -> Result<Element, DecodeError> {
        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute?;
            if attribute.key.as_namespace_binding().is_some() {
                continue;
            }
            let (resolved, local) = self.reader.resolve_attribute(attribute.key);
            attributes.push(XmlAttribute {
                namespace: namespace_of(&resolved),
                local: String::from_utf8_lossy(local.as_ref()).into_owned(),
                value: attribute.unescape_value()?.into_owned(),
            });
        }
        Ok(Element {
            namespace,
            local: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
            attributes,
        })
    }

    /// Advances to the document element.
    pub fn root(&mut self) -> Result<Element, DecodeError> {
        loop {
            match self.next_event()? {
                XmlEvent::Start(element) => return Ok(element),
                XmlEvent::Text(text) if text.trim().is_empty() => {}
                XmlEvent::Text(_) => return Err(malformed("document", "character data before the root element")),
                XmlEvent::End => return Err(malformed("document", "end tag before the root element")),
                XmlEvent::Eof => return Err(DecodeError::UnexpectedEof { context: "document" }),
            }
        }
    }

    /// Next piece of `parent`'s content, or `None` once its end tag has been
    /// consumed.
    pub fn next_child(&mut self, parent: &Element) -> Result<Option<Node>, DecodeError> {
        match self.next_event()? {
            XmlEvent::Start(element) => Ok(Some(Node::Element(element))),
            XmlEvent::Text(text) => Ok(Some(Node::Text(text))),
            XmlEvent::End => Ok(None),
            XmlEvent::Eof => Err(DecodeError::MalformedDocument {
                context: "document",
                detail: format!("input ended inside <{}>", parent.local),
            }),
        }
    }

    /// Calls `f` for each child element of `parent` until its end tag.
    /// The handler must consume the child it is given.
    pub fn read_children<F>(&mut self, parent: &Element, mut f: F) -> Result<(), DecodeError>
    where
        F: FnMut(&mut Self, Element) -> Result<(), DecodeError>,
    {
        while let Some(node) = self.next_child(parent)? {
            match node {
                Node::Element(child) => f(self, child)?,
                Node::Text(text) if text.trim().is_empty() => {}
                Node::Text(_) => {
                    return Err(malformed(
                        "element",
                        format!("unexpected character data in <{}>", parent.local),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Text content of a leaf element. A child element is an error.
    pub fn read_text(&mut self, element: &Element) -> Result<String, DecodeError> {
        let mut text = String::new();
        while let Some(node) = self.next_child(element)? {
            match node {
                Node::Text(chunk) => text.push_str(&chunk),
                Node::Element(child) => {
                    return Err(DecodeError::UnexpectedElement {
                        expected: "character data",
                        found: child.display_name(),
                    });
                }
            }
        }
        Ok(text)
    }

    /// Discards the rest of `element`, nested content included.
    pub fn skip(&mut self, element: &Element) -> Result<(), DecodeError> {
        while let Some(node) = self.next_child(element)? {
            if let Node::Element(child) = node {
                self.skip(&child)?;
            }
        }
        Ok(())
    }
}
