//! Push-style XML writer.
//!
//! Keeps the stack of open elements so callers only say `end()`. Text and
//! attribute values are escaped on the way out.

use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::EncodeError;
use crate::names::atom::QName;

/// Attributes of one start tag, in writing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attrs(Vec<(String, String)>);

impl Attrs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    pub fn with_opt(mut self, name: impl Into<String>, value: Option<&str>) -> Self {
        if let Some(value) = value {
            self.push(name, value);
        }
        self
    }

    pub fn qualified(self, name: &QName, value: impl Into<String>) -> Self {
        self.with(name.prefixed(), value)
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn start_tag(&self, name: &str) -> BytesStart<'static> {
        let mut start = BytesStart::new(name.to_string());
        for (key, value) in &self.0 {
            start.push_attribute((key.as_str(), value.as_str()));
        }
        start
    }
}

pub struct XmlWriter<W: Write> {
    inner: Writer<W>,
    open: Vec<String>,
}

impl<W: Write> XmlWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: Writer::new(writer),
            open: Vec::new(),
        }
    }

    /// The underlying sink, for splicing pre-rendered fragments.
    pub fn get_mut(&mut self) -> &mut W {
        self.inner.get_mut()
    }

    pub fn into_inner(self) -> W {
        self.inner.into_inner()
    }

    pub fn flush(&mut self) -> Result<(), EncodeError> {
        self.inner.get_mut().flush()?;
        Ok(())
    }

    /// Number of elements started and not yet ended.
    pub fn open_elements(&self) -> usize {
        self.open.len()
    }

    pub fn declaration(&mut self) -> Result<(), EncodeError> {
        self.inner
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        Ok(())
    }

    pub fn start(&mut self, name: &str, attrs: Attrs) -> Result<(), EncodeError> {
        self.inner.write_event(Event::Start(attrs.start_tag(name)))?;
        self.open.push(name.to_string());
        Ok(())
    }

    pub fn end(&mut self) -> Result<(), EncodeError> {
        let Some(name) = self.open.pop() else {
            return Err(EncodeError::WriteFailed("end tag without an open element".to_string()));
        };
        self.inner.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    /// `<name attrs/>`.
    pub fn empty(&mut self, name: &str, attrs: Attrs) -> Result<(), EncodeError> {
        self.inner.write_event(Event::Empty(attrs.start_tag(name)))?;
        Ok(())
    }

    pub fn text(&mut self, text: &str) -> Result<(), EncodeError> {
        if text.is_empty() {
            return Ok(());
        }
        self.inner.write_event(Event::Text(BytesText::new(text)))?;
        Ok(())
    }

    /// `<name attrs>text</name>`.
    pub fn text_element(&mut self, name: &str, attrs: Attrs, text: &str) -> Result<(), EncodeError> {
        self.start(name, attrs)?;
        self.text(text)?;
        self.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(f: impl FnOnce(&mut XmlWriter<&mut Vec<u8>>) -> Result<(), EncodeError>) -> String {
        let mut buf = Vec::new();
        let mut w = XmlWriter::new(&mut buf);
        f(&mut w).unwrap();
        assert_eq!(w.open_elements(), 0);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_nested_elements_and_escaping() {
        let xml = render(|w| {
            w.start("feed", Attrs::new().with("xmlns", "urn:a").with_opt("xml:base", None))?;
            w.text_element("title", Attrs::new().with("type", "text"), "Tom & \"Jerry\" <3")?;
            w.empty("link", Attrs::new().with("href", "a?b=1&c=2"))?;
            w.end()
        });
        assert_eq!(
            xml,
            r#"<feed xmlns="urn:a"><title type="text">Tom &amp; &quot;Jerry&quot; &lt;3</title><link href="a?b=1&amp;c=2"/></feed>"#
        );
    }

    #[test]
    fn test_declaration_and_empty_text() {
        let xml = render(|w| {
            w.declaration()?;
            w.text_element("d:Name", Attrs::new(), "")
        });
        assert_eq!(xml, r#"<?xml version="1.0" encoding="utf-8"?><d:Name></d:Name>"#);
    }

    #[test]
    fn test_unbalanced_end() {
        let mut buf = Vec::new();
        let mut w = XmlWriter::new(&mut buf);
        assert!(matches!(w.end(), Err(EncodeError::WriteFailed(_))));
    }
}
