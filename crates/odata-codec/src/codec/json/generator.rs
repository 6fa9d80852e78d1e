//! Push-style JSON generator.
//!
//! A thin state machine over serde_json's `CompactFormatter`: it tracks
//! whether the next token is the first in its container so callers only
//! say what to write, never where the commas go.

use std::io::Write;

use serde_json::ser::{CompactFormatter, Formatter};

use crate::error::EncodeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Object { first: bool },
    Array { first: bool },
}

/// Writes JSON tokens to `W` without building a tree.
pub struct JsonGenerator<W: Write> {
    writer: W,
    formatter: CompactFormatter,
    stack: Vec<Frame>,
}

impl<W: Write> JsonGenerator<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            formatter: CompactFormatter,
            stack: Vec::new(),
        }
    }

    /// Direct access to the sink, for out-of-band markers.
    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn flush(&mut self) -> Result<(), EncodeError> {
        self.writer.flush()?;
        Ok(())
    }

    fn before_value(&mut self) -> Result<(), EncodeError> {
        if let Some(Frame::Array { first }) = self.stack.last_mut() {
            let was_first = *first;
            *first = false;
            self.formatter.begin_array_value(&mut self.writer, was_first)?;
        }
        Ok(())
    }

    fn after_value(&mut self) -> Result<(), EncodeError> {
        match self.stack.last() {
            Some(Frame::Array { .. }) => self.formatter.end_array_value(&mut self.writer)?,
            Some(Frame::Object { .. }) => self.formatter.end_object_value(&mut self.writer)?,
            None => {}
        }
        Ok(())
    }

    pub fn begin_object(&mut self) -> Result<(), EncodeError> {
        self.before_value()?;
        self.formatter.begin_object(&mut self.writer)?;
        self.stack.push(Frame::Object { first: true });
        Ok(())
    }

    pub fn end_object(&mut self) -> Result<(), EncodeError> {
        self.stack.pop();
        self.formatter.end_object(&mut self.writer)?;
        self.after_value()
    }

    pub fn begin_array(&mut self) -> Result<(), EncodeError> {
        self.before_value()?;
        self.formatter.begin_array(&mut self.writer)?;
        self.stack.push(Frame::Array { first: true });
        Ok(())
    }

    pub fn end_array(&mut self) -> Result<(), EncodeError> {
        self.stack.pop();
        self.formatter.end_array(&mut self.writer)?;
        self.after_value()
    }

    /// Writes an object key; the next call writes its value.
    pub fn key(&mut self, key: &str) -> Result<(), EncodeError> {
        let first = match self.stack.last_mut() {
            Some(Frame::Object { first }) => std::mem::replace(first, false),
            _ => {
                return Err(EncodeError::WriteFailed(format!(
                    "key {key:?} written outside an object"
                )));
            }
        };
        self.formatter.begin_object_key(&mut self.writer, first)?;
        self.write_str(key)?;
        self.formatter.end_object_key(&mut self.writer)?;
        self.formatter.begin_object_value(&mut self.writer)?;
        Ok(())
    }

    fn write_str(&mut self, s: &str) -> Result<(), EncodeError> {
        serde_json::to_writer(&mut self.writer, s).map_err(|e| EncodeError::WriteFailed(e.to_string()))
    }

    pub fn string(&mut self, s: &str) -> Result<(), EncodeError> {
        self.before_value()?;
        self.write_str(s)?;
        self.after_value()
    }

    /// Writes a number token verbatim. The caller guarantees JSON syntax.
    pub fn number(&mut self, raw: &str) -> Result<(), EncodeError> {
        self.before_value()?;
        self.formatter.write_number_str(&mut self.writer, raw)?;
        self.after_value()
    }

    pub fn boolean(&mut self, value: bool) -> Result<(), EncodeError> {
        self.before_value()?;
        self.formatter.write_bool(&mut self.writer, value)?;
        self.after_value()
    }

    pub fn null(&mut self) -> Result<(), EncodeError> {
        self.before_value()?;
        self.formatter.write_null(&mut self.writer)?;
        self.after_value()
    }

    /// Writes an already-serialized JSON value (e.g. a buffered entity).
    pub fn raw_value(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        self.before_value()?;
        self.writer.write_all(bytes)?;
        self.after_value()
    }

    // Convenience pairs.

    pub fn string_field(&mut self, key: &str, value: &str) -> Result<(), EncodeError> {
        self.key(key)?;
        self.string(value)
    }

    pub fn bool_field(&mut self, key: &str, value: bool) -> Result<(), EncodeError> {
        self.key(key)?;
        self.boolean(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(f: impl FnOnce(&mut JsonGenerator<&mut Vec<u8>>) -> Result<(), EncodeError>) -> String {
        let mut buf = Vec::new();
        let mut g = JsonGenerator::new(&mut buf);
        f(&mut g).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_nested_separators() {
        let out = render(|g| {
            g.begin_object()?;
            g.string_field("a", "x\"y")?;
            g.key("b")?;
            g.begin_array()?;
            g.number("1")?;
            g.null()?;
            g.begin_object()?;
            g.bool_field("c", true)?;
            g.end_object()?;
            g.end_array()?;
            g.key("d")?;
            g.number("1.50")?;
            g.end_object()
        });
        assert_eq!(out, r#"{"a":"x\"y","b":[1,null,{"c":true}],"d":1.50}"#);
    }

    #[test]
    fn test_raw_values_in_array() {
        let out = render(|g| {
            g.begin_array()?;
            g.raw_value(b"{}")?;
            g.raw_value(b"[]")?;
            g.end_array()
        });
        assert_eq!(out, "[{},[]]");
    }

    #[test]
    fn test_key_outside_object_fails() {
        let mut buf = Vec::new();
        let mut g = JsonGenerator::new(&mut buf);
        assert!(g.key("x").is_err());
    }
}
