//! Service error documents (`{"error": {...}}` / `<m:error>`).

use std::collections::BTreeMap;

/// One entry of an error's `details` array.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    pub target: Option<String>,
}

/// An error reported by a service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerError {
    pub code: String,
    pub message: String,
    pub target: Option<String>,
    pub details: Vec<ErrorDetail>,
    /// `innererror` members as raw text: strings unquoted, anything else as
    /// its JSON source. No schema is imposed on the contents.
    pub inner_error: BTreeMap<String, String>,
}

impl ServerError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            ..Default::default()
        }
    }
}
