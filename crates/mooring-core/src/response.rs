//! Wire representation of classified errors.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// JSON body returned to HTTP clients for a classified error.
///
/// Only `error_code` is always present. `description` is emitted for
/// described errors and `fields` for form validation failures; absent
/// values are omitted rather than serialized as `null`.
///
/// # Example
///
/// ```
/// use mooring_core::ErrorResponse;
///
/// let body = ErrorResponse::new("bad_json").with_description("EOF while parsing");
/// let json = serde_json::to_string(&body).unwrap();
/// assert_eq!(json, r#"{"error_code":"bad_json","description":"EOF while parsing"}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable error identifier.
    pub error_code: String,

    /// Human-readable detail, present only for described errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Per-field error codes, present only for form validation failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<IndexMap<String, String>>,
}

impl ErrorResponse {
    /// Creates a response carrying only an error code.
    #[must_use]
    pub fn new(error_code: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            description: None,
            fields: None,
        }
    }

    /// Attaches a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attaches per-field error codes.
    #[must_use]
    pub fn with_fields(mut self, fields: IndexMap<String, String>) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Serializes the body to JSON bytes.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
