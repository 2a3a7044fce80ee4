//! Classified request errors.
//!
//! This module provides [`ApiError`], the error type handlers return when a
//! request fails in a way the client is expected to understand. Every
//! variant maps to an HTTP 400 response whose body is an
//! [`ErrorResponse`](crate::ErrorResponse).
//!
//! # Kinds
//!
//! | Variant | Wire body |
//! |---|---|
//! | `Plain` | `{"error_code": code}` |
//! | `WithDescription` | `{"error_code": code, "description": desc}` |
//! | `FormValidation` | `{"error_code": "form_validation", "fields": {...}}` |
//!
//! Errors that are not an `ApiError` (I/O failures, bugs, panics) are not
//! classified and become an HTTP 500 with an empty body.

use std::borrow::Cow;
use std::fmt;

use http::StatusCode;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codes;
use crate::ErrorResponse;

static FORM_VALIDATION_CODE: ErrorCode = codes::FORM_VALIDATION;

/// A stable, string-valued error identifier.
///
/// The string itself is the identifier; there is no numeric table shared
/// between server and client. Two codes are equal when their strings are.
///
/// # Example
///
/// ```
/// use mooring_core::ErrorCode;
///
/// const NOT_ENOUGH_FUNDS: ErrorCode = ErrorCode::from_static("not_enough_funds");
///
/// assert_eq!(NOT_ENOUGH_FUNDS, ErrorCode::new("not_enough_funds"));
/// assert_eq!(NOT_ENOUGH_FUNDS.to_string(), "not_enough_funds");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorCode(Cow<'static, str>);

impl ErrorCode {
    /// Creates a code from a static string. Usable in `const` items.
    #[must_use]
    pub const fn from_static(code: &'static str) -> Self {
        Self(Cow::Borrowed(code))
    }

    /// Creates a code from an owned string.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(Cow::Owned(code.into()))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for ErrorCode {
    fn from(code: &'static str) -> Self {
        Self::from_static(code)
    }
}

impl From<String> for ErrorCode {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

impl PartialEq<str> for ErrorCode {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for ErrorCode {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// A request error that can be reported to the client.
///
/// # Example
///
/// ```
/// use mooring_core::{codes, ApiError};
///
/// let err = ApiError::with_description(codes::BAD_JSON, "EOF while parsing a value");
/// assert_eq!(err.code(), &codes::BAD_JSON);
/// assert_eq!(err.description(), Some("EOF while parsing a value"));
///
/// let err = ApiError::form_validation()
///     .field("name", "required")
///     .field("age", "not_numeric")
///     .build();
/// assert_eq!(err.code(), &codes::FORM_VALIDATION);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// A bare error code. Its string form is the code itself.
    #[error("{0}")]
    Plain(ErrorCode),

    /// An error code with a free-text diagnostic.
    #[error("{code}: {description}")]
    WithDescription {
        /// The inner code.
        code: ErrorCode,
        /// Human-readable detail.
        description: String,
    },

    /// Several independent field failures reported together.
    #[error("form validation failed for {} field(s)", .fields.len())]
    FormValidation {
        /// Field name to the error of that field.
        fields: IndexMap<String, ApiError>,
    },
}

impl ApiError {
    /// Creates a plain error from a code.
    #[must_use]
    pub fn plain(code: impl Into<ErrorCode>) -> Self {
        Self::Plain(code.into())
    }

    /// Creates an error carrying a code and a description.
    #[must_use]
    pub fn with_description(code: impl Into<ErrorCode>, description: impl Into<String>) -> Self {
        Self::WithDescription {
            code: code.into(),
            description: description.into(),
        }
    }

    /// Starts collecting field validation failures.
    #[must_use]
    pub fn form_validation() -> FormValidationBuilder {
        FormValidationBuilder::default()
    }

    /// Returns the code identifying this error.
    ///
    /// Form validation failures always report `form_validation`.
    #[must_use]
    pub fn code(&self) -> &ErrorCode {
        match self {
            Self::FormValidation { .. } => &FORM_VALIDATION_CODE,
            Self::WithDescription { code, .. } | Self::Plain(code) => code,
        }
    }

    /// Returns the description of a described error.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::WithDescription { description, .. } => Some(description),
            _ => None,
        }
    }

    /// Returns the per-field errors of a form validation failure.
    #[must_use]
    pub fn fields(&self) -> Option<&IndexMap<String, ApiError>> {
        match self {
            Self::FormValidation { fields } => Some(fields),
            _ => None,
        }
    }

    /// Returns the HTTP status used for every classified error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    /// Builds the wire body for this error.
    ///
    /// Form validation and described errors are matched before plain codes;
    /// each arm emits only the keys that belong to its kind.
    #[must_use]
    pub fn to_response(&self) -> ErrorResponse {
        match self {
            Self::FormValidation { fields } => {
                let fields = fields
                    .iter()
                    .map(|(name, err)| (name.clone(), err.code().to_string()))
                    .collect();
                ErrorResponse::new(codes::FORM_VALIDATION.as_str()).with_fields(fields)
            }
            Self::WithDescription { code, description } => {
                ErrorResponse::new(code.as_str()).with_description(description.clone())
            }
            Self::Plain(code) => ErrorResponse::new(code.as_str()),
        }
    }

    /// Finds an `ApiError` inside an `anyhow::Error`, looking through any
    /// context layered on top of it.
    #[must_use]
    pub fn find_in(err: &anyhow::Error) -> Option<&ApiError> {
        err.chain().find_map(|cause| cause.downcast_ref::<ApiError>())
    }
}

impl From<ErrorCode> for ApiError {
    fn from(code: ErrorCode) -> Self {
        Self::Plain(code)
    }
}

impl From<&'static str> for ApiError {
    fn from(code: &'static str) -> Self {
        Self::Plain(ErrorCode::from_static(code))
    }
}

/// Collects field failures for [`ApiError::FormValidation`].
///
/// Validation code can run every check and report all failures at once
/// instead of stopping at the first one:
///
/// ```
/// use mooring_core::ApiError;
///
/// fn validate(name: &str, age: &str) -> Result<(), ApiError> {
///     let mut form = ApiError::form_validation();
///     if name.is_empty() {
///         form = form.field("name", "required");
///     }
///     if age.parse::<u32>().is_err() {
///         form = form.field("age", "not_numeric");
///     }
///     form.into_result()
/// }
///
/// assert!(validate("Ann", "31").is_ok());
/// assert_eq!(validate("", "x").unwrap_err().fields().unwrap().len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct FormValidationBuilder {
    fields: IndexMap<String, ApiError>,
}

impl FormValidationBuilder {
    /// Records a failure for a field. A later failure for the same field
    /// replaces the earlier one.
    pub fn field(mut self, name: impl Into<String>, error: impl Into<ApiError>) -> Self {
        self.fields.insert(name.into(), error.into());
        self
    }

    /// Records a failure for a field through a mutable reference.
    pub fn push(&mut self, name: impl Into<String>, error: impl Into<ApiError>) {
        self.fields.insert(name.into(), error.into());
    }

    /// Returns `true` if no field failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Builds the error, even when no field failed.
    #[must_use]
    pub fn build(self) -> ApiError {
        ApiError::FormValidation {
            fields: self.fields,
        }
    }

    /// Returns `Ok(())` when no field failed, the form validation error otherwise.
    pub fn into_result(self) -> Result<(), ApiError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.build())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_plain_display_is_code() {
        let err = ApiError::plain("object_not_found");
        assert_eq!(err.to_string(), "object_not_found");
        assert_eq!(err, ApiError::plain(ErrorCode::new("object_not_found")));
    }

    #[test]
    fn test_with_description_keeps_inner_code() {
        let err = ApiError::with_description(codes::BAD_QUERY_PARAMS, "missing field `page`");
        assert_eq!(err.code(), &codes::BAD_QUERY_PARAMS);
        assert_eq!(err.description(), Some("missing field `page`"));
        assert!(err.fields().is_none());
    }

    #[test]
    fn test_plain_response_has_only_code() {
        let body = ApiError::plain("object_not_found").to_response();
        assert_eq!(body, ErrorResponse::new("object_not_found"));
    }

    #[test]
    fn test_described_response_has_no_fields() {
        let body = ApiError::with_description(codes::BAD_JSON, "EOF").to_response();
        assert_eq!(body.error_code, "bad_json");
        assert_eq!(body.description.as_deref(), Some("EOF"));
        assert!(body.fields.is_none());
    }

    #[test]
    fn test_form_validation_response() {
        let err = ApiError::form_validation()
            .field("name", "required")
            .field("age", ApiError::with_description("not_numeric", "got `abc`"))
            .build();

        let body = err.to_response();
        assert_eq!(body.error_code, "form_validation");
        assert!(body.description.is_none());

        let fields = body.fields.unwrap();
        assert_eq!(fields.get("name").map(String::as_str), Some("required"));
        assert_eq!(fields.get("age").map(String::as_str), Some("not_numeric"));
    }

    #[test]
    fn test_builder_into_result() {
        assert!(ApiError::form_validation().into_result().is_ok());

        let mut form = ApiError::form_validation();
        form.push("email", "invalid");
        let err = form.into_result().unwrap_err();
        assert_eq!(err.fields().unwrap().len(), 1);
    }

    #[test]
    fn test_find_in_anyhow_through_context() {
        let err = anyhow::Error::new(ApiError::plain("object_not_found")).context("loading order");
        assert_eq!(ApiError::find_in(&err), Some(&ApiError::plain("object_not_found")));

        let other = anyhow::anyhow!("disk full");
        assert!(ApiError::find_in(&other).is_none());
    }

    #[test]
    fn test_status_is_bad_request() {
        assert_eq!(ApiError::plain("x").status_code(), StatusCode::BAD_REQUEST);
    }

    proptest! {
        #[test]
        fn prop_form_validation_maps_every_field(
            fields in proptest::collection::btree_map("[a-z]{1,8}", "[a-z_]{1,12}", 0..8)
        ) {
            let mut form = ApiError::form_validation();
            for (name, code) in &fields {
                form.push(name.clone(), ErrorCode::new(code.clone()));
            }
            let body = form.build().to_response();

            prop_assert_eq!(body.error_code.as_str(), "form_validation");
            prop_assert!(body.description.is_none());
            let out = body.fields.unwrap();
            prop_assert_eq!(out.len(), fields.len());
            for (name, code) in &fields {
                prop_assert_eq!(out.get(name), Some(code));
            }
        }

        #[test]
        fn prop_described_response_roundtrips(code in "[a-z_]{1,16}", desc in ".*") {
            let body = ApiError::with_description(ErrorCode::new(code.clone()), desc.clone()).to_response();
            prop_assert_eq!(body.error_code, code);
            prop_assert_eq!(body.description, Some(desc));
            prop_assert!(body.fields.is_none());
        }
    }
}
