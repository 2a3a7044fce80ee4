//! Well-known error codes.
//!
//! Codes are plain strings on the wire. Applications define their own codes
//! the same way:
//!
//! ```
//! use mooring_core::ErrorCode;
//!
//! pub const OBJECT_NOT_FOUND: ErrorCode = ErrorCode::from_static("object_not_found");
//! assert_eq!(OBJECT_NOT_FOUND.as_str(), "object_not_found");
//! ```

use crate::ErrorCode;

/// The request body could not be decoded as JSON.
pub const BAD_JSON: ErrorCode = ErrorCode::from_static("bad_json");

/// The query string could not be decoded into the expected parameters.
pub const BAD_QUERY_PARAMS: ErrorCode = ErrorCode::from_static("bad_query_params");

/// One or more fields failed validation; details are in `fields`.
pub const FORM_VALIDATION: ErrorCode = ErrorCode::from_static("form_validation");
