//! # Mooring Core
//!
//! Core types shared by the Mooring server adapters.
//!
//! This crate provides the foundational types used throughout Mooring:
//!
//! - [`ApiError`] - Classified request errors (plain code, described code, form validation)
//! - [`ErrorCode`] - Stable, string-valued error identifier
//! - [`ErrorResponse`] - The JSON body sent to HTTP clients for classified errors
//! - [`RequestId`] - UUID v7 request identifier
//!
//! ## Wire Contract
//!
//! ```json
//! { "error_code": "bad_json", "description": "expected value at line 1 column 1" }
//! { "error_code": "form_validation", "fields": { "name": "required" } }
//! { "error_code": "object_not_found" }
//! ```

#![doc(html_root_url = "https://docs.rs/mooring-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod codes;
mod error;
mod request_id;
mod response;

pub use error::{ApiError, ErrorCode, FormValidationBuilder};
pub use request_id::RequestId;
pub use response::ErrorResponse;
