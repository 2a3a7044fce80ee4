//! Middleware stages shipped with Mooring.
//!
//! - [`error_normalization`] - always installed as the outermost stage
//! - [`cors`] - fixed permissive CORS policy
//! - [`request_id`] - request ID propagation

pub mod cors;
pub mod error_normalization;
pub mod request_id;

pub use cors::{CorsConfig, CorsMiddleware};
pub use error_normalization::{ErrorHandler, ErrorNormalizationMiddleware};
pub use request_id::{RequestIdMiddleware, REQUEST_ID_HEADER};
