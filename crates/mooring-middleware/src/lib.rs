//! # Mooring Middleware
//!
//! Request pipeline for Mooring HTTP servers.
//!
//! Every pipeline starts with the error-normalization stage, which turns
//! whatever the rest of the chain produces into exactly one response:
//!
//! ```text
//! Request → ErrorNormalization → user stages → endpoint
//! ```
//!
//! | Outcome                       | Response                                   |
//! |-------------------------------|--------------------------------------------|
//! | `Ok(response)`                | returned unchanged                         |
//! | classified `ApiError`         | 400 with a JSON `error_code` body          |
//! | binding failure               | 400 `bad_json` with the decoder message    |
//! | anything else, panics         | logged, 500 with an empty body             |
//!
//! ## Example
//!
//! ```
//! use mooring_core::ApiError;
//! use mooring_middleware::{bind_json, HandlerResult, Pipeline, PipelineService, Request, Response, ResponseExt};
//! use mooring_middleware::stages::{CorsMiddleware, RequestIdMiddleware};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Signup {
//!     name: String,
//!     age: String,
//! }
//!
//! async fn signup(request: Request) -> HandlerResult {
//!     let form: Signup = bind_json(&request).await?;
//!
//!     let mut errors = ApiError::form_validation();
//!     if form.name.is_empty() {
//!         errors.push("name", "required");
//!     }
//!     if form.age.parse::<u8>().is_err() {
//!         errors.push("age", "not_numeric");
//!     }
//!     errors.into_result()?;
//!
//!     Ok(Response::empty(http::StatusCode::CREATED))
//! }
//!
//! let pipeline = Pipeline::builder()
//!     .stage(CorsMiddleware::permissive())
//!     .stage(RequestIdMiddleware::new())
//!     .build();
//! let service = PipelineService::new(pipeline, signup);
//! # let _ = service;
//! ```

pub mod context;
mod error;
mod extract;
pub mod middleware;
pub mod pipeline;
pub mod stages;
pub mod types;

pub use context::MiddlewareContext;
pub use error::{HandlerError, HandlerResult};
pub use extract::{auth_token, bind_json, bind_query, AUTH_TOKEN_QUERY_PARAM};
pub use middleware::{BoxFuture, FnMiddleware, Middleware, Next};
pub use pipeline::{BoxedMiddleware, Handler, Pipeline, PipelineBuilder, PipelineService, RequestHandler};
pub use types::{BodyReadError, Request, Response, ResponseExt};
