//! Common types used throughout the middleware pipeline.

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::Full;

/// The HTTP request type used in the middleware pipeline.
///
/// The body is fully buffered by the transport before the pipeline runs.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type used in the middleware pipeline.
pub type Response = http::Response<Full<Bytes>>;

/// Request extension set by the transport when the body could not be read.
///
/// The request reaches the pipeline with an empty body; the pipeline turns
/// this marker into a binding failure instead of invoking the endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyReadError(pub String);

/// Extension trait for building responses without fallible builders.
pub trait ResponseExt {
    /// Creates a response with the given status and an empty body.
    fn empty(status: StatusCode) -> Response;

    /// Creates an `application/json` response from pre-serialized bytes.
    fn json(status: StatusCode, body: impl Into<Bytes>) -> Response;
}

impl ResponseExt for Response {
    fn empty(status: StatusCode) -> Response {
        let mut response = http::Response::new(Full::new(Bytes::new()));
        *response.status_mut() = status;
        response
    }

    fn json(status: StatusCode, body: impl Into<Bytes>) -> Response {
        let mut response = http::Response::new(Full::new(body.into()));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }
}
