//! Per-request state shared by pipeline stages.

use std::time::{Duration, Instant};

use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Extensions, Method, Uri};
use mooring_core::RequestId;

use crate::types::{Request, Response};

/// State one request carries through the pipeline.
///
/// Stages may queue response headers here instead of touching the
/// response. The pipeline merges the queue into whatever response is
/// finally written, normalized error responses included.
///
/// Typed values shared between stages live in [`extensions`](Self::extensions):
///
/// ```
/// use mooring_middleware::context::MiddlewareContext;
///
/// #[derive(Clone)]
/// struct Tenant(&'static str);
///
/// let mut ctx = MiddlewareContext::new();
/// ctx.extensions_mut().insert(Tenant("acme"));
/// assert_eq!(ctx.extensions().get::<Tenant>().unwrap().0, "acme");
/// ```
#[derive(Debug)]
pub struct MiddlewareContext {
    request_id: RequestId,
    method: Method,
    uri: Uri,
    received_at: Instant,
    queued_headers: HeaderMap,
    extensions: Extensions,
}

impl MiddlewareContext {
    /// A context with a fresh ID for a `GET /` request.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: RequestId::new(),
            method: Method::GET,
            uri: Uri::default(),
            received_at: Instant::now(),
            queued_headers: HeaderMap::new(),
            extensions: Extensions::new(),
        }
    }

    /// A context carrying the method and URI of `request`.
    #[must_use]
    pub fn for_request(request: &Request) -> Self {
        Self {
            method: request.method().clone(),
            uri: request.uri().clone(),
            ..Self::new()
        }
    }

    /// The ID correlating this request's logs and response.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Replaces the generated ID, normally with one read from the request.
    pub fn set_request_id(&mut self, request_id: RequestId) {
        self.request_id = request_id;
    }

    /// The request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request URI, query string included.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// The URI path without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Time since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.received_at.elapsed()
    }

    /// Queues `name: value` for the outgoing response. Repeated names are
    /// kept, not replaced.
    pub fn append_response_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.queued_headers.append(name, value);
    }

    /// Headers queued so far.
    #[must_use]
    pub fn response_headers(&self) -> &HeaderMap {
        &self.queued_headers
    }

    /// Typed values stages share with each other.
    #[must_use]
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Mutable access to the shared typed values.
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Appends the queued headers after any the response already has.
    pub(crate) fn apply_response_headers(&self, response: &mut Response) {
        let headers = response.headers_mut();
        for (name, value) in &self.queued_headers {
            headers.append(name, value.clone());
        }
    }
}

impl Default for MiddlewareContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseExt;
    use bytes::Bytes;
    use http::header::VARY;
    use http::StatusCode;
    use http_body_util::Full;

    #[test]
    fn test_for_request_copies_metadata() {
        let request: Request = http::Request::builder()
            .method(Method::DELETE)
            .uri("/sessions/7?force=true")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let ctx = MiddlewareContext::for_request(&request);
        assert_eq!(ctx.method(), Method::DELETE);
        assert_eq!(ctx.path(), "/sessions/7");
        assert_eq!(ctx.uri().query(), Some("force=true"));
    }

    #[test]
    fn test_fresh_contexts_get_distinct_ids() {
        assert_ne!(MiddlewareContext::new().request_id(), MiddlewareContext::new().request_id());
    }

    #[test]
    fn test_queued_headers_follow_existing_ones() {
        let mut ctx = MiddlewareContext::new();
        ctx.append_response_header(VARY, HeaderValue::from_static("Origin"));

        let mut response = Response::empty(StatusCode::NO_CONTENT);
        response.headers_mut().insert(VARY, HeaderValue::from_static("Accept"));
        ctx.apply_response_headers(&mut response);

        let vary: Vec<_> = response.headers().get_all(VARY).iter().collect();
        assert_eq!(vary, vec!["Accept", "Origin"]);
    }
}
