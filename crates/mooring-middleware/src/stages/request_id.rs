//! Request ID middleware.
//!
//! Propagates the `x-request-id` header when it carries a valid UUID and
//! generates a UUID v7 otherwise. The ID is stored in the context (and so
//! shows up in error logs), inserted into the request extensions for
//! endpoints, and echoed on every response, error responses included.

use crate::context::MiddlewareContext;
use crate::error::HandlerResult;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::Request;
use http::header::HeaderName;
use mooring_core::RequestId;

/// The header used for request ID propagation.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Middleware that assigns every request an ID.
///
/// # Example
///
/// ```
/// use mooring_middleware::{Pipeline, stages::RequestIdMiddleware};
///
/// let pipeline = Pipeline::builder().stage(RequestIdMiddleware::new()).build();
/// assert_eq!(pipeline.stage_names(), vec!["error_normalization", "request_id"]);
/// ```
#[derive(Debug, Clone)]
pub struct RequestIdMiddleware {
    trust_incoming: bool,
}

impl Default for RequestIdMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestIdMiddleware {
    /// Creates a stage that reuses valid incoming IDs.
    #[must_use]
    pub fn new() -> Self {
        Self { trust_incoming: true }
    }

    /// Creates a stage that ignores incoming IDs and always generates one.
    ///
    /// Use this at the edge, where clients should not pick their own IDs.
    #[must_use]
    pub fn generate_only() -> Self {
        Self { trust_incoming: false }
    }

    fn extract_request_id(&self, request: &Request) -> Option<RequestId> {
        if !self.trust_incoming {
            return None;
        }

        request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(RequestId::from_header)
    }
}

impl Middleware for RequestIdMiddleware {
    fn name(&self) -> &'static str {
        "request_id"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        mut request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let request_id = self
                .extract_request_id(&request)
                .unwrap_or_else(RequestId::new);

            ctx.set_request_id(request_id);
            request.extensions_mut().insert(request_id);
            ctx.append_response_header(
                HeaderName::from_static(REQUEST_ID_HEADER),
                request_id.to_header_value(),
            );

            next.run(ctx, request).await
        })
    }
}
