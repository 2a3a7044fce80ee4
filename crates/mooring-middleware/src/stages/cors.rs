//! CORS (Cross-Origin Resource Sharing) middleware.
//!
//! Browser-facing services ship with a single fixed policy, see
//! [`CorsMiddleware::permissive`]:
//!
//! - every origin is allowed and reflected back (a literal `*` is not valid
//!   together with credentials);
//! - credentials are allowed;
//! - methods: GET, HEAD, POST, PUT, PATCH, DELETE, CONNECT, OPTIONS, TRACE;
//! - any request header is allowed (the requested headers are reflected);
//! - preflight results may be cached for seven days.
//!
//! Preflight requests are answered with `204 No Content` without reaching
//! the endpoint. Headers for actual requests are queued on the context so
//! they are also present on normalized error responses.

use crate::context::MiddlewareContext;
use crate::error::HandlerResult;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response, ResponseExt};
use http::header::{self, HeaderValue};
use http::{Method, StatusCode};
use std::time::Duration;

/// Methods allowed by the permissive policy.
const PERMISSIVE_METHODS: [Method; 9] = [
    Method::GET,
    Method::HEAD,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::CONNECT,
    Method::OPTIONS,
    Method::TRACE,
];

/// Preflight cache duration of the permissive policy.
const PERMISSIVE_MAX_AGE: Duration = Duration::from_secs(604_800);

/// CORS policy.
#[derive(Debug, Clone)]
pub struct CorsConfig {
    allowed_methods: Vec<Method>,
    allow_credentials: bool,
    max_age: Option<Duration>,
}

impl CorsConfig {
    /// Returns whether `method` may be used in a cross-origin request.
    #[must_use]
    pub fn allows_method(&self, method: &Method) -> bool {
        self.allowed_methods.contains(method)
    }

    /// Returns the preflight cache duration.
    #[must_use]
    pub fn max_age(&self) -> Option<Duration> {
        self.max_age
    }
}

/// CORS middleware that answers preflight requests and decorates responses.
#[derive(Debug, Clone)]
pub struct CorsMiddleware {
    config: CorsConfig,
}

impl CorsMiddleware {
    /// Creates the stage with the permissive policy described in the module
    /// documentation.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            config: CorsConfig {
                allowed_methods: PERMISSIVE_METHODS.to_vec(),
                allow_credentials: true,
                max_age: Some(PERMISSIVE_MAX_AGE),
            },
        }
    }

    /// Returns the policy.
    #[must_use]
    pub fn config(&self) -> &CorsConfig {
        &self.config
    }

    fn is_preflight(request: &Request) -> bool {
        request.method() == Method::OPTIONS
            && request
                .headers()
                .contains_key(header::ACCESS_CONTROL_REQUEST_METHOD)
    }

    fn handle_preflight(&self, request: &Request, origin: &HeaderValue) -> Response {
        let mut response = Response::empty(StatusCode::NO_CONTENT);
        let headers = response.headers_mut();
        headers.append(header::VARY, HeaderValue::from_static("Origin"));
        headers.append(
            header::VARY,
            HeaderValue::from_static("Access-Control-Request-Method"),
        );
        headers.append(
            header::VARY,
            HeaderValue::from_static("Access-Control-Request-Headers"),
        );

        let requested_method = request
            .headers()
            .get(header::ACCESS_CONTROL_REQUEST_METHOD)
            .and_then(|v| v.to_str().ok())
            .and_then(|m| Method::from_bytes(m.to_ascii_uppercase().as_bytes()).ok());

        let Some(method) = requested_method.filter(|m| self.config.allows_method(m)) else {
            tracing::debug!(origin = ?origin, "Preflight aborted: method not allowed");
            return response;
        };

        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
        if let Ok(value) = HeaderValue::from_str(method.as_str()) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, value);
        }
        if let Some(requested) = request.headers().get(header::ACCESS_CONTROL_REQUEST_HEADERS) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, requested.clone());
        }
        if self.config.allow_credentials {
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
        if let Some(max_age) = self.config.max_age {
            headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from(max_age.as_secs()));
        }

        response
    }

    fn queue_actual_headers(&self, ctx: &mut MiddlewareContext, method: &Method, origin: HeaderValue) {
        ctx.append_response_header(header::VARY, HeaderValue::from_static("Origin"));
        if !self.config.allows_method(method) {
            return;
        }

        ctx.append_response_header(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        if self.config.allow_credentials {
            ctx.append_response_header(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
    }
}

impl Middleware for CorsMiddleware {
    fn name(&self) -> &'static str {
        "cors"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let Some(origin) = request.headers().get(header::ORIGIN).cloned() else {
                return next.run(ctx, request).await;
            };

            if Self::is_preflight(&request) {
                return Ok(self.handle_preflight(&request, &origin));
            }

            self.queue_actual_headers(ctx, &request.method().clone(), origin);
            next.run(ctx, request).await
        })
    }
}
