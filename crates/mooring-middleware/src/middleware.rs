//! Core middleware trait and types.
//!
//! A stage receives the mutable context, the request and a [`Next`] that
//! runs the rest of the chain. Stages return a [`HandlerResult`]: the first
//! `Err` skips everything downstream of it and travels back up unchanged
//! until the error-normalization stage turns it into a response.
//!
//! # Example
//!
//! ```
//! use mooring_middleware::{BoxFuture, HandlerResult, Middleware, MiddlewareContext, Next, Request};
//!
//! struct TimingMiddleware;
//!
//! impl Middleware for TimingMiddleware {
//!     fn name(&self) -> &'static str {
//!         "timing"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut MiddlewareContext,
//!         request: Request,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, HandlerResult> {
//!         Box::pin(async move {
//!             let result = next.run(ctx, request).await;
//!             tracing::debug!(elapsed_ms = ctx.elapsed().as_millis() as u64, "request finished");
//!             result
//!         })
//!     }
//! }
//! ```

use crate::context::MiddlewareContext;
use crate::error::HandlerResult;
use crate::types::Request;
use std::future::Future;
use std::pin::Pin;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The terminal step of a chain: invokes the endpoint.
type Terminal<'a> =
    Box<dyn FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, HandlerResult> + Send + 'a>;

/// A stage of the request pipeline.
///
/// # Invariants
///
/// - A stage calls `next.run()` at most once; not calling it short-circuits
///   the chain with the stage's own result.
/// - A stage does not swallow an `Err` it did not produce.
pub trait Middleware: Send + Sync + 'static {
    /// Returns the name of this stage, used in logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Processes the request, usually by delegating to `next`.
    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult>;
}

/// The remainder of the chain after the current stage.
///
/// Consumed by [`Next::run`], so it cannot be invoked twice.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    Handler(Terminal<'a>),
}

impl<'a> Next<'a> {
    /// Creates a `Next` that runs `middleware` before `next`.
    pub(crate) fn new(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Creates a terminal `Next` that invokes the endpoint.
    pub(crate) fn handler<F>(f: F) -> Self
    where
        F: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, HandlerResult> + Send + 'a,
    {
        Self {
            inner: NextInner::Handler(Box::new(f)),
        }
    }

    /// Runs the next stage, or the endpoint at the end of the chain.
    pub async fn run(self, ctx: &mut MiddlewareContext, request: Request) -> HandlerResult {
        match self.inner {
            NextInner::Chain { middleware, next } => middleware.process(ctx, request, *next).await,
            NextInner::Handler(handler) => handler(ctx, request).await,
        }
    }

    /// Boxed form of [`Next::run`] for closures that must name the future type.
    pub fn run_boxed(self, ctx: &'a mut MiddlewareContext, request: Request) -> BoxFuture<'a, HandlerResult> {
        Box::pin(self.run(ctx, request))
    }
}

/// A stage built from a closure.
///
/// # Example
///
/// ```
/// use mooring_middleware::FnMiddleware;
///
/// let stage = FnMiddleware::new("tag", |ctx, mut req, next| {
///     req.headers_mut().insert("x-tagged", http::HeaderValue::from_static("1"));
///     next.run_boxed(ctx, req)
/// });
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut MiddlewareContext, Request, Next<'a>) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync
        + 'static,
{
    /// Creates a new function-based stage.
    pub fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut MiddlewareContext, Request, Next<'a>) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync
        + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        (self.func)(ctx, request, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use crate::types::{Response, ResponseExt};
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::Full;
    use mooring_core::ApiError;

    #[derive(Debug, Clone, Default)]
    struct Visited(Vec<&'static str>);

    struct RecordingMiddleware {
        name: &'static str,
    }

    impl Middleware for RecordingMiddleware {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut MiddlewareContext,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, HandlerResult> {
            Box::pin(async move {
                let mut visited = ctx.extensions_mut().remove::<Visited>().unwrap_or_default();
                visited.0.push(self.name);
                ctx.extensions_mut().insert(visited);
                next.run(ctx, request).await
            })
        }
    }

    fn request() -> Request {
        http::Request::builder()
            .uri("/test")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn ok_handler() -> Next<'static> {
        Next::handler(|_ctx, _req| Box::pin(async { Ok(Response::empty(StatusCode::OK)) }))
    }

    #[tokio::test]
    async fn test_next_handler() {
        let mut ctx = MiddlewareContext::new();
        let response = ok_handler().run(&mut ctx, request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_middleware_chain_order() {
        let first = RecordingMiddleware { name: "first" };
        let second = RecordingMiddleware { name: "second" };

        let mut ctx = MiddlewareContext::new();
        let chain = Next::new(&first, Next::new(&second, ok_handler()));

        let response = chain.run(&mut ctx, request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(ctx.extensions().get::<Visited>().unwrap().0, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_error_propagates_unchanged() {
        let first = RecordingMiddleware { name: "first" };
        let mut ctx = MiddlewareContext::new();
        let chain = Next::new(
            &first,
            Next::handler(|_ctx, _req| {
                Box::pin(async { Err(HandlerError::from(ApiError::plain("object_not_found"))) })
            }),
        );

        let err = chain.run(&mut ctx, request()).await.unwrap_err();
        assert!(matches!(err, HandlerError::Api(ApiError::Plain(_))));
    }

    #[tokio::test]
    async fn test_fn_middleware() {
        let stage = FnMiddleware::new("tag", |ctx, mut req, next| {
            req.headers_mut()
                .insert("x-tagged", http::HeaderValue::from_static("1"));
            next.run_boxed(ctx, req)
        });
        assert_eq!(stage.name(), "tag");

        let mut ctx = MiddlewareContext::new();
        let chain = Next::new(
            &stage,
            Next::handler(|_ctx, req: Request| {
                let tagged = req.headers().contains_key("x-tagged");
                Box::pin(async move {
                    assert!(tagged);
                    Ok(Response::empty(StatusCode::NO_CONTENT))
                })
            }),
        );

        let response = chain.run(&mut ctx, request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
