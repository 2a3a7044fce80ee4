//! Middleware pipeline.
//!
//! User stages run in the order they were added. The error-normalization
//! stage is always installed in front of them and cannot be removed or
//! moved, so every error and panic raised further in surfaces there exactly
//! once.
//!
//! ```text
//! Request → ErrorNormalization → stage 1 → … → stage n → endpoint
//!                   ↓
//! Response ← queued response headers merged
//! ```

use crate::context::MiddlewareContext;
use crate::error::{HandlerError, HandlerResult};
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::stages::error_normalization::{ErrorHandler, ErrorNormalizationMiddleware};
use crate::types::{BodyReadError, Request, Response};
use std::future::Future;
use std::sync::Arc;

/// A type-erased middleware that can be stored in a vector.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// An endpoint invoked at the end of the pipeline.
///
/// Implemented for every `Fn(Request) -> impl Future<Output = HandlerResult>`.
pub trait Handler: Send + Sync + 'static {
    /// Handles the request.
    fn call(&self, request: Request) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, request: Request) -> BoxFuture<'static, HandlerResult> {
        Box::pin(self(request))
    }
}

/// Turns a buffered request into a response.
///
/// This is the seam between the HTTP transport and the pipeline. The
/// returned response is final: errors have already been normalized.
pub trait RequestHandler: Send + Sync + 'static {
    /// Handles the request.
    fn handle(&self, request: Request) -> BoxFuture<'_, Response>;
}

/// The request pipeline.
///
/// # Example
///
/// ```
/// use mooring_middleware::{Pipeline, stages::{CorsMiddleware, RequestIdMiddleware}};
///
/// let pipeline = Pipeline::builder()
///     .stage(CorsMiddleware::permissive())
///     .stage(RequestIdMiddleware::new())
///     .build();
///
/// assert_eq!(
///     pipeline.stage_names(),
///     vec!["error_normalization", "cors", "request_id"]
/// );
/// ```
pub struct Pipeline {
    error_normalization: ErrorNormalizationMiddleware,
    stages: Vec<BoxedMiddleware>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Pipeline {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Runs a request through every stage and the handler.
    ///
    /// Always yields a response. Headers queued on the context by stages
    /// are appended to it.
    pub async fn process<'a, H>(
        &'a self,
        mut ctx: MiddlewareContext,
        request: Request,
        handler: H,
    ) -> Response
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, HandlerResult> + Send + 'a,
    {
        let next = self.build_chain(handler);
        let mut response = match next.run(&mut ctx, request).await {
            Ok(response) => response,
            Err(err) => self.error_normalization.handle(&ctx, err),
        };
        ctx.apply_response_headers(&mut response);
        response
    }

    fn build_chain<'a, H>(&'a self, handler: H) -> Next<'a>
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, HandlerResult> + Send + 'a,
    {
        let mut next = Next::handler(
            move |ctx: &mut MiddlewareContext, request: Request| -> BoxFuture<'static, HandlerResult> {
                if let Some(BodyReadError(message)) = request.extensions().get::<BodyReadError>() {
                    let err = HandlerError::Bind(message.clone());
                    return Box::pin(async move { Err(err) });
                }
                handler(ctx, request)
            },
        );

        for middleware in self.stages.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }

        Next::new(&self.error_normalization, next)
    }

    /// Returns the names of all stages in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        std::iter::once(self.error_normalization.name())
            .chain(self.stages.iter().map(|mw| mw.name()))
            .collect()
    }

    /// Returns the number of stages, error normalization included.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len() + 1
    }
}

/// Builder for constructing a [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<BoxedMiddleware>,
    error_handler: Option<ErrorHandler>,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage.
    #[must_use]
    pub fn stage<M: Middleware>(mut self, middleware: M) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Appends an already shared stage.
    #[must_use]
    pub fn shared_stage(mut self, middleware: BoxedMiddleware) -> Self {
        self.stages.push(middleware);
        self
    }

    /// Replaces the built-in error classification.
    ///
    /// Binding failures are coerced to `bad_json` before the handler sees
    /// them; panics arrive as [`HandlerError::Panic`].
    #[must_use]
    pub fn error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&MiddlewareContext, HandlerError) -> Response + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            error_normalization: ErrorNormalizationMiddleware::from_parts(self.error_handler),
            stages: self.stages,
        }
    }
}

/// A [`Pipeline`] bound to an endpoint [`Handler`].
///
/// # Example
///
/// ```
/// use mooring_middleware::{HandlerError, Pipeline, PipelineService, Request, Response, ResponseExt};
///
/// let service = PipelineService::new(Pipeline::default(), |_req: Request| async {
///     Ok::<_, HandlerError>(Response::empty(http::StatusCode::NO_CONTENT))
/// });
/// # let _ = service;
/// ```
pub struct PipelineService<H> {
    pipeline: Pipeline,
    handler: H,
}

impl<H: Handler> PipelineService<H> {
    /// Pairs a pipeline with an endpoint.
    pub fn new(pipeline: Pipeline, handler: H) -> Self {
        Self { pipeline, handler }
    }

    /// Returns the pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

impl<H: Handler> RequestHandler for PipelineService<H> {
    fn handle(&self, request: Request) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let ctx = MiddlewareContext::for_request(&request);
            self.pipeline
                .process(ctx, request, |_ctx, req| self.handler.call(req))
                .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::FnMiddleware;
    use crate::types::ResponseExt;
    use bytes::Bytes;
    use http::header::HeaderValue;
    use http::StatusCode;
    use http_body_util::{BodyExt, Full};
    use mooring_core::ApiError;

    fn request() -> Request {
        http::Request::builder()
            .uri("/items")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[test]
    fn test_error_normalization_is_always_first() {
        let pipeline = Pipeline::default();
        assert_eq!(pipeline.stage_names(), vec!["error_normalization"]);
        assert_eq!(pipeline.stage_count(), 1);
    }

    #[tokio::test]
    async fn test_process_success() {
        let pipeline = Pipeline::default();
        let response = pipeline
            .process(MiddlewareContext::new(), request(), |_ctx, _req| {
                Box::pin(async { Ok(Response::empty(StatusCode::ACCEPTED)) })
            })
            .await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_stage_error_skips_handler() {
        let pipeline = Pipeline::builder()
            .stage(FnMiddleware::new("deny", |_ctx, _req, _next| {
                Box::pin(async { Err(HandlerError::from(ApiError::plain("forbidden"))) })
            }))
            .build();

        let response = pipeline
            .process(MiddlewareContext::new(), request(), |_ctx, _req| {
                Box::pin(async { Ok(Response::empty(StatusCode::OK)) })
            })
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"error_code":"forbidden"}"#);
    }

    #[tokio::test]
    async fn test_body_read_error_becomes_bad_json() {
        let pipeline = Pipeline::default();
        let mut req = request();
        req.extensions_mut()
            .insert(BodyReadError("connection reset".to_string()));

        let response = pipeline
            .process(MiddlewareContext::new(), req, |_ctx, _req| {
                Box::pin(async { Ok(Response::empty(StatusCode::OK)) })
            })
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(
            &body[..],
            br#"{"error_code":"bad_json","description":"connection reset"}"#
        );
    }

    #[tokio::test]
    async fn test_queued_headers_reach_error_responses() {
        let pipeline = Pipeline::builder()
            .stage(FnMiddleware::new("tag", |ctx, req, next| {
                ctx.append_response_header(
                    http::header::HeaderName::from_static("x-tag"),
                    HeaderValue::from_static("1"),
                );
                next.run_boxed(ctx, req)
            }))
            .build();

        let response = pipeline
            .process(MiddlewareContext::new(), request(), |_ctx, _req| {
                Box::pin(async { Err(HandlerError::from(anyhow::anyhow!("boom"))) })
            })
            .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers().get("x-tag").unwrap(), "1");
    }

    #[tokio::test]
    async fn test_builder_error_handler() {
        let pipeline = Pipeline::builder()
            .error_handler(|_ctx, _err| Response::empty(StatusCode::BAD_GATEWAY))
            .build();

        let response = pipeline
            .process(MiddlewareContext::new(), request(), |_ctx, _req| {
                Box::pin(async { Err(HandlerError::from(ApiError::plain("x"))) })
            })
            .await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_pipeline_service() {
        let service = PipelineService::new(Pipeline::default(), |req: Request| async move {
            assert_eq!(req.uri().path(), "/items");
            Ok(Response::empty(StatusCode::OK))
        });

        let response = service.handle(request()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
