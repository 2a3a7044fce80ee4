//! Error normalization middleware.
//!
//! Guarantees exactly one well-formed response per request. Errors returned
//! by inner stages and panics raised while running them both end up here.
//!
//! # Pipeline Position
//!
//! Error normalization is always the outermost stage:
//!
//! ```text
//! [ErrorNormalization] → user stages → endpoint
//! ```
//!
//! # Classification
//!
//! | Error                                  | Status | Body                                              |
//! |----------------------------------------|--------|---------------------------------------------------|
//! | `ApiError::FormValidation`             | 400    | `{"error_code":"form_validation","fields":{..}}`  |
//! | `ApiError::WithDescription`            | 400    | `{"error_code":..,"description":..}`              |
//! | `ApiError::Plain`                      | 400    | `{"error_code":..}`                               |
//! | `HandlerError::Bind`                   | 400    | `{"error_code":"bad_json","description":..}`      |
//! | anything else, including panics        | 500    | empty                                             |
//!
//! An `ApiError` wrapped inside an `anyhow::Error` is classified like the
//! bare value.

use crate::context::MiddlewareContext;
use crate::error::{HandlerError, HandlerResult};
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response, ResponseExt};
use futures_util::FutureExt;
use http::StatusCode;
use mooring_core::{codes, ApiError};
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Replaces the built-in classification when set.
///
/// Receives every error after `Bind` has been coerced to `bad_json`.
pub type ErrorHandler = Arc<dyn Fn(&MiddlewareContext, HandlerError) -> Response + Send + Sync>;

/// Converts errors and panics from the inner chain into responses.
#[derive(Clone, Default)]
pub struct ErrorNormalizationMiddleware {
    custom_handler: Option<ErrorHandler>,
}

impl fmt::Debug for ErrorNormalizationMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorNormalizationMiddleware")
            .field("custom_handler", &self.custom_handler.is_some())
            .finish()
    }
}

impl ErrorNormalizationMiddleware {
    /// Creates the stage with the built-in classification.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the stage with a custom error handler.
    #[must_use]
    pub fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(&MiddlewareContext, HandlerError) -> Response + Send + Sync + 'static,
    {
        Self {
            custom_handler: Some(Arc::new(handler)),
        }
    }

    /// Creates the stage from an optional, already shared handler.
    #[must_use]
    pub(crate) fn from_parts(custom_handler: Option<ErrorHandler>) -> Self {
        Self { custom_handler }
    }

    /// Turns an error into the response sent to the client.
    #[must_use]
    pub fn handle(&self, ctx: &MiddlewareContext, err: HandlerError) -> Response {
        let err = match err {
            HandlerError::Bind(message) => {
                HandlerError::Api(ApiError::with_description(codes::BAD_JSON, message))
            }
            other => other,
        };

        if let Some(handler) = &self.custom_handler {
            return handler(ctx, err);
        }

        if let Some(api_error) = err.api_error() {
            match api_error.to_response().to_json() {
                Ok(body) => return Response::json(api_error.status_code(), body),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize error response");
                    return Response::empty(StatusCode::INTERNAL_SERVER_ERROR);
                }
            }
        }

        tracing::error!(
            http.method = %ctx.method(),
            http.path = %ctx.path(),
            request_id = %ctx.request_id(),
            error = %err,
            "Error in http handler"
        );
        Response::empty(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl Middleware for ErrorNormalizationMiddleware {
    fn name(&self) -> &'static str {
        "error_normalization"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let outcome = AssertUnwindSafe(next.run(ctx, request)).catch_unwind().await;
            let err = match outcome {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(err)) => err,
                Err(payload) => HandlerError::Panic(panic_message(payload.as_ref())),
            };
            Ok(self.handle(ctx, err))
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context as _;
    use bytes::Bytes;
    use http_body_util::{BodyExt, Full};

    fn request() -> Request {
        http::Request::builder()
            .method("POST")
            .uri("/users")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    async fn run_with<F>(stage: &ErrorNormalizationMiddleware, handler: F) -> Response
    where
        F: FnOnce() -> HandlerResult + Send + 'static,
    {
        let mut ctx = MiddlewareContext::for_request(&request());
        let next = Next::handler(move |_ctx, _req| Box::pin(async move { handler() }));
        stage.process(&mut ctx, request(), next).await.unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let stage = ErrorNormalizationMiddleware::new();
        let response = run_with(&stage, || Ok(Response::empty(StatusCode::CREATED))).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_plain_error() {
        let stage = ErrorNormalizationMiddleware::new();
        let response = run_with(&stage, || Err(ApiError::plain("object_not_found").into())).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(http::header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "error_code": "object_not_found" })
        );
    }

    #[tokio::test]
    async fn test_described_error() {
        let stage = ErrorNormalizationMiddleware::new();
        let response = run_with(&stage, || {
            Err(ApiError::with_description("quota_exceeded", "limit is 10").into())
        })
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "error_code": "quota_exceeded", "description": "limit is 10" })
        );
    }

    #[tokio::test]
    async fn test_form_validation_error() {
        let stage = ErrorNormalizationMiddleware::new();
        let response = run_with(&stage, || {
            Err(ApiError::form_validation()
                .field("name", "required")
                .field("age", "not_numeric")
                .build()
                .into())
        })
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({
                "error_code": "form_validation",
                "fields": { "name": "required", "age": "not_numeric" }
            })
        );
    }

    #[tokio::test]
    async fn test_bind_error_becomes_bad_json() {
        let stage = ErrorNormalizationMiddleware::new();
        let response =
            run_with(&stage, || Err(HandlerError::Bind("unexpected end of body".into()))).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "error_code": "bad_json", "description": "unexpected end of body" })
        );
    }

    #[tokio::test]
    async fn test_wrapped_api_error_is_classified() {
        let stage = ErrorNormalizationMiddleware::new();
        let response = run_with(&stage, || {
            let inner: Result<(), ApiError> = Err(ApiError::plain("object_not_found"));
            Err(inner.context("loading user").unwrap_err().into())
        })
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "error_code": "object_not_found" })
        );
    }

    #[tokio::test]
    async fn test_unclassified_error_is_500_with_empty_body() {
        let stage = ErrorNormalizationMiddleware::new();
        let response = run_with(&stage, || Err(anyhow::anyhow!("connection refused").into())).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_panic_is_caught() {
        let stage = ErrorNormalizationMiddleware::new();
        let response = run_with(&stage, || panic!("index out of bounds")).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_custom_handler_receives_coerced_bind_error() {
        let stage = ErrorNormalizationMiddleware::with_handler(|_ctx, err| {
            let code = err
                .api_error()
                .map_or("none".to_string(), |e| e.code().to_string());
            let mut response = Response::empty(StatusCode::IM_A_TEAPOT);
            response
                .headers_mut()
                .insert("x-error-code", code.parse().unwrap());
            response
        });

        let response = run_with(&stage, || Err(HandlerError::Bind("eof".into()))).await;
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(response.headers().get("x-error-code").unwrap(), "bad_json");
    }

    #[tokio::test]
    async fn test_custom_handler_receives_panics() {
        let stage = ErrorNormalizationMiddleware::with_handler(|_ctx, err| {
            assert!(matches!(err, HandlerError::Panic(ref msg) if msg == "boom"));
            Response::empty(StatusCode::SERVICE_UNAVAILABLE)
        });

        let response = run_with(&stage, || panic!("boom")).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_panic_message_payloads() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");

        let payload: Box<dyn Any + Send> = Box::new(42_u32);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
