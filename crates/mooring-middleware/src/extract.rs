//! Request binding helpers.
//!
//! Binding never writes a response. A failure comes back as an [`ApiError`]
//! that the endpoint returns with `?`; the error-normalization stage renders
//! it as a 400.
//!
//! ```
//! use mooring_middleware::{bind_json, HandlerResult, Request, Response, ResponseExt};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct CreateUser {
//!     name: String,
//! }
//!
//! async fn create_user(request: Request) -> HandlerResult {
//!     let body: CreateUser = bind_json(&request).await?;
//!     tracing::info!(name = %body.name, "creating user");
//!     Ok(Response::empty(http::StatusCode::CREATED))
//! }
//! ```

use crate::types::Request;
use http::header::AUTHORIZATION;
use http_body_util::BodyExt;
use mooring_core::{codes, ApiError};
use serde::de::DeserializeOwned;

const BEARER_PREFIX: &str = "Bearer ";

/// Query parameter consulted when no `Authorization` header is sent.
pub const AUTH_TOKEN_QUERY_PARAM: &str = "auth_token";

/// Decodes the JSON request body.
///
/// # Errors
///
/// Returns `bad_json` with the decoder message when the body is not valid
/// JSON for `T`, including an empty body.
pub async fn bind_json<T: DeserializeOwned>(request: &Request) -> Result<T, ApiError> {
    let body = request
        .body()
        .clone()
        .collect()
        .await
        .map(http_body_util::Collected::to_bytes)
        .unwrap_or_default();

    serde_json::from_slice(&body)
        .map_err(|e| ApiError::with_description(codes::BAD_JSON, e.to_string()))
}

/// Decodes the query string.
///
/// A request without a query string decodes like an empty one.
///
/// # Errors
///
/// Returns `bad_query_params` with the decoder message when the query does
/// not match `T`.
pub fn bind_query<T: DeserializeOwned>(request: &Request) -> Result<T, ApiError> {
    serde_urlencoded::from_str(request.uri().query().unwrap_or_default())
        .map_err(|e| ApiError::with_description(codes::BAD_QUERY_PARAMS, e.to_string()))
}

/// Returns the caller's auth token.
///
/// The `Authorization` header wins; a `Bearer ` prefix is stripped and any
/// other scheme is returned verbatim. Without the header the `auth_token`
/// query parameter is used. Empty values count as absent.
#[must_use]
pub fn auth_token(request: &Request) -> Option<String> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());

    let token = match header {
        Some(value) => value.strip_prefix(BEARER_PREFIX).unwrap_or(value).to_string(),
        None => request
            .uri()
            .query()
            .and_then(|q| {
                serde_urlencoded::from_str::<Vec<(String, String)>>(q)
                    .ok()?
                    .into_iter()
                    .find(|(key, _)| key == AUTH_TOKEN_QUERY_PARAM)
                    .map(|(_, value)| value)
            })
            .unwrap_or_default(),
    };

    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body_util::Full;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        name: String,
        age: u32,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Page {
        page: u32,
        #[serde(default)]
        q: Option<String>,
    }

    fn request(uri: &str, body: &'static str) -> Request {
        http::Request::builder()
            .uri(uri)
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap()
    }

    #[tokio::test]
    async fn test_bind_json() {
        let user: User = bind_json(&request("/", r#"{"name":"ada","age":36}"#)).await.unwrap();
        assert_eq!(user, User { name: "ada".into(), age: 36 });
    }

    #[tokio::test]
    async fn test_bind_json_malformed() {
        let err = bind_json::<User>(&request("/", r#"{"name":"#)).await.unwrap_err();
        assert_eq!(err.code(), &codes::BAD_JSON);
        assert!(err.description().unwrap().contains("EOF"));
    }

    #[tokio::test]
    async fn test_bind_json_empty_body() {
        let err = bind_json::<User>(&request("/", "")).await.unwrap_err();
        assert_eq!(err.code(), &codes::BAD_JSON);
    }

    #[test]
    fn test_bind_query() {
        let page: Page = bind_query(&request("/users?page=2&q=ada", "")).unwrap();
        assert_eq!(page, Page { page: 2, q: Some("ada".into()) });
    }

    #[test]
    fn test_bind_query_invalid() {
        let err = bind_query::<Page>(&request("/users?page=two", "")).unwrap_err();
        assert_eq!(err.code(), &codes::BAD_QUERY_PARAMS);
        assert!(err.description().is_some());

        let err = bind_query::<Page>(&request("/users", "")).unwrap_err();
        assert_eq!(err.code(), &codes::BAD_QUERY_PARAMS);
    }

    #[test]
    fn test_auth_token_from_bearer_header() {
        let req = http::Request::builder()
            .uri("/?auth_token=from-query")
            .header(AUTHORIZATION, "Bearer abc.def")
            .body(Full::new(Bytes::new()))
            .unwrap();
        assert_eq!(auth_token(&req).as_deref(), Some("abc.def"));
    }

    #[test]
    fn test_auth_token_other_scheme_verbatim() {
        let req = http::Request::builder()
            .uri("/")
            .header(AUTHORIZATION, "Basic dXNlcjpwdw==")
            .body(Full::new(Bytes::new()))
            .unwrap();
        assert_eq!(auth_token(&req).as_deref(), Some("Basic dXNlcjpwdw=="));
    }

    #[test]
    fn test_auth_token_from_query() {
        let req = request("/stream?foo=1&auth_token=t%2B1", "");
        assert_eq!(auth_token(&req).as_deref(), Some("t+1"));
    }

    #[test]
    fn test_auth_token_missing() {
        assert_eq!(auth_token(&request("/", "")), None);
        assert_eq!(auth_token(&request("/?auth_token=", "")), None);
    }
}
