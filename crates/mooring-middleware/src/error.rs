//! Errors travelling through the request pipeline.

use mooring_core::ApiError;
use thiserror::Error;

use crate::types::Response;

/// Outcome of a middleware stage or endpoint handler.
///
/// The first `Err` short-circuits the rest of the chain and is turned into a
/// response by the outermost error-normalization stage.
pub type HandlerResult = Result<Response, HandlerError>;

/// An error raised while handling a request.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// A classified error that maps to a 400 response.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The request could not be bound (body unreadable or undecodable).
    #[error("failed to bind request: {0}")]
    Bind(String),

    /// An unclassified failure. Classified errors wrapped inside are still
    /// recovered during normalization.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),

    /// A panic caught inside the chain, carrying the payload text.
    #[error("handler panicked: {0}")]
    Panic(String),
}

impl HandlerError {
    /// Returns the classified error carried by this value, if any.
    #[must_use]
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) => Some(err),
            Self::Internal(err) => ApiError::find_in(err),
            Self::Bind(_) | Self::Panic(_) => None,
        }
    }
}
