//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use gym_core::{Conflict, Error as CoreError};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// The request carried no usable caller identity, or bad credentials.
  #[error("unauthorized")]
  Unauthorized,

  #[error(transparent)]
  Core(#[from] CoreError),
}

impl ApiError {
  /// Wrap a store failure as an internal error.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Core(CoreError::internal(e))
  }

  pub fn invalid(message: impl Into<String>) -> Self {
    Self::Core(CoreError::InvalidInput(message.into()))
  }
}

impl From<Conflict> for ApiError {
  fn from(c: Conflict) -> Self { Self::Core(CoreError::Conflict(c)) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, body) = match &self {
      ApiError::Unauthorized => {
        (StatusCode::UNAUTHORIZED, json!({ "error": self.to_string() }))
      }
      ApiError::Core(CoreError::InvalidInput(_)) => {
        (StatusCode::BAD_REQUEST, json!({ "error": self.to_string() }))
      }
      ApiError::Core(
        CoreError::NotFound(..) | CoreError::NoActiveEnrollment { .. },
      ) => (StatusCode::NOT_FOUND, json!({ "error": self.to_string() })),
      ApiError::Core(CoreError::Conflict(c)) => (
        StatusCode::CONFLICT,
        json!({ "error": c.to_string(), "code": c }),
      ),
      ApiError::Core(CoreError::Forbidden) => {
        (StatusCode::FORBIDDEN, json!({ "error": self.to_string() }))
      }
      ApiError::Core(CoreError::Internal(e)) => {
        tracing::error!(error = %e, "internal error while handling request");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          json!({ "error": "internal server error" }),
        )
      }
    };
    (status, Json(body)).into_response()
  }
}
