//! Caller identity extractors.
//!
//! The caller is named by the `X-User-Id` header. Verifying that the header
//! is genuine is left to whatever sits in front of this router.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, request::Parts},
};
use gym_core::{Error as CoreError, store::GymStore, user::User};

use crate::{AppState, error::ApiError};

pub const USER_ID_HEADER: &str = "x-user-id";

/// The user making the request.
pub struct Caller(pub User);

/// A caller with the admin flag set.
pub struct Admin(pub User);

/// Parse the caller id from `headers`.
pub fn caller_id(headers: &HeaderMap) -> Result<i64, ApiError> {
  headers
    .get(USER_ID_HEADER)
    .and_then(|v| v.to_str().ok())
    .and_then(|s| s.trim().parse::<i64>().ok())
    .filter(|id| *id > 0)
    .ok_or(ApiError::Unauthorized)
}

impl<S> FromRequestParts<AppState<S>> for Caller
where
  S: GymStore,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let id = caller_id(&parts.headers)?;
    let user = state
      .store
      .get_user(id)
      .await
      .map_err(ApiError::store)?
      .ok_or(ApiError::Unauthorized)?;
    Ok(Caller(user))
  }
}

impl<S> FromRequestParts<AppState<S>> for Admin
where
  S: GymStore,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let Caller(user) = Caller::from_request_parts(parts, state).await?;
    if !user.is_admin {
      tracing::debug!(user_id = user.user_id, "admin route refused");
      return Err(CoreError::Forbidden.into());
    }
    Ok(Admin(user))
  }
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  fn headers(value: &'static str) -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(USER_ID_HEADER, HeaderValue::from_static(value));
    h
  }

  #[test]
  fn parses_positive_ids() {
    assert_eq!(caller_id(&headers("42")).unwrap(), 42);
    assert_eq!(caller_id(&headers(" 7 ")).unwrap(), 7);
  }

  #[test]
  fn rejects_missing_or_bogus_ids() {
    assert!(caller_id(&HeaderMap::new()).is_err());
    assert!(caller_id(&headers("abc")).is_err());
    assert!(caller_id(&headers("0")).is_err());
    assert!(caller_id(&headers("-3")).is_err());
  }
}
