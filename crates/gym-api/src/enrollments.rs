//! Handlers for enrollment endpoints. All of them go through
//! [`gym_core::service::EnrollmentService`].
//!
//! | Method   | Path                     | Notes |
//! |----------|--------------------------|-------|
//! | `POST`   | `/enrollments`           | Body: `{"user_id":1,"activity_id":2}`. `X-User-Id` must match `user_id` unless admin |
//! | `GET`    | `/enrollments/active`    | `?user_id=&activity_id=` |
//! | `GET`    | `/enrollments/:id`       | 404 if not found |
//! | `DELETE` | `/enrollments/:id`       | Cancels on behalf of `X-User-Id` |
//! | `GET`    | `/users/:id/enrollments` | Active enrollments only |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use gym_core::{Error as CoreError, enrollment::EnrollmentDetail, store::GymStore};
use serde::Deserialize;

use crate::{
  AppState,
  caller::{Caller, caller_id},
  error::ApiError,
};

#[derive(Debug, Deserialize)]
pub struct PairBody {
  pub user_id:     i64,
  pub activity_id: i64,
}

/// `POST /enrollments`
///
/// Members enroll themselves; admins may enroll anyone.
pub async fn enroll<S: GymStore>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Json(body): Json<PairBody>,
) -> Result<impl IntoResponse, ApiError> {
  if caller.user_id != body.user_id && !caller.is_admin {
    return Err(CoreError::Forbidden.into());
  }
  let detail = state
    .enrollments
    .enroll(body.user_id, body.activity_id)
    .await?;
  Ok((StatusCode::CREATED, Json(detail)))
}

/// `GET /enrollments/:id`
pub async fn get_one<S: GymStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
) -> Result<Json<EnrollmentDetail>, ApiError> {
  Ok(Json(state.enrollments.get(id).await?))
}

/// `GET /enrollments/active?user_id=&activity_id=`
pub async fn get_active<S: GymStore>(
  State(state): State<AppState<S>>,
  Query(pair): Query<PairBody>,
) -> Result<Json<EnrollmentDetail>, ApiError> {
  let detail = state
    .enrollments
    .get_active(pair.user_id, pair.activity_id)
    .await?;
  Ok(Json(detail))
}

/// `GET /users/:id/enrollments`
pub async fn list_for_user<S: GymStore>(
  State(state): State<AppState<S>>,
  Path(user_id): Path<i64>,
) -> Result<Json<Vec<EnrollmentDetail>>, ApiError> {
  Ok(Json(state.enrollments.list_active_for_user(user_id).await?))
}

/// `DELETE /enrollments/:id`
///
/// The caller id is taken from the header as-is; the service decides
/// ownership, so a stranger sees the same 404 as for a missing enrollment.
pub async fn cancel<S: GymStore>(
  State(state): State<AppState<S>>,
  headers: axum::http::HeaderMap,
  Path(id): Path<i64>,
) -> Result<Json<EnrollmentDetail>, ApiError> {
  let requesting_user_id = caller_id(&headers)?;
  let detail = state.enrollments.cancel(id, requesting_user_id).await?;
  Ok(Json(detail))
}
