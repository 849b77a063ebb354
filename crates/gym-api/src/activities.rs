//! Handlers for `/activities` endpoints.
//!
//! | Method   | Path                    | Notes |
//! |----------|-------------------------|-------|
//! | `GET`    | `/activities`           | `?category=&instructor=&day=Mon&available=true&name=` |
//! | `POST`   | `/activities`           | Admin only |
//! | `GET`    | `/activities/:id`       | 404 if not found |
//! | `PUT`    | `/activities/:id`       | Admin only, partial update. 409 if capacity drops below active enrollments |
//! | `DELETE` | `/activities/:id`       | Admin only. 409 while enrollments reference it |
//! | `PUT`    | `/activities/:id/seats` | Admin only. Body: `{"seats_available": n}`. 409 above capacity minus active enrollments |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Weekday;
use gym_core::{
  Entity, Error as CoreError,
  activity::{Activity, ActivityQuery, ActivityUpdate, NewActivity},
  error::require_id,
  store::GymStore,
};
use serde::Deserialize;

use crate::{AppState, caller::Admin, error::ApiError};

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub category:   Option<String>,
  pub instructor: Option<String>,
  pub day:        Option<Weekday>,
  pub available:  Option<bool>,
  pub name:       Option<String>,
}

impl From<ListParams> for ActivityQuery {
  fn from(p: ListParams) -> Self {
    let non_blank = |s: Option<String>| s.filter(|s| !s.trim().is_empty());
    ActivityQuery {
      category:       non_blank(p.category),
      instructor:     non_blank(p.instructor),
      day:            p.day,
      available_only: p.available.unwrap_or(false),
      name:           non_blank(p.name),
    }
  }
}

/// `GET /activities`
pub async fn list<S: GymStore>(
  State(state): State<AppState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Activity>>, ApiError> {
  let query = ActivityQuery::from(params);
  let activities = state
    .store
    .list_activities(&query)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(activities))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /activities`
pub async fn create<S: GymStore>(
  State(state): State<AppState<S>>,
  _admin: Admin,
  Json(input): Json<NewActivity>,
) -> Result<impl IntoResponse, ApiError> {
  input.validate()?;
  let activity = state
    .store
    .create_activity(input)
    .await
    .map_err(ApiError::store)??;
  tracing::info!(
    activity_id = activity.activity_id,
    capacity = activity.capacity,
    "activity created"
  );
  Ok((StatusCode::CREATED, Json(activity)))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /activities/:id`
pub async fn get_one<S: GymStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
) -> Result<Json<Activity>, ApiError> {
  require_id(Entity::Activity, id)?;
  let activity = state
    .store
    .get_activity(id)
    .await
    .map_err(ApiError::store)?
    .ok_or(CoreError::NotFound(Entity::Activity, id))?;
  Ok(Json(activity))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PUT /activities/:id`
pub async fn update<S: GymStore>(
  State(state): State<AppState<S>>,
  _admin: Admin,
  Path(id): Path<i64>,
  Json(update): Json<ActivityUpdate>,
) -> Result<Json<Activity>, ApiError> {
  require_id(Entity::Activity, id)?;
  update.validate()?;
  let activity = state
    .store
    .update_activity(id, update)
    .await
    .map_err(ApiError::store)?
    .ok_or(CoreError::NotFound(Entity::Activity, id))??;
  Ok(Json(activity))
}

// ─── Seats ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SeatsBody {
  pub seats_available: i64,
}

/// `PUT /activities/:id/seats`
///
/// The bound against capacity and active enrollments is enforced by the
/// store in the same transaction as the write.
pub async fn set_seats<S: GymStore>(
  State(state): State<AppState<S>>,
  _admin: Admin,
  Path(id): Path<i64>,
  Json(body): Json<SeatsBody>,
) -> Result<Json<Activity>, ApiError> {
  require_id(Entity::Activity, id)?;
  let seats = u32::try_from(body.seats_available)
    .map_err(|_| ApiError::invalid("seats_available cannot be negative"))?;

  let activity = state
    .store
    .set_seats_available(id, seats)
    .await
    .map_err(ApiError::store)?
    .ok_or(CoreError::NotFound(Entity::Activity, id))??;
  tracing::info!(activity_id = id, seats_available = seats, "seats overridden");
  Ok(Json(activity))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /activities/:id`
pub async fn delete<S: GymStore>(
  State(state): State<AppState<S>>,
  _admin: Admin,
  Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
  require_id(Entity::Activity, id)?;
  let deleted = state
    .store
    .delete_activity(id)
    .await
    .map_err(ApiError::store)??;
  if !deleted {
    return Err(CoreError::NotFound(Entity::Activity, id).into());
  }
  tracing::info!(activity_id = id, "activity deleted");
  Ok(StatusCode::NO_CONTENT)
}
