//! Handlers for `/users` endpoints.
//!
//! | Method   | Path           | Notes |
//! |----------|----------------|-------|
//! | `GET`    | `/users`       | Admin only |
//! | `POST`   | `/users`       | Register. Body: `{"username","password","name"?}` |
//! | `POST`   | `/users/login` | Body: `{"username","password"}`. 401 on mismatch |
//! | `GET`    | `/users/:id`   | 404 if not found |
//! | `PUT`    | `/users/:id`   | Self or admin; only admins change `is_admin` |
//! | `DELETE` | `/users/:id`   | Admin only. 409 while enrollments reference the user |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use gym_core::{
  Entity, Error as CoreError,
  error::require_id,
  store::GymStore,
  user::{NewUser, User, UserUpdate},
};
use serde::Deserialize;

use crate::{
  AppState,
  caller::{Admin, Caller},
  error::ApiError,
  password,
};

// ─── Register ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub username: String,
  pub password: String,
  #[serde(default)]
  pub name:     Option<String>,
}

/// `POST /users`
pub async fn register<S: GymStore>(
  State(state): State<AppState<S>>,
  Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, ApiError> {
  let input = NewUser {
    username:      body.username.trim().to_string(),
    name:          body.name,
    password_hash: password::hash(&body.password)?,
    is_admin:      false,
  };
  input.validate()?;

  let user = state
    .store
    .create_user(input)
    .await
    .map_err(ApiError::store)??;
  tracing::info!(user_id = user.user_id, username = %user.username, "user registered");
  Ok((StatusCode::CREATED, Json(user)))
}

// ─── Login ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub username: String,
  pub password: String,
}

/// `POST /users/login`
///
/// Unknown usernames and wrong passwords are indistinguishable.
pub async fn login<S: GymStore>(
  State(state): State<AppState<S>>,
  Json(body): Json<LoginBody>,
) -> Result<Json<User>, ApiError> {
  let user = state
    .store
    .get_user_by_username(body.username.trim())
    .await
    .map_err(ApiError::store)?
    .filter(|u| password::verify(&body.password, &u.password_hash))
    .ok_or(ApiError::Unauthorized)?;
  Ok(Json(user))
}

// ─── Read ────────────────────────────────────────────────────────────────────

/// `GET /users`
pub async fn list<S: GymStore>(
  State(state): State<AppState<S>>,
  _admin: Admin,
) -> Result<Json<Vec<User>>, ApiError> {
  let users = state.store.list_users().await.map_err(ApiError::store)?;
  Ok(Json(users))
}

/// `GET /users/:id`
pub async fn get_one<S: GymStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
) -> Result<Json<User>, ApiError> {
  require_id(Entity::User, id)?;
  let user = state
    .store
    .get_user(id)
    .await
    .map_err(ApiError::store)?
    .ok_or(CoreError::NotFound(Entity::User, id))?;
  Ok(Json(user))
}

// ─── Update ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct UpdateBody {
  pub username: Option<String>,
  pub name:     Option<String>,
  pub password: Option<String>,
  pub is_admin: Option<bool>,
}

/// `PUT /users/:id`
pub async fn update<S: GymStore>(
  State(state): State<AppState<S>>,
  Caller(caller): Caller,
  Path(id): Path<i64>,
  Json(body): Json<UpdateBody>,
) -> Result<Json<User>, ApiError> {
  require_id(Entity::User, id)?;
  if caller.user_id != id && !caller.is_admin {
    return Err(CoreError::Forbidden.into());
  }
  if body.is_admin.is_some() && !caller.is_admin {
    return Err(CoreError::Forbidden.into());
  }

  let update = UserUpdate {
    username:      body.username.map(|u| u.trim().to_string()),
    name:          body.name,
    password_hash: body.password.as_deref().map(password::hash).transpose()?,
    is_admin:      body.is_admin,
  };
  update.validate()?;

  let user = state
    .store
    .update_user(id, update)
    .await
    .map_err(ApiError::store)?
    .ok_or(CoreError::NotFound(Entity::User, id))??;
  Ok(Json(user))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /users/:id`
pub async fn delete<S: GymStore>(
  State(state): State<AppState<S>>,
  _admin: Admin,
  Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
  require_id(Entity::User, id)?;
  let deleted = state
    .store
    .delete_user(id)
    .await
    .map_err(ApiError::store)??;
  if !deleted {
    return Err(CoreError::NotFound(Entity::User, id).into());
  }
  tracing::info!(user_id = id, "user deleted");
  Ok(StatusCode::NO_CONTENT)
}
