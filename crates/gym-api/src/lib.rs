//! JSON REST API for the gym.
//!
//! Exposes an axum [`Router`] backed by any [`GymStore`]. Authentication is
//! the deployment's concern: admin routes trust the caller id carried in the
//! `X-User-Id` header (see [`caller`]).
//!
//! # Mounting
//!
//! ```rust,ignore
//! let state = gym_api::AppState::new(Arc::new(store), policy);
//! let app = gym_api::api_router(state);
//! ```

pub mod activities;
pub mod caller;
pub mod enrollments;
pub mod error;
pub mod password;
pub mod users;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use gym_core::{
  service::{EnrollmentPolicy, EnrollmentService},
  store::GymStore,
};

pub use error::ApiError;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S> {
  pub store:       Arc<S>,
  pub enrollments: EnrollmentService<S>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:       Arc::clone(&self.store),
      enrollments: self.enrollments.clone(),
    }
  }
}

impl<S: GymStore> AppState<S> {
  pub fn new(store: Arc<S>, policy: EnrollmentPolicy) -> Self {
    let enrollments = EnrollmentService::new(Arc::clone(&store), policy);
    Self { store, enrollments }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: GymStore + 'static,
{
  Router::new()
    // Users
    .route("/users", get(users::list::<S>).post(users::register::<S>))
    .route("/users/login", post(users::login::<S>))
    .route(
      "/users/{id}",
      get(users::get_one::<S>)
        .put(users::update::<S>)
        .delete(users::delete::<S>),
    )
    .route("/users/{id}/enrollments", get(enrollments::list_for_user::<S>))
    // Activities
    .route(
      "/activities",
      get(activities::list::<S>).post(activities::create::<S>),
    )
    .route(
      "/activities/{id}",
      get(activities::get_one::<S>)
        .put(activities::update::<S>)
        .delete(activities::delete::<S>),
    )
    .route("/activities/{id}/seats", put(activities::set_seats::<S>))
    // Enrollments
    .route("/enrollments", post(enrollments::enroll::<S>))
    .route("/enrollments/active", get(enrollments::get_active::<S>))
    .route(
      "/enrollments/{id}",
      get(enrollments::get_one::<S>).delete(enrollments::cancel::<S>),
    )
    .with_state(state)
}

#[cfg(test)]
mod tests;
