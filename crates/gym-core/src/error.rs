//! Error types for `gym-core`.

use serde::Serialize;
use strum::Display;
use thiserror::Error;

/// The kind of record an identifier refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Entity {
  User,
  Activity,
  Enrollment,
}

/// A domain-level rejection of a write. Distinct from a storage failure: the
/// store worked, but the requested state transition is not allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Conflict {
  #[strum(to_string = "user is already enrolled in this activity")]
  AlreadyEnrolled,
  #[strum(to_string = "activity has no available slots")]
  NoSlotsAvailable,
  #[strum(to_string = "enrollment is not active")]
  NotActive,
  #[strum(to_string = "username already exists")]
  UsernameTaken,
  #[strum(to_string = "an activity with this name already exists")]
  ActivityNameTaken,
  #[strum(to_string = "record is referenced by enrollments")]
  InUse,
  #[strum(to_string = "capacity is below the number of active enrollments")]
  CapacityBelowEnrolled,
  #[strum(to_string = "seats exceed what active enrollments leave free")]
  SeatsExceedFree,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("{0} {1} not found")]
  NotFound(Entity, i64),

  #[error("user {user_id} has no active enrollment in activity {activity_id}")]
  NoActiveEnrollment { user_id: i64, activity_id: i64 },

  #[error("conflict: {0}")]
  Conflict(Conflict),

  #[error("forbidden")]
  Forbidden,

  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend failure. Used with `map_err` on store calls.
  pub fn internal<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Internal(Box::new(e))
  }
}

impl From<Conflict> for Error {
  fn from(c: Conflict) -> Self { Self::Conflict(c) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The outcome of a store write that may be rejected by a domain rule.
pub type Checked<T> = std::result::Result<T, Conflict>;

/// Reject identifiers that can never have been assigned by a store.
pub fn require_id(entity: Entity, id: i64) -> Result<()> {
  if id <= 0 {
    return Err(Error::InvalidInput(format!(
      "{entity} id must be positive, got {id}"
    )));
  }
  Ok(())
}
