//! Store capability traits.
//!
//! The traits are implemented by storage backends (e.g. `gym-store-sqlite`).
//! The [`EnrollmentService`](crate::service::EnrollmentService) and the HTTP
//! layer depend on these abstractions, never on a concrete backend.
//!
//! Writes that can be refused by a domain rule return [`Checked`]: the outer
//! `Result` reports storage failures, the inner one reports a [`Conflict`]
//! detected by the backend (usually from a constraint it enforces).
//!
//! [`Conflict`]: crate::Conflict

use std::future::Future;

use crate::{
  Checked,
  activity::{Activity, ActivityQuery, ActivityUpdate, NewActivity},
  enrollment::Enrollment,
  user::{NewUser, User, UserUpdate},
};

/// Shared base for all capability traits; fixes the backend error type.
///
/// All methods across the capability traits return `Send` futures so stores
/// can be shared by a multi-threaded runtime (e.g. tokio with `axum`).
pub trait Store: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;
}

// ─── Users ───────────────────────────────────────────────────────────────────

pub trait UserStore: Store {
  /// Persist a new user. Rejects a duplicate username with
  /// [`Conflict::UsernameTaken`](crate::Conflict::UsernameTaken).
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<Checked<User>, Self::Error>> + Send + '_;

  /// Retrieve a user by id. Returns `None` if not found.
  fn get_user(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn get_user_by_username<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  fn list_users(
    &self,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  /// Apply a partial update. Returns `None` if the user does not exist.
  fn update_user(
    &self,
    id: i64,
    update: UserUpdate,
  ) -> impl Future<Output = Result<Option<Checked<User>>, Self::Error>> + Send + '_;

  /// Delete a user. `Ok(false)` if it did not exist; rejected with
  /// [`Conflict::InUse`](crate::Conflict::InUse) if enrollments reference it.
  fn delete_user(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Checked<bool>, Self::Error>> + Send + '_;
}

// ─── Activities ──────────────────────────────────────────────────────────────

pub trait ActivityStore: Store {
  /// Persist a new activity with `seats_available == capacity`.
  fn create_activity(
    &self,
    input: NewActivity,
  ) -> impl Future<Output = Result<Checked<Activity>, Self::Error>> + Send + '_;

  fn get_activity(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Activity>, Self::Error>> + Send + '_;

  fn list_activities<'a>(
    &'a self,
    query: &'a ActivityQuery,
  ) -> impl Future<Output = Result<Vec<Activity>, Self::Error>> + Send + 'a;

  /// Apply a partial update. Returns `None` if the activity does not exist.
  ///
  /// A new capacity below the number of active enrollments is rejected with
  /// [`Conflict::CapacityBelowEnrolled`](crate::Conflict::CapacityBelowEnrolled).
  fn update_activity(
    &self,
    id: i64,
    update: ActivityUpdate,
  ) -> impl Future<Output = Result<Option<Checked<Activity>>, Self::Error>>
  + Send
  + '_;

  /// Overwrite the available-seat counter. Returns `None` if the activity
  /// does not exist.
  ///
  /// `seats` may not exceed `capacity` minus the active enrollments, checked
  /// in the same atomic unit as the write; otherwise
  /// [`Conflict::SeatsExceedFree`](crate::Conflict::SeatsExceedFree).
  fn set_seats_available(
    &self,
    id: i64,
    seats: u32,
  ) -> impl Future<Output = Result<Option<Checked<Activity>>, Self::Error>>
  + Send
  + '_;

  /// Delete an activity. `Ok(false)` if it did not exist; rejected with
  /// [`Conflict::InUse`](crate::Conflict::InUse) if enrollments reference it.
  fn delete_activity(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Checked<bool>, Self::Error>> + Send + '_;
}

// ─── Enrollments ─────────────────────────────────────────────────────────────

pub trait EnrollmentStore: Store {
  /// Atomically create an `active` enrollment and take one seat from the
  /// activity. Both writes happen or neither does.
  ///
  /// This is the authoritative admission check: it must reject with
  /// [`Conflict::AlreadyEnrolled`](crate::Conflict::AlreadyEnrolled) when an
  /// active enrollment for the pair exists and with
  /// [`Conflict::NoSlotsAvailable`](crate::Conflict::NoSlotsAvailable) when
  /// the activity has no seats left, regardless of what the caller observed
  /// beforehand.
  ///
  /// Returns the new enrollment and the activity after the decrement.
  fn commit_enrollment(
    &self,
    user_id: i64,
    activity_id: i64,
  ) -> impl Future<Output = Result<Checked<(Enrollment, Activity)>, Self::Error>>
  + Send
  + '_;

  fn get_enrollment(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Enrollment>, Self::Error>> + Send + '_;

  /// The `active` enrollment for the pair, if any.
  fn find_active_enrollment(
    &self,
    user_id: i64,
    activity_id: i64,
  ) -> impl Future<Output = Result<Option<Enrollment>, Self::Error>> + Send + '_;

  fn list_active_enrollments_for_user(
    &self,
    user_id: i64,
  ) -> impl Future<Output = Result<Vec<Enrollment>, Self::Error>> + Send + '_;

  /// Atomically move an enrollment from `active` to `cancelled`, optionally
  /// giving its seat back (never above capacity). Rejects with
  /// [`Conflict::NotActive`](crate::Conflict::NotActive) if the enrollment is
  /// not currently active.
  ///
  /// Returns the cancelled enrollment and the activity after the update.
  fn cancel_enrollment(
    &self,
    id: i64,
    restore_seat: bool,
  ) -> impl Future<Output = Result<Checked<(Enrollment, Activity)>, Self::Error>>
  + Send
  + '_;
}

/// Everything the booking service needs from a backend.
pub trait GymStore: UserStore + ActivityStore + EnrollmentStore {}

impl<T> GymStore for T where T: UserStore + ActivityStore + EnrollmentStore {}
