//! The enrollment service: admission control for activities.
//!
//! [`EnrollmentService::enroll`] runs the admission checks in a fixed order so
//! the first failing rule determines the error the caller sees:
//!
//! 1. the user exists,
//! 2. the activity exists,
//! 3. the user has no active enrollment for the activity,
//! 4. the activity has a seat left,
//! 5. commit: insert the enrollment and take the seat.
//!
//! Steps 1-4 are plain reads and exist to report precise errors cheaply. They
//! are not what keeps the data consistent: two requests can both pass them.
//! Step 5 is a single atomic [`EnrollmentStore::commit_enrollment`] call that
//! re-checks the duplicate and capacity rules under the store's own
//! serialisation, and its verdict is final.

use std::sync::Arc;

use serde::Deserialize;

use crate::{
  Conflict, Entity, Error, Result,
  enrollment::{Enrollment, EnrollmentDetail},
  error::require_id,
  store::GymStore,
};

/// Behaviour switches for the enrollment service.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct EnrollmentPolicy {
  /// Give the seat back to the activity when an enrollment is cancelled.
  /// Off by default: historically a cancelled enrollment kept its seat.
  #[serde(default)]
  pub restore_seat_on_cancel: bool,
}

/// Orchestrates enrollments over an injected store.
pub struct EnrollmentService<S> {
  store:  Arc<S>,
  policy: EnrollmentPolicy,
}

impl<S> Clone for EnrollmentService<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), policy: self.policy }
  }
}

impl<S: GymStore> EnrollmentService<S> {
  pub fn new(store: Arc<S>, policy: EnrollmentPolicy) -> Self {
    Self { store, policy }
  }

  pub fn policy(&self) -> EnrollmentPolicy { self.policy }

  pub fn store(&self) -> &Arc<S> { &self.store }

  // ── Writes ────────────────────────────────────────────────────────────────

  /// Enroll `user_id` in `activity_id`.
  ///
  /// No state is modified on any failure path.
  #[tracing::instrument(skip(self))]
  pub async fn enroll(
    &self,
    user_id: i64,
    activity_id: i64,
  ) -> Result<EnrollmentDetail> {
    require_id(Entity::User, user_id)?;
    require_id(Entity::Activity, activity_id)?;

    let user = self
      .store
      .get_user(user_id)
      .await
      .map_err(Error::internal)?
      .ok_or(Error::NotFound(Entity::User, user_id))?;

    let activity = self
      .store
      .get_activity(activity_id)
      .await
      .map_err(Error::internal)?
      .ok_or(Error::NotFound(Entity::Activity, activity_id))?;

    let existing = self
      .store
      .find_active_enrollment(user_id, activity_id)
      .await
      .map_err(Error::internal)?;
    if existing.is_some() {
      return Err(reject(Conflict::AlreadyEnrolled));
    }

    if !activity.has_seats() {
      return Err(reject(Conflict::NoSlotsAvailable));
    }

    let (enrollment, activity) = self
      .store
      .commit_enrollment(user_id, activity_id)
      .await
      .map_err(Error::internal)?
      .map_err(reject)?;

    tracing::info!(
      enrollment_id = enrollment.enrollment_id,
      seats_available = activity.seats_available,
      "enrollment admitted"
    );

    Ok(EnrollmentDetail { enrollment, user: user.summary(), activity })
  }

  /// Cancel `enrollment_id` on behalf of `requesting_user_id`.
  ///
  /// An enrollment owned by someone else is reported exactly like a missing
  /// one. Cancelling twice fails with [`Conflict::NotActive`].
  #[tracing::instrument(skip(self))]
  pub async fn cancel(
    &self,
    enrollment_id: i64,
    requesting_user_id: i64,
  ) -> Result<EnrollmentDetail> {
    require_id(Entity::Enrollment, enrollment_id)?;
    require_id(Entity::User, requesting_user_id)?;

    let existing = self
      .store
      .get_enrollment(enrollment_id)
      .await
      .map_err(Error::internal)?
      .filter(|e| e.user_id == requesting_user_id)
      .ok_or(Error::NotFound(Entity::Enrollment, enrollment_id))?;

    if !existing.status.is_active() {
      return Err(reject(Conflict::NotActive));
    }

    let (enrollment, activity) = self
      .store
      .cancel_enrollment(enrollment_id, self.policy.restore_seat_on_cancel)
      .await
      .map_err(Error::internal)?
      .map_err(reject)?;

    tracing::info!(
      activity_id = activity.activity_id,
      seat_restored = self.policy.restore_seat_on_cancel,
      "enrollment cancelled"
    );

    let user = self.load_user(enrollment.user_id).await?;
    Ok(EnrollmentDetail { enrollment, user: user.summary(), activity })
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  pub async fn get(&self, enrollment_id: i64) -> Result<EnrollmentDetail> {
    require_id(Entity::Enrollment, enrollment_id)?;
    let enrollment = self
      .store
      .get_enrollment(enrollment_id)
      .await
      .map_err(Error::internal)?
      .ok_or(Error::NotFound(Entity::Enrollment, enrollment_id))?;
    self.detail(enrollment).await
  }

  /// The active enrollment for the pair.
  pub async fn get_active(
    &self,
    user_id: i64,
    activity_id: i64,
  ) -> Result<EnrollmentDetail> {
    require_id(Entity::User, user_id)?;
    require_id(Entity::Activity, activity_id)?;
    let enrollment = self
      .store
      .find_active_enrollment(user_id, activity_id)
      .await
      .map_err(Error::internal)?
      .ok_or(Error::NoActiveEnrollment { user_id, activity_id })?;
    self.detail(enrollment).await
  }

  pub async fn list_active_for_user(
    &self,
    user_id: i64,
  ) -> Result<Vec<EnrollmentDetail>> {
    require_id(Entity::User, user_id)?;
    let user = self.load_user(user_id).await?.summary();

    let enrollments = self
      .store
      .list_active_enrollments_for_user(user_id)
      .await
      .map_err(Error::internal)?;

    let mut out = Vec::with_capacity(enrollments.len());
    for enrollment in enrollments {
      let activity = self.load_activity(enrollment.activity_id).await?;
      out.push(EnrollmentDetail { enrollment, user: user.clone(), activity });
    }
    Ok(out)
  }

  // ── Helpers ───────────────────────────────────────────────────────────────

  async fn detail(&self, enrollment: Enrollment) -> Result<EnrollmentDetail> {
    let user = self.load_user(enrollment.user_id).await?;
    let activity = self.load_activity(enrollment.activity_id).await?;
    Ok(EnrollmentDetail { enrollment, user: user.summary(), activity })
  }

  async fn load_user(&self, id: i64) -> Result<crate::user::User> {
    self
      .store
      .get_user(id)
      .await
      .map_err(Error::internal)?
      .ok_or(Error::NotFound(Entity::User, id))
  }

  async fn load_activity(&self, id: i64) -> Result<crate::activity::Activity> {
    self
      .store
      .get_activity(id)
      .await
      .map_err(Error::internal)?
      .ok_or(Error::NotFound(Entity::Activity, id))
  }
}

fn reject(conflict: Conflict) -> Error {
  tracing::debug!(%conflict, "enrollment request rejected");
  Error::Conflict(conflict)
}
