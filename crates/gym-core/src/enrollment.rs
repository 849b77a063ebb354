//! Enrollments: the link between a user and an activity.
//!
//! Enrollments are never deleted. Their only lifecycle transition is
//! `active -> cancelled`, and at most one `active` enrollment may exist per
//! (user, activity) pair.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};

use crate::{activity::Activity, user::UserSummary};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EnrollmentStatus {
  Active,
  Cancelled,
}

impl EnrollmentStatus {
  pub fn is_active(&self) -> bool { matches!(self, Self::Active) }

  /// The value stored in the `status` column.
  pub fn as_str(self) -> &'static str { self.into() }
}

/// A persisted enrollment row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
  pub enrollment_id: i64,
  pub user_id:       i64,
  pub activity_id:   i64,
  pub status:        EnrollmentStatus,
  pub created_at:    DateTime<Utc>,
  pub cancelled_at:  Option<DateTime<Utc>>,
}

/// An enrollment with snapshots of the user and activity it links, as
/// returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentDetail {
  #[serde(flatten)]
  pub enrollment: Enrollment,
  pub user:       UserSummary,
  pub activity:   Activity,
}
