//! Activities: schedulable classes with a seat capacity.

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Schedule ────────────────────────────────────────────────────────────────

/// The weekly time window an activity occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
  pub day:       Weekday,
  /// Local wall-clock start time.
  pub starts_at: NaiveTime,
  pub ends_at:   NaiveTime,
}

impl Schedule {
  pub fn validate(&self) -> Result<()> {
    if self.starts_at >= self.ends_at {
      return Err(Error::InvalidInput(
        "schedule must start before it ends".into(),
      ));
    }
    Ok(())
  }
}

// ─── Activity ────────────────────────────────────────────────────────────────

/// A persisted activity.
///
/// `seats_available` is the single authoritative seat counter. It starts at
/// `capacity`, is decremented by exactly one per admitted enrollment, and is
/// never negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
  pub activity_id:     i64,
  pub name:            String,
  pub instructor:      String,
  pub category:        String,
  pub description:     String,
  pub schedule:        Schedule,
  pub capacity:        u32,
  pub seats_available: u32,
  pub created_at:      DateTime<Utc>,
}

impl Activity {
  pub fn has_seats(&self) -> bool { self.seats_available > 0 }
}

// ─── Writes ──────────────────────────────────────────────────────────────────

/// Input to [`crate::store::ActivityStore::create_activity`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewActivity {
  pub name:        String,
  pub instructor:  String,
  pub category:    String,
  #[serde(default)]
  pub description: String,
  pub schedule:    Schedule,
  pub capacity:    u32,
}

impl NewActivity {
  pub fn validate(&self) -> Result<()> {
    require_text("name", &self.name)?;
    require_text("instructor", &self.instructor)?;
    require_text("category", &self.category)?;
    self.schedule.validate()?;
    if self.capacity == 0 {
      return Err(Error::InvalidInput("capacity must be greater than 0".into()));
    }
    Ok(())
  }
}

/// A partial update; `None` fields are left untouched.
///
/// Changing `capacity` shifts `seats_available` by the same delta, floored at
/// zero, so seats already taken stay taken.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityUpdate {
  pub name:        Option<String>,
  pub instructor:  Option<String>,
  pub category:    Option<String>,
  pub description: Option<String>,
  pub schedule:    Option<Schedule>,
  pub capacity:    Option<u32>,
}

impl ActivityUpdate {
  pub fn validate(&self) -> Result<()> {
    if let Some(name) = &self.name {
      require_text("name", name)?;
    }
    if let Some(instructor) = &self.instructor {
      require_text("instructor", instructor)?;
    }
    if let Some(category) = &self.category {
      require_text("category", category)?;
    }
    if let Some(schedule) = &self.schedule {
      schedule.validate()?;
    }
    if self.capacity == Some(0) {
      return Err(Error::InvalidInput("capacity must be greater than 0".into()));
    }
    Ok(())
  }
}

fn require_text(field: &str, value: &str) -> Result<()> {
  if value.trim().is_empty() {
    return Err(Error::InvalidInput(format!("{field} cannot be empty")));
  }
  Ok(())
}

// ─── Query ───────────────────────────────────────────────────────────────────

/// Parameters for [`crate::store::ActivityStore::list_activities`]. All set
/// filters must match.
#[derive(Debug, Clone, Default)]
pub struct ActivityQuery {
  pub category:       Option<String>,
  pub instructor:     Option<String>,
  pub day:            Option<Weekday>,
  /// Only activities with at least one seat left.
  pub available_only: bool,
  /// Case-insensitive substring match on the activity name.
  pub name:           Option<String>,
}
