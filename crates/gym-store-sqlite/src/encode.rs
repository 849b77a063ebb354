//! Encoding and decoding helpers between domain types and the plain values
//! stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, weekdays their three-letter English
//! abbreviation, wall-clock times `HH:MM:SS`. Rows are first read into `Raw*`
//! structs inside the database thread and decoded afterwards.

use std::str::FromStr as _;

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use gym_core::{
  activity::{Activity, Schedule},
  enrollment::{Enrollment, EnrollmentStatus},
  user::User,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Schedule parts ──────────────────────────────────────────────────────────

pub fn encode_weekday(day: Weekday) -> String { day.to_string() }

pub fn decode_weekday(s: &str) -> Result<Weekday> {
  s.parse().map_err(|_| Error::UnknownValue {
    column: "day",
    value:  s.to_owned(),
  })
}

pub fn encode_time(t: NaiveTime) -> String { t.format("%H:%M:%S").to_string() }

pub fn decode_time(s: &str) -> Result<NaiveTime> {
  NaiveTime::parse_from_str(s, "%H:%M:%S")
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Counters ────────────────────────────────────────────────────────────────

fn decode_count(column: &'static str, value: i64) -> Result<u32> {
  u32::try_from(value).map_err(|_| Error::Negative { column, value })
}

// ─── EnrollmentStatus ────────────────────────────────────────────────────────

pub fn decode_status(s: &str) -> Result<EnrollmentStatus> {
  EnrollmentStatus::from_str(s).map_err(|_| Error::UnknownValue {
    column: "status",
    value:  s.to_owned(),
  })
}

// ─── Users ───────────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str =
  "user_id, username, name, password_hash, is_admin, created_at";

pub struct RawUser {
  pub user_id:       i64,
  pub username:      String,
  pub name:          Option<String>,
  pub password_hash: String,
  pub is_admin:      bool,
  pub created_at:    String,
}

impl RawUser {
  /// Map a row selected with [`USER_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:       row.get(0)?,
      username:      row.get(1)?,
      name:          row.get(2)?,
      password_hash: row.get(3)?,
      is_admin:      row.get(4)?,
      created_at:    row.get(5)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:       self.user_id,
      username:      self.username,
      name:          self.name,
      password_hash: self.password_hash,
      is_admin:      self.is_admin,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

// ─── Activities ──────────────────────────────────────────────────────────────

pub const ACTIVITY_COLUMNS: &str = "activity_id, name, instructor, category, \
   description, day, starts_at, ends_at, capacity, seats_available, created_at";

pub struct RawActivity {
  pub activity_id:     i64,
  pub name:            String,
  pub instructor:      String,
  pub category:        String,
  pub description:     String,
  pub day:             String,
  pub starts_at:       String,
  pub ends_at:         String,
  pub capacity:        i64,
  pub seats_available: i64,
  pub created_at:      String,
}

impl RawActivity {
  /// Map a row selected with [`ACTIVITY_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      activity_id:     row.get(0)?,
      name:            row.get(1)?,
      instructor:      row.get(2)?,
      category:        row.get(3)?,
      description:     row.get(4)?,
      day:             row.get(5)?,
      starts_at:       row.get(6)?,
      ends_at:         row.get(7)?,
      capacity:        row.get(8)?,
      seats_available: row.get(9)?,
      created_at:      row.get(10)?,
    })
  }

  pub fn into_activity(self) -> Result<Activity> {
    Ok(Activity {
      activity_id:     self.activity_id,
      name:            self.name,
      instructor:      self.instructor,
      category:        self.category,
      description:     self.description,
      schedule:        Schedule {
        day:       decode_weekday(&self.day)?,
        starts_at: decode_time(&self.starts_at)?,
        ends_at:   decode_time(&self.ends_at)?,
      },
      capacity:        decode_count("capacity", self.capacity)?,
      seats_available: decode_count("seats_available", self.seats_available)?,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}

// ─── Enrollments ─────────────────────────────────────────────────────────────

pub const ENROLLMENT_COLUMNS: &str =
  "enrollment_id, user_id, activity_id, status, created_at, cancelled_at";

pub struct RawEnrollment {
  pub enrollment_id: i64,
  pub user_id:       i64,
  pub activity_id:   i64,
  pub status:        String,
  pub created_at:    String,
  pub cancelled_at:  Option<String>,
}

impl RawEnrollment {
  /// Map a row selected with [`ENROLLMENT_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      enrollment_id: row.get(0)?,
      user_id:       row.get(1)?,
      activity_id:   row.get(2)?,
      status:        row.get(3)?,
      created_at:    row.get(4)?,
      cancelled_at:  row.get(5)?,
    })
  }

  pub fn into_enrollment(self) -> Result<Enrollment> {
    Ok(Enrollment {
      enrollment_id: self.enrollment_id,
      user_id:       self.user_id,
      activity_id:   self.activity_id,
      status:        decode_status(&self.status)?,
      created_at:    decode_dt(&self.created_at)?,
      cancelled_at:  self.cancelled_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}
