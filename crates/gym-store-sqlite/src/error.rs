//! Error type for `gym-store-sqlite`.
//!
//! Constraint violations that correspond to domain rules (duplicate username,
//! duplicate active enrollment, ...) are not errors; the store reports them as
//! [`gym_core::Conflict`] values instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unexpected value in column {column}: {value:?}")]
  UnknownValue { column: &'static str, value: String },

  #[error("negative value in column {column}: {value}")]
  Negative { column: &'static str, value: i64 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
