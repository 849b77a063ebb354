//! User accounts.
//!
//! Users are created by registration (or admin seeding at startup) and are
//! referenced by enrollments. Password hashing happens above this crate; the
//! core only ever sees the PHC string.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A persisted user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub user_id:       i64,
  pub username:      String,
  pub name:          Option<String>,
  /// argon2 PHC string; never included in serialised responses.
  #[serde(skip_serializing, default)]
  pub password_hash: String,
  pub is_admin:      bool,
  pub created_at:    DateTime<Utc>,
}

impl User {
  /// The denormalised snapshot attached to enrollments.
  pub fn summary(&self) -> UserSummary {
    UserSummary {
      user_id:  self.user_id,
      username: self.username.clone(),
      name:     self.name.clone(),
      is_admin: self.is_admin,
    }
  }
}

/// The public projection of a [`User`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
  pub user_id:  i64,
  pub username: String,
  pub name:     Option<String>,
  pub is_admin: bool,
}

/// Input to [`crate::store::UserStore::create_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
  pub username:      String,
  pub name:          Option<String>,
  pub password_hash: String,
  pub is_admin:      bool,
}

impl NewUser {
  pub fn validate(&self) -> Result<()> {
    validate_username(&self.username)?;
    if self.password_hash.is_empty() {
      return Err(Error::InvalidInput("password cannot be empty".into()));
    }
    Ok(())
  }
}

/// A partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
  pub username:      Option<String>,
  pub name:          Option<String>,
  pub password_hash: Option<String>,
  pub is_admin:      Option<bool>,
}

impl UserUpdate {
  pub fn validate(&self) -> Result<()> {
    if let Some(username) = &self.username {
      validate_username(username)?;
    }
    Ok(())
  }
}

fn validate_username(username: &str) -> Result<()> {
  if username.trim().is_empty() {
    return Err(Error::InvalidInput("username cannot be empty".into()));
  }
  if username.len() > 50 {
    return Err(Error::InvalidInput(
      "username cannot be longer than 50 characters".into(),
    ));
  }
  Ok(())
}
