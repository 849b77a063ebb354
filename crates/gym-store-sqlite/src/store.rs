//! [`SqliteStore`]: the SQLite implementation of the gym store traits.

use std::path::Path;

use chrono::Utc;
use gym_core::{
  Checked, Conflict,
  activity::{Activity, ActivityQuery, ActivityUpdate, NewActivity},
  enrollment::{Enrollment, EnrollmentStatus},
  store::{ActivityStore, EnrollmentStore, Store, UserStore},
  user::{NewUser, User, UserUpdate},
};
use rusqlite::{OptionalExtension as _, TransactionBehavior};

use crate::{
  Result,
  encode::{
    ACTIVITY_COLUMNS, ENROLLMENT_COLUMNS, RawActivity, RawEnrollment, RawUser,
    USER_COLUMNS, encode_dt, encode_time, encode_weekday,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A gym store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All clones
/// share one database thread, and every multi-statement write runs in its own
/// `IMMEDIATE` transaction, so admission commits are serialised.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    tracing::debug!(path = %path.display(), "opened sqlite store");
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Constraint helpers ──────────────────────────────────────────────────────

fn constraint_code(e: &rusqlite::Error) -> Option<i32> {
  match e {
    rusqlite::Error::SqliteFailure(f, _)
      if f.code == rusqlite::ErrorCode::ConstraintViolation =>
    {
      Some(f.extended_code)
    }
    _ => None,
  }
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
  constraint_code(e) == Some(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE)
}

fn is_foreign_key_violation(e: &rusqlite::Error) -> bool {
  constraint_code(e) == Some(rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY)
}

/// Decode the success side of a [`Checked`] raw row, passing conflicts
/// through untouched.
fn decode_checked<R, T>(
  raw: Checked<R>,
  decode: impl FnOnce(R) -> Result<T>,
) -> Result<Checked<T>> {
  match raw {
    Ok(r) => decode(r).map(Ok),
    Err(conflict) => Ok(Err(conflict)),
  }
}

fn select_activity(
  conn: &rusqlite::Connection,
  id: i64,
) -> rusqlite::Result<Option<RawActivity>> {
  conn
    .query_row(
      &format!("SELECT {ACTIVITY_COLUMNS} FROM activities WHERE activity_id = ?1"),
      [id],
      RawActivity::from_row,
    )
    .optional()
}

fn select_enrollment(
  conn: &rusqlite::Connection,
  id: i64,
) -> rusqlite::Result<Option<RawEnrollment>> {
  conn
    .query_row(
      &format!(
        "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE enrollment_id = ?1"
      ),
      [id],
      RawEnrollment::from_row,
    )
    .optional()
}

fn count_active_enrollments(
  conn: &rusqlite::Connection,
  activity_id: i64,
) -> rusqlite::Result<i64> {
  conn.query_row(
    "SELECT COUNT(*) FROM enrollments WHERE activity_id = ?1 AND status = ?2",
    rusqlite::params![activity_id, EnrollmentStatus::Active.as_str()],
    |row| row.get(0),
  )
}

/// Escape `%`, `_` and the escape character itself for a `LIKE ... ESCAPE '\'`.
fn escape_like(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for c in s.chars() {
    if matches!(c, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(c);
  }
  out
}

impl Store for SqliteStore {
  type Error = crate::Error;
}

// ─── UserStore ───────────────────────────────────────────────────────────────

impl UserStore for SqliteStore {
  async fn create_user(&self, input: NewUser) -> Result<Checked<User>> {
    let created_at = Utc::now();
    let at_str = encode_dt(created_at);
    let username = input.username.clone();
    let name = input.name.clone();
    let password_hash = input.password_hash.clone();
    let is_admin = input.is_admin;

    let inserted: Checked<i64> = self
      .conn
      .call(move |conn| {
        let res = conn.execute(
          "INSERT INTO users (username, name, password_hash, is_admin, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![username, name, password_hash, is_admin, at_str],
        );
        match res {
          Ok(_) => Ok(Ok(conn.last_insert_rowid())),
          Err(e) if is_unique_violation(&e) => Ok(Err(Conflict::UsernameTaken)),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    Ok(inserted.map(|user_id| User {
      user_id,
      username: input.username,
      name: input.name,
      password_hash: input.password_hash,
      is_admin: input.is_admin,
      created_at,
    }))
  }

  async fn get_user(&self, id: i64) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
              [id],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
    let username = username.to_owned();

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
              [username],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn list_users(&self) -> Result<Vec<User>> {
    let raws: Vec<RawUser> = self
      .conn
      .call(|conn| {
        let mut stmt = conn
          .prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY user_id"))?;
        let rows = stmt
          .query_map([], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn update_user(
    &self,
    id: i64,
    update: UserUpdate,
  ) -> Result<Option<Checked<User>>> {
    let raw: Option<Checked<RawUser>> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = tx
          .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
            [id],
            RawUser::from_row,
          )
          .optional()?;
        let Some(mut user) = current else {
          return Ok(None);
        };

        if let Some(username) = update.username {
          user.username = username;
        }
        if let Some(name) = update.name {
          user.name = Some(name);
        }
        if let Some(hash) = update.password_hash {
          user.password_hash = hash;
        }
        if let Some(is_admin) = update.is_admin {
          user.is_admin = is_admin;
        }

        let res = tx.execute(
          "UPDATE users
           SET username = ?2, name = ?3, password_hash = ?4, is_admin = ?5
           WHERE user_id = ?1",
          rusqlite::params![
            id,
            user.username,
            user.name,
            user.password_hash,
            user.is_admin,
          ],
        );
        match res {
          Ok(_) => {}
          Err(e) if is_unique_violation(&e) => {
            return Ok(Some(Err(Conflict::UsernameTaken)));
          }
          Err(e) => return Err(e.into()),
        }

        tx.commit()?;
        Ok(Some(Ok(user)))
      })
      .await?;

    raw.map(|c| decode_checked(c, RawUser::into_user)).transpose()
  }

  async fn delete_user(&self, id: i64) -> Result<Checked<bool>> {
    let deleted = self
      .conn
      .call(move |conn| {
        match conn.execute("DELETE FROM users WHERE user_id = ?1", [id]) {
          Ok(n) => Ok(Ok(n > 0)),
          Err(e) if is_foreign_key_violation(&e) => Ok(Err(Conflict::InUse)),
          Err(e) => Err(e.into()),
        }
      })
      .await?;
    Ok(deleted)
  }
}

// ─── ActivityStore ───────────────────────────────────────────────────────────

impl ActivityStore for SqliteStore {
  async fn create_activity(&self, input: NewActivity) -> Result<Checked<Activity>> {
    let created_at = Utc::now();
    let at_str = encode_dt(created_at);
    let name = input.name.clone();
    let instructor = input.instructor.clone();
    let category = input.category.clone();
    let description = input.description.clone();
    let day = encode_weekday(input.schedule.day);
    let starts_at = encode_time(input.schedule.starts_at);
    let ends_at = encode_time(input.schedule.ends_at);
    let capacity = input.capacity;

    let inserted: Checked<i64> = self
      .conn
      .call(move |conn| {
        let res = conn.execute(
          "INSERT INTO activities (
             name, instructor, category, description,
             day, starts_at, ends_at, capacity, seats_available, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8, ?9)",
          rusqlite::params![
            name,
            instructor,
            category,
            description,
            day,
            starts_at,
            ends_at,
            capacity,
            at_str,
          ],
        );
        match res {
          Ok(_) => Ok(Ok(conn.last_insert_rowid())),
          Err(e) if is_unique_violation(&e) => Ok(Err(Conflict::ActivityNameTaken)),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    Ok(inserted.map(|activity_id| Activity {
      activity_id,
      name: input.name,
      instructor: input.instructor,
      category: input.category,
      description: input.description,
      schedule: input.schedule,
      capacity: input.capacity,
      seats_available: input.capacity,
      created_at,
    }))
  }

  async fn get_activity(&self, id: i64) -> Result<Option<Activity>> {
    let raw = self
      .conn
      .call(move |conn| Ok(select_activity(conn, id)?))
      .await?;
    raw.map(RawActivity::into_activity).transpose()
  }

  async fn list_activities(&self, query: &ActivityQuery) -> Result<Vec<Activity>> {
    let mut conds: Vec<&'static str> = vec![];
    let mut args: Vec<String> = vec![];

    if let Some(category) = &query.category {
      conds.push("category = ? COLLATE NOCASE");
      args.push(category.clone());
    }
    if let Some(instructor) = &query.instructor {
      conds.push("instructor = ? COLLATE NOCASE");
      args.push(instructor.clone());
    }
    if let Some(day) = query.day {
      conds.push("day = ?");
      args.push(encode_weekday(day));
    }
    if let Some(name) = &query.name {
      conds.push("name LIKE ? ESCAPE '\\'");
      args.push(format!("%{}%", escape_like(name)));
    }
    if query.available_only {
      conds.push("seats_available > 0");
    }

    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };
    let sql = format!(
      "SELECT {ACTIVITY_COLUMNS} FROM activities {where_clause} ORDER BY activity_id"
    );

    let raws: Vec<RawActivity> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(args), RawActivity::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawActivity::into_activity).collect()
  }

  async fn update_activity(
    &self,
    id: i64,
    update: ActivityUpdate,
  ) -> Result<Option<Checked<Activity>>> {
    let raw: Option<Checked<RawActivity>> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(mut a) = select_activity(&tx, id)? else {
          return Ok(None);
        };

        if let Some(name) = update.name {
          a.name = name;
        }
        if let Some(instructor) = update.instructor {
          a.instructor = instructor;
        }
        if let Some(category) = update.category {
          a.category = category;
        }
        if let Some(description) = update.description {
          a.description = description;
        }
        if let Some(schedule) = update.schedule {
          a.day = encode_weekday(schedule.day);
          a.starts_at = encode_time(schedule.starts_at);
          a.ends_at = encode_time(schedule.ends_at);
        }
        if let Some(capacity) = update.capacity {
          let capacity = i64::from(capacity);
          if capacity < count_active_enrollments(&tx, id)? {
            return Ok(Some(Err(Conflict::CapacityBelowEnrolled)));
          }
          // Taken seats stay taken: shift the free count by the same delta.
          a.seats_available = (a.seats_available + capacity - a.capacity).max(0);
          a.capacity = capacity;
        }

        let res = tx.execute(
          "UPDATE activities
           SET name = ?2, instructor = ?3, category = ?4, description = ?5,
               day = ?6, starts_at = ?7, ends_at = ?8,
               capacity = ?9, seats_available = ?10
           WHERE activity_id = ?1",
          rusqlite::params![
            id,
            a.name,
            a.instructor,
            a.category,
            a.description,
            a.day,
            a.starts_at,
            a.ends_at,
            a.capacity,
            a.seats_available,
          ],
        );
        match res {
          Ok(_) => {}
          Err(e) if is_unique_violation(&e) => {
            return Ok(Some(Err(Conflict::ActivityNameTaken)));
          }
          Err(e) => return Err(e.into()),
        }

        tx.commit()?;
        Ok(Some(Ok(a)))
      })
      .await?;

    raw.map(|c| decode_checked(c, RawActivity::into_activity)).transpose()
  }

  async fn set_seats_available(
    &self,
    id: i64,
    seats: u32,
  ) -> Result<Option<Checked<Activity>>> {
    let raw: Option<Checked<RawActivity>> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(mut a) = select_activity(&tx, id)? else {
          return Ok(None);
        };
        let free = a.capacity - count_active_enrollments(&tx, id)?;
        if i64::from(seats) > free {
          return Ok(Some(Err(Conflict::SeatsExceedFree)));
        }

        tx.execute(
          "UPDATE activities SET seats_available = ?2 WHERE activity_id = ?1",
          rusqlite::params![id, seats],
        )?;
        a.seats_available = i64::from(seats);

        tx.commit()?;
        Ok(Some(Ok(a)))
      })
      .await?;

    raw.map(|c| decode_checked(c, RawActivity::into_activity)).transpose()
  }

  async fn delete_activity(&self, id: i64) -> Result<Checked<bool>> {
    let deleted = self
      .conn
      .call(move |conn| {
        match conn.execute("DELETE FROM activities WHERE activity_id = ?1", [id]) {
          Ok(n) => Ok(Ok(n > 0)),
          Err(e) if is_foreign_key_violation(&e) => Ok(Err(Conflict::InUse)),
          Err(e) => Err(e.into()),
        }
      })
      .await?;
    Ok(deleted)
  }
}

// ─── EnrollmentStore ─────────────────────────────────────────────────────────

impl EnrollmentStore for SqliteStore {
  async fn commit_enrollment(
    &self,
    user_id: i64,
    activity_id: i64,
  ) -> Result<Checked<(Enrollment, Activity)>> {
    let at_str = encode_dt(Utc::now());
    let active = EnrollmentStatus::Active.as_str();

    let raw: Checked<(RawEnrollment, RawActivity)> = self
      .conn
      .call(move |conn| {
        // Dropping `tx` without commit rolls everything back.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let duplicate = tx
          .query_row(
            "SELECT 1 FROM enrollments
             WHERE user_id = ?1 AND activity_id = ?2 AND status = ?3",
            rusqlite::params![user_id, activity_id, active],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if duplicate {
          return Ok(Err(Conflict::AlreadyEnrolled));
        }

        let taken = tx.execute(
          "UPDATE activities SET seats_available = seats_available - 1
           WHERE activity_id = ?1 AND seats_available > 0",
          [activity_id],
        )?;
        if taken == 0 {
          tracing::debug!(activity_id, "commit found no free seat");
          return Ok(Err(Conflict::NoSlotsAvailable));
        }

        let inserted = tx.execute(
          "INSERT INTO enrollments (user_id, activity_id, status, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![user_id, activity_id, active, at_str],
        );
        match inserted {
          Ok(_) => {}
          // Backstop for the partial unique index.
          Err(e) if is_unique_violation(&e) => {
            return Ok(Err(Conflict::AlreadyEnrolled));
          }
          Err(e) => return Err(e.into()),
        }
        let enrollment_id = tx.last_insert_rowid();

        let enrollment = select_enrollment(&tx, enrollment_id)?
          .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        let activity = select_activity(&tx, activity_id)?
          .ok_or(rusqlite::Error::QueryReturnedNoRows)?;

        tx.commit()?;
        Ok(Ok((enrollment, activity)))
      })
      .await?;

    decode_checked(raw, |(e, a)| Ok((e.into_enrollment()?, a.into_activity()?)))
  }

  async fn get_enrollment(&self, id: i64) -> Result<Option<Enrollment>> {
    let raw = self
      .conn
      .call(move |conn| Ok(select_enrollment(conn, id)?))
      .await?;
    raw.map(RawEnrollment::into_enrollment).transpose()
  }

  async fn find_active_enrollment(
    &self,
    user_id: i64,
    activity_id: i64,
  ) -> Result<Option<Enrollment>> {
    let active = EnrollmentStatus::Active.as_str();

    let raw: Option<RawEnrollment> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {ENROLLMENT_COLUMNS} FROM enrollments
                 WHERE user_id = ?1 AND activity_id = ?2 AND status = ?3"
              ),
              rusqlite::params![user_id, activity_id, active],
              RawEnrollment::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawEnrollment::into_enrollment).transpose()
  }

  async fn list_active_enrollments_for_user(
    &self,
    user_id: i64,
  ) -> Result<Vec<Enrollment>> {
    let active = EnrollmentStatus::Active.as_str();

    let raws: Vec<RawEnrollment> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ENROLLMENT_COLUMNS} FROM enrollments
           WHERE user_id = ?1 AND status = ?2
           ORDER BY enrollment_id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![user_id, active], RawEnrollment::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEnrollment::into_enrollment).collect()
  }

  async fn cancel_enrollment(
    &self,
    id: i64,
    restore_seat: bool,
  ) -> Result<Checked<(Enrollment, Activity)>> {
    let at_str = encode_dt(Utc::now());
    let active = EnrollmentStatus::Active.as_str();
    let cancelled = EnrollmentStatus::Cancelled.as_str();

    let raw: Checked<(RawEnrollment, RawActivity)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let changed = tx.execute(
          "UPDATE enrollments SET status = ?2, cancelled_at = ?3
           WHERE enrollment_id = ?1 AND status = ?4",
          rusqlite::params![id, cancelled, at_str, active],
        )?;
        if changed == 0 {
          return Ok(Err(Conflict::NotActive));
        }

        let enrollment = select_enrollment(&tx, id)?
          .ok_or(rusqlite::Error::QueryReturnedNoRows)?;

        if restore_seat {
          tx.execute(
            "UPDATE activities SET seats_available = seats_available + 1
             WHERE activity_id = ?1 AND seats_available < capacity",
            [enrollment.activity_id],
          )?;
        }

        let activity = select_activity(&tx, enrollment.activity_id)?
          .ok_or(rusqlite::Error::QueryReturnedNoRows)?;

        tx.commit()?;
        Ok(Ok((enrollment, activity)))
      })
      .await?;

    decode_checked(raw, |(e, a)| Ok((e.into_enrollment()?, a.into_activity()?)))
  }
}
