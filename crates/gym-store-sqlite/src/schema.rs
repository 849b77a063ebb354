//! SQL schema for the gym SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! schema revision for future migrations.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id       INTEGER PRIMARY KEY AUTOINCREMENT,
    username      TEXT    NOT NULL UNIQUE,
    name          TEXT,
    password_hash TEXT    NOT NULL,   -- argon2 PHC string
    is_admin      INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT    NOT NULL    -- RFC 3339 UTC
);

-- seats_available is the authoritative seat counter. The CHECK keeps it
-- within 0..=capacity whatever statement touches it.
CREATE TABLE IF NOT EXISTS activities (
    activity_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    name            TEXT    NOT NULL UNIQUE,
    instructor      TEXT    NOT NULL,
    category        TEXT    NOT NULL,
    description     TEXT    NOT NULL DEFAULT '',
    day             TEXT    NOT NULL,   -- 'Mon' .. 'Sun'
    starts_at       TEXT    NOT NULL,   -- HH:MM:SS local time
    ends_at         TEXT    NOT NULL,
    capacity        INTEGER NOT NULL CHECK (capacity > 0),
    seats_available INTEGER NOT NULL,
    created_at      TEXT    NOT NULL,
    CHECK (seats_available >= 0 AND seats_available <= capacity)
);

-- Enrollments are never deleted; cancellation flips status.
CREATE TABLE IF NOT EXISTS enrollments (
    enrollment_id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id       INTEGER NOT NULL REFERENCES users(user_id),
    activity_id   INTEGER NOT NULL REFERENCES activities(activity_id),
    status        TEXT    NOT NULL DEFAULT 'active'
                  CHECK (status IN ('active', 'cancelled')),
    created_at    TEXT    NOT NULL,
    cancelled_at  TEXT
);

-- At most one active enrollment per (user, activity).
CREATE UNIQUE INDEX IF NOT EXISTS enrollments_one_active_idx
    ON enrollments(user_id, activity_id) WHERE status = 'active';

CREATE INDEX IF NOT EXISTS enrollments_user_idx     ON enrollments(user_id);
CREATE INDEX IF NOT EXISTS enrollments_activity_idx ON enrollments(activity_id);
CREATE INDEX IF NOT EXISTS activities_category_idx  ON activities(category);
CREATE INDEX IF NOT EXISTS activities_day_idx       ON activities(day);

PRAGMA user_version = 1;
";
