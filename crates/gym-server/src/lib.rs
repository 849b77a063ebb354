//! Process-level wiring for the gym server: configuration, HTTP layers and
//! startup seeding. The binary in `main.rs` is a thin shell over this.

pub mod config;

use std::time::Duration;

use anyhow::Context as _;
use axum::{
  Router,
  http::{HeaderName, HeaderValue, Method, header},
};
use gym_api::{AppState, caller::USER_ID_HEADER};
use gym_core::{store::GymStore, user::NewUser};
use tower_http::{
  cors::{AllowOrigin, CorsLayer},
  trace::TraceLayer,
};

pub use config::ServerConfig;

/// Browsers may cache a preflight answer for this long.
const CORS_MAX_AGE: Duration = Duration::from_secs(12 * 60 * 60);

/// CORS policy for the configured front-end origins.
pub fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
  let origins = origins
    .iter()
    .map(|o| {
      HeaderValue::from_str(o).with_context(|| format!("invalid CORS origin {o:?}"))
    })
    .collect::<anyhow::Result<Vec<_>>>()?;

  Ok(
    CorsLayer::new()
      .allow_origin(AllowOrigin::list(origins))
      .allow_methods([
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
      ])
      .allow_headers([
        header::CONTENT_TYPE,
        header::AUTHORIZATION,
        HeaderName::from_static(USER_ID_HEADER),
      ])
      .allow_credentials(true)
      .max_age(CORS_MAX_AGE),
  )
}

/// The API router wrapped in request tracing and CORS.
pub fn app<S>(state: AppState<S>, config: &ServerConfig) -> anyhow::Result<Router>
where
  S: GymStore + 'static,
{
  Ok(
    gym_api::api_router(state)
      .layer(TraceLayer::new_for_http())
      .layer(cors_layer(&config.cors_origins)?),
  )
}

/// Hash a password line read for `--hash-password`. The trailing newline is
/// not part of the password.
pub fn hash_password_line(line: &str) -> anyhow::Result<String> {
  let plain = line.trim_end_matches(['\n', '\r']);
  gym_api::password::hash(plain).context("failed to hash password")
}

/// Create the configured admin account unless a user with that name exists.
/// Returns whether a user was created.
pub async fn seed_admin<S: GymStore>(
  store: &S,
  config: &ServerConfig,
) -> anyhow::Result<bool> {
  let Some((username, password_hash)) = config.admin_seed() else {
    return Ok(false);
  };

  let existing = store
    .get_user_by_username(username)
    .await
    .context("failed to look up admin user")?;
  if existing.is_some() {
    return Ok(false);
  }

  let input = NewUser {
    username:      username.to_string(),
    name:          None,
    password_hash: password_hash.to_string(),
    is_admin:      true,
  };
  input.validate().context("invalid admin user configuration")?;

  let admin = store
    .create_user(input)
    .await
    .context("failed to create admin user")?
    .map_err(|c| anyhow::anyhow!("failed to create admin user: {c}"))?;
  tracing::info!(user_id = admin.user_id, username, "seeded admin user");
  Ok(true)
}

#[cfg(test)]
mod tests {
  use std::{path::PathBuf, sync::Arc};

  use axum::{body::Body, http::Request};
  use gym_core::store::UserStore as _;
  use gym_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  fn config() -> ServerConfig {
    ServerConfig {
      host:                   "127.0.0.1".to_string(),
      port:                   0,
      store_path:             PathBuf::from(":memory:"),
      cors_origins:           vec!["http://localhost:3000".to_string()],
      restore_seat_on_cancel: false,
      admin_username:         Some("root".to_string()),
      admin_password_hash:    Some(
        "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
      ),
    }
  }

  #[tokio::test]
  async fn admin_is_seeded_once() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let cfg = config();

    assert!(seed_admin(&store, &cfg).await.unwrap());
    assert!(!seed_admin(&store, &cfg).await.unwrap());

    let admin = store.get_user_by_username("root").await.unwrap().unwrap();
    assert!(admin.is_admin);
  }

  #[tokio::test]
  async fn seeding_is_skipped_without_credentials() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let cfg = ServerConfig { admin_password_hash: None, ..config() };
    assert!(!seed_admin(&store, &cfg).await.unwrap());
    assert!(store.list_users().await.unwrap().is_empty());
  }

  #[test]
  fn hashed_password_line_verifies_without_newline() {
    let phc = hash_password_line("s3cret\r\n").unwrap();
    assert!(gym_api::password::verify("s3cret", &phc));
    assert!(!gym_api::password::verify("s3cret\n", &phc));
    assert!(hash_password_line("\n").is_err());
  }

  #[test]
  fn bad_origin_is_rejected() {
    assert!(cors_layer(&["bad\norigin".to_string()]).is_err());
  }

  #[tokio::test]
  async fn preflight_allows_configured_origin() {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let cfg = config();
    let state = AppState::new(store, cfg.policy());
    let app = app(state, &cfg).unwrap();

    let req = Request::builder()
      .method("OPTIONS")
      .uri("/activities")
      .header(header::ORIGIN, "http://localhost:3000")
      .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
      .body(Body::empty())
      .unwrap();
    let res = app.oneshot(req).await.unwrap();

    assert_eq!(
      res.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
      "http://localhost:3000"
    );
    assert_eq!(res.headers()[header::ACCESS_CONTROL_MAX_AGE], "43200");
  }
}
