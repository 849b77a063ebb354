//! Router tests: requests go through `api_router` via `oneshot` against an
//! in-memory store.

use std::sync::Arc;

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
  response::Response,
};
use gym_core::{service::EnrollmentPolicy, store::UserStore, user::NewUser};
use gym_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{AppState, api_router, caller::USER_ID_HEADER, password};

struct Fixture {
  state:    AppState<SqliteStore>,
  admin_id: i64,
}

async fn fixture() -> Fixture {
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let admin = store
    .create_user(NewUser {
      username:      "admin".into(),
      name:          None,
      password_hash: password::hash("root").unwrap(),
      is_admin:      true,
    })
    .await
    .unwrap()
    .unwrap();
  Fixture {
    state:    AppState::new(store, EnrollmentPolicy::default()),
    admin_id: admin.user_id,
  }
}

async fn send(
  state: &AppState<SqliteStore>,
  method: &str,
  uri: &str,
  caller: Option<i64>,
  body: Option<Value>,
) -> Response {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(id) = caller {
    builder = builder.header(USER_ID_HEADER, id.to_string());
  }
  let body = match body {
    Some(v) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(v.to_string())
    }
    None => Body::empty(),
  };
  api_router(state.clone())
    .oneshot(builder.body(body).unwrap())
    .await
    .unwrap()
}

async fn json_body(res: Response) -> Value {
  let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
    .await
    .unwrap();
  serde_json::from_slice(&bytes).unwrap()
}

async fn register(state: &AppState<SqliteStore>, username: &str) -> i64 {
  let res = send(
    state,
    "POST",
    "/users",
    None,
    Some(json!({ "username": username, "password": "pw" })),
  )
  .await;
  assert_eq!(res.status(), StatusCode::CREATED);
  json_body(res).await["user_id"].as_i64().unwrap()
}

fn activity_body(name: &str, capacity: u32) -> Value {
  json!({
    "name": name,
    "instructor": "Ana",
    "category": "wellness",
    "schedule": { "day": "Mon", "starts_at": "09:00:00", "ends_at": "10:00:00" },
    "capacity": capacity,
  })
}

async fn create_activity(f: &Fixture, name: &str, capacity: u32) -> i64 {
  let res = send(
    &f.state,
    "POST",
    "/activities",
    Some(f.admin_id),
    Some(activity_body(name, capacity)),
  )
  .await;
  assert_eq!(res.status(), StatusCode::CREATED);
  json_body(res).await["activity_id"].as_i64().unwrap()
}

// ── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn register_hides_password_hash() {
  let f = fixture().await;
  let res = send(
    &f.state,
    "POST",
    "/users",
    None,
    Some(json!({ "username": "alice", "password": "pw", "name": "Alice" })),
  )
  .await;
  assert_eq!(res.status(), StatusCode::CREATED);
  let body = json_body(res).await;
  assert_eq!(body["username"], "alice");
  assert_eq!(body["is_admin"], false);
  assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
  let f = fixture().await;
  register(&f.state, "alice").await;
  let res = send(
    &f.state,
    "POST",
    "/users",
    None,
    Some(json!({ "username": "alice", "password": "other" })),
  )
  .await;
  assert_eq!(res.status(), StatusCode::CONFLICT);
  assert_eq!(json_body(res).await["code"], "username_taken");
}

#[tokio::test]
async fn login_checks_password() {
  let f = fixture().await;
  register(&f.state, "alice").await;

  let ok = send(
    &f.state,
    "POST",
    "/users/login",
    None,
    Some(json!({ "username": "alice", "password": "pw" })),
  )
  .await;
  assert_eq!(ok.status(), StatusCode::OK);
  assert_eq!(json_body(ok).await["username"], "alice");

  for (username, pw) in [("alice", "wrong"), ("nobody", "pw")] {
    let res = send(
      &f.state,
      "POST",
      "/users/login",
      None,
      Some(json!({ "username": username, "password": pw })),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
  }
}

#[tokio::test]
async fn only_admins_list_users() {
  let f = fixture().await;
  let alice = register(&f.state, "alice").await;

  let anon = send(&f.state, "GET", "/users", None, None).await;
  assert_eq!(anon.status(), StatusCode::UNAUTHORIZED);

  let member = send(&f.state, "GET", "/users", Some(alice), None).await;
  assert_eq!(member.status(), StatusCode::FORBIDDEN);

  let admin = send(&f.state, "GET", "/users", Some(f.admin_id), None).await;
  assert_eq!(admin.status(), StatusCode::OK);
  assert_eq!(json_body(admin).await.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn users_update_themselves_but_cannot_self_promote() {
  let f = fixture().await;
  let alice = register(&f.state, "alice").await;
  let bob = register(&f.state, "bob").await;
  let uri = format!("/users/{alice}");

  let renamed = send(
    &f.state,
    "PUT",
    &uri,
    Some(alice),
    Some(json!({ "name": "Alice L." })),
  )
  .await;
  assert_eq!(renamed.status(), StatusCode::OK);
  assert_eq!(json_body(renamed).await["name"], "Alice L.");

  let promote = send(
    &f.state,
    "PUT",
    &uri,
    Some(alice),
    Some(json!({ "is_admin": true })),
  )
  .await;
  assert_eq!(promote.status(), StatusCode::FORBIDDEN);

  let stranger = send(
    &f.state,
    "PUT",
    &uri,
    Some(bob),
    Some(json!({ "name": "hijacked" })),
  )
  .await;
  assert_eq!(stranger.status(), StatusCode::FORBIDDEN);

  let by_admin = send(
    &f.state,
    "PUT",
    &uri,
    Some(f.admin_id),
    Some(json!({ "is_admin": true })),
  )
  .await;
  assert_eq!(by_admin.status(), StatusCode::OK);
  assert_eq!(json_body(by_admin).await["is_admin"], true);
}

#[tokio::test]
async fn unknown_user_is_404() {
  let f = fixture().await;
  let res = send(&f.state, "GET", "/users/999", None, None).await;
  assert_eq!(res.status(), StatusCode::NOT_FOUND);

  let res = send(&f.state, "GET", "/users/0", None, None).await;
  assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

// ── Activities ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn creating_activities_requires_admin() {
  let f = fixture().await;
  let alice = register(&f.state, "alice").await;

  let res = send(
    &f.state,
    "POST",
    "/activities",
    Some(alice),
    Some(activity_body("Yoga", 10)),
  )
  .await;
  assert_eq!(res.status(), StatusCode::FORBIDDEN);

  let id = create_activity(&f, "Yoga", 10).await;
  let res = send(&f.state, "GET", &format!("/activities/{id}"), None, None).await;
  assert_eq!(res.status(), StatusCode::OK);
  let body = json_body(res).await;
  assert_eq!(body["seats_available"], 10);
  assert_eq!(body["schedule"]["day"], "Mon");
}

#[tokio::test]
async fn invalid_activity_is_400() {
  let f = fixture().await;
  let mut body = activity_body("Yoga", 10);
  body["schedule"]["ends_at"] = json!("08:00:00");
  let res = send(&f.state, "POST", "/activities", Some(f.admin_id), Some(body)).await;
  assert_eq!(res.status(), StatusCode::BAD_REQUEST);

  let res = send(
    &f.state,
    "POST",
    "/activities",
    Some(f.admin_id),
    Some(activity_body("Yoga", 0)),
  )
  .await;
  assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_activities_with_filters() {
  let f = fixture().await;
  let yoga = create_activity(&f, "Yoga", 10).await;
  let boxing = create_activity(&f, "Boxing", 1).await;
  send(
    &f.state,
    "PUT",
    &format!("/activities/{boxing}/seats"),
    Some(f.admin_id),
    Some(json!({ "seats_available": 0 })),
  )
  .await;

  let all = send(&f.state, "GET", "/activities", None, None).await;
  assert_eq!(json_body(all).await.as_array().unwrap().len(), 2);

  let open = send(&f.state, "GET", "/activities?available=true", None, None).await;
  let open = json_body(open).await;
  assert_eq!(open.as_array().unwrap().len(), 1);
  assert_eq!(open[0]["activity_id"], yoga);

  let named = send(&f.state, "GET", "/activities?name=box", None, None).await;
  assert_eq!(json_body(named).await[0]["activity_id"], boxing);

  let tuesday = send(&f.state, "GET", "/activities?day=Tue", None, None).await;
  assert!(json_body(tuesday).await.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn seat_override_is_bounded_by_capacity() {
  let f = fixture().await;
  let id = create_activity(&f, "Yoga", 5).await;
  let uri = format!("/activities/{id}/seats");

  let negative = send(
    &f.state,
    "PUT",
    &uri,
    Some(f.admin_id),
    Some(json!({ "seats_available": -1 })),
  )
  .await;
  assert_eq!(negative.status(), StatusCode::BAD_REQUEST);

  let above = send(
    &f.state,
    "PUT",
    &uri,
    Some(f.admin_id),
    Some(json!({ "seats_available": 6 })),
  )
  .await;
  assert_eq!(above.status(), StatusCode::CONFLICT);
  assert_eq!(json_body(above).await["code"], "seats_exceed_free");

  let res = send(
    &f.state,
    "PUT",
    &uri,
    Some(f.admin_id),
    Some(json!({ "seats_available": 2 })),
  )
  .await;
  assert_eq!(res.status(), StatusCode::OK);
  assert_eq!(json_body(res).await["seats_available"], 2);
}

#[tokio::test]
async fn admin_edits_cannot_overbook_a_full_activity() {
  let f = fixture().await;
  let id = create_activity(&f, "Yoga", 2).await;
  for name in ["p1", "p2"] {
    let user = register(&f.state, name).await;
    let res = send(
      &f.state,
      "POST",
      "/enrollments",
      Some(user),
      Some(json!({ "user_id": user, "activity_id": id })),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
  }

  let reopen = send(
    &f.state,
    "PUT",
    &format!("/activities/{id}/seats"),
    Some(f.admin_id),
    Some(json!({ "seats_available": 2 })),
  )
  .await;
  assert_eq!(reopen.status(), StatusCode::CONFLICT);
  assert_eq!(json_body(reopen).await["code"], "seats_exceed_free");

  let shrink = send(
    &f.state,
    "PUT",
    &format!("/activities/{id}"),
    Some(f.admin_id),
    Some(json!({ "capacity": 1 })),
  )
  .await;
  assert_eq!(shrink.status(), StatusCode::CONFLICT);
  assert_eq!(json_body(shrink).await["code"], "capacity_below_enrolled");

  let p3 = register(&f.state, "p3").await;
  let late = send(
    &f.state,
    "POST",
    "/enrollments",
    Some(p3),
    Some(json!({ "user_id": p3, "activity_id": id })),
  )
  .await;
  assert_eq!(late.status(), StatusCode::CONFLICT);
  assert_eq!(json_body(late).await["code"], "no_slots_available");
}

#[tokio::test]
async fn deleting_referenced_activity_conflicts() {
  let f = fixture().await;
  let alice = register(&f.state, "alice").await;
  let id = create_activity(&f, "Yoga", 5).await;
  send(
    &f.state,
    "POST",
    "/enrollments",
    Some(alice),
    Some(json!({ "user_id": alice, "activity_id": id })),
  )
  .await;

  let uri = format!("/activities/{id}");
  let res = send(&f.state, "DELETE", &uri, Some(f.admin_id), None).await;
  assert_eq!(res.status(), StatusCode::CONFLICT);
  assert_eq!(json_body(res).await["code"], "in_use");

  let spare = create_activity(&f, "Pilates", 5).await;
  let uri = format!("/activities/{spare}");
  let res = send(&f.state, "DELETE", &uri, Some(f.admin_id), None).await;
  assert_eq!(res.status(), StatusCode::NO_CONTENT);
  let res = send(&f.state, "DELETE", &uri, Some(f.admin_id), None).await;
  assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

// ── Enrollments ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn enrollment_lifecycle() {
  let f = fixture().await;
  let alice = register(&f.state, "alice").await;
  let bob = register(&f.state, "bob").await;
  let yoga = create_activity(&f, "Yoga", 1).await;
  let pair = json!({ "user_id": alice, "activity_id": yoga });

  let created = send(&f.state, "POST", "/enrollments", Some(alice), Some(pair.clone())).await;
  assert_eq!(created.status(), StatusCode::CREATED);
  let created = json_body(created).await;
  assert_eq!(created["status"], "active");
  assert_eq!(created["activity"]["seats_available"], 0);
  assert_eq!(created["user"]["username"], "alice");
  let id = created["enrollment_id"].as_i64().unwrap();

  let dup = send(&f.state, "POST", "/enrollments", Some(alice), Some(pair)).await;
  assert_eq!(dup.status(), StatusCode::CONFLICT);
  assert_eq!(json_body(dup).await["code"], "already_enrolled");

  let full = send(
    &f.state,
    "POST",
    "/enrollments",
    Some(bob),
    Some(json!({ "user_id": bob, "activity_id": yoga })),
  )
  .await;
  assert_eq!(full.status(), StatusCode::CONFLICT);
  assert_eq!(json_body(full).await["code"], "no_slots_available");

  let active = send(
    &f.state,
    "GET",
    &format!("/enrollments/active?user_id={alice}&activity_id={yoga}"),
    None,
    None,
  )
  .await;
  assert_eq!(active.status(), StatusCode::OK);
  assert_eq!(json_body(active).await["enrollment_id"], id);

  let listed = send(&f.state, "GET", &format!("/users/{alice}/enrollments"), None, None).await;
  assert_eq!(json_body(listed).await.as_array().unwrap().len(), 1);

  let uri = format!("/enrollments/{id}");
  let stranger = send(&f.state, "DELETE", &uri, Some(bob), None).await;
  assert_eq!(stranger.status(), StatusCode::NOT_FOUND);

  let anon = send(&f.state, "DELETE", &uri, None, None).await;
  assert_eq!(anon.status(), StatusCode::UNAUTHORIZED);

  let cancelled = send(&f.state, "DELETE", &uri, Some(alice), None).await;
  assert_eq!(cancelled.status(), StatusCode::OK);
  let cancelled = json_body(cancelled).await;
  assert_eq!(cancelled["status"], "cancelled");
  assert!(cancelled["cancelled_at"].is_string());

  let again = send(&f.state, "DELETE", &uri, Some(alice), None).await;
  assert_eq!(again.status(), StatusCode::CONFLICT);
  assert_eq!(json_body(again).await["code"], "not_active");

  let fetched = send(&f.state, "GET", &uri, None, None).await;
  assert_eq!(json_body(fetched).await["status"], "cancelled");

  let gone = send(
    &f.state,
    "GET",
    &format!("/enrollments/active?user_id={alice}&activity_id={yoga}"),
    None,
    None,
  )
  .await;
  assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn members_enroll_only_themselves() {
  let f = fixture().await;
  let alice = register(&f.state, "alice").await;
  let bob = register(&f.state, "bob").await;
  let yoga = create_activity(&f, "Yoga", 5).await;
  let for_bob = json!({ "user_id": bob, "activity_id": yoga });

  let anon = send(&f.state, "POST", "/enrollments", None, Some(for_bob.clone())).await;
  assert_eq!(anon.status(), StatusCode::UNAUTHORIZED);

  let by_alice =
    send(&f.state, "POST", "/enrollments", Some(alice), Some(for_bob.clone())).await;
  assert_eq!(by_alice.status(), StatusCode::FORBIDDEN);

  let by_admin =
    send(&f.state, "POST", "/enrollments", Some(f.admin_id), Some(for_bob)).await;
  assert_eq!(by_admin.status(), StatusCode::CREATED);
  assert_eq!(json_body(by_admin).await["user"]["user_id"], bob);
}

#[tokio::test]
async fn enrolling_unknown_records_is_404() {
  let f = fixture().await;
  let alice = register(&f.state, "alice").await;

  let res = send(
    &f.state,
    "POST",
    "/enrollments",
    Some(alice),
    Some(json!({ "user_id": alice, "activity_id": 404 })),
  )
  .await;
  assert_eq!(res.status(), StatusCode::NOT_FOUND);
  assert_eq!(json_body(res).await["error"], "activity 404 not found");

  let res = send(
    &f.state,
    "POST",
    "/enrollments",
    Some(f.admin_id),
    Some(json!({ "user_id": -1, "activity_id": 1 })),
  )
  .await;
  assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
