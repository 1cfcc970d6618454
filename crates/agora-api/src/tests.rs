//! HTTP-level behaviour of the API router.

use std::sync::Arc;

use agora_core::{Id, clock::ManualClock, profile::Role, store::SocialStore};
use agora_engine::{Engine, EngineConfig};
use agora_store_sqlite::SqliteStore;
use axum::{
  body::Body,
  http::{Request, StatusCode, header},
  response::Response,
};
use chrono::{Duration, TimeZone, Utc};
use serde_json::{Value, json};
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::{api_router, auth::USER_ID_HEADER};

type TestEngine = Engine<SqliteStore, ManualClock>;

async fn make_engine(config: EngineConfig) -> (Arc<TestEngine>, ManualClock) {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap());
  (Arc::new(Engine::new(Arc::new(store), clock.clone(), config)), clock)
}

async fn oneshot(
  engine: &Arc<TestEngine>,
  method: &str,
  uri: &str,
  viewer: Option<Id>,
  body: Option<Value>,
) -> Response {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(id) = viewer {
    builder = builder.header(USER_ID_HEADER, id.to_string());
  }
  let body = match body {
    Some(json) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(json.to_string())
    }
    None => Body::empty(),
  };
  api_router(engine.clone()).oneshot(builder.body(body).unwrap()).await.unwrap()
}

async fn json_body(resp: Response) -> Value {
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  serde_json::from_slice(&bytes).unwrap()
}

async fn signup(engine: &Arc<TestEngine>, username: &str) -> Id {
  let id = Uuid::new_v4();
  let body = json!({ "username": username, "display_name": username });
  let resp = oneshot(engine, "POST", "/me", Some(id), Some(body)).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  id
}

// ── Authentication ───────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_viewer_is_unauthenticated() {
  let (engine, _) = make_engine(EngineConfig::default()).await;
  let resp = oneshot(&engine, "GET", "/feed/home", None, None).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert_eq!(json_body(resp).await["kind"], "unauthenticated");
}

#[tokio::test]
async fn malformed_viewer_header_is_unauthenticated() {
  let (engine, _) = make_engine(EngineConfig::default()).await;
  let req = Request::builder()
    .uri("/feed/explore")
    .header(USER_ID_HEADER, "not-a-uuid")
    .body(Body::empty())
    .unwrap();
  let resp = api_router(engine).oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn anonymous_explore_is_allowed() {
  let (engine, _) = make_engine(EngineConfig::default()).await;
  let resp = oneshot(&engine, "GET", "/feed/explore", None, None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(json_body(resp).await["items"], json!([]));
}

// ── Happy path ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn follow_post_and_read_home_feed() {
  let (engine, clock) =
    make_engine(EngineConfig { post_cooldown_secs: 0, ..Default::default() }).await;
  let alice = signup(&engine, "alice").await;
  let bob = signup(&engine, "bob").await;

  let resp = oneshot(&engine, "PUT", &format!("/profiles/{alice}/follow"), Some(bob), None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(json_body(resp).await, json!({ "active": true, "changed": true }));

  let resp = oneshot(&engine, "POST", "/posts", Some(alice), Some(json!({ "body": "hello" }))).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let post_id = json_body(resp).await["id"].as_str().unwrap().to_owned();

  clock.advance(Duration::seconds(1));
  oneshot(&engine, "POST", "/posts", Some(alice), Some(json!({ "body": "world" }))).await;

  let resp = oneshot(&engine, "PUT", &format!("/posts/{post_id}/like"), Some(bob), None).await;
  assert_eq!(json_body(resp).await["like_count"], 1);

  let feed = json_body(oneshot(&engine, "GET", "/feed/home", Some(bob), None).await).await;
  let bodies: Vec<_> = feed["items"]
    .as_array()
    .unwrap()
    .iter()
    .map(|i| i["post"]["body"].as_str().unwrap().to_owned())
    .collect();
  assert_eq!(bodies, ["world", "hello"]);
  assert_eq!(feed["items"][1]["engagement"]["viewer_has_liked"], true);

  let unread =
    json_body(oneshot(&engine, "GET", "/notifications/unread", Some(alice), None).await).await;
  assert_eq!(unread["unread"], 2);
}

#[tokio::test]
async fn paging_through_home_feed_with_cursor() {
  let (engine, clock) =
    make_engine(EngineConfig { post_cooldown_secs: 0, ..Default::default() }).await;
  let alice = signup(&engine, "alice").await;
  for n in 0..3 {
    clock.advance(Duration::seconds(1));
    let body = json!({ "body": format!("post {n}") });
    oneshot(&engine, "POST", "/posts", Some(alice), Some(body)).await;
  }

  let first = json_body(oneshot(&engine, "GET", "/feed/home?limit=2", Some(alice), None).await).await;
  assert_eq!(first["items"].as_array().unwrap().len(), 2);
  let cursor = first["next_cursor"].as_str().unwrap();

  let uri = format!("/feed/home?limit=2&cursor={cursor}");
  let second = json_body(oneshot(&engine, "GET", &uri, Some(alice), None).await).await;
  assert_eq!(second["items"][0]["post"]["body"], "post 0");
  assert!(second["next_cursor"].is_null());
}

// ── Error mapping ────────────────────────────────────────────────────────────

#[tokio::test]
async fn second_post_inside_cooldown_is_rate_limited() {
  let (engine, _) = make_engine(EngineConfig::default()).await;
  let alice = signup(&engine, "alice").await;

  let first = oneshot(&engine, "POST", "/posts", Some(alice), Some(json!({ "body": "one" }))).await;
  assert_eq!(first.status(), StatusCode::CREATED);

  let second = oneshot(&engine, "POST", "/posts", Some(alice), Some(json!({ "body": "two" }))).await;
  assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
  assert_eq!(second.headers().get(header::RETRY_AFTER).unwrap(), "60");
  assert_eq!(json_body(second).await["kind"], "rate_limited");
}

#[tokio::test]
async fn taken_username_is_a_conflict() {
  let (engine, _) = make_engine(EngineConfig::default()).await;
  signup(&engine, "alice").await;

  let body = json!({ "username": "ALICE", "display_name": "Impostor" });
  let resp = oneshot(&engine, "POST", "/me", Some(Uuid::new_v4()), Some(body)).await;
  assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn following_yourself_is_forbidden() {
  let (engine, _) = make_engine(EngineConfig::default()).await;
  let alice = signup(&engine, "alice").await;
  let resp = oneshot(&engine, "PUT", &format!("/profiles/{alice}/follow"), Some(alice), None).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn blank_post_is_unprocessable() {
  let (engine, _) = make_engine(EngineConfig::default()).await;
  let alice = signup(&engine, "alice").await;
  let resp = oneshot(&engine, "POST", "/posts", Some(alice), Some(json!({ "body": "   " }))).await;
  assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(json_body(resp).await["kind"], "validation");
}

#[tokio::test]
async fn malformed_path_id_is_a_bad_request() {
  let (engine, _) = make_engine(EngineConfig::default()).await;
  let resp = oneshot(&engine, "GET", "/posts/not-a-uuid", None, None).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert_eq!(json_body(resp).await["kind"], "bad_request");
}

#[tokio::test]
async fn unknown_post_is_not_found() {
  let (engine, _) = make_engine(EngineConfig::default()).await;
  let resp = oneshot(&engine, "GET", &format!("/posts/{}", Uuid::new_v4()), None, None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_someone_elses_post_is_forbidden() {
  let (engine, _) = make_engine(EngineConfig::default()).await;
  let alice = signup(&engine, "alice").await;
  let bob = signup(&engine, "bob").await;
  let resp = oneshot(&engine, "POST", "/posts", Some(alice), Some(json!({ "body": "mine" }))).await;
  let post_id = json_body(resp).await["id"].as_str().unwrap().to_owned();

  let uri = format!("/posts/{post_id}");
  assert_eq!(oneshot(&engine, "DELETE", &uri, Some(bob), None).await.status(), StatusCode::FORBIDDEN);
  assert_eq!(
    oneshot(&engine, "DELETE", &uri, Some(alice), None).await.status(),
    StatusCode::NO_CONTENT
  );
  assert_eq!(oneshot(&engine, "GET", &uri, None, None).await.status(), StatusCode::NOT_FOUND);
}

// ── Admin ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn verification_review_requires_admin() {
  let (engine, _) = make_engine(EngineConfig::default()).await;
  let alice = signup(&engine, "alice").await;
  let root = signup(&engine, "root").await;
  engine.store().set_role(root, Role::Admin).await.unwrap();

  let body = json!({ "bio": "I make things", "links": { "site": "https://alice.example" } });
  let resp = oneshot(&engine, "POST", "/verification", Some(alice), Some(body.clone())).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let request_id = json_body(resp).await["id"].as_str().unwrap().to_owned();

  let again = oneshot(&engine, "POST", "/verification", Some(alice), Some(body)).await;
  assert_eq!(again.status(), StatusCode::CONFLICT);

  let resp = oneshot(&engine, "GET", "/admin/verifications", Some(alice), None).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let queue = json_body(oneshot(&engine, "GET", "/admin/verifications", Some(root), None).await).await;
  assert_eq!(queue.as_array().unwrap().len(), 1);

  let uri = format!("/admin/verifications/{request_id}");
  let one = json_body(oneshot(&engine, "GET", &uri, Some(root), None).await).await;
  assert_eq!(one["status"], "pending");
  assert_eq!(one["applicant"]["username"], "alice");
  let resp = oneshot(&engine, "GET", &uri, Some(alice), None).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let uri = format!("/admin/verifications/{request_id}/decision");
  let decided =
    oneshot(&engine, "POST", &uri, Some(root), Some(json!({ "decision": "approve" }))).await;
  assert_eq!(decided.status(), StatusCode::OK);
  assert_eq!(json_body(decided).await["status"], "approved");

  let me = json_body(oneshot(&engine, "GET", "/me", Some(alice), None).await).await;
  assert_eq!(me["profile"]["is_verified"], true);
}

#[tokio::test]
async fn admins_curate_the_recommended_list() {
  let (engine, _) = make_engine(EngineConfig::default()).await;
  let viewer = signup(&engine, "viewer").await;
  let chef = signup(&engine, "chef").await;
  let root = signup(&engine, "root").await;
  engine.store().set_role(root, Role::Admin).await.unwrap();

  let uri = format!("/admin/recommended/{chef}");
  let resp = oneshot(&engine, "PUT", &uri, Some(viewer), None).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  let added = json_body(oneshot(&engine, "PUT", &uri, Some(root), None).await).await;
  assert_eq!(added, json!({ "active": true, "changed": true }));

  let list = json_body(oneshot(&engine, "GET", "/users/recommended", Some(viewer), None).await).await;
  assert_eq!(list.as_array().unwrap().len(), 1);
  assert_eq!(list[0]["username"], "chef");

  let resp = oneshot(&engine, "GET", "/users/recommended", None, None).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

  let removed = json_body(oneshot(&engine, "DELETE", &uri, Some(root), None).await).await;
  assert_eq!(removed["changed"], true);
  let list = json_body(oneshot(&engine, "GET", "/users/recommended", Some(viewer), None).await).await;
  assert_eq!(list, json!([]));
}
