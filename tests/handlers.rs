//! HTTP-level checks of the profile, follow and edit-profile routes.
//!
//! Needs PostgreSQL at `TEST_DATABASE_URL`; without it every test returns early.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{Duration, Utc};
use serde_json::{json, Value};

use actix_web::{test, App};
use actix_web::http::StatusCode;

use microblog::app::AppConfig;
use microblog::auth::GenerateJwt;
use microblog::db::{DbService, NICKNAME_IN_USE};
use microblog::models::*;
use microblog::services::{config_services, Services};

static SCHEMA_READY: Mutex<bool> = Mutex::new(false);
static COUNTER: AtomicUsize = AtomicUsize::new(0);

struct Fixture {
  db: DbService,
  services: Services,
}

async fn setup() -> Option<Fixture> {
  let url = match std::env::var("TEST_DATABASE_URL") {
    Ok(url) => url,
    Err(_) => {
      eprintln!("TEST_DATABASE_URL not set, skipping.");
      return None;
    },
  };
  std::env::set_var("JWT_SECRET", "handler-tests");

  let db = DbService::new(&url).expect("db service");
  {
    let mut ready = SCHEMA_READY.lock().unwrap();
    if !*ready {
      db.init_schema().await.expect("apply schema");
      *ready = true;
    }
  }

  let mut conf = config::Config::default();
  conf.set("db.url", url.as_str()).unwrap();
  conf.set("web.services", vec!["User", "Profile", "Post", "Search"]).unwrap();
  let services = config_services(&AppConfig::from_config(conf), "web").expect("services");
  Some(Fixture { db, services })
}

fn unique(prefix: &str) -> String {
  let now = Utc::now();
  format!("{}{}{}h{}", prefix, now.timestamp(), now.timestamp_subsec_nanos(),
    COUNTER.fetch_add(1, Ordering::SeqCst))
}

async fn register(db: &DbService, prefix: &str) -> User {
  let nickname = unique(prefix);
  db.user.register(&NewUser::new(&nickname, &format!("{}@x.com", nickname)))
    .await.expect("register user")
}

fn token_for(user: &User) -> String {
  format!("Token {}", user.generate_jwt(Duration::hours(1)).unwrap())
}

macro_rules! app {
  ($fixture:expr) => {
    test::init_service(App::new().configure(|web| $fixture.services.web_config(web))).await
  };
}

#[actix_rt::test]
async fn cannot_follow_or_unfollow_yourself() {
  let fx = match setup().await { Some(fx) => fx, None => return };
  let mut app = app!(fx);
  let alice = register(&fx.db, "alice").await;
  let uri = format!("/api/users/{}/follow", alice.nickname);

  let req = test::TestRequest::post().uri(&uri)
    .header("Authorization", token_for(&alice))
    .to_request();
  let res = test::call_service(&mut app, req).await;
  assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
  let body: Value = test::read_body_json(res).await;
  assert_eq!(body, json!({"error": "You can't follow yourself!"}));

  let req = test::TestRequest::delete().uri(&uri)
    .header("Authorization", token_for(&alice))
    .to_request();
  let res = test::call_service(&mut app, req).await;
  assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

  // the bootstrap self edge survives both attempts.
  assert!(fx.db.follow.is_following(&alice, &alice).await.unwrap());
  assert_eq!(fx.db.follow.counts(&alice).await.unwrap(), (0, 0));
}

#[actix_rt::test]
async fn unknown_nickname_is_not_found() {
  let fx = match setup().await { Some(fx) => fx, None => return };
  let mut app = app!(fx);
  let alice = register(&fx.db, "alice").await;
  let ghost = unique("ghost");

  let req = test::TestRequest::post().uri(&format!("/api/users/{}/follow", ghost))
    .header("Authorization", token_for(&alice))
    .to_request();
  let res = test::call_service(&mut app, req).await;
  assert_eq!(res.status(), StatusCode::NOT_FOUND);
  let body: Value = test::read_body_json(res).await;
  assert_eq!(body, json!({"error": format!("User {} not found.", ghost)}));

  let req = test::TestRequest::get().uri(&format!("/api/users/{}", ghost)).to_request();
  let res = test::call_service(&mut app, req).await;
  assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn follow_and_unfollow_over_http() {
  let fx = match setup().await { Some(fx) => fx, None => return };
  let mut app = app!(fx);
  let alice = register(&fx.db, "alice").await;
  let bob = register(&fx.db, "bob").await;
  let uri = format!("/api/users/{}/follow", bob.nickname);

  let req = test::TestRequest::post().uri(&uri)
    .header("Authorization", token_for(&alice))
    .to_request();
  let body: Value = test::read_response_json(&mut app, req).await;
  assert_eq!(body, json!({
    "message": format!("You are now following {}!", bob.nickname),
    "following": true,
  }));

  let req = test::TestRequest::post().uri(&uri)
    .header("Authorization", token_for(&alice))
    .to_request();
  let body: Value = test::read_response_json(&mut app, req).await;
  assert_eq!(body["message"], json!(format!("Cannot follow {}.", bob.nickname)));
  assert_eq!(fx.db.follow.counts(&bob).await.unwrap(), (1, 0));

  let req = test::TestRequest::get().uri(&format!("/api/users/{}", bob.nickname))
    .header("Authorization", token_for(&alice))
    .to_request();
  let body: Value = test::read_response_json(&mut app, req).await;
  assert_eq!(body["profile"]["following"], json!(true));
  assert_eq!(body["profile"]["followers_count"], json!(1));

  let req = test::TestRequest::delete().uri(&uri)
    .header("Authorization", token_for(&alice))
    .to_request();
  let body: Value = test::read_response_json(&mut app, req).await;
  assert_eq!(body["message"], json!(format!("You have stopped following {}.", bob.nickname)));
  assert!(!fx.db.follow.is_following(&alice, &bob).await.unwrap());
}

#[actix_rt::test]
async fn edit_profile_refuses_taken_nickname() {
  let fx = match setup().await { Some(fx) => fx, None => return };
  let mut app = app!(fx);
  let alice = register(&fx.db, "alice").await;
  let bob = register(&fx.db, "bob").await;

  let req = test::TestRequest::put().uri("/api/user")
    .header("Authorization", token_for(&alice))
    .set_json(&json!({"nickname": bob.nickname, "about_me": "hi"}))
    .to_request();
  let res = test::call_service(&mut app, req).await;
  assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
  let body: Value = test::read_body_json(res).await;
  assert_eq!(body, json!({"error": NICKNAME_IN_USE}));

  let stored = fx.db.user.get_by_email(&alice.email).await.unwrap().unwrap();
  assert_eq!(stored.nickname, alice.nickname);

  let renamed = unique("alicia");
  let req = test::TestRequest::put().uri("/api/user")
    .header("Authorization", token_for(&alice))
    .set_json(&json!({"nickname": renamed, "about_me": "hi"}))
    .to_request();
  let body: Value = test::read_response_json(&mut app, req).await;
  assert_eq!(body["user"]["nickname"], json!(renamed));
}

#[actix_rt::test]
async fn routes_behind_auth_need_a_token() {
  let fx = match setup().await { Some(fx) => fx, None => return };
  let mut app = app!(fx);

  let req = test::TestRequest::get().uri("/api/feed").to_request();
  let res = test::call_service(&mut app, req).await;
  assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

  let req = test::TestRequest::get().uri("/api/feed")
    .header("Authorization", "Token not-a-jwt")
    .to_request();
  let res = test::call_service(&mut app, req).await;
  assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}
