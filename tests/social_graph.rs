//! Follow graph and feed queries against a real PostgreSQL database.
//!
//! Set `TEST_DATABASE_URL` to run them; without it every test returns early.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{NaiveDate, NaiveDateTime, Utc};

use microblog::auth::{identity, AuthData};
use microblog::db::DbService;
use microblog::forms::IdentityAssertion;
use microblog::models::*;
use microblog::session;

static SCHEMA_READY: Mutex<bool> = Mutex::new(false);
static COUNTER: AtomicUsize = AtomicUsize::new(0);

async fn connect() -> Option<DbService> {
  let url = match std::env::var("TEST_DATABASE_URL") {
    Ok(url) => url,
    Err(_) => {
      eprintln!("TEST_DATABASE_URL not set, skipping.");
      return None;
    },
  };
  let db = DbService::new(&url).expect("db service");
  let mut ready = SCHEMA_READY.lock().unwrap();
  if !*ready {
    db.init_schema().await.expect("apply schema");
    *ready = true;
  }
  Some(db)
}

/// Name that no earlier run has used.
fn unique(prefix: &str) -> String {
  let now = Utc::now();
  format!("{}{}{}n{}", prefix, now.timestamp(), now.timestamp_subsec_nanos(),
    COUNTER.fetch_add(1, Ordering::SeqCst))
}

async fn new_user(db: &DbService, prefix: &str) -> User {
  let nickname = unique(prefix);
  let email = format!("{}@x.com", nickname);
  db.user.create(&NewUser::new(&nickname, &email)).await.expect("create user")
}

fn at(secs: u32) -> NaiveDateTime {
  NaiveDate::from_ymd(2001, 1, 1).and_hms(0, 0, secs)
}

fn bodies(page: &Page<PostDetails>) -> Vec<&str> {
  page.items.iter().map(|p| p.body.as_str()).collect()
}

#[actix_rt::test]
async fn follow_then_unfollow() {
  let db = match connect().await { Some(db) => db, None => return };
  let a = new_user(&db, "a").await;
  let b = new_user(&db, "b").await;

  assert!(!db.follow.is_following(&a, &b).await.unwrap());
  let edge = db.follow.follow(&a, &b).await.unwrap();
  assert_eq!(edge, Some(FollowEdge { follower_id: a.id, followed_id: b.id }));
  assert!(db.follow.is_following(&a, &b).await.unwrap());
  // direction matters.
  assert!(!db.follow.is_following(&b, &a).await.unwrap());

  assert!(db.follow.unfollow(&a, &b).await.unwrap().is_some());
  assert!(!db.follow.is_following(&a, &b).await.unwrap());
}

#[actix_rt::test]
async fn follow_twice_keeps_one_edge() {
  let db = match connect().await { Some(db) => db, None => return };
  let a = new_user(&db, "a").await;
  let b = new_user(&db, "b").await;

  assert!(db.follow.follow(&a, &b).await.unwrap().is_some());
  assert_eq!(db.follow.follow(&a, &b).await.unwrap(), None);
  assert_eq!(db.follow.counts(&b).await.unwrap(), (1, 0));
  assert_eq!(db.follow.counts(&a).await.unwrap(), (0, 1));
}

#[actix_rt::test]
async fn unfollow_without_edge_is_noop() {
  let db = match connect().await { Some(db) => db, None => return };
  let a = new_user(&db, "a").await;
  let b = new_user(&db, "b").await;

  assert_eq!(db.follow.unfollow(&a, &b).await.unwrap(), None);
  assert!(!db.follow.is_following(&a, &b).await.unwrap());
  assert_eq!(db.follow.counts(&b).await.unwrap(), (0, 0));
}

#[actix_rt::test]
async fn followed_posts_are_newest_first() {
  let db = match connect().await { Some(db) => db, None => return };
  let a = new_user(&db, "a").await;
  let b = new_user(&db, "b").await;
  let c = new_user(&db, "c").await;
  let d = new_user(&db, "d").await;
  db.follow.follow(&a, &b).await.unwrap();
  db.follow.follow(&a, &c).await.unwrap();

  db.post.create(&NewPost::new("from b", b.id).at(at(1))).await.unwrap();
  db.post.create(&NewPost::new("from c", c.id).at(at(2))).await.unwrap();
  db.post.create(&NewPost::new("from d", d.id).at(at(3))).await.unwrap();

  let feed = db.post.followed_posts(&a, PageRequest::new(None, 10)).await.unwrap();
  assert_eq!(bodies(&feed), vec!["from c", "from b"]);
  assert_eq!(feed.total, 2);
  assert_eq!(feed.items[0].author.nickname, c.nickname);
}

#[actix_rt::test]
async fn feed_follows_the_edges() {
  let db = match connect().await { Some(db) => db, None => return };
  let alice = new_user(&db, "alice").await;
  let bob = new_user(&db, "bob").await;
  db.follow.follow(&alice, &bob).await.unwrap();
  db.post.create(&NewPost::new("hello", bob.id)).await.unwrap();

  let page = PageRequest::new(None, 10);
  let alice_feed = db.post.followed_posts(&alice, page).await.unwrap();
  assert_eq!(bodies(&alice_feed), vec!["hello"]);

  let bob_feed = db.post.followed_posts(&bob, page).await.unwrap();
  assert!(bob_feed.items.is_empty());

  // bootstrap convention: following yourself puts your posts in your feed.
  db.follow.follow(&bob, &bob).await.unwrap();
  let bob_feed = db.post.followed_posts(&bob, page).await.unwrap();
  assert_eq!(bodies(&bob_feed), vec!["hello"]);
}

#[actix_rt::test]
async fn unique_nickname_skips_taken_suffixes() {
  let db = match connect().await { Some(db) => db, None => return };
  let base = unique("bob");
  assert_eq!(db.user.make_unique_nickname(&base).await.unwrap(), base);

  db.user.create(&NewUser::new(&base, &format!("{}@x.com", base))).await.unwrap();
  let second = format!("{}2", base);
  assert_eq!(db.user.make_unique_nickname(&base).await.unwrap(), second);

  db.user.create(&NewUser::new(&second, &format!("{}@x.com", second))).await.unwrap();
  assert_eq!(db.user.make_unique_nickname(&base).await.unwrap(), format!("{}3", base));
}

#[actix_rt::test]
async fn registered_user_follows_itself() {
  let db = match connect().await { Some(db) => db, None => return };
  let nickname = unique("reg");
  let user = db.user.register(&NewUser::new(&nickname, &format!("{}@x.com", nickname)))
    .await.unwrap();

  assert!(db.follow.is_following(&user, &user).await.unwrap());
  assert_eq!(db.follow.counts(&user).await.unwrap(), (0, 0));

  db.post.create(&NewPost::new("my own post", user.id)).await.unwrap();
  let feed = db.post.followed_posts(&user, PageRequest::new(None, 10)).await.unwrap();
  assert_eq!(bodies(&feed), vec!["my own post"]);
}

#[actix_rt::test]
async fn login_assertion_registers_once() {
  let db = match connect().await { Some(db) => db, None => return };
  let local = unique("carol");
  let assertion = IdentityAssertion {
    email: Some(format!("{}@x.com", local)),
    nickname: None,
    remember_me: false,
  };

  let first = identity::resolve(&db, &assertion).await.unwrap();
  assert_eq!(first.nickname, local);
  assert!(db.follow.is_following(&first, &first).await.unwrap());

  let again = identity::resolve(&db, &assertion).await.unwrap();
  assert_eq!(again.id, first.id);

  // same asserted nickname, different email: de-duplicated.
  let other = IdentityAssertion {
    email: Some(format!("other.{}@x.com", local)),
    nickname: Some(local.clone()),
    remember_me: true,
  };
  let second = identity::resolve(&db, &other).await.unwrap();
  assert_eq!(second.nickname, format!("{}2", local));
}

#[actix_rt::test]
async fn missing_email_changes_nothing() {
  let db = match connect().await { Some(db) => db, None => return };
  let nickname = unique("ghost");
  let assertion = IdentityAssertion {
    email: None,
    nickname: Some(nickname.clone()),
    remember_me: false,
  };
  assert!(identity::resolve(&db, &assertion).await.is_err());
  assert!(db.user.get_by_nickname(&nickname).await.unwrap().is_none());
}

#[actix_rt::test]
async fn feed_pages() {
  let db = match connect().await { Some(db) => db, None => return };
  let nickname = unique("pager");
  let user = db.user.register(&NewUser::new(&nickname, &format!("{}@x.com", nickname)))
    .await.unwrap();
  for i in 1..=5 {
    db.post.create(&NewPost::new(&format!("post {}", i), user.id).at(at(i))).await.unwrap();
  }

  let first = db.post.followed_posts(&user, PageRequest::new(Some(1), 2)).await.unwrap();
  assert_eq!(bodies(&first), vec!["post 5", "post 4"]);
  assert!(!first.has_prev);
  assert!(first.has_next);

  let last = db.post.followed_posts(&user, PageRequest::new(Some(3), 2)).await.unwrap();
  assert_eq!(bodies(&last), vec!["post 1"]);
  assert!(last.has_prev);
  assert!(!last.has_next);

  let past_end = db.post.followed_posts(&user, PageRequest::new(Some(4), 2)).await.unwrap();
  assert!(past_end.items.is_empty());
  assert_eq!(past_end.total, 5);
}

#[actix_rt::test]
async fn session_load_stamps_last_seen() {
  let db = match connect().await { Some(db) => db, None => return };
  let user = new_user(&db, "seen").await;
  let auth = AuthData {
    user_id: user.id,
    token: "t".to_string(),
  };

  let session = session::load(&db, &auth).await.unwrap();
  assert_eq!(session.user.id, user.id);
  assert!(session.user.last_seen >= user.last_seen);

  let gone = AuthData {
    user_id: -1,
    token: "t".to_string(),
  };
  assert!(session::load(&db, &gone).await.is_err());
}

#[actix_rt::test]
async fn search_matches_bodies_case_insensitively() {
  let db = match connect().await { Some(db) => db, None => return };
  let user = new_user(&db, "searcher").await;
  let needle = unique("Needle");
  db.post.create(&NewPost::new(&format!("a {} here", needle), user.id)).await.unwrap();

  let found = db.post.search(&needle.to_lowercase(), PageRequest::new(None, 10)).await.unwrap();
  assert_eq!(found.total, 1);
  assert_eq!(found.items[0].author.nickname, user.nickname);
}

#[actix_rt::test]
async fn nickname_clash_on_write_is_unprocessable() {
  let db = match connect().await { Some(db) => db, None => return };
  let a = new_user(&db, "a").await;
  let b = new_user(&db, "b").await;

  // skips the up-front check, as a concurrent writer would.
  match db.user.update_profile(b.id, &a.nickname, "").await {
    Err(microblog::Error::UnprocessableEntity(_)) => (),
    other => panic!("expected 422, got {:?}", other),
  }
  let clash = NewUser::new(&a.nickname, &format!("{}@y.com", unique("other")));
  assert!(matches!(db.user.register(&clash).await,
    Err(microblog::Error::UnprocessableEntity(_))));
}
