use log::*;

use serde::{Deserialize, Serialize};

use actix_web::{
  get, post, delete, web, HttpResponse,
  Error
};

use crate::error::{self, *};
use crate::app::*;
use crate::auth::AuthData;
use crate::forms::*;
use crate::models::*;
use crate::notify::{Mailer, Message};
use crate::session;
use crate::db::DbService;

use crate::middleware::Auth;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct FollowResponse {
  pub message: String,
  pub following: bool,
}

async fn find_user(db: &DbService, nickname: &str) -> Result<User> {
  db.user.get_by_nickname(nickname).await?
    .ok_or_else(|| error::Error::not_found(format!("User {} not found.", nickname)))
}

/// get a user's profile and their posts
#[get("/users/{nickname}", wrap="Auth::optional()")]
async fn get_profile(
  cfg: web::Data<ProfileService>,
  auth: Option<AuthData>,
  db: web::Data<DbService>,
  nickname: web::Path<String>,
  query: web::Query<PageQuery>,
) -> Result<HttpResponse, Error> {
  let user = find_user(&db, &nickname).await?;

  let following = match auth {
    Some(ref auth) => {
      let session = session::load(&db, auth).await?;
      db.follow.is_following(&session.user, &user).await?
    },
    None => false,
  };

  let (followers_count, following_count) = db.follow.counts(&user).await?;
  let mut profile = user.profile(following);
  profile.followers_count = followers_count;
  profile.following_count = following_count;

  let posts = db.post.by_author(&user, PageRequest::new(query.page, cfg.per_page)).await?;
  Ok(HttpResponse::Ok().json(ProfileOut::<PostDetails> {
    profile,
    posts,
  }))
}

/// What a follow attempt reports back, plus the notice owed to `target`
/// when the edge is new.
fn follow_outcome(
  mailer: &Mailer,
  follower: &User,
  target: &User,
  edge: Option<FollowEdge>,
) -> (FollowResponse, Option<Message>) {
  match edge {
    Some(edge) => {
      info!("follow: {:?}", edge);
      let notice = mailer.new_follower(target, follower);
      (FollowResponse {
        message: format!("You are now following {}!", target.nickname),
        following: true,
      }, notice)
    },
    None => (FollowResponse {
      message: format!("Cannot follow {}.", target.nickname),
      following: true,
    }, None),
  }
}

fn unfollow_outcome(target: &User, edge: Option<FollowEdge>) -> FollowResponse {
  match edge {
    Some(edge) => {
      info!("unfollow: {:?}", edge);
      FollowResponse {
        message: format!("You have stopped following {}.", target.nickname),
        following: false,
      }
    },
    None => FollowResponse {
      message: format!("Cannot unfollow {}.", target.nickname),
      following: false,
    },
  }
}

/// follow a user
#[post("/users/{nickname}/follow", wrap="Auth::required()")]
async fn follow(
  cfg: web::Data<ProfileService>,
  auth: AuthData,
  db: web::Data<DbService>,
  nickname: web::Path<String>,
) -> Result<HttpResponse, Error> {
  let session = session::load(&db, &auth).await?;
  let target = find_user(&db, &nickname).await?;
  if FollowEdge::new(&session.user, &target).is_self() {
    return Err(error::Error::unprocessable("You can't follow yourself!").into());
  }

  let edge = db.follow.follow(&session.user, &target).await?;
  let (res, _) = follow_outcome(&cfg.mailer, &session.user, &target, edge);
  Ok(HttpResponse::Ok().json(res))
}

/// unfollow a user
#[delete("/users/{nickname}/follow", wrap="Auth::required()")]
async fn unfollow(
  auth: AuthData,
  db: web::Data<DbService>,
  nickname: web::Path<String>,
) -> Result<HttpResponse, Error> {
  let session = session::load(&db, &auth).await?;
  let target = find_user(&db, &nickname).await?;
  if FollowEdge::new(&session.user, &target).is_self() {
    return Err(error::Error::unprocessable("You can't unfollow yourself!").into());
  }

  let edge = db.follow.unfollow(&session.user, &target).await?;
  Ok(HttpResponse::Ok().json(unfollow_outcome(&target, edge)))
}

#[derive(Debug, Clone, Default)]
pub struct ProfileService {
  pub per_page: i64,
  pub mailer: Mailer,
}

impl super::Service for ProfileService {
  fn load_app_config(&mut self, config: &AppConfig, _prefix: &str) -> Result<()> {
    self.per_page = super::per_page(config)?;
    self.mailer = Mailer::load_app_config(config)?;
    Ok(())
  }

  fn api_config(&self, web: &mut web::ServiceConfig) {
    web
      .data(self.clone())
      .service(get_profile)
      .service(follow)
      .service(unfollow);
  }
}

pub fn new_factory() -> ProfileService {
  Default::default()
}
