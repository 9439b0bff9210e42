use log::*;

use actix_web::{
  get, post, web, HttpResponse,
  Error
};

use crate::error::*;
use crate::app::*;
use crate::auth::AuthData;
use crate::forms::*;
use crate::models::*;
use crate::session;
use crate::db::DbService;

use crate::middleware::Auth;

/// home feed: posts from everyone the user follows, themselves included
#[get("/feed", wrap="Auth::required()")]
async fn feed(
  cfg: web::Data<PostService>,
  auth: AuthData,
  db: web::Data<DbService>,
  query: web::Query<PageQuery>,
) -> Result<HttpResponse, Error> {
  let session = session::load(&db, &auth).await?;
  let req = PageRequest::new(query.page, cfg.per_page);
  let posts = db.post.followed_posts(&session.user, req).await?;
  Ok(HttpResponse::Ok().json(posts))
}

/// post new update
#[post("/posts", wrap="Auth::required()")]
async fn create_post(
  auth: AuthData,
  db: web::Data<DbService>,
  form: web::Json<CreatePost>,
) -> Result<HttpResponse, Error> {
  let session = session::load(&db, &auth).await?;
  let body = form.validate()?;
  let post = db.post.create(&NewPost::new(body, session.user.id)).await?;
  info!("new post id={} by {}", post.id, session.user.nickname);
  Ok(HttpResponse::Created().json(PostOut::<Post> {
    post,
  }))
}

#[derive(Debug, Clone, Default)]
pub struct PostService {
  pub per_page: i64,
}

impl super::Service for PostService {
  fn load_app_config(&mut self, config: &AppConfig, _prefix: &str) -> Result<()> {
    self.per_page = super::per_page(config)?;
    Ok(())
  }

  fn api_config(&self, web: &mut web::ServiceConfig) {
    web
      .data(self.clone())
      .service(feed)
      .service(create_post);
  }
}

pub fn new_factory() -> PostService {
  Default::default()
}
