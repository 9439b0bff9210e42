use actix_web::{
  get, web, HttpResponse,
  Error
};

use crate::error::{self, *};
use crate::app::*;
use crate::forms::*;
use crate::models::*;
use crate::db::DbService;

/// search post bodies
#[get("/search")]
async fn search(
  cfg: web::Data<SearchService>,
  db: web::Data<DbService>,
  query: web::Query<SearchQuery>,
) -> Result<HttpResponse, Error> {
  let q = query.q.trim();
  if q.is_empty() {
    return Err(error::Error::BadRequest("Search query is required.".to_string()).into());
  }
  let req = PageRequest::new(query.page, cfg.per_page);
  let posts = db.post.search(q, req).await?;
  Ok(HttpResponse::Ok().json(posts))
}

#[derive(Debug, Clone, Default)]
pub struct SearchService {
  pub per_page: i64,
}

impl super::Service for SearchService {
  fn load_app_config(&mut self, config: &AppConfig, _prefix: &str) -> Result<()> {
    self.per_page = super::per_page(config)?;
    Ok(())
  }

  fn api_config(&self, web: &mut web::ServiceConfig) {
    web
      .data(self.clone())
      .service(search);
  }
}

pub fn new_factory() -> SearchService {
  Default::default()
}
