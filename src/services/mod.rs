use log::*;

use std::str::FromStr;

use actix_web::web;

use crate::error::*;
use crate::app::*;
use crate::db::DbService;

mod user;
mod profile;
mod post;
mod search;

type BoxService = Box<dyn Service>;

/// One feature area of the API, configured from `AppConfig` and mounted
/// under `/api` on every worker.
pub trait Service: ServiceClone + Send {
  fn load_app_config(&mut self, config: &AppConfig, prefix: &str) -> Result<()>;

  /// Routes outside the `/api` scope.
  fn web_config(&self, _web: &mut web::ServiceConfig) {
  }

  fn api_config(&self, _web: &mut web::ServiceConfig) {
  }
}

pub trait ServiceClone {
  fn clone_box(&self) -> BoxService;
}

impl<T> ServiceClone for T
where
    T: 'static + Service + Clone,
{
  fn clone_box(&self) -> BoxService {
    Box::new(self.clone())
  }
}

impl Clone for BoxService {
  fn clone(&self) -> BoxService {
    self.clone_box()
  }
}

/// Names accepted in a server's `services` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
  User,
  Profile,
  Post,
  Search,
}

impl FromStr for ServiceKind {
  type Err = Error;

  fn from_str(name: &str) -> Result<Self> {
    match name {
      "User" => Ok(ServiceKind::User),
      "Profile" => Ok(ServiceKind::Profile),
      "Post" => Ok(ServiceKind::Post),
      "Search" => Ok(ServiceKind::Search),
      _ => Err(Error::BadRequest(format!("Unknown Service: {}", name))),
    }
  }
}

impl ServiceKind {
  fn factory(self) -> BoxService {
    match self {
      ServiceKind::User => Box::new(user::new_factory()),
      ServiceKind::Profile => Box::new(profile::new_factory()),
      ServiceKind::Post => Box::new(post::new_factory()),
      ServiceKind::Search => Box::new(search::new_factory()),
    }
  }
}

/// Parse a `services` list, refusing unknown and repeated names.
pub fn parse_service_list(names: &[String]) -> Result<Vec<ServiceKind>> {
  let mut kinds = Vec::with_capacity(names.len());
  for name in names {
    let kind = name.parse::<ServiceKind>()?;
    if kinds.contains(&kind) {
      return Err(Error::BadRequest(format!("Service {} listed twice", name)));
    }
    kinds.push(kind);
  }
  Ok(kinds)
}

#[derive(Clone, Default)]
pub struct Services {
  db_url: String,
  services: Vec<BoxService>,
}

impl Services {
  pub fn new() -> Services {
    Default::default()
  }

  pub fn load_app_config(&mut self, config: &AppConfig, prefix: &str) -> Result<()> {
    self.db_url = config.require_str("db.url")?;

    let names = config.get_str_list(&format!("{}.services", prefix))?
      .unwrap_or_default();
    for kind in parse_service_list(&names)? {
      info!("Loading {:?}Service config", kind);
      let mut service = kind.factory();
      service.load_app_config(config, prefix)?;
      self.services.push(service);
    }
    Ok(())
  }

  pub fn web_config(&self, web: &mut web::ServiceConfig) {
    // One DbService (and postgres connection) per worker.
    match DbService::new(&self.db_url) {
      Ok(db) => {
        web.data(db);
      },
      Err(err) => {
        error!("Failed to init db: {:?}", err);
      },
    }

    for service in self.services.iter() {
      service.web_config(web);
    }
    web.service(
      web::scope("/api")
        .configure(|web| {
          for service in self.services.iter() {
            service.api_config(web);
          }
        })
    );
  }
}

pub fn config_services(config: &AppConfig, prefix: &str) -> Result<Services> {
  let mut services = Services::new();
  services.load_app_config(config, prefix)?;
  Ok(services)
}

/// Per-page size shared by every paginated listing.
pub(crate) fn per_page(config: &AppConfig) -> Result<i64> {
  Ok(config.get_int("Post.per_page")?.unwrap_or(crate::models::DEFAULT_PER_PAGE))
}
