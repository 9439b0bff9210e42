use log::*;

use chrono::Duration;

use actix_web::{
  get, post, put, web, HttpResponse,
  Error
};

use crate::error::{self, *};
use crate::app::*;
use crate::forms::*;
use crate::auth::{identity, AuthData, GenerateJwt};
use crate::models::User;
use crate::session;

use crate::db::{DbService, NICKNAME_IN_USE};

use crate::middleware::Auth;

fn session_response(cfg: &UserService, user: User, remember_me: bool) -> Result<HttpResponse> {
  let token = user.generate_jwt(cfg.session_lifetime(remember_me))?;
  Ok(HttpResponse::Ok().json(SessionResponse {
    token,
    user: user.into(),
  }))
}

/// federated login callback: resolve (or register) the asserted identity
#[post("/login")]
async fn login(
  cfg: web::Data<UserService>,
  db: web::Data<DbService>,
  assertion: web::Json<IdentityAssertion>,
) -> Result<HttpResponse, Error> {
  if !cfg.allow_assertions {
    return Ok(HttpResponse::Forbidden().json(error::Error::message("Login is disabled.")));
  }
  let assertion = assertion.into_inner();
  let user = identity::resolve(&db, &assertion).await?;
  info!("login: user id={} nickname={}", user.id, user.nickname);
  Ok(session_response(&cfg, user, assertion.remember_me)?)
}

/// log in as an existing user by nickname, for local testing
#[get("/login/{nickname}")]
async fn login_test(
  cfg: web::Data<UserService>,
  db: web::Data<DbService>,
  nickname: web::Path<String>,
) -> Result<HttpResponse, Error> {
  if !cfg.allow_test_login {
    return Ok(HttpResponse::NotFound().finish());
  }
  let user = match db.user.get_by_nickname(&nickname).await? {
    Some(user) => user,
    None => return Err(error::Error::not_found(format!("User {} not found.", nickname)).into()),
  };
  Ok(session_response(&cfg, user, true)?)
}

/// sessions are stateless tokens; the client drops its copy
#[post("/logout", wrap="Auth::optional()")]
async fn logout() -> Result<HttpResponse, Error> {
  Ok(HttpResponse::Ok().json(MessageResponse::new("You have been logged out.")))
}

/// get current user
#[get("/user", wrap="Auth::required()")]
async fn get_user(
  auth: AuthData,
  db: web::Data<DbService>,
) -> Result<HttpResponse, Error> {
  let session = session::load(&db, &auth).await?;
  Ok(HttpResponse::Ok().json(UserOut::<UserResponseInner> {
    user: session.user.into(),
  }))
}

/// edit nickname and about-me
#[put("/user", wrap="Auth::required()")]
async fn update(
  auth: AuthData,
  db: web::Data<DbService>,
  form: web::Json<EditProfile>,
) -> Result<HttpResponse, Error> {
  let session = session::load(&db, &auth).await?;
  let form = form.validate()?;

  if form.nickname != session.user.nickname && db.user.nickname_taken(&form.nickname).await? {
    return Err(error::Error::unprocessable(NICKNAME_IN_USE).into());
  }

  let user = db.user.update_profile(session.user.id, &form.nickname, &form.about_me).await?
    .ok_or_else(|| error::Error::unauthorized("Please log in to access this page."))?;
  info!("profile saved: user id={}", user.id);
  Ok(HttpResponse::Ok().json(UserOut::<UserResponseInner> {
    user: user.into(),
  }))
}

#[derive(Debug, Clone)]
pub struct UserService {
  pub allow_assertions: bool,
  pub allow_test_login: bool,
  pub session_hours: i64,
  pub remember_days: i64,
}

impl Default for UserService {
  fn default() -> Self {
    Self {
      allow_assertions: true,
      allow_test_login: false,
      session_hours: 24,
      remember_days: 21,
    }
  }
}

impl UserService {
  pub fn session_lifetime(&self, remember_me: bool) -> Duration {
    if remember_me {
      Duration::days(self.remember_days)
    } else {
      Duration::hours(self.session_hours)
    }
  }
}

impl super::Service for UserService {
  fn load_app_config(&mut self, config: &AppConfig, _prefix: &str) -> Result<()> {
    let defaults = UserService::default();
    self.allow_assertions = config.get_bool("User.allow_assertions")?
      .unwrap_or(defaults.allow_assertions);
    self.allow_test_login = config.get_bool("User.allow_test_login")?
      .unwrap_or(defaults.allow_test_login);
    self.session_hours = config.get_int("User.session_hours")?.unwrap_or(defaults.session_hours);
    self.remember_days = config.get_int("User.remember_days")?.unwrap_or(defaults.remember_days);
    if self.allow_test_login {
      warn!("test login by nickname is enabled.");
    }
    Ok(())
  }

  fn api_config(&self, web: &mut web::ServiceConfig) {
    web
      .data(self.clone())
      .service(login)
      .service(login_test)
      .service(logout)
      .service(update)
      .service(get_user);
  }
}

pub fn new_factory() -> UserService {
  Default::default()
}
