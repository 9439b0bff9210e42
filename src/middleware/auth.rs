use log::*;

use std::task::{Context, Poll};

use futures::future::{ok, ready, Either, Ready};

use actix_web::{
  http::header::{HeaderMap, AUTHORIZATION},
  Error, HttpMessage, ResponseError,
  HttpRequest, FromRequest,
};
use actix_web::dev::{
  Service, Transform,
  ServiceRequest, ServiceResponse,
  Payload,
};

use crate::error::{self, Result};
use crate::auth::jwt::*;

const TOKEN_PREFIX: &str = "Token ";

/// Session claims from the `Authorization: Token <jwt>` header, if any.
///
/// A missing header is `Ok(None)`; a header that is present but unusable is
/// always an error, even on routes where a session is optional.
pub fn decode_session_token(headers: &HeaderMap) -> Result<Option<AuthData>> {
  let header = match headers.get(AUTHORIZATION) {
    Some(header) => header,
    None => return Ok(None),
  };
  let header = header.to_str()
    .map_err(|_| error::Error::unauthorized("Invalid authorization token"))?;
  let token = header.strip_prefix(TOKEN_PREFIX)
    .ok_or_else(|| error::Error::unauthorized("Invalid authorization method"))?;

  Ok(Some(token.trim().decode_jwt()?))
}

/// Handlers behind `Auth::required()` take `AuthData` directly; behind
/// `Auth::optional()` they take `Option<AuthData>`.
impl FromRequest for AuthData {
  type Error = Error;
  type Future = Ready<Result<Self, Self::Error>>;
  type Config = ();

  fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
    let auth = req.extensions().get::<AuthData>().cloned();
    ready(auth.ok_or_else(|| error::Error::unauthorized("authorization required").into()))
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
  Required,
  Optional,
}

/// Route guard that resolves the session token before the handler runs.
pub struct Auth {
  access: Access,
}

impl Auth {
  pub fn required() -> Self {
    Self { access: Access::Required }
  }

  pub fn optional() -> Self {
    Self { access: Access::Optional }
  }
}

impl<S, B> Transform<S> for Auth
where
  S: Service<Request = ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
  S::Future: 'static,
{
  type Request = ServiceRequest;
  type Response = ServiceResponse<B>;
  type Error = Error;
  type InitError = ();
  type Transform = AuthGuard<S>;
  type Future = Ready<Result<Self::Transform, Self::InitError>>;

  fn new_transform(&self, service: S) -> Self::Future {
    ok(AuthGuard {
      access: self.access,
      service,
    })
  }
}

pub struct AuthGuard<S> {
  access: Access,
  service: S,
}

impl<S> AuthGuard<S> {
  /// Attach the caller's claims to the request, or say why it is refused.
  fn admit(&self, req: &ServiceRequest) -> Result<()> {
    match decode_session_token(req.headers())? {
      Some(auth) => {
        debug!("session token for user id={}", auth.user_id);
        req.extensions_mut().insert(auth);
        Ok(())
      },
      None if self.access == Access::Optional => Ok(()),
      None => Err(error::Error::unauthorized("authorization required")),
    }
  }
}

impl<S, B> Service for AuthGuard<S>
where
  S: Service<Request = ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
  S::Future: 'static,
{
  type Request = ServiceRequest;
  type Response = ServiceResponse<B>;
  type Error = Error;
  type Future = Either<S::Future, Ready<Result<Self::Response, Self::Error>>>;

  fn poll_ready(&mut self, cx: &mut Context) -> Poll<Result<(), Self::Error>> {
    self.service.poll_ready(cx)
  }

  fn call(&mut self, req: ServiceRequest) -> Self::Future {
    match self.admit(&req) {
      Ok(()) => Either::Left(self.service.call(req)),
      Err(err) => {
        warn!("refused {} {}: {}", req.method(), req.path(), err);
        Either::Right(ok(req.into_response(err.error_response().into_body())))
      },
    }
  }
}
