use log::*;

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::{json, Value as JsonValue};

use jsonwebtoken::errors::Error as JwtError;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
  // 401
  #[error("unauthorized: {0}")]
  Unauthorized(JsonValue),

  // 404
  #[error("not found: {0}")]
  NotFound(JsonValue),

  // 422
  #[error("unprocessable entity: {0}")]
  UnprocessableEntity(JsonValue),

  // 500
  #[error("internal server error")]
  InternalServerError,

  // 400
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("Json error: {source}")]
  JsonError {
    #[from]
    source: serde_json::Error,
  },

  #[error("JWT error")]
  JwtError {
    #[from]
    source: JwtError,
  },

  #[error("missing secret: {0}")]
  MissingSecret(String),

  #[error("disconnected: {0}")]
  DisconnectedError(String),

  #[error("postgres error")]
  PgError {
    #[from]
    source: tokio_postgres::error::Error,
  },

  #[error("crossbeam recv error")]
  RecvError {
    #[from]
    source: crossbeam_channel::RecvError,
  },

  #[error("std io error")]
  IOError {
    #[from]
    source: std::io::Error,
  },

  #[error("config error")]
  ConfigError {
    #[from]
    source: config::ConfigError,
  },

  #[error(transparent)]
  Other(#[from] anyhow::Error),
}

impl Error {
  /// User-facing message wrapped the way every JSON error body is shaped.
  pub fn message(msg: impl Into<String>) -> JsonValue {
    json!({
      "error": msg.into(),
    })
  }

  pub fn not_found(msg: impl Into<String>) -> Self {
    Error::NotFound(Self::message(msg))
  }

  pub fn unauthorized(msg: impl Into<String>) -> Self {
    Error::Unauthorized(Self::message(msg))
  }

  pub fn unprocessable(msg: impl Into<String>) -> Self {
    Error::UnprocessableEntity(Self::message(msg))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// the ResponseError trait lets us convert errors to http responses with appropriate data
// https://actix.rs/docs/errors/
impl ResponseError for Error {
  fn status_code(&self) -> StatusCode {
    match self {
      Error::Unauthorized(_) | Error::JwtError { .. } => StatusCode::UNAUTHORIZED,
      Error::NotFound(_) => StatusCode::NOT_FOUND,
      Error::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
      Error::BadRequest(_) | Error::JsonError { .. } => StatusCode::BAD_REQUEST,
      Error::DisconnectedError(_) => StatusCode::BAD_GATEWAY,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    match self {
      Error::Unauthorized(ref message) => HttpResponse::Unauthorized().json(message),
      Error::NotFound(ref message) => HttpResponse::NotFound().json(message),
      Error::UnprocessableEntity(ref message) => {
        HttpResponse::build(StatusCode::UNPROCESSABLE_ENTITY).json(message)
      },
      Error::BadRequest(ref message) => {
        HttpResponse::BadRequest().json(Error::message(message.as_str()))
      },
      Error::JsonError { ref source } => {
        HttpResponse::BadRequest().json(Error::message(source.to_string()))
      },
      Error::JwtError { .. } => {
        HttpResponse::Unauthorized().json(Error::message("Invalid session token"))
      },
      Error::DisconnectedError(ref message) => {
        HttpResponse::build(StatusCode::BAD_GATEWAY).json(Error::message(message.as_str()))
      },
      ref err => {
        error!("InternalServerError: {:?}", err);
        HttpResponse::InternalServerError().json(Error::message("Internal Server Error"))
      },
    }
  }
}
