use serde::{Deserialize, Serialize};

use chrono::{Duration, Utc};

use jsonwebtoken::{
  encode, Header, EncodingKey,
  decode, DecodingKey,
  Validation
};

use crate::error::*;
use crate::models::User;

/// Claims of a verified session token.
#[derive(Debug, Default, Clone)]
pub struct AuthData {
  pub user_id: i32,
  pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
  pub id: i32,
  pub exp: i64,
}

pub trait GenerateJwt {
  fn generate_jwt(&self, lifetime: Duration) -> Result<String>;
}

pub trait DecodeJwt {
  fn decode_jwt(&self) -> Result<AuthData>;
}

impl GenerateJwt for User {
  fn generate_jwt(&self, lifetime: Duration) -> Result<String> {
    encode_token(self.id, lifetime, &get_secret()?)
  }
}

impl DecodeJwt for str {
  fn decode_jwt(&self) -> Result<AuthData> {
    decode_token(self, &get_secret()?)
  }
}

pub fn encode_token(user_id: i32, lifetime: Duration, secret: &str) -> Result<String> {
  let claims = Claims {
    id: user_id,
    exp: (Utc::now() + lifetime).timestamp(),
  };
  let key = EncodingKey::from_secret(secret.as_ref());
  Ok(encode(&Header::default(), &claims, &key)?)
}

pub fn decode_token(token: &str, secret: &str) -> Result<AuthData> {
  let key = DecodingKey::from_secret(secret.as_ref());
  let token_data = decode::<Claims>(token, &key, &Validation::default())?;
  Ok(AuthData {
    user_id: token_data.claims.id,
    token: token.to_string(),
  })
}

fn get_secret() -> Result<String> {
  dotenv::var("JWT_SECRET")
    .map_err(|_| Error::MissingSecret("JWT_SECRET environment variable".to_string()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn token_round_trip() {
    let token = encode_token(42, Duration::hours(1), "s3cret").unwrap();
    let auth = decode_token(&token, "s3cret").unwrap();
    assert_eq!(auth.user_id, 42);
    assert_eq!(auth.token, token);
  }

  #[test]
  fn wrong_secret_is_rejected() {
    let token = encode_token(42, Duration::hours(1), "s3cret").unwrap();
    assert!(decode_token(&token, "other").is_err());
  }

  #[test]
  fn expired_token_is_rejected() {
    let token = encode_token(42, Duration::hours(-2), "s3cret").unwrap();
    assert!(decode_token(&token, "s3cret").is_err());
  }
}
