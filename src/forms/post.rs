use serde::{Deserialize, Serialize};

use crate::error::*;
use crate::models::*;

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct CreatePost {
  pub body: String,
}

impl CreatePost {
  pub fn validate(&self) -> Result<&str> {
    let body = self.body.trim();
    if body.is_empty() {
      return Err(Error::unprocessable("Post body is required."));
    }
    if body.chars().count() > BODY_MAX_LEN {
      return Err(Error::unprocessable(
        format!("Posts must be at most {} characters.", BODY_MAX_LEN)));
    }
    Ok(body)
  }
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct PageQuery {
  pub page: Option<i64>,
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchQuery {
  #[serde(default)]
  pub q: String,
  pub page: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostOut<T> {
  pub post: T,
}
