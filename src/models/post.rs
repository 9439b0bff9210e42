use chrono::NaiveDateTime;

use serde::{Deserialize, Serialize};

pub const BODY_MAX_LEN: usize = 140;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
  pub id: i32,
  pub body: String,
  pub user_id: i32,
  pub timestamp: NaiveDateTime,
}

/// A post about to be stored.  `timestamp` defaults to now (UTC).
#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
  pub body: String,
  pub user_id: i32,
  pub timestamp: Option<NaiveDateTime>,
}

impl NewPost {
  pub fn new(body: &str, user_id: i32) -> Self {
    Self {
      body: body.to_string(),
      user_id,
      timestamp: None,
    }
  }

  pub fn at(mut self, timestamp: NaiveDateTime) -> Self {
    self.timestamp = Some(timestamp);
    self
  }

  pub fn timestamp_or_now(&self) -> NaiveDateTime {
    self.timestamp.unwrap_or_else(|| chrono::Utc::now().naive_utc())
  }
}

/// Post joined with its author, as rendered in feeds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostDetails {
  pub id: i32,
  pub body: String,
  pub timestamp: NaiveDateTime,
  pub author: Author,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Author {
  #[serde(skip)]
  pub user_id: i32,
  pub nickname: String,
  pub avatar: String,
}
