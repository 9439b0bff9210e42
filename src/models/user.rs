use chrono::NaiveDateTime;

use serde::{Deserialize, Serialize};

pub const NICKNAME_MAX_LEN: usize = 64;
pub const EMAIL_MAX_LEN: usize = 120;
pub const ABOUT_ME_MAX_LEN: usize = 140;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
  pub id: i32,
  pub nickname: String,
  pub email: String,
  pub about_me: String,
  pub last_seen: NaiveDateTime,
}

impl User {
  pub fn avatar(&self, size: u32) -> String {
    avatar_url(size)
  }

  pub fn profile(&self, following: bool) -> Profile {
    Profile {
      user_id: self.id,
      nickname: self.nickname.clone(),
      about_me: self.about_me.clone(),
      last_seen: self.last_seen,
      avatar: self.avatar(128),
      following,
      followers_count: 0,
      following_count: 0,
    }
  }
}

pub fn avatar_url(size: u32) -> String {
  format!("https://unsplash.it/{}/{}/?random", size, size)
}

/// Fields needed to insert a user row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
  pub nickname: String,
  pub email: String,
}

impl NewUser {
  pub fn new(nickname: &str, email: &str) -> Self {
    Self {
      nickname: nickname.to_string(),
      email: email.to_string(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
  #[serde(skip)]
  pub user_id: i32,
  pub nickname: String,
  pub about_me: String,
  pub last_seen: NaiveDateTime,
  pub avatar: String,
  pub following: bool,
  pub followers_count: i64,
  pub following_count: i64,
}

/// Nicknames to try, in order, when registering `base`: the base itself,
/// then `base2`, `base3`, ...
///
/// The base is cut on a char boundary so every candidate fits in
/// `NICKNAME_MAX_LEN` characters.
pub fn nickname_candidates(base: &str) -> impl Iterator<Item = String> + '_ {
  let first = truncate_chars(base, NICKNAME_MAX_LEN).to_string();
  std::iter::once(first).chain((2u64..).map(move |version| {
    let suffix = version.to_string();
    let keep = NICKNAME_MAX_LEN.saturating_sub(suffix.len());
    format!("{}{}", truncate_chars(base, keep), suffix)
  }))
}

pub(crate) fn truncate_chars(s: &str, max: usize) -> &str {
  match s.char_indices().nth(max) {
    Some((idx, _)) => &s[..idx],
    None => s,
  }
}
