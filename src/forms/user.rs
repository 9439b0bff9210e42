use serde::{Deserialize, Serialize};

use crate::error::*;
use crate::models::*;

/// What the federated login callback tells us about the user.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdentityAssertion {
  pub email: Option<String>,
  pub nickname: Option<String>,
  #[serde(default)]
  pub remember_me: bool,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
pub struct EditProfile {
  pub nickname: String,
  #[serde(default)]
  pub about_me: String,
}

impl EditProfile {
  /// Trimmed copy, or the user-facing reason it can't be saved.
  pub fn validate(&self) -> Result<EditProfile> {
    let nickname = self.nickname.trim();
    if nickname.is_empty() {
      return Err(Error::unprocessable("Nickname is required."));
    }
    if nickname.chars().count() > NICKNAME_MAX_LEN {
      return Err(Error::unprocessable(
        format!("Nickname must be at most {} characters.", NICKNAME_MAX_LEN)));
    }
    let about_me = self.about_me.trim();
    if about_me.chars().count() > ABOUT_ME_MAX_LEN {
      return Err(Error::unprocessable(
        format!("About me must be at most {} characters.", ABOUT_ME_MAX_LEN)));
    }
    Ok(EditProfile {
      nickname: nickname.to_string(),
      about_me: about_me.to_string(),
    })
  }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserOut<T> {
  pub user: T,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileOut<T> {
  pub profile: Profile,
  pub posts: Page<T>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct UserResponseInner {
  pub nickname: String,
  pub email: String,
  pub about_me: String,
  pub avatar: String,
  pub last_seen: chrono::NaiveDateTime,
}

impl From<User> for UserResponseInner {
  fn from(user: User) -> Self {
    UserResponseInner {
      avatar: user.avatar(128),
      nickname: user.nickname,
      email: user.email,
      about_me: user.about_me,
      last_seen: user.last_seen,
    }
  }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionResponse {
  pub token: String,
  pub user: UserResponseInner,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct MessageResponse {
  pub message: String,
}

impl MessageResponse {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
    }
  }
}
