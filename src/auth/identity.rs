use log::*;

use crate::error::*;
use crate::forms::IdentityAssertion;
use crate::models::*;
use crate::db::{DbService, NICKNAME_IN_USE};

pub const INVALID_LOGIN: &str = "Invalid login. Please try again.";

const REGISTER_ATTEMPTS: usize = 3;

/// A checked assertion: a usable email and the nickname to start from.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
  pub email: String,
  pub nickname: String,
}

impl Identity {
  pub fn from_assertion(assertion: &IdentityAssertion) -> Result<Identity> {
    let email = assertion.email.as_deref().map(str::trim).unwrap_or("");
    if email.is_empty() || email.chars().count() > EMAIL_MAX_LEN {
      return Err(Error::unauthorized(INVALID_LOGIN));
    }

    let nickname = match assertion.nickname.as_deref().map(str::trim) {
      Some(nickname) if !nickname.is_empty() => nickname,
      // fall back to the local part of the email.
      _ => email.split('@').next().unwrap_or(""),
    };
    let nickname = if nickname.is_empty() { "user" } else { nickname };

    Ok(Identity {
      email: email.to_string(),
      nickname: nickname.to_string(),
    })
  }
}

/// Map an external assertion to a local user, registering one on first login.
pub async fn resolve(db: &DbService, assertion: &IdentityAssertion) -> Result<User> {
  let identity = Identity::from_assertion(assertion)?;
  if let Some(user) = db.user.get_by_email(&identity.email).await? {
    return Ok(user);
  }

  // a concurrent login may grab the same free nickname between the two steps.
  for _ in 0..REGISTER_ATTEMPTS {
    let nickname = db.user.make_unique_nickname(&identity.nickname).await?;
    info!("first login for {}, registering as '{}'", identity.email, nickname);
    match db.user.register(&NewUser::new(&nickname, &identity.email)).await {
      Err(Error::UnprocessableEntity(_)) => {
        debug!("nickname '{}' was taken meanwhile.", nickname);
      },
      res => return res,
    }
  }
  Err(Error::unprocessable(NICKNAME_IN_USE))
}
