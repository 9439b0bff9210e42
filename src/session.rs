use crate::auth::AuthData;
use crate::db::DbService;
use crate::error::*;
use crate::models::User;

/// Request-scoped context handed to authenticated handlers.
#[derive(Debug, Clone)]
pub struct Session {
  pub user: User,
  pub token: String,
}

/// Resolve the session's user and stamp its last-seen time.
///
/// A valid token for a user that no longer exists is treated as logged out.
pub async fn load(db: &DbService, auth: &AuthData) -> Result<Session> {
  match db.user.touch_last_seen(auth.user_id).await? {
    Some(user) => Ok(Session {
      user,
      token: auth.token.clone(),
    }),
    None => Err(Error::unauthorized("Please log in to access this page.")),
  }
}
