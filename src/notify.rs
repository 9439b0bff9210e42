use log::*;

use crate::app::AppConfig;
use crate::error::*;
use crate::models::User;

/// An outbound email, ready for whatever transport delivers it.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
  pub from: String,
  pub to: Vec<String>,
  pub subject: String,
  pub body: String,
}

/// Builds notification emails from the `[Mail]` config section.
#[derive(Debug, Clone)]
pub struct Mailer {
  pub enabled: bool,
  pub server: String,
  pub port: i64,
  pub sender: String,
  /// Recipients of server error notices.
  pub admins: Vec<String>,
}

impl Default for Mailer {
  fn default() -> Self {
    Self {
      enabled: false,
      server: "localhost".to_string(),
      port: 25,
      sender: "no-reply@localhost".to_string(),
      admins: Vec::new(),
    }
  }
}

impl Mailer {
  pub fn load_app_config(config: &AppConfig) -> Result<Mailer> {
    let defaults = Mailer::default();
    let server = config.get_str("Mail.server")?.unwrap_or(defaults.server);
    let sender = config.get_str("Mail.sender")?
      .unwrap_or_else(|| format!("no-reply@{}", server));
    Ok(Mailer {
      enabled: config.get_bool("Mail.enabled")?.unwrap_or(defaults.enabled),
      port: config.get_int("Mail.port")?.unwrap_or(defaults.port),
      admins: config.get_str_list("Mail.admins")?.unwrap_or_default(),
      server,
      sender,
    })
  }

  pub fn follower_message(&self, followed: &User, follower: &User) -> Message {
    Message {
      from: self.sender.clone(),
      to: vec![followed.email.clone()],
      subject: format!("[microblog] {} is now following you!", follower.nickname),
      body: format!(
        "Dear {},\n\n{} is now a follower. Visit their profile at /user/{}\n",
        followed.nickname, follower.nickname, follower.nickname),
    }
  }

  /// Tell `followed` that `follower` started following them.  Returns what
  /// was sent, if anything.
  pub fn new_follower(&self, followed: &User, follower: &User) -> Option<Message> {
    if !self.enabled {
      debug!("mail disabled, skip follower notice to {}", followed.nickname);
      return None;
    }
    let message = self.follower_message(followed, follower);
    self.deliver(&message);
    Some(message)
  }

  pub fn server_error_message(&self, request: &str, detail: &str) -> Option<Message> {
    if !self.enabled || self.admins.is_empty() {
      return None;
    }
    Some(Message {
      from: self.sender.clone(),
      to: self.admins.clone(),
      subject: "[microblog] server error".to_string(),
      body: format!("{} failed:\n\n{}\n", request, detail),
    })
  }

  /// Notify the admins that a request ended in a 500.
  pub fn server_error(&self, request: &str, detail: &str) -> Option<Message> {
    let message = self.server_error_message(request, detail)?;
    self.deliver(&message);
    Some(message)
  }

  fn deliver(&self, message: &Message) {
    info!(target: "mail", "{}:{} from={} to={:?} subject={:?}",
      self.server, self.port, message.from, message.to, message.subject);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn user(id: i32, nickname: &str) -> User {
    User {
      id,
      nickname: nickname.to_string(),
      email: format!("{}@x.com", nickname),
      about_me: String::new(),
      last_seen: chrono::Utc::now().naive_utc(),
    }
  }

  #[test]
  fn follower_message_goes_to_followed_user() {
    let mailer = Mailer { enabled: true, ..Mailer::default() };
    let msg = mailer.follower_message(&user(2, "bob"), &user(1, "alice"));
    assert_eq!(msg.to, vec!["bob@x.com".to_string()]);
    assert_eq!(msg.from, "no-reply@localhost");
    assert_eq!(msg.subject, "[microblog] alice is now following you!");
    assert!(msg.body.starts_with("Dear bob,"));
  }

  #[test]
  fn disabled_mailer_sends_nothing() {
    let mailer = Mailer {
      admins: vec!["admin@x.com".to_string()],
      ..Mailer::default()
    };
    assert_eq!(mailer.new_follower(&user(2, "bob"), &user(1, "alice")), None);
    assert_eq!(mailer.server_error("GET /api/feed", "postgres error"), None);
  }

  #[test]
  fn server_errors_go_to_admins() {
    let mailer = Mailer {
      enabled: true,
      admins: vec!["admin@x.com".to_string(), "ops@x.com".to_string()],
      ..Mailer::default()
    };
    let msg = mailer.server_error("GET /api/feed", "postgres error").unwrap();
    assert_eq!(msg.to, mailer.admins);
    assert_eq!(msg.subject, "[microblog] server error");
    assert!(msg.body.contains("GET /api/feed"));
    assert!(msg.body.contains("postgres error"));

    let nobody = Mailer { enabled: true, ..Mailer::default() };
    assert_eq!(nobody.server_error_message("GET /", "boom"), None);
  }
}
