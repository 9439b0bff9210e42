use serde::{Deserialize, Serialize};

use crate::models::User;

/// Directed edge meaning "follower sees followed's posts in their feed".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct FollowEdge {
  pub follower_id: i32,
  pub followed_id: i32,
}

impl FollowEdge {
  pub fn new(follower: &User, followed: &User) -> Self {
    Self {
      follower_id: follower.id,
      followed_id: followed.id,
    }
  }

  /// Self edges are how a user's own posts end up in their feed.
  pub fn is_self(&self) -> bool {
    self.follower_id == self.followed_id
  }
}
