use log::*;

use crate::error::*;
use crate::models::*;

use crate::db::*;

/// The follow graph as an explicit set of `(follower_id, followed_id)` pairs.
#[derive(Clone)]
pub struct FollowService {
  insert_edge: VersionedStatement,
  delete_edge: VersionedStatement,
  edge_exists: VersionedStatement,
  edge_counts: VersionedStatement,
}

impl FollowService {
  pub fn new(cl: SharedClient) -> Result<FollowService> {
    let insert_edge = VersionedStatement::new(cl.clone(),
        r#"INSERT INTO followers(follower_id, followed_id) VALUES($1, $2)
        ON CONFLICT (follower_id, followed_id) DO NOTHING"#)?;
    let delete_edge = VersionedStatement::new(cl.clone(),
        r#"DELETE FROM followers WHERE follower_id = $1 AND followed_id = $2"#)?;
    let edge_exists = VersionedStatement::new(cl.clone(),
        r#"SELECT 1 FROM followers WHERE follower_id = $1 AND followed_id = $2"#)?;
    // self edges are a bookkeeping convention, not real followers.
    let edge_counts = VersionedStatement::new(cl.clone(),
        r#"SELECT
          (SELECT COUNT(*) FROM followers WHERE followed_id = $1 AND follower_id <> followed_id),
          (SELECT COUNT(*) FROM followers WHERE follower_id = $1 AND follower_id <> followed_id)"#)?;

    Ok(FollowService {
      insert_edge,
      delete_edge,
      edge_exists,
      edge_counts,
    })
  }

  pub async fn prepare(&self) -> Result<()> {
    self.insert_edge.prepare().await?;
    self.delete_edge.prepare().await?;
    self.edge_exists.prepare().await?;
    self.edge_counts.prepare().await?;
    Ok(())
  }

  /// Add the edge `follower -> target`.  `None` when it was already there.
  pub async fn follow(&self, follower: &User, target: &User) -> Result<Option<FollowEdge>> {
    let edge = FollowEdge::new(follower, target);
    let inserted = self.insert_edge.execute(&[&edge.follower_id, &edge.followed_id]).await?;
    if inserted == 0 {
      debug!("follow: {:?} already present.", edge);
      return Ok(None);
    }
    Ok(Some(edge))
  }

  /// Remove the edge `follower -> target`.  `None` when there was none.
  pub async fn unfollow(&self, follower: &User, target: &User) -> Result<Option<FollowEdge>> {
    let edge = FollowEdge::new(follower, target);
    let deleted = self.delete_edge.execute(&[&edge.follower_id, &edge.followed_id]).await?;
    if deleted == 0 {
      debug!("unfollow: {:?} not present.", edge);
      return Ok(None);
    }
    Ok(Some(edge))
  }

  pub async fn is_following(&self, follower: &User, target: &User) -> Result<bool> {
    let row = self.edge_exists.query_opt(&[&follower.id, &target.id]).await?;
    Ok(row.is_some())
  }

  /// `(followers, following)` of `user`, ignoring its self edge.
  pub async fn counts(&self, user: &User) -> Result<(i64, i64)> {
    let row = self.edge_counts.query_one(&[&user.id]).await?;
    Ok((row.get(0), row.get(1)))
  }
}
