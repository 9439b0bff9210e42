use tokio_postgres::Row;

use crate::error::*;
use crate::models::*;

use crate::db::*;
use crate::db::util::*;

#[derive(Clone)]
pub struct PostService {
  // store post
  insert_post: VersionedStatement,

  // user's feed
  followed_posts: VersionedStatement,
  count_followed_posts: VersionedStatement,

  // profile page
  posts_by_author: VersionedStatement,
  count_posts_by_author: VersionedStatement,

  // search
  search_posts: VersionedStatement,
  count_search_posts: VersionedStatement,
}

lazy_static! {
  static ref POST_COLUMNS: ColumnMappers = {
    ColumnMappers {
      table_name: "posts",
      columns: vec![
        column("id"),
        column("body"),
        column("user_id"),
        quoted("timestamp"),
      ],
    }
  };
}

fn post_from_row(row: &Row) -> Post {
  Post {
    id: row.get(0),
    body: row.get(1),
    user_id: row.get(2),
    timestamp: row.get(3),
  }
}

fn post_details_from_row(row: &Row) -> PostDetails {
  let user_id: i32 = row.get(3);
  let nickname: String = row.get(4);
  PostDetails {
    id: row.get(0),
    body: row.get(1),
    timestamp: row.get(2),
    author: Author {
      user_id,
      avatar: avatar_url(64),
      nickname,
    },
  }
}

static POST_DETAILS_SELECT: &'static str = r#"
SELECT p.id, p.body, p."timestamp", u.id, u.nickname
FROM posts p INNER JOIN users u ON p.user_id = u.id
"#;

static FEED_DETAILS_SELECT: &'static str = r#"
SELECT p.id, p.body, p."timestamp", u.id, u.nickname
FROM followers f INNER JOIN posts p ON p.user_id = f.followed_id
  INNER JOIN users u ON p.user_id = u.id
WHERE f.follower_id = $1
"#;

static NEWEST_FIRST: &'static str = r#"ORDER BY p."timestamp" DESC, p.id DESC"#;

/// `ILIKE` pattern matching `query` anywhere, with wildcards in `query`
/// taken literally.
pub fn contains_pattern(query: &str) -> String {
  let mut pattern = String::with_capacity(query.len() + 2);
  pattern.push('%');
  for ch in query.chars() {
    if ch == '%' || ch == '_' || ch == '\\' {
      pattern.push('\\');
    }
    pattern.push(ch);
  }
  pattern.push('%');
  pattern
}

impl PostService {
  pub fn new(cl: SharedClient) -> Result<PostService> {
    let insert_post = VersionedStatement::new(cl.clone(),
        &POST_COLUMNS.build_insert_returning("id"))?;

    let followed_posts = VersionedStatement::new(cl.clone(),
        &format!(r#"{} {} LIMIT $2 OFFSET $3"#, FEED_DETAILS_SELECT, NEWEST_FIRST))?;
    let count_followed_posts = VersionedStatement::new(cl.clone(),
        r#"SELECT COUNT(*) FROM followers f INNER JOIN posts p ON p.user_id = f.followed_id
        WHERE f.follower_id = $1"#)?;

    let posts_by_author = VersionedStatement::new(cl.clone(),
        &format!(r#"{} WHERE p.user_id = $1 {} LIMIT $2 OFFSET $3"#,
        POST_DETAILS_SELECT, NEWEST_FIRST))?;
    let count_posts_by_author = VersionedStatement::new(cl.clone(),
        r#"SELECT COUNT(*) FROM posts WHERE user_id = $1"#)?;

    let search_posts = VersionedStatement::new(cl.clone(),
        &format!(r#"{} WHERE p.body ILIKE $1 {} LIMIT $2 OFFSET $3"#,
        POST_DETAILS_SELECT, NEWEST_FIRST))?;
    let count_search_posts = VersionedStatement::new(cl.clone(),
        r#"SELECT COUNT(*) FROM posts WHERE body ILIKE $1"#)?;

    Ok(PostService {
      insert_post,

      followed_posts,
      count_followed_posts,

      posts_by_author,
      count_posts_by_author,

      search_posts,
      count_search_posts,
    })
  }

  pub async fn prepare(&self) -> Result<()> {
    self.insert_post.prepare().await?;

    self.followed_posts.prepare().await?;
    self.count_followed_posts.prepare().await?;

    self.posts_by_author.prepare().await?;
    self.count_posts_by_author.prepare().await?;

    self.search_posts.prepare().await?;
    self.count_search_posts.prepare().await?;
    Ok(())
  }

  pub async fn create(&self, post: &NewPost) -> Result<Post> {
    let timestamp = post.timestamp_or_now();
    let row = self.insert_post.query_one(&[
        &post.body, &post.user_id, &timestamp,
      ]).await?;
    Ok(post_from_row(&row))
  }

  /// Posts by everyone `user` follows, newest first.
  pub async fn followed_posts(&self, user: &User, req: PageRequest) -> Result<Page<PostDetails>> {
    let row = self.count_followed_posts.query_one(&[&user.id]).await?;
    let total: i64 = row.get(0);
    let rows = self.followed_posts.query(&[&user.id, &req.limit(), &req.offset()]).await?;
    Ok(Page::new(req, total, rows.iter().map(post_details_from_row).collect()))
  }

  pub async fn by_author(&self, user: &User, req: PageRequest) -> Result<Page<PostDetails>> {
    let row = self.count_posts_by_author.query_one(&[&user.id]).await?;
    let total: i64 = row.get(0);
    let rows = self.posts_by_author.query(&[&user.id, &req.limit(), &req.offset()]).await?;
    Ok(Page::new(req, total, rows.iter().map(post_details_from_row).collect()))
  }

  pub async fn search(&self, query: &str, req: PageRequest) -> Result<Page<PostDetails>> {
    let pattern = contains_pattern(query);
    let row = self.count_search_posts.query_one(&[&pattern]).await?;
    let total: i64 = row.get(0);
    let rows = self.search_posts.query(&[&pattern, &req.limit(), &req.offset()]).await?;
    Ok(Page::new(req, total, rows.iter().map(post_details_from_row).collect()))
  }
}
