use serde::{Deserialize, Serialize};

pub const DEFAULT_PER_PAGE: i64 = 3;

/// 1-based page window over an ordered result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
  pub page: i64,
  pub per_page: i64,
}

impl PageRequest {
  pub fn new(page: Option<i64>, per_page: i64) -> Self {
    Self {
      page: page.unwrap_or(1).max(1),
      per_page: per_page.max(1),
    }
  }

  pub fn limit(&self) -> i64 {
    self.per_page
  }

  pub fn offset(&self) -> i64 {
    (self.page - 1).saturating_mul(self.per_page)
  }
}

impl Default for PageRequest {
  fn default() -> Self {
    Self::new(None, DEFAULT_PER_PAGE)
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
  pub items: Vec<T>,
  pub page: i64,
  pub per_page: i64,
  pub total: i64,
  pub has_prev: bool,
  pub has_next: bool,
  pub prev_num: Option<i64>,
  pub next_num: Option<i64>,
}

impl<T> Page<T> {
  pub fn new(req: PageRequest, total: i64, items: Vec<T>) -> Self {
    let has_prev = req.page > 1;
    let has_next = req.offset().saturating_add(req.per_page) < total;
    Self {
      items,
      page: req.page,
      per_page: req.per_page,
      total,
      has_prev,
      has_next,
      prev_num: if has_prev { Some(req.page - 1) } else { None },
      next_num: if has_next { req.page.checked_add(1) } else { None },
    }
  }
}
