pub mod user;
pub mod post;
pub mod follow;
pub mod page;

pub use self::{
  user::*,
  post::*,
  follow::*,
  page::*,
};
