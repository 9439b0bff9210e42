pub mod user;
pub mod post;

pub use self::{
  user::*,
  post::*,
};
