pub mod util;

mod user;
mod post;
mod follow;
pub use self::{
  user::*,
  post::*,
  follow::*,
};

mod service;
pub use service::*;
