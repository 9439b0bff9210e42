#[macro_use]
extern crate lazy_static;

pub mod error;
pub use error::Error;

pub mod app;

pub mod auth;

pub mod middleware;

pub mod forms;

pub mod models;

pub mod notify;

pub mod session;

pub mod services;

pub mod db;
