pub mod ai;
pub mod api;
pub mod auth;
mod busy;
pub mod config;
pub mod repository;
pub mod session;
pub mod store;

pub use notes_core::{db, models};
