//! HTTP surface: JSON API over axum.

pub mod auth;
pub mod categories;
pub mod comments;
pub mod notes;
pub mod server;
pub mod tasks;

pub use server::{AppState, start_server};
