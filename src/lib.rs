// Background fetch pipeline for browsing a GitHub account's repositories.
// Status probe, cached profile and repository streaming, and a polled dispatcher.

pub mod app;
pub mod cache;
pub mod config;
pub mod error;
pub mod github;
pub mod session;
pub mod state;

pub use app::App;
pub use config::Config;
pub use error::{ApiError, Error, Result};
