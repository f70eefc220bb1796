//! HTTP server for the story generator API.
//!
//! The binary in `main.rs` loads [`config::Settings`], builds an
//! [`state::AppState`] and serves [`routes::app`].

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::{CorsOrigins, CredentialStatus, Settings};
pub use error::{ApiError, ConfigError, ReloadError};
pub use routes::app;
pub use state::AppState;
