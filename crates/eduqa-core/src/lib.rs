//! Core library for the EduQA Campus client.
//!
//! Holds everything that is not presentation: the REST client, session
//! state and its reconciliation with the server, form validation, the
//! query cache and configuration. Front ends build on `auth::AuthService`,
//! `auth::RouteGuard` and `forum::Forum`.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod forms;
pub mod forum;
pub mod models;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthService, AuthStatus, PromptStore, RouteGuard, SessionBootstrap, SessionPersistence, SessionStore};
pub use config::Config;
pub use forum::Forum;
