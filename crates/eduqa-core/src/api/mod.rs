//! EduQA Campus REST API.
//!
//! `client` holds the request pipeline; the remaining modules add one
//! `impl ApiClient` block per resource.

mod answers;
mod auth;
mod bookmarks;
pub mod client;
pub mod error;
mod notifications;
mod questions;

pub use client::{ApiClient, RequestBody, DEFAULT_BASE_URL, MAX_RATE_LIMIT_RETRIES, REQUEST_TIMEOUT_SECS};
pub use error::{ApiError, FieldError};
