//! Session state and authentication.
//!
//! - `SessionStore`: the observable session record
//! - `PromptStore`: the shared sign-in prompt
//! - `RouteGuard`: gate for views that need a user
//! - `SessionBootstrap`: startup and periodic token verification
//! - `AuthService`: login, registration, logout and profile flows
//! - `SessionPersistence` over a `LocalStorage` backend: the persisted mirror

mod bootstrap;
mod credentials;
mod guard;
mod prompt;
mod service;
mod session;
pub mod storage;

pub use bootstrap::{ProfileVerifier, ReverificationHandle, SessionBootstrap, REVERIFY_INTERVAL};
pub use credentials::KeyringStorage;
pub use guard::{GuardOutcome, RouteGuard};
pub use prompt::{AuthModalMode, PromptState, PromptStore};
pub use service::{AuthFlowError, AuthService};
pub use session::{AuthStatus, Session, SessionStore};
pub use storage::{FileStorage, LocalStorage, MemoryStorage, SessionPersistence, StorageError};
