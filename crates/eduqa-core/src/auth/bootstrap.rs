//! Startup reconciliation of persisted credentials with the server.
//!
//! `SessionBootstrap::run` seeds the session from storage and verifies the
//! token once; `spawn_reverification` keeps checking it on an interval for as
//! long as the session holds a token.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::User;

use super::{AuthStatus, SessionPersistence, SessionStore};

/// Default re-verification period (5 minutes).
pub const REVERIFY_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Source of the signed-in user's profile.
pub trait ProfileVerifier: Clone + Send + Sync + 'static {
    fn fetch_profile(&self) -> impl Future<Output = Result<User, ApiError>> + Send;
}

impl ProfileVerifier for ApiClient {
    fn fetch_profile(&self) -> impl Future<Output = Result<User, ApiError>> + Send {
        self.get_profile()
    }
}

#[derive(Clone)]
pub struct SessionBootstrap<V> {
    verifier: V,
    session: SessionStore,
    persistence: SessionPersistence,
}

impl<V: ProfileVerifier> SessionBootstrap<V> {
    pub fn new(verifier: V, session: SessionStore, persistence: SessionPersistence) -> Self {
        Self {
            verifier,
            session,
            persistence,
        }
    }

    /// Hydrate and verify. Never leaves the session in `Checking`.
    pub async fn run(&self) -> AuthStatus {
        if self.hydrate() {
            self.verify_initial().await;
        }
        let status = self.session.status();
        info!(%status, "Session bootstrap finished");
        status
    }

    /// Seed the session from storage. Returns whether a token was found.
    pub fn hydrate(&self) -> bool {
        self.persistence.remove_legacy();

        let token = match self.persistence.token() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read stored token");
                None
            }
        };

        match token {
            Some(token) => {
                let cached = self.persistence.user().unwrap_or_default();
                self.session.restore(cached.with_token(token));
                debug!("Restored stored session, verifying");
                true
            }
            None => {
                self.session.clear_credentials();
                false
            }
        }
    }

    /// First verification: any failure ends anonymous.
    pub async fn verify_initial(&self) {
        let Some(token) = self.session.token() else {
            return;
        };
        match self.verifier.fetch_profile().await {
            Ok(profile) => self.accept(&token, profile),
            Err(e) => self.reject(&e),
        }
    }

    /// One periodic check. Returns whether checking should continue.
    async fn verify_periodic(&self) -> bool {
        let Some(token) = self.session.token() else {
            return false;
        };
        match self.verifier.fetch_profile().await {
            Ok(profile) => {
                self.accept(&token, profile);
                true
            }
            Err(e) if e.is_transport() => {
                warn!(error = %e, "Session re-check could not reach the server; keeping session");
                true
            }
            Err(e) => {
                self.reject(&e);
                false
            }
        }
    }

    fn accept(&self, token: &str, profile: User) {
        if self.session.token().as_deref() != Some(token) {
            debug!("Session changed during verification; discarding profile");
            return;
        }
        self.session.set_credentials(Some(profile));
        if let Some(user) = self.session.user() {
            if let Err(e) = self.persistence.save_user(&user) {
                warn!(error = %e, "Failed to persist refreshed profile");
            }
        }
        debug!("Session verified");
    }

    fn reject(&self, err: &ApiError) {
        warn!(error = %err, "Stored session rejected");
        self.persistence.clear_logged();
        self.session.clear_credentials();
        self.session.set_auth_error(err.user_message());
        self.session.set_auth_status(AuthStatus::Anonymous);
    }

    /// Re-verify every `period` while the session holds a token.
    ///
    /// The task ends when the session loses its token or the handle is
    /// dropped.
    pub fn spawn_reverification(&self, period: Duration) -> ReverificationHandle {
        let this = self.clone();
        let task = tokio::spawn(async move {
            let mut changes = this.session.subscribe();
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                if changes.borrow_and_update().token().is_none() {
                    debug!("No token; stopping re-verification");
                    break;
                }
                tokio::select! {
                    _ = ticks.tick() => {
                        if !this.verify_periodic().await {
                            break;
                        }
                    }
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        });
        ReverificationHandle { task }
    }
}

/// Owner of the re-verification task. Dropping it cancels the task.
pub struct ReverificationHandle {
    task: JoinHandle<()>,
}

impl ReverificationHandle {
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for ReverificationHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::auth::storage::{LocalStorage, MemoryStorage, ACCESS_TOKEN_KEY, LEGACY_TOKEN_KEY, USER_DATA_KEY};

    #[derive(Clone, Default)]
    struct FakeVerifier {
        replies: Arc<Mutex<VecDeque<Result<User, ApiError>>>>,
        calls: Arc<AtomicUsize>,
    }

    impl FakeVerifier {
        fn replying(replies: Vec<Result<User, ApiError>>) -> Self {
            Self {
                replies: Arc::new(Mutex::new(replies.into())),
                calls: Arc::default(),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ProfileVerifier for FakeVerifier {
        fn fetch_profile(&self) -> impl Future<Output = Result<User, ApiError>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let reply = self.replies.lock().unwrap().pop_front();
            async move { reply.unwrap_or_else(|| Ok(profile("Ada"))) }
        }
    }

    fn profile(name: &str) -> User {
        serde_json::from_value(serde_json::json!({
            "_id": "u1",
            "name": name,
            "email": "ada@campus.edu",
        }))
        .unwrap()
    }

    fn stored(token: Option<&str>) -> (Arc<MemoryStorage>, SessionPersistence) {
        let storage = Arc::new(MemoryStorage::new());
        if let Some(token) = token {
            storage.set(ACCESS_TOKEN_KEY, token).unwrap();
            storage.set(USER_DATA_KEY, r#"{"_id":"u1","name":"Cached","department":"CS"}"#).unwrap();
        }
        let persistence = SessionPersistence::new(storage.clone());
        (storage, persistence)
    }

    #[tokio::test]
    async fn test_no_token_is_anonymous_without_request() {
        let (storage, persistence) = stored(None);
        storage.set(LEGACY_TOKEN_KEY, "old").unwrap();
        let verifier = FakeVerifier::default();
        let session = SessionStore::new();

        let boot = SessionBootstrap::new(verifier.clone(), session.clone(), persistence);
        assert_eq!(boot.run().await, AuthStatus::Anonymous);
        assert_eq!(verifier.calls(), 0);
        assert!(session.user().is_none());
        assert!(storage.get(LEGACY_TOKEN_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_hydrate_seeds_checking() {
        let (_storage, persistence) = stored(Some("tok"));
        let session = SessionStore::new();
        let boot = SessionBootstrap::new(FakeVerifier::default(), session.clone(), persistence);
        let mut changes = session.subscribe();
        changes.borrow_and_update();

        assert!(boot.hydrate());
        assert_eq!(changes.borrow_and_update().status, AuthStatus::Checking);
        assert_eq!(session.status(), AuthStatus::Checking);
        assert_eq!(session.token().as_deref(), Some("tok"));
        assert_eq!(session.user().unwrap().name.as_deref(), Some("Cached"));
    }

    #[tokio::test]
    async fn test_verified_profile_is_merged_and_persisted() {
        let (_storage, persistence) = stored(Some("tok"));
        let session = SessionStore::new();
        let boot = SessionBootstrap::new(
            FakeVerifier::replying(vec![Ok(profile("Ada"))]),
            session.clone(),
            persistence.clone(),
        );

        assert_eq!(boot.run().await, AuthStatus::Authenticated);
        let user = session.user().unwrap();
        assert_eq!(user.name.as_deref(), Some("Ada"));
        assert_eq!(user.department.as_deref(), Some("CS"));
        assert_eq!(user.access_token.as_deref(), Some("tok"));

        let snapshot = persistence.user().unwrap();
        assert_eq!(snapshot.name.as_deref(), Some("Ada"));
        assert!(snapshot.access_token.is_none());
    }

    #[tokio::test]
    async fn test_rejected_token_ends_anonymous() {
        let (storage, persistence) = stored(Some("tok"));
        let session = SessionStore::new();
        let boot = SessionBootstrap::new(
            FakeVerifier::replying(vec![Err(ApiError::Unauthorized("Session expired".into()))]),
            session.clone(),
            persistence,
        );

        assert_eq!(boot.run().await, AuthStatus::Anonymous);
        assert!(session.user().is_none());
        assert_eq!(session.error().as_deref(), Some("Session expired"));
        assert!(storage.get(ACCESS_TOKEN_KEY).unwrap().is_none());
        assert!(storage.get(USER_DATA_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unreachable_server_at_startup_ends_anonymous() {
        let (_storage, persistence) = stored(Some("tok"));
        let session = SessionStore::new();
        let boot = SessionBootstrap::new(
            FakeVerifier::replying(vec![Err(ApiError::Network("connection refused".into()))]),
            session.clone(),
            persistence,
        );

        assert_eq!(boot.run().await, AuthStatus::Anonymous);
        assert!(session.user().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_transport_failure_keeps_session() {
        let (_storage, persistence) = stored(Some("tok"));
        let session = SessionStore::new();
        let verifier = FakeVerifier::replying(vec![
            Ok(profile("Ada")),
            Err(ApiError::Timeout("timed out".into())),
        ]);
        let boot = SessionBootstrap::new(verifier.clone(), session.clone(), persistence);
        boot.run().await;

        let handle = boot.spawn_reverification(REVERIFY_INTERVAL);
        tokio::time::sleep(REVERIFY_INTERVAL + Duration::from_secs(1)).await;

        assert_eq!(verifier.calls(), 2);
        assert_eq!(session.status(), AuthStatus::Authenticated);
        assert!(!handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_rejection_clears_and_stops() {
        let (storage, persistence) = stored(Some("tok"));
        let session = SessionStore::new();
        let verifier = FakeVerifier::replying(vec![
            Ok(profile("Ada")),
            Err(ApiError::Forbidden("Account disabled".into())),
        ]);
        let boot = SessionBootstrap::new(verifier.clone(), session.clone(), persistence);
        boot.run().await;

        let handle = boot.spawn_reverification(REVERIFY_INTERVAL);
        tokio::time::sleep(REVERIFY_INTERVAL * 3).await;

        assert_eq!(verifier.calls(), 2);
        assert_eq!(session.status(), AuthStatus::Anonymous);
        assert!(storage.get(ACCESS_TOKEN_KEY).unwrap().is_none());
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reverification_stops_on_logout() {
        let (_storage, persistence) = stored(Some("tok"));
        let session = SessionStore::new();
        let verifier = FakeVerifier::default();
        let boot = SessionBootstrap::new(verifier.clone(), session.clone(), persistence);
        boot.run().await;

        let handle = boot.spawn_reverification(REVERIFY_INTERVAL);
        tokio::time::sleep(Duration::from_secs(1)).await;
        session.clear_credentials();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(handle.is_finished());
        tokio::time::sleep(REVERIFY_INTERVAL * 2).await;
        assert_eq!(verifier.calls(), 1);
    }
}
