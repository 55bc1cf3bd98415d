use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::models::User;

/// Verification status of the current session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthStatus {
    /// Credentials are present but not yet confirmed by the server.
    #[default]
    Checking,
    Authenticated,
    Anonymous,
    /// Transient; resolves to `Anonymous` on the next reconciliation.
    Error,
}

impl std::fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AuthStatus::Checking => "checking",
            AuthStatus::Authenticated => "authenticated",
            AuthStatus::Anonymous => "anonymous",
            AuthStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Client-held record of the current identity.
///
/// `Authenticated` implies a user; `Anonymous` implies none.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub user: Option<User>,
    pub status: AuthStatus,
    pub error: Option<String>,
    pub redirect_path: Option<String>,
}

impl Session {
    pub fn token(&self) -> Option<&str> {
        self.user.as_ref().and_then(|u| u.access_token.as_deref())
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == AuthStatus::Authenticated && self.user.is_some()
    }

    pub fn set_credentials(&mut self, incoming: Option<User>) {
        let Some(incoming) = incoming.filter(|u| !u.is_empty()) else {
            self.clear_credentials();
            return;
        };
        match self.user.as_mut() {
            Some(current) => current.merge(incoming),
            None => {
                let mut incoming = incoming;
                incoming.cleared.clear();
                self.user = Some(incoming);
            }
        }
        self.status = AuthStatus::Authenticated;
        self.error = None;
    }

    /// Seed stored credentials that still need server confirmation.
    pub fn restore(&mut self, stored: User) {
        self.set_credentials(Some(stored));
        if self.user.is_some() {
            self.status = AuthStatus::Checking;
        }
    }

    pub fn clear_credentials(&mut self) {
        self.user = None;
        self.status = AuthStatus::Anonymous;
        self.error = None;
    }

    pub fn set_auth_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.status = AuthStatus::Error;
    }

    /// Direct transition. Returns false when the transition would break the
    /// user/status invariant and was refused.
    pub fn set_auth_status(&mut self, status: AuthStatus) -> bool {
        match status {
            AuthStatus::Authenticated if self.user.is_none() => return false,
            AuthStatus::Anonymous => self.user = None,
            _ => {}
        }
        self.status = status;
        true
    }
}

/// Shared, observable session container.
///
/// Cloning yields another handle to the same record. Mutations go through the
/// methods below and wake every subscriber.
#[derive(Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<Session>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Session::default());
        Self { tx: Arc::new(tx) }
    }

    /// Receiver notified on every mutation.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> Session {
        self.tx.borrow().clone()
    }

    pub fn status(&self) -> AuthStatus {
        self.tx.borrow().status
    }

    pub fn user(&self) -> Option<User> {
        self.tx.borrow().user.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.tx.borrow().token().map(str::to_string)
    }

    pub fn error(&self) -> Option<String> {
        self.tx.borrow().error.clone()
    }

    pub fn redirect_path(&self) -> Option<String> {
        self.tx.borrow().redirect_path.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().is_authenticated()
    }

    pub fn set_credentials(&self, user: Option<User>) {
        self.tx.send_modify(|s| s.set_credentials(user));
        debug!(status = %self.status(), "Credentials updated");
    }

    /// Seed stored credentials as `Checking` in a single update.
    pub fn restore(&self, stored: User) {
        self.tx.send_modify(|s| s.restore(stored));
        debug!(status = %self.status(), "Stored credentials restored");
    }

    pub fn clear_credentials(&self) {
        self.tx.send_modify(Session::clear_credentials);
        debug!("Credentials cleared");
    }

    pub fn set_auth_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.tx.send_modify(|s| s.set_auth_error(message));
    }

    pub fn set_auth_status(&self, status: AuthStatus) {
        let mut applied = true;
        self.tx.send_if_modified(|s| {
            let before = s.status;
            applied = s.set_auth_status(status);
            applied && (before != status || status == AuthStatus::Anonymous)
        });
        if !applied {
            warn!(%status, "Refused status transition without a user");
        }
    }

    pub fn set_post_auth_redirect(&self, path: impl Into<String>) {
        let path = path.into();
        self.tx.send_if_modified(|s| {
            if s.redirect_path.as_deref() == Some(path.as_str()) {
                return false;
            }
            s.redirect_path = Some(path);
            true
        });
    }

    pub fn clear_post_auth_redirect(&self) {
        self.tx.send_if_modified(|s| s.redirect_path.take().is_some());
    }

    /// Consume the pending redirect target.
    pub fn take_post_auth_redirect(&self) -> Option<String> {
        let mut taken = None;
        self.tx.send_if_modified(|s| {
            taken = s.redirect_path.take();
            taken.is_some()
        });
        taken
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(json: &str) -> User {
        serde_json::from_str(json).unwrap()
    }

    fn invariant_holds(s: &Session) -> bool {
        (s.status == AuthStatus::Authenticated) == s.user.is_some()
            || s.status == AuthStatus::Checking
            || s.status == AuthStatus::Error
    }

    #[test]
    fn test_initial_session_is_checking() {
        let store = SessionStore::new();
        assert_eq!(store.status(), AuthStatus::Checking);
        assert!(store.user().is_none());
    }

    #[test]
    fn test_set_credentials_shallow_merge() {
        let store = SessionStore::new();
        store.set_credentials(Some(user(r#"{"_id":"u1","name":"Ada","email":"ada@campus.edu"}"#)));
        store.set_credentials(Some(user(r#"{"name":"Ada Lovelace","department":"Math"}"#)));

        let expected = user(r#"{"_id":"u1","name":"Ada Lovelace","email":"ada@campus.edu","department":"Math"}"#);
        assert_eq!(store.user(), Some(expected));
        assert_eq!(store.status(), AuthStatus::Authenticated);
    }

    #[test]
    fn test_set_credentials_empty_clears() {
        let store = SessionStore::new();
        store.set_credentials(Some(user(r#"{"_id":"u1"}"#)));
        store.set_credentials(Some(User::default()));
        assert!(store.user().is_none());
        assert_eq!(store.status(), AuthStatus::Anonymous);

        store.set_credentials(Some(user(r#"{"_id":"u1"}"#)));
        store.set_credentials(None);
        assert_eq!(store.status(), AuthStatus::Anonymous);
    }

    #[test]
    fn test_set_credentials_null_fields_clear_without_signing_out() {
        let store = SessionStore::new();
        store.set_credentials(Some(user(
            r#"{"_id":"u1","name":"Ada","profile_image":"ada.png","department":"CS","access_token":"t1"}"#,
        )));
        store.set_credentials(Some(user(r#"{"profile_image":null,"department":null}"#)));

        let current = store.user().expect("still signed in");
        assert_eq!(store.status(), AuthStatus::Authenticated);
        assert_eq!(current.id.as_deref(), Some("u1"));
        assert_eq!(current.profile_image, None);
        assert_eq!(current.department, None);
        assert_eq!(store.token().as_deref(), Some("t1"));
    }

    #[test]
    fn test_restore_goes_straight_to_checking() {
        let store = SessionStore::new();
        store.clear_credentials();
        let mut changes = store.subscribe();
        changes.borrow_and_update();

        store.restore(user(r#"{"_id":"u1","access_token":"tok"}"#));

        assert!(changes.has_changed().unwrap());
        let seen = changes.borrow_and_update().clone();
        assert_eq!(seen.status, AuthStatus::Checking);
        assert_eq!(seen.token(), Some("tok"));
        assert!(!changes.has_changed().unwrap());
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_restore_empty_record_is_anonymous() {
        let mut session = Session::default();
        session.restore(User::default());
        assert_eq!(session.status, AuthStatus::Anonymous);
        assert!(session.user.is_none());
    }

    #[test]
    fn test_error_cleared_on_credentials() {
        let store = SessionStore::new();
        store.set_auth_error("bad password");
        assert_eq!(store.status(), AuthStatus::Error);
        assert_eq!(store.error().as_deref(), Some("bad password"));

        store.set_credentials(Some(user(r#"{"_id":"u1"}"#)));
        assert!(store.error().is_none());

        store.set_auth_error("expired");
        store.clear_credentials();
        assert!(store.error().is_none());
        assert_eq!(store.status(), AuthStatus::Anonymous);
    }

    #[test]
    fn test_authenticated_requires_user() {
        let store = SessionStore::new();
        store.clear_credentials();
        store.set_auth_status(AuthStatus::Authenticated);
        assert_eq!(store.status(), AuthStatus::Anonymous);
    }

    #[test]
    fn test_anonymous_drops_user() {
        let store = SessionStore::new();
        store.set_credentials(Some(user(r#"{"_id":"u1","access_token":"t"}"#)));
        store.set_auth_status(AuthStatus::Anonymous);
        assert!(store.user().is_none());
        assert!(store.token().is_none());
    }

    #[test]
    fn test_invariant_across_operations() {
        let mut s = Session::default();
        let ops: Vec<Box<dyn Fn(&mut Session)>> = vec![
            Box::new(|s: &mut Session| s.set_credentials(Some(user(r#"{"_id":"u1"}"#)))),
            Box::new(|s: &mut Session| {
                s.set_auth_status(AuthStatus::Anonymous);
            }),
            Box::new(|s: &mut Session| {
                s.set_auth_status(AuthStatus::Authenticated);
            }),
            Box::new(|s: &mut Session| s.set_auth_error("oops")),
            Box::new(|s: &mut Session| {
                s.set_auth_status(AuthStatus::Checking);
            }),
            Box::new(Session::clear_credentials),
            Box::new(|s: &mut Session| s.set_credentials(None)),
        ];
        for first in &ops {
            for second in &ops {
                first(&mut s);
                assert!(invariant_holds(&s), "{:?}", s);
                second(&mut s);
                assert!(invariant_holds(&s), "{:?}", s);
                if s.status == AuthStatus::Authenticated {
                    assert!(s.user.is_some());
                }
                if s.status == AuthStatus::Anonymous {
                    assert!(s.user.is_none());
                }
            }
        }
    }

    #[test]
    fn test_redirect_is_one_shot() {
        let store = SessionStore::new();
        store.set_post_auth_redirect("/ask");
        assert_eq!(store.redirect_path().as_deref(), Some("/ask"));
        assert_eq!(store.take_post_auth_redirect().as_deref(), Some("/ask"));
        assert!(store.take_post_auth_redirect().is_none());

        store.set_post_auth_redirect("/profile");
        store.clear_post_auth_redirect();
        assert!(store.redirect_path().is_none());
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let store = SessionStore::new();
        let mut rx = store.subscribe();
        store.set_credentials(Some(user(r#"{"_id":"u1"}"#)));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().status, AuthStatus::Authenticated);
    }
}
