use std::sync::Arc;

use tokio::sync::watch;

/// Which form the auth prompt shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthModalMode {
    #[default]
    Login,
    Register,
}

/// Transient UI flags for the shared login/registration prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptState {
    pub auth_modal_open: bool,
    pub auth_modal_mode: AuthModalMode,
    /// Last path on which the user closed the prompt without signing in.
    pub dismissed_path: Option<String>,
}

/// Shared, observable prompt state, kept apart from session data.
#[derive(Clone)]
pub struct PromptStore {
    tx: Arc<watch::Sender<PromptState>>,
}

impl Default for PromptStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(PromptState::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<PromptState> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> PromptState {
        self.tx.borrow().clone()
    }

    pub fn is_open(&self) -> bool {
        self.tx.borrow().auth_modal_open
    }

    pub fn mode(&self) -> AuthModalMode {
        self.tx.borrow().auth_modal_mode
    }

    pub fn dismissed_path(&self) -> Option<String> {
        self.tx.borrow().dismissed_path.clone()
    }

    pub fn open_auth_modal(&self, mode: AuthModalMode) {
        self.tx.send_modify(|s| {
            s.auth_modal_open = true;
            s.auth_modal_mode = mode;
            s.dismissed_path = None;
        });
    }

    pub fn close_auth_modal(&self) {
        self.tx.send_if_modified(|s| std::mem::replace(&mut s.auth_modal_open, false));
    }

    pub fn set_auth_modal_mode(&self, mode: AuthModalMode) {
        self.tx.send_if_modified(|s| std::mem::replace(&mut s.auth_modal_mode, mode) != mode);
    }

    pub fn dismiss_auth_prompt(&self, path: Option<String>) {
        self.tx.send_modify(|s| s.dismissed_path = path);
    }

    /// Explicit user dismissal: close and remember where it happened.
    pub fn dismiss(&self, path: impl Into<String>) {
        self.close_auth_modal();
        self.dismiss_auth_prompt(Some(path.into()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_clears_dismissed_path() {
        let prompt = PromptStore::new();
        prompt.dismiss("/ask");
        assert_eq!(prompt.dismissed_path().as_deref(), Some("/ask"));

        prompt.open_auth_modal(AuthModalMode::Register);
        assert!(prompt.is_open());
        assert_eq!(prompt.mode(), AuthModalMode::Register);
        assert!(prompt.dismissed_path().is_none());
    }

    #[test]
    fn test_close_does_not_touch_dismissed_path() {
        let prompt = PromptStore::new();
        prompt.open_auth_modal(AuthModalMode::Login);
        prompt.close_auth_modal();
        assert!(!prompt.is_open());
        assert!(prompt.dismissed_path().is_none());

        prompt.dismiss_auth_prompt(Some("/profile".into()));
        prompt.open_auth_modal(AuthModalMode::Login);
        prompt.dismiss_auth_prompt(Some("/profile".into()));
        prompt.close_auth_modal();
        assert_eq!(prompt.dismissed_path().as_deref(), Some("/profile"));
    }

    #[test]
    fn test_mode_switch() {
        let prompt = PromptStore::new();
        assert_eq!(prompt.mode(), AuthModalMode::Login);
        prompt.set_auth_modal_mode(AuthModalMode::Register);
        assert_eq!(prompt.mode(), AuthModalMode::Register);
        assert!(!prompt.is_open());
    }
}
