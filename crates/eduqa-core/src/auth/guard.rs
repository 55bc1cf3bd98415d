use tracing::debug;

use super::{AuthModalMode, AuthStatus, PromptStore, SessionStore};

/// What a protected view should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    /// The session is still being verified; show a neutral placeholder.
    Loading,
    /// No user; show the call to action instead of the content.
    SignInRequired,
    /// Show the protected content.
    Render,
}

/// Gate for views that need a session.
#[derive(Clone)]
pub struct RouteGuard {
    session: SessionStore,
    prompt: PromptStore,
}

impl RouteGuard {
    pub fn new(session: SessionStore, prompt: PromptStore) -> Self {
        Self { session, prompt }
    }

    /// Evaluate the guard for `path` (path plus query string).
    ///
    /// Re-evaluating without a status change leaves the prompt alone: it is
    /// either already open or the user dismissed it on this path.
    pub fn check(&self, path: &str) -> GuardOutcome {
        let session = self.session.snapshot();

        if session.status == AuthStatus::Checking {
            return GuardOutcome::Loading;
        }

        if session.user.is_some() {
            return GuardOutcome::Render;
        }

        self.session.set_post_auth_redirect(path);

        let prompt = self.prompt.snapshot();
        let already_dismissed = prompt.dismissed_path.as_deref() == Some(path);
        if !prompt.auth_modal_open && !already_dismissed {
            debug!(path, "Opening login prompt for protected route");
            self.prompt.open_auth_modal(AuthModalMode::Login);
        }

        GuardOutcome::SignInRequired
    }
}
