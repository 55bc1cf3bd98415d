//! Application wiring for the EduQA client.
//!
//! `App` owns the session, the prompt state and the services built on them,
//! and decides what happens when a command needs a signed-in user.

use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, warn};

use eduqa_core::auth::{AuthFlowError, GuardOutcome};
use eduqa_core::cache::CacheManager;
use eduqa_core::forms::{LoginForm, RegisterForm};
use eduqa_core::{
    ApiClient, AuthService, AuthStatus, Config, Forum, PromptStore, RouteGuard, SessionBootstrap,
    SessionPersistence, SessionStore,
};

use crate::prompt::{self, PromptOutcome};
use crate::render;

// ============================================================================
// Routes
// ============================================================================

/// Client-side views. Protected ones need a session before they render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Feed,
    Question(String),
    Ask,
    EditQuestion(String),
    MyQuestions,
    Bookmarks,
    Notifications,
    Profile,
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Feed => "/".to_string(),
            Route::Question(id) => format!("/questions/{}", id),
            Route::Ask => "/ask".to_string(),
            Route::EditQuestion(id) => format!("/questions/{}/edit", id),
            Route::MyQuestions => "/my-questions".to_string(),
            Route::Bookmarks => "/bookmarks".to_string(),
            Route::Notifications => "/notifications".to_string(),
            Route::Profile => "/profile".to_string(),
        }
    }

    pub fn is_protected(&self) -> bool {
        !matches!(self, Route::Feed | Route::Question(_))
    }
}

// ============================================================================
// App
// ============================================================================

pub struct App {
    pub config: Config,
    pub session: SessionStore,
    pub prompt: PromptStore,
    pub auth: AuthService,
    pub forum: Forum,
    pub guard: RouteGuard,
    pub bootstrap: SessionBootstrap<ApiClient>,
    /// Print raw JSON instead of formatted output.
    pub json: bool,
}

impl App {
    pub fn new(api_url: Option<String>, storage: Option<String>, json: bool) -> Result<Self> {
        let mut config = Config::load().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        });
        config.apply_overrides(api_url, storage);

        let persistence = SessionPersistence::new(config.build_storage()?);
        let session = SessionStore::new();
        let prompt = PromptStore::new();

        let api = ApiClient::new(
            &config.base_url(),
            config.request_timeout(),
            session.clone(),
            persistence.clone(),
        )?;

        let cache_dir = config.cache_dir().unwrap_or_else(|e| {
            warn!(error = %e, "No cache directory available, using ./cache");
            PathBuf::from("cache")
        });
        let cache = CacheManager::new(cache_dir)?;

        Ok(Self {
            auth: AuthService::new(api.clone(), prompt.clone()),
            guard: RouteGuard::new(session.clone(), prompt.clone()),
            bootstrap: SessionBootstrap::new(api.clone(), session.clone(), persistence),
            forum: Forum::new(api, cache),
            config,
            session,
            prompt,
            json,
        })
    }

    pub fn base_url(&self) -> &str {
        self.forum.api().base_url()
    }

    /// Restore and verify the stored session.
    pub async fn bootstrap(&self) -> AuthStatus {
        let status = self.bootstrap.run().await;
        if let Some(message) = self.session.error() {
            render::notice(&message);
        }
        status
    }

    /// Returns whether `route` may render, prompting for sign-in on
    /// protected routes.
    pub async fn enter(&self, route: &Route) -> Result<bool> {
        if !route.is_protected() {
            return Ok(true);
        }
        self.require_sign_in(route).await
    }

    /// Run the guard for an action on `route` that needs a user, whether or
    /// not the route itself is protected.
    pub async fn require_sign_in(&self, route: &Route) -> Result<bool> {
        let path = route.path();
        loop {
            match self.guard.check(&path) {
                GuardOutcome::Render => return Ok(true),
                GuardOutcome::Loading => {
                    let mut changes = self.session.subscribe();
                    changes
                        .wait_for(|s| s.status != AuthStatus::Checking)
                        .await?;
                }
                GuardOutcome::SignInRequired => {
                    if !self.prompt.is_open() {
                        render::sign_in_required(&path);
                        return Ok(false);
                    }
                    return match prompt::run(self).await? {
                        PromptOutcome::SignedIn(redirect) => {
                            debug!(path, redirect = ?redirect, "Signed in from prompt");
                            Ok(true)
                        }
                        PromptOutcome::Dismissed => {
                            self.prompt.dismiss(path.as_str());
                            render::sign_in_required(&path);
                            Ok(false)
                        }
                    };
                }
            }
        }
    }

    pub async fn login(&self, form: &LoginForm) -> Result<Option<String>, AuthFlowError> {
        let redirect = self.auth.login(form).await?;
        self.remember_email(&form.email);
        Ok(redirect)
    }

    pub async fn register(&self, form: &RegisterForm) -> Result<Option<String>, AuthFlowError> {
        let redirect = self.auth.register(form).await?;
        self.remember_email(&form.email);
        Ok(redirect)
    }

    /// Store the email for the next prompt. Failures only cost convenience.
    fn remember_email(&self, email: &str) {
        let result = Config::load_stored().and_then(|mut stored| {
            stored.last_email = Some(email.trim().to_string());
            stored.save()
        });
        if let Err(e) = result {
            warn!(error = %e, "Failed to save last email");
        }
    }

    /// Id of the signed-in user, if any.
    pub fn user_id(&self) -> Option<String> {
        self.session.user().and_then(|u| u.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_paths() {
        assert_eq!(Route::Feed.path(), "/");
        assert_eq!(Route::Question("q1".into()).path(), "/questions/q1");
        assert_eq!(Route::EditQuestion("q1".into()).path(), "/questions/q1/edit");
        assert_eq!(Route::Notifications.path(), "/notifications");
    }

    #[test]
    fn test_protected_routes() {
        assert!(!Route::Feed.is_protected());
        assert!(!Route::Question("q1".into()).is_protected());
        for route in [Route::Ask, Route::MyQuestions, Route::Bookmarks, Route::Notifications, Route::Profile] {
            assert!(route.is_protected(), "{:?}", route);
        }
        assert!(Route::EditQuestion("q1".into()).is_protected());
    }
}
