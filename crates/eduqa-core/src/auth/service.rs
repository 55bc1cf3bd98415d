//! Sign-in, sign-out and profile flows.
//!
//! Each flow talks to the API and then applies the result to the session,
//! its persisted mirror and the auth prompt in one place.

use thiserror::Error;
use tracing::{info, warn};

use crate::api::{ApiClient, ApiError, FieldError};
use crate::forms::{is_valid_email, LoginForm, RegisterForm, ValidationErrors, MAX_ATTACHMENT_BYTES};
use crate::models::{Attachment, AuthResponse, ProfileUpdate, User};

use super::{PromptStore, SessionPersistence, SessionStore};

#[derive(Error, Debug)]
pub enum AuthFlowError {
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Please sign in first")]
    NotSignedIn,
}

impl AuthFlowError {
    pub fn user_message(&self) -> String {
        match self {
            AuthFlowError::Api(e) => e.user_message().to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct AuthService {
    api: ApiClient,
    prompt: PromptStore,
}

impl AuthService {
    pub fn new(api: ApiClient, prompt: PromptStore) -> Self {
        Self { api, prompt }
    }

    fn session(&self) -> &SessionStore {
        self.api.session()
    }

    fn persistence(&self) -> &SessionPersistence {
        self.api.persistence()
    }

    /// Sign in. On success returns the pending redirect path, if any.
    pub async fn login(&self, form: &LoginForm) -> Result<Option<String>, AuthFlowError> {
        let request = form.validate()?;
        match self.api.login(&request).await {
            Ok(response) => Ok(self.complete_auth(response)),
            Err(e) => Err(self.auth_failed(e)),
        }
    }

    /// Create an account and sign in with it.
    pub async fn register(&self, form: &RegisterForm) -> Result<Option<String>, AuthFlowError> {
        let request = form.validate()?;
        match self.api.register(&request).await {
            Ok(response) => Ok(self.complete_auth(response)),
            Err(e) => Err(self.auth_failed(e)),
        }
    }

    fn complete_auth(&self, response: AuthResponse) -> Option<String> {
        let user = response.into_user();
        match user.access_token.as_deref() {
            Some(token) => {
                if let Err(e) = self.persistence().save(token, &user) {
                    warn!(error = %e, "Failed to persist session");
                }
                self.persistence().remove_legacy();
            }
            None => warn!("Auth response carried no token; session will not survive a restart"),
        }

        info!(user = user.display_name(), "Signed in");
        self.session().set_credentials(Some(user));
        self.prompt.close_auth_modal();
        self.session().take_post_auth_redirect()
    }

    fn auth_failed(&self, err: ApiError) -> AuthFlowError {
        warn!(error = %err, "Sign-in failed");
        self.session().set_auth_error(err.user_message());
        AuthFlowError::Api(err)
    }

    /// Sign out locally whatever the server says.
    pub async fn logout(&self) {
        if self.session().token().is_some() {
            if let Err(e) = self.api.logout().await {
                warn!(error = %e, "Server-side logout failed");
            }
        }
        self.persistence().clear_logged();
        self.session().clear_credentials();
        info!("Signed out");
    }

    /// Update profile fields. A failed request leaves the session untouched.
    pub async fn edit_profile(&self, update: &ProfileUpdate) -> Result<User, AuthFlowError> {
        let current = self.session().user().ok_or(AuthFlowError::NotSignedIn)?;
        validate_profile(update)?;

        let echoed = self.api.edit_profile(update).await?;
        let updated = echoed.unwrap_or_else(|| {
            let mut fallback = current.without_token();
            fallback.merge(update.as_user());
            fallback
        });
        Ok(self.apply_profile(updated))
    }

    pub async fn upload_profile_image(&self, image: Attachment) -> Result<User, AuthFlowError> {
        let current = self.session().user().ok_or(AuthFlowError::NotSignedIn)?;
        if image.size() > MAX_ATTACHMENT_BYTES {
            return Err(ValidationErrors {
                errors: vec![FieldError::new("profile_image", "Image must be 5MB or smaller")],
            }
            .into());
        }

        match self.api.upload_profile_image(image).await? {
            Some(updated) => Ok(self.apply_profile(updated)),
            None => Ok(current),
        }
    }

    /// Merge a server profile into the session, keeping the token.
    fn apply_profile(&self, profile: User) -> User {
        self.session().set_credentials(Some(profile.without_token()));
        let user = self.session().user().unwrap_or_default();
        if let Err(e) = self.persistence().save_user(&user) {
            warn!(error = %e, "Failed to persist profile");
        }
        user
    }
}

fn validate_profile(update: &ProfileUpdate) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();
    if let Some(name) = update.name.as_deref() {
        if name.trim().chars().count() < 2 {
            errors.push(FieldError::new("name", "Name must be at least 2 characters"));
        }
    }
    if let Some(email) = update.email.as_deref() {
        if !is_valid_email(email.trim()) {
            errors.push(FieldError::new("email", "Enter a valid email"));
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors { errors })
    }
}
