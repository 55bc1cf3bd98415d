//! `/auth` endpoints.

use reqwest::multipart::Form;
use reqwest::Method;
use serde::Deserialize;
use tracing::info;

use crate::forms::{LoginRequest, RegisterRequest};
use crate::models::{ApiResponse, Attachment, AuthResponse, ProfileUpdate, User};

use super::client::{file_part, json_body};
use super::{ApiClient, ApiError, RequestBody};

/// Multipart field name the upload endpoint reads.
const PROFILE_IMAGE_FIELD: &str = "profile_image";

/// Profile mutations may answer without echoing the user.
#[derive(Deserialize)]
struct ProfileEcho {
    #[serde(default)]
    data: Option<User>,
}

impl ApiClient {
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        info!(email = %request.email, "Logging in");
        self.send(Method::POST, "/auth/login", json_body(request)?).await
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        info!(email = %request.email, role = %request.role, "Registering");
        self.send(Method::POST, "/auth/register", json_body(request)?).await
    }

    /// Current user's profile; used to verify the stored token.
    pub async fn get_profile(&self) -> Result<User, ApiError> {
        let response: ApiResponse<User> = self.get("/auth/profile", &[]).await?;
        Ok(response.data)
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        self.get::<serde_json::Value>("/auth/logout", &[]).await.map(|_| ())
    }

    /// Returns the updated profile when the server echoes it.
    pub async fn edit_profile(&self, update: &ProfileUpdate) -> Result<Option<User>, ApiError> {
        let response: ProfileEcho = self.send(Method::PUT, "/auth/edit", json_body(update)?).await?;
        Ok(response.data)
    }

    pub async fn upload_profile_image(&self, image: Attachment) -> Result<Option<User>, ApiError> {
        let form = Form::new().part(PROFILE_IMAGE_FIELD, file_part(image)?);
        let response: ProfileEcho = self
            .send(Method::POST, "/auth/upload", RequestBody::Multipart(form))
            .await?;
        Ok(response.data)
    }
}
