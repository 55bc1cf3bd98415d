//! `/bookmarks` endpoints.

use reqwest::Method;
use serde::Deserialize;
use tracing::debug;

use crate::models::{Answer, ApiResponse, Question};

use super::{ApiClient, ApiError, RequestBody};

/// Saved entries come back as bare ids or populated documents.
#[derive(Deserialize)]
#[serde(untagged)]
enum SavedRef {
    Id(String),
    Doc {
        #[serde(rename = "_id", alias = "id")]
        id: String,
    },
}

impl SavedRef {
    fn into_id(self) -> String {
        match self {
            SavedRef::Id(id) | SavedRef::Doc { id } => id,
        }
    }
}

impl ApiClient {
    /// Toggle a bookmark and return the user's saved ids after the change.
    async fn toggle_bookmark(&self, method: Method, path: String) -> Result<Vec<String>, ApiError> {
        let response: ApiResponse<Vec<SavedRef>> = self.send(method, &path, RequestBody::Empty).await?;
        let ids: Vec<String> = response.data.into_iter().map(SavedRef::into_id).collect();
        debug!(path = %path, saved = ids.len(), "Bookmarks updated");
        Ok(ids)
    }

    pub async fn save_question(&self, id: &str) -> Result<Vec<String>, ApiError> {
        self.toggle_bookmark(Method::POST, format!("/bookmarks/questions/{}", id))
            .await
    }

    pub async fn unsave_question(&self, id: &str) -> Result<Vec<String>, ApiError> {
        self.toggle_bookmark(Method::DELETE, format!("/bookmarks/questions/{}", id))
            .await
    }

    pub async fn save_answer(&self, id: &str) -> Result<Vec<String>, ApiError> {
        self.toggle_bookmark(Method::POST, format!("/bookmarks/answers/{}", id))
            .await
    }

    pub async fn unsave_answer(&self, id: &str) -> Result<Vec<String>, ApiError> {
        self.toggle_bookmark(Method::DELETE, format!("/bookmarks/answers/{}", id))
            .await
    }

    pub async fn saved_questions(&self) -> Result<Vec<Question>, ApiError> {
        let response: ApiResponse<Vec<Question>> = self.get("/bookmarks/questions", &[]).await?;
        Ok(response.data)
    }

    pub async fn saved_answers(&self) -> Result<Vec<Answer>, ApiError> {
        let response: ApiResponse<Vec<Answer>> = self.get("/bookmarks/answers", &[]).await?;
        Ok(response.data)
    }
}
