//! `/questions` endpoints, excluding answers.

use reqwest::multipart::Form;
use reqwest::Method;
use tracing::{debug, info};

use crate::forms::QuestionDraft;
use crate::models::{ApiResponse, Question, QuestionPage, QuestionQuery};

use super::client::file_part;
use super::{ApiClient, ApiError, RequestBody};

/// Title, content, one `tags` part per tag and one `attachments` part per file.
fn question_form(draft: QuestionDraft) -> Result<Form, ApiError> {
    let mut form = Form::new()
        .text("title", draft.title)
        .text("content", draft.content);
    for tag in draft.tags {
        form = form.text("tags", tag);
    }
    for file in draft.attachments {
        form = form.part("attachments", file_part(file)?);
    }
    Ok(form)
}

fn question_path(id: &str, action: &str) -> String {
    format!("/questions/{}/{}", id, action)
}

impl ApiClient {
    /// One page of the public feed.
    pub async fn list_questions(&self, query: &QuestionQuery) -> Result<QuestionPage, ApiError> {
        let params = query.to_params();
        let response: ApiResponse<Vec<Question>> = self.get("/questions", &params).await?;
        let total = response.total.unwrap_or(response.data.len() as u64);
        debug!(count = response.data.len(), total, "Fetched question feed");
        Ok(QuestionPage {
            questions: response.data,
            total,
            pagination: response.pagination,
        })
    }

    pub async fn my_questions(&self) -> Result<Vec<Question>, ApiError> {
        let response: ApiResponse<Vec<Question>> = self.get("/questions/my-questions", &[]).await?;
        Ok(response.data)
    }

    pub async fn get_question(&self, id: &str) -> Result<Question, ApiError> {
        let response: ApiResponse<Question> = self.get(&format!("/questions/{}", id), &[]).await?;
        Ok(response.data)
    }

    pub async fn ask_question(&self, draft: QuestionDraft) -> Result<Question, ApiError> {
        info!(title = %draft.title, files = draft.attachments.len(), "Asking question");
        let form = question_form(draft)?;
        let response: ApiResponse<Question> = self
            .send(Method::POST, "/questions/ask", RequestBody::Multipart(form))
            .await?;
        Ok(response.data)
    }

    /// Replace a question's text and tags, add new files and drop
    /// `files_to_remove` (stored attachment paths).
    pub async fn edit_question(
        &self,
        id: &str,
        draft: QuestionDraft,
        files_to_remove: &[String],
    ) -> Result<Question, ApiError> {
        info!(question_id = id, removed = files_to_remove.len(), "Editing question");
        let mut form = question_form(draft)?;
        if !files_to_remove.is_empty() {
            let removed = serde_json::to_string(files_to_remove)
                .map_err(|e| ApiError::Unknown(format!("Failed to encode request: {}", e)))?;
            form = form.text("filesToRemove", removed);
        }
        let response: ApiResponse<Question> = self
            .send(Method::PUT, &question_path(id, "edit"), RequestBody::Multipart(form))
            .await?;
        Ok(response.data)
    }

    pub async fn delete_question(&self, id: &str) -> Result<(), ApiError> {
        info!(question_id = id, "Deleting question");
        self.send_discard(Method::DELETE, &format!("/questions/{}", id), RequestBody::Empty)
            .await
    }

    pub async fn like_question(&self, id: &str) -> Result<(), ApiError> {
        self.send_discard(Method::PUT, &question_path(id, "like"), RequestBody::Empty)
            .await
    }

    pub async fn undo_like_question(&self, id: &str) -> Result<(), ApiError> {
        self.send_discard(Method::PUT, &question_path(id, "undo_like"), RequestBody::Empty)
            .await
    }

    pub async fn mark_solved(&self, id: &str) -> Result<(), ApiError> {
        self.send_discard(Method::PUT, &question_path(id, "solve"), RequestBody::Empty)
            .await
    }

    pub async fn mark_unsolved(&self, id: &str) -> Result<(), ApiError> {
        self.send_discard(Method::PUT, &question_path(id, "unsolve"), RequestBody::Empty)
            .await
    }
}
