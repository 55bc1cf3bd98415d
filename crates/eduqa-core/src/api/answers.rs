//! `/questions/:id/answers` endpoints.

use reqwest::multipart::Form;
use reqwest::Method;
use tracing::info;

use crate::forms::AnswerDraft;

use super::client::file_part;
use super::{ApiClient, ApiError, RequestBody};

fn answer_path(question_id: &str, answer_id: &str) -> String {
    format!("/questions/{}/answers/{}", question_id, answer_id)
}

impl ApiClient {
    pub async fn add_answer(&self, question_id: &str, draft: AnswerDraft) -> Result<(), ApiError> {
        info!(question_id, files = draft.attachments.len(), "Adding answer");
        let mut form = Form::new().text("content", draft.content);
        for file in draft.attachments {
            form = form.part("attachments", file_part(file)?);
        }
        self.send_discard(
            Method::POST,
            &format!("/questions/{}/answers", question_id),
            RequestBody::Multipart(form),
        )
        .await
    }

    pub async fn like_answer(&self, question_id: &str, answer_id: &str) -> Result<(), ApiError> {
        let path = format!("{}/like", answer_path(question_id, answer_id));
        self.send_discard(Method::PUT, &path, RequestBody::Empty).await
    }

    pub async fn undo_like_answer(&self, question_id: &str, answer_id: &str) -> Result<(), ApiError> {
        let path = format!("{}/undo_like", answer_path(question_id, answer_id));
        self.send_discard(Method::PUT, &path, RequestBody::Empty).await
    }

    pub async fn delete_answer(&self, question_id: &str, answer_id: &str) -> Result<(), ApiError> {
        info!(question_id, answer_id, "Deleting answer");
        self.send_discard(Method::DELETE, &answer_path(question_id, answer_id), RequestBody::Empty)
            .await
    }
}
