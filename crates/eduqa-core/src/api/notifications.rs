//! `/notifications` endpoints.

use reqwest::Method;

use crate::models::NotificationInbox;

use super::{ApiClient, ApiError, RequestBody};

impl ApiClient {
    pub async fn notifications(&self) -> Result<NotificationInbox, ApiError> {
        self.get("/notifications", &[]).await
    }

    pub async fn mark_notification_read(&self, id: &str) -> Result<(), ApiError> {
        self.send_discard(Method::PUT, &format!("/notifications/{}/read", id), RequestBody::Empty)
            .await
    }

    pub async fn mark_all_notifications_read(&self) -> Result<(), ApiError> {
        self.send_discard(Method::PUT, "/notifications/read-all", RequestBody::Empty)
            .await
    }
}
