//! Forum queries and mutations over the API and the local cache.
//!
//! Reads store their result in the cache. Each mutation names the
//! `QueryKey`s it affects and refetches them once it succeeds; a failed
//! mutation leaves both the cache and the session alone.

use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError, FieldError};
use crate::cache::{CacheManager, CachedData, QueryKey};
use crate::forms::{AnswerForm, QuestionForm, ValidationErrors, MAX_ATTACHMENTS};
use crate::models::{Answer, Notification, NotificationInbox, Question, QuestionPage, QuestionQuery, User};

#[derive(Error, Debug)]
pub enum ForumError {
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl ForumError {
    pub fn user_message(&self) -> String {
        match self {
            ForumError::Api(e) => e.user_message().to_string(),
            ForumError::Invalid(e) => e.to_string(),
        }
    }
}

/// A query result, possibly served from the cache when the server was
/// unreachable.
#[derive(Debug, Clone)]
pub struct Fetched<T> {
    pub data: T,
    /// Age of the cached copy; `None` for a live response.
    pub cached_age: Option<String>,
}

impl<T> Fetched<T> {
    fn live(data: T) -> Self {
        Self { data, cached_age: None }
    }

    pub fn is_cached(&self) -> bool {
        self.cached_age.is_some()
    }
}

/// Serve a cached copy in place of a transport failure.
fn offline_fallback<T>(err: ApiError, cached: anyhow::Result<Option<CachedData<T>>>) -> Result<Fetched<T>, ApiError> {
    if !err.is_transport() {
        return Err(err);
    }
    match cached {
        Ok(Some(cached)) => {
            warn!(error = %err, age = %cached.age_display(), "Server unreachable; using cached data");
            Ok(Fetched {
                cached_age: Some(cached.age_display()),
                data: cached.data,
            })
        }
        _ => Err(err),
    }
}

pub struct Forum {
    api: ApiClient,
    cache: CacheManager,
}

impl Forum {
    pub fn new(api: ApiClient, cache: CacheManager) -> Self {
        Self { api, cache }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    fn store<E: std::fmt::Display>(key: &str, result: Result<(), E>) {
        if let Err(e) = result {
            warn!(cache = key, error = %e, "Failed to update cache");
        }
    }

    // ===== Queries =====

    pub async fn questions(&self, query: &QuestionQuery) -> Result<QuestionPage, ApiError> {
        let page = self.api.list_questions(query).await?;
        Self::store("feed", self.cache.save_feed(query, &page));
        Ok(page)
    }

    /// Feed page, falling back to the cached page for the same query when
    /// the server cannot be reached.
    pub async fn questions_or_cached(&self, query: &QuestionQuery) -> Result<Fetched<QuestionPage>, ApiError> {
        match self.questions(query).await {
            Ok(page) => Ok(Fetched::live(page)),
            Err(e) => {
                let cached = self.cache.load_feed().map(|c| {
                    c.filter(|c| c.data.query == *query).map(|c| CachedData {
                        data: c.data.page,
                        cached_at: c.cached_at,
                    })
                });
                offline_fallback(e, cached)
            }
        }
    }

    pub async fn question(&self, id: &str) -> Result<Question, ApiError> {
        let question = self.api.get_question(id).await?;
        Self::store("question", self.cache.save_question(&question));
        Ok(question)
    }

    pub async fn question_or_cached(&self, id: &str) -> Result<Fetched<Question>, ApiError> {
        match self.question(id).await {
            Ok(question) => Ok(Fetched::live(question)),
            Err(e) => offline_fallback(e, self.cache.load_question(id)),
        }
    }

    pub async fn my_questions(&self) -> Result<Vec<Question>, ApiError> {
        let questions = self.api.my_questions().await?;
        Self::store("my_questions", self.cache.save_my_questions(&questions));
        Ok(questions)
    }

    pub async fn saved_questions(&self) -> Result<Vec<Question>, ApiError> {
        let questions = self.api.saved_questions().await?;
        Self::store("saved_questions", self.cache.save_saved_questions(&questions));
        Ok(questions)
    }

    pub async fn saved_answers(&self) -> Result<Vec<Answer>, ApiError> {
        let answers = self.api.saved_answers().await?;
        Self::store("saved_answers", self.cache.save_saved_answers(&answers));
        Ok(answers)
    }

    pub async fn notifications(&self) -> Result<NotificationInbox, ApiError> {
        let inbox = self.api.notifications().await?;
        Self::store("notifications", self.cache.save_notifications(&inbox));
        Ok(inbox)
    }

    // ===== Refetch =====

    /// Refetch the given keys concurrently. A key that cannot be refetched
    /// is dropped from the cache instead.
    pub async fn refetch(&self, keys: &[QueryKey]) {
        join_all(keys.iter().cloned().map(|key| self.refetch_one(key))).await;
    }

    async fn refetch_one(&self, key: QueryKey) {
        if key.is_private() && self.api.session().token().is_none() {
            self.invalidate(&[key]);
            return;
        }

        let result = match &key {
            QueryKey::Feed => match self.cache.load_feed() {
                Ok(Some(cached)) => self.questions(&cached.data.query).await.map(drop),
                _ => {
                    self.invalidate(std::slice::from_ref(&key));
                    return;
                }
            },
            QueryKey::Question(id) => self.question(id).await.map(drop),
            QueryKey::MyQuestions => self.my_questions().await.map(drop),
            QueryKey::SavedQuestions => self.saved_questions().await.map(drop),
            QueryKey::SavedAnswers => self.saved_answers().await.map(drop),
            QueryKey::Notifications => self.notifications().await.map(drop),
        };

        match result {
            Ok(()) => debug!(cache = %key.cache_name(), "Refetched"),
            Err(e) => {
                warn!(cache = %key.cache_name(), error = %e, "Refetch failed; dropping cached entry");
                self.invalidate(std::slice::from_ref(&key));
            }
        }
    }

    fn invalidate(&self, keys: &[QueryKey]) {
        if let Err(e) = self.cache.invalidate(keys) {
            warn!(error = %e, "Failed to invalidate cache");
        }
    }

    /// Drop everything cached for the signed-in user.
    pub fn clear_private(&self) {
        self.invalidate(&QueryKey::PRIVATE);
    }

    // ===== Questions =====

    pub async fn ask_question(&self, form: &QuestionForm) -> Result<Question, ForumError> {
        let draft = form.validate()?;
        let question = self.api.ask_question(draft).await?;
        info!(question_id = %question.id, "Question posted");
        self.refetch(&[QueryKey::Feed, QueryKey::MyQuestions]).await;
        Ok(question)
    }

    /// Edit `existing`. `files_to_remove` are paths from its attachments.
    pub async fn edit_question(
        &self,
        existing: &Question,
        form: &QuestionForm,
        files_to_remove: &[String],
    ) -> Result<Question, ForumError> {
        let draft = form.validate()?;
        let kept = existing
            .attachments
            .iter()
            .filter(|path| !files_to_remove.contains(path))
            .count();
        if kept + draft.attachments.len() > MAX_ATTACHMENTS {
            return Err(ValidationErrors {
                errors: vec![FieldError::new("attachments", "You can attach at most 5 files")],
            }
            .into());
        }

        let question = self.api.edit_question(&existing.id, draft, files_to_remove).await?;
        self.refetch(&[
            QueryKey::Question(existing.id.clone()),
            QueryKey::Feed,
            QueryKey::MyQuestions,
        ])
        .await;
        Ok(question)
    }

    pub async fn delete_question(&self, id: &str) -> Result<(), ApiError> {
        self.api.delete_question(id).await?;
        self.invalidate(&[QueryKey::Question(id.to_string())]);
        self.refetch(&[QueryKey::Feed, QueryKey::MyQuestions, QueryKey::SavedQuestions])
            .await;
        Ok(())
    }

    /// Like or unlike depending on `like`.
    pub async fn set_question_like(&self, id: &str, like: bool) -> Result<(), ApiError> {
        if like {
            self.api.like_question(id).await?;
        } else {
            self.api.undo_like_question(id).await?;
        }
        self.refetch(&[QueryKey::Question(id.to_string()), QueryKey::Feed]).await;
        Ok(())
    }

    pub async fn set_solved(&self, id: &str, solved: bool) -> Result<(), ApiError> {
        if solved {
            self.api.mark_solved(id).await?;
        } else {
            self.api.mark_unsolved(id).await?;
        }
        self.refetch(&[
            QueryKey::Question(id.to_string()),
            QueryKey::Feed,
            QueryKey::MyQuestions,
        ])
        .await;
        Ok(())
    }

    // ===== Answers =====

    pub async fn add_answer(&self, question_id: &str, form: &AnswerForm) -> Result<(), ForumError> {
        let draft = form.validate()?;
        self.api.add_answer(question_id, draft).await?;
        self.refetch(&[QueryKey::Question(question_id.to_string())]).await;
        Ok(())
    }

    pub async fn set_answer_like(&self, question_id: &str, answer_id: &str, like: bool) -> Result<(), ApiError> {
        if like {
            self.api.like_answer(question_id, answer_id).await?;
        } else {
            self.api.undo_like_answer(question_id, answer_id).await?;
        }
        self.refetch(&[QueryKey::Question(question_id.to_string())]).await;
        Ok(())
    }

    pub async fn delete_answer(&self, question_id: &str, answer_id: &str) -> Result<(), ApiError> {
        self.api.delete_answer(question_id, answer_id).await?;
        self.refetch(&[QueryKey::Question(question_id.to_string()), QueryKey::SavedAnswers])
            .await;
        Ok(())
    }

    // ===== Bookmarks =====

    /// Save or unsave a question for the signed-in user. Returns whether it
    /// is saved afterwards.
    pub async fn toggle_question_bookmark(&self, id: &str) -> Result<bool, ApiError> {
        let saved = self
            .api
            .session()
            .user()
            .is_some_and(|u| u.has_saved_question(id));
        let ids = if saved {
            self.api.unsave_question(id).await?
        } else {
            self.api.save_question(id).await?
        };
        let now_saved = ids.iter().any(|saved| saved == id);
        self.update_saved(User {
            saved_questions: Some(ids),
            ..Default::default()
        });
        self.refetch(&[QueryKey::Question(id.to_string()), QueryKey::SavedQuestions])
            .await;
        Ok(now_saved)
    }

    pub async fn toggle_answer_bookmark(&self, id: &str) -> Result<bool, ApiError> {
        let saved = self
            .api
            .session()
            .user()
            .is_some_and(|u| u.has_saved_answer(id));
        let ids = if saved {
            self.api.unsave_answer(id).await?
        } else {
            self.api.save_answer(id).await?
        };
        let now_saved = ids.iter().any(|saved| saved == id);
        self.update_saved(User {
            saved_answers: Some(ids),
            ..Default::default()
        });
        self.refetch(&[QueryKey::SavedAnswers]).await;
        Ok(now_saved)
    }

    /// Merge new bookmark ids into the session and its snapshot.
    fn update_saved(&self, patch: User) {
        let session = self.api.session();
        if session.user().is_none() {
            return;
        }
        session.set_credentials(Some(patch));
        if let Some(user) = session.user() {
            if let Err(e) = self.api.persistence().save_user(&user) {
                warn!(error = %e, "Failed to persist bookmarks");
            }
        }
    }

    // ===== Notifications =====

    /// Mark `notification` read, best effort, and return the question to
    /// show.
    pub async fn open_notification(&self, notification: &Notification) -> Option<String> {
        if !notification.read {
            match self.api.mark_notification_read(&notification.id).await {
                Ok(()) => self.refetch(&[QueryKey::Notifications]).await,
                Err(e) => debug!(notification_id = %notification.id, error = %e, "Failed to mark notification read"),
            }
        }
        notification.question.as_ref().map(|q| q.id().to_string())
    }

    pub async fn mark_all_notifications_read(&self) -> Result<(), ApiError> {
        self.api.mark_all_notifications_read().await?;
        self.refetch(&[QueryKey::Notifications]).await;
        Ok(())
    }
}
