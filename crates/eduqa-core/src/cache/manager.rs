use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::models::{Answer, NotificationInbox, Question, QuestionPage, QuestionQuery};

/// Forum data changes quickly; consider it stale after 5 minutes.
const CACHE_STALE_MINUTES: i64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }

    pub fn is_stale(&self) -> bool {
        self.age_minutes() >= CACHE_STALE_MINUTES
    }
}

/// A cached query. Mutations name the keys they invalidate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Feed,
    Question(String),
    MyQuestions,
    SavedQuestions,
    SavedAnswers,
    Notifications,
}

impl QueryKey {
    /// File stem for this key. Ids are reduced to filename-safe characters.
    pub fn cache_name(&self) -> String {
        match self {
            QueryKey::Feed => "feed".to_string(),
            QueryKey::Question(id) => {
                let safe: String = id
                    .chars()
                    .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
                    .collect();
                format!("question_{}", safe)
            }
            QueryKey::MyQuestions => "my_questions".to_string(),
            QueryKey::SavedQuestions => "saved_questions".to_string(),
            QueryKey::SavedAnswers => "saved_answers".to_string(),
            QueryKey::Notifications => "notifications".to_string(),
        }
    }

    /// Keys whose contents belong to the signed-in user.
    pub fn is_private(&self) -> bool {
        matches!(
            self,
            QueryKey::MyQuestions | QueryKey::SavedQuestions | QueryKey::SavedAnswers | QueryKey::Notifications
        )
    }

    pub const PRIVATE: [QueryKey; 4] = [
        QueryKey::MyQuestions,
        QueryKey::SavedQuestions,
        QueryKey::SavedAnswers,
        QueryKey::Notifications,
    ];
}

/// The feed page last fetched, with the query that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSnapshot {
    pub query: QuestionQuery,
    pub page: QuestionPage,
}

pub struct CacheManager {
    cache_dir: PathBuf,
}

impl CacheManager {
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache dir: {}", cache_dir.display()))?;
        Ok(Self { cache_dir })
    }

    fn cache_path(&self, key: &QueryKey) -> PathBuf {
        self.cache_dir.join(format!("{}.json", key.cache_name()))
    }

    fn load<T: DeserializeOwned>(&self, key: &QueryKey) -> Result<Option<CachedData<T>>> {
        let path = self.cache_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let name = key.cache_name();
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache file: {}", name))?;

        let cached: CachedData<T> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache file: {}", name))?;

        Ok(Some(cached))
    }

    fn save<T: Serialize>(&self, key: &QueryKey, data: &T) -> Result<()> {
        let cached = CachedData::new(data);
        let contents = serde_json::to_string_pretty(&cached)?;
        std::fs::write(self.cache_path(key), contents)
            .with_context(|| format!("Failed to write cache file: {}", key.cache_name()))?;
        Ok(())
    }

    // ===== Feed =====

    pub fn load_feed(&self) -> Result<Option<CachedData<FeedSnapshot>>> {
        self.load(&QueryKey::Feed)
    }

    pub fn save_feed(&self, query: &QuestionQuery, page: &QuestionPage) -> Result<()> {
        self.save(
            &QueryKey::Feed,
            &FeedSnapshot {
                query: query.clone(),
                page: page.clone(),
            },
        )
    }

    // ===== Question detail =====

    pub fn load_question(&self, id: &str) -> Result<Option<CachedData<Question>>> {
        self.load(&QueryKey::Question(id.to_string()))
    }

    pub fn save_question(&self, question: &Question) -> Result<()> {
        self.save(&QueryKey::Question(question.id.clone()), question)
    }

    // ===== My questions =====

    pub fn load_my_questions(&self) -> Result<Option<CachedData<Vec<Question>>>> {
        self.load(&QueryKey::MyQuestions)
    }

    pub fn save_my_questions(&self, questions: &[Question]) -> Result<()> {
        self.save(&QueryKey::MyQuestions, &questions)
    }

    // ===== Bookmarks =====

    pub fn load_saved_questions(&self) -> Result<Option<CachedData<Vec<Question>>>> {
        self.load(&QueryKey::SavedQuestions)
    }

    pub fn save_saved_questions(&self, questions: &[Question]) -> Result<()> {
        self.save(&QueryKey::SavedQuestions, &questions)
    }

    pub fn load_saved_answers(&self) -> Result<Option<CachedData<Vec<Answer>>>> {
        self.load(&QueryKey::SavedAnswers)
    }

    pub fn save_saved_answers(&self, answers: &[Answer]) -> Result<()> {
        self.save(&QueryKey::SavedAnswers, &answers)
    }

    // ===== Notifications =====

    pub fn load_notifications(&self) -> Result<Option<CachedData<NotificationInbox>>> {
        self.load(&QueryKey::Notifications)
    }

    pub fn save_notifications(&self, inbox: &NotificationInbox) -> Result<()> {
        self.save(&QueryKey::Notifications, inbox)
    }

    // ===== Invalidation =====

    /// Remove the entries for `keys`. Missing entries are fine.
    pub fn invalidate(&self, keys: &[QueryKey]) -> Result<()> {
        for key in keys {
            let path = self.cache_path(key);
            match std::fs::remove_file(&path) {
                Ok(()) => debug!(cache = %key.cache_name(), "Invalidated cache entry"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to remove cache file: {}", key.cache_name()))
                }
            }
        }
        Ok(())
    }

    /// Remove every entry.
    pub fn clear(&self) -> Result<()> {
        for entry in std::fs::read_dir(&self.cache_dir).context("Failed to list cache dir")? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
            }
        }
        Ok(())
    }

    // ===== Cache Age Information =====

    /// Helper to load cache and log errors without failing
    fn load_age<T>(&self, name: &str, loader: impl FnOnce() -> Result<Option<CachedData<T>>>) -> Option<String> {
        match loader() {
            Ok(Some(cached)) => Some(cached.age_display()),
            Ok(None) => None,
            Err(e) => {
                debug!(cache = name, error = %e, "Failed to load cache for age display");
                None
            }
        }
    }

    pub fn get_cache_ages(&self) -> CacheAges {
        CacheAges {
            feed: self.load_age("feed", || self.load_feed()),
            my_questions: self.load_age("my_questions", || self.load_my_questions()),
            saved_questions: self.load_age("saved_questions", || self.load_saved_questions()),
            notifications: self.load_age("notifications", || self.load_notifications()),
        }
    }
}

#[derive(Debug, Default)]
pub struct CacheAges {
    pub feed: Option<String>,
    pub my_questions: Option<String>,
    pub saved_questions: Option<String>,
    pub notifications: Option<String>,
}

impl CacheAges {
    /// First known age, feed first.
    pub fn last_updated(&self) -> String {
        [&self.feed, &self.notifications, &self.my_questions, &self.saved_questions]
            .into_iter()
            .flatten()
            .next()
            .cloned()
            .unwrap_or_else(|| "never".to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn question(id: &str) -> Question {
        Question {
            id: id.to_string(),
            title: "How do I borrow twice?".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_cached_data_age_display_just_now() {
        let cached = CachedData::new(vec![1, 2, 3]);
        assert_eq!(cached.age_display(), "just now");
    }

    #[test]
    fn test_cached_data_age_display_hours() {
        let mut cached = CachedData::new(());
        cached.cached_at = Utc::now() - Duration::minutes(95);
        assert_eq!(cached.age_display(), "2h ago");
    }

    #[test]
    fn test_cached_data_is_stale() {
        let fresh = CachedData::new(vec![1]);
        assert!(!fresh.is_stale());

        let mut old = CachedData::new(vec![1]);
        old.cached_at = Utc::now() - Duration::minutes(6);
        assert!(old.is_stale());
    }

    #[test]
    fn test_question_key_is_filename_safe() {
        assert_eq!(QueryKey::Question("../etc/passwd".into()).cache_name(), "question____etc_passwd");
        assert_eq!(QueryKey::Question("65f0a1".into()).cache_name(), "question_65f0a1");
        assert!(QueryKey::Notifications.is_private());
        assert!(!QueryKey::Feed.is_private());
    }

    #[test]
    fn test_save_load_invalidate() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheManager::new(dir.path().to_path_buf()).unwrap();

        cache.save_question(&question("q1")).unwrap();
        cache.save_my_questions(&[question("q1"), question("q2")]).unwrap();
        assert_eq!(cache.load_question("q1").unwrap().unwrap().data.id, "q1");

        cache
            .invalidate(&[QueryKey::Question("q1".into()), QueryKey::Feed])
            .unwrap();
        assert!(cache.load_question("q1").unwrap().is_none());
        assert_eq!(cache.load_my_questions().unwrap().unwrap().data.len(), 2);

        cache.clear().unwrap();
        assert!(cache.load_my_questions().unwrap().is_none());
    }

    #[test]
    fn test_feed_snapshot_keeps_query() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheManager::new(dir.path().to_path_buf()).unwrap();
        let query = QuestionQuery {
            search: Some("borrow".into()),
            ..Default::default()
        };
        let page = QuestionPage {
            questions: vec![question("q1")],
            total: 1,
            pagination: None,
        };
        cache.save_feed(&query, &page).unwrap();

        let cached = cache.load_feed().unwrap().unwrap();
        assert_eq!(cached.data.query, query);
        assert_eq!(cached.data.page.total, 1);
        assert_eq!(cache.get_cache_ages().last_updated(), "just now");
    }

    #[test]
    fn test_cache_ages_last_updated_empty() {
        let ages = CacheAges::default();
        assert_eq!(ages.last_updated(), "never");
    }
}
