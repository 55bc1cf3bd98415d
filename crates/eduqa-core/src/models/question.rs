use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{PageInfo, QuestionRef};

/// A user reference as returned by the API: either populated or a bare id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    Populated(Author),
    Id(String),
}

impl UserRef {
    pub fn id(&self) -> Option<&str> {
        match self {
            UserRef::Populated(author) => author.id.as_deref(),
            UserRef::Id(id) => Some(id),
        }
    }

    pub fn author(&self) -> Option<&Author> {
        match self {
            UserRef::Populated(author) => Some(author),
            UserRef::Id(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Author {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub reputation: Option<i64>,
    #[serde(default)]
    pub profile_image: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub user: Option<UserRef>,
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(rename = "likeCount", default)]
    pub like_count: Option<u64>,
    #[serde(rename = "answerCount", default)]
    pub answer_count: Option<u64>,
    /// Populated on the detail endpoint; ids only in some listings.
    #[serde(default)]
    pub answers: Vec<AnswerRef>,
    #[serde(default)]
    pub solved: bool,
    #[serde(rename = "bestAnswer", default)]
    pub best_answer: Option<AnswerRef>,
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<String>,
}

impl Question {
    pub fn like_total(&self) -> u64 {
        self.like_count.unwrap_or(self.likes.len() as u64)
    }

    pub fn answer_total(&self) -> u64 {
        self.answer_count.unwrap_or(self.answers.len() as u64)
    }

    /// Answers that came back populated, in server order.
    pub fn populated_answers(&self) -> impl Iterator<Item = &Answer> {
        self.answers.iter().filter_map(AnswerRef::answer)
    }

    pub fn best_answer_id(&self) -> Option<&str> {
        self.best_answer.as_ref().map(AnswerRef::id)
    }

    pub fn is_best_answer(&self, answer_id: &str) -> bool {
        self.best_answer_id() == Some(answer_id)
    }

    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.likes.iter().any(|id| id == user_id)
    }

    pub fn author_name(&self) -> &str {
        self.user
            .as_ref()
            .and_then(UserRef::author)
            .and_then(|a| a.name.as_deref())
            .unwrap_or("anonymous")
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user.as_ref().and_then(UserRef::id) == Some(user_id)
    }
}

/// An answer embedded in a question: populated or a bare id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerRef {
    Populated(Answer),
    Id(String),
}

impl AnswerRef {
    pub fn id(&self) -> &str {
        match self {
            AnswerRef::Populated(answer) => &answer.id,
            AnswerRef::Id(id) => id,
        }
    }

    pub fn answer(&self) -> Option<&Answer> {
        match self {
            AnswerRef::Populated(answer) => Some(answer),
            AnswerRef::Id(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Answer {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub user: Option<UserRef>,
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<String>,
    /// Set on bookmark listings, where answers are shown outside their thread.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionRef>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<String>,
}

impl Answer {
    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.likes.iter().any(|id| id == user_id)
    }

    pub fn author_name(&self) -> &str {
        self.user
            .as_ref()
            .and_then(UserRef::author)
            .and_then(|a| a.name.as_deref())
            .unwrap_or("anonymous")
    }
}

/// Feed ordering accepted by `GET /questions?sort=`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    MostLiked,
    MostAnswered,
    Solved,
    Unsolved,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Newest => "newest",
            SortOrder::Oldest => "oldest",
            SortOrder::MostLiked => "most_liked",
            SortOrder::MostAnswered => "most_answered",
            SortOrder::Solved => "solved",
            SortOrder::Unsolved => "unsolved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "newest" => Some(SortOrder::Newest),
            "oldest" => Some(SortOrder::Oldest),
            "most_liked" | "liked" => Some(SortOrder::MostLiked),
            "most_answered" | "answered" => Some(SortOrder::MostAnswered),
            "solved" => Some(SortOrder::Solved),
            "unsolved" => Some(SortOrder::Unsolved),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateRange {
    Today,
    Week,
    Month,
    Year,
}

impl DateRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateRange::Today => "today",
            DateRange::Week => "week",
            DateRange::Month => "month",
            DateRange::Year => "year",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "today" => Some(DateRange::Today),
            "week" => Some(DateRange::Week),
            "month" => Some(DateRange::Month),
            "year" => Some(DateRange::Year),
            _ => None,
        }
    }
}

/// Search, sort and filter parameters for the question feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionQuery {
    pub search: Option<String>,
    pub tag: Option<String>,
    pub sort: SortOrder,
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub solved: Option<bool>,
    pub date_range: Option<DateRange>,
    pub min_likes: Option<u32>,
    pub min_answers: Option<u32>,
}

impl QuestionQuery {
    /// Query-string pairs. A selected tag takes the place of the free-text search.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        let search = self
            .tag
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .or(self.search.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if let Some(search) = search {
            params.push(("search", search.to_string()));
        }
        params.push(("sort", self.sort.as_str().to_string()));
        if let Some(page) = self.page {
            params.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(solved) = self.solved {
            params.push(("solved", solved.to_string()));
        }
        if let Some(range) = self.date_range {
            params.push(("dateRange", range.as_str().to_string()));
        }
        if let Some(min) = self.min_likes {
            params.push(("minLikes", min.to_string()));
        }
        if let Some(min) = self.min_answers {
            params.push(("minAnswers", min.to_string()));
        }
        params
    }

    /// Number of advanced filters currently set.
    pub fn active_filter_count(&self) -> usize {
        [
            self.solved.is_some(),
            self.date_range.is_some(),
            self.min_likes.is_some(),
            self.min_answers.is_some(),
        ]
        .iter()
        .filter(|&&set| set)
        .count()
    }
}

/// One page of the question feed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionPage {
    pub questions: Vec<Question>,
    pub total: u64,
    pub pagination: Option<PageInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contributor {
    pub id: String,
    pub name: String,
    pub department: Option<String>,
    pub reputation: i64,
    pub questions: u64,
    pub answers: u64,
    pub likes: u64,
}

/// Number of contributors surfaced in the feed summary.
const TOP_CONTRIBUTORS: usize = 5;

/// Aggregates shown above the question feed.
#[derive(Debug, Clone, Default)]
pub struct FeedStats {
    pub tags: Vec<TagCount>,
    pub contributors: Vec<Contributor>,
    pub total_answers: u64,
    pub total_likes: u64,
}

impl FeedStats {
    pub fn from_questions(questions: &[Question]) -> Self {
        let mut tag_counts: HashMap<&str, usize> = HashMap::new();
        let mut contributors: HashMap<String, Contributor> = HashMap::new();
        let mut total_answers = 0;
        let mut total_likes = 0;

        for question in questions {
            for tag in &question.tags {
                *tag_counts.entry(tag.as_str()).or_default() += 1;
            }

            let answers = question.answer_total();
            let likes = question.like_total();
            total_answers += answers;
            total_likes += likes;

            let Some(author) = question.user.as_ref().and_then(UserRef::author) else {
                continue;
            };
            let Some(id) = author.id.clone() else {
                continue;
            };
            let entry = contributors.entry(id.clone()).or_insert_with(|| Contributor {
                id,
                name: author.name.clone().unwrap_or_default(),
                department: author.department.clone(),
                reputation: author.reputation.unwrap_or(0),
                ..Default::default()
            });
            entry.questions += 1;
            entry.answers += answers;
            entry.likes += likes;
        }

        let mut tags: Vec<TagCount> = tag_counts
            .into_iter()
            .map(|(name, count)| TagCount { name: name.to_string(), count })
            .collect();
        tags.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));

        let mut contributors: Vec<Contributor> = contributors.into_values().collect();
        contributors.sort_by(|a, b| {
            b.reputation
                .cmp(&a.reputation)
                .then_with(|| b.answers.cmp(&a.answers))
                .then_with(|| a.name.cmp(&b.name))
        });
        contributors.truncate(TOP_CONTRIBUTORS);

        Self {
            tags,
            contributors,
            total_answers,
            total_likes,
        }
    }

    /// Average answers per question, one decimal.
    pub fn answers_per_question(&self, question_count: usize) -> f64 {
        if question_count == 0 {
            return 0.0;
        }
        let avg = self.total_answers as f64 / question_count as f64;
        (avg * 10.0).round() / 10.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(json: &str) -> Question {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parse_question_with_populated_user() {
        let q = question(r#"{"_id":"q1","title":"How do lifetimes work?","tags":["rust"],"user":{"_id":"u1","name":"Ada"},"likes":["u2"],"answers":[{"_id":"a1","content":"Like this","user":"u3"}]}"#);
        assert_eq!(q.author_name(), "Ada");
        assert!(q.is_owned_by("u1"));
        assert!(q.is_liked_by("u2"));
        assert_eq!(q.like_total(), 1);
        assert_eq!(q.answer_total(), 1);
        let answers: Vec<&Answer> = q.populated_answers().collect();
        assert_eq!(answers[0].author_name(), "anonymous");
    }

    #[test]
    fn test_parse_populated_best_answer() {
        let q = question(r#"{"_id":"q1","solved":true,"bestAnswer":{"_id":"a1","content":"Use a scope","user":{"_id":"u3","name":"Cy"}},"answers":[{"_id":"a1","content":"Use a scope"},{"_id":"a2","content":"Clone it"}]}"#);
        assert_eq!(q.best_answer_id(), Some("a1"));
        assert!(q.is_best_answer("a1"));
        assert!(!q.is_best_answer("a2"));
        let best = q.best_answer.as_ref().and_then(AnswerRef::answer).unwrap();
        assert_eq!(best.author_name(), "Cy");
        assert_eq!(q.populated_answers().count(), 2);
    }

    #[test]
    fn test_parse_answer_ids() {
        let q = question(r#"{"_id":"q1","answers":["a1","a2"],"bestAnswer":"a2"}"#);
        assert_eq!(q.answer_total(), 2);
        assert_eq!(q.populated_answers().count(), 0);
        assert_eq!(q.best_answer_id(), Some("a2"));
    }

    #[test]
    fn test_counts_prefer_server_totals() {
        let q = question(r#"{"_id":"q1","likeCount":7,"answerCount":3}"#);
        assert_eq!(q.like_total(), 7);
        assert_eq!(q.answer_total(), 3);
    }

    #[test]
    fn test_query_tag_overrides_search() {
        let query = QuestionQuery {
            search: Some("borrow".into()),
            tag: Some("rust".into()),
            ..Default::default()
        };
        let params = query.to_params();
        assert!(params.contains(&("search", "rust".to_string())));
        assert!(params.contains(&("sort", "newest".to_string())));
    }

    #[test]
    fn test_query_filters() {
        let query = QuestionQuery {
            search: Some("   ".into()),
            sort: SortOrder::MostLiked,
            solved: Some(false),
            date_range: Some(DateRange::Week),
            min_likes: Some(3),
            ..Default::default()
        };
        let params = query.to_params();
        assert!(!params.iter().any(|(k, _)| *k == "search"));
        assert!(params.contains(&("sort", "most_liked".to_string())));
        assert!(params.contains(&("solved", "false".to_string())));
        assert!(params.contains(&("dateRange", "week".to_string())));
        assert!(params.contains(&("minLikes", "3".to_string())));
        assert_eq!(query.active_filter_count(), 3);
    }

    #[test]
    fn test_feed_stats() {
        let questions = vec![
            question(r#"{"_id":"q1","tags":["rust","async"],"answerCount":2,"likeCount":4,"user":{"_id":"u1","name":"Ada","reputation":10}}"#),
            question(r#"{"_id":"q2","tags":["rust"],"answerCount":1,"likeCount":1,"user":{"_id":"u2","name":"Bob","reputation":30}}"#),
            question(r#"{"_id":"q3","tags":[],"user":"u9"}"#),
        ];
        let stats = FeedStats::from_questions(&questions);

        assert_eq!(stats.tags[0], TagCount { name: "rust".into(), count: 2 });
        assert_eq!(stats.total_answers, 3);
        assert_eq!(stats.total_likes, 5);
        assert_eq!(stats.contributors.len(), 2);
        assert_eq!(stats.contributors[0].name, "Bob");
        assert_eq!(stats.answers_per_question(questions.len()), 1.0);
    }

    #[test]
    fn test_answers_per_question_empty() {
        assert_eq!(FeedStats::default().answers_per_question(0), 0.0);
    }
}
