use serde::{Deserialize, Serialize};

use super::{Author, UserRef};

/// The question a notification points at, populated or by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuestionRef {
    Populated {
        #[serde(rename = "_id", alias = "id")]
        id: String,
        #[serde(default)]
        title: Option<String>,
    },
    Id(String),
}

impl QuestionRef {
    pub fn id(&self) -> &str {
        match self {
            QuestionRef::Populated { id, .. } => id,
            QuestionRef::Id(id) => id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub question: Option<QuestionRef>,
    #[serde(rename = "fromUser", default)]
    pub from_user: Option<UserRef>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<String>,
}

impl Notification {
    pub fn sender(&self) -> Option<&Author> {
        self.from_user.as_ref().and_then(UserRef::author)
    }
}

/// Notification list with the server's unread counter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationInbox {
    #[serde(rename = "data", default)]
    pub notifications: Vec<Notification>,
    #[serde(rename = "unreadCount", default)]
    pub unread_count: Option<u64>,
}

impl NotificationInbox {
    /// Server counter when present, otherwise counted locally.
    pub fn unread(&self) -> u64 {
        self.unread_count
            .unwrap_or_else(|| self.notifications.iter().filter(|n| !n.read).count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_inbox() {
        let json = r#"{"success":true,"unreadCount":1,"data":[
            {"_id":"n1","message":"Bob answered your question","read":false,"question":{"_id":"q1","title":"Lifetimes"},"fromUser":{"_id":"u2","name":"Bob"}},
            {"_id":"n2","message":"Ada liked your answer","read":true,"question":"q2"}
        ]}"#;
        let inbox: NotificationInbox = serde_json::from_str(json).unwrap();
        assert_eq!(inbox.notifications.len(), 2);
        assert_eq!(inbox.unread(), 1);
        assert_eq!(inbox.notifications[0].question.as_ref().map(QuestionRef::id), Some("q1"));
        assert_eq!(inbox.notifications[1].question.as_ref().map(QuestionRef::id), Some("q2"));
        assert_eq!(inbox.notifications[0].sender().and_then(|a| a.name.as_deref()), Some("Bob"));
    }

    #[test]
    fn test_unread_counted_locally() {
        let json = r#"{"data":[{"_id":"n1","read":false},{"_id":"n2","read":false}]}"#;
        let inbox: NotificationInbox = serde_json::from_str(json).unwrap();
        assert_eq!(inbox.unread(), 2);
    }
}
