use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Roles a new account may register with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "student" => Some(Role::Student),
            "teacher" => Some(Role::Teacher),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The signed-in user as held by the session.
///
/// Absent fields are never serialized, so merging two records only touches
/// the fields the incoming record actually carries. A field the server sends
/// as `null` is remembered in `cleared` and clears ours on merge. Profile
/// fields the client does not model are kept in `extra` and survive a round
/// trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reputation: Option<i64>,
    #[serde(rename = "savedQuestions", skip_serializing_if = "Option::is_none")]
    pub saved_questions: Option<Vec<String>>,
    #[serde(rename = "savedAnswers", skip_serializing_if = "Option::is_none")]
    pub saved_answers: Option<Vec<String>>,
    #[serde(rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Wire names of modelled fields that arrived as explicit `null`.
    #[serde(skip)]
    pub cleared: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Remove a field (under any of its wire names) from `map`. An explicit
/// `null` is recorded in `cleared` under the first name.
fn take_field<T: DeserializeOwned>(
    map: &mut Map<String, Value>,
    names: &[&str],
    cleared: &mut Vec<String>,
) -> Result<Option<T>, serde_json::Error> {
    let mut found = None;
    for name in names {
        if let Some(value) = map.remove(*name) {
            found.get_or_insert(value);
        }
    }
    match found {
        None => Ok(None),
        Some(Value::Null) => {
            cleared.push(names[0].to_string());
            Ok(None)
        }
        Some(value) => serde_json::from_value(value).map(Some),
    }
}

impl User {
    fn from_map(mut map: Map<String, Value>) -> Result<Self, serde_json::Error> {
        let mut cleared = Vec::new();
        let map = &mut map;
        let c = &mut cleared;
        let mut user = User {
            id: take_field(map, &["_id", "id"], c)?,
            name: take_field(map, &["name"], c)?,
            email: take_field(map, &["email"], c)?,
            role: take_field(map, &["role"], c)?,
            department: take_field(map, &["department"], c)?,
            branch: take_field(map, &["branch"], c)?,
            profile_image: take_field(map, &["profile_image"], c)?,
            reputation: take_field(map, &["reputation"], c)?,
            saved_questions: take_field(map, &["savedQuestions"], c)?,
            saved_answers: take_field(map, &["savedAnswers"], c)?,
            created_at: take_field(map, &["createdAt"], c)?,
            access_token: take_field(map, &["access_token", "token"], c)?,
            ..Default::default()
        };
        user.extra = std::mem::take(map);
        user.cleared = cleared;
        Ok(user)
    }
}

impl<'de> Deserialize<'de> for User {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        User::from_map(map).map_err(de::Error::custom)
    }
}

impl User {
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Copy of the record without the bearer token, for the persisted snapshot.
    pub fn without_token(&self) -> Self {
        let mut user = self.clone();
        user.access_token = None;
        user
    }

    /// True when the record carries no field at all, not even a `null`.
    pub fn is_empty(&self) -> bool {
        self.cleared.is_empty()
            && matches!(serde_json::to_value(self), Ok(Value::Object(map)) if map.is_empty())
    }

    /// Shallow merge: every field present on `incoming` replaces ours,
    /// explicit `null`s included.
    pub fn merge(&mut self, incoming: User) {
        let (Ok(Value::Object(mut base)), Ok(Value::Object(mut top))) =
            (serde_json::to_value(&*self), serde_json::to_value(&incoming))
        else {
            *self = incoming;
            return;
        };
        for name in &incoming.cleared {
            top.insert(name.clone(), Value::Null);
        }
        base.extend(top);
        match User::from_map(base) {
            Ok(mut merged) => {
                merged.cleared.clear();
                *self = merged;
            }
            Err(_) => *self = incoming,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or("Unknown user")
    }

    pub fn has_saved_question(&self, question_id: &str) -> bool {
        self.saved_questions
            .as_ref()
            .is_some_and(|ids| ids.iter().any(|id| id == question_id))
    }

    pub fn has_saved_answer(&self, answer_id: &str) -> bool {
        self.saved_answers
            .as_ref()
            .is_some_and(|ids| ids.iter().any(|id| id == answer_id))
    }
}

/// Fields accepted by `PUT /auth/edit`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.department.is_none() && self.branch.is_none()
    }

    /// The record the server would return when it echoes nothing back.
    pub fn as_user(&self) -> User {
        User {
            name: self.name.clone(),
            email: self.email.clone(),
            department: self.department.clone(),
            branch: self.branch.clone(),
            ..Default::default()
        }
    }
}
