//! Client-side form validation.
//!
//! Each form validates into a request type the API layer accepts, so a
//! request that reaches the server has already passed these checks.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::api::FieldError;
use crate::models::{Attachment, Role};

const MIN_PASSWORD_LENGTH: usize = 6;
const MIN_NAME_LENGTH: usize = 2;
const MIN_TITLE_LENGTH: usize = 10;
const MIN_QUESTION_CONTENT_LENGTH: usize = 20;
const MIN_ANSWER_CONTENT_LENGTH: usize = 10;

/// Maximum number of files on one question or answer.
pub const MAX_ATTACHMENTS: usize = 5;

/// Maximum size of a single attachment (5 MiB).
pub const MAX_ATTACHMENT_BYTES: usize = 5 * 1024 * 1024;

/// Every field that failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", summary(.errors))]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

fn summary(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn for_field(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }
}

/// Collects field errors while a form is checked.
#[derive(Default)]
struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.errors.push(FieldError::new(field, message));
        }
    }

    fn finish<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(ValidationErrors { errors: self.errors })
        }
    }
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"))
}

pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email)
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Comma separated tags, trimmed, empties and duplicates dropped.
pub fn parse_tags(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if !tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            tags.push(tag.to_string());
        }
    }
    tags
}

fn check_attachments(checker: &mut Checker, attachments: &[Attachment]) {
    checker.check(
        attachments.len() <= MAX_ATTACHMENTS,
        "attachments",
        "You can attach at most 5 files",
    );
    for file in attachments {
        if file.size() > MAX_ATTACHMENT_BYTES {
            checker.errors.push(FieldError::new(
                "attachments",
                format!("{} is larger than 5MB", file.file_name),
            ));
        }
    }
}

// ============================================================================
// Auth forms
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<LoginRequest, ValidationErrors> {
        let email = self.email.trim();
        let mut checker = Checker::default();
        checker.check(is_valid_email(email), "email", "Enter a valid email");
        checker.check(
            char_len(&self.password) >= MIN_PASSWORD_LENGTH,
            "password",
            "Password must be at least 6 characters",
        );
        checker.finish(LoginRequest {
            email: email.to_string(),
            password: self.password.clone(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub department: Option<String>,
    pub branch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl RegisterForm {
    pub fn validate(&self) -> Result<RegisterRequest, ValidationErrors> {
        let name = self.name.trim();
        let email = self.email.trim();
        let role = Role::parse(&self.role);

        let mut checker = Checker::default();
        checker.check(
            char_len(name) >= MIN_NAME_LENGTH,
            "name",
            "Name must be at least 2 characters",
        );
        checker.check(is_valid_email(email), "email", "Enter a valid email");
        checker.check(
            char_len(&self.password) >= MIN_PASSWORD_LENGTH,
            "password",
            "Password must be at least 6 characters",
        );
        checker.check(role.is_some(), "role", "Choose student or teacher");

        checker.finish(RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: self.password.clone(),
            role: role.unwrap_or(Role::Student),
            department: non_blank(&self.department),
            branch: non_blank(&self.branch),
        })
    }
}

// ============================================================================
// Content forms
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct QuestionForm {
    pub title: String,
    pub content: String,
    /// Comma separated.
    pub tags: String,
    pub attachments: Vec<Attachment>,
}

/// A question ready to be sent as multipart form data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub attachments: Vec<Attachment>,
}

impl QuestionForm {
    pub fn validate(&self) -> Result<QuestionDraft, ValidationErrors> {
        let title = self.title.trim();
        let content = self.content.trim();

        let mut checker = Checker::default();
        checker.check(
            char_len(title) >= MIN_TITLE_LENGTH,
            "title",
            "Title must be at least 10 characters",
        );
        checker.check(
            char_len(content) >= MIN_QUESTION_CONTENT_LENGTH,
            "content",
            "Content must be at least 20 characters",
        );
        check_attachments(&mut checker, &self.attachments);

        checker.finish(QuestionDraft {
            title: title.to_string(),
            content: content.to_string(),
            tags: parse_tags(&self.tags),
            attachments: self.attachments.clone(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnswerForm {
    pub content: String,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerDraft {
    pub content: String,
    pub attachments: Vec<Attachment>,
}

impl AnswerForm {
    pub fn validate(&self) -> Result<AnswerDraft, ValidationErrors> {
        let content = self.content.trim();
        let mut checker = Checker::default();
        checker.check(
            char_len(content) >= MIN_ANSWER_CONTENT_LENGTH,
            "content",
            "Answer must be at least 10 characters",
        );
        check_attachments(&mut checker, &self.attachments);
        checker.finish(AnswerDraft {
            content: content.to_string(),
            attachments: self.attachments.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_validation() {
        let ok = LoginForm {
            email: " ada@campus.edu ".into(),
            password: "secret1".into(),
        }
        .validate()
        .unwrap();
        assert_eq!(ok.email, "ada@campus.edu");

        let err = LoginForm {
            email: "not-an-email".into(),
            password: "123".into(),
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.errors.len(), 2);
        assert!(err.for_field("email").is_some());
        assert!(err.for_field("password").is_some());
    }

    #[test]
    fn test_register_validation() {
        let form = RegisterForm {
            name: "Al".into(),
            email: "al@campus.edu".into(),
            password: "hunter22".into(),
            role: "Teacher".into(),
            department: Some("  ".into()),
            branch: Some("Physics".into()),
        };
        let req = form.validate().unwrap();
        assert_eq!(req.role, Role::Teacher);
        assert_eq!(req.department, None);
        assert_eq!(req.branch.as_deref(), Some("Physics"));

        let bad = RegisterForm {
            role: "admin".into(),
            ..form
        };
        assert_eq!(bad.validate().unwrap_err().for_field("role"), Some("Choose student or teacher"));
    }

    #[test]
    fn test_question_validation() {
        let form = QuestionForm {
            title: "  Short  ".into(),
            content: "Too short".into(),
            tags: "rust, async,, Rust ,".into(),
            attachments: Vec::new(),
        };
        let err = form.validate().unwrap_err();
        assert!(err.for_field("title").is_some());
        assert!(err.for_field("content").is_some());

        let draft = QuestionForm {
            title: "How do lifetimes work?".into(),
            content: "I keep getting borrow checker errors in my code.".into(),
            ..form
        }
        .validate()
        .unwrap();
        assert_eq!(draft.tags, vec!["rust".to_string(), "async".to_string()]);
    }

    #[test]
    fn test_attachment_limits() {
        let small = Attachment::new("a.png", vec![0; 10]);
        let big = Attachment::new("big.pdf", vec![0; MAX_ATTACHMENT_BYTES + 1]);

        let form = AnswerForm {
            content: "Here is a longer answer".into(),
            attachments: vec![small.clone(); 6],
        };
        assert!(form.validate().unwrap_err().for_field("attachments").is_some());

        let form = AnswerForm {
            content: "Here is a longer answer".into(),
            attachments: vec![small, big],
        };
        let err = form.validate().unwrap_err();
        assert_eq!(err.for_field("attachments"), Some("big.pdf is larger than 5MB"));
    }

    #[test]
    fn test_error_display() {
        let err = AnswerForm::default().validate().unwrap_err();
        assert_eq!(err.to_string(), "content: Answer must be at least 10 characters");
    }
}
