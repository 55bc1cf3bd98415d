use serde_json::Value;
use thiserror::Error;

/// A single field-level validation message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Every failure the API client can surface, already carrying the message
/// shown to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    Network(String),

    #[error("{0}")]
    Timeout(String),

    #[error("{message}")]
    Validation {
        message: String,
        fields: Vec<FieldError>,
    },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("{message}")]
    Server { status: u16, message: String },

    #[error("{0}")]
    Unknown(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

const NETWORK_MESSAGE: &str = "Unable to reach the server. Check your internet connection.";
const TIMEOUT_MESSAGE: &str = "The request timed out. Please try again.";

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Default message for a status code when the server sends none.
    fn default_message(status: u16) -> String {
        match status {
            400 => "Invalid request. Please check the information you entered.".to_string(),
            401 => "Your session has expired. Please log in again.".to_string(),
            403 => "You do not have permission to perform this action.".to_string(),
            404 => "The requested resource was not found.".to_string(),
            409 => "This action conflicts with the current state. Please try again.".to_string(),
            422 => "The submitted data is invalid. Please check it.".to_string(),
            429 => "Too many requests. Please wait a moment and try again.".to_string(),
            500 => "Server error. Please try again later.".to_string(),
            502 => "The server is temporarily unavailable.".to_string(),
            503 => "The service is currently unavailable. Please try again later.".to_string(),
            _ => format!("Something went wrong ({}). Please try again.", status),
        }
    }

    /// Classify an error response. A `message` in the body wins over the
    /// default text for the status.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let code = status.as_u16();
        let parsed: Option<Value> = serde_json::from_str(body).ok();
        let message = parsed
            .as_ref()
            .and_then(|v| v.get("message"))
            .and_then(Value::as_str)
            .filter(|m| !m.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Self::default_message(code));

        match code {
            400 | 422 => ApiError::Validation {
                message,
                fields: parsed.as_ref().map(Self::field_errors).unwrap_or_default(),
            },
            401 => ApiError::Unauthorized(message),
            403 => ApiError::Forbidden(message),
            404 => ApiError::NotFound(message),
            409 => ApiError::Conflict(message),
            429 => ApiError::RateLimited(message),
            500..=599 => ApiError::Server { status: code, message },
            _ => {
                tracing::debug!(status = code, body = %Self::truncate_body(body), "Unclassified error response");
                ApiError::Unknown(message)
            }
        }
    }

    /// Convert a transport failure into the taxonomy.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout(TIMEOUT_MESSAGE.to_string())
        } else if err.is_connect() || err.is_request() {
            ApiError::Network(NETWORK_MESSAGE.to_string())
        } else if err.is_decode() || err.is_body() {
            ApiError::Unknown(format!("Invalid response from server: {}", err))
        } else {
            ApiError::Network(NETWORK_MESSAGE.to_string())
        }
    }

    /// Field messages from either `errors: [{path|param|field, msg|message}]`
    /// or `errors: {field: message}`.
    fn field_errors(body: &Value) -> Vec<FieldError> {
        match body.get("errors") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| {
                    let field = ["path", "param", "field"]
                        .iter()
                        .find_map(|k| item.get(*k).and_then(Value::as_str))?;
                    let message = ["msg", "message"]
                        .iter()
                        .find_map(|k| item.get(*k).and_then(Value::as_str))
                        .unwrap_or("is invalid");
                    Some(FieldError::new(field, message))
                })
                .collect(),
            Some(Value::Object(map)) => map
                .iter()
                .filter_map(|(field, v)| match v {
                    Value::String(s) => Some(FieldError::new(field, s)),
                    Value::Object(inner) => inner
                        .get("message")
                        .and_then(Value::as_str)
                        .map(|s| FieldError::new(field, s)),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Message suitable for a transient notification.
    pub fn user_message(&self) -> &str {
        match self {
            ApiError::Network(m)
            | ApiError::Timeout(m)
            | ApiError::Unauthorized(m)
            | ApiError::Forbidden(m)
            | ApiError::NotFound(m)
            | ApiError::Conflict(m)
            | ApiError::RateLimited(m)
            | ApiError::Unknown(m) => m,
            ApiError::Validation { message, .. } | ApiError::Server { message, .. } => message,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// The request never got a verdict from the server.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Network(_) | ApiError::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_classify_statuses() {
        assert!(matches!(ApiError::from_status(StatusCode::UNAUTHORIZED, ""), ApiError::Unauthorized(_)));
        assert!(matches!(ApiError::from_status(StatusCode::FORBIDDEN, ""), ApiError::Forbidden(_)));
        assert!(matches!(ApiError::from_status(StatusCode::NOT_FOUND, ""), ApiError::NotFound(_)));
        assert!(matches!(ApiError::from_status(StatusCode::CONFLICT, ""), ApiError::Conflict(_)));
        assert!(matches!(ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""), ApiError::RateLimited(_)));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, ""),
            ApiError::Server { status: 502, .. }
        ));
        assert!(matches!(ApiError::from_status(StatusCode::IM_A_TEAPOT, ""), ApiError::Unknown(_)));
    }

    #[test]
    fn test_server_message_wins() {
        let err = ApiError::from_status(StatusCode::NOT_FOUND, r#"{"success":false,"message":"Question not found"}"#);
        assert_eq!(err.user_message(), "Question not found");

        let err = ApiError::from_status(StatusCode::NOT_FOUND, "<html>nope</html>");
        assert_eq!(err.user_message(), "The requested resource was not found.");
    }

    #[test]
    fn test_validation_fields_array() {
        let body = r#"{"message":"Validation failed","errors":[{"path":"email","msg":"Email already used"},{"param":"name","message":"Too short"}]}"#;
        match ApiError::from_status(StatusCode::UNPROCESSABLE_ENTITY, body) {
            ApiError::Validation { message, fields } => {
                assert_eq!(message, "Validation failed");
                assert_eq!(fields, vec![
                    FieldError::new("email", "Email already used"),
                    FieldError::new("name", "Too short"),
                ]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_validation_fields_object() {
        let body = r#"{"errors":{"title":{"message":"Title is required"},"content":"Too short"}}"#;
        match ApiError::from_status(StatusCode::BAD_REQUEST, body) {
            ApiError::Validation { message, fields } => {
                assert_eq!(message, "Invalid request. Please check the information you entered.");
                assert_eq!(fields.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(600);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(500)));
        assert!(truncated.contains("600 total bytes"));
        assert_eq!(ApiError::truncate_body("short"), "short");
    }

    #[test]
    fn test_flags() {
        assert!(ApiError::Network("x".into()).is_transport());
        assert!(!ApiError::Unauthorized("x".into()).is_transport());
        assert!(ApiError::Timeout("x".into()).is_transport());
        assert!(!ApiError::NotFound("x".into()).is_transport());
    }
}
