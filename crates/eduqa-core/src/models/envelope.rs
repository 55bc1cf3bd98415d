use serde::Deserialize;

use super::User;

/// Standard response wrapper used by every endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    pub data: T,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub pagination: Option<PageInfo>,
}

/// Pagination metadata attached to list responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, serde::Serialize)]
pub struct PageInfo {
    #[serde(alias = "currentPage", default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(rename = "totalPages", default)]
    pub total_pages: u32,
    #[serde(rename = "hasNextPage", default)]
    pub has_next_page: bool,
    #[serde(rename = "hasPrevPage", default)]
    pub has_prev_page: bool,
}

fn first_page() -> u32 {
    1
}

/// Body returned by login and register.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    #[serde(alias = "token", default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub data: User,
    #[serde(default)]
    pub message: Option<String>,
}

impl AuthResponse {
    /// Session record for this response: the profile plus its bearer token.
    pub fn into_user(self) -> User {
        match self.access_token {
            Some(token) => self.data.with_token(token),
            None => self.data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_auth_response() {
        let json = r#"{"success":true,"access_token":"abc","data":{"_id":"u1","name":"Ada","role":"student"}}"#;
        let resp: AuthResponse = serde_json::from_str(json).unwrap();
        let user = resp.into_user();
        assert_eq!(user.access_token.as_deref(), Some("abc"));
        assert_eq!(user.name.as_deref(), Some("Ada"));
    }

    #[test]
    fn test_auth_response_without_token() {
        let json = r#"{"success":true,"data":{"_id":"u1"}}"#;
        let resp: AuthResponse = serde_json::from_str(json).unwrap();
        assert!(resp.access_token.is_none());
        assert!(resp.into_user().access_token.is_none());
    }

    #[test]
    fn test_parse_pagination() {
        let json = r#"{"success":true,"data":[],"total":42,"pagination":{"currentPage":2,"totalPages":5,"hasNextPage":true,"hasPrevPage":true}}"#;
        let resp: ApiResponse<Vec<serde_json::Value>> = serde_json::from_str(json).unwrap();
        assert_eq!(resp.total, Some(42));
        let page = resp.pagination.unwrap();
        assert_eq!(page.page, 2);
        assert_eq!(page.total_pages, 5);
        assert!(page.has_next_page);
    }
}
