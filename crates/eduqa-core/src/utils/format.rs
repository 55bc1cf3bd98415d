/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format an ISO timestamp as a short date
pub fn format_date(date: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(date) {
        dt.format("%b %d, %Y").to_string()
    } else if date.len() >= 10 && date.is_char_boundary(10) {
        date[..10].to_string()
    } else {
        date.to_string()
    }
}

/// Unread counter as shown on the inbox badge
pub fn unread_badge(count: u64) -> Option<String> {
    match count {
        0 => None,
        1..=9 => Some(count.to_string()),
        _ => Some("9+".to_string()),
    }
}

/// Collapse markdown to one line of plain text for list previews
pub fn plain_preview(markdown: &str, max_len: usize) -> String {
    let text: String = markdown
        .lines()
        .map(|line| line.trim_start_matches(['#', '>', '-', '*', ' ']).trim())
        .filter(|line| !line.is_empty() && !line.starts_with("```"))
        .collect::<Vec<_>>()
        .join(" ")
        .replace(['*', '_', '`'], "");
    truncate_string(&text, max_len)
}

/// Server origin for uploaded files: the API base without its `/api` suffix
pub fn api_origin(base_url: &str) -> &str {
    let trimmed = base_url.trim_end_matches('/');
    trimmed.strip_suffix("/api").unwrap_or(trimmed)
}

/// Absolute URL for a stored upload path
///
/// Accepts absolute URLs, rooted paths, `uploads/...` paths and bare file
/// names. A missing image resolves to the server's default avatar.
pub fn resolve_asset_url(base_url: &str, path: Option<&str>) -> String {
    let origin = api_origin(base_url);
    match path.map(str::trim).filter(|p| !p.is_empty()) {
        None => format!("{}/uploads/default.jpg", origin),
        Some(p) if p.starts_with("http://") || p.starts_with("https://") => p.to_string(),
        Some(p) if p.starts_with('/') => format!("{}{}", origin, p),
        Some(p) if p.starts_with("uploads/") => format!("{}/{}", origin, p),
        Some(p) => format!("{}/uploads/{}", origin, p),
    }
}

/// Whether an attachment path looks like an image
pub fn is_image_path(path: &str) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path).to_ascii_lowercase();
    [".jpg", ".jpeg", ".png", ".gif"].iter().any(|ext| name.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
        assert_eq!(truncate_string("çalışma grubu", 7), "çalı...");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2024-03-05T10:00:00Z"), "Mar 05, 2024");
        assert_eq!(format_date("2024-03-05 10:00"), "2024-03-05");
        assert_eq!(format_date("soon"), "soon");
    }

    #[test]
    fn test_unread_badge() {
        assert_eq!(unread_badge(0), None);
        assert_eq!(unread_badge(3).as_deref(), Some("3"));
        assert_eq!(unread_badge(12).as_deref(), Some("9+"));
    }

    #[test]
    fn test_plain_preview() {
        let md = "# Title\n\nSome **bold** text\n```\ncode\n```\n- item";
        assert_eq!(plain_preview(md, 80), "Title Some bold text code item");
    }

    #[test]
    fn test_resolve_asset_url() {
        let base = "http://localhost:5002/api";
        assert_eq!(resolve_asset_url(base, None), "http://localhost:5002/uploads/default.jpg");
        assert_eq!(resolve_asset_url(base, Some("a.png")), "http://localhost:5002/uploads/a.png");
        assert_eq!(resolve_asset_url(base, Some("uploads/a.png")), "http://localhost:5002/uploads/a.png");
        assert_eq!(resolve_asset_url(base, Some("/files/a.png")), "http://localhost:5002/files/a.png");
        assert_eq!(resolve_asset_url(base, Some("https://cdn/x.png")), "https://cdn/x.png");
        assert_eq!(api_origin("https://qa.campus.edu/api/"), "https://qa.campus.edu");
    }

    #[test]
    fn test_is_image_path() {
        assert!(is_image_path("uploads/questions/photo.JPG"));
        assert!(!is_image_path("uploads/notes.pdf"));
    }
}
