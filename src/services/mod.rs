pub mod auth_service;
pub mod history_service;
pub mod notification_service;
pub mod product_service;
pub mod stats_service;
pub mod user_service;

/// Turn free text into an ILIKE pattern that matches it literally as a substring.
pub(crate) fn contains_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for ch in search.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

/// Trimmed, non-empty search text.
pub(crate) fn search_term(search: Option<&String>) -> Option<&str> {
    search.map(|s| s.trim()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(contains_pattern("wid"), "%wid%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn blank_search_is_ignored() {
        assert_eq!(search_term(Some(&"  ".to_string())), None);
        assert_eq!(search_term(Some(&" pal ".to_string())), Some("pal"));
        assert_eq!(search_term(None), None);
    }
}
