//! String utility functions
//!
//! Helpers for the loosely formatted list parameters the request layer
//! hands over.

/// String utility functions
#[derive(Debug)]
pub struct StringUtils;

impl StringUtils {
    /// Whether a string is empty or only whitespace
    pub fn is_blank(s: &str) -> bool {
        s.trim().is_empty()
    }

    /// Split on a separator, trimming items and dropping empty ones
    pub fn split_list(s: &str, separator: char) -> Vec<&str> {
        s.split(separator)
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .collect()
    }

    /// Truncate a string to a maximum number of characters with ellipsis
    pub fn truncate(s: &str, max_chars: usize) -> String {
        match s.char_indices().nth(max_chars) {
            None => s.to_string(),
            Some((cut, _)) => format!("{}...", &s[..cut]),
        }
    }
}
