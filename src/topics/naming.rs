//! Function names for topic sections
//!
//! The chat-completion protocol only accepts function names matching
//! `^[a-zA-Z0-9_-]{1,64}$`, so section titles are slugged before they are
//! offered to the model.

use std::collections::HashSet;

/// Longest name the protocol accepts
pub const MAX_FUNCTION_NAME_LEN: usize = 64;

const FALLBACK_NAME: &str = "section";

/// Slug a section title into a function name
///
/// Lowercases, collapses every run of characters outside `[a-z0-9]` into a
/// single `_`, trims `_` from both ends and truncates.
pub fn function_name(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_separator = false;

    for ch in title.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            pending_separator = false;
            slug.push(ch);
        } else {
            pending_separator = true;
        }
    }

    // Slug is pure ASCII, so byte truncation is safe
    slug.truncate(MAX_FUNCTION_NAME_LEN);
    let slug = slug.trim_end_matches('_');

    if slug.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        slug.to_string()
    }
}

/// `prefix` followed by the slug of `title`, kept within the length limit
pub fn prefixed_function_name(prefix: &str, title: &str) -> String {
    let mut slug = function_name(title);
    slug.truncate(MAX_FUNCTION_NAME_LEN.saturating_sub(prefix.len()));
    format!("{prefix}{}", slug.trim_end_matches('_'))
}

/// Hands out sibling-unique function names
#[derive(Debug, Default)]
pub struct NameAllocator {
    used: HashSet<String>,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name for `title`, suffixed with `_2`, `_3`, ... on collision
    pub fn allocate(&mut self, title: &str) -> String {
        self.allocate_prefixed("", title)
    }

    /// Like [`allocate`](Self::allocate), with `prefix` counted in the limit
    pub fn allocate_prefixed(&mut self, prefix: &str, title: &str) -> String {
        let base = prefixed_function_name(prefix, title);
        if self.used.insert(base.clone()) {
            return base;
        }

        let mut n = 2usize;
        loop {
            let suffix = format!("_{n}");
            let mut stem = base.clone();
            stem.truncate(MAX_FUNCTION_NAME_LEN - suffix.len());
            let candidate = format!("{}{}", stem.trim_end_matches('_'), suffix);
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_name_slugs_titles() {
        assert_eq!(function_name("History"), "history");
        assert_eq!(function_name("Arts and culture"), "arts_and_culture");
        assert_eq!(function_name("Parks & recreation"), "parks_recreation");
        assert_eq!(function_name("  20th century  "), "20th_century");
        assert_eq!(function_name("Geography – Climate"), "geography_climate");
    }

    #[test]
    fn test_function_name_fallback() {
        assert_eq!(function_name(""), "section");
        assert_eq!(function_name("—"), "section");
        assert_eq!(function_name("東京"), "section");
    }

    #[test]
    fn test_function_name_truncates() {
        let name = function_name(&"a".repeat(100));
        assert_eq!(name.len(), MAX_FUNCTION_NAME_LEN);
    }

    #[test]
    fn test_function_name_does_not_end_with_separator_after_truncation() {
        let title = format!("{} b", "a".repeat(63));
        let name = function_name(&title);
        assert!(!name.ends_with('_'));
        assert!(name.len() <= MAX_FUNCTION_NAME_LEN);
    }

    #[test]
    fn test_allocator_suffixes_duplicates() {
        let mut names = NameAllocator::new();
        assert_eq!(names.allocate("Economy"), "economy");
        assert_eq!(names.allocate("economy"), "economy_2");
        assert_eq!(names.allocate("Economy!"), "economy_3");
        assert_eq!(names.allocate("Culture"), "culture");
    }

    #[test]
    fn test_prefixed_name_respects_length_limit() {
        let title = "Llanfairpwllgwyngyllgogerychwyrndrobwllllantysiliogogogoch railway station";
        let name = prefixed_function_name("tool_", title);
        assert!(name.len() <= MAX_FUNCTION_NAME_LEN);
        assert!(name.starts_with("tool_llanfair"));
        assert!(!name.ends_with('_'));
        assert_eq!(prefixed_function_name("tool_", "Boston"), "tool_boston");
    }

    #[test]
    fn test_allocator_prefixed_collisions() {
        let mut names = NameAllocator::new();
        assert_eq!(names.allocate_prefixed("tool_", "St. Louis"), "tool_st_louis");
        assert_eq!(names.allocate_prefixed("tool_", "St Louis"), "tool_st_louis_2");

        let long = "y".repeat(90);
        names.allocate_prefixed("tool_", &long);
        let second = names.allocate_prefixed("tool_", &long);
        assert!(second.len() <= MAX_FUNCTION_NAME_LEN);
        assert!(second.starts_with("tool_y") && second.ends_with("_2"));
    }

    #[test]
    fn test_allocator_suffix_respects_length_limit() {
        let mut names = NameAllocator::new();
        let long = "x".repeat(80);
        names.allocate(&long);
        let second = names.allocate(&long);
        assert!(second.len() <= MAX_FUNCTION_NAME_LEN);
        assert!(second.ends_with("_2"));
    }
}
