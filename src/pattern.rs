//! Shell-style wildcard matching.
//!
//! `*` matches any run of characters (including `/`), `?` one character and
//! `[...]` / `[!...]` a character class. Patterns that are not valid glob
//! syntax are compared literally.

use glob::{MatchOptions, Pattern};

const OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// A compiled wildcard pattern.
#[derive(Debug, Clone)]
pub struct Wildcard {
    source: String,
    compiled: Option<Pattern>,
}

impl Wildcard {
    pub fn new(source: &str) -> Self {
        // `**` has a special meaning to the glob crate; here it is just `*`.
        let mut normalized = String::with_capacity(source.len());
        for ch in source.chars() {
            if ch == '*' && normalized.ends_with('*') {
                continue;
            }
            normalized.push(ch);
        }

        Wildcard {
            source: source.to_string(),
            compiled: Pattern::new(&normalized).ok(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, candidate: &str) -> bool {
        match &self.compiled {
            Some(pattern) => pattern.matches_with(candidate, OPTIONS),
            None => self.source == candidate,
        }
    }
}

/// One-shot convenience wrapper around [`Wildcard`].
pub fn matches(pattern: &str, candidate: &str) -> bool {
    Wildcard::new(pattern).matches(candidate)
}
