//! Path prefix matching.
//!
//! # Responsibilities
//! - Decide whether a path lies under a mount prefix
//! - Compute the remainder a handler-set sees once the prefix is stripped
//!
//! # Design Decisions
//! - Matching is on whole segments: `/api/v1/user` does not match `/api/v1/users`
//! - Matching is ASCII case-insensitive, like the mount points it replaces
//! - A trailing slash on the prefix is ignored
//! - No regex to guarantee O(n) matching

/// Matches the request path against a mount prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher. `""` and `"/"` match everything.
    pub fn new(prefix: impl AsRef<str>) -> Self {
        let trimmed = prefix.as_ref().trim_end_matches('/');
        Self {
            prefix: trimmed.to_string(),
        }
    }

    /// Normalized prefix (no trailing slash; empty for the root).
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// True if both matchers mount at the same place.
    pub fn same_mount(&self, other: &PathPrefixMatcher) -> bool {
        self.prefix.eq_ignore_ascii_case(&other.prefix)
    }

    pub fn matches(&self, path: &str) -> bool {
        self.strip(path).is_some()
    }

    /// Strip the prefix from `path`.
    ///
    /// Returns the remainder, always starting with `/`, or `None` when the path
    /// is not under the prefix.
    pub fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        let len = self.prefix.len();
        if path.len() < len || !path.is_char_boundary(len) {
            return None;
        }

        let (head, rest) = path.split_at(len);
        if !head.eq_ignore_ascii_case(&self.prefix) {
            return None;
        }

        if rest.is_empty() {
            Some("/")
        } else if rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }
}
