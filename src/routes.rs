//! Request path classification: which routes require authentication.
//!
//! The classifier holds an immutable list of "open" path patterns. A request
//! path is normalized before matching so traversal sequences cannot be used
//! to dress a secured path up as an open one. No patterns configured means
//! every path is secured.

/// Decides whether a request path requires authentication.
#[derive(Debug, Clone)]
pub struct RouteClassifier {
    open_patterns: Vec<String>,
}

impl RouteClassifier {
    /// Build a classifier from configured open-endpoint patterns.
    ///
    /// Patterns are trimmed, blank entries dropped and duplicates removed
    /// while preserving order. The resulting set is immutable.
    ///
    /// Patterns match whole path segments: `*` matches exactly one segment,
    /// `**` matches any number of segments (including none). Matching is
    /// case-sensitive.
    pub fn new(patterns: impl IntoIterator<Item = String>) -> Self {
        let mut open_patterns: Vec<String> = Vec::new();
        for pattern in patterns {
            let trimmed = pattern.trim();
            if trimmed.is_empty() {
                continue;
            }
            if !open_patterns.iter().any(|p| p == trimmed) {
                open_patterns.push(trimmed.to_string());
            }
        }
        Self { open_patterns }
    }

    /// Whether the given path requires authentication.
    ///
    /// Paths that cannot be normalized (traversal escaping the root) are
    /// treated as secured rather than raising.
    pub fn is_secured(&self, path: &str) -> bool {
        let Some(normalized) = normalize_path(path) else {
            return true;
        };

        if self.open_patterns.is_empty() {
            return true;
        }

        let is_open = self
            .open_patterns
            .iter()
            .any(|pattern| pattern_matches(pattern, &normalized));
        !is_open
    }

    /// The validated open-endpoint patterns, in configuration order.
    pub fn open_patterns(&self) -> &[String] {
        &self.open_patterns
    }
}

/// Normalize a request path: collapse repeated separators, resolve `.` and
/// `..` segments, strip the trailing separator except for the root path.
/// Returns `None` when `..` would escape the root.
fn normalize_path(path: &str) -> Option<String> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        Some("/".to_string())
    } else {
        Some(format!("/{}", segments.join("/")))
    }
}

fn pattern_matches(pattern: &str, path: &str) -> bool {
    let pattern_segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let path_segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    segments_match(&pattern_segments, &path_segments)
}

fn segments_match(pattern: &[&str], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((&"**", rest)) => (0..=path.len()).any(|skip| segments_match(rest, &path[skip..])),
        Some((&first, rest)) => match path.split_first() {
            Some((&segment, path_rest)) if first == "*" || first == segment => {
                segments_match(rest, path_rest)
            }
            _ => false,
        },
    }
}
