//! Route matching logic.
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Prefixes match on segment boundaries: `/api/auth` matches `/api/auth`
//!   and `/api/auth/login`, never `/api/auth2`
//! - No regex to guarantee O(n) matching

/// Matches the request path against a prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    ///
    /// A trailing slash is dropped so `/api/` and `/api` behave alike; the
    /// root prefix `/` is kept and matches every path.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let trimmed = prefix.trim_end_matches('/');
        Self {
            prefix: if trimmed.is_empty() {
                "/".to_string()
            } else {
                trimmed.to_string()
            },
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns true if `path` lies under this prefix.
    pub fn matches(&self, path: &str) -> bool {
        if self.prefix == "/" {
            return path.starts_with('/');
        }
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// Strip the prefix from a matching path. An empty remainder becomes `/`.
    pub fn strip<'a>(&self, path: &'a str) -> &'a str {
        if self.prefix == "/" {
            return path;
        }
        match path.strip_prefix(self.prefix.as_str()) {
            Some("") | None => "/",
            Some(rest) => rest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_matcher() {
        let matcher = PathPrefixMatcher::new("/api/auth");

        assert!(matcher.matches("/api/auth"));
        assert!(matcher.matches("/api/auth/login"));
        assert!(!matcher.matches("/api/auth2"));
        assert!(!matcher.matches("/api"));
        assert!(!matcher.matches("/API/auth"));
    }

    #[test]
    fn test_trailing_slash_prefix() {
        let matcher = PathPrefixMatcher::new("/api/ventas/");
        assert_eq!(matcher.prefix(), "/api/ventas");
        assert!(matcher.matches("/api/ventas"));
        assert!(matcher.matches("/api/ventas/1"));
    }

    #[test]
    fn test_root_prefix_matches_everything() {
        let matcher = PathPrefixMatcher::new("/");
        assert!(matcher.matches("/"));
        assert!(matcher.matches("/anything/at/all"));
        assert_eq!(matcher.strip("/x/y"), "/x/y");
    }

    #[test]
    fn test_strip() {
        let matcher = PathPrefixMatcher::new("/api/empleados");
        assert_eq!(matcher.strip("/api/empleados/42/contratos"), "/42/contratos");
        assert_eq!(matcher.strip("/api/empleados"), "/");
        assert_eq!(matcher.strip("/api/empleados/"), "/");
    }
}
