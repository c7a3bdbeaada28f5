//! Permitted-error registry.
//!
//! A process-wide allow-list of expected log messages. While a test runs,
//! an error-level log line normally fails it; lines matching a registered
//! entry are tolerated. Entries are scoped: every [`PermittedErrors::add`]
//! returns a handle the caller must pass back to
//! [`PermittedErrors::remove`], typically at teardown, so expectations
//! never leak across tests.

use crate::result::{EnsayarError, EnsayarResult};
use regex::Regex;
use std::sync::{Arc, Mutex, OnceLock};

/// Handle returned by [`PermittedErrors::add`] for scoped removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PermittedErrorHandle(u64);

/// How a permitted-error entry matches the log message
#[derive(Debug, Clone)]
pub enum MessageMatcher {
    /// Message must contain this substring
    Substring(String),
    /// Message must match this regular expression
    Pattern(Regex),
}

impl MessageMatcher {
    fn matches(&self, message: &str) -> bool {
        match self {
            Self::Substring(needle) => message.contains(needle.as_str()),
            Self::Pattern(regex) => regex.is_match(message),
        }
    }
}

#[derive(Debug, Clone)]
struct PermittedEntry {
    handle: PermittedErrorHandle,
    matcher: MessageMatcher,
    stacktrace: Option<String>,
}

/// Mutable set of permitted error patterns.
///
/// # Stacktrace semantics
///
/// An entry with no stacktrace filter matches on message alone. A
/// non-empty stacktrace filter additionally requires the log line's
/// stacktrace to contain it as a substring.
#[derive(Debug, Default)]
pub struct PermittedErrors {
    entries: Vec<PermittedEntry>,
    next_handle: u64,
}

impl PermittedErrors {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry shared by engine integrations
    pub fn global() -> SharedPermittedErrors {
        static GLOBAL: OnceLock<SharedPermittedErrors> = OnceLock::new();
        GLOBAL
            .get_or_init(|| Arc::new(Mutex::new(Self::new())))
            .clone()
    }

    /// Permit error logs containing the given substring
    pub fn add_substring(
        &mut self,
        message: impl Into<String>,
        stacktrace: Option<String>,
    ) -> PermittedErrorHandle {
        let matcher = MessageMatcher::Substring(message.into());
        self.push(matcher, stacktrace)
    }

    /// Permit error logs matching the given regular expression
    pub fn add_pattern(
        &mut self,
        pattern: &str,
        stacktrace: Option<String>,
    ) -> EnsayarResult<PermittedErrorHandle> {
        let regex = Regex::new(pattern).map_err(|e| EnsayarError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(self.push(MessageMatcher::Pattern(regex), stacktrace))
    }

    fn push(
        &mut self,
        matcher: MessageMatcher,
        stacktrace: Option<String>,
    ) -> PermittedErrorHandle {
        let handle = PermittedErrorHandle(self.next_handle);
        self.next_handle += 1;
        // Empty stacktrace filters behave as no filter
        let stacktrace = stacktrace.filter(|s| !s.is_empty());
        self.entries.push(PermittedEntry {
            handle,
            matcher,
            stacktrace,
        });
        handle
    }

    /// Remove a previously added entry; returns false if it was not present
    pub fn remove(&mut self, handle: PermittedErrorHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.handle != handle);
        before != self.entries.len()
    }

    /// Drop every entry. Called at run-session boundaries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of registered entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check whether an error-level log line is tolerated
    #[must_use]
    pub fn is_permitted(&self, message: &str, stacktrace: &str) -> bool {
        self.entries.iter().any(|entry| {
            entry.matcher.matches(message)
                && entry
                    .stacktrace
                    .as_ref()
                    .map_or(true, |filter| stacktrace.contains(filter.as_str()))
        })
    }
}

/// Shared, lockable registry handle used by the scheduler and test bodies
pub type SharedPermittedErrors = Arc<Mutex<PermittedErrors>>;

/// Create a fresh shared registry (one per run session in tests/CLI)
#[must_use]
pub fn shared() -> SharedPermittedErrors {
    Arc::new(Mutex::new(PermittedErrors::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    mod matching {
        use super::*;

        #[test]
        fn test_substring_match() {
            let mut registry = PermittedErrors::new();
            let _ = registry.add_substring("connection refused", None);
            assert!(registry.is_permitted("http: connection refused by peer", ""));
            assert!(!registry.is_permitted("unrelated failure", ""));
        }

        #[test]
        fn test_pattern_match() {
            let mut registry = PermittedErrors::new();
            registry
                .add_pattern(r"timeout after \d+ms", None)
                .unwrap();
            assert!(registry.is_permitted("request timeout after 250ms", ""));
            assert!(!registry.is_permitted("request timeout after ms", ""));
        }

        #[test]
        fn test_invalid_pattern_rejected() {
            let mut registry = PermittedErrors::new();
            let err = registry.add_pattern("(unclosed", None).unwrap_err();
            assert!(matches!(err, EnsayarError::InvalidPattern { .. }));
        }

        #[test]
        fn test_empty_stacktrace_filter_ignores_stacktrace() {
            let mut registry = PermittedErrors::new();
            let _ = registry.add_substring("expected", Some(String::new()));
            assert!(registry.is_permitted("expected failure", "any stack at all"));
        }

        #[test]
        fn test_stacktrace_filter_requires_containment() {
            let mut registry = PermittedErrors::new();
            let _ = registry.add_substring("expected", Some("LoginScreen.Show".into()));
            assert!(registry.is_permitted("expected failure", "at LoginScreen.Show()"));
            assert!(!registry.is_permitted("expected failure", "at MainMenu.Open()"));
        }
    }

    mod lifecycle {
        use super::*;

        #[test]
        fn test_remove_by_handle() {
            let mut registry = PermittedErrors::new();
            let handle = registry.add_substring("expected", None);
            assert!(registry.is_permitted("expected", ""));
            assert!(registry.remove(handle));
            assert!(!registry.is_permitted("expected", ""));
            assert!(!registry.remove(handle), "double remove is a no-op");
        }

        #[test]
        fn test_handles_are_distinct() {
            let mut registry = PermittedErrors::new();
            let a = registry.add_substring("a", None);
            let b = registry.add_substring("b", None);
            assert_ne!(a, b);
            assert!(registry.remove(a));
            assert!(registry.is_permitted("b", ""));
        }

        #[test]
        fn test_clear_at_session_boundary() {
            let mut registry = PermittedErrors::new();
            let _ = registry.add_substring("a", None);
            let _ = registry.add_substring("b", None);
            assert_eq!(registry.len(), 2);
            registry.clear();
            assert!(registry.is_empty());
        }
    }
}
