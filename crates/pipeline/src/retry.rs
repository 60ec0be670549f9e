//! Bounded retry for URL resolution.
//!
//! Attempts are immediate (no backoff). Whether a failed attempt is worth
//! repeating is decided by a [`RetryClassifier`]; the default
//! [`AlwaysRetry`] spends the full budget on every failure, including
//! permanent ones such as removed or private videos.

use std::sync::Arc;

/// Total resolution attempts per clip, including the first.
pub const DEFAULT_RESOLVE_ATTEMPTS: u32 = 5;

/// One failed resolver attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptFailure {
    /// 1-based attempt number.
    pub attempt: u32,
    /// Exit code, or `None` when the process never produced one.
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    /// Captured output or error description.
    pub message: String,
}

/// Decides whether a failed attempt should be retried.
pub trait RetryClassifier: Send + Sync {
    fn should_retry(&self, failure: &AttemptFailure) -> bool;
}

/// Retry every failure until the budget is spent.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRetry;

impl RetryClassifier for AlwaysRetry {
    fn should_retry(&self, _failure: &AttemptFailure) -> bool {
        true
    }
}

/// Stop retrying when the captured output matches a known permanent error.
#[derive(Debug, Clone)]
pub struct PermanentErrorPatterns {
    patterns: Vec<String>,
}

impl PermanentErrorPatterns {
    pub fn new(patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| p.into().to_lowercase())
                .collect(),
        }
    }

    /// Messages the resolver prints for videos that will never resolve.
    pub fn youtube() -> Self {
        Self::new([
            "video unavailable",
            "private video",
            "this video has been removed",
            "account associated with this video has been terminated",
            "not available in your country",
            "sign in to confirm your age",
        ])
    }
}

impl RetryClassifier for PermanentErrorPatterns {
    fn should_retry(&self, failure: &AttemptFailure) -> bool {
        let message = failure.message.to_lowercase();
        !self.patterns.iter().any(|p| message.contains(p.as_str()))
    }
}

/// Attempt budget plus classifier.
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    classifier: Arc<dyn RetryClassifier>,
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RESOLVE_ATTEMPTS, AlwaysRetry)
    }
}

impl RetryPolicy {
    /// A budget of zero is treated as one attempt.
    pub fn new(max_attempts: u32, classifier: impl RetryClassifier + 'static) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            classifier: Arc::new(classifier),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether another attempt should follow `failure`.
    pub fn should_retry(&self, failure: &AttemptFailure) -> bool {
        failure.attempt < self.max_attempts && self.classifier.should_retry(failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(attempt: u32, message: &str) -> AttemptFailure {
        AttemptFailure {
            attempt,
            exit_code: Some(1),
            timed_out: false,
            message: message.to_string(),
        }
    }

    #[test]
    fn default_budget_is_five() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 5);
        assert!(policy.should_retry(&failure(4, "HTTP Error 429")));
        assert!(!policy.should_retry(&failure(5, "HTTP Error 429")));
    }

    #[test]
    fn zero_budget_still_allows_one_attempt() {
        let policy = RetryPolicy::new(0, AlwaysRetry);
        assert_eq!(policy.max_attempts(), 1);
        assert!(!policy.should_retry(&failure(1, "x")));
    }

    #[test]
    fn permanent_errors_stop_early() {
        let policy = RetryPolicy::new(5, PermanentErrorPatterns::youtube());
        assert!(!policy.should_retry(&failure(1, "ERROR: Video unavailable")));
        assert!(!policy.should_retry(&failure(1, "ERROR: Private video\nSign in")));
        assert!(policy.should_retry(&failure(1, "HTTP Error 503: Service Unavailable")));
    }
}
