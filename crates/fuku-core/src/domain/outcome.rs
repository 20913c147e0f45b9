//! Outcome model: what the executor reports back for one (task, account) pair.
//!
//! This module only defines the "shape" of results. It does not assume how
//! actions are performed; the scheduler consumes these as plain data to
//! update the history store, the circuit breaker and the run summary.

use serde::{Deserialize, Serialize};

/// The four idempotent actions an account can perform on a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Follow,
    Like,
    Comment,
    Repost,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Follow => "follow",
            ActionKind::Like => "like",
            ActionKind::Comment => "comment",
            ActionKind::Repost => "repost",
        }
    }
}

/// Result of a single action at the transport level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub succeeded: bool,
    pub detail: String,
}

impl ActionResult {
    pub fn ok(detail: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            detail: detail.into(),
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            detail: detail.into(),
        }
    }
}

/// A closed record of everything that happened while executing one task for
/// one account. Each action slot is `None` when the account's capability
/// flags skipped it entirely.
///
/// `soft_failure_detected` is deliberately separate from the per-action
/// results: a suppressed comment *succeeded* at the transport level, and the
/// per-action result says so. Only the breaker consumes the flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub crawl_succeeded: bool,
    /// Set when the crawl failed; feeds the failure report.
    pub crawl_error: Option<String>,
    pub follow: Option<ActionResult>,
    pub like: Option<ActionResult>,
    pub comment: Option<ActionResult>,
    pub repost: Option<ActionResult>,
    pub soft_failure_detected: bool,
}

impl TaskOutcome {
    /// An outcome whose crawl succeeded and with no actions recorded yet.
    pub fn crawled() -> Self {
        Self {
            crawl_succeeded: true,
            crawl_error: None,
            follow: None,
            like: None,
            comment: None,
            repost: None,
            soft_failure_detected: false,
        }
    }

    /// The task could not even be fetched; no actions were attempted.
    pub fn crawl_failed(detail: impl Into<String>) -> Self {
        Self {
            crawl_succeeded: false,
            crawl_error: Some(detail.into()),
            follow: None,
            like: None,
            comment: None,
            repost: None,
            soft_failure_detected: false,
        }
    }

    pub fn with_action(mut self, kind: ActionKind, result: ActionResult) -> Self {
        self.set_action(kind, result);
        self
    }

    pub fn set_action(&mut self, kind: ActionKind, result: ActionResult) {
        match kind {
            ActionKind::Follow => self.follow = Some(result),
            ActionKind::Like => self.like = Some(result),
            ActionKind::Comment => self.comment = Some(result),
            ActionKind::Repost => self.repost = Some(result),
        }
    }

    pub fn with_soft_failure(mut self) -> Self {
        self.soft_failure_detected = true;
        self
    }

    /// Delivery policy: a task counts as delivered once its crawl succeeded,
    /// regardless of individual action results. Ordinary action failures are
    /// at-most-one-attempt-per-run and must not resurface next run.
    pub fn delivered(&self) -> bool {
        self.crawl_succeeded
    }

    /// Iterate the recorded action results in a fixed order.
    pub fn action_results(&self) -> impl Iterator<Item = (ActionKind, &ActionResult)> {
        [
            (ActionKind::Follow, self.follow.as_ref()),
            (ActionKind::Like, self.like.as_ref()),
            (ActionKind::Comment, self.comment.as_ref()),
            (ActionKind::Repost, self.repost.as_ref()),
        ]
        .into_iter()
        .filter_map(|(kind, res)| res.map(|r| (kind, r)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crawl_failed_is_not_delivered() {
        let o = TaskOutcome::crawl_failed("timeout");
        assert!(!o.delivered());
        assert_eq!(o.crawl_error.as_deref(), Some("timeout"));
        assert_eq!(o.action_results().count(), 0);
    }

    #[test]
    fn delivered_even_when_an_action_failed() {
        let o = TaskOutcome::crawled()
            .with_action(ActionKind::Like, ActionResult::failed("rate limited"));
        assert!(o.delivered());
        let results: Vec<_> = o.action_results().collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, ActionKind::Like);
        assert!(!results[0].1.succeeded);
    }

    #[test]
    fn soft_failure_flag_is_independent_of_action_success() {
        let o = TaskOutcome::crawled()
            .with_action(ActionKind::Comment, ActionResult::ok("posted, but hidden"))
            .with_soft_failure();
        assert!(o.soft_failure_detected);
        assert!(o.comment.as_ref().map(|r| r.succeeded).unwrap_or(false));
    }
}
