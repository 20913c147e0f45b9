//! Run summary: aggregate counters plus an ordered failure list.

use serde::{Deserialize, Serialize};

use super::outcome::{ActionKind, TaskOutcome};
use super::task::Task;

/// Aggregate counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub crawled: u32,
    pub liked: u32,
    pub reposted: u32,
    pub followed: u32,
    pub commented: u32,
    pub failed: u32,
}

/// Where a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Crawl,
    Follow,
    Like,
    Comment,
    Repost,
    /// History-store write that could not be completed.
    Persistence,
}

impl From<ActionKind> for FailureKind {
    fn from(kind: ActionKind) -> Self {
        match kind {
            ActionKind::Follow => FailureKind::Follow,
            ActionKind::Like => FailureKind::Like,
            ActionKind::Comment => FailureKind::Comment,
            ActionKind::Repost => FailureKind::Repost,
        }
    }
}

/// One failed step, kept in occurrence order for the end-of-run report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub kind: FailureKind,
    pub reason: String,
    pub target: String,
    pub detail: String,
    pub account: String,
}

/// Everything the run hands to the notifier at the end.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub stats: RunStats,
    pub failures: Vec<FailureRecord>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_failure(&mut self, record: FailureRecord) {
        self.stats.failed += 1;
        self.failures.push(record);
    }

    /// Fold one task outcome into the counters.
    ///
    /// Soft suppressions never show up here: they feed the circuit breaker
    /// exclusively, and the transport-level action result already counted.
    pub fn apply(&mut self, task: &Task, account: &str, outcome: &TaskOutcome) {
        if outcome.crawl_succeeded {
            self.stats.crawled += 1;
        } else {
            self.push_failure(FailureRecord {
                kind: FailureKind::Crawl,
                reason: format!("failed to fetch {task}"),
                target: task.source_url.clone(),
                detail: outcome.crawl_error.clone().unwrap_or_default(),
                account: account.to_string(),
            });
        }

        for (kind, result) in outcome.action_results() {
            if result.succeeded {
                match kind {
                    ActionKind::Follow => self.stats.followed += 1,
                    ActionKind::Like => self.stats.liked += 1,
                    ActionKind::Comment => self.stats.commented += 1,
                    ActionKind::Repost => self.stats.reposted += 1,
                }
            } else {
                self.push_failure(FailureRecord {
                    kind: kind.into(),
                    reason: format!("{} failed for {task}", kind.as_str()),
                    target: task.source_url.clone(),
                    detail: result.detail.clone(),
                    account: account.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::outcome::ActionResult;
    use crate::domain::task::TaskKind;

    fn task() -> Task {
        Task::new(TaskKind::Dynamic, "99", "https://t.bilibili.com/99")
    }

    #[test]
    fn counts_successful_actions() {
        let mut summary = RunSummary::new();
        let outcome = TaskOutcome::crawled()
            .with_action(ActionKind::Follow, ActionResult::ok("followed"))
            .with_action(ActionKind::Like, ActionResult::ok("liked"))
            .with_action(ActionKind::Comment, ActionResult::ok("commented"))
            .with_action(ActionKind::Repost, ActionResult::ok("reposted"));

        summary.apply(&task(), "alice", &outcome);

        assert_eq!(summary.stats.crawled, 1);
        assert_eq!(summary.stats.followed, 1);
        assert_eq!(summary.stats.liked, 1);
        assert_eq!(summary.stats.commented, 1);
        assert_eq!(summary.stats.reposted, 1);
        assert_eq!(summary.stats.failed, 0);
        assert!(summary.failures.is_empty());
    }

    #[test]
    fn failed_action_becomes_a_failure_record() {
        let mut summary = RunSummary::new();
        let outcome = TaskOutcome::crawled()
            .with_action(ActionKind::Like, ActionResult::failed("rate limited"));

        summary.apply(&task(), "alice", &outcome);

        assert_eq!(summary.stats.liked, 0);
        assert_eq!(summary.stats.failed, 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].kind, FailureKind::Like);
        assert_eq!(summary.failures[0].account, "alice");
        assert_eq!(summary.failures[0].detail, "rate limited");
    }

    #[test]
    fn crawl_failure_is_recorded_once() {
        let mut summary = RunSummary::new();
        summary.apply(&task(), "alice", &TaskOutcome::crawl_failed("404"));

        assert_eq!(summary.stats.crawled, 0);
        assert_eq!(summary.stats.failed, 1);
        assert_eq!(summary.failures[0].kind, FailureKind::Crawl);
    }

    #[test]
    fn soft_suppression_does_not_create_a_failure() {
        let mut summary = RunSummary::new();
        let outcome = TaskOutcome::crawled()
            .with_action(ActionKind::Comment, ActionResult::ok("posted, but hidden"))
            .with_soft_failure();

        summary.apply(&task(), "alice", &outcome);

        assert_eq!(summary.stats.commented, 1);
        assert_eq!(summary.stats.failed, 0);
        assert!(summary.failures.is_empty());
    }
}
