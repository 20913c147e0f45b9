//! Scheduler - アカウント横断のタスク実行ループ
//!
//! # フロー
//! 1. 有効かつバックログ非空のアカウント集合（active pool）を作る
//! 2. pool から一様ランダムに 1 アカウント選ぶ（round-robin ではない。
//!    アカウント順のバースト的なリクエストパターンを避けるため）
//! 3. そのバックログ先頭のタスクを pop し、実行器に同期的に渡す
//! 4. outcome を履歴ストアとブレーカーと集計に反映する
//! 5. pool が空になるまで繰り返す
//!
//! タスクは常に 1 件ずつ端から端まで実行する（アカウントをまたいでも
//! 並行実行しない）。キャンセルはタスク境界でのみ判定する。

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::domain::{
    Account, FailureKind, FailureRecord, RunSummary, Task,
};
use crate::ports::{RandomSource, TaskExecutor};
use crate::store::HistoryStore;

use super::breaker::CircuitBreaker;

/// One account's share of the run: identity, history handle and the private
/// task queue. Mutated only by the scheduler, one iteration at a time.
pub struct AccountWorker {
    pub account: Account,
    pub store: HistoryStore,
    pub backlog: VecDeque<Task>,
}

pub struct Scheduler {
    breaker: CircuitBreaker,
    /// Pause bounds between tasks, seconds.
    delay_bounds: (f64, f64),
    shutdown: watch::Receiver<bool>,
}

impl Scheduler {
    pub fn new(
        breaker: CircuitBreaker,
        delay_bounds: (f64, f64),
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            breaker,
            delay_bounds,
            shutdown,
        }
    }

    /// Drive the pool to exhaustion and return the run summary.
    ///
    /// Runs until every account is retired: backlog drained, disabled by the
    /// breaker, or the run was cancelled. An in-flight task always finishes;
    /// cancellation only prevents starting the next one.
    pub async fn run(
        &mut self,
        executor: &dyn TaskExecutor,
        rng: &mut dyn RandomSource,
        mut pool: Vec<AccountWorker>,
    ) -> RunSummary {
        let mut summary = RunSummary::new();
        let total_accounts = pool.len();
        let total_tasks: usize = pool.iter().map(|w| w.backlog.len()).sum();
        info!(accounts = total_accounts, tasks = total_tasks, "scheduler starting");

        loop {
            if *self.shutdown.borrow() {
                info!("cancellation requested, finishing run");
                break;
            }

            // Retirement happens here, at selection time: accounts drained or
            // disabled in the previous iteration drop out before the pick.
            pool.retain(|w| w.account.is_enabled() && !w.backlog.is_empty());
            if pool.is_empty() {
                break;
            }

            let index = rng.pick_index(pool.len());
            let worker = &mut pool[index];
            let Some(task) = worker.backlog.pop_front() else {
                continue;
            };

            debug!(
                remark = worker.account.remark.as_str(),
                task = %task,
                remaining = worker.backlog.len(),
                "dispatching task"
            );
            let outcome = executor.execute(&task, &worker.account).await;

            if outcome.delivered() {
                if let Err(e) = worker.store.insert(&task.id, task.kind.as_str()) {
                    summary.push_failure(FailureRecord {
                        kind: FailureKind::Persistence,
                        reason: format!("failed to record {task} as delivered"),
                        target: task.source_url.clone(),
                        detail: e.to_string(),
                        account: worker.account.remark.clone(),
                    });
                }
            }

            summary.apply(&task, &worker.account.remark, &outcome);

            if outcome.soft_failure_detected {
                self.breaker.record_soft_failure(&mut worker.account);
            }

            self.pause_between_tasks(rng).await;
        }

        info!(
            crawled = summary.stats.crawled,
            failed = summary.stats.failed,
            "scheduler finished"
        );
        summary
    }

    /// Randomized pause between tasks, cut short by shutdown so cancellation
    /// stays prompt even with generous delay bounds.
    async fn pause_between_tasks(&mut self, rng: &mut dyn RandomSource) {
        let (min, max) = self.delay_bounds;
        let secs = rng.range_f64(min, max);
        if secs <= 0.0 {
            return;
        }
        tokio::select! {
            _ = self.shutdown.changed() => {}
            _ = tokio::time::sleep(Duration::from_secs_f64(secs)) => {}
        }
    }
}
