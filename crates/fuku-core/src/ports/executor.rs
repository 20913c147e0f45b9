//! TaskExecutor port - 実行器の継ぎ目
//!
//! スケジューラは「どう実行するか」を知らない。実行器はアクション列を
//! 最後まで実行し、要約した TaskOutcome だけを返す。

use async_trait::async_trait;

use crate::domain::{Account, Task, TaskOutcome};

/// TaskExecutor は 1 つの (task, account) ペアの全アクションを実行
///
/// Design intent:
/// - Transport errors are reported *inside* the outcome, never as `Err`;
///   from the scheduler's point of view an outcome is plain data.
/// - The executor owns intra-task pacing (pauses between actions). The
///   scheduler only paces between tasks.
/// - The scheduler awaits this call to completion; it imposes no timeout.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, task: &Task, account: &Account) -> TaskOutcome;
}
