//! Scripted executor for tests and dry runs.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::{Account, Task, TaskOutcome};
use crate::ports::TaskExecutor;

type Script = dyn Fn(&Task, &Account) -> TaskOutcome + Send + Sync;

/// Returns whatever the script says and records every call, so tests can
/// assert exactly which (task, account) pairs the scheduler dispatched.
pub struct ScriptedExecutor {
    script: Box<Script>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedExecutor {
    pub fn new(script: impl Fn(&Task, &Account) -> TaskOutcome + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Same outcome for every call.
    pub fn always(outcome: TaskOutcome) -> Self {
        Self::new(move |_, _| outcome.clone())
    }

    /// Dispatched (account remark, task id) pairs, in order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TaskExecutor for ScriptedExecutor {
    async fn execute(&self, task: &Task, account: &Account) -> TaskOutcome {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((account.remark.clone(), task.id.clone()));
        }
        (self.script)(task, account)
    }
}
