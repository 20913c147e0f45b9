//! Bootstrap: turn validated accounts into scheduler workers.
//!
//! For each account this opens its history database, bulk-loads the
//! delivered ids and builds the shuffled backlog. A store that fails to open
//! skips that account (its tasks will come back next run); only a run where
//! *no* store opened at all aborts before the scheduler starts.

use std::path::Path;

use tracing::{error, info};

use crate::app::backlog;
use crate::domain::{Account, FukuError, Task};
use crate::ports::RandomSource;
use crate::store::{HistoryStore, store_path_for};

use super::scheduler::AccountWorker;

pub fn assemble_pool(
    accounts: Vec<Account>,
    catalog: &[Task],
    db_dir: &Path,
    rng: &mut dyn RandomSource,
) -> Result<Vec<AccountWorker>, FukuError> {
    let mut workers = Vec::new();
    let mut attempted = 0usize;
    let mut opened = 0usize;

    for account in accounts {
        if !account.is_enabled() {
            info!(remark = account.remark.as_str(), "account disabled in config, skipped");
            continue;
        }
        attempted += 1;

        let path = store_path_for(db_dir, &account.remark);
        let store = match HistoryStore::open(&path) {
            Ok(store) => store,
            Err(e) => {
                error!(
                    remark = account.remark.as_str(),
                    path = %path.display(),
                    error = %e,
                    "history store unavailable, skipping account"
                );
                continue;
            }
        };
        opened += 1;

        let done = store.list_all();
        let queue = backlog::build(catalog, &done, rng);
        if queue.is_empty() {
            info!(
                remark = account.remark.as_str(),
                done = done.len(),
                "nothing pending for this account"
            );
            continue;
        }

        info!(
            remark = account.remark.as_str(),
            pending = queue.len(),
            done = done.len(),
            "backlog built"
        );
        workers.push(AccountWorker {
            account,
            store,
            backlog: queue,
        });
    }

    if attempted > 0 && opened == 0 {
        return Err(FukuError::NoUsableStore);
    }
    Ok(workers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AccountConfig;
    use crate::domain::TaskKind;
    use crate::ports::SeededRandom;

    fn catalog() -> Vec<Task> {
        vec![
            Task::new(TaskKind::Dynamic, "1", "https://t.bilibili.com/1"),
            Task::new(TaskKind::Dynamic, "2", "https://t.bilibili.com/2"),
        ]
    }

    #[test]
    fn builds_one_worker_per_enabled_account() {
        let dir = std::env::temp_dir().join(format!("fuku-bootstrap-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let accounts = vec![
            Account::from_config(AccountConfig::for_tests("alice")),
            Account::from_config(AccountConfig::for_tests("bob")),
        ];
        let workers = assemble_pool(accounts, &catalog(), &dir, &mut SeededRandom::new(0))
            .expect("assemble");
        assert_eq!(workers.len(), 2);
        assert!(workers.iter().all(|w| w.backlog.len() == 2));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn disabled_accounts_are_left_out() {
        let dir = std::env::temp_dir().join(format!("fuku-bootstrap-d-{}", std::process::id()));
        let mut cfg = AccountConfig::for_tests("carol");
        cfg.enabled = false;
        let workers = assemble_pool(
            vec![Account::from_config(cfg)],
            &catalog(),
            &dir,
            &mut SeededRandom::new(0),
        )
        .expect("assemble");
        assert!(workers.is_empty());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_account_list_is_not_an_error() {
        let dir = std::env::temp_dir().join("fuku-bootstrap-empty");
        let workers =
            assemble_pool(Vec::new(), &catalog(), &dir, &mut SeededRandom::new(0)).expect("ok");
        assert!(workers.is_empty());
    }
}
