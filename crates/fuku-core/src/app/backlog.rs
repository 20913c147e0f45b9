//! Per-account backlog: catalog minus history, shuffled.
//!
//! The shuffle is not cosmetic. Processing the same catalog in the same
//! order from every account is an externally observable pattern; a uniform
//! random order per account avoids producing it. Order is therefore never a
//! correctness property of a backlog — set membership is.

use std::collections::{HashSet, VecDeque};

use crate::domain::Task;
use crate::ports::RandomSource;

/// Build one account's private queue: every catalog task whose id is not in
/// `done`, in a fresh uniform random order.
pub fn build(
    catalog: &[Task],
    done: &HashSet<String>,
    rng: &mut dyn RandomSource,
) -> VecDeque<Task> {
    let mut pending: Vec<Task> = catalog
        .iter()
        .filter(|task| !done.contains(&task.id))
        .cloned()
        .collect();
    rng.shuffle(&mut pending);
    pending.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskKind;
    use crate::ports::SeededRandom;

    fn catalog(n: usize) -> Vec<Task> {
        (0..n)
            .map(|i| {
                Task::new(
                    TaskKind::Dynamic,
                    i.to_string(),
                    format!("https://t.bilibili.com/{i}"),
                )
            })
            .collect()
    }

    fn ids(backlog: &VecDeque<Task>) -> Vec<String> {
        backlog.iter().map(|t| t.id.clone()).collect()
    }

    #[test]
    fn done_tasks_never_resurface() {
        let catalog = catalog(5);
        let done: HashSet<String> = ["1".to_string(), "3".to_string()].into();
        let backlog = build(&catalog, &done, &mut SeededRandom::new(0));

        let mut got = ids(&backlog);
        got.sort();
        assert_eq!(got, vec!["0", "2", "4"]);
    }

    #[test]
    fn membership_equals_catalog_minus_done_regardless_of_shuffle() {
        let catalog = catalog(12);
        let done: HashSet<String> = ["7".to_string()].into();

        for seed in 0..8 {
            let backlog = build(&catalog, &done, &mut SeededRandom::new(seed));
            let mut got = ids(&backlog);
            got.sort_by_key(|id| id.parse::<u32>().unwrap());
            let expected: Vec<String> =
                (0..12).filter(|i| *i != 7).map(|i| i.to_string()).collect();
            assert_eq!(got, expected, "seed {seed}");
        }
    }

    #[test]
    fn shuffle_actually_permutes() {
        let catalog = catalog(16);
        let backlog = build(&catalog, &HashSet::new(), &mut SeededRandom::new(42));
        let original: Vec<String> = catalog.iter().map(|t| t.id.clone()).collect();
        assert_ne!(ids(&backlog), original, "seed 42 must not be the identity");
    }

    #[test]
    fn backlogs_for_different_accounts_are_independent() {
        let catalog = catalog(6);
        let done_a: HashSet<String> = ["0".to_string()].into();
        let done_b = HashSet::new();

        let a = build(&catalog, &done_a, &mut SeededRandom::new(1));
        let b = build(&catalog, &done_b, &mut SeededRandom::new(2));

        assert_eq!(a.len(), 5);
        assert_eq!(b.len(), 6, "account A's history never affects account B");
    }

    #[test]
    fn empty_catalog_yields_empty_backlog() {
        let backlog = build(&[], &HashSet::new(), &mut SeededRandom::new(0));
        assert!(backlog.is_empty());
    }
}
