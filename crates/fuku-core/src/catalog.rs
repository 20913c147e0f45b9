//! Work catalog: raw URL entries in, unique task list out.
//!
//! Each raw entry is matched against the known URL shapes per content kind.
//! Entries that match nothing are dropped and reported; entries resolving to
//! the same `(kind, id)` collapse to one task, first occurrence wins. The
//! resulting order is reproducible but carries no meaning — every account
//! reshuffles its own backlog anyway.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::domain::{Task, TaskKind};

static DYNAMIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:bilibili\.com/(?:opus|dynamic)/|t\.bilibili\.com/)(\d+)")
        .expect("valid pattern")
});

static VIDEO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"bilibili\.com/video/(BV[a-zA-Z0-9]{10})").expect("valid pattern"));

/// Result of a catalog build: the tasks plus the entries we had to drop.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub tasks: Vec<Task>,
    pub dropped: Vec<String>,
}

/// Parse one raw entry into a task, or `None` for unknown shapes.
pub fn parse_entry(entry: &str) -> Option<Task> {
    if let Some(caps) = DYNAMIC_RE.captures(entry) {
        return Some(Task::new(TaskKind::Dynamic, &caps[1], entry.trim()));
    }
    if let Some(caps) = VIDEO_RE.captures(entry) {
        return Some(Task::new(TaskKind::Video, &caps[1], entry.trim()));
    }
    None
}

/// Build the run's task universe from raw entries.
pub fn build(entries: &[String]) -> Catalog {
    let mut catalog = Catalog::default();
    let mut seen: HashSet<(TaskKind, String)> = HashSet::new();

    for entry in entries {
        let trimmed = entry.trim();
        if trimmed.is_empty() {
            continue;
        }
        match parse_entry(trimmed) {
            Some(task) => {
                if seen.insert((task.kind, task.id.clone())) {
                    catalog.tasks.push(task);
                }
            }
            None => {
                warn!(entry = trimmed, "unrecognized URL shape, dropped");
                catalog.dropped.push(trimmed.to_string());
            }
        }
    }

    catalog
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::opus("https://www.bilibili.com/opus/123456789", TaskKind::Dynamic, "123456789")]
    #[case::dynamic("https://www.bilibili.com/dynamic/987654", TaskKind::Dynamic, "987654")]
    #[case::t_short("https://t.bilibili.com/112233445566", TaskKind::Dynamic, "112233445566")]
    #[case::video("https://www.bilibili.com/video/BV1xx411c7mD", TaskKind::Video, "BV1xx411c7mD")]
    #[case::with_query(
        "https://t.bilibili.com/4455?spm_id_from=333.999",
        TaskKind::Dynamic,
        "4455"
    )]
    fn parses_known_shapes(#[case] url: &str, #[case] kind: TaskKind, #[case] id: &str) {
        let task = parse_entry(url).expect("should parse");
        assert_eq!(task.kind, kind);
        assert_eq!(task.id, id);
    }

    #[rstest]
    #[case::not_bilibili("https://example.com/opus/123")]
    #[case::no_id("https://www.bilibili.com/opus/")]
    #[case::short_bvid("https://www.bilibili.com/video/BV123")]
    #[case::garbage("not a url at all")]
    fn rejects_unknown_shapes(#[case] entry: &str) {
        assert!(parse_entry(entry).is_none());
    }

    #[test]
    fn malformed_entries_are_dropped_and_reported() {
        let entries = vec![
            "https://t.bilibili.com/1".to_string(),
            "nonsense".to_string(),
            "https://t.bilibili.com/2".to_string(),
        ];
        let catalog = build(&entries);
        assert_eq!(catalog.tasks.len(), 2);
        assert_eq!(catalog.dropped, vec!["nonsense".to_string()]);
    }

    #[test]
    fn duplicates_collapse_keeping_first_occurrence() {
        let entries = vec![
            "https://t.bilibili.com/10".to_string(),
            "https://www.bilibili.com/opus/10".to_string(),
            "https://t.bilibili.com/20".to_string(),
        ];
        let catalog = build(&entries);
        let ids: Vec<&str> = catalog.tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["10", "20"]);
        assert_eq!(
            catalog.tasks[0].source_url, "https://t.bilibili.com/10",
            "first occurrence wins"
        );
        assert!(catalog.dropped.is_empty());
    }

    #[test]
    fn blank_lines_are_skipped_silently() {
        let entries = vec!["".to_string(), "   ".to_string()];
        let catalog = build(&entries);
        assert!(catalog.tasks.is_empty());
        assert!(catalog.dropped.is_empty());
    }
}
