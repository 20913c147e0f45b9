use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of content a task points at.
///
/// The two kinds live in separate URL namespaces (dynamic ids are numeric,
/// video ids are `BV...` strings), so the raw id alone is collision-free in
/// the history store; the kind is still persisted alongside for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Dynamic,
    Video,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Dynamic => "dynamic",
            TaskKind::Video => "video",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of pending work: a single target post.
///
/// Identity is `(kind, id)`. Tasks are produced by the catalog and are never
/// mutated afterwards; the scheduler only moves them between queues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub kind: TaskKind,
    /// External content id: dynamic id digits, or a video bvid.
    pub id: String,
    /// The URL the id was extracted from (kept for reports and reposts).
    pub source_url: String,
}

impl Task {
    pub fn new(kind: TaskKind, id: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            source_url: source_url.into(),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_id() {
        let t = Task::new(TaskKind::Dynamic, "123", "https://t.bilibili.com/123");
        assert_eq!(t.to_string(), "dynamic:123");
    }

    #[test]
    fn kind_roundtrip_json() {
        let s = serde_json::to_string(&TaskKind::Video).expect("serialize");
        assert_eq!(s, "\"video\"");
        let back: TaskKind = serde_json::from_str(&s).expect("deserialize");
        assert_eq!(back, TaskKind::Video);
    }
}
