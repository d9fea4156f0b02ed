//! Append-only history of what the assistant said.

use chrono::{DateTime, Utc};

/// What kind of feed entry a hint is. Drives presentation only; every kind
/// is stored the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintKind {
    System,
    Advice,
    Analysis,
    Summary,
    Error,
}

impl std::fmt::Display for HintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HintKind::System => "system",
            HintKind::Advice => "advice",
            HintKind::Analysis => "analysis",
            HintKind::Summary => "summary",
            HintKind::Error => "error",
        };
        write!(f, "{name}")
    }
}

/// One unit of advisory feedback. Immutable once recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct Hint {
    pub kind: HintKind,
    pub text: String,
    pub received_at: DateTime<Utc>,
}

/// Insertion-ordered hint history. Entries are appended as frames arrive
/// and never removed or reordered, so index `n` means "the n-th thing the
/// assistant said".
#[derive(Debug, Default)]
pub struct HintLog {
    entries: Vec<Hint>,
}

impl HintLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry stamped with the arrival time.
    pub fn record(&mut self, kind: HintKind, text: impl Into<String>) {
        self.entries.push(Hint {
            kind,
            text: text.into(),
            received_at: Utc::now(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Hint> {
        self.entries.get(index)
    }

    pub fn latest(&self) -> Option<&Hint> {
        self.entries.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Hint> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_keep_arrival_order() {
        let mut log = HintLog::new();
        log.record(HintKind::System, "welcome");
        log.record(HintKind::Advice, "start with brute force");
        log.record(HintKind::Advice, "now improve it");

        let texts: Vec<&str> = log.iter().map(|hint| hint.text.as_str()).collect();
        assert_eq!(
            texts,
            ["welcome", "start with brute force", "now improve it"]
        );
        assert_eq!(log.latest().unwrap().kind, HintKind::Advice);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn timestamps_never_run_backwards() {
        let mut log = HintLog::new();
        log.record(HintKind::Advice, "first");
        log.record(HintKind::Advice, "second");
        assert!(log.get(0).unwrap().received_at <= log.get(1).unwrap().received_at);
    }
}
