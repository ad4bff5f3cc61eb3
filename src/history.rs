use std::collections::VecDeque;

use chrono::{DateTime, Local};
use rand::distributions::Alphanumeric;
use rand::Rng;

pub const MAX_HISTORY: usize = 50;
const ID_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub id: String,
    pub encoded: String,
    pub timestamp: DateTime<Local>,
}

/// Where finished results go. Receives the opaque encoded blob only.
pub trait HistorySink {
    fn record(&mut self, encoded: String) -> &HistoryEntry;
}

/// In-memory history for the current process, newest first.
#[derive(Debug, Default)]
pub struct SessionHistory {
    entries: VecDeque<HistoryEntry>,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    /// Replace an entry's blob in place, e.g. once the scorer has answered.
    pub fn update(&mut self, id: &str, encoded: String) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.encoded = encoded;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Coarse age of an entry: "just now", then minutes, hours, days.
pub fn time_ago(timestamp: DateTime<Local>, now: DateTime<Local>) -> String {
    let seconds = (now - timestamp).num_seconds().max(0);
    match seconds {
        s if s < 60 => "just now".to_string(),
        s if s < 3_600 => format!("{}m ago", s / 60),
        s if s < 86_400 => format!("{}h ago", s / 3_600),
        s => format!("{}d ago", s / 86_400),
    }
}

impl HistorySink for SessionHistory {
    fn record(&mut self, encoded: String) -> &HistoryEntry {
        let id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(ID_LEN)
            .map(char::from)
            .collect();

        self.entries.push_front(HistoryEntry {
            id,
            encoded,
            timestamp: Local::now(),
        });
        self.entries.truncate(MAX_HISTORY);
        &self.entries[0]
    }
}
