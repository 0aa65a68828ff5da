use serde::{Deserialize, Serialize};

/// Hard cap on remembered sends. The 21st insertion evicts the oldest entry.
pub(crate) const HISTORY_LIMIT: usize = 20;

/// One previously dispatched text plus its capture time.
///
/// `timestamp` is display-only; ordering comes from position in the history
/// sequence, never from parsing this field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct HistoryEntry {
    pub(crate) text: String,
    pub(crate) timestamp: String,
}

impl HistoryEntry {
    /// Capture `text` with the current local wall-clock time (`HH:MM`).
    pub(crate) fn capture(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            timestamp: chrono::Local::now().format("%H:%M").to_string(),
        }
    }
}

/// The durable record: draft, history (newest first) and split preference.
///
/// Every field defaults, so a record written by an older build (or a partial
/// one) still loads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PersistedState {
    #[serde(default)]
    pub(crate) input_text: String,
    #[serde(default)]
    pub(crate) history: Vec<HistoryEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) split_position: Option<u32>,
}

impl PersistedState {
    /// Enforce the history cap on a record that came from outside.
    pub(crate) fn normalized(mut self) -> Self {
        cap_history(&mut self.history);
        self
    }
}

/// Prepend `entry` and evict from the tail until the cap holds.
pub(crate) fn push_history(history: &mut Vec<HistoryEntry>, entry: HistoryEntry) {
    history.insert(0, entry);
    cap_history(history);
}

/// Keep the newest `HISTORY_LIMIT` entries. Returns how many were dropped.
pub(crate) fn cap_history(history: &mut Vec<HistoryEntry>) -> usize {
    let excess = history.len().saturating_sub(HISTORY_LIMIT);
    history.truncate(HISTORY_LIMIT);
    excess
}
