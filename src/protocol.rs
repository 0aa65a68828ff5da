//! Messages exchanged between a Surface and the Controller.
//!
//! Each message is a single JSON object tagged by `type`. Neither direction
//! has a reply channel: a follow-up, if any, is a separate message.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::{HistoryEntry, PersistedState};

/// Intent forwarded from a Surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub(crate) enum SurfaceMessage {
    /// Paste `text` into the active terminal and submit it.
    SendToTerminal { text: String },
    /// Submit whatever is already on the terminal's input line.
    SendEnterOnly,
    /// Overwrite the persisted draft.
    SaveDraft { text: String },
    /// Overwrite the persisted history (newest first).
    SaveHistory { history: Vec<HistoryEntry> },
    /// Ask for a `restoreData` snapshot.
    LoadData,
    /// Overwrite the persisted split height.
    SaveSplitPosition { position: u32 },
    /// Ask the host to confirm and then wipe history.
    RequestClearHistory,
}

impl SurfaceMessage {
    /// Short name for logs; never includes user text.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            SurfaceMessage::SendToTerminal { .. } => "sendToTerminal",
            SurfaceMessage::SendEnterOnly => "sendEnterOnly",
            SurfaceMessage::SaveDraft { .. } => "saveDraft",
            SurfaceMessage::SaveHistory { .. } => "saveHistory",
            SurfaceMessage::LoadData => "loadData",
            SurfaceMessage::SaveSplitPosition { .. } => "saveSplitPosition",
            SurfaceMessage::RequestClearHistory => "requestClearHistory",
        }
    }
}

/// Directive pushed from the Controller to one Surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub(crate) enum ControllerMessage {
    RestoreData(RestoreData),
    FocusInput,
    HistoryCleared,
}

/// Snapshot sent in answer to `loadData`. An absent field means "leave the
/// local value alone", not "set it to empty".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RestoreData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) input_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) history: Option<Vec<HistoryEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) split_position: Option<u32>,
}

impl From<PersistedState> for RestoreData {
    fn from(state: PersistedState) -> Self {
        Self {
            input_text: Some(state.input_text),
            history: Some(state.history),
            split_position: state.split_position,
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Serialize one message to its single-line wire form.
pub(crate) fn encode<T: Serialize>(message: &T) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(message)?)
}

/// Parse one wire line. Surrounding whitespace (including the newline) is ignored.
pub(crate) fn decode<T: DeserializeOwned>(line: &str) -> Result<T, ProtocolError> {
    Ok(serde_json::from_str(line.trim())?)
}
