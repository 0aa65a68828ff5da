//! Test doubles for the host collaborators.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::delivery::{DeliveryStage, Timer};
use crate::host::HostUi;
use crate::ipc::SurfaceId;
use crate::state::PersistedState;
use crate::store::{StateStore, StoreError};
use crate::terminal::{DriverError, TerminalDriver, TerminalId};

// --- Terminal ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DriverCall {
    Resolve,
    Clipboard(String),
    Show(TerminalId),
    Paste(TerminalId),
    Commit(TerminalId),
}

pub(crate) struct FakeDriver {
    terminal: Mutex<Option<TerminalId>>,
    calls: Mutex<Vec<DriverCall>>,
    fail_on: Mutex<Option<&'static str>>,
}

impl FakeDriver {
    pub(crate) fn with_terminal(id: &str) -> Self {
        Self {
            terminal: Mutex::new(Some(TerminalId(id.to_string()))),
            calls: Mutex::new(Vec::new()),
            fail_on: Mutex::new(None),
        }
    }

    pub(crate) fn without_terminal() -> Self {
        let driver = Self::with_terminal("");
        *driver.terminal.lock() = None;
        driver
    }

    /// Make the named step ("clipboard", "show", "paste", "commit") fail.
    pub(crate) fn fail_on(&self, step: &'static str) {
        *self.fail_on.lock() = Some(step);
    }

    pub(crate) fn calls(&self) -> Vec<DriverCall> {
        self.calls.lock().clone()
    }

    fn record(&self, step: &'static str, call: DriverCall) -> Result<(), DriverError> {
        self.calls.lock().push(call);
        if *self.fail_on.lock() == Some(step) {
            return Err(DriverError::Failed {
                command: step.to_string(),
                stderr: "pane vanished".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TerminalDriver for FakeDriver {
    async fn active_terminal(&self) -> Option<TerminalId> {
        self.calls.lock().push(DriverCall::Resolve);
        self.terminal.lock().clone()
    }

    async fn write_clipboard(&self, text: &str) -> Result<(), DriverError> {
        self.record("clipboard", DriverCall::Clipboard(text.to_string()))
    }

    async fn show(&self, terminal: &TerminalId) -> Result<(), DriverError> {
        self.record("show", DriverCall::Show(terminal.clone()))
    }

    async fn paste(&self, terminal: &TerminalId) -> Result<(), DriverError> {
        self.record("paste", DriverCall::Paste(terminal.clone()))
    }

    async fn commit(&self, terminal: &TerminalId) -> Result<(), DriverError> {
        self.record("commit", DriverCall::Commit(terminal.clone()))
    }
}

// --- Timer ---

/// Records every settle. With `sleeping()`, also waits on the tokio clock so
/// paused-time tests can observe ordering.
#[derive(Default)]
pub(crate) struct RecordingTimer {
    waits: Mutex<Vec<(DeliveryStage, Duration)>>,
    sleep: bool,
}

impl RecordingTimer {
    pub(crate) fn sleeping() -> Self {
        Self {
            waits: Mutex::new(Vec::new()),
            sleep: true,
        }
    }

    pub(crate) fn waits(&self) -> Vec<(DeliveryStage, Duration)> {
        self.waits.lock().clone()
    }
}

#[async_trait]
impl Timer for RecordingTimer {
    async fn settle(&self, stage: DeliveryStage, delay: Duration) {
        self.waits.lock().push((stage, delay));
        if self.sleep {
            tokio::time::sleep(delay).await;
        }
    }
}

// --- Store ---

#[derive(Default)]
pub(crate) struct MemoryStore {
    record: Mutex<Option<PersistedState>>,
    writes: Mutex<usize>,
    broken: Mutex<bool>,
}

impl MemoryStore {
    pub(crate) fn with(state: PersistedState) -> Self {
        let store = Self::default();
        *store.record.lock() = Some(state);
        store
    }

    pub(crate) fn snapshot(&self) -> Option<PersistedState> {
        self.record.lock().clone()
    }

    pub(crate) fn writes(&self) -> usize {
        *self.writes.lock()
    }

    /// Every subsequent load and save fails.
    pub(crate) fn break_storage(&self) {
        *self.broken.lock() = true;
    }

    fn check(&self) -> Result<(), StoreError> {
        if *self.broken.lock() {
            return Err(StoreError::Io {
                path: "memory".into(),
                error: std::io::Error::other("disk unplugged"),
            });
        }
        Ok(())
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<Option<PersistedState>, StoreError> {
        self.check()?;
        Ok(self.record.lock().clone())
    }

    fn save(&self, state: &PersistedState) -> Result<(), StoreError> {
        self.check()?;
        *self.record.lock() = Some(state.clone());
        *self.writes.lock() += 1;
        Ok(())
    }
}

// --- Host UI ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Notice {
    Error(String),
    Status(String),
    Info(String),
}

pub(crate) struct ScriptedUi {
    answers: Mutex<VecDeque<bool>>,
    notices: Mutex<Vec<Notice>>,
    prompts: Mutex<Vec<String>>,
    reveals: Mutex<Vec<SurfaceId>>,
}

impl ScriptedUi {
    /// Every confirmation is answered from `answers`, then "no".
    pub(crate) fn answering(answers: &[bool]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().copied().collect()),
            notices: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
            reveals: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    pub(crate) fn reveals(&self) -> Vec<SurfaceId> {
        self.reveals.lock().clone()
    }
}

impl Default for ScriptedUi {
    fn default() -> Self {
        Self::answering(&[])
    }
}

#[async_trait]
impl HostUi for ScriptedUi {
    fn show_error(&self, message: &str) {
        self.notices.lock().push(Notice::Error(message.to_string()));
    }

    fn show_status(&self, message: &str, _duration: Duration) {
        self.notices.lock().push(Notice::Status(message.to_string()));
    }

    fn show_info(&self, message: &str) {
        self.notices.lock().push(Notice::Info(message.to_string()));
    }

    async fn confirm(&self, prompt: &str) -> bool {
        self.prompts.lock().push(prompt.to_string());
        self.answers.lock().pop_front().unwrap_or(false)
    }

    async fn reveal_panel(&self, surface: SurfaceId) {
        self.reveals.lock().push(surface);
    }
}
