pub mod tmux;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

/// Opaque handle to a terminal the host can address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct TerminalId(pub(crate) String);

impl fmt::Display for TerminalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub(crate) enum DriverError {
    #[error("failed to run {program}: {error}")]
    Spawn {
        program: &'static str,
        error: std::io::Error,
    },
    #[error("`{command}` failed: {stderr}")]
    Failed { command: String, stderr: String },
}

/// The primitives the host terminal exposes. None of them report when the
/// terminal has actually finished acting on them.
#[async_trait]
pub(crate) trait TerminalDriver: Send + Sync {
    /// The terminal that would receive input right now, if any.
    async fn active_terminal(&self) -> Option<TerminalId>;
    /// Replace the shared clipboard contents.
    async fn write_clipboard(&self, text: &str) -> Result<(), DriverError>;
    /// Bring `terminal` to the foreground and give it focus.
    async fn show(&self, terminal: &TerminalId) -> Result<(), DriverError>;
    /// Paste the current clipboard contents into `terminal`.
    async fn paste(&self, terminal: &TerminalId) -> Result<(), DriverError>;
    /// Submit the terminal's current input line.
    async fn commit(&self, terminal: &TerminalId) -> Result<(), DriverError>;
}
