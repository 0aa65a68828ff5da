//! tmux as the terminal host: panes are terminals, a named paste buffer is
//! the clipboard.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{DriverError, TerminalDriver, TerminalId};

/// Target that resolves to the pane the user was in before the panel.
pub(crate) const LAST_PANE: &str = "{last}";

/// Paste buffer used as the shared clipboard.
pub(crate) const DEFAULT_BUFFER: &str = "compose-relay";

pub(crate) struct Tmux {
    target: String,
    buffer: String,
    /// The panel's own pane; never treated as the active terminal.
    own_pane: Option<String>,
}

impl Tmux {
    pub(crate) fn new(target: impl Into<String>, buffer: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            buffer: buffer.into(),
            own_pane: std::env::var("TMUX_PANE").ok().filter(|p| !p.is_empty()),
        }
    }

    /// Whether this process runs inside a tmux client.
    pub(crate) fn inside_tmux() -> bool {
        std::env::var_os("TMUX").is_some_and(|v| !v.is_empty())
    }

    pub(crate) fn own_pane(&self) -> Option<&str> {
        self.own_pane.as_deref()
    }

    fn resolve_args(&self) -> Vec<String> {
        vec![
            "display-message".into(),
            "-p".into(),
            "-t".into(),
            self.target.clone(),
            "#{pane_id}".into(),
        ]
    }

    fn load_buffer_args(&self) -> Vec<String> {
        vec!["load-buffer".into(), "-b".into(), self.buffer.clone(), "-".into()]
    }

    fn paste_args(&self, pane: &TerminalId) -> Vec<String> {
        // -p: bracketed paste, so multi-line text is not executed line by line.
        vec![
            "paste-buffer".into(),
            "-p".into(),
            "-b".into(),
            self.buffer.clone(),
            "-t".into(),
            pane.0.clone(),
        ]
    }

    fn commit_args(pane: &TerminalId) -> Vec<String> {
        vec!["send-keys".into(), "-t".into(), pane.0.clone(), "Enter".into()]
    }

    /// Focus a pane, switching windows if needed.
    pub(crate) async fn select_pane(&self, pane: &str) -> Result<(), DriverError> {
        run(&["select-window".into(), "-t".into(), pane.to_string()], None).await?;
        run(&["select-pane".into(), "-t".into(), pane.to_string()], None).await?;
        Ok(())
    }
}

/// Run one tmux command, optionally feeding `stdin`. Returns trimmed stdout.
async fn run(args: &[String], stdin: Option<&str>) -> Result<String, DriverError> {
    let mut child = Command::new("tmux")
        .args(args)
        .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|error| DriverError::Spawn { program: "tmux", error })?;

    if let Some(input) = stdin {
        if let Some(mut pipe) = child.stdin.take() {
            pipe.write_all(input.as_bytes())
                .await
                .map_err(|error| DriverError::Spawn { program: "tmux", error })?;
        }
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|error| DriverError::Spawn { program: "tmux", error })?;

    if !output.status.success() {
        return Err(DriverError::Failed {
            command: format!("tmux {}", args.join(" ")),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[async_trait]
impl TerminalDriver for Tmux {
    async fn active_terminal(&self) -> Option<TerminalId> {
        let pane = match run(&self.resolve_args(), None).await {
            Ok(p) if !p.is_empty() => p,
            Ok(_) => return None,
            Err(e) => {
                tracing::debug!(target_pane = %self.target, "no active terminal: {e}");
                return None;
            }
        };
        if self.own_pane.as_deref() == Some(pane.as_str()) {
            tracing::warn!(%pane, "target resolves to the panel's own pane");
            return None;
        }
        Some(TerminalId(pane))
    }

    async fn write_clipboard(&self, text: &str) -> Result<(), DriverError> {
        run(&self.load_buffer_args(), Some(text)).await.map(|_| ())
    }

    async fn show(&self, terminal: &TerminalId) -> Result<(), DriverError> {
        self.select_pane(&terminal.0).await
    }

    async fn paste(&self, terminal: &TerminalId) -> Result<(), DriverError> {
        run(&self.paste_args(terminal), None).await.map(|_| ())
    }

    async fn commit(&self, terminal: &TerminalId) -> Result<(), DriverError> {
        run(&Self::commit_args(terminal), None).await.map(|_| ())
    }
}
