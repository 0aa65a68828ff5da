//! Paste-and-commit delivery into a terminal that never acknowledges input.
//!
//! The terminal only offers "paste clipboard" and "submit line", with no
//! signal for when either has taken effect. Delivery is therefore a fixed
//! sequence of stages separated by settle delays:
//!
//! ```text
//! AwaitingFocus -> AwaitingPasteSettle -> AwaitingCommit -> AwaitingRefocus -> Done
//! ```
//!
//! A commit-only delivery skips the paste stage. Delivery is at-most-once and
//! non-atomic: a failing step aborts the sequence and earlier steps stay done.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::terminal::{DriverError, TerminalDriver, TerminalId};

/// Waits between stages. Production sleeps on the tokio clock; a host with a
/// real completion signal can wait on that instead.
#[async_trait]
pub(crate) trait Timer: Send + Sync {
    async fn settle(&self, stage: DeliveryStage, delay: Duration);
}

pub(crate) struct TokioTimer;

#[async_trait]
impl Timer for TokioTimer {
    async fn settle(&self, _stage: DeliveryStage, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DeliveryDelays {
    /// After focusing the terminal, before pasting.
    pub(crate) focus_settle: Duration,
    /// After pasting, before committing.
    pub(crate) paste_settle: Duration,
    /// After committing, before handing focus back to the panel.
    pub(crate) refocus: Duration,
}

impl Default for DeliveryDelays {
    fn default() -> Self {
        Self {
            focus_settle: Duration::from_millis(100),
            paste_settle: Duration::from_millis(150),
            refocus: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeliveryStage {
    AwaitingFocus,
    AwaitingPasteSettle,
    AwaitingCommit,
    AwaitingRefocus,
    Done,
}

impl fmt::Display for DeliveryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DeliveryStage::AwaitingFocus => "focus",
            DeliveryStage::AwaitingPasteSettle => "paste",
            DeliveryStage::AwaitingCommit => "commit",
            DeliveryStage::AwaitingRefocus => "refocus",
            DeliveryStage::Done => "done",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Payload {
    Paste(String),
    CommitOnly,
}

#[derive(Debug, Error)]
pub(crate) enum DeliveryError {
    #[error("No active terminal found. Please open a terminal first.")]
    NoActiveTerminal,
    #[error("clipboard write failed: {0}")]
    Clipboard(#[source] DriverError),
    #[error("{stage} step failed: {source}")]
    Step {
        stage: DeliveryStage,
        #[source]
        source: DriverError,
    },
}

/// One in-flight delivery.
#[derive(Debug)]
pub(crate) struct Delivery {
    payload: Payload,
    terminal: TerminalId,
    stage: DeliveryStage,
}

impl Delivery {
    /// Resolve the active terminal and, for a paste payload, load the
    /// clipboard. Nothing is touched when there is no active terminal.
    pub(crate) async fn begin(
        driver: &dyn TerminalDriver,
        payload: Payload,
    ) -> Result<Self, DeliveryError> {
        let terminal = driver
            .active_terminal()
            .await
            .ok_or(DeliveryError::NoActiveTerminal)?;

        if let Payload::Paste(text) = &payload {
            driver
                .write_clipboard(text)
                .await
                .map_err(DeliveryError::Clipboard)?;
        }

        tracing::debug!(%terminal, "delivery started");
        Ok(Self {
            payload,
            terminal,
            stage: DeliveryStage::AwaitingFocus,
        })
    }

    pub(crate) fn stage(&self) -> DeliveryStage {
        self.stage
    }

    pub(crate) fn terminal(&self) -> &TerminalId {
        &self.terminal
    }

    /// Perform the current stage's action and move to the next stage.
    ///
    /// `AwaitingRefocus` is left for the caller: handing focus back to the
    /// panel is not a terminal operation.
    pub(crate) async fn advance(
        &mut self,
        driver: &dyn TerminalDriver,
        timer: &dyn Timer,
        delays: &DeliveryDelays,
    ) -> Result<DeliveryStage, DeliveryError> {
        let stage = self.stage;
        let step = |source| DeliveryError::Step { stage, source };

        let next = match stage {
            DeliveryStage::AwaitingFocus => {
                driver.show(&self.terminal).await.map_err(step)?;
                timer.settle(stage, delays.focus_settle).await;
                match self.payload {
                    Payload::Paste(_) => DeliveryStage::AwaitingPasteSettle,
                    Payload::CommitOnly => DeliveryStage::AwaitingCommit,
                }
            }
            DeliveryStage::AwaitingPasteSettle => {
                driver.paste(&self.terminal).await.map_err(step)?;
                timer.settle(stage, delays.paste_settle).await;
                DeliveryStage::AwaitingCommit
            }
            DeliveryStage::AwaitingCommit => {
                driver.commit(&self.terminal).await.map_err(step)?;
                DeliveryStage::AwaitingRefocus
            }
            DeliveryStage::AwaitingRefocus => DeliveryStage::Done,
            DeliveryStage::Done => DeliveryStage::Done,
        };

        tracing::trace!(from = %stage, to = %next, terminal = %self.terminal, "delivery stage");
        self.stage = next;
        Ok(next)
    }

    /// Drive every terminal-side stage. Returns with the delivery parked in
    /// `AwaitingRefocus`.
    pub(crate) async fn run_to_refocus(
        &mut self,
        driver: &dyn TerminalDriver,
        timer: &dyn Timer,
        delays: &DeliveryDelays,
    ) -> Result<(), DeliveryError> {
        while !matches!(
            self.stage,
            DeliveryStage::AwaitingRefocus | DeliveryStage::Done
        ) {
            self.advance(driver, timer, delays).await?;
        }
        Ok(())
    }

    /// Wait out the refocus delay and mark the delivery finished.
    pub(crate) async fn settle_refocus(&mut self, timer: &dyn Timer, delays: &DeliveryDelays) {
        if self.stage == DeliveryStage::AwaitingRefocus {
            timer.settle(self.stage, delays.refocus).await;
            self.stage = DeliveryStage::Done;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{DriverCall, FakeDriver, RecordingTimer};
    use pretty_assertions::assert_eq;

    fn delays() -> DeliveryDelays {
        DeliveryDelays::default()
    }

    #[tokio::test]
    async fn paste_delivery_runs_stages_in_order() {
        let driver = FakeDriver::with_terminal("%3");
        let timer = RecordingTimer::default();

        let mut delivery = Delivery::begin(&driver, Payload::Paste("ls -la".into()))
            .await
            .unwrap();
        assert_eq!(delivery.stage(), DeliveryStage::AwaitingFocus);
        delivery.run_to_refocus(&driver, &timer, &delays()).await.unwrap();
        assert_eq!(delivery.stage(), DeliveryStage::AwaitingRefocus);

        let pane = TerminalId("%3".into());
        assert_eq!(
            driver.calls(),
            vec![
                DriverCall::Resolve,
                DriverCall::Clipboard("ls -la".into()),
                DriverCall::Show(pane.clone()),
                DriverCall::Paste(pane.clone()),
                DriverCall::Commit(pane),
            ]
        );
        assert_eq!(
            timer.waits(),
            vec![
                (DeliveryStage::AwaitingFocus, Duration::from_millis(100)),
                (DeliveryStage::AwaitingPasteSettle, Duration::from_millis(150)),
            ]
        );

        delivery.settle_refocus(&timer, &delays()).await;
        assert_eq!(delivery.stage(), DeliveryStage::Done);
        assert_eq!(
            timer.waits().last(),
            Some(&(DeliveryStage::AwaitingRefocus, Duration::from_millis(500)))
        );
    }

    #[tokio::test]
    async fn commit_only_skips_clipboard_and_paste() {
        let driver = FakeDriver::with_terminal("%3");
        let timer = RecordingTimer::default();

        let mut delivery = Delivery::begin(&driver, Payload::CommitOnly).await.unwrap();
        let next = delivery.advance(&driver, &timer, &delays()).await.unwrap();
        assert_eq!(next, DeliveryStage::AwaitingCommit);
        delivery.run_to_refocus(&driver, &timer, &delays()).await.unwrap();

        let pane = TerminalId("%3".into());
        assert_eq!(
            driver.calls(),
            vec![DriverCall::Resolve, DriverCall::Show(pane.clone()), DriverCall::Commit(pane)]
        );
        assert_eq!(timer.waits().len(), 1);
    }

    #[tokio::test]
    async fn no_terminal_touches_nothing() {
        let driver = FakeDriver::without_terminal();
        let result = Delivery::begin(&driver, Payload::Paste("ls".into())).await;
        assert!(matches!(result, Err(DeliveryError::NoActiveTerminal)));
        assert_eq!(driver.calls(), vec![DriverCall::Resolve]);
    }

    #[tokio::test]
    async fn clipboard_failure_aborts_before_focus() {
        let driver = FakeDriver::with_terminal("%3");
        driver.fail_on("clipboard");
        let result = Delivery::begin(&driver, Payload::Paste("ls".into())).await;
        assert!(matches!(result, Err(DeliveryError::Clipboard(_))));
        assert!(!driver.calls().iter().any(|c| matches!(c, DriverCall::Show(_))));
    }

    #[tokio::test]
    async fn paste_failure_keeps_earlier_steps_and_stops() {
        let driver = FakeDriver::with_terminal("%3");
        driver.fail_on("paste");
        let timer = RecordingTimer::default();

        let mut delivery = Delivery::begin(&driver, Payload::Paste("ls".into())).await.unwrap();
        let err = delivery
            .run_to_refocus(&driver, &timer, &delays())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DeliveryError::Step { stage: DeliveryStage::AwaitingPasteSettle, .. }
        ));
        assert_eq!(delivery.stage(), DeliveryStage::AwaitingPasteSettle);
        let calls = driver.calls();
        assert!(calls.contains(&DriverCall::Show(TerminalId("%3".into()))));
        assert!(!calls.iter().any(|c| matches!(c, DriverCall::Commit(_))));
    }

    #[test]
    fn no_terminal_message_is_user_facing() {
        assert_eq!(
            DeliveryError::NoActiveTerminal.to_string(),
            "No active terminal found. Please open a terminal first."
        );
    }
}
