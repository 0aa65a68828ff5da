use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::{mpsc, oneshot};

use crate::ipc::SurfaceId;
use crate::terminal::tmux::Tmux;

/// User-facing services of the host: notices, a modal confirmation, and
/// raising a panel.
#[async_trait]
pub(crate) trait HostUi: Send + Sync {
    fn show_error(&self, message: &str);
    /// Transient status line, hidden after `duration`.
    fn show_status(&self, message: &str, duration: Duration);
    fn show_info(&self, message: &str);
    /// Modal yes/no. Dismissal counts as no.
    async fn confirm(&self, prompt: &str) -> bool;
    /// Make the panel visible again (without changing its content).
    async fn reveal_panel(&self, surface: SurfaceId);
}

/// A confirmation the console front-end must answer.
pub(crate) struct PromptRequest {
    pub(crate) question: String,
    pub(crate) reply: oneshot::Sender<bool>,
}

/// Host UI rendered on the panel's own console.
pub(crate) struct ConsoleUi {
    prompts: mpsc::UnboundedSender<PromptRequest>,
    tmux: Option<Arc<Tmux>>,
}

impl ConsoleUi {
    pub(crate) fn new(prompts: mpsc::UnboundedSender<PromptRequest>, tmux: Option<Arc<Tmux>>) -> Self {
        Self { prompts, tmux }
    }
}

#[async_trait]
impl HostUi for ConsoleUi {
    fn show_error(&self, message: &str) {
        tracing::warn!("{message}");
        println!("\u{2717} {message}");
    }

    fn show_status(&self, message: &str, duration: Duration) {
        tracing::debug!(?duration, "status: {message}");
        println!("\u{2713} {message}");
    }

    fn show_info(&self, message: &str) {
        tracing::info!("{message}");
        println!("\u{2139} {message}");
    }

    async fn confirm(&self, prompt: &str) -> bool {
        let (reply, answer) = oneshot::channel();
        let request = PromptRequest {
            question: prompt.to_string(),
            reply,
        };
        if self.prompts.unbounded_send(request).is_err() {
            return false;
        }
        answer.await.unwrap_or(false)
    }

    async fn reveal_panel(&self, surface: SurfaceId) {
        let Some(tmux) = &self.tmux else { return };
        let Some(pane) = tmux.own_pane() else { return };
        if let Err(e) = tmux.select_pane(pane).await {
            tracing::debug!(%surface, %pane, "reveal failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn confirm_waits_for_front_end_answer() {
        let (tx, mut rx) = mpsc::unbounded();
        let ui = ConsoleUi::new(tx, None);

        let answer = tokio::spawn(async move { ui.confirm("Clear?").await });
        let request = rx.next().await.unwrap();
        assert_eq!(request.question, "Clear?");
        request.reply.send(true).unwrap();
        assert!(answer.await.unwrap());
    }

    #[tokio::test]
    async fn dropped_prompt_counts_as_no() {
        let (tx, mut rx) = mpsc::unbounded();
        let ui = ConsoleUi::new(tx, None);

        let answer = tokio::spawn(async move { ui.confirm("Clear?").await });
        drop(rx.next().await.unwrap());
        assert!(!answer.await.unwrap());
    }

    #[tokio::test]
    async fn confirm_without_front_end_is_no() {
        let (tx, rx) = mpsc::unbounded();
        drop(rx);
        let ui = ConsoleUi::new(tx, None);
        assert!(!ui.confirm("Clear?").await);
    }
}
