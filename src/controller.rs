//! The privileged side: sole writer of persisted state and sole driver of
//! the terminal.
//!
//! Each inbound message runs as an independent handler. Persistence handlers
//! complete inline, so writes land in arrival order and the last one wins.
//! Delivery and clear-history handlers await external work and run as their
//! own tasks, which lets two deliveries interleave in real time.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::StreamExt;
use futures::channel::mpsc;
use parking_lot::Mutex;

use crate::delivery::{Delivery, DeliveryDelays, DeliveryError, Payload, Timer};
use crate::host::HostUi;
use crate::ipc::{self, Envelope, Inbox, SurfaceId, SurfaceLink};
use crate::protocol::{self, ControllerMessage, RestoreData, SurfaceMessage};
use crate::state::{HistoryEntry, PersistedState, cap_history};
use crate::store::StateStore;
use crate::terminal::TerminalDriver;
use crate::util;

const CLEAR_HISTORY_PROMPT: &str = "Clear all input history? This cannot be undone.";
const HISTORY_CLEARED_NOTICE: &str = "Input history cleared.";
const STATUS_DURATION: Duration = Duration::from_secs(3);
const STATUS_PREVIEW_CHARS: usize = 50;

/// The external collaborators a Controller drives.
pub(crate) struct Host {
    pub(crate) store: Arc<dyn StateStore>,
    pub(crate) terminal: Arc<dyn TerminalDriver>,
    pub(crate) ui: Arc<dyn HostUi>,
    pub(crate) timer: Arc<dyn Timer>,
}

#[derive(Clone)]
pub(crate) struct Controller {
    inner: Arc<Inner>,
}

struct Inner {
    host: Host,
    delays: DeliveryDelays,
    inbox: mpsc::UnboundedSender<Envelope>,
    surfaces: Mutex<HashMap<SurfaceId, mpsc::UnboundedSender<String>>>,
    next_surface: AtomicU64,
    /// Last record seen or written; stands in when storage reads fail.
    cached: Mutex<Option<PersistedState>>,
}

impl Controller {
    pub(crate) fn new(host: Host, delays: DeliveryDelays) -> (Self, Inbox) {
        let (inbox, rx) = ipc::inbox();
        let controller = Self {
            inner: Arc::new(Inner {
                host,
                delays,
                inbox,
                surfaces: Mutex::new(HashMap::new()),
                next_surface: AtomicU64::new(1),
                cached: Mutex::new(None),
            }),
        };
        (controller, rx)
    }

    // --- Surface registry ---

    /// Register a new panel instance and hand it its end of the bridge.
    pub(crate) fn attach(&self) -> SurfaceLink {
        let id = SurfaceId(self.inner.next_surface.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded();
        self.inner.surfaces.lock().insert(id, tx);
        tracing::debug!(surface = %id, "surface attached");
        SurfaceLink::new(id, self.inner.inbox.clone(), rx)
    }

    pub(crate) fn detach(&self, id: SurfaceId) {
        if self.inner.surfaces.lock().remove(&id).is_some() {
            tracing::debug!(surface = %id, "surface detached");
        }
    }

    fn push(&self, to: SurfaceId, message: ControllerMessage) {
        let tx = match self.inner.surfaces.lock().get(&to) {
            Some(tx) => tx.clone(),
            None => {
                tracing::debug!(surface = %to, ?message, "dropping message for detached surface");
                return;
            }
        };
        match ipc::push(&tx, &message) {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(surface = %to, "surface channel closed");
                self.detach(to);
            }
            Err(e) => tracing::error!(surface = %to, "encode failed: {e}"),
        }
    }

    // --- Serving ---

    /// Consume serialized Surface messages for the life of the Controller.
    pub(crate) async fn serve(self, mut inbox: Inbox) {
        while let Some(Envelope { from, payload }) = inbox.next().await {
            let message: SurfaceMessage = match protocol::decode(&payload) {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(surface = %from, "ignoring message: {e}");
                    continue;
                }
            };
            tracing::debug!(surface = %from, kind = message.kind(), "inbound");

            match message {
                SurfaceMessage::SendToTerminal { .. }
                | SurfaceMessage::SendEnterOnly
                | SurfaceMessage::RequestClearHistory => {
                    let this = self.clone();
                    tokio::spawn(async move { this.dispatch(from, message).await });
                }
                _ => self.dispatch(from, message).await,
            }
        }
        tracing::debug!("controller inbox closed");
    }

    /// Run the handler for one message to completion.
    pub(crate) async fn dispatch(&self, from: SurfaceId, message: SurfaceMessage) {
        match message {
            SurfaceMessage::SendToTerminal { text } => self.handle_send_to_terminal(from, text).await,
            SurfaceMessage::SendEnterOnly => self.handle_send_enter_only(from).await,
            SurfaceMessage::SaveDraft { text } => self.handle_save_draft(text),
            SurfaceMessage::SaveHistory { history } => self.handle_save_history(history),
            SurfaceMessage::LoadData => self.handle_load_request(from),
            SurfaceMessage::SaveSplitPosition { position } => {
                self.handle_save_split_position(position)
            }
            SurfaceMessage::RequestClearHistory => self.handle_request_clear_history(from).await,
        }
    }

    // --- Persistence ---

    /// Current record, defaulted when absent. A failing read falls back to
    /// the last known record.
    fn current(&self) -> PersistedState {
        match self.inner.host.store.load() {
            Ok(Some(state)) => {
                let state = state.normalized();
                *self.inner.cached.lock() = Some(state.clone());
                state
            }
            Ok(None) => PersistedState::default(),
            Err(e) => {
                tracing::warn!("state read failed, using last known state: {e}");
                self.inner.cached.lock().clone().unwrap_or_default()
            }
        }
    }

    fn update(&self, field: &'static str, mutate: impl FnOnce(&mut PersistedState)) {
        let mut state = self.current();
        mutate(&mut state);
        *self.inner.cached.lock() = Some(state.clone());
        match self.inner.host.store.save(&state) {
            Ok(()) => tracing::trace!(field, "persisted"),
            Err(e) => tracing::warn!(field, "state write failed: {e}"),
        }
    }

    pub(crate) fn handle_load_request(&self, from: SurfaceId) {
        let state = self.current();
        tracing::debug!(surface = %from, entries = state.history.len(), "restoring surface");
        self.push(from, ControllerMessage::RestoreData(RestoreData::from(state)));
    }

    pub(crate) fn handle_save_draft(&self, text: String) {
        self.update("inputText", |state| state.input_text = text);
    }

    pub(crate) fn handle_save_history(&self, mut entries: Vec<HistoryEntry>) {
        let dropped = cap_history(&mut entries);
        if dropped > 0 {
            tracing::warn!(dropped, "surface sent an oversized history; keeping the newest entries");
        }
        self.update("history", |state| state.history = entries);
    }

    pub(crate) fn handle_save_split_position(&self, position: u32) {
        self.update("splitPosition", |state| state.split_position = Some(position));
    }

    pub(crate) async fn handle_request_clear_history(&self, from: SurfaceId) {
        if !self.inner.host.ui.confirm(CLEAR_HISTORY_PROMPT).await {
            tracing::debug!(surface = %from, "clear history declined");
            return;
        }
        self.update("history", |state| state.history.clear());
        self.push(from, ControllerMessage::HistoryCleared);
        self.inner.host.ui.show_info(HISTORY_CLEARED_NOTICE);
    }

    // --- Terminal delivery ---

    pub(crate) async fn handle_send_to_terminal(&self, from: SurfaceId, text: String) {
        let preview = util::preview(&text, STATUS_PREVIEW_CHARS);
        match self.deliver(from, Payload::Paste(text)).await {
            Ok(()) => self
                .inner
                .host
                .ui
                .show_status(&format!("Executed: {preview}"), STATUS_DURATION),
            Err(e) => self.report(e),
        }
    }

    pub(crate) async fn handle_send_enter_only(&self, from: SurfaceId) {
        if let Err(e) = self.deliver(from, Payload::CommitOnly).await {
            self.report(e);
        }
    }

    /// Run the terminal-side stages, then schedule the hand-back of focus to
    /// `from` without waiting for it.
    async fn deliver(&self, from: SurfaceId, payload: Payload) -> Result<(), DeliveryError> {
        let host = &self.inner.host;
        let delays = &self.inner.delays;

        let mut delivery = Delivery::begin(host.terminal.as_ref(), payload).await?;
        delivery
            .run_to_refocus(host.terminal.as_ref(), host.timer.as_ref(), delays)
            .await?;
        tracing::info!(
            surface = %from,
            terminal = %delivery.terminal(),
            stage = %delivery.stage(),
            "delivered"
        );

        let this = self.clone();
        tokio::spawn(async move {
            let host = &this.inner.host;
            delivery.settle_refocus(host.timer.as_ref(), &this.inner.delays).await;
            host.ui.reveal_panel(from).await;
            this.push(from, ControllerMessage::FocusInput);
        });
        Ok(())
    }

    fn report(&self, error: DeliveryError) {
        tracing::warn!("delivery failed: {error}");
        let message = match error {
            DeliveryError::NoActiveTerminal => error.to_string(),
            other => format!("Failed to send command: {other}"),
        };
        self.inner.host.ui.show_error(&message);
    }
}
