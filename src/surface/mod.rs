//! The sandboxed panel side: live draft, history mirror, split layout.
//!
//! `Surface` performs no I/O. Every input returns the effects the front-end
//! must carry out, in order: messages to post, regions to re-render, focus and
//! clipboard requests, and timers to arm.

pub mod layout;

use std::time::Duration;

use layout::SplitLayout;

use crate::protocol::{ControllerMessage, RestoreData, SurfaceMessage};
use crate::state::{HistoryEntry, push_history};
use crate::util;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ComposePhase {
    Idle,
    Composing,
    /// A send was just issued; further sends are ignored until the cooldown
    /// elapses.
    Dispatching,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Effect {
    Post(SurfaceMessage),
    /// Draft text and character counter changed.
    RenderDraft,
    RenderHistory,
    RenderLayout,
    FocusInput,
    CopyToClipboard(String),
    /// Call `send_cooldown_elapsed` after this long.
    ScheduleSendCooldown(Duration),
}

pub(crate) struct Surface {
    draft: String,
    history: Vec<HistoryEntry>,
    layout: SplitLayout,
    phase: ComposePhase,
    send_cooldown: Duration,
}

impl Surface {
    pub(crate) fn new(layout: SplitLayout, send_cooldown: Duration) -> Self {
        Self {
            draft: String::new(),
            history: Vec::new(),
            layout,
            phase: ComposePhase::Idle,
            send_cooldown,
        }
    }

    pub(crate) fn draft(&self) -> &str {
        &self.draft
    }

    pub(crate) fn char_count(&self) -> usize {
        util::char_count(&self.draft)
    }

    pub(crate) fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub(crate) fn layout(&self) -> &SplitLayout {
        &self.layout
    }

    pub(crate) fn phase(&self) -> ComposePhase {
        self.phase
    }

    pub(crate) fn can_send(&self) -> bool {
        self.phase != ComposePhase::Dispatching
    }

    fn settle_phase(&mut self) {
        if self.phase != ComposePhase::Dispatching {
            self.phase = if self.draft.is_empty() {
                ComposePhase::Idle
            } else {
                ComposePhase::Composing
            };
        }
    }

    // --- Lifecycle ---

    /// The panel became live: ask for the persisted snapshot.
    pub(crate) fn activate(&self) -> Vec<Effect> {
        vec![Effect::Post(SurfaceMessage::LoadData)]
    }

    /// Apply one directive pushed by the Controller.
    pub(crate) fn apply(&mut self, message: ControllerMessage) -> Vec<Effect> {
        match message {
            ControllerMessage::RestoreData(data) => self.restore(data),
            ControllerMessage::FocusInput => vec![Effect::FocusInput],
            ControllerMessage::HistoryCleared => {
                self.history.clear();
                vec![
                    Effect::RenderHistory,
                    Effect::Post(SurfaceMessage::SaveHistory { history: Vec::new() }),
                ]
            }
        }
    }

    /// Overwrite each present field; absent fields keep their local value.
    fn restore(&mut self, data: RestoreData) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(text) = data.input_text {
            self.draft = text;
            self.settle_phase();
            effects.push(Effect::RenderDraft);
        }
        if let Some(history) = data.history {
            self.history = history;
            effects.push(Effect::RenderHistory);
        }
        if let Some(position) = data.split_position {
            self.layout.restore(position);
            effects.push(Effect::RenderLayout);
        }
        effects
    }

    // --- Compose ---

    /// The draft box now holds `text`.
    pub(crate) fn input(&mut self, text: impl Into<String>) -> Vec<Effect> {
        self.draft = text.into();
        self.settle_phase();
        vec![
            Effect::RenderDraft,
            Effect::Post(SurfaceMessage::SaveDraft {
                text: self.draft.clone(),
            }),
        ]
    }

    /// Record, persist and dispatch the draft, then clear it.
    ///
    /// Whitespace-only drafts and sends during the cooldown do nothing. The
    /// history entry exists before delivery is attempted and stays even if
    /// delivery fails.
    pub(crate) fn send(&mut self) -> Vec<Effect> {
        if !self.can_send() || self.draft.trim().is_empty() {
            return Vec::new();
        }

        let text = std::mem::take(&mut self.draft);
        push_history(&mut self.history, HistoryEntry::capture(text.clone()));
        self.phase = ComposePhase::Dispatching;

        vec![
            Effect::RenderHistory,
            Effect::Post(SurfaceMessage::SaveHistory {
                history: self.history.clone(),
            }),
            Effect::Post(SurfaceMessage::SendToTerminal { text }),
            Effect::Post(SurfaceMessage::SaveDraft { text: String::new() }),
            Effect::RenderDraft,
            Effect::ScheduleSendCooldown(self.send_cooldown),
        ]
    }

    pub(crate) fn send_cooldown_elapsed(&mut self) -> Vec<Effect> {
        if self.phase == ComposePhase::Dispatching {
            self.phase = ComposePhase::Idle;
            self.settle_phase();
        }
        Vec::new()
    }

    /// Submit whatever is already typed on the terminal line.
    pub(crate) fn send_enter(&self) -> Vec<Effect> {
        vec![Effect::Post(SurfaceMessage::SendEnterOnly)]
    }

    /// Empty the draft box. History is untouched.
    pub(crate) fn clear(&mut self) -> Vec<Effect> {
        self.input(String::new())
    }

    pub(crate) fn copy(&self) -> Vec<Effect> {
        vec![Effect::CopyToClipboard(self.draft.clone())]
    }

    /// Load a history entry (0 = newest) into the draft box.
    pub(crate) fn recall(&mut self, index: usize) -> Vec<Effect> {
        match self.history.get(index) {
            Some(entry) => {
                let text = entry.text.clone();
                self.input(text)
            }
            None => Vec::new(),
        }
    }

    pub(crate) fn request_clear_history(&self) -> Vec<Effect> {
        vec![Effect::Post(SurfaceMessage::RequestClearHistory)]
    }

    // --- Layout ---

    pub(crate) fn begin_drag(&mut self, pointer_y: i32) -> Vec<Effect> {
        self.layout.begin_drag(pointer_y);
        Vec::new()
    }

    /// Live feedback only; nothing is persisted mid-gesture.
    pub(crate) fn drag_to(&mut self, pointer_y: i32) -> Vec<Effect> {
        match self.layout.drag_to(pointer_y) {
            Some(_) => vec![Effect::RenderLayout],
            None => Vec::new(),
        }
    }

    pub(crate) fn end_drag(&mut self) -> Vec<Effect> {
        match self.layout.end_drag() {
            Some(position) => vec![
                Effect::RenderLayout,
                Effect::Post(SurfaceMessage::SaveSplitPosition { position }),
            ],
            None => Vec::new(),
        }
    }

    pub(crate) fn resize(&mut self, container_height: u32) -> Vec<Effect> {
        self.layout.set_container_height(container_height);
        vec![Effect::RenderLayout]
    }
}
