//! Console front-end: one Surface rendered as text, wired to an in-process
//! Controller that drives tmux.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::channel::{mpsc, oneshot};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::Config;
use crate::controller::{Controller, Host};
use crate::delivery::TokioTimer;
use crate::host::{ConsoleUi, PromptRequest};
use crate::ipc::SurfaceLink;
use crate::store::{self, FileStore};
use crate::surface::layout::SplitLayout;
use crate::surface::{Effect, Surface};
use crate::terminal::tmux::Tmux;
use crate::views;

/// One parsed line of console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Append(String),
    Send,
    Enter,
    Clear,
    Copy,
    History,
    Recall(usize),
    Forget,
    Split(i32),
    Height(u32),
    Show,
    Help,
    Quit,
    Unknown(String),
}

impl Command {
    pub(crate) fn parse(line: &str) -> Self {
        if let Some(literal) = line.strip_prefix("//") {
            return Command::Append(format!("/{literal}"));
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Command::Append(line.to_string());
        };
        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or("");
        let arg = parts.next();
        match (name, arg) {
            ("send", None) => Command::Send,
            ("enter", None) => Command::Enter,
            ("clear", None) => Command::Clear,
            ("copy", None) => Command::Copy,
            ("history", None) => Command::History,
            ("recall", Some(n)) => match n.parse::<usize>() {
                Ok(n) if n >= 1 => Command::Recall(n - 1),
                _ => Command::Unknown(line.to_string()),
            },
            ("forget", None) => Command::Forget,
            ("split", Some(n)) => match n.parse::<i32>() {
                Ok(delta) => Command::Split(delta),
                Err(_) => Command::Unknown(line.to_string()),
            },
            ("height", Some(n)) => match n.parse::<u32>() {
                Ok(rows) if rows > 0 => Command::Height(rows),
                _ => Command::Unknown(line.to_string()),
            },
            ("show", None) => Command::Show,
            ("help", None) => Command::Help,
            ("quit", None) | ("q", None) => Command::Quit,
            _ => Command::Unknown(line.to_string()),
        }
    }
}

/// Panel state plus its bridge to the Controller.
pub(crate) struct Panel {
    surface: Surface,
    link: SurfaceLink,
    cooldown_tx: mpsc::UnboundedSender<()>,
    cooldown_rx: mpsc::UnboundedReceiver<()>,
    pending_prompt: Option<oneshot::Sender<bool>>,
    /// The input prompt must be drawn before waiting for the next event.
    prompt_due: bool,
    inside_tmux: bool,
}

impl Panel {
    pub(crate) fn new(surface: Surface, link: SurfaceLink, inside_tmux: bool) -> Self {
        let (cooldown_tx, cooldown_rx) = mpsc::unbounded();
        Self {
            surface,
            link,
            cooldown_tx,
            cooldown_rx,
            pending_prompt: None,
            prompt_due: true,
            inside_tmux,
        }
    }

    /// Carry out effects in order. Returns false once the Controller is gone.
    fn perform(&mut self, effects: Vec<Effect>) -> bool {
        for effect in effects {
            match effect {
                Effect::Post(message) => {
                    if !self.link.post(&message) {
                        tracing::error!(kind = message.kind(), "controller unavailable");
                        return false;
                    }
                }
                Effect::RenderDraft => print!("{}", views::draft(&self.surface)),
                Effect::RenderHistory => print!("{}", views::history(self.surface.history())),
                Effect::RenderLayout => println!("{}", views::layout(self.surface.layout())),
                Effect::FocusInput => self.prompt_due = true,
                Effect::CopyToClipboard(text) => {
                    print!("{}", crate::util::osc52_copy(&text, self.inside_tmux));
                    println!("copied {} characters", crate::util::char_count(&text));
                }
                Effect::ScheduleSendCooldown(delay) => self.arm_cooldown(delay),
            }
        }
        true
    }

    fn arm_cooldown(&self, delay: Duration) {
        let tx = self.cooldown_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.unbounded_send(());
        });
    }

    fn show_prompt(&mut self) {
        print!("{}", views::prompt(&self.surface));
        let _ = std::io::stdout().flush();
        self.prompt_due = false;
    }

    fn ask(&mut self, request: PromptRequest) {
        if let Some(earlier) = self.pending_prompt.replace(request.reply) {
            let _ = earlier.send(false);
        }
        print!("{} [y/N] ", request.question);
        let _ = std::io::stdout().flush();
    }

    /// Handle one console line. Returns false to quit.
    fn on_line(&mut self, line: &str) -> bool {
        self.prompt_due = true;
        if let Some(reply) = self.pending_prompt.take() {
            let yes = matches!(line.trim().to_lowercase().as_str(), "y" | "yes");
            let _ = reply.send(yes);
            return true;
        }

        let effects = match Command::parse(line) {
            Command::Append(text) => {
                let draft = if self.surface.draft().is_empty() {
                    text
                } else {
                    format!("{}\n{text}", self.surface.draft())
                };
                let mut effects = self.surface.input(draft);
                // Echoing the whole draft per line is noise; the counter is enough.
                effects.retain(|e| *e != Effect::RenderDraft);
                println!("{} characters", self.surface.char_count());
                effects
            }
            Command::Send => {
                if !self.surface.can_send() {
                    println!("still sending, try again in a moment");
                }
                self.surface.send()
            }
            Command::Enter => self.surface.send_enter(),
            Command::Clear => self.surface.clear(),
            Command::Copy => self.surface.copy(),
            Command::History => vec![Effect::RenderHistory],
            Command::Recall(index) => {
                let effects = self.surface.recall(index);
                if effects.is_empty() {
                    println!("no history entry {}", index + 1);
                }
                effects
            }
            Command::Forget => self.surface.request_clear_history(),
            Command::Split(delta) => {
                // Dragging up by `delta` grows the input region by `delta`.
                let mut effects = self.surface.begin_drag(0);
                effects.extend(self.surface.drag_to(delta.saturating_neg()));
                effects.extend(self.surface.end_drag());
                effects
            }
            Command::Height(height) => self.surface.resize(height),
            Command::Show => vec![Effect::RenderDraft],
            Command::Help => {
                println!("{}", views::help());
                Vec::new()
            }
            Command::Quit => return false,
            Command::Unknown(text) => {
                println!("unknown command: {text} (try /help)");
                Vec::new()
            }
        };
        self.perform(effects)
    }

    /// Run until stdin closes, `/quit`, or the Controller goes away.
    pub(crate) async fn run(mut self, mut prompts: mpsc::UnboundedReceiver<PromptRequest>) {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        let activation = self.surface.activate();
        if !self.perform(activation) {
            return;
        }
        println!("{}", views::help());

        loop {
            if self.prompt_due && self.pending_prompt.is_none() {
                self.show_prompt();
            }
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        if !self.on_line(&line) {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!("stdin: {e}");
                        break;
                    }
                },
                pushed = self.link.inbound.next() => match pushed {
                    Some(line) => match SurfaceLink::decode(&line) {
                        Ok(message) => {
                            println!();
                            self.prompt_due = true;
                            let effects = self.surface.apply(message);
                            if !self.perform(effects) {
                                break;
                            }
                        }
                        Err(e) => tracing::warn!("ignoring controller message: {e}"),
                    },
                    None => break,
                },
                Some(request) = prompts.next() => {
                    println!();
                    self.ask(request);
                }
                Some(()) = self.cooldown_rx.next() => {
                    let effects = self.surface.send_cooldown_elapsed();
                    self.perform(effects);
                }
            }
        }
    }
}

/// Wire store, tmux and console host into a Controller, attach one panel and
/// run it.
pub(crate) async fn run(config: Config) {
    let state_path = config
        .state_file
        .clone()
        .unwrap_or_else(store::default_state_path);
    let store = Arc::new(FileStore::new(state_path));
    tracing::info!(path = %store.path().display(), "state store");

    let inside_tmux = Tmux::inside_tmux();
    if !inside_tmux {
        tracing::warn!("not running inside tmux; deliveries will fail until a tmux pane is active");
    }
    let tmux = Arc::new(Tmux::new(config.target.clone(), config.buffer.clone()));

    let (prompt_tx, prompt_rx) = mpsc::unbounded();
    let ui = Arc::new(ConsoleUi::new(prompt_tx, Some(tmux.clone())));

    let host = Host {
        store,
        terminal: tmux,
        ui,
        timer: Arc::new(TokioTimer),
    };
    let (controller, inbox) = Controller::new(host, config.delays);
    tokio::spawn(controller.clone().serve(inbox));

    let link = controller.attach();
    let id = link.id;
    let layout = SplitLayout::new(config.split, config.container_height);
    let panel = Panel::new(Surface::new(layout, config.send_cooldown), link, inside_tmux);

    tracing::info!(surface = %id, "panel ready");
    panel.run(prompt_rx).await;
    controller.detach(id);
    tracing::info!(surface = %id, "panel closed");
}
