//! Text rendering of the panel for a line-oriented console.

use std::fmt::Write;

use crate::state::{HISTORY_LIMIT, HistoryEntry};
use crate::surface::{ComposePhase, Surface};
use crate::surface::layout::SplitLayout;
use crate::util;

const RULE_WIDTH: usize = 48;
const HISTORY_PREVIEW_CHARS: usize = 60;

fn rule(title: &str) -> String {
    let used = util::char_count(title) + 4;
    format!("\u{2500}\u{2500} {title} {}", "\u{2500}".repeat(RULE_WIDTH.saturating_sub(used)))
}

/// History list, newest first, numbered for `/recall`.
pub(crate) fn history(entries: &[HistoryEntry]) -> String {
    let mut out = rule(&format!("Input History (max {HISTORY_LIMIT})"));
    out.push('\n');
    if entries.is_empty() {
        out.push_str("  No history yet\n");
        return out;
    }
    for (i, entry) in entries.iter().enumerate() {
        // Multi-line entries are shown on one line.
        let flat = entry.text.replace('\n', " \u{21b5} ");
        let _ = writeln!(
            out,
            "{:>3}  {}  {}",
            i + 1,
            entry.timestamp,
            util::preview(&flat, HISTORY_PREVIEW_CHARS)
        );
    }
    out
}

/// Current draft plus the character counter.
pub(crate) fn draft(surface: &Surface) -> String {
    let mut out = rule("Draft");
    out.push('\n');
    if surface.draft().is_empty() {
        out.push_str("  (empty)\n");
    } else {
        for line in surface.draft().lines() {
            let _ = writeln!(out, "  {line}");
        }
    }
    let count = surface.char_count();
    let _ = writeln!(
        out,
        "{:>width$}",
        format!("{count} character{}", if count == 1 { "" } else { "s" }),
        width = RULE_WIDTH
    );
    out
}

pub(crate) fn layout(layout: &SplitLayout) -> String {
    let mut out = format!(
        "split: input {} / {} (min {}, max {})",
        layout.height(),
        layout.container_height(),
        layout.minimum(),
        layout.maximum()
    );
    // A preference from a taller container is kept but not fully shown.
    if let Some(saved) = layout.position().filter(|&p| p != layout.height()) {
        let _ = write!(out, ", saved {saved}");
    }
    out
}

pub(crate) fn prompt(surface: &Surface) -> &'static str {
    match surface.phase() {
        ComposePhase::Idle => "\u{270e} ",
        ComposePhase::Composing => "\u{270e}+ ",
        ComposePhase::Dispatching => "\u{23f3} ",
    }
}

pub(crate) fn help() -> &'static str {
    "\
Type lines to build the draft. Commands:
  /send         send draft to the terminal (Ctrl+Enter)
  /enter        press Enter in the terminal
  /clear        clear the draft (Ctrl+K)
  /copy         copy the draft to the clipboard
  /history      show history
  /recall N     load history entry N into the draft
  /forget       clear all history (asks first)
  /split +N|-N  grow or shrink the input area
  /height N     set the panel height
  /show         show the draft
  //text        add a line starting with '/'
  /quit         leave"
}
