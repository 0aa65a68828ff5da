use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// UTF-8 safe preview: the first `max_chars` characters, with "..." appended
/// only when something was cut.
pub(crate) fn preview(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &s[..end]),
        None => s.to_string(),
    }
}

/// Character count as shown to the user: Unicode scalar values, so IME text
/// counts characters rather than bytes.
pub(crate) fn char_count(s: &str) -> usize {
    s.chars().count()
}

/// OSC 52 escape that asks the hosting terminal to put `text` on the system
/// clipboard. Inside tmux the sequence is wrapped in a DCS passthrough.
pub(crate) fn osc52_copy(text: &str, inside_tmux: bool) -> String {
    let payload = STANDARD.encode(text.as_bytes());
    let osc = format!("\x1b]52;c;{payload}\x07");
    if inside_tmux {
        format!("\x1bPtmux;{}\x1b\\", osc.replace('\x1b', "\x1b\x1b"))
    } else {
        osc
    }
}
