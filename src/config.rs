use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::delivery::DeliveryDelays;
use crate::surface::layout::SplitBounds;
use crate::terminal::tmux;

const MAX_DELAY_MS: u64 = 10_000;
const MAX_LAYOUT_UNITS: u32 = 10_000;

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("I/O error reading {path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
}

/// Everything tunable about the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Config {
    pub(crate) delays: DeliveryDelays,
    pub(crate) send_cooldown: Duration,
    pub(crate) split: SplitBounds,
    pub(crate) container_height: u32,
    /// tmux target naming the terminal to deliver into.
    pub(crate) target: String,
    /// tmux paste buffer used as the clipboard.
    pub(crate) buffer: String,
    pub(crate) state_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            delays: DeliveryDelays::default(),
            send_cooldown: Duration::from_millis(1000),
            split: SplitBounds::default(),
            container_height: 600,
            target: tmux::LAST_PANE.to_string(),
            buffer: tmux::DEFAULT_BUFFER.to_string(),
            state_file: None,
        }
    }
}

/// Return the path to the config file.
pub(crate) fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("compose-relay/config.md")
}

/// Read `path`, falling back to defaults when it does not exist.
pub(crate) fn load_config(path: &Path) -> Result<Config, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            tracing::debug!(path = %path.display(), "config loaded");
            Ok(parse_config(&content))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
        Err(error) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            error,
        }),
    }
}

/// Parse the config file.
///
/// Format:
/// ```markdown
/// # delivery
/// - focus-settle-ms: 100
/// - paste-settle-ms: 150
/// - refocus-ms: 500
///
/// # panel
/// - send-cooldown-ms: 1000
/// - split-min: 80
/// - split-reserved-top: 100
/// - split-default: 160
/// - container-height: 600
///
/// # terminal
/// - target: {last}
/// - buffer: compose-relay
///
/// # storage
/// - state-file: ~/.local/state/compose-relay/state.json
/// ```
///
/// Every key is optional. Unknown sections, unknown keys and unparsable
/// values are reported and skipped; numbers are clamped to sane ranges.
pub(crate) fn parse_config(content: &str) -> Config {
    let mut config = Config::default();
    let mut section: Option<String> = None;

    for (lineno, line) in content.lines().enumerate() {
        let trimmed = line.trim();

        if let Some(heading) = trimmed.strip_prefix("# ") {
            section = Some(heading.trim().to_lowercase());
            continue;
        }

        let Some(item) = trimmed.strip_prefix("- ") else {
            continue;
        };
        let Some((key, value)) = item.split_once(':') else {
            tracing::warn!(line = lineno + 1, "config: expected `- key: value`");
            continue;
        };
        let (key, value) = (key.trim(), value.trim());

        let applied = match section.as_deref() {
            Some("delivery") => apply_delivery(&mut config, key, value),
            Some("panel") => apply_panel(&mut config, key, value),
            Some("terminal") => apply_terminal(&mut config, key, value),
            Some("storage") => apply_storage(&mut config, key, value),
            _ => Err(format!("`{key}` outside a known section")),
        };
        if let Err(reason) = applied {
            tracing::warn!(line = lineno + 1, "config: {reason}");
        }
    }

    config
}

fn millis(key: &str, value: &str) -> Result<Duration, String> {
    value
        .parse::<u64>()
        .map(|ms| Duration::from_millis(ms.min(MAX_DELAY_MS)))
        .map_err(|_| format!("`{key}` expects milliseconds, got `{value}`"))
}

fn units(key: &str, value: &str) -> Result<u32, String> {
    value
        .parse::<u32>()
        .map(|n| n.min(MAX_LAYOUT_UNITS))
        .map_err(|_| format!("`{key}` expects a whole number, got `{value}`"))
}

fn apply_delivery(config: &mut Config, key: &str, value: &str) -> Result<(), String> {
    match key {
        "focus-settle-ms" => config.delays.focus_settle = millis(key, value)?,
        "paste-settle-ms" => config.delays.paste_settle = millis(key, value)?,
        "refocus-ms" => config.delays.refocus = millis(key, value)?,
        _ => return Err(format!("unknown delivery key `{key}`")),
    }
    Ok(())
}

fn apply_panel(config: &mut Config, key: &str, value: &str) -> Result<(), String> {
    match key {
        "send-cooldown-ms" => config.send_cooldown = millis(key, value)?,
        "split-min" => config.split.minimum = units(key, value)?,
        "split-reserved-top" => config.split.reserved_top = units(key, value)?,
        "split-default" => config.split.default = units(key, value)?,
        "container-height" => config.container_height = units(key, value)?.max(1),
        _ => return Err(format!("unknown panel key `{key}`")),
    }
    Ok(())
}

fn apply_terminal(config: &mut Config, key: &str, value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("`{key}` needs a value"));
    }
    match key {
        "target" => config.target = value.to_string(),
        "buffer" => config.buffer = value.to_string(),
        _ => return Err(format!("unknown terminal key `{key}`")),
    }
    Ok(())
}

fn apply_storage(config: &mut Config, key: &str, value: &str) -> Result<(), String> {
    match key {
        "state-file" if !value.is_empty() => config.state_file = Some(expand_home(value)),
        "state-file" => return Err("`state-file` needs a value".to_string()),
        _ => return Err(format!("unknown storage key `{key}`")),
    }
    Ok(())
}

fn expand_home(value: &str) -> PathBuf {
    match (value.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_is_all_defaults() {
        assert_eq!(parse_config(""), Config::default());
    }

    #[test]
    fn parse_full_config() {
        let input = r#"
# delivery
- focus-settle-ms: 120
- paste-settle-ms: 200
- refocus-ms: 800

# panel
- send-cooldown-ms: 500
- split-min: 60
- split-reserved-top: 90
- split-default: 180
- container-height: 720

# terminal
- target: work:1.0
- buffer: relay

# storage
- state-file: /var/tmp/relay.json
"#;
        let config = parse_config(input);
        assert_eq!(
            config,
            Config {
                delays: DeliveryDelays {
                    focus_settle: Duration::from_millis(120),
                    paste_settle: Duration::from_millis(200),
                    refocus: Duration::from_millis(800),
                },
                send_cooldown: Duration::from_millis(500),
                split: SplitBounds {
                    minimum: 60,
                    reserved_top: 90,
                    default: 180,
                },
                container_height: 720,
                target: "work:1.0".into(),
                buffer: "relay".into(),
                state_file: Some(PathBuf::from("/var/tmp/relay.json")),
            }
        );
    }

    #[test]
    fn bad_values_are_skipped() {
        let input = r#"
# delivery
- focus-settle-ms: soon
- refocus-ms: 300
- warp-speed: 9

# panel
- split-min: -5
"#;
        let config = parse_config(input);
        assert_eq!(config.delays.focus_settle, Duration::from_millis(100));
        assert_eq!(config.delays.refocus, Duration::from_millis(300));
        assert_eq!(config.split.minimum, 80);
    }

    #[test]
    fn delays_are_clamped() {
        let config = parse_config("# delivery\n- refocus-ms: 999999\n");
        assert_eq!(config.delays.refocus, Duration::from_millis(MAX_DELAY_MS));
    }

    #[test]
    fn keys_outside_sections_are_ignored() {
        let config = parse_config("- target: %9\n# terminal\n- target: %4\n");
        assert_eq!(config.target, "%4");
    }

    #[test]
    fn target_value_may_contain_colons() {
        let config = parse_config("# terminal\n- target: main:2.1\n");
        assert_eq!(config.target, "main:2.1");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.md")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.md");
        std::fs::write(&path, "# panel\n- container-height: 0\n").unwrap();
        assert_eq!(load_config(&path).unwrap().container_height, 1);
    }
}
