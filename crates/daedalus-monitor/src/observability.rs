use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

const ENABLED_VAR: &str = "DAEDALUS_OBSERVABILITY_ENABLED";
const LEVEL_VAR: &str = "DAEDALUS_LOG_LEVEL";
const JSON_PATH_VAR: &str = "DAEDALUS_JSON_LOG_PATH";
const DEFAULT_LOG_FILE: &str = "daedalus.logs.jsonl";

static INIT: OnceCell<()> = OnceCell::new();

/// Destination for log records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    /// Compact lines on stderr.
    Console,
    /// JSON lines appended to a file.
    JsonFile(PathBuf),
}

/// Logging settings, usually resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub enabled: bool,
    /// `EnvFilter` directive, e.g. `info` or `daedalus_monitor=debug`.
    pub filter: String,
    pub output: LogOutput,
}

impl LogSettings {
    /// Reads the settings from the process environment.
    ///
    /// - `DAEDALUS_OBSERVABILITY_ENABLED`: on/off flag, enabled when unset.
    /// - `DAEDALUS_LOG_LEVEL`, then `RUST_LOG`: filter directive; the first
    ///   one that parses wins, otherwise `default_level`.
    /// - `DAEDALUS_JSON_LOG_PATH`: write JSONL to this file instead of stderr.
    pub fn from_env(default_level: &str) -> Self {
        Self::resolve(|key| std::env::var(key).ok(), default_level)
    }

    fn resolve(lookup: impl Fn(&str) -> Option<String>, default_level: &str) -> Self {
        let enabled = lookup(ENABLED_VAR)
            .and_then(|value| parse_flag(&value))
            .unwrap_or(true);
        let filter = [LEVEL_VAR, "RUST_LOG"]
            .into_iter()
            .filter_map(|key| lookup(key))
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty() && EnvFilter::try_new(value).is_ok())
            .unwrap_or_else(|| default_level.to_string());
        let output = lookup(JSON_PATH_VAR)
            .filter(|path| !path.trim().is_empty())
            .map(|path| LogOutput::JsonFile(PathBuf::from(path)))
            .unwrap_or(LogOutput::Console);
        Self {
            enabled,
            filter,
            output,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

/// Splits a log file path into the directory to create and the file name.
fn split_log_path(path: &Path) -> (PathBuf, String) {
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(DEFAULT_LOG_FILE)
        .to_string();
    (dir, file)
}

/// Installs the global subscriber from environment settings, once per
/// process. `default_level` applies when no filter variable parses.
pub fn init_observability(default_level: &str) {
    init_with(LogSettings::from_env(default_level));
}

/// Installs the global subscriber from explicit settings. Later calls, and
/// calls after another subscriber was installed, do nothing.
pub fn init_with(settings: LogSettings) {
    INIT.get_or_init(|| {
        if !settings.enabled {
            return;
        }
        let filter = EnvFilter::try_new(&settings.filter).unwrap_or_else(|_| EnvFilter::new("info"));
        let registry = tracing_subscriber::registry().with(filter);
        let _ = match &settings.output {
            LogOutput::Console => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_target(false)
                        .with_writer(std::io::stderr),
                )
                .try_init(),
            LogOutput::JsonFile(path) => {
                let (dir, file) = split_log_path(path);
                let _ = std::fs::create_dir_all(&dir);
                registry
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_current_span(true)
                            .with_span_list(true)
                            .with_target(false)
                            .with_writer(tracing_appender::rolling::never(dir, file)),
                    )
                    .try_init()
            }
        };
    });
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn resolve(vars: &[(&str, &str)], default_level: &str) -> LogSettings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LogSettings::resolve(|key| vars.get(key).cloned(), default_level)
    }

    #[test]
    fn defaults_to_console_at_given_level() {
        assert_eq!(
            resolve(&[], "warn"),
            LogSettings {
                enabled: true,
                filter: "warn".into(),
                output: LogOutput::Console,
            }
        );
    }

    #[test]
    fn level_var_wins_over_rust_log() {
        let settings = resolve(&[(LEVEL_VAR, "debug"), ("RUST_LOG", "trace")], "info");
        assert_eq!(settings.filter, "debug");
        let settings = resolve(&[(LEVEL_VAR, "daedalus=loud"), ("RUST_LOG", "trace")], "info");
        assert_eq!(settings.filter, "trace");
        let settings = resolve(&[(LEVEL_VAR, "  ")], "info");
        assert_eq!(settings.filter, "info");
    }

    #[test]
    fn flag_and_json_path() {
        let settings = resolve(
            &[(ENABLED_VAR, " Off "), (JSON_PATH_VAR, "logs/run.jsonl")],
            "info",
        );
        assert!(!settings.enabled);
        assert_eq!(settings.output, LogOutput::JsonFile(PathBuf::from("logs/run.jsonl")));
        assert!(resolve(&[(ENABLED_VAR, "maybe")], "info").enabled);
    }

    #[test]
    fn log_path_split() {
        assert_eq!(
            split_log_path(Path::new("logs/run.jsonl")),
            (PathBuf::from("logs"), "run.jsonl".to_string())
        );
        assert_eq!(
            split_log_path(Path::new("run.jsonl")),
            (PathBuf::from("."), "run.jsonl".to_string())
        );
    }
}
