//! Tracing subscriber setup.
//!
//! Read from the environment:
//!
//! | Variable     | Meaning                                              |
//! |--------------|------------------------------------------------------|
//! | `LOG_FORMAT` | `json` for structured lines, anything else for text  |
//! | `LOG_FILE`   | write to this file with daily rotation, not stdout   |
//! | `LOG_ANSI`   | force colors on (`true`/`1`) or off                  |
//! | `RUST_LOG`   | env-filter directives                                |

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rumi_core::{Error, Result};

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_LOG_FILTER: &str = "rumi_api=debug,rumi_db=info,tower_http=debug";

const DEFAULT_LOG_FILE_NAME: &str = "rumi-api.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        }
    }
}

/// Logging options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub format: LogFormat,
    pub file: Option<PathBuf>,
    /// `None` means colors on the console and plain text in files.
    pub ansi: Option<bool>,
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            file: None,
            ansi: None,
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let format = match lookup("LOG_FORMAT") {
            Some(value) if value.trim().eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };
        let file = lookup("LOG_FILE")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);
        let ansi = lookup("LOG_ANSI").map(|value| {
            let value = value.trim();
            value.eq_ignore_ascii_case("true") || value == "1"
        });
        let filter = lookup("RUST_LOG")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Self {
            format,
            file,
            ansi,
            filter,
        }
    }

    fn use_ansi(&self) -> bool {
        self.ansi.unwrap_or(self.file.is_none())
    }

    /// Where log lines go, shown at startup.
    pub fn destination(&self) -> String {
        self.file
            .as_ref()
            .map_or_else(|| "(stdout)".to_string(), |path| path.display().to_string())
    }
}

/// Split a log file path into its rotation directory and file name prefix.
fn rotation_target(path: &Path) -> (PathBuf, String) {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(DEFAULT_LOG_FILE_NAME)
        .to_string();
    (dir, name)
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must live until
/// shutdown.
pub fn init_tracing(settings: &LogSettings) -> Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_new(&settings.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let (writer, guard) = match &settings.file {
        Some(path) => {
            let (dir, name) = rotation_target(path);
            let (non_blocking, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, name));
            (BoxMakeWriter::new(non_blocking), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stdout), None),
    };

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match settings.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
            .try_init(),
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(settings.use_ansi())
                    .with_writer(writer),
            )
            .try_init(),
    };
    installed.map_err(|e| Error::Config(format!("cannot install tracing subscriber: {}", e)))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_vars(vars: &[(&str, &str)]) -> LogSettings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LogSettings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = from_vars(&[]);
        assert_eq!(settings, LogSettings::default());
        assert!(settings.use_ansi());
        assert_eq!(settings.destination(), "(stdout)");
    }

    #[test]
    fn test_json_to_file_without_colors() {
        let settings = from_vars(&[
            ("LOG_FORMAT", "JSON"),
            ("LOG_FILE", "/var/log/rumi/api.log"),
            ("RUST_LOG", "warn"),
        ]);
        assert_eq!(settings.format, LogFormat::Json);
        assert_eq!(settings.file, Some(PathBuf::from("/var/log/rumi/api.log")));
        assert_eq!(settings.filter, "warn");
        assert!(!settings.use_ansi());
    }

    #[test]
    fn test_ansi_override_and_unknown_format() {
        let settings = from_vars(&[
            ("LOG_FORMAT", "pretty"),
            ("LOG_FILE", "api.log"),
            ("LOG_ANSI", "1"),
        ]);
        assert_eq!(settings.format, LogFormat::Text);
        assert!(settings.use_ansi());

        assert!(!from_vars(&[("LOG_ANSI", "false")]).use_ansi());
    }

    #[test]
    fn test_rotation_target() {
        assert_eq!(
            rotation_target(Path::new("/var/log/rumi/api.log")),
            (PathBuf::from("/var/log/rumi"), "api.log".to_string())
        );
        assert_eq!(
            rotation_target(Path::new("api.log")),
            (PathBuf::from("."), "api.log".to_string())
        );
    }
}
