//! Logging bootstrap for the governor node.
//!
//! # Responsibility
//! - Initialize the `log` backend exactly once per process.
//! - Route records to rolling files when a directory is given, else stderr.
//!
//! # Invariants
//! - Init is idempotent for identical settings.
//! - Re-initialization with a different level or destination is rejected.
//! - Initialization never panics.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "governor";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;
const MAX_PANIC_PAYLOAD_CHARS: usize = 160;

static LOGGING_STATE: OnceCell<LoggingState> = OnceCell::new();
static PANIC_HOOK_INSTALLED: OnceCell<()> = OnceCell::new();

struct LoggingState {
    level: &'static str,
    log_dir: Option<PathBuf>,
    _logger: LoggerHandle,
}

/// Initializes logging at `level`, writing to `log_dir` or stderr.
///
/// # Errors
/// - Returns an error when `level` is unsupported.
/// - Returns an error when `log_dir` is relative or cannot be created.
/// - Returns an error when logging is already active with other settings.
pub fn init_logging(level: &str, log_dir: Option<&Path>) -> Result<(), String> {
    let level = normalize_level(level)?;
    let log_dir = log_dir.map(normalize_log_dir).transpose()?;

    let state = LOGGING_STATE.get_or_try_init(|| start_logger(level, log_dir.clone()))?;

    if state.log_dir != log_dir {
        return Err(format!(
            "logging already initialized at `{}`; refusing to switch to `{}`",
            describe_destination(state.log_dir.as_deref()),
            describe_destination(log_dir.as_deref())
        ));
    }
    if state.level != level {
        return Err(format!(
            "logging already initialized with level `{}`; refusing to switch to `{}`",
            state.level, level
        ));
    }
    Ok(())
}

/// Returns `(level, log_dir)` of active logging, or `None` before init.
pub fn logging_status() -> Option<(&'static str, Option<PathBuf>)> {
    LOGGING_STATE
        .get()
        .map(|state| (state.level, state.log_dir.clone()))
}

/// Default level for the current build mode: `debug` or `info`.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start_logger(level: &'static str, log_dir: Option<PathBuf>) -> Result<LoggingState, String> {
    let logger = Logger::try_with_str(level)
        .map_err(|err| format!("invalid log level `{level}`: {err}"))?;

    let logger = match log_dir.as_deref() {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|err| {
                format!("failed to create log directory `{}`: {err}", dir.display())
            })?;
            logger
                .log_to_file(FileSpec::default().directory(dir).basename(LOG_FILE_BASENAME))
                .rotate(
                    Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(MAX_LOG_FILES),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .append()
                .format_for_files(flexi_logger::detailed_format)
        }
        None => logger
            .log_to_stderr()
            .format_for_stderr(flexi_logger::detailed_format),
    };

    let handle = logger
        .start()
        .map_err(|err| format!("failed to start logger: {err}"))?;

    install_panic_hook_once();

    info!(
        "event=logging_init module=logging status=ok level={} destination={} version={}",
        level,
        describe_destination(log_dir.as_deref()),
        env!("CARGO_PKG_VERSION")
    );

    Ok(LoggingState {
        level,
        log_dir,
        _logger: handle,
    })
}

fn describe_destination(log_dir: Option<&Path>) -> String {
    match log_dir {
        Some(dir) => dir.display().to_string(),
        None => "stderr".to_string(),
    }
}

fn normalize_level(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(format!(
            "unsupported log level `{other}`; expected trace|debug|info|warn|error"
        )),
    }
}

fn normalize_log_dir(log_dir: &Path) -> Result<PathBuf, String> {
    if log_dir.as_os_str().is_empty() {
        return Err("log_dir cannot be empty".to_string());
    }
    if !log_dir.is_absolute() {
        return Err(format!(
            "log_dir must be an absolute path, got `{}`",
            log_dir.display()
        ));
    }
    Ok(log_dir.to_path_buf())
}

fn install_panic_hook_once() {
    PANIC_HOOK_INSTALLED.get_or_init(|| {
        let previous_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            let location = panic_info
                .location()
                .map_or_else(
                    || "unknown".to_string(),
                    |loc| format!("{}:{}", loc.file(), loc.line()),
                );
            let payload = panic_info
                .payload()
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| panic_info.payload().downcast_ref::<String>().map(String::as_str))
                .unwrap_or("non-string panic payload");
            error!(
                "event=panic module=logging status=error location={} payload={}",
                location,
                single_line(payload, MAX_PANIC_PAYLOAD_CHARS)
            );
            previous_hook(panic_info);
        }));
    });
}

/// Folds `value` onto one line and caps it at `max_chars` characters.
fn single_line(value: &str, max_chars: usize) -> String {
    let mut chars = value.chars().map(|c| if c == '\n' || c == '\r' { ' ' } else { c });
    let mut line: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        line.push_str("...");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::{init_logging, logging_status, normalize_level, normalize_log_dir, single_line};
    use std::path::Path;

    #[test]
    fn levels_are_case_insensitive_and_accept_warning() {
        assert_eq!(normalize_level(" DEBUG "), Ok("debug"));
        assert_eq!(normalize_level("Warning"), Ok("warn"));
        assert!(normalize_level("loud").is_err());
    }

    #[test]
    fn log_dir_must_be_absolute_and_non_empty() {
        assert!(normalize_log_dir(Path::new("")).is_err());
        let err = normalize_log_dir(Path::new("var/log/governor")).unwrap_err();
        assert!(err.contains("absolute"), "{err}");
    }

    #[test]
    fn single_line_folds_breaks_and_caps_length() {
        assert_eq!(single_line("a\nb\rc", 10), "a b c");
        assert_eq!(single_line("abcdef", 4), "abcd...");
        assert_eq!(single_line("abcd", 4), "abcd");
    }

    #[test]
    fn repeated_init_must_match_first_settings() {
        let dir = tempfile::tempdir().unwrap();
        init_logging("warn", Some(dir.path())).unwrap();
        init_logging("WARNING", Some(dir.path())).unwrap();

        let err = init_logging("trace", Some(dir.path())).unwrap_err();
        assert!(err.contains("level"), "{err}");
        let err = init_logging("warn", None).unwrap_err();
        assert!(err.contains("stderr"), "{err}");

        assert_eq!(
            logging_status(),
            Some(("warn", Some(dir.path().to_path_buf())))
        );
    }
}
