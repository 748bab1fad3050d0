use crate::errors::DbError;
use log::LevelFilter;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::append::rolling_file::policy::compound::{
    CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
};
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Target for per-mutation audit lines.
pub const AUDIT_TARGET: &str = "bookshelf::audit";
/// Target for per-query timing lines.
pub const METRICS_TARGET: &str = "bookshelf::metrics";

const ROLL_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {t} - {m}{n}";

static HANDLE: OnceLock<log4rs::Handle> = OnceLock::new();

/// Map a textual level to a filter; unknown values fall back to `info`.
#[must_use]
pub fn parse_level(level: &str) -> LevelFilter {
    match level.to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

fn rolling(base: &Path, stem: &str, keep: u32) -> Result<RollingFileAppender, DbError> {
    let pattern = format!("{}", base.join(format!("{stem}.{{}}.log")).display());
    let roller = FixedWindowRoller::builder()
        .build(&pattern, keep)
        .map_err(|e| DbError::LoggerError(e.to_string()))?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(ROLL_SIZE_BYTES)), Box::new(roller));
    RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build(base.join(format!("{stem}.log")), Box::new(policy))
        .map_err(DbError::Io)
}

/// Build the rolling-file configuration: `app.log` for the root logger, `audit.log` and
/// `metrics.log` for their dedicated targets.
///
/// # Errors
/// Returns an error if the directory cannot be created or an appender fails to build.
pub fn build_config(base: &Path, level: LevelFilter, retention: usize) -> Result<Config, DbError> {
    std::fs::create_dir_all(base)?;
    let keep = u32::try_from(retention).unwrap_or(u32::MAX);
    let config = Config::builder()
        .appender(Appender::builder().build("app", Box::new(rolling(base, "app", keep)?)))
        .appender(Appender::builder().build("audit", Box::new(rolling(base, "audit", keep)?)))
        .appender(Appender::builder().build("metrics", Box::new(rolling(base, "metrics", keep)?)))
        .logger(Logger::builder().appender("audit").additive(false).build(AUDIT_TARGET, level))
        .logger(Logger::builder().appender("metrics").additive(false).build(METRICS_TARGET, level))
        .build(Root::builder().appender("app").build(level))
        .map_err(|e| DbError::LoggerError(e.to_string()))?;
    Ok(config)
}

/// Configure logging globally for the process. If log4rs is already initialized, this replaces
/// the config.
/// - dir: base directory for logs; if None, current directory.
/// - level: off|error|warn|info|debug|trace
/// - retention: number of rolled files to keep (default 7)
///
/// # Errors
/// Returns an error if the log directory or appenders cannot be created, or if another logger
/// implementation already owns the global logger.
pub fn configure_logging(
    dir: Option<&Path>,
    level: Option<&str>,
    retention: Option<usize>,
) -> Result<(), DbError> {
    let base = dir
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    let config = build_config(&base, parse_level(level.unwrap_or("info")), retention.unwrap_or(7))?;
    if let Some(handle) = HANDLE.get() {
        handle.set_config(config);
        return Ok(());
    }
    let handle = log4rs::init_config(config).map_err(|e| DbError::LoggerError(e.to_string()))?;
    let _ = HANDLE.set(handle);
    Ok(())
}

/// Configure logging from environment variables if present:
/// - `BOOKSHELF_LOG_DIR`
/// - `BOOKSHELF_LOG_LEVEL`
/// - `BOOKSHELF_LOG_RETENTION`
///
/// # Errors
/// See [`configure_logging`].
pub fn configure_from_env() -> Result<(), DbError> {
    let dir = std::env::var("BOOKSHELF_LOG_DIR").ok().map(PathBuf::from);
    let level = std::env::var("BOOKSHELF_LOG_LEVEL").ok();
    let retention =
        std::env::var("BOOKSHELF_LOG_RETENTION").ok().and_then(|s| s.parse::<usize>().ok());
    configure_logging(dir.as_deref(), level.as_deref(), retention)
}
