//! Logging for rulecheck
//!
//! Leveled logging macros whose output is controlled entirely through
//! environment variables, so validators can be instrumented without pulling a
//! subscriber into every binary that uses them.
//!
//! # Usage
//!
//! ```rust
//! use rulecheck_log::{debug, info, warn, error, trace};
//!
//! debug!("Registering rule set");
//! info!("Validator built with {} fields", 3);
//! warn!("Guard skipped every rule");
//! error!("Predicate failed");
//!
//! let field = "Title";
//! debug!(target: "rulecheck::validator", "Evaluating field {}", field);
//! ```
//!
//! # Environment Variables
//!
//! - `RULECHECK_DEBUG=1` - Enable debug logging
//! - `RULECHECK_LOG_LEVEL=trace|debug|info|warn|error|off` - Minimum level
//! - `RULECHECK_LOG_FORMAT=pretty|compact|json` - Output format
//! - `RULECHECK_LOG_SINK=stderr|log` - Write to stderr or forward to the `log` facade
//! - `RULECHECK_LOG_COLOR=1|0` - Enable/disable colors
//! - `RULECHECK_LOG_TIMESTAMPS=1|0` - Prefix lines with a timestamp
//! - `RULECHECK_LOG_MODULE=1|0` - Include the target/module path

use once_cell::sync::Lazy;
use std::env;
use std::io::{IsTerminal, Write};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

// ============================================================================
// Log Levels
// ============================================================================

/// Log level, ordered from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    /// Trace level (most verbose)
    Trace = 0,
    /// Debug level
    Debug = 1,
    /// Info level
    Info = 2,
    /// Warning level
    Warn = 3,
    /// Error level (least verbose)
    Error = 4,
    /// Off (no logging)
    Off = 5,
}

impl Level {
    /// Parse a level name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "off" | "none" => Some(Level::Off),
            _ => None,
        }
    }

    /// Upper-case level name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Off => "OFF",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Level::Trace,
            1 => Level::Debug,
            2 => Level::Info,
            3 => Level::Warn,
            4 => Level::Error,
            _ => Level::Off,
        }
    }

    /// Matching `log` crate level; `None` for [`Level::Off`].
    pub fn to_log_level(self) -> Option<log::Level> {
        match self {
            Level::Trace => Some(log::Level::Trace),
            Level::Debug => Some(log::Level::Debug),
            Level::Info => Some(log::Level::Info),
            Level::Warn => Some(log::Level::Warn),
            Level::Error => Some(log::Level::Error),
            Level::Off => None,
        }
    }

    #[cfg(feature = "color")]
    fn colored(&self) -> colored::ColoredString {
        use colored::Colorize;
        match self {
            Level::Trace => "TRACE".magenta(),
            Level::Debug => "DEBUG".blue(),
            Level::Info => "INFO".green(),
            Level::Warn => "WARN".yellow(),
            Level::Error => "ERROR".red().bold(),
            Level::Off => "OFF".white(),
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Output Configuration
// ============================================================================

/// Line format for stderr output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Timestamp, padded level, bracketed target
    Pretty,
    /// Short time and a one-letter level
    Compact,
    /// One JSON object per line
    Json,
}

impl Format {
    /// Parse a format name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Some(Format::Pretty),
            "compact" => Some(Format::Compact),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sink {
    /// Formatted lines on stderr
    Stderr,
    /// Records handed to whatever `log` implementation the host installed
    LogFacade,
}

impl Sink {
    /// Parse a sink name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "stderr" => Some(Sink::Stderr),
            "log" | "facade" => Some(Sink::LogFacade),
            _ => None,
        }
    }
}

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

static LOG_LEVEL: AtomicU8 = AtomicU8::new(Level::Warn as u8);

static CONFIG: Lazy<LogConfig> = Lazy::new(|| {
    let config = LogConfig::from_env();
    DEBUG_ENABLED.store(config.debug, Ordering::SeqCst);
    LOG_LEVEL.store(config.level as u8, Ordering::SeqCst);
    config
});

/// Logging configuration, read once from the environment.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub debug: bool,
    pub level: Level,
    pub format: Format,
    pub sink: Sink,
    pub color: bool,
    pub timestamps: bool,
    pub module_path: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Warn,
            format: Format::Pretty,
            sink: Sink::Stderr,
            color: false,
            timestamps: true,
            module_path: true,
        }
    }
}

fn env_flag(key: &str) -> Option<bool> {
    env::var(key)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

impl LogConfig {
    /// Build a config from `RULECHECK_*` environment variables.
    ///
    /// A library should stay quiet by default, so the fallback level is
    /// `warn` unless `RULECHECK_DEBUG` is set.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let debug = env_flag("RULECHECK_DEBUG").unwrap_or(false);

        let level = env::var("RULECHECK_LOG_LEVEL")
            .ok()
            .and_then(|s| Level::parse(&s))
            .unwrap_or(if debug { Level::Debug } else { defaults.level });

        let format = env::var("RULECHECK_LOG_FORMAT")
            .ok()
            .and_then(|s| Format::parse(&s))
            .unwrap_or(defaults.format);

        let sink = env::var("RULECHECK_LOG_SINK")
            .ok()
            .and_then(|s| Sink::parse(&s))
            .unwrap_or(defaults.sink);

        let color = env_flag("RULECHECK_LOG_COLOR").unwrap_or_else(|| {
            env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal()
        });

        Self {
            debug,
            level,
            format,
            sink,
            color,
            timestamps: env_flag("RULECHECK_LOG_TIMESTAMPS").unwrap_or(defaults.timestamps),
            module_path: env_flag("RULECHECK_LOG_MODULE").unwrap_or(defaults.module_path),
        }
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Force the environment to be read now instead of on the first log call.
pub fn init() {
    Lazy::force(&CONFIG);
}

/// Whether `RULECHECK_DEBUG` (or [`set_debug`]) turned debug output on.
#[inline]
pub fn is_debug_enabled() -> bool {
    Lazy::force(&CONFIG);
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

/// Whether messages at `level` would be emitted.
#[inline]
pub fn is_level_enabled(level: Level) -> bool {
    Lazy::force(&CONFIG);
    level != Level::Off && level as u8 >= LOG_LEVEL.load(Ordering::Relaxed)
}

/// Current minimum level.
pub fn current_level() -> Level {
    Lazy::force(&CONFIG);
    Level::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

/// Change the minimum level at runtime.
pub fn set_level(level: Level) {
    Lazy::force(&CONFIG);
    LOG_LEVEL.store(level as u8, Ordering::SeqCst);
}

/// Toggle debug mode at runtime. Enabling it lowers the level to `debug`.
pub fn set_debug(enabled: bool) {
    Lazy::force(&CONFIG);
    DEBUG_ENABLED.store(enabled, Ordering::SeqCst);
    if enabled && current_level() > Level::Debug {
        set_level(Level::Debug);
    }
}

/// The configuration read from the environment.
pub fn config() -> &'static LogConfig {
    &CONFIG
}

// ============================================================================
// Log Output
// ============================================================================

/// Emit one message. Called by the macros; not meant to be used directly.
#[doc(hidden)]
pub fn log(level: Level, target: &str, message: &str) {
    if !is_level_enabled(level) {
        return;
    }

    let config = config();

    match config.sink {
        Sink::LogFacade => forward(level, target, message),
        Sink::Stderr => {
            let line = render(level, target, message, config);
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
        }
    }
}

fn forward(level: Level, target: &str, message: &str) {
    if let Some(level) = level.to_log_level() {
        log::log!(target: target, level, "{}", message);
    }
}

/// One stderr line in the configured format, without the newline.
fn render(level: Level, target: &str, message: &str, config: &LogConfig) -> String {
    match config.format {
        Format::Pretty => render_pretty(level, target, message, config),
        Format::Compact => render_compact(level, target, message, config),
        Format::Json => render_json(level, target, message),
    }
}

fn level_label(level: Level, color: bool) -> String {
    #[cfg(feature = "color")]
    if color {
        return format!("{:5}", level.colored());
    }

    let _ = color;
    format!("{:5}", level.as_str())
}

fn render_pretty(level: Level, target: &str, message: &str, config: &LogConfig) -> String {
    use std::fmt::Write as _;

    let mut line = String::new();

    if config.timestamps {
        let _ = write!(line, "{} ", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"));
    }

    let _ = write!(line, "{} ", level_label(level, config.color));

    if config.module_path && !target.is_empty() {
        let _ = write!(line, "[{}] ", target);
    }

    line.push_str(message);
    line
}

fn render_compact(level: Level, target: &str, message: &str, config: &LogConfig) -> String {
    use std::fmt::Write as _;

    let mut line = String::new();

    if config.timestamps {
        let _ = write!(line, "{} ", chrono::Local::now().format("%H:%M:%S"));
    }

    line.push(level.as_str().chars().next().unwrap_or('?'));
    line.push(' ');

    if config.module_path && !target.is_empty() {
        let _ = write!(line, "{}: ", target);
    }

    line.push_str(message);
    line
}

#[cfg(feature = "json")]
fn render_json(level: Level, target: &str, message: &str) -> String {
    use serde::Serialize;

    #[derive(Serialize)]
    struct LogEntry<'a> {
        timestamp: String,
        level: &'a str,
        target: &'a str,
        message: &'a str,
    }

    let entry = LogEntry {
        timestamp: chrono::Utc::now().to_rfc3339(),
        level: level.as_str(),
        target,
        message,
    };

    serde_json::to_string(&entry).unwrap_or_default()
}

// Without serde the JSON line is assembled by hand.
#[cfg(not(feature = "json"))]
fn render_json(level: Level, target: &str, message: &str) -> String {
    format!(
        r#"{{"timestamp":"{}","level":"{}","target":"{}","message":"{}"}}"#,
        chrono::Utc::now().to_rfc3339(),
        level.as_str(),
        escape_json(target),
        escape_json(message)
    )
}

#[cfg(not(feature = "json"))]
fn escape_json(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            c if c.is_control() => result.push_str(&format!("\\u{:04x}", c as u32)),
            c => result.push(c),
        }
    }
    result
}

// ============================================================================
// Macros
// ============================================================================

/// Log a trace message.
#[macro_export]
macro_rules! trace {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Trace) {
            $crate::log($crate::Level::Trace, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Trace) {
            $crate::log($crate::Level::Trace, module_path!(), &format!($($arg)+));
        }
    };
}

/// Log a debug message.
///
/// Emitted when `RULECHECK_DEBUG=1` or `RULECHECK_LOG_LEVEL` is `debug` or lower.
///
/// ```rust
/// use rulecheck_log::debug;
///
/// let field = "Title";
/// debug!("Registered rule set for {}", field);
/// debug!(target: "rulecheck::builder", "{} rules", 2);
/// ```
#[macro_export]
macro_rules! debug {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::is_debug_enabled() || $crate::is_level_enabled($crate::Level::Debug) {
            $crate::log($crate::Level::Debug, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        if $crate::is_debug_enabled() || $crate::is_level_enabled($crate::Level::Debug) {
            $crate::log($crate::Level::Debug, module_path!(), &format!($($arg)+));
        }
    };
}

/// Log an info message.
#[macro_export]
macro_rules! info {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Info) {
            $crate::log($crate::Level::Info, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Info) {
            $crate::log($crate::Level::Info, module_path!(), &format!($($arg)+));
        }
    };
}

/// Log a warning message.
#[macro_export]
macro_rules! warn {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Warn) {
            $crate::log($crate::Level::Warn, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Warn) {
            $crate::log($crate::Level::Warn, module_path!(), &format!($($arg)+));
        }
    };
}

/// Log an error message.
#[macro_export]
macro_rules! error {
    (target: $target:expr, $($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Error) {
            $crate::log($crate::Level::Error, $target, &format!($($arg)+));
        }
    };
    ($($arg:tt)+) => {
        if $crate::is_level_enabled($crate::Level::Error) {
            $crate::log($crate::Level::Error, module_path!(), &format!($($arg)+));
        }
    };
}

// ============================================================================
// Tracing Integration
// ============================================================================

#[cfg(feature = "tracing")]
pub mod tracing_compat {
    //! Bridge to `tracing` for applications that already run a subscriber.

    use super::{Level, LogConfig, config};
    use tracing::level_filters::LevelFilter;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    impl From<Level> for LevelFilter {
        fn from(level: Level) -> Self {
            match level {
                Level::Trace => LevelFilter::TRACE,
                Level::Debug => LevelFilter::DEBUG,
                Level::Info => LevelFilter::INFO,
                Level::Warn => LevelFilter::WARN,
                Level::Error => LevelFilter::ERROR,
                Level::Off => LevelFilter::OFF,
            }
        }
    }

    /// Subscriber filtered at `config.level`. `RUST_LOG`, when set, takes precedence.
    pub fn subscriber_for(config: &LogConfig) -> impl tracing::Subscriber + Send + Sync + use<> {
        let filter = EnvFilter::builder()
            .with_default_directive(LevelFilter::from(config.level).into())
            .from_env_lossy();

        tracing_subscriber::registry().with(filter).with(
            fmt::layer()
                .with_ansi(config.color)
                .with_target(config.module_path),
        )
    }

    /// Subscriber for the environment configuration.
    pub fn subscriber() -> impl tracing::Subscriber + Send + Sync + use<> {
        subscriber_for(config())
    }

    /// Install [`subscriber`] as the process-wide default.
    pub fn install() -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
        tracing::subscriber::set_global_default(subscriber())
    }
}
