//! Shopino Gate logging setup
//!
//! Library crates log through `tracing`. This crate turns the
//! `SHOPINO_*` logging variables into a `tracing_subscriber` stack that
//! writes to stderr.
//!
//! # Usage
//!
//! ```rust
//! shopino_log::init();
//! tracing::info!(topic = "order.created", "webhook accepted");
//! ```
//!
//! # Environment Variables
//!
//! - `SHOPINO_DEBUG=1` - Enable debug logging
//! - `SHOPINO_LOG_LEVEL=trace|debug|info|warn|error|off` - Set log level
//! - `SHOPINO_LOG_FORMAT=pretty|json|compact` - Set output format
//! - `SHOPINO_LOG_COLOR=1|0` - Enable/disable colors
//! - `SHOPINO_LOG_TIMESTAMPS=1|0` - Include timestamps
//! - `RUST_LOG` - Overrides the level with a full filter directive

use once_cell::sync::OnceCell;
use std::env;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

// ============================================================================
// Log Levels
// ============================================================================

/// Minimum level to emit.
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
    /// Get level from string.
    pub fn from_str(s: &str) -> Option<Self> {
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

    /// Filter directive understood by `EnvFilter`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Off => "off",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_directive().to_uppercase())
    }
}

// ============================================================================
// Log Format
// ============================================================================

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Multi-line human readable output
    Pretty,
    /// Compact single-line format
    Compact,
    /// JSON format for structured logging
    Json,
}

impl Format {
    /// Get format from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Some(Format::Pretty),
            "compact" => Some(Format::Compact),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Whether debug mode is enabled
    pub debug: bool,
    /// Minimum log level
    pub level: Level,
    /// Output format
    pub format: Format,
    /// Whether ANSI colors are enabled
    pub color: bool,
    /// Whether to include timestamps
    pub timestamps: bool,
    /// Whether to include the event target (module path)
    pub target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Info,
            format: Format::Json,
            color: false,
            timestamps: true,
            target: true,
        }
    }
}

impl LogConfig {
    /// Create config from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Create config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |name: &str| {
            lookup(name).map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        };

        let debug = flag("SHOPINO_DEBUG").unwrap_or(false);

        let level = lookup("SHOPINO_LOG_LEVEL")
            .and_then(|s| Level::from_str(&s))
            .unwrap_or(if debug { Level::Debug } else { Level::Info });

        let format = lookup("SHOPINO_LOG_FORMAT")
            .and_then(|s| Format::from_str(&s))
            .unwrap_or(Format::Json);

        let color = flag("SHOPINO_LOG_COLOR")
            .unwrap_or_else(|| format != Format::Json && lookup("NO_COLOR").is_none());

        Self {
            debug,
            level,
            format,
            color,
            timestamps: flag("SHOPINO_LOG_TIMESTAMPS").unwrap_or(true),
            target: flag("SHOPINO_LOG_MODULE").unwrap_or(true),
        }
    }
}

// ============================================================================
// Subscriber
// ============================================================================

static INSTALLED: OnceCell<LogConfig> = OnceCell::new();

/// Build a subscriber for the given configuration.
///
/// `RUST_LOG`, when set and valid, takes precedence over `config.level`.
pub fn subscriber(config: &LogConfig) -> impl tracing::Subscriber + Send + Sync + 'static {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_directive()));

    tracing_subscriber::registry()
        .with(fmt_layer(config))
        .with(filter)
}

fn fmt_layer(config: &LogConfig) -> Box<dyn Layer<Registry> + Send + Sync + 'static> {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(config.color)
        .with_target(config.target);

    match (config.format, config.timestamps) {
        (Format::Json, true) => layer.json().boxed(),
        (Format::Json, false) => layer.json().without_time().boxed(),
        (Format::Compact, true) => layer.compact().boxed(),
        (Format::Compact, false) => layer.compact().without_time().boxed(),
        (Format::Pretty, true) => layer.pretty().boxed(),
        (Format::Pretty, false) => layer.pretty().without_time().boxed(),
    }
}

/// Install the global subscriber using the environment configuration.
///
/// Safe to call more than once; only the first call installs anything.
/// Returns `false` if another global subscriber was already set.
pub fn init() -> bool {
    init_with(LogConfig::from_env())
}

/// Install the global subscriber with an explicit configuration.
pub fn init_with(config: LogConfig) -> bool {
    if INSTALLED.get().is_some() {
        return true;
    }
    match tracing::subscriber::set_global_default(subscriber(&config)) {
        Ok(()) => {
            let _ = INSTALLED.set(config);
            true
        }
        Err(_) => false,
    }
}

/// Configuration of the installed subscriber, if [`init`] succeeded.
pub fn installed_config() -> Option<&'static LogConfig> {
    INSTALLED.get()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
        assert!(Level::Error < Level::Off);
    }

    #[test]
    fn test_level_from_str() {
        assert_eq!(Level::from_str("debug"), Some(Level::Debug));
        assert_eq!(Level::from_str("DEBUG"), Some(Level::Debug));
        assert_eq!(Level::from_str("warning"), Some(Level::Warn));
        assert_eq!(Level::from_str("invalid"), None);
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!(Format::from_str("pretty"), Some(Format::Pretty));
        assert_eq!(Format::from_str("compact"), Some(Format::Compact));
        assert_eq!(Format::from_str("JSON"), Some(Format::Json));
        assert_eq!(Format::from_str("invalid"), None);
    }

    #[test]
    fn test_defaults_without_vars() {
        let config = LogConfig::from_lookup(lookup(&[]));
        assert_eq!(config, LogConfig::default());
    }

    #[test]
    fn test_debug_raises_level() {
        let config = LogConfig::from_lookup(lookup(&[("SHOPINO_DEBUG", "1")]));
        assert!(config.debug);
        assert_eq!(config.level, Level::Debug);

        let config = LogConfig::from_lookup(lookup(&[
            ("SHOPINO_DEBUG", "true"),
            ("SHOPINO_LOG_LEVEL", "warn"),
        ]));
        assert_eq!(config.level, Level::Warn);
    }

    #[test]
    fn test_format_and_flags() {
        let config = LogConfig::from_lookup(lookup(&[
            ("SHOPINO_LOG_FORMAT", "compact"),
            ("SHOPINO_LOG_TIMESTAMPS", "0"),
            ("SHOPINO_LOG_COLOR", "0"),
        ]));
        assert_eq!(config.format, Format::Compact);
        assert!(!config.timestamps);
        assert!(!config.color);
    }

    #[test]
    fn test_subscriber_builds_for_every_format() {
        for format in [Format::Json, Format::Compact, Format::Pretty] {
            for timestamps in [true, false] {
                let config = LogConfig {
                    format,
                    timestamps,
                    ..LogConfig::default()
                };
                tracing::subscriber::with_default(subscriber(&config), || {
                    tracing::info!(format = ?format, "subscriber ready");
                });
            }
        }
    }
}
