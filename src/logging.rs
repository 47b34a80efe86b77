//! Structured logging to stderr via `tracing`.
//!
//! `RUST_LOG`, when set, replaces the level chosen from the command line.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(format!("invalid log level: {s}")),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub level: LogLevel,
    /// Include the module path in each line.
    pub target: bool,
}

impl LogConfig {
    #[must_use]
    pub const fn verbose() -> Self {
        Self {
            level: LogLevel::Debug,
            target: true,
        }
    }

    /// An explicit level wins over `--verbose`.
    pub fn from_flags(level: Option<LogLevel>, verbose: bool) -> Self {
        match level {
            Some(level) => Self {
                level,
                target: verbose,
            },
            None if verbose => Self::verbose(),
            None => Self::default(),
        }
    }

    /// Filter directive used when `RUST_LOG` is not set. Dependencies stay at warn.
    fn directive(&self) -> String {
        format!("warn,thread_search={}", self.level.as_str())
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(config: &LogConfig) {
    let env_filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(config.directive())
    };

    let layer = fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(config.target);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .try_init()
        .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parsing() {
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_directive() {
        assert_eq!(LogConfig::default().directive(), "warn,thread_search=info");
        assert_eq!(LogConfig::verbose().directive(), "warn,thread_search=debug");
    }

    #[test]
    fn test_explicit_level_beats_verbose() {
        let config = LogConfig::from_flags(Some(LogLevel::Trace), true);
        assert_eq!(config.directive(), "warn,thread_search=trace");
        assert_eq!(LogConfig::from_flags(None, true).level, LogLevel::Debug);
        assert_eq!(LogConfig::from_flags(None, false).level, LogLevel::Info);
        assert_eq!(
            LogConfig::from_flags(Some(LogLevel::Error), false).directive(),
            "warn,thread_search=error"
        );
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_logging(&LogConfig::default());
        init_logging(&LogConfig::verbose());
    }
}
