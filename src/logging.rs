//! Logging configuration for wirebox
//!
//! Sets up structured logging for container diagnostics with either JSON
//! (production) or pretty (development) output.
//!
//! # Features
//!
//! - `logging` - Emit `tracing` events from the container (default)
//! - `logging-json` - JSON structured output (recommended for production)
//! - `logging-pretty` - Colorful pretty output (recommended for development)
//!
//! # Example
//!
//! ```rust,ignore
//! use wirebox::logging;
//!
//! logging::init();
//!
//! // Or with custom settings
//! logging::builder()
//!     .with_level(tracing::Level::TRACE)
//!     .container_only()
//!     .pretty()
//!     .init();
//! ```

#[cfg(feature = "logging")]
use tracing::Level;

/// Logging format configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON structured logging (production default)
    #[default]
    Json,
    /// Pretty colorful output (development)
    Pretty,
    /// Compact single-line output
    Compact,
}

/// Builder for logging configuration
#[cfg(feature = "logging")]
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    level: Level,
    format: LogFormat,
    target: Option<&'static str>,
    with_thread_ids: bool,
}

#[cfg(feature = "logging")]
impl Default for LoggingBuilder {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            format: LogFormat::Json,
            target: None,
            with_thread_ids: false,
        }
    }
}

#[cfg(feature = "logging")]
impl LoggingBuilder {
    /// Create a new logging builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum log level
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set log level to TRACE (per-resolution events)
    pub fn trace(mut self) -> Self {
        self.level = Level::TRACE;
        self
    }

    /// Set log level to DEBUG (registrations and scope lifecycle)
    pub fn debug(mut self) -> Self {
        self.level = Level::DEBUG;
        self
    }

    /// Filter to only show logs from a specific target
    pub fn with_target_filter(mut self, target: &'static str) -> Self {
        self.target = Some(target);
        self
    }

    /// Only show wirebox logs
    pub fn container_only(self) -> Self {
        self.with_target_filter("wirebox")
    }

    /// Include thread IDs in log output; useful when debugging concurrent
    /// first-construction races
    pub fn with_thread_ids(mut self) -> Self {
        self.with_thread_ids = true;
        self
    }

    /// Use JSON structured logging format
    pub fn json(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }

    /// Use pretty colorful logging format
    pub fn pretty(mut self) -> Self {
        self.format = LogFormat::Pretty;
        self
    }

    /// Use compact single-line logging format
    pub fn compact(mut self) -> Self {
        self.format = LogFormat::Compact;
        self
    }

    /// Initialize the logging subscriber with the configured settings
    ///
    /// Requires either `logging-json` or `logging-pretty` to be enabled.
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    pub fn init(self) {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        let filter = if let Some(target) = self.target {
            EnvFilter::new(format!("{}={}", target, self.level))
        } else {
            EnvFilter::new(self.level.to_string())
        };

        match self.format {
            LogFormat::Json => {
                #[cfg(feature = "logging-json")]
                {
                    let layer = fmt::layer()
                        .json()
                        .with_thread_ids(self.with_thread_ids)
                        .with_target(true);
                    tracing_subscriber::registry().with(filter).with(layer).init();
                }
                #[cfg(not(feature = "logging-json"))]
                {
                    let layer = fmt::layer()
                        .with_thread_ids(self.with_thread_ids)
                        .with_target(true);
                    tracing_subscriber::registry().with(filter).with(layer).init();
                }
            }
            LogFormat::Pretty => {
                let layer = fmt::layer()
                    .pretty()
                    .with_thread_ids(self.with_thread_ids)
                    .with_target(true);
                tracing_subscriber::registry().with(filter).with(layer).init();
            }
            LogFormat::Compact => {
                let layer = fmt::layer()
                    .compact()
                    .with_thread_ids(self.with_thread_ids)
                    .with_target(true);
                tracing_subscriber::registry().with(filter).with(layer).init();
            }
        }
    }

    /// Initialize (no-op when subscriber features not available)
    #[cfg(not(any(feature = "logging-json", feature = "logging-pretty")))]
    pub fn init(self) {
        // No-op: enable logging-json or logging-pretty for a subscriber
    }
}

/// Create a new logging builder
#[cfg(feature = "logging")]
pub fn builder() -> LoggingBuilder {
    LoggingBuilder::new()
}

/// Initialize logging with default settings
#[cfg(feature = "logging")]
pub fn init() {
    builder().init();
}

/// Initialize logging for wirebox only (filters other crates)
#[cfg(feature = "logging")]
pub fn init_container_only() {
    builder().container_only().init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let builder = LoggingBuilder::default();
        assert_eq!(builder.level, Level::DEBUG);
        assert_eq!(builder.format, LogFormat::Json);
        assert!(builder.target.is_none());
    }

    #[test]
    fn builder_chain() {
        let builder = LoggingBuilder::new()
            .trace()
            .pretty()
            .with_thread_ids()
            .container_only();

        assert_eq!(builder.level, Level::TRACE);
        assert_eq!(builder.format, LogFormat::Pretty);
        assert!(builder.with_thread_ids);
        assert_eq!(builder.target, Some("wirebox"));
    }
}
