/// Unified logger for centralized logging configuration

use anyhow::Context;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Level the global subscriber was installed with
static INSTALLED_LEVEL: OnceLock<String> = OnceLock::new();

/// Logger configuration
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    pub level: String,

    /// Include thread IDs
    pub include_thread_ids: bool,

    /// Include target module paths
    pub include_targets: bool,

    /// Colored output
    pub ansi: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            include_thread_ids: false,
            include_targets: true,
            ansi: true,
        }
    }
}

impl LoggerConfig {
    pub fn with_level(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Self::default()
        }
    }
}

/// Unified logger
pub struct UnifiedLogger;

impl UnifiedLogger {
    /// Initialize the global logger
    ///
    /// `RUST_LOG` takes precedence over the configured level. Only the first
    /// call installs a subscriber; later calls are no-ops.
    pub fn init(config: LoggerConfig) -> anyhow::Result<()> {
        if INSTALLED_LEVEL.get().is_some() {
            return Ok(());
        }

        // Create filter
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.level))
            .with_context(|| format!("Invalid log level: {}", config.level))?;

        // Create console layer
        let console_layer = fmt::layer()
            .with_target(config.include_targets)
            .with_thread_ids(config.include_thread_ids)
            .with_ansi(config.ansi);

        // Build subscriber
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(console_layer);

        // Another subscriber may already be installed (tests, embedding apps)
        match tracing::subscriber::set_global_default(subscriber) {
            Ok(()) => tracing::info!("Logging initialized with level: {}", config.level),
            Err(_) => tracing::debug!("Global subscriber already set, keeping it"),
        }

        let _ = INSTALLED_LEVEL.set(config.level);
        Ok(())
    }

    /// Initialize with default configuration
    pub fn init_default() -> anyhow::Result<()> {
        Self::init(LoggerConfig::default())
    }

    /// Level of the installed logger, if any
    pub fn installed_level() -> Option<&'static str> {
        INSTALLED_LEVEL.get().map(String::as_str)
    }
}
