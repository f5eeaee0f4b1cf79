//! Logging setup for apiforge.
//!
//! Installs a `tracing-subscriber` registry writing JSON or pretty events to
//! stderr, and defines the event names the CLI reports.
//!
//! # Usage
//!
//! ```ignore
//! use apiforge_telemetry::{LogFormat, Telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::new()
//!     .with_log_level("debug")
//!     .with_log_format(LogFormat::Pretty);
//!
//! Telemetry::init(config)?;
//! ```

pub mod config;
pub mod logging;

pub use config::{LogFormat, TelemetryConfig};
pub use logging::events;

use thiserror::Error;

/// Telemetry errors.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to initialize logging.
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),
}

/// Handle on initialized telemetry.
#[derive(Debug)]
pub struct Telemetry {
    config: TelemetryConfig,
}

impl Telemetry {
    /// Initialize logging with the given configuration.
    ///
    /// Fails if a global subscriber is already installed.
    pub fn init(config: TelemetryConfig) -> Result<Self, TelemetryError> {
        logging::init_logging(&config)?;
        Ok(Self { config })
    }

    /// Keep the configuration without installing a subscriber.
    ///
    /// Use this when logging is already initialized (e.g., in tests).
    pub fn init_without_logging(config: TelemetryConfig) -> Self {
        Self { config }
    }

    /// Get the telemetry configuration.
    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }
}
