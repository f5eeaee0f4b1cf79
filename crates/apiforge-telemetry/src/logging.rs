//! Structured logging to stderr.
//!
//! Generated documents may be piped from stdout, so every event goes to
//! stderr.

use crate::{LogFormat, TelemetryConfig, TelemetryError};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize the logging subsystem.
///
/// Sets up tracing-subscriber with either JSON or pretty format,
/// respecting the configured log level.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    // RUST_LOG wins over the configured level
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format {
        LogFormat::Json => init_json_logging(filter),
        LogFormat::Pretty => init_pretty_logging(filter),
    }
}

fn init_json_logging(filter: EnvFilter) -> Result<(), TelemetryError> {
    let json_layer = fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_current_span(false)
        .with_span_list(false)
        .flatten_event(true)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(json_layer)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| {
            TelemetryError::LoggingInit(e.to_string())
        })
}

fn init_pretty_logging(filter: EnvFilter) -> Result<(), TelemetryError> {
    let pretty_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(pretty_layer)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| {
            TelemetryError::LoggingInit(e.to_string())
        })
}

/// Standard log event names.
pub mod events {
    /// Generation run is starting.
    pub const GENERATION_STARTED: &str = "generation_started";

    /// Design file failed to evaluate.
    pub const DESIGN_INVALID: &str = "design_invalid";

    /// A locale pass produced a document.
    pub const LOCALE_COMPLETED: &str = "locale_completed";

    /// A locale pass produced no document (no HTTP routes).
    pub const DOCUMENT_SKIPPED: &str = "document_skipped";

    /// A locale pass failed with a structural error.
    pub const ASSEMBLY_FAILED: &str = "assembly_failed";

    /// An output file has been written.
    pub const FILE_WRITTEN: &str = "file_written";

    /// Generation run finished.
    pub const GENERATION_COMPLETED: &str = "generation_completed";
}

/// Helper macros for structured logging with standard fields.
///
/// These wrap the tracing macros to ensure consistent field naming.
#[macro_export]
macro_rules! log_generation_started {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::GENERATION_STARTED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_design_invalid {
    ($($field:tt)*) => {
        tracing::error!(
            event = $crate::logging::events::DESIGN_INVALID,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_locale_completed {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::LOCALE_COMPLETED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_document_skipped {
    ($($field:tt)*) => {
        tracing::warn!(
            event = $crate::logging::events::DOCUMENT_SKIPPED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_assembly_failed {
    ($($field:tt)*) => {
        tracing::error!(
            event = $crate::logging::events::ASSEMBLY_FAILED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_file_written {
    ($($field:tt)*) => {
        tracing::debug!(
            event = $crate::logging::events::FILE_WRITTEN,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_generation_completed {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::GENERATION_COMPLETED,
            $($field)*
        )
    };
}
