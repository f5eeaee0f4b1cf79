use thiserror::Error;

/// Structural errors that abort assembly of a document (E3001–E3002).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// E3001: Two routes map to the same path and verb.
    #[error("E3001: routing conflict: {verb} {path} is bound to both {first} and {second}")]
    ConflictingRoute {
        path: String,
        verb: String,
        first: String,
        second: String,
    },

    /// E3002: Security requirement references a scheme missing from the registry.
    #[error("E3002: operation {operation} references unknown security scheme \"{scheme}\"")]
    UnknownScheme { operation: String, scheme: String },
}

impl CompileError {
    /// Stable error code, e.g. `"E3001"`.
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::ConflictingRoute { .. } => "E3001",
            CompileError::UnknownScheme { .. } => "E3002",
        }
    }
}

/// Configuration errors, fatal before any assembly (E4001–E4004).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// E4001: No locale configured.
    #[error("E4001: no locales configured; set --locales, APIFORGE_LOCALES or `locales` in apiforge.yaml")]
    MissingLocales,

    /// E4002: Project manifest cannot be read or parsed.
    #[error("E4002: manifest error: {0}")]
    Manifest(String),

    /// E4003: Worker pool for locale passes cannot be started.
    #[error("E4003: cannot start worker pool: {0}")]
    WorkerPool(String),

    /// E4004: Locale code unusable in an output file name.
    #[error("E4004: invalid locale \"{0}\": only ASCII letters, digits, '-' and '_' are allowed")]
    InvalidLocale(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
