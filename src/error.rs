//! Error types for tracksync.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (3=structural, 4=validation, 6=service, etc.)
//! - Recovery hints for the most common setup mistakes
//! - Structured JSON output for piped / non-TTY consumers
//!
//! Remote failures from either service are carried as [`ServiceError`].
//! The executor records those per operation and keeps going; every other
//! variant is propagated and aborts the current project.

use serde::Serialize;
use thiserror::Error;

/// Result type alias for tracksync operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Service Error ─────────────────────────────────────────────

/// HTTP status used by both services to signal rate limiting.
pub const RATE_LIMIT_STATUS: u16 = 429;

/// A failure reported by (or while talking to) a remote service.
///
/// `status` is `None` for transport failures (timeouts, DNS, TLS).
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{text}")]
pub struct ServiceError {
    pub status: Option<u16>,
    pub text: String,
}

impl ServiceError {
    pub fn new(status: Option<u16>, text: impl Into<String>) -> Self {
        Self {
            status,
            text: text.into(),
        }
    }

    /// Error for a non-success HTTP response.
    pub fn from_status(status: u16, text: impl Into<String>) -> Self {
        Self::new(Some(status), text)
    }

    /// Error for a request that never produced a response.
    pub fn transport(text: impl Into<String>) -> Self {
        Self::new(None, text)
    }

    /// Synthesized 429 used while the rate-limit gate is closed.
    pub fn rate_limited(text: impl Into<String>) -> Self {
        Self::new(Some(RATE_LIMIT_STATUS), text)
    }

    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        self.status == Some(RATE_LIMIT_STATUS)
    }
}

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Structural (exit 3)
    MissingField,

    // Validation (exit 4)
    InvalidArgument,

    // Service (exit 6)
    ServiceError,
    RateLimited,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::MissingField => "MISSING_FIELD",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::ServiceError => "SERVICE_ERROR",
            Self::RateLimited => "RATE_LIMITED",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::MissingField => 3,
            Self::InvalidArgument => 4,
            Self::ServiceError | Self::RateLimited => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether running the same command again later may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ServiceError | Self::RateLimited)
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in tracksync operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("{entity} is missing required field '{field}'")]
    MissingField { entity: String, field: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn missing_field(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            entity: entity.into(),
            field: field.into(),
        }
    }

    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Service(e) if e.is_rate_limited() => ErrorCode::RateLimited,
            Self::Service(_) => ErrorCode::ServiceError,
            Self::MissingField { .. } => ErrorCode::MissingField,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// The service error behind this error, if any.
    #[must_use]
    pub fn as_service(&self) -> Option<&ServiceError> {
        match self {
            Self::Service(e) => Some(e),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        self.as_service().is_some_and(ServiceError::is_rate_limited)
    }

    /// Recovery hint for humans.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::Service(e) if e.status == Some(401) => Some(
                "Check the Asana API key (ASANA_API_KEY) and GitHub token (GITHUB_TOKEN)".to_string(),
            ),
            Self::Service(e) if e.is_rate_limited() => {
                Some("Rate limit reached. Wait and run `tracksync sync` again.".to_string())
            }
            Self::Config(_) => {
                Some("Run `tracksync config init` to write a default config file".to_string())
            }
            Self::MissingField { field, .. } if field.starts_with("gh.") => Some(format!(
                "Add a '#{field} <value>' line to the Asana project notes"
            )),
            Self::Service(_)
            | Self::MissingField { .. }
            | Self::Io(_)
            | Self::Json(_)
            | Self::InvalidArgument(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
