//! Unified error type for all reports.

use thiserror::Error;

/// Unified error type for report rendering.
///
/// Wraps the failure modes of every report implementation so client code
/// can switch formats without changing its error handling.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Error serializing a JSON report.
    #[cfg(feature = "json")]
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error formatting rendered output.
    #[error("format error: {0}")]
    Format(#[from] std::fmt::Error),
}

/// Result type for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;
