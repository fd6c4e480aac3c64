//! Error types surfaced by the insights core
//!
//! Remote failures never appear here: they are absorbed during traversal
//! and only show up as a `partial` flag on the result.

use std::time::Duration;

use crate::catalog::CatalogError;

/// Errors returned to callers of the vault connect flow, the aggregator and the summarizer
#[derive(Debug, thiserror::Error)]
pub enum InsightsError {
    #[error("Invalid storage credential: {0}")]
    InvalidCredential(String),

    #[error("Local file records unavailable: {0}")]
    LocalData(#[from] CatalogError),

    #[error("Computation timed out after {0:?}")]
    Timeout(Duration),
}

impl InsightsError {
    /// Short machine-readable code for IPC responses
    pub fn code(&self) -> &'static str {
        match self {
            InsightsError::InvalidCredential(_) => "invalid_credential",
            InsightsError::LocalData(_) => "local_data",
            InsightsError::Timeout(_) => "timeout",
        }
    }
}
