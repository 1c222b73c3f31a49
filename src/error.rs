//! Pipeline error taxonomy
//!
//! Only structural input problems and load/unexpected failures surface here.
//! Unmatched species, degraded optional datasets and numeric edge cases are
//! handled locally and never become an `AnalysisError`.

use thiserror::Error;

/// Message returned when the survey table or the plot selection is missing
pub const MISSING_INPUT_MESSAGE: &str = "Données de relevé ou indices manquants";

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Missing/empty survey data or selection (request aborted, reported as 400)
    #[error("{0}")]
    Input(String),

    /// Required trait reference missing or unparseable
    #[error("reference data unavailable: {0}")]
    ReferenceLoad(#[source] anyhow::Error),

    /// Any other failure during processing
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AnalysisError {
    pub fn missing_input() -> Self {
        AnalysisError::Input(MISSING_INPUT_MESSAGE.to_string())
    }

    /// Whether the caller is at fault (maps to a 400-equivalent status)
    pub fn is_input(&self) -> bool {
        matches!(self, AnalysisError::Input(_))
    }

    /// Diagnostic text: the full error chain
    pub fn trace(&self) -> String {
        match self {
            AnalysisError::Input(msg) => msg.clone(),
            AnalysisError::ReferenceLoad(err) | AnalysisError::Internal(err) => format!("{:?}", err),
        }
    }
}
