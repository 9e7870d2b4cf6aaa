use crate::merger::MergeError;
use crate::model::ModelError;
use crate::validator::ValidationError;
use serde::Serialize;
use thiserror::Error;

/// Failures surfaced to the caller of an analysis. Messages never carry
/// file-system paths.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("malformed primary response: {0}")]
    MalformedPrimaryResponse(String),
    #[error("schema violation: {0}")]
    SchemaViolation(#[from] ValidationError),
}

impl From<ModelError> for AnalysisError {
    fn from(e: ModelError) -> Self {
        Self::ModelUnavailable(e.to_string())
    }
}

impl From<MergeError> for AnalysisError {
    fn from(e: MergeError) -> Self {
        match e {
            MergeError::MalformedPrimary(reason) => Self::MalformedPrimaryResponse(reason),
            other @ MergeError::MissingPrimary => Self::MalformedPrimaryResponse(other.to_string()),
        }
    }
}

/// Every error condition the pipeline distinguishes. `SupplementaryPassDegraded`
/// is absorbed and only ever reported, never returned as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    ModelUnavailable,
    MalformedPrimaryResponse,
    SchemaViolation,
    SupplementaryPassDegraded,
}

impl AnalysisError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::ModelUnavailable(_) => ErrorKind::ModelUnavailable,
            Self::MalformedPrimaryResponse(_) => ErrorKind::MalformedPrimaryResponse,
            Self::SchemaViolation(_) => ErrorKind::SchemaViolation,
        }
    }
}
