use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use outfit_analysis::{AnalysisError, ErrorKind};
use serde_json::json;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("Could not read upload: {0}")]
    Upload(#[from] MultipartError),

    #[error("Missing multipart field `file`.")]
    MissingFile,

    #[error("File must be an image")]
    NotAnImage,
}

impl AnalyzeError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Analysis(e) => e.kind(),
            Self::Upload(_) | Self::MissingFile | Self::NotAnImage => ErrorKind::InvalidInput,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Upload(e) => e.status(),
            Self::MissingFile | Self::NotAnImage => StatusCode::BAD_REQUEST,
            Self::Analysis(e) => match e.kind() {
                ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
                ErrorKind::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
                ErrorKind::MalformedPrimaryResponse
                | ErrorKind::SchemaViolation
                | ErrorKind::SupplementaryPassDegraded => StatusCode::BAD_GATEWAY,
            },
        }
    }
}

impl IntoResponse for AnalyzeError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("Analysis request failed: {self}");
        }
        let body = Json(json!({ "error": self.to_string(), "kind": self.kind() }));
        (status, body).into_response()
    }
}
