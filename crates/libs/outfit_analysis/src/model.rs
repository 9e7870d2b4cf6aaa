use app_state::ModelSettings;
use async_trait::async_trait;
use language_model::{LlamaClient, LlamaError};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// The inference backend could not produce a response.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("inference request timed out")]
    Timeout,
    #[error("inference backend unreachable: {0}")]
    Unreachable(String),
    #[error("inference backend returned an error: {0}")]
    Backend(String),
}

impl From<LlamaError> for ModelError {
    fn from(e: LlamaError) -> Self {
        if e.is_timeout() {
            return Self::Timeout;
        }
        match e {
            LlamaError::Http(e) => Self::Unreachable(e.without_url().to_string()),
            LlamaError::Api { status, body } => Self::Backend(format!("status {status}: {body}")),
            LlamaError::Io(e) => Self::Backend(e.to_string()),
            LlamaError::Json(e) => Self::Backend(format!("unreadable response envelope: {e}")),
        }
    }
}

/// A vision language model answering one prompt about one staged image.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Model identifier, for logging.
    fn name(&self) -> &str;

    async fn infer(
        &self,
        image: &Path,
        prompt: &str,
        schema: Option<&Value>,
        temperature: f32,
    ) -> Result<String, ModelError>;
}

#[async_trait]
impl<T: VisionModel + ?Sized> VisionModel for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn infer(
        &self,
        image: &Path,
        prompt: &str,
        schema: Option<&Value>,
        temperature: f32,
    ) -> Result<String, ModelError> {
        (**self).infer(image, prompt, schema, temperature).await
    }
}

#[async_trait]
impl VisionModel for LlamaClient {
    fn name(&self) -> &str {
        self.model()
    }

    async fn infer(
        &self,
        image: &Path,
        prompt: &str,
        schema: Option<&Value>,
        temperature: f32,
    ) -> Result<String, ModelError> {
        let text = self
            .chat(prompt)
            .images(&[image])
            .maybe_schema(schema.cloned())
            .temperature(temperature)
            .call()
            .await?;
        Ok(text)
    }
}

/// A client for the configured backend. Every call is bounded by `timeout_secs`.
pub fn llama_client(settings: &ModelSettings) -> Result<LlamaClient, LlamaError> {
    LlamaClient::with_base_url(&settings.base_url)
        .model(settings.model_name.clone())
        .temperature(settings.primary_temperature)
        .top_p(settings.top_p)
        .timeout(settings.timeout())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn unreachable_backend_is_a_model_error() {
        let client = LlamaClient::with_base_url("http://127.0.0.1:9")
            .model("test".to_string())
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("pixel.png");
        std::fs::write(&image, b"\x89PNG\r\n\x1a\n").unwrap();

        let err = client.infer(&image, "hi", None, 0.0).await.unwrap_err();
        assert!(matches!(err, ModelError::Unreachable(_) | ModelError::Timeout));
    }

    #[test]
    fn api_status_is_a_backend_error() {
        let err = ModelError::from(LlamaError::Api {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            body: "boom".to_string(),
        });
        assert!(matches!(err, ModelError::Backend(ref msg) if msg.contains("boom")));
    }
}
