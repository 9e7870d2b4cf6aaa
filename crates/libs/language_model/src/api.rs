use base64::{Engine as _, engine::general_purpose};
use bon::bon;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::fs;
use tracing::debug;

#[derive(Error, Debug)]
pub enum LlamaError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("API error (status {status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
}

impl LlamaError {
    /// Whether the inference call ran into its configured deadline.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout())
    }
}

pub type LlamaResult<T> = Result<T, LlamaError>;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Message {
    pub role: String,
    pub content: MessageContent,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<MessagePart>),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum MessagePart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ImageUrl {
    pub url: String,
}

/// OpenAI style structured output constraint.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseFormat {
    JsonSchema { json_schema: JsonSchemaFormat },
}

#[derive(Serialize, Debug, Clone)]
struct JsonSchemaFormat {
    name: String,
    schema: Value,
    strict: bool,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    stream: bool,
    temperature: f32,
    top_p: f32,
    repetition_penalty: f32,
    presence_penalty: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Deserialize)]
pub struct ChatFullResponse {
    pub choices: Vec<FullChoice>,
}

impl ChatFullResponse {
    /// Text of the first choice, empty when the backend returned none.
    #[must_use]
    pub fn first_content(&self) -> String {
        self.choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default()
    }
}

#[derive(Deserialize)]
pub struct FullChoice {
    pub message: FullMessage,
}

#[derive(Deserialize)]
pub struct FullMessage {
    pub content: Option<String>,
}

#[derive(Clone, Debug)]
pub struct LlamaConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub repetition_penalty: f32,
    pub presence_penalty: f32,
}

/// Client for an OpenAI compatible chat completions server hosting a vision language model.
#[derive(Clone)]
pub struct LlamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    config: LlamaConfig,
}

#[bon]
impl LlamaClient {
    /// Build a client. `timeout` bounds every single inference request.
    #[builder(start_fn = with_base_url)]
    pub fn new(
        #[builder(start_fn)] base_url: &str,
        model: Option<String>,
        temperature: Option<f32>,
        top_p: Option<f32>,
        repetition_penalty: Option<f32>,
        presence_penalty: Option<f32>,
        timeout: Option<Duration>,
    ) -> LlamaResult<Self> {
        let mut http = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            http = http.timeout(timeout);
        }
        Ok(Self {
            http: http.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.unwrap_or_default(),
            config: LlamaConfig {
                temperature: temperature.unwrap_or(0.0),
                top_p: top_p.unwrap_or(0.8),
                repetition_penalty: repetition_penalty.unwrap_or(1.0),
                presence_penalty: presence_penalty.unwrap_or(0.0),
            },
        })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn prepare_messages(
        &self,
        prompt: &str,
        images: &[&Path],
    ) -> LlamaResult<Message> {
        let mut parts = vec![MessagePart::Text {
            text: prompt.to_string(),
        }];
        for path in images {
            let bytes = fs::read(path).await?;
            parts.push(MessagePart::ImageUrl {
                image_url: ImageUrl {
                    url: data_url(&bytes),
                },
            });
        }
        Ok(Message {
            role: "user".to_string(),
            content: MessageContent::Parts(parts),
        })
    }

    /// Single-turn chat. `schema` constrains the output to JSON matching it,
    /// `temperature` overrides the client default for this call only.
    #[builder]
    pub async fn chat(
        &self,
        #[builder(start_fn)] prompt: &str,
        images: Option<&[&Path]>,
        schema: Option<Value>,
        temperature: Option<f32>,
    ) -> LlamaResult<String> {
        let msg = self
            .prepare_messages(prompt, images.unwrap_or_default())
            .await?;
        let req_body = self.build_request(vec![msg], schema, temperature);
        self.call(&req_body).await
    }

    async fn call(&self, req_body: &ChatRequest) -> LlamaResult<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        debug!(
            model = %req_body.model,
            temperature = req_body.temperature,
            constrained = req_body.response_format.is_some(),
            "Sending chat completion request"
        );
        let response = self.http.post(url).json(req_body).send().await?;
        if !response.status().is_success() {
            return Err(LlamaError::Api {
                status: response.status(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        let full: ChatFullResponse = response.json().await?;
        Ok(full.first_content())
    }

    fn build_request(
        &self,
        messages: Vec<Message>,
        schema: Option<Value>,
        temperature: Option<f32>,
    ) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages,
            stream: false,
            top_p: self.config.top_p,
            temperature: temperature.unwrap_or(self.config.temperature),
            repetition_penalty: self.config.repetition_penalty,
            presence_penalty: self.config.presence_penalty,
            response_format: schema.map(|schema| ResponseFormat::JsonSchema {
                json_schema: JsonSchemaFormat {
                    name: "response".to_string(),
                    schema,
                    strict: true,
                },
            }),
        }
    }
}

/// Encode image bytes as a `data:` url, sniffing the mime type.
#[must_use]
pub fn data_url(bytes: &[u8]) -> String {
    let mime_type = infer::get(bytes).map_or("image/jpeg", |kind| kind.mime_type());
    let b64 = general_purpose::STANDARD.encode(bytes);
    format!("data:{mime_type};base64,{b64}")
}
