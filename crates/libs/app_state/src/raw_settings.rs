use serde::Deserialize;
use std::path::PathBuf;

/// Settings as they appear in `config/settings.yaml`, before resolving.
#[derive(Debug, Deserialize, Clone)]
pub struct RawSettings {
    pub logging: LoggingSettings,
    pub api: ApiSettings,
    pub model: ModelSettings,
    pub analysis: AnalysisSettings,
    #[serde(default)]
    pub output: RawOutputSettings,
}

/// Logging configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
}

/// Configuration for the API server.
#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    pub app_name: String,
    pub api_version: String,
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    /// Largest accepted upload, in bytes.
    pub max_upload_bytes: usize,
}

/// Connection to the vision language model and sampling per pass.
#[derive(Debug, Deserialize, Clone)]
pub struct ModelSettings {
    /// Base url of an OpenAI compatible server, e.g. `http://localhost:8080`.
    pub base_url: String,
    pub model_name: String,
    /// Temperature of the attribute extraction pass. 0 = near deterministic.
    pub primary_temperature: f32,
    /// Temperature of focused single-category passes (e.g. eyewear).
    pub focus_temperature: f32,
    /// Temperature of the description / thermal / weather pass.
    pub narrative_temperature: f32,
    pub top_p: f32,
    /// Upper bound for a single inference call, in seconds.
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisSettings {
    /// Categories that get a focused follow-up pass when the first pass
    /// leaves them absent or unknown. For example `["eyewear"]`.
    pub focus_categories: Vec<String>,
    /// Substituted when no narrative could be generated.
    pub fallback_narrative: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RawOutputSettings {
    /// Where to write the merged raw model response per image. Disabled when unset.
    pub raw_response_dir: Option<PathBuf>,
}
