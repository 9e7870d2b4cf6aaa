use crate::{AnalysisSettings, ApiSettings, LoggingSettings, ModelSettings, RawSettings};
use color_eyre::eyre::{Result, ensure};
use serde::Deserialize;
use std::path::{PathBuf, absolute};
use std::time::Duration;

/// Resolved, immutable application settings. Built once at start-up and passed
/// explicitly to whatever needs it.
#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub logging: LoggingSettings,
    pub api: ApiSettings,
    pub model: ModelSettings,
    pub analysis: AnalysisSettings,
    pub output: OutputSettings,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct OutputSettings {
    /// Absolute directory for raw response artifacts, if enabled.
    pub raw_response_dir: Option<PathBuf>,
}

impl TryFrom<RawSettings> for AppSettings {
    type Error = color_eyre::Report;

    fn try_from(raw: RawSettings) -> Result<Self> {
        raw.model.check_temperatures()?;
        ensure!(raw.model.timeout_secs > 0, "model.timeout_secs must be positive");
        ensure!(
            !raw.analysis.fallback_narrative.trim().is_empty(),
            "analysis.fallback_narrative must not be empty"
        );

        let raw_response_dir = raw
            .output
            .raw_response_dir
            .map(absolute)
            .transpose()?;

        Ok(Self {
            logging: raw.logging,
            api: raw.api,
            model: raw.model,
            analysis: raw.analysis,
            output: OutputSettings { raw_response_dir },
        })
    }
}

impl ModelSettings {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn check_temperatures(&self) -> Result<()> {
        for (name, value) in [
            ("primary_temperature", self.primary_temperature),
            ("focus_temperature", self.focus_temperature),
            ("narrative_temperature", self.narrative_temperature),
        ] {
            ensure!(
                (0.0..=1.0).contains(&value),
                "model.{name} must be within [0, 1], got {value}"
            );
        }
        Ok(())
    }
}

impl ApiSettings {
    /// `host:port` string to bind the server to.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Path prefix of the versioned routes, e.g. `/api/v1`.
    #[must_use]
    pub fn route_prefix(&self) -> String {
        format!("/api/{}", self.api_version)
    }
}
