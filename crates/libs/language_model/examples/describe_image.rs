#![allow(clippy::missing_errors_doc)]

use color_eyre::eyre::{Result, eyre};
use language_model::LlamaClient;
use serde_json::json;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

pub async fn run() -> Result<()> {
    let image = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .ok_or_else(|| eyre!("usage: describe_image <image>"))?;
    let client = LlamaClient::with_base_url("http://localhost:8080")
        .timeout(Duration::from_secs(120))
        .build()?;

    let now = Instant::now();
    info!(
        "Caption: {}",
        client
            .chat("Describe what the person in this photo is wearing in one paragraph.")
            .images(&[image.as_path()])
            .temperature(0.2)
            .call()
            .await?
    );

    let schema = json!({
        "type": "object",
        "properties": { "wearing_glasses": { "type": "boolean" } },
        "required": ["wearing_glasses"],
        "additionalProperties": false
    });
    info!(
        "Structured: {}",
        client
            .chat("Is the person wearing glasses? Answer as JSON.")
            .images(&[image.as_path()])
            .schema(schema)
            .call()
            .await?
    );
    info!("Total time: {:?}", now.elapsed());

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    color_eyre::install()?;

    run().await?;

    Ok(())
}
