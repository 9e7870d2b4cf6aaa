use app_state::load_app_settings;
use batch::{BatchArgs, run_batch};
use clap::Parser;
use color_eyre::Result;
use outfit_analysis::{OutfitAnalyzer, llama_client};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = BatchArgs::parse();
    let mut settings = load_app_settings()?;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "batch={level},outfit_analysis={level},language_model={level}",
                    level = settings.logging.level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Some(output) = &args.output {
        settings.output.raw_response_dir = Some(std::path::absolute(output)?);
    }
    let analyzer = OutfitAnalyzer::from_settings(llama_client(&settings.model)?, &settings)?;
    run_batch(&analyzer, &args.input).await?;

    Ok(())
}
