use {
    std::path::Path,
    anyhow::Result,
    tracing::info,
    comment_sentiment_core::{
        config::Config,
        tracking::{ModelInfo, TrackingClient},
    },
    crate::model_evaluation::EXPERIMENT_INFO_FILE,
};

/// Publishes the evaluated model into the registry under the configured
/// alias. Every invocation creates a new version; nothing is overwritten.
pub async fn model_registration_step(config: &Config) -> Result<()> {
    info!("running model registration step");

    let model_info = ModelInfo::load(Path::new(EXPERIMENT_INFO_FILE))?;
    let settings = &config.model_registration;

    let tracker = TrackingClient::new(&config.model_evaluation.tracking_uri);
    let version = tracker.register_model(&settings.model_name, &model_info, &settings.alias).await?;
    info!(
        "registered {} version {} with alias {}",
        settings.model_name,
        version.version,
        settings.alias,
    );

    Ok(())
}
