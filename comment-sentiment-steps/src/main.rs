mod data_ingestion;
mod feature_engineering;
mod model_building;
mod model_evaluation;
mod model_registration;
mod progress;
mod utils;

use {
    tracing::info,
    comment_sentiment_core::config::Config,
    crate::{
        data_ingestion::data_ingestion_step,
        feature_engineering::feature_engineering_step,
        model_building::model_building_step,
        model_evaluation::model_evaluation_step,
        model_registration::model_registration_step,
        utils::init_logging,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = Config::load()?;

    if config.steps.data_ingestion.enabled {
        data_ingestion_step(&config).await?;
    }
    if config.steps.feature_engineering.enabled {
        feature_engineering_step(&config).await?;
    }
    if config.steps.model_building.enabled {
        model_building_step(&config).await?;
    }
    if config.steps.model_evaluation.enabled {
        model_evaluation_step(&config).await?;
    }
    if config.steps.model_registration.enabled {
        model_registration_step(&config).await?;
    }

    info!("pipeline finished");

    Ok(())
}
