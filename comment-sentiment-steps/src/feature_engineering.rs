use {
    anyhow::Result,
    tracing::info,
    comment_sentiment_core::{
        config::Config,
        dataset::{self, DataLayer, ProcessedComment, RawComment, Split},
        features,
    },
    crate::progress::Progress,
};

/// Derives the clean text and numeric feature columns for every split and
/// writes the interim processed CSVs.
pub async fn feature_engineering_step(_config: &Config) -> Result<()> {
    info!("running feature engineering step");

    for split in Split::ALL {
        let raw: Vec<RawComment> = dataset::read_records(&DataLayer::Raw.path(split))?;

        let mut progress = Progress::new(format!("engineering features for {}", split.name()));
        let processed: Vec<ProcessedComment> = raw.into_iter()
            .map(|row| {
                progress.update();
                features::engineer_features(row)
            })
            .collect();
        progress.finish();

        let destination = DataLayer::Interim.path(split);
        dataset::write_records(&destination, &processed)?;
        info!("wrote {} processed rows to {}", processed.len(), destination.display());
    }

    Ok(())
}
