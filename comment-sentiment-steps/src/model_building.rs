use {
    std::{fs::create_dir_all, path::PathBuf},
    anyhow::{bail, Context, Result},
    tracing::info,
    comment_sentiment_core::{
        config::Config,
        dataset::{self, DataLayer, Label, ProcessedComment, Split},
        features::{FeatureSchema, TfidfVectorizer},
        model::SentimentClassifier,
    },
};

pub const VECTORIZER_FILE: &str = "tfidf_vectorizer.json";
pub const SCHEMA_FILE: &str = "feature_schema.json";
pub const MODEL_FILE: &str = "sentiment_model.json";

/// Fits the vectorizer on the training partition only, assembles the train
/// matrix through the feature schema and trains the classifier. Persists all
/// three artifacts so evaluation and inference see the exact same columns.
pub async fn model_building_step(config: &Config) -> Result<()> {
    info!("running model building step");

    let params = &config.model_building;
    let train: Vec<ProcessedComment> = dataset::read_records(&DataLayer::Interim.path(Split::Train))?;
    if train.is_empty() {
        bail!("training partition is empty, run the earlier steps first");
    }

    let documents: Vec<String> = train.iter().map(|comment| comment.clean_comment.clone()).collect();
    let vectorizer = TfidfVectorizer::fit(&documents, params.ngram_range, params.max_features)?;
    let schema = FeatureSchema::for_vectorizer(&vectorizer);

    let matrix = schema.assemble(vectorizer.transform(&documents), &train)?;
    info!("train feature matrix: {} x {}", matrix.len(), schema.width());

    let labels: Vec<Label> = train.iter().map(|comment| comment.category).collect();
    let model = SentimentClassifier::fit(&matrix, &labels, params)?;

    let artifacts_dir = PathBuf::from(config.artifacts_dir());
    create_dir_all(&artifacts_dir)
        .with_context(|| format!("failed to create {}", artifacts_dir.display()))?;
    vectorizer.save(&artifacts_dir.join(VECTORIZER_FILE))?;
    schema.save(&artifacts_dir.join(SCHEMA_FILE))?;
    model.save(&artifacts_dir.join(MODEL_FILE))?;
    info!("model artifacts written to {}", artifacts_dir.display());

    Ok(())
}
