use {
    std::{fs, path::{Path, PathBuf}},
    anyhow::Result,
    tracing::info,
    comment_sentiment_core::{
        config::Config,
        dataset::{self, DataLayer, Label, ProcessedComment, Split},
        features::{FeatureSchema, TfidfVectorizer},
        metrics,
        model::SentimentClassifier,
        storage::Storage,
        tracking::{ModelInfo, TrackingClient},
    },
    crate::model_building::{MODEL_FILE, SCHEMA_FILE, VECTORIZER_FILE},
};

pub const MODEL_ARTIFACT_PATH: &str = "sentiment_model";
pub const EXPERIMENT_INFO_FILE: &str = "experiment_info.json";

/// Scores the held-out test partition with the persisted artifacts and logs
/// parameters, metrics and artifacts to the experiment tracker. Writes the
/// {run id, artifact path} record the registration step consumes.
pub async fn model_evaluation_step(config: &Config) -> Result<()> {
    info!("running model evaluation step");

    let artifacts_dir = PathBuf::from(config.artifacts_dir());
    let vectorizer = TfidfVectorizer::load(&artifacts_dir.join(VECTORIZER_FILE))?;
    let schema = FeatureSchema::load(&artifacts_dir.join(SCHEMA_FILE))?;
    let model = SentimentClassifier::load(&artifacts_dir.join(MODEL_FILE))?;

    let test: Vec<ProcessedComment> = dataset::read_records(&DataLayer::Interim.path(Split::Test))?;
    let documents: Vec<String> = test.iter().map(|comment| comment.clean_comment.clone()).collect();
    let matrix = schema.assemble(vectorizer.transform(&documents), &test)?;

    let actual: Vec<Label> = test.iter().map(|comment| comment.category).collect();
    let predicted = model.predict(&matrix)?;
    let evaluation = metrics::evaluate(&actual, &predicted)?;
    info!("test accuracy: {:.4}", evaluation.accuracy);

    let tracker = TrackingClient::new(&config.model_evaluation.tracking_uri);
    let storage = Storage::new(&config.infra().storage())?;

    let experiment_id = tracker.experiment_id_by_name(&config.model_evaluation.experiment_name).await?;
    let run = tracker.create_run(&experiment_id).await?;
    info!("tracking run {} in experiment {}", run.run_id, experiment_id);

    for (key, value) in config.flattened_params() {
        tracker.log_param(&run.run_id, &key, &value).await?;
    }

    tracker.log_metric(&run.run_id, "test_accuracy", evaluation.accuracy).await?;
    for class in &evaluation.per_class {
        tracker.log_metric(&run.run_id, &format!("test_{}_precision", class.label), class.precision).await?;
        tracker.log_metric(&run.run_id, &format!("test_{}_recall", class.label), class.recall).await?;
        tracker.log_metric(&run.run_id, &format!("test_{}_f1", class.label), class.f1).await?;
    }

    let model_bytes = fs::read(artifacts_dir.join(MODEL_FILE))?;
    tracker.log_artifact(&storage, &run, MODEL_ARTIFACT_PATH, MODEL_FILE, &model_bytes).await?;
    let schema_bytes = fs::read(artifacts_dir.join(SCHEMA_FILE))?;
    tracker.log_artifact(&storage, &run, MODEL_ARTIFACT_PATH, SCHEMA_FILE, &schema_bytes).await?;
    let vectorizer_bytes = fs::read(artifacts_dir.join(VECTORIZER_FILE))?;
    tracker.log_artifact(&storage, &run, "", VECTORIZER_FILE, &vectorizer_bytes).await?;

    let heatmap = metrics::render_confusion_matrix(&evaluation.confusion)?;
    tracker.log_artifact(&storage, &run, "", "confusion_matrix_test.png", &heatmap).await?;

    tracker.set_tag(&run.run_id, "model_type", "gradient_boosted_trees").await?;
    tracker.set_tag(&run.run_id, "task", "sentiment_analysis").await?;
    tracker.set_tag(&run.run_id, "dataset", "youtube_comments").await?;

    let model_info = ModelInfo {
        run_id: run.run_id.clone(),
        model_path: MODEL_ARTIFACT_PATH.to_owned(),
    };
    model_info.save(Path::new(EXPERIMENT_INFO_FILE))?;

    tracker.finish_run(&run.run_id).await?;
    info!("evaluation run {} finished", run.run_id);

    Ok(())
}
