use {
    std::fs::read_to_string,
    anyhow::{Context, Result},
    serde::Deserialize,
};

#[derive(Deserialize, Debug)]
pub struct Config {
    #[serde(default)]
    pub steps: StepsConfig,
    #[serde(default)]
    pub data_ingestion: DataIngestionConfig,
    #[serde(default)]
    pub model_building: ModelBuildingConfig,
    #[serde(default)]
    pub model_evaluation: ModelEvaluationConfig,
    #[serde(default)]
    pub model_registration: ModelRegistrationConfig,
    artifacts_dir: Option<String>,
    pub infra: Option<InfraConfig>,
}

#[derive(Deserialize, Debug, Default)]
pub struct StepsConfig {
    #[serde(default)]
    pub data_ingestion: StepConfig,
    #[serde(default)]
    pub feature_engineering: StepConfig,
    #[serde(default)]
    pub model_building: StepConfig,
    #[serde(default)]
    pub model_evaluation: StepConfig,
    #[serde(default)]
    pub model_registration: StepConfig,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct StepConfig {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DataIngestionConfig {
    #[serde(default = "default_dataset_url")]
    pub dataset_url: String,
    #[serde(default = "default_text_column")]
    pub text_column: String,
    #[serde(default = "default_stratify_column")]
    pub stratify_column: String,
    #[serde(default = "default_test_size")]
    pub test_size: f64,
    #[serde(default = "default_val_size")]
    pub val_size: f64,
    #[serde(default = "default_random_state")]
    pub random_state: u64,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ModelBuildingConfig {
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),
    #[serde(default = "default_max_features")]
    pub max_features: usize,
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
    #[serde(default = "default_num_leaves")]
    pub num_leaves: u32,
    #[serde(default = "default_min_child_samples")]
    pub min_child_samples: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_colsample_bytree")]
    pub colsample_bytree: f64,
    #[serde(default = "default_subsample")]
    pub subsample: f64,
    #[serde(default = "default_reg_alpha")]
    pub reg_alpha: f64,
    #[serde(default = "default_reg_lambda")]
    pub reg_lambda: f64,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ModelEvaluationConfig {
    #[serde(default = "default_tracking_uri")]
    pub tracking_uri: String,
    #[serde(default = "default_experiment_name")]
    pub experiment_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ModelRegistrationConfig {
    #[serde(default = "default_model_name")]
    pub model_name: String,
    #[serde(default = "default_alias")]
    pub alias: String,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct InfraConfig {
    storage: Option<StorageConfig>,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct StorageConfig {
    endpoint: Option<String>,
    region: Option<String>,
    bucket: Option<String>,
    access_key: Option<String>,
    secret_key: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let raw = read_to_string("./params.toml")
            .or_else(|_| read_to_string("/config/params.toml"))
            .context("failed to read params.toml")?;
        toml::from_str(&raw).context("failed to parse params.toml")
    }

    pub fn artifacts_dir(&self) -> String {
        self.artifacts_dir.as_ref().cloned().unwrap_or("artifacts".to_owned())
    }

    pub fn infra(&self) -> InfraConfig {
        self.infra.as_ref().cloned().unwrap_or_default()
    }

    // every run parameter as key/value strings, for the experiment tracker
    pub fn flattened_params(&self) -> Vec<(String, String)> {
        let ingestion = &self.data_ingestion;
        let building = &self.model_building;
        vec![
            ("data_ingestion.test_size".to_owned(), ingestion.test_size.to_string()),
            ("data_ingestion.val_size".to_owned(), ingestion.val_size.to_string()),
            ("data_ingestion.random_state".to_owned(), ingestion.random_state.to_string()),
            ("data_ingestion.stratify_column".to_owned(), ingestion.stratify_column.clone()),
            ("model_building.ngram_range".to_owned(), format!("({}, {})", building.ngram_range.0, building.ngram_range.1)),
            ("model_building.max_features".to_owned(), building.max_features.to_string()),
            ("model_building.n_estimators".to_owned(), building.n_estimators.to_string()),
            ("model_building.max_depth".to_owned(), building.max_depth.to_string()),
            ("model_building.num_leaves".to_owned(), building.num_leaves.to_string()),
            ("model_building.min_child_samples".to_owned(), building.min_child_samples.to_string()),
            ("model_building.learning_rate".to_owned(), building.learning_rate.to_string()),
            ("model_building.colsample_bytree".to_owned(), building.colsample_bytree.to_string()),
            ("model_building.subsample".to_owned(), building.subsample.to_string()),
            ("model_building.reg_alpha".to_owned(), building.reg_alpha.to_string()),
            ("model_building.reg_lambda".to_owned(), building.reg_lambda.to_string()),
        ]
    }
}

impl InfraConfig {
    pub fn storage(&self) -> StorageConfig {
        self.storage.as_ref().cloned().unwrap_or_default()
    }
}

impl StorageConfig {
    pub fn endpoint(&self) -> String {
        self.endpoint.as_ref().cloned().unwrap_or("http://localhost:9000".to_owned())
    }

    pub fn region(&self) -> String {
        self.region.as_ref().cloned().unwrap_or("us-east-1".to_owned())
    }

    pub fn bucket(&self) -> String {
        self.bucket.as_ref().cloned().unwrap_or("mlflow-artifacts".to_owned())
    }

    pub fn access_key(&self) -> Option<&String> {
        self.access_key.as_ref()
    }

    pub fn secret_key(&self) -> Option<&String> {
        self.secret_key.as_ref()
    }
}

impl Default for DataIngestionConfig {
    fn default() -> Self {
        Self {
            dataset_url: default_dataset_url(),
            text_column: default_text_column(),
            stratify_column: default_stratify_column(),
            test_size: default_test_size(),
            val_size: default_val_size(),
            random_state: default_random_state(),
        }
    }
}

impl Default for ModelBuildingConfig {
    fn default() -> Self {
        Self {
            ngram_range: default_ngram_range(),
            max_features: default_max_features(),
            n_estimators: default_n_estimators(),
            max_depth: default_max_depth(),
            num_leaves: default_num_leaves(),
            min_child_samples: default_min_child_samples(),
            learning_rate: default_learning_rate(),
            colsample_bytree: default_colsample_bytree(),
            subsample: default_subsample(),
            reg_alpha: default_reg_alpha(),
            reg_lambda: default_reg_lambda(),
        }
    }
}

impl Default for ModelEvaluationConfig {
    fn default() -> Self {
        Self {
            tracking_uri: default_tracking_uri(),
            experiment_name: default_experiment_name(),
        }
    }
}

impl Default for ModelRegistrationConfig {
    fn default() -> Self {
        Self {
            model_name: default_model_name(),
            alias: default_alias(),
        }
    }
}

fn default_dataset_url() -> String {
    "https://www.kaggle.com/api/v1/datasets/download/atifaliak/youtube-comments-dataset".to_owned()
}

fn default_text_column() -> String {
    "Comment".to_owned()
}

fn default_stratify_column() -> String {
    "Sentiment".to_owned()
}

fn default_test_size() -> f64 {
    0.2
}

fn default_val_size() -> f64 {
    0.1
}

fn default_random_state() -> u64 {
    42
}

fn default_ngram_range() -> (usize, usize) {
    (1, 3)
}

fn default_max_features() -> usize {
    1000
}

fn default_n_estimators() -> usize {
    300
}

fn default_max_depth() -> u32 {
    12
}

fn default_num_leaves() -> u32 {
    31
}

fn default_min_child_samples() -> usize {
    20
}

fn default_learning_rate() -> f64 {
    0.08
}

fn default_colsample_bytree() -> f64 {
    0.6
}

fn default_subsample() -> f64 {
    0.8
}

fn default_reg_alpha() -> f64 {
    0.1
}

fn default_reg_lambda() -> f64 {
    0.1
}

fn default_tracking_uri() -> String {
    "http://localhost:5000".to_owned()
}

fn default_experiment_name() -> String {
    "comment-sentiment-pipeline-runs".to_owned()
}

fn default_model_name() -> String {
    "comment_sentiment_model".to_owned()
}

fn default_alias() -> String {
    "staging".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let config: Config = toml::from_str(r#"
            [steps.data_ingestion]
            enabled = true

            [data_ingestion]
            test_size = 0.25
            val_size = 0.15
            random_state = 7

            [model_building]
            ngram_range = [1, 2]
            max_features = 500

            [infra.storage]
            bucket = "artifacts"
            access_key = "ak"
            secret_key = "sk"
        "#).unwrap();

        assert!(config.steps.data_ingestion.enabled);
        assert!(!config.steps.model_building.enabled);
        assert_eq!(config.data_ingestion.test_size, 0.25);
        assert_eq!(config.data_ingestion.random_state, 7);
        assert_eq!(config.model_building.ngram_range, (1, 2));
        assert_eq!(config.model_building.max_features, 500);
        assert_eq!(config.infra().storage().bucket(), "artifacts");
        assert_eq!(config.infra().storage().access_key(), Some(&"ak".to_owned()));
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();

        assert!(!config.steps.data_ingestion.enabled);
        assert_eq!(config.data_ingestion.test_size, 0.2);
        assert_eq!(config.data_ingestion.val_size, 0.1);
        assert_eq!(config.model_building.ngram_range, (1, 3));
        assert_eq!(config.artifacts_dir(), "artifacts");
        assert_eq!(config.model_registration.alias, "staging");
    }

    #[test]
    fn flattened_params_cover_all_hyperparameters() {
        let config: Config = toml::from_str("").unwrap();
        let params = config.flattened_params();

        for key in ["model_building.n_estimators", "model_building.reg_lambda", "data_ingestion.test_size"] {
            assert!(params.iter().any(|(k, _)| k.as_str() == key), "missing {}", key);
        }
    }
}
