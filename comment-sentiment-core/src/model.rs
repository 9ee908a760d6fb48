use {
    std::{fs, path::Path},
    anyhow::{bail, Context, Result},
    gbdt::{
        config::Config as GbdtConfig,
        decision_tree::{Data, DataVec},
        gradient_boost::GBDT,
    },
    serde::{Serialize, Deserialize},
    tracing::info,
    crate::{config::ModelBuildingConfig, dataset::Label},
};

/// Multiclass sentiment classifier: one gradient-boosted tree ensemble per
/// class (one-vs-rest), prediction by argmax over the per-class scores.
///
/// `num_leaves`, `reg_alpha` and `reg_lambda` from the config have no
/// counterpart in the tree library; they are tracked as run parameters but do
/// not alter training.
#[derive(Serialize, Deserialize)]
pub struct SentimentClassifier {
    feature_width: usize,
    // Label::ALL order
    learners: Vec<GBDT>,
}

impl std::fmt::Debug for SentimentClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentimentClassifier")
            .field("feature_width", &self.feature_width)
            .field("learners", &self.learners.len())
            .finish()
    }
}

impl SentimentClassifier {
    pub fn fit(x: &[Vec<f32>], y: &[Label], params: &ModelBuildingConfig) -> Result<Self> {
        if x.is_empty() {
            bail!("cannot train on an empty feature matrix");
        }
        if x.len() != y.len() {
            bail!("feature matrix has {} rows but {} labels were given", x.len(), y.len());
        }
        let feature_width = x[0].len();
        for row in x {
            if row.len() != feature_width {
                bail!("inconsistent feature width: expected {}, found {}", feature_width, row.len());
            }
        }

        let mut class_counts = [0usize; 3];
        for label in y {
            class_counts[label.to_index()] += 1;
        }
        for label in Label::ALL {
            if class_counts[label.to_index()] == 0 {
                bail!("training data has no {} examples", label);
            }
        }

        // balanced class weights: n / (n_classes * class_count)
        let total = y.len() as f32;
        let class_weights: Vec<f32> = class_counts.iter()
            .map(|count| total / (Label::ALL.len() as f32 * *count as f32))
            .collect();

        let mut learners = Vec::with_capacity(Label::ALL.len());
        for class in Label::ALL {
            info!("fitting one-vs-rest learner for class {}", class);

            let mut training_data: DataVec = x.iter()
                .zip(y)
                .map(|(row, label)| {
                    let target = if *label == class { 1.0 } else { -1.0 };
                    Data::new_training_data(row.clone(), class_weights[label.to_index()], target, None)
                })
                .collect();

            let mut learner = GBDT::new(&gbdt_config(feature_width, params));
            learner.fit(&mut training_data);
            learners.push(learner);
        }

        Ok(Self {
            feature_width,
            learners,
        })
    }

    pub fn feature_width(&self) -> usize {
        self.feature_width
    }

    pub fn predict(&self, x: &[Vec<f32>]) -> Result<Vec<Label>> {
        for row in x {
            if row.len() != self.feature_width {
                bail!(
                    "input feature width {} disagrees with training feature width {}",
                    row.len(),
                    self.feature_width,
                );
            }
        }

        let test_data: DataVec = x.iter()
            .map(|row| Data::new_test_data(row.clone(), None))
            .collect();

        let scores: Vec<Vec<f32>> = self.learners.iter()
            .map(|learner| learner.predict(&test_data))
            .collect();

        (0..x.len())
            .map(|row| {
                let best = (0..self.learners.len())
                    .max_by(|a, b| scores[*a][row].total_cmp(&scores[*b][row]))
                    .context("classifier has no learners")?;
                Label::from_index(best)
            })
            .collect()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_vec(self).context("failed to serialize model")?;
        fs::write(path, serialized).with_context(|| format!("failed to write {}", path.display()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_slice(&raw).with_context(|| format!("failed to parse model from {}", path.display()))
    }
}

fn gbdt_config(feature_width: usize, params: &ModelBuildingConfig) -> GbdtConfig {
    let mut config = GbdtConfig::new();
    config.set_feature_size(feature_width);
    config.set_max_depth(params.max_depth);
    config.set_iterations(params.n_estimators);
    config.set_shrinkage(params.learning_rate as f32);
    config.set_min_leaf_size(params.min_child_samples);
    config.set_feature_sample_ratio(params.colsample_bytree);
    config.set_data_sample_ratio(params.subsample);
    config.set_loss("LogLikelyhood");
    config.set_debug(false);
    config.set_training_optimization_level(2);
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_params() -> ModelBuildingConfig {
        ModelBuildingConfig {
            n_estimators: 30,
            max_depth: 4,
            min_child_samples: 1,
            learning_rate: 0.3,
            colsample_bytree: 1.0,
            subsample: 1.0,
            ..Default::default()
        }
    }

    fn separable_data(per_class: usize) -> (Vec<Vec<f32>>, Vec<Label>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for (index, label) in Label::ALL.iter().enumerate() {
            for i in 0..per_class {
                let mut row = vec![0.1 * (i % 3) as f32; 4];
                row[index] = 1.0;
                x.push(row);
                y.push(*label);
            }
        }
        (x, y)
    }

    #[test]
    fn fits_and_recovers_separable_classes() {
        let (x, y) = separable_data(20);
        let model = SentimentClassifier::fit(&x, &y, &test_params()).unwrap();

        let predicted = model.predict(&x).unwrap();
        let correct = predicted.iter().zip(&y).filter(|(p, a)| p == a).count();
        assert!(correct as f64 / y.len() as f64 >= 0.9);
    }

    #[test]
    fn model_round_trips_through_json() {
        let (x, y) = separable_data(10);
        let model = SentimentClassifier::fit(&x, &y, &test_params()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sentiment_model.json");
        model.save(&path).unwrap();
        let loaded = SentimentClassifier::load(&path).unwrap();

        assert_eq!(loaded.feature_width(), model.feature_width());
        assert_eq!(loaded.predict(&x).unwrap(), model.predict(&x).unwrap());
    }

    #[test]
    fn predict_rejects_mismatched_width() {
        let (x, y) = separable_data(10);
        let model = SentimentClassifier::fit(&x, &y, &test_params()).unwrap();

        let err = model.predict(&[vec![1.0; 3]]).unwrap_err();
        assert!(err.to_string().contains("feature width"));
    }

    #[test]
    fn fit_rejects_missing_class() {
        let (mut x, mut y) = separable_data(10);
        let keep: Vec<usize> = y.iter().enumerate()
            .filter(|(_, label)| **label != Label::Neutral)
            .map(|(i, _)| i)
            .collect();
        x = keep.iter().map(|&i| x[i].clone()).collect();
        y = keep.iter().map(|&i| y[i]).collect();

        let err = SentimentClassifier::fit(&x, &y, &test_params()).unwrap_err();
        assert!(err.to_string().contains("neutral"));
    }

    #[test]
    fn fit_rejects_ragged_matrix() {
        let x = vec![vec![1.0, 0.0], vec![1.0, 0.0, 0.0]];
        let y = vec![Label::Negative, Label::Positive];
        assert!(SentimentClassifier::fit(&x, &y, &test_params()).is_err());
    }
}
