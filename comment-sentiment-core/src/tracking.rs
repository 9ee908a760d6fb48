use {
    std::{fs, path::Path},
    anyhow::{bail, Context, Result},
    reqwest::StatusCode,
    serde::{Serialize, Deserialize},
    serde_json::{json, Value},
    tracing::info,
    crate::storage::Storage,
};

/// Client for an MLflow-compatible tracking server and model registry.
pub struct TrackingClient {
    endpoint: String,
    client: reqwest::Client,
}

#[derive(Deserialize, Clone, Debug)]
pub struct RunInfo {
    pub run_id: String,
    pub artifact_uri: String,
}

#[derive(Deserialize, Debug)]
pub struct ModelVersion {
    pub version: String,
}

/// The {run id, artifact path} record handed from evaluation to
/// registration through `experiment_info.json`.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct ModelInfo {
    pub run_id: String,
    pub model_path: String,
}

impl ModelInfo {
    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_vec_pretty(self).context("failed to serialize model info")?;
        fs::write(path, serialized).with_context(|| format!("failed to write {}", path.display()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_slice(&raw).with_context(|| format!("failed to parse model info from {}", path.display()))
    }

    pub fn model_uri(&self) -> String {
        format!("runs:/{}/{}", self.run_id, self.model_path)
    }
}

#[derive(Deserialize)]
struct ExperimentResponse {
    experiment: Experiment,
}

#[derive(Deserialize)]
struct Experiment {
    experiment_id: String,
}

#[derive(Deserialize)]
struct CreateExperimentResponse {
    experiment_id: String,
}

#[derive(Deserialize)]
struct RunResponse {
    run: Run,
}

#[derive(Deserialize)]
struct Run {
    info: RunInfo,
}

#[derive(Deserialize)]
struct ModelVersionResponse {
    model_version: ModelVersion,
}

#[derive(Deserialize)]
struct ApiError {
    error_code: String,
}

impl TrackingClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_owned(),
            client: reqwest::Client::new(),
        }
    }

    pub async fn experiment_id_by_name(&self, name: &str) -> Result<String> {
        let url = format!("{}/api/2.0/mlflow/experiments/get-by-name", self.endpoint);
        let response = self.client.get(url)
            .query(&[("experiment_name", name)])
            .send()
            .await
            .context("failed to look up experiment")?;

        match response.status() {
            StatusCode::OK => {
                let body: ExperimentResponse = response.json().await.context("failed to parse experiment response")?;
                Ok(body.experiment.experiment_id)
            },
            StatusCode::NOT_FOUND => {
                info!("experiment {} does not exist yet, creating it", name);
                let body: CreateExperimentResponse = self.post_expect_ok(
                    "experiments/create",
                    json!({ "name": name }),
                    "experiment creation",
                ).await?.json().await.context("failed to parse experiment creation response")?;
                Ok(body.experiment_id)
            },
            other => bail!("experiment lookup failed: tracking server returned status {}", other.as_u16()),
        }
    }

    pub async fn create_run(&self, experiment_id: &str) -> Result<RunInfo> {
        let body: RunResponse = self.post_expect_ok(
            "runs/create",
            json!({
                "experiment_id": experiment_id,
                "start_time": chrono::Utc::now().timestamp_millis(),
            }),
            "run creation",
        ).await?.json().await.context("failed to parse run creation response")?;
        Ok(body.run.info)
    }

    pub async fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.post_expect_ok(
            "runs/log-parameter",
            json!({ "run_id": run_id, "key": key, "value": value }),
            "parameter logging",
        ).await?;
        Ok(())
    }

    pub async fn log_metric(&self, run_id: &str, key: &str, value: f64) -> Result<()> {
        self.post_expect_ok(
            "runs/log-metric",
            json!({
                "run_id": run_id,
                "key": key,
                "value": value,
                "timestamp": chrono::Utc::now().timestamp_millis(),
                "step": 0,
            }),
            "metric logging",
        ).await?;
        Ok(())
    }

    pub async fn set_tag(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.post_expect_ok(
            "runs/set-tag",
            json!({ "run_id": run_id, "key": key, "value": value }),
            "tag update",
        ).await?;
        Ok(())
    }

    pub async fn finish_run(&self, run_id: &str) -> Result<()> {
        self.post_expect_ok(
            "runs/update",
            json!({
                "run_id": run_id,
                "status": "FINISHED",
                "end_time": chrono::Utc::now().timestamp_millis(),
            }),
            "run update",
        ).await?;
        Ok(())
    }

    pub async fn log_artifact(
        &self,
        storage: &Storage,
        run: &RunInfo,
        artifact_path: &str,
        file_name: &str,
        data: &[u8],
    ) -> Result<()> {
        let prefix = artifact_key_prefix(&run.artifact_uri)?;
        let key = if artifact_path.is_empty() {
            format!("{}/{}", prefix, file_name)
        } else {
            format!("{}/{}/{}", prefix, artifact_path, file_name)
        };
        storage.put_artifact(&key, data).await
    }

    /// Registers a new model version for `name` and points `alias` at it.
    /// Creates the registered model on first use; every later call adds a
    /// version and moves the alias, never overwriting an existing version.
    pub async fn register_model(&self, name: &str, model_info: &ModelInfo, alias: &str) -> Result<ModelVersion> {
        let response = self.client.post(format!("{}/api/2.0/mlflow/registered-models/create", self.endpoint))
            .json(&json!({ "name": name }))
            .send()
            .await
            .context("failed to create registered model")?;
        if response.status() != StatusCode::OK {
            let status = response.status();
            let error: ApiError = response.json().await
                .with_context(|| format!("model registration failed with status {}", status.as_u16()))?;
            if error.error_code != "RESOURCE_ALREADY_EXISTS" {
                bail!("model registration failed: {} (status {})", error.error_code, status.as_u16());
            }
        }

        let body: ModelVersionResponse = self.post_expect_ok(
            "model-versions/create",
            json!({
                "name": name,
                "source": model_info.model_uri(),
                "run_id": model_info.run_id,
            }),
            "model version creation",
        ).await?.json().await.context("failed to parse model version response")?;

        self.post_expect_ok(
            "registered-models/alias",
            json!({
                "name": name,
                "alias": alias,
                "version": body.model_version.version,
            }),
            "alias update",
        ).await?;

        Ok(body.model_version)
    }

    async fn post_expect_ok(&self, path: &str, body: Value, what: &str) -> Result<reqwest::Response> {
        let response = self.client.post(format!("{}/api/2.0/mlflow/{}", self.endpoint, path))
            .json(&body)
            .send()
            .await
            .with_context(|| format!("failed to call {}", path))?;

        if response.status() != StatusCode::OK {
            bail!("{} failed: tracking server returned status {}", what, response.status().as_u16());
        }

        Ok(response)
    }
}

// "s3://bucket/1/<run_id>/artifacts" -> "1/<run_id>/artifacts"
fn artifact_key_prefix(artifact_uri: &str) -> Result<String> {
    let without_scheme = artifact_uri.strip_prefix("s3://")
        .with_context(|| format!("unsupported artifact uri (expected s3://): {}", artifact_uri))?;
    let (_bucket, prefix) = without_scheme.split_once('/')
        .with_context(|| format!("artifact uri has no key prefix: {}", artifact_uri))?;
    Ok(prefix.trim_end_matches('/').to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_artifact_key_prefix() {
        assert_eq!(
            artifact_key_prefix("s3://mlflow-artifacts/3/abc123/artifacts").unwrap(),
            "3/abc123/artifacts",
        );
        assert!(artifact_key_prefix("file:///tmp/artifacts").is_err());
        assert!(artifact_key_prefix("s3://bucket-only").is_err());
    }

    #[test]
    fn model_info_round_trips_and_builds_runs_uri() {
        let info = ModelInfo {
            run_id: "abc123".to_owned(),
            model_path: "sentiment_model".to_owned(),
        };
        assert_eq!(info.model_uri(), "runs:/abc123/sentiment_model");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("experiment_info.json");
        info.save(&path).unwrap();
        assert_eq!(ModelInfo::load(&path).unwrap(), info);
    }
}
