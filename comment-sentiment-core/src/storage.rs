use {
    awsregion::Region,
    s3::{Bucket, creds::Credentials},
    anyhow::{bail, Context, Result},
    crate::config::StorageConfig,
};

/// Artifact store backing the experiment tracker, addressed by object key
/// under the configured bucket.
pub struct Storage {
    bucket: Bucket,
}

impl Storage {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let bucket = Bucket::new(
            &config.bucket(),
            Region::Custom {
                region: config.region(),
                endpoint: config.endpoint(),
            },
            credentials(config)?,
        ).context("failed to configure artifact bucket")?.with_path_style();

        Ok(Self {
            bucket,
        })
    }

    pub async fn put_artifact(&self, key: &str, data: &[u8]) -> Result<()> {
        let response = self.bucket.put_object(key, data).await
            .with_context(|| format!("failed to upload artifact {}", key))?;
        if response.status_code() != 200 {
            bail!("artifact upload of {} returned status {}", key, response.status_code());
        }
        Ok(())
    }

    pub async fn get_artifact(&self, key: &str) -> Result<Vec<u8>> {
        Ok(self.bucket.get_object(key).await
            .with_context(|| format!("failed to fetch artifact {}", key))?
            .to_vec())
    }
}

fn credentials(config: &StorageConfig) -> Result<Credentials> {
    Credentials::new(
        config.access_key().map(|key| key.as_str()),
        config.secret_key().map(|key| key.as_str()),
        None,
        None,
        None,
    ).context("failed to build storage credentials")
}
