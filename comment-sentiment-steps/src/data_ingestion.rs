use {
    std::{fs::{create_dir_all, File}, io::{copy, Cursor}, path::{Path, PathBuf}},
    anyhow::{bail, Context, Result},
    tracing::{info, warn},
    comment_sentiment_core::{
        config::Config,
        dataset::{self, DataLayer, Label, RawComment, Split},
    },
};

/// Downloads the dataset archive, flattens it into the raw data directory,
/// loads the CSV payload and writes the stratified train/val/test splits.
pub async fn data_ingestion_step(config: &Config) -> Result<()> {
    info!("running data ingestion step");

    let settings = &config.data_ingestion;
    let raw_dir = Path::new(DataLayer::Raw.dir());
    create_dir_all(raw_dir).with_context(|| format!("failed to create {}", raw_dir.display()))?;

    let csv_path = download_and_copy_dataset(&settings.dataset_url, raw_dir).await?;
    let rows = load_labeled_comments(&csv_path, &settings.text_column, &settings.stratify_column)?;
    info!("loaded {} labeled comments from {}", rows.len(), csv_path.display());

    let sets = dataset::stratified_split(rows, settings.test_size, settings.val_size, settings.random_state)?;
    info!(
        "split sizes: train={} val={} test={}",
        sets.train.len(),
        sets.val.len(),
        sets.test.len(),
    );

    dataset::write_records(&DataLayer::Raw.path(Split::Train), &sets.train)?;
    dataset::write_records(&DataLayer::Raw.path(Split::Val), &sets.val)?;
    dataset::write_records(&DataLayer::Raw.path(Split::Test), &sets.test)?;
    info!("raw splits written to {}", raw_dir.display());

    Ok(())
}

async fn download_and_copy_dataset(url: &str, raw_dir: &Path) -> Result<PathBuf> {
    info!("downloading dataset archive from {}", url);

    let response = reqwest::get(url).await.context("failed to download dataset archive")?;
    if !response.status().is_success() {
        bail!("dataset download returned status {}", response.status().as_u16());
    }
    let archive_bytes = response.bytes().await.context("failed to read dataset archive body")?;

    let mut archive = zip::ZipArchive::new(Cursor::new(archive_bytes.as_ref()))
        .context("failed to open dataset archive")?;

    let mut csv_files = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).context("failed to read archive entry")?;
        if entry.is_dir() {
            continue;
        }
        let relative = entry.enclosed_name().context("archive entry has an unsafe path")?;
        let destination = raw_dir.join(relative);

        if let Some(parent) = destination.parent() {
            create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut output = File::create(&destination)
            .with_context(|| format!("failed to create {}", destination.display()))?;
        copy(&mut entry, &mut output)
            .with_context(|| format!("failed to extract {}", destination.display()))?;
        info!("extracted {}", destination.display());

        let is_csv = destination.extension()
            .map(|extension| extension.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if is_csv {
            csv_files.push(destination);
        }
    }

    if csv_files.is_empty() {
        bail!("no csv file found in dataset archive");
    }
    if csv_files.len() > 1 {
        warn!(
            "multiple csv files found, defaulting to {} and ignoring: {:?}",
            csv_files[0].display(),
            &csv_files[1..],
        );
    }
    Ok(csv_files.remove(0))
}

fn load_labeled_comments(path: &Path, text_column: &str, label_column: &str) -> Result<Vec<RawComment>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let headers = reader.headers().context("failed to read csv headers")?.clone();
    let text_index = headers.iter().position(|header| header == text_column)
        .with_context(|| format!("column {} not found in {}", text_column, path.display()))?;
    let label_index = headers.iter().position(|header| header == label_column)
        .with_context(|| format!("column {} not found in {}", label_column, path.display()))?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("failed to parse record in {}", path.display()))?;
        let comment = record.get(text_index).unwrap_or("").trim();
        if comment.is_empty() {
            continue;
        }
        let label = record.get(label_index).unwrap_or("");
        rows.push(RawComment {
            comment: comment.to_owned(),
            category: Label::parse(label)?,
        });
    }
    Ok(rows)
}
