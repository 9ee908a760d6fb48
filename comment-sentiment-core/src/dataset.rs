use {
    std::{fmt, fs::create_dir_all, path::{Path, PathBuf}},
    anyhow::{anyhow, bail, Context, Result},
    rand::{rngs::StdRng, seq::SliceRandom, SeedableRng},
    serde::{de::{self, Visitor}, Deserialize, Deserializer, Serialize, Serializer},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Label {
    Negative,
    Neutral,
    Positive,
}

impl Label {
    pub const ALL: [Label; 3] = [Label::Negative, Label::Neutral, Label::Positive];

    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "-1" | "negative" => Ok(Label::Negative),
            "0" | "neutral" => Ok(Label::Neutral),
            "1" | "positive" => Ok(Label::Positive),
            other => Err(anyhow!("unknown sentiment label: {}", other)),
        }
    }

    pub fn to_index(self) -> usize {
        match self {
            Label::Negative => 0,
            Label::Neutral => 1,
            Label::Positive => 2,
        }
    }

    pub fn from_index(index: usize) -> Result<Self> {
        Label::ALL.get(index).copied().context("label index out of range")
    }

    pub fn as_i8(self) -> i8 {
        match self {
            Label::Negative => -1,
            Label::Neutral => 0,
            Label::Positive => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Label::Negative => "negative",
            Label::Neutral => "neutral",
            Label::Positive => "positive",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// persisted as the original -1/0/1 encoding, parsed back from either encoding
impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.as_i8())
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LabelVisitor;

        impl<'de> Visitor<'de> for LabelVisitor {
            type Value = Label;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a sentiment label (-1/0/1 or negative/neutral/positive)")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Label, E> {
                Label::parse(&v.to_string()).map_err(de::Error::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Label, E> {
                Label::parse(&v.to_string()).map_err(de::Error::custom)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Label, E> {
                Label::parse(v).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_any(LabelVisitor)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RawComment {
    pub comment: String,
    pub category: Label,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ProcessedComment {
    pub clean_comment: String,
    pub category: Label,
    pub word_count: u32,
    pub num_stop_words: u32,
    pub num_chars: u32,
    pub num_chars_cleaned: u32,
}

impl RawComment {
    pub fn with_features(
        self,
        clean_comment: String,
        word_count: u32,
        num_stop_words: u32,
        num_chars: u32,
        num_chars_cleaned: u32,
    ) -> ProcessedComment {
        ProcessedComment {
            clean_comment,
            category: self.category,
            word_count,
            num_stop_words,
            num_chars,
            num_chars_cleaned,
        }
    }
}

impl ProcessedComment {
    // fixed numeric column order, appended after the tf-idf columns
    pub fn numeric_values(&self) -> [f32; 4] {
        [
            self.word_count as f32,
            self.num_stop_words as f32,
            self.num_chars as f32,
            self.num_chars_cleaned as f32,
        ]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Split {
    Train,
    Val,
    Test,
}

impl Split {
    pub const ALL: [Split; 3] = [Split::Train, Split::Val, Split::Test];

    pub fn name(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Val => "val",
            Split::Test => "test",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataLayer {
    Raw,
    Interim,
}

impl DataLayer {
    pub fn dir(self) -> &'static str {
        match self {
            DataLayer::Raw => "data/raw",
            DataLayer::Interim => "data/interim",
        }
    }

    pub fn file_name(self, split: Split) -> String {
        match self {
            DataLayer::Raw => format!("{}.csv", split.name()),
            DataLayer::Interim => format!("{}_processed.csv", split.name()),
        }
    }

    pub fn path(self, split: Split) -> PathBuf {
        Path::new(self.dir()).join(self.file_name(split))
    }
}

pub fn write_records<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to open {} for writing", path.display()))?;
    for row in rows {
        writer.serialize(row).with_context(|| format!("failed to write record to {}", path.display()))?;
    }
    writer.flush().with_context(|| format!("failed to flush {}", path.display()))?;
    Ok(())
}

pub fn read_records<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        rows.push(record.with_context(|| format!("failed to parse record in {}", path.display()))?);
    }
    Ok(rows)
}

#[derive(Debug)]
pub struct SplitSets {
    pub train: Vec<RawComment>,
    pub val: Vec<RawComment>,
    pub test: Vec<RawComment>,
}

/// Stratified train/val/test partitioning, deterministic for a given seed.
///
/// Per class: `round(count * test_size)` rows go to test, `round(count *
/// val_size)` to val, the remainder to train. Errors if any class present in
/// the data cannot place at least one row in every partition.
pub fn stratified_split(rows: Vec<RawComment>, test_size: f64, val_size: f64, seed: u64) -> Result<SplitSets> {
    if test_size <= 0.0 || val_size <= 0.0 || test_size + val_size >= 1.0 {
        bail!("invalid split ratios: test_size={}, val_size={}", test_size, val_size);
    }

    let mut by_label: Vec<Vec<usize>> = vec![Vec::new(); Label::ALL.len()];
    for (index, row) in rows.iter().enumerate() {
        by_label[row.category.to_index()].push(index);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut assignment = vec![Split::Train; rows.len()];

    for (class_index, indices) in by_label.iter_mut().enumerate() {
        if indices.is_empty() {
            continue;
        }

        let count = indices.len();
        let n_test = (count as f64 * test_size).round() as usize;
        let n_val = (count as f64 * val_size).round() as usize;
        if n_test == 0 || n_val == 0 || n_test + n_val >= count {
            bail!(
                "class {} has too few rows ({}) to appear in every split",
                Label::from_index(class_index)?,
                count,
            );
        }

        indices.shuffle(&mut rng);
        for &index in indices[..n_test].iter() {
            assignment[index] = Split::Test;
        }
        for &index in indices[n_test..n_test + n_val].iter() {
            assignment[index] = Split::Val;
        }
    }

    let mut sets = SplitSets {
        train: Vec::new(),
        val: Vec::new(),
        test: Vec::new(),
    };
    for (row, split) in rows.into_iter().zip(assignment) {
        match split {
            Split::Train => sets.train.push(row),
            Split::Val => sets.val.push(row),
            Split::Test => sets.test.push(row),
        }
    }
    Ok(sets)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labeled_rows(per_class: usize) -> Vec<RawComment> {
        let mut rows = Vec::new();
        for label in Label::ALL {
            for i in 0..per_class {
                rows.push(RawComment {
                    comment: format!("{} comment {}", label, i),
                    category: label,
                });
            }
        }
        rows
    }

    fn class_count(rows: &[RawComment], label: Label) -> usize {
        rows.iter().filter(|r| r.category == label).count()
    }

    #[test]
    fn label_parses_both_encodings() {
        assert_eq!(Label::parse("-1").unwrap(), Label::Negative);
        assert_eq!(Label::parse("0").unwrap(), Label::Neutral);
        assert_eq!(Label::parse("Positive").unwrap(), Label::Positive);
        assert!(Label::parse("great").is_err());
    }

    #[test]
    fn split_is_disjoint_and_exhaustive() {
        let rows = labeled_rows(40);
        let total = rows.len();
        let sets = stratified_split(rows, 0.2, 0.1, 42).unwrap();

        assert_eq!(sets.train.len() + sets.val.len() + sets.test.len(), total);

        let mut comments: Vec<&str> = sets.train.iter()
            .chain(sets.val.iter())
            .chain(sets.test.iter())
            .map(|r| r.comment.as_str())
            .collect();
        comments.sort();
        comments.dedup();
        assert_eq!(comments.len(), total);
    }

    #[test]
    fn split_preserves_class_proportions() {
        let rows = labeled_rows(100);
        let sets = stratified_split(rows, 0.2, 0.1, 42).unwrap();

        for label in Label::ALL {
            for (set, expected) in [(&sets.train, 70), (&sets.val, 10), (&sets.test, 20)] {
                assert_eq!(class_count(set, label), expected);
            }
        }
    }

    #[test]
    fn split_is_deterministic_for_a_seed() {
        let first = stratified_split(labeled_rows(30), 0.2, 0.1, 7).unwrap();
        let second = stratified_split(labeled_rows(30), 0.2, 0.1, 7).unwrap();

        let comments = |set: &[RawComment]| set.iter().map(|r| r.comment.clone()).collect::<Vec<_>>();
        assert_eq!(comments(&first.train), comments(&second.train));
        assert_eq!(comments(&first.val), comments(&second.val));
        assert_eq!(comments(&first.test), comments(&second.test));
    }

    #[test]
    fn split_rejects_class_too_small_for_every_partition() {
        let mut rows = labeled_rows(50);
        rows.retain(|r| r.category != Label::Neutral);
        rows.push(RawComment { comment: "meh".to_owned(), category: Label::Neutral });
        rows.push(RawComment { comment: "fine".to_owned(), category: Label::Neutral });

        let err = stratified_split(rows, 0.2, 0.1, 42).unwrap_err();
        assert!(err.to_string().contains("neutral"));
    }

    #[test]
    fn split_rejects_invalid_ratios() {
        assert!(stratified_split(labeled_rows(10), 0.7, 0.3, 42).is_err());
        assert!(stratified_split(labeled_rows(10), 0.0, 0.1, 42).is_err());
    }

    #[test]
    fn layer_file_names() {
        assert_eq!(DataLayer::Raw.file_name(Split::Train), "train.csv");
        assert_eq!(DataLayer::Raw.file_name(Split::Val), "val.csv");
        assert_eq!(DataLayer::Interim.file_name(Split::Test), "test_processed.csv");
        assert_eq!(DataLayer::Interim.path(Split::Train), Path::new("data/interim/train_processed.csv"));
    }

    #[test]
    fn records_round_trip_through_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.csv");
        let rows = labeled_rows(2);

        write_records(&path, &rows).unwrap();
        let loaded: Vec<RawComment> = read_records(&path).unwrap();

        assert_eq!(loaded.len(), rows.len());
        assert_eq!(loaded[0].comment, rows[0].comment);
        assert_eq!(loaded[0].category, rows[0].category);
    }
}
