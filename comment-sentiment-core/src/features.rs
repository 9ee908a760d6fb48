use {
    std::{collections::HashMap, fs, path::Path},
    anyhow::{bail, Context, Result},
    serde::{Serialize, Deserialize},
    crate::dataset::{ProcessedComment, RawComment},
};

// numeric feature columns, always appended after the tf-idf columns in this order
pub const NUMERIC_FEATURES: [&str; 4] = ["word_count", "num_stop_words", "num_chars", "num_chars_cleaned"];

const STOP_WORDS: [&str; 60] = [
    "a", "about", "an", "and", "are", "as", "at", "be", "been", "but",
    "by", "can", "did", "do", "does", "for", "from", "had", "has", "have",
    "he", "her", "his", "i", "if", "in", "is", "it", "its", "just",
    "me", "my", "of", "on", "or", "our", "she", "so", "that", "the",
    "their", "them", "they", "this", "to", "was", "we", "were", "what", "when",
    "which", "who", "will", "with", "would", "you", "your", "there", "then", "than",
];

fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_owned())
        .collect()
}

/// Normalizes a raw comment: lowercase, URLs and newlines stripped, only
/// alphanumerics and basic punctuation kept, whitespace collapsed.
pub fn preprocess_comment(text: &str) -> String {
    let without_urls: Vec<&str> = text.split_whitespace()
        .filter(|token| {
            let token = token.to_lowercase();
            !token.starts_with("http://") && !token.starts_with("https://") && !token.starts_with("www.")
        })
        .collect();

    let cleaned: String = without_urls.join(" ")
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || matches!(c, '!' | '?' | '.' | ',' | '\''))
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn engineer_features(raw: RawComment) -> ProcessedComment {
    let clean_comment = preprocess_comment(&raw.comment);
    let tokens = tokenize(&raw.comment);

    let word_count = clean_comment.split_whitespace().count() as u32;
    let num_stop_words = tokens.iter().filter(|token| is_stop_word(token)).count() as u32;
    let num_chars = raw.comment.chars().count() as u32;
    let num_chars_cleaned = clean_comment.chars().count() as u32;

    raw.with_features(clean_comment, word_count, num_stop_words, num_chars, num_chars_cleaned)
}

/// Bag-of-n-grams vectorizer with smoothed idf weighting and L2-normalized
/// rows. Fit only on the training partition; the persisted state is reused
/// unmodified everywhere else so column order stays identical across stages.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TfidfVectorizer {
    ngram_min: usize,
    ngram_max: usize,
    max_features: usize,
    // sorted, term index = column index
    vocabulary: Vec<String>,
    idf: Vec<f32>,
}

impl TfidfVectorizer {
    pub fn fit(documents: &[String], ngram_range: (usize, usize), max_features: usize) -> Result<Self> {
        let (ngram_min, ngram_max) = ngram_range;
        if ngram_min == 0 || ngram_min > ngram_max {
            bail!("invalid ngram range: ({}, {})", ngram_min, ngram_max);
        }
        if max_features == 0 {
            bail!("max_features must be positive");
        }
        if documents.is_empty() {
            bail!("cannot fit vectorizer on an empty corpus");
        }

        let mut corpus_counts: HashMap<String, u64> = HashMap::new();
        let mut document_counts: HashMap<String, u64> = HashMap::new();
        for document in documents {
            let terms = ngrams(document, ngram_min, ngram_max);
            for term in &terms {
                *corpus_counts.entry(term.clone()).or_insert(0) += 1;
            }
            let mut seen: Vec<&String> = terms.iter().collect();
            seen.sort();
            seen.dedup();
            for term in seen {
                *document_counts.entry(term.clone()).or_insert(0) += 1;
            }
        }

        // top max_features terms by corpus frequency, ties broken by term for determinism
        let mut ranked: Vec<(String, u64)> = corpus_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(max_features);

        let mut vocabulary: Vec<String> = ranked.into_iter().map(|(term, _)| term).collect();
        vocabulary.sort();

        let total_documents = documents.len() as f32;
        let idf = vocabulary.iter()
            .map(|term| {
                let document_frequency = *document_counts.get(term).unwrap_or(&0) as f32;
                ((1.0 + total_documents) / (1.0 + document_frequency)).ln() + 1.0
            })
            .collect();

        Ok(Self {
            ngram_min,
            ngram_max,
            max_features,
            vocabulary,
            idf,
        })
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn transform(&self, documents: &[String]) -> Vec<Vec<f32>> {
        documents.iter().map(|document| self.transform_one(document)).collect()
    }

    fn transform_one(&self, document: &str) -> Vec<f32> {
        let mut row = vec![0.0f32; self.vocabulary.len()];
        for term in ngrams(document, self.ngram_min, self.ngram_max) {
            if let Ok(column) = self.vocabulary.binary_search(&term) {
                row[column] += 1.0;
            }
        }

        for (value, idf) in row.iter_mut().zip(&self.idf) {
            *value *= idf;
        }

        let norm = row.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in row.iter_mut() {
                *value /= norm;
            }
        }
        row
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_vec(self).context("failed to serialize vectorizer")?;
        fs::write(path, serialized).with_context(|| format!("failed to write {}", path.display()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_slice(&raw).with_context(|| format!("failed to parse vectorizer from {}", path.display()))
    }
}

fn ngrams(document: &str, ngram_min: usize, ngram_max: usize) -> Vec<String> {
    let tokens = tokenize(document);
    let mut terms = Vec::new();
    for n in ngram_min..=ngram_max {
        if n > tokens.len() {
            break;
        }
        for window in tokens.windows(n) {
            terms.push(window.join(" "));
        }
    }
    terms
}

/// The feature layout both training and inference must agree on: tf-idf
/// columns in vocabulary order, then the numeric columns in their fixed
/// order. Persisted next to the model so a mismatched input is rejected
/// instead of silently mis-scored.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    pub vocabulary: Vec<String>,
    pub numeric_features: Vec<String>,
}

impl FeatureSchema {
    pub fn for_vectorizer(vectorizer: &TfidfVectorizer) -> Self {
        Self {
            vocabulary: vectorizer.vocabulary().to_vec(),
            numeric_features: NUMERIC_FEATURES.iter().map(|name| name.to_string()).collect(),
        }
    }

    pub fn width(&self) -> usize {
        self.vocabulary.len() + self.numeric_features.len()
    }

    pub fn assemble(&self, text_rows: Vec<Vec<f32>>, comments: &[ProcessedComment]) -> Result<Vec<Vec<f32>>> {
        if text_rows.len() != comments.len() {
            bail!("row count mismatch: {} text rows, {} comments", text_rows.len(), comments.len());
        }
        if self.numeric_features.len() != NUMERIC_FEATURES.len() {
            bail!(
                "schema expects {} numeric features, this build derives {}",
                self.numeric_features.len(),
                NUMERIC_FEATURES.len(),
            );
        }

        let mut matrix = Vec::with_capacity(text_rows.len());
        for (mut row, comment) in text_rows.into_iter().zip(comments) {
            if row.len() != self.vocabulary.len() {
                bail!(
                    "text feature width {} disagrees with schema vocabulary size {}",
                    row.len(),
                    self.vocabulary.len(),
                );
            }
            row.extend(comment.numeric_values());
            matrix.push(row);
        }
        Ok(matrix)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_vec_pretty(self).context("failed to serialize feature schema")?;
        fs::write(path, serialized).with_context(|| format!("failed to write {}", path.display()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_slice(&raw).with_context(|| format!("failed to parse feature schema from {}", path.display()))
    }
}
