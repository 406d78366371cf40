// SPDX-License-Identifier: PMPL-1.0-or-later

//! TF-IDF vectorizer over word 1..n-grams
//!
//! Tokens are runs of two or more word characters in the lower-cased text.
//! Weights are raw term counts times the smoothed inverse document
//! frequency `ln((1 + n) / (1 + df)) + 1`, and each row is scaled to unit
//! L2 norm. Columns are the retained terms in alphabetical order.

use crate::config::VectorizerConfig;
use crate::error::PipelineError;
use crate::storage;
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use super::{FeatureMatrix, Featurizer};

pub const ARTIFACT: &str = "vectorizer";

static TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w\w+\b").unwrap());

/// Fitted vectorizer state. Immutable once fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    params: VectorizerConfig,
    n_documents: usize,
    /// term -> column index
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    pub fn fit<S: AsRef<str>>(texts: &[S], params: &VectorizerConfig) -> Result<Self> {
        if texts.is_empty() {
            return Err(PipelineError::InsufficientData {
                detail: "cannot fit a vectorizer on zero documents".to_string(),
            }
            .into());
        }
        let ngram_max = params.ngram_max.max(1);

        let mut document_frequency: HashMap<String, usize> = HashMap::new();
        let mut corpus_frequency: HashMap<String, usize> = HashMap::new();
        for text in texts {
            for (term, count) in term_counts(text.as_ref(), ngram_max) {
                *document_frequency.entry(term.clone()).or_insert(0) += 1;
                *corpus_frequency.entry(term).or_insert(0) += count;
            }
        }

        let mut candidates: Vec<(String, usize)> = corpus_frequency
            .into_iter()
            .filter(|(term, _)| document_frequency.get(term).copied().unwrap_or(0) >= params.min_df)
            .collect();
        candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        candidates.truncate(params.max_features);

        if candidates.is_empty() {
            return Err(PipelineError::InsufficientData {
                detail: format!(
                    "no term occurs in at least {} of {} documents",
                    params.min_df,
                    texts.len()
                ),
            }
            .into());
        }

        let mut terms: Vec<String> = candidates.into_iter().map(|(term, _)| term).collect();
        terms.sort();

        let n = texts.len() as f64;
        let idf = terms
            .iter()
            .map(|term| {
                let df = document_frequency.get(term).copied().unwrap_or(0) as f64;
                ((1.0 + n) / (1.0 + df)).ln() + 1.0
            })
            .collect();
        let vocabulary = terms
            .into_iter()
            .enumerate()
            .map(|(column, term)| (term, column))
            .collect();

        tracing::info!(documents = texts.len(), "vectorizer fit");
        Ok(Self {
            params: params.clone(),
            n_documents: texts.len(),
            vocabulary,
            idf,
        })
    }

    pub fn transform<S: AsRef<str>>(&self, texts: &[S], labels: Vec<String>) -> FeatureMatrix {
        FeatureMatrix {
            columns: self.vocabulary_len(),
            rows: texts.iter().map(|t| self.transform_one(t.as_ref())).collect(),
            labels,
        }
    }

    pub fn transform_one(&self, text: &str) -> Vec<f64> {
        let mut row = vec![0.0; self.idf.len()];
        for (term, count) in term_counts(text, self.params.ngram_max.max(1)) {
            if let Some(&column) = self.vocabulary.get(&term) {
                row[column] = count as f64 * self.idf[column];
            }
        }
        let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for v in &mut row {
                *v /= norm;
            }
        }
        row
    }

    pub fn vocabulary_len(&self) -> usize {
        self.idf.len()
    }

    pub fn n_documents(&self) -> usize {
        self.n_documents
    }

    pub fn params(&self) -> &VectorizerConfig {
        &self.params
    }

    /// Terms in column order
    pub fn terms(&self) -> Vec<&str> {
        let mut terms: Vec<(&str, usize)> = self
            .vocabulary
            .iter()
            .map(|(t, c)| (t.as_str(), *c))
            .collect();
        terms.sort_by_key(|(_, c)| *c);
        terms.into_iter().map(|(t, _)| t).collect()
    }

    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    /// SHA-256 over the canonical JSON of the fitted state
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&canonical))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        storage::write_atomic(path, json.as_bytes())
    }

    pub fn load(path: &Path) -> Result<Self> {
        storage::require(path, ARTIFACT, "run `vulnsift features` first")?;
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let vectorizer: TfidfVectorizer = serde_json::from_str(&raw)
            .map_err(|e| PipelineError::schema(ARTIFACT, e.to_string()))?;
        if vectorizer.vocabulary.len() != vectorizer.idf.len() {
            return Err(PipelineError::schema(
                ARTIFACT,
                format!(
                    "{} vocabulary terms but {} idf weights",
                    vectorizer.vocabulary.len(),
                    vectorizer.idf.len()
                ),
            )
            .into());
        }
        Ok(vectorizer)
    }
}

impl Featurizer for TfidfVectorizer {
    fn width(&self) -> usize {
        self.vocabulary_len()
    }

    fn featurize(&self, text: &str) -> Vec<f64> {
        self.transform_one(text)
    }
}

/// Lower-cased tokens of `text`
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Counts of every 1..=`ngram_max` gram, grams joined by a single space
fn term_counts(text: &str, ngram_max: usize) -> HashMap<String, usize> {
    let tokens = tokenize(text);
    let mut counts = HashMap::new();
    for n in 1..=ngram_max {
        for window in tokens.windows(n) {
            *counts.entry(window.join(" ")).or_insert(0) += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(max_features: usize, min_df: usize) -> VectorizerConfig {
        VectorizerConfig {
            max_features,
            min_df,
            ngram_max: 2,
        }
    }

    #[test]
    fn test_tokenize_drops_single_chars() {
        assert_eq!(
            tokenize("SELECT * FROM t WHERE id = 1;"),
            vec!["select", "from", "where", "id"]
        );
    }

    #[test]
    fn test_bigrams_and_min_df() {
        let texts = ["select name from users", "select id from users", "print hello"];
        let v = TfidfVectorizer::fit(&texts, &params(100, 2)).unwrap();
        assert_eq!(v.terms(), vec!["from", "from users", "select", "users"]);
    }

    #[test]
    fn test_max_features_keeps_most_frequent() {
        let texts = ["aa aa aa bb", "aa bb cc", "cc aa"];
        let unigrams = VectorizerConfig {
            max_features: 2,
            min_df: 1,
            ngram_max: 1,
        };
        let v = TfidfVectorizer::fit(&texts, &unigrams).unwrap();
        // aa: 5, bb: 2, cc: 2, ties broken alphabetically
        assert_eq!(v.terms(), vec!["aa", "bb"]);
    }

    #[test]
    fn test_idf_smoothing() {
        let texts = ["alpha beta", "alpha gamma"];
        let v = TfidfVectorizer::fit(
            &texts,
            &VectorizerConfig {
                max_features: 10,
                min_df: 1,
                ngram_max: 1,
            },
        )
        .unwrap();
        assert_eq!(v.terms(), vec!["alpha", "beta", "gamma"]);
        assert!((v.idf()[0] - 1.0).abs() < 1e-12);
        let rare = (3.0f64 / 2.0).ln() + 1.0;
        assert!((v.idf()[1] - rare).abs() < 1e-12);
    }

    #[test]
    fn test_rows_are_unit_norm() {
        let texts = ["select from users", "select from orders", "users orders"];
        let v = TfidfVectorizer::fit(&texts, &params(50, 1)).unwrap();
        for text in texts {
            let row = v.transform_one(text);
            let norm: f64 = row.iter().map(|x| x * x).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-9);
        }
        assert!(v.transform_one("nothing known").iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_no_surviving_terms_is_insufficient_data() {
        let texts = ["one thing", "another item"];
        let err = TfidfVectorizer::fit(&texts, &params(10, 2)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_fingerprint_tracks_fitted_state() {
        let a = TfidfVectorizer::fit(&["aa bb", "aa cc"], &params(10, 1)).unwrap();
        let b = TfidfVectorizer::fit(&["aa bb", "aa cc"], &params(10, 1)).unwrap();
        let c = TfidfVectorizer::fit(&["aa bb", "aa dd"], &params(10, 1)).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_save_then_load_is_identical() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("models/vectorizer.json");
        let texts = [
            "SELECT name FROM users WHERE id = $id",
            "document.getElementById('out').innerHTML = location.hash",
            "os.system('ping ' + host)",
            "open('../../etc/passwd').read()",
            "pickle.loads(request.body)",
            "hashlib.md5(password).hexdigest()",
            "def total(values): return sum(values)",
        ];
        let fitted = TfidfVectorizer::fit(&texts, &params(50, 1)).unwrap();
        fitted.save(&path).unwrap();

        let back = TfidfVectorizer::load(&path).unwrap();
        assert_eq!(back, fitted);
        assert_eq!(back.fingerprint(), fitted.fingerprint());
        let bits = |v: &TfidfVectorizer| v.idf().iter().map(|w| w.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&back), bits(&fitted));
    }
}
