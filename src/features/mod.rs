// SPDX-License-Identifier: PMPL-1.0-or-later

//! Feature extraction
//!
//! The vectorizer is fit once per corpus snapshot and persisted. Every later
//! transform (training split, test split, single-file inference) replays
//! that exact state; nothing downstream refits.

pub mod matrix;
pub mod tfidf;

pub use matrix::FeatureMatrix;
pub use tfidf::TfidfVectorizer;

use crate::config::PipelineConfig;
use crate::corpus::store;
use crate::storage::ArtifactPaths;
use anyhow::Result;
use std::collections::BTreeMap;

/// Text to fixed-width numeric row
pub trait Featurizer {
    fn width(&self) -> usize;
    fn featurize(&self, text: &str) -> Vec<f64>;
}

#[derive(Debug, Clone)]
pub struct FeatureBuild {
    pub samples: usize,
    pub columns: usize,
    pub fingerprint: String,
    pub label_counts: BTreeMap<String, usize>,
}

/// Fit the vectorizer on the corpus artifact, write the feature matrix and
/// the fitted vectorizer
pub fn make_features(config: &PipelineConfig) -> Result<FeatureBuild> {
    let paths = ArtifactPaths::from_config(config);
    let samples = store::read_samples(&paths.samples)?;

    let texts: Vec<&str> = samples.iter().map(|s| s.code.as_str()).collect();
    let labels: Vec<String> = samples.iter().map(|s| s.label.clone()).collect();

    let vectorizer = TfidfVectorizer::fit(&texts, &config.vectorizer)?;
    let matrix = vectorizer.transform(&texts, labels);

    matrix.write_csv(&paths.features)?;
    vectorizer.save(&paths.vectorizer)?;

    Ok(FeatureBuild {
        samples: matrix.len(),
        columns: matrix.columns,
        fingerprint: vectorizer.fingerprint(),
        label_counts: matrix.label_counts(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VectorizerConfig;

    #[test]
    fn test_transform_is_deterministic() {
        let texts = [
            "query = 'select * from users where id=' + uid",
            "cursor.execute('select * from users where id = ?', (uid,))",
            "os.system('ls ' + filename)",
        ];
        let params = VectorizerConfig {
            max_features: 50,
            min_df: 1,
            ngram_max: 2,
        };
        let v = TfidfVectorizer::fit(&texts, &params).unwrap();
        let first = v.transform(&texts, vec![String::new(); 3]);
        let second = v.transform(&texts, vec![String::new(); 3]);
        assert_eq!(first.len(), texts.len());
        assert!(first.rows.iter().all(|r| r.len() == first.columns));
        assert_eq!(first, second);
        assert_eq!(v.featurize(texts[2]), first.rows[2]);
    }
}
