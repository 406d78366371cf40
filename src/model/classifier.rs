// SPDX-License-Identifier: PMPL-1.0-or-later

//! Multi-class boosted-tree classifier
//!
//! One binary `gbdt` ensemble per class (one-vs-rest, log-likelihood loss).
//! Rows are weighted by the balanced class weight `n / (k * n_c)`. The
//! per-class scores are normalised into a distribution over `classes`.

use crate::config::TrainerConfig;
use crate::error::PipelineError;
use crate::features::FeatureMatrix;
use crate::storage;
use anyhow::{Context, Result};
use gbdt::config::Config;
use gbdt::decision_tree::Data;
use gbdt::gradient_boost::GBDT;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const ARTIFACT: &str = "classifier";

/// Anything that maps a feature row to a distribution over labels
pub trait Classifier {
    /// Label vocabulary, in the order of `predict_proba` output
    fn classes(&self) -> &[String];

    fn predict_proba(&self, row: &[f64]) -> Vec<f64>;

    fn predict(&self, row: &[f64]) -> String {
        let proba = self.predict_proba(row);
        let mut best = 0;
        for (i, p) in proba.iter().enumerate() {
            if *p > proba[best] {
                best = i;
            }
        }
        self.classes().get(best).cloned().unwrap_or_default()
    }
}

#[derive(Serialize, Deserialize)]
pub struct BoostedClassifier {
    classes: Vec<String>,
    feature_count: usize,
    vectorizer_fingerprint: String,
    /// RFC 3339 timestamp of the fit
    #[serde(default)]
    trained_at: String,
    models: Vec<GBDT>,
}

impl std::fmt::Debug for BoostedClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoostedClassifier")
            .field("classes", &self.classes)
            .field("feature_count", &self.feature_count)
            .field("vectorizer_fingerprint", &self.vectorizer_fingerprint)
            .field("trained_at", &self.trained_at)
            .finish_non_exhaustive()
    }
}

fn to_f32(row: &[f64]) -> Vec<f32> {
    row.iter().map(|v| *v as f32).collect()
}

fn booster_config(features: usize, params: &TrainerConfig) -> Config {
    let mut cfg = Config::new();
    cfg.set_feature_size(features);
    cfg.set_max_depth(params.max_depth);
    cfg.set_iterations(params.n_trees);
    cfg.set_shrinkage(params.learning_rate as f32);
    cfg.set_loss("LogLikelyhood");
    cfg.set_debug(false);
    cfg.set_training_optimization_level(2);
    cfg.set_min_leaf_size(params.min_leaf_size.max(1));
    cfg.set_data_sample_ratio(1.0);
    cfg.set_feature_sample_ratio(1.0);
    cfg
}

impl BoostedClassifier {
    pub fn fit(
        matrix: &FeatureMatrix,
        params: &TrainerConfig,
        vectorizer_fingerprint: &str,
    ) -> Result<Self> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for label in &matrix.labels {
            *counts.entry(label.as_str()).or_insert(0) += 1;
        }
        if counts.len() < 2 {
            return Err(PipelineError::InsufficientData {
                detail: format!(
                    "training needs at least two classes, found {}",
                    counts.len()
                ),
            }
            .into());
        }

        let n = matrix.len() as f64;
        let k = counts.len() as f64;
        let weights: BTreeMap<&str, f32> = counts
            .iter()
            .map(|(label, c)| (*label, (n / (k * *c as f64)) as f32))
            .collect();
        let classes: Vec<String> = counts.keys().map(|l| l.to_string()).collect();
        let rows: Vec<Vec<f32>> = matrix.rows.iter().map(|r| to_f32(r)).collect();

        let models: Vec<GBDT> = classes
            .par_iter()
            .map(|class| {
                let cfg = booster_config(matrix.columns, params);
                let mut model = GBDT::new(&cfg);
                let mut data: Vec<Data> = rows
                    .iter()
                    .zip(&matrix.labels)
                    .map(|(row, label)| {
                        let target = if label == class { 1.0 } else { -1.0 };
                        let weight = weights.get(label.as_str()).copied().unwrap_or(1.0);
                        Data::new_training_data(row.clone(), weight, target, None)
                    })
                    .collect();
                model.fit(&mut data);
                tracing::debug!(class = %class, "one-vs-rest model fit");
                model
            })
            .collect();

        Ok(Self {
            classes,
            feature_count: matrix.columns,
            vectorizer_fingerprint: vectorizer_fingerprint.to_string(),
            trained_at: chrono::Utc::now().to_rfc3339(),
            models,
        })
    }

    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    pub fn vectorizer_fingerprint(&self) -> &str {
        &self.vectorizer_fingerprint
    }

    pub fn trained_at(&self) -> &str {
        &self.trained_at
    }

    /// Fails unless this classifier was trained on features from the
    /// vectorizer with `fingerprint`
    pub fn check_pairing(&self, fingerprint: &str) -> Result<()> {
        if self.vectorizer_fingerprint == fingerprint {
            Ok(())
        } else {
            Err(PipelineError::FingerprintMismatch {
                expected: self.vectorizer_fingerprint.clone(),
                found: fingerprint.to_string(),
            }
            .into())
        }
    }

    pub fn predict_matrix(&self, matrix: &FeatureMatrix) -> Vec<String> {
        matrix.rows.iter().map(|row| self.predict(row)).collect()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string(self)?;
        storage::write_atomic(path, json.as_bytes())
    }

    pub fn load(path: &Path) -> Result<Self> {
        storage::require(path, ARTIFACT, "run `vulnsift train` first")?;
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let classifier: BoostedClassifier = serde_json::from_str(&raw)
            .map_err(|e| PipelineError::schema(ARTIFACT, e.to_string()))?;
        if classifier.classes.len() != classifier.models.len() {
            return Err(PipelineError::schema(
                ARTIFACT,
                format!(
                    "{} classes but {} models",
                    classifier.classes.len(),
                    classifier.models.len()
                ),
            )
            .into());
        }
        Ok(classifier)
    }
}

impl Classifier for BoostedClassifier {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        let data = vec![Data::new_test_data(to_f32(row), None)];
        let scores: Vec<f64> = self
            .models
            .iter()
            .map(|m| m.predict(&data).first().copied().unwrap_or(0.0) as f64)
            .map(|p| if p.is_finite() { p.max(0.0) } else { 0.0 })
            .collect();
        normalize(scores)
    }
}

/// Scale to sum 1; all-zero input becomes uniform
pub fn normalize(mut scores: Vec<f64>) -> Vec<f64> {
    let sum: f64 = scores.iter().sum();
    if sum > 0.0 {
        for s in &mut scores {
            *s /= sum;
        }
    } else if !scores.is_empty() {
        let uniform = 1.0 / scores.len() as f64;
        scores.iter_mut().for_each(|s| *s = uniform);
    }
    scores
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_matrix() -> FeatureMatrix {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..12 {
            let jitter = i as f64 * 0.01;
            rows.push(vec![1.0 - jitter, jitter, 0.0]);
            labels.push("sqli".to_string());
            rows.push(vec![jitter, 1.0 - jitter, 0.0]);
            labels.push("xss".to_string());
            rows.push(vec![0.0, jitter, 1.0 - jitter]);
            labels.push("safe".to_string());
        }
        FeatureMatrix {
            columns: 3,
            rows,
            labels,
        }
    }

    fn small_params() -> TrainerConfig {
        TrainerConfig {
            n_trees: 20,
            max_depth: 3,
            ..TrainerConfig::default()
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(vec![1.0, 3.0]), vec![0.25, 0.75]);
        assert_eq!(normalize(vec![0.0, 0.0]), vec![0.5, 0.5]);
    }

    #[test]
    fn test_fit_separable_classes() {
        let matrix = toy_matrix();
        let clf = BoostedClassifier::fit(&matrix, &small_params(), "abc").unwrap();
        assert_eq!(clf.classes(), &["safe", "sqli", "xss"]);

        let proba = clf.predict_proba(&[0.95, 0.05, 0.0]);
        assert_eq!(proba.len(), 3);
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert_eq!(clf.predict(&[0.95, 0.05, 0.0]), "sqli");
        assert_eq!(clf.predict(&[0.0, 0.05, 0.95]), "safe");
    }

    #[test]
    fn test_single_class_rejected() {
        let matrix = FeatureMatrix {
            columns: 1,
            rows: vec![vec![1.0], vec![0.5]],
            labels: vec!["safe".into(), "safe".into()],
        };
        assert!(BoostedClassifier::fit(&matrix, &small_params(), "x").is_err());
    }

    #[test]
    fn test_pairing_check() {
        let clf = BoostedClassifier::fit(&toy_matrix(), &small_params(), "abc").unwrap();
        assert!(clf.check_pairing("abc").is_ok());
        let err = clf.check_pairing("def").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::FingerprintMismatch { .. })
        ));
    }
}
