// SPDX-License-Identifier: PMPL-1.0-or-later

//! Inference and reporting
//!
//! A `Detector` borrows an already-loaded featurizer and classifier; it
//! never touches disk. `ModelBundle` is the on-disk pair, loaded once per
//! process and validated against each other.

pub mod formatter;
pub mod output;

use crate::config::PipelineConfig;
use crate::corpus::{filter, reference};
use crate::error::PipelineError;
use crate::features::{Featurizer, TfidfVectorizer};
use crate::model::{BoostedClassifier, Classifier};
use crate::storage::ArtifactPaths;
use crate::types::SAFE;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use formatter::ReportFormatter;
pub use output::ReportOutputFormat;

/// Presentation tier of a detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatTier {
    Critical,
    Warning,
    Advisory,
    Clear,
}

impl ThreatTier {
    pub const CRITICAL_CONFIDENCE: f64 = 0.70;
    pub const WARNING_CONFIDENCE: f64 = 0.50;

    /// `safe` is always clear; otherwise the tier follows confidence
    pub fn assess(label: &str, confidence: f64) -> Self {
        if label == SAFE {
            ThreatTier::Clear
        } else if confidence >= Self::CRITICAL_CONFIDENCE {
            ThreatTier::Critical
        } else if confidence >= Self::WARNING_CONFIDENCE {
            ThreatTier::Warning
        } else {
            ThreatTier::Advisory
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassProbability {
    pub label: String,
    pub probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f64,
    /// Every class, highest probability first
    pub distribution: Vec<ClassProbability>,
    /// Reference ids mentioned in the text; informational only
    pub reference_ids: Vec<String>,
    pub tier: ThreatTier,
}

pub struct Detector<'a> {
    featurizer: &'a dyn Featurizer,
    classifier: &'a dyn Classifier,
}

impl<'a> Detector<'a> {
    pub fn new(featurizer: &'a dyn Featurizer, classifier: &'a dyn Classifier) -> Self {
        Self {
            featurizer,
            classifier,
        }
    }

    pub fn detect(&self, text: &str) -> Detection {
        let row = self.featurizer.featurize(text);
        let proba = self.classifier.predict_proba(&row);

        let mut distribution: Vec<ClassProbability> = self
            .classifier
            .classes()
            .iter()
            .zip(proba)
            .map(|(label, probability)| ClassProbability {
                label: label.clone(),
                probability,
            })
            .collect();
        // stable: equal probabilities keep class order
        distribution.sort_by(|a, b| b.probability.total_cmp(&a.probability));

        let (label, confidence) = distribution
            .first()
            .map(|c| (c.label.clone(), c.probability))
            .unwrap_or_default();

        Detection {
            tier: ThreatTier::assess(&label, confidence),
            label,
            confidence,
            distribution,
            reference_ids: reference::find_reference_ids(text),
        }
    }
}

/// Persisted vectorizer and classifier, checked to belong together
#[derive(Debug)]
pub struct ModelBundle {
    pub vectorizer: TfidfVectorizer,
    pub classifier: BoostedClassifier,
}

impl ModelBundle {
    pub fn load(config: &PipelineConfig) -> Result<Self> {
        let paths = ArtifactPaths::from_config(config);
        Self::load_from(&paths.vectorizer, &paths.classifier)
    }

    pub fn load_from(vectorizer: &Path, classifier: &Path) -> Result<Self> {
        let vectorizer = TfidfVectorizer::load(vectorizer)?;
        let classifier = BoostedClassifier::load(classifier)?;
        classifier.check_pairing(&vectorizer.fingerprint())?;
        if classifier.feature_count() != vectorizer.width() {
            return Err(PipelineError::schema(
                crate::model::classifier::ARTIFACT,
                format!(
                    "expects {} features, vectorizer produces {}",
                    classifier.feature_count(),
                    vectorizer.width()
                ),
            )
            .into());
        }
        Ok(Self {
            vectorizer,
            classifier,
        })
    }

    pub fn detector(&self) -> Detector<'_> {
        Detector::new(&self.vectorizer, &self.classifier)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDetection {
    pub path: PathBuf,
    pub size: u64,
    pub detection: Detection,
}

/// Classify one file; undecodable bytes are replaced, never fatal
pub fn classify_file(path: &Path, detector: &Detector<'_>) -> Result<FileDetection> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let text = filter::decode_lossy(&bytes);
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "classifying");
    Ok(FileDetection {
        path: path.to_path_buf(),
        size: bytes.len() as u64,
        detection: detector.detect(&text),
    })
}
