// SPDX-License-Identifier: PMPL-1.0-or-later

//! Pipeline configuration
//!
//! Loaded from a YAML file when one is given, otherwise the defaults
//! reproduce the conventional `dataset/` + `models/` layout.

use crate::types::{LabelMode, SourceKind, SourceSpec};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_FILE_BYTES: u64 = 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub dataset_dir: PathBuf,
    pub models_dir: PathBuf,
    pub max_file_bytes: u64,
    pub sources: Vec<SourceSpec>,
    pub vectorizer: VectorizerConfig,
    pub trainer: TrainerConfig,
    /// Extra reference-id to label entries, merged over the built-in map
    pub reference_labels: BTreeMap<String, String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::rooted(Path::new("."))
    }
}

impl PipelineConfig {
    /// Default layout with every path resolved under `root`
    pub fn rooted(root: &Path) -> Self {
        let dataset = root.join("dataset");
        Self {
            sources: vec![
                SourceSpec::new(
                    dataset.join("github_poc"),
                    SourceKind::GithubPoc,
                    LabelMode::Heuristic,
                ),
                SourceSpec::new(
                    dataset.join("searchsploit"),
                    SourceKind::Searchsploit,
                    LabelMode::Heuristic,
                ),
                SourceSpec::new(
                    dataset.join("real_vulnerabilities"),
                    SourceKind::RealRepos,
                    LabelMode::PathThenHeuristic,
                ),
                SourceSpec::new(
                    dataset.join("safe_code"),
                    SourceKind::SafeCode,
                    LabelMode::Safe,
                ),
                SourceSpec::new(
                    root.join("examples"),
                    SourceKind::Examples,
                    LabelMode::Examples,
                ),
            ],
            dataset_dir: dataset,
            models_dir: root.join("models"),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            vectorizer: VectorizerConfig::default(),
            trainer: TrainerConfig::default(),
            reference_labels: BTreeMap::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: PipelineConfig = serde_yaml::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Load `path` if given, otherwise fall back to defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorizerConfig {
    pub max_features: usize,
    pub min_df: usize,
    pub ngram_max: usize,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            max_features: 5000,
            min_df: 2,
            ngram_max: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub test_fraction: f64,
    pub seed: u64,
    pub n_trees: usize,
    pub max_depth: u32,
    pub learning_rate: f64,
    pub min_leaf_size: usize,
    pub cv_folds: usize,
    /// Cross-validation only runs when the train split is smaller than this
    pub cv_max_train_samples: usize,
    pub warn_min_samples: usize,
    pub recommend_min_samples: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
            n_trees: 200,
            max_depth: 8,
            learning_rate: 0.1,
            min_leaf_size: 1,
            cv_folds: 5,
            cv_max_train_samples: 1000,
            warn_min_samples: 5,
            recommend_min_samples: 15,
        }
    }
}
