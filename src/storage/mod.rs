// SPDX-License-Identifier: PMPL-1.0-or-later

//! Persistent storage helpers for pipeline artifacts
//!
//! Each stage writes its artifact to a sibling temp file and renames it into
//! place only once the write completed, so an aborted run leaves the
//! previous artifact intact.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const SAMPLES_FILE: &str = "samples.csv";
pub const FEATURES_FILE: &str = "features_tfidf.csv";
pub const VECTORIZER_FILE: &str = "vectorizer.json";
pub const CLASSIFIER_FILE: &str = "classifier.json";

/// Conventional artifact locations for one configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub samples: PathBuf,
    pub features: PathBuf,
    pub vectorizer: PathBuf,
    pub classifier: PathBuf,
}

impl ArtifactPaths {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            samples: config.dataset_dir.join(SAMPLES_FILE),
            features: config.dataset_dir.join("features").join(FEATURES_FILE),
            vectorizer: config.models_dir.join(VECTORIZER_FILE),
            classifier: config.models_dir.join(CLASSIFIER_FILE),
        }
    }
}

/// Write `content` to `path`, creating parent directories
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    write_atomic_with(path, |tmp| {
        fs::write(tmp, content).with_context(|| format!("writing {}", tmp.display()))
    })
}

/// Let `write` fill a temp file next to `path`, then move it into place
pub fn write_atomic_with<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&Path) -> Result<()>,
{
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "artifact".to_string());
    let tmp = path.with_file_name(format!(".{}.partial", file_name));

    if let Err(e) = write(&tmp) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    fs::rename(&tmp, path)
        .with_context(|| format!("moving {} into {}", tmp.display(), path.display()))?;
    tracing::info!(path = %path.display(), "artifact written");
    Ok(())
}

/// Fail with `ArtifactMissing` unless `path` is an existing file
pub fn require(path: &Path, artifact: &str, hint: &str) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(PipelineError::missing(artifact, path, hint).into())
    }
}
