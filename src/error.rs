// SPDX-License-Identifier: PMPL-1.0-or-later

//! Fatal pipeline conditions
//!
//! Per-file problems never show up here; they are counted by the corpus
//! builder. These variants abort the current stage and tell the operator
//! which earlier stage to re-run.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no samples were produced from any source; {hint}")]
    CorpusEmpty { hint: String },

    #[error("{artifact} has an invalid layout: {detail}")]
    Schema { artifact: String, detail: String },

    #[error("{artifact} not found at {}; {hint}", path.display())]
    ArtifactMissing {
        artifact: String,
        path: PathBuf,
        hint: String,
    },

    #[error(
        "classifier was trained against vectorizer {expected} but the loaded vectorizer is {found}; re-run `vulnsift train`"
    )]
    FingerprintMismatch { expected: String, found: String },

    #[error("not enough data: {detail}")]
    InsufficientData { detail: String },
}

impl PipelineError {
    pub fn schema(artifact: impl Into<String>, detail: impl Into<String>) -> Self {
        PipelineError::Schema {
            artifact: artifact.into(),
            detail: detail.into(),
        }
    }

    pub fn missing(artifact: impl Into<String>, path: impl Into<PathBuf>, hint: impl Into<String>) -> Self {
        PipelineError::ArtifactMissing {
            artifact: artifact.into(),
            path: path.into(),
            hint: hint.into(),
        }
    }
}
