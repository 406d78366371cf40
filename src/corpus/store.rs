// SPDX-License-Identifier: PMPL-1.0-or-later

//! Corpus artifact: one CSV row per sample

use crate::error::PipelineError;
use crate::storage;
use crate::types::Sample;
use anyhow::{Context, Result};
use std::path::Path;

pub const ARTIFACT: &str = "corpus";

/// Columns that must be present; `cve` may be absent and is then empty
const REQUIRED_COLUMNS: &[&str] = &["id", "source", "file_path", "code", "label"];

pub fn write_samples(path: &Path, samples: &[Sample]) -> Result<()> {
    storage::write_atomic_with(path, |tmp| {
        let mut writer = csv::Writer::from_path(tmp)
            .with_context(|| format!("creating {}", tmp.display()))?;
        for sample in samples {
            writer.serialize(sample)?;
        }
        writer.flush()?;
        Ok(())
    })
}

pub fn read_samples(path: &Path) -> Result<Vec<Sample>> {
    storage::require(path, ARTIFACT, "run `vulnsift corpus` first")?;

    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;
    let headers = reader.headers()?.clone();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::schema(
            ARTIFACT,
            format!("missing column(s): {}", missing.join(", ")),
        )
        .into());
    }

    let mut samples = Vec::new();
    for (row, record) in reader.deserialize::<Sample>().enumerate() {
        let sample = record.with_context(|| format!("{} row {}", path.display(), row + 2))?;
        samples.push(sample);
    }
    Ok(samples)
}
