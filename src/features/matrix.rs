// SPDX-License-Identifier: PMPL-1.0-or-later

//! Feature artifact: dense TF-IDF rows plus a trailing label column

use crate::error::PipelineError;
use crate::storage;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;

pub const ARTIFACT: &str = "feature matrix";
const LABEL_COLUMN: &str = "label";

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub columns: usize,
    pub rows: Vec<Vec<f64>>,
    pub labels: Vec<String>,
}

impl FeatureMatrix {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn label_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for label in &self.labels {
            *counts.entry(label.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Rows and labels at `indices`, in that order
    pub fn select(&self, indices: &[usize]) -> FeatureMatrix {
        FeatureMatrix {
            columns: self.columns,
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i].clone()).collect(),
        }
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        storage::write_atomic_with(path, |tmp| {
            let mut writer = csv::Writer::from_path(tmp)
                .with_context(|| format!("creating {}", tmp.display()))?;

            let mut header: Vec<String> = (0..self.columns).map(|c| c.to_string()).collect();
            header.push(LABEL_COLUMN.to_string());
            writer.write_record(&header)?;

            for (row, label) in self.rows.iter().zip(&self.labels) {
                let mut record: Vec<String> = row.iter().map(|v| v.to_string()).collect();
                record.push(label.clone());
                writer.write_record(&record)?;
            }
            writer.flush()?;
            Ok(())
        })
    }

    pub fn read_csv(path: &Path) -> Result<FeatureMatrix> {
        storage::require(path, ARTIFACT, "run `vulnsift features` first")?;

        let mut reader =
            csv::Reader::from_path(path).with_context(|| format!("opening {}", path.display()))?;
        let headers = reader.headers()?.clone();
        if headers.iter().last() != Some(LABEL_COLUMN) {
            return Err(
                PipelineError::schema(ARTIFACT, "the last column must be `label`").into(),
            );
        }
        let columns = headers.len() - 1;
        if columns == 0 {
            return Err(PipelineError::schema(ARTIFACT, "no feature columns").into());
        }

        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("{} row {}", path.display(), i + 2))?;
            if record.len() != columns + 1 {
                return Err(PipelineError::schema(
                    ARTIFACT,
                    format!("row {} has {} fields, expected {}", i + 2, record.len(), columns + 1),
                )
                .into());
            }
            let row = record
                .iter()
                .take(columns)
                .map(|v| v.parse::<f64>())
                .collect::<std::result::Result<Vec<f64>, _>>()
                .map_err(|e| PipelineError::schema(ARTIFACT, format!("row {}: {e}", i + 2)))?;
            rows.push(row);
            labels.push(record[columns].to_string());
        }

        Ok(FeatureMatrix {
            columns,
            rows,
            labels,
        })
    }
}
