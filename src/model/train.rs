// SPDX-License-Identifier: PMPL-1.0-or-later

//! Training stage: validate classes, split, fit, evaluate, persist

use super::classifier::{BoostedClassifier, Classifier};
use super::metrics::{ClassificationReport, ConfusionMatrix};
use super::split;
use crate::config::{PipelineConfig, TrainerConfig};
use crate::error::PipelineError;
use crate::features::{FeatureMatrix, TfidfVectorizer};
use crate::storage::ArtifactPaths;
use anyhow::Result;
use colored::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningLevel {
    /// Below `warn_min_samples`
    Critical,
    /// Below `recommend_min_samples`
    Advisory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassWarning {
    pub label: String,
    pub count: usize,
    pub level: WarningLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityVerdict {
    Excellent,
    VeryGood,
    Good,
    NeedsMoreData,
}

impl QualityVerdict {
    pub fn from_accuracy(accuracy: f64) -> Self {
        if accuracy >= 0.95 {
            QualityVerdict::Excellent
        } else if accuracy >= 0.90 {
            QualityVerdict::VeryGood
        } else if accuracy >= 0.85 {
            QualityVerdict::Good
        } else {
            QualityVerdict::NeedsMoreData
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidation {
    pub folds: usize,
    pub scores: Vec<f64>,
    pub mean: f64,
    pub std: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainOutcome {
    pub classes: Vec<String>,
    pub samples: usize,
    pub features: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub stratified: bool,
    pub warnings: Vec<ClassWarning>,
    pub report: ClassificationReport,
    pub confusion: ConfusionMatrix,
    pub cross_validation: Option<CrossValidation>,
    pub verdict: QualityVerdict,
}

pub fn class_warnings(matrix: &FeatureMatrix, params: &TrainerConfig) -> Vec<ClassWarning> {
    matrix
        .label_counts()
        .into_iter()
        .filter_map(|(label, count)| {
            let level = if count < params.warn_min_samples {
                WarningLevel::Critical
            } else if count < params.recommend_min_samples {
                WarningLevel::Advisory
            } else {
                return None;
            };
            Some(ClassWarning {
                label,
                count,
                level,
            })
        })
        .collect()
}

/// Load the artifacts named by `config`, train and persist the classifier
pub fn train_model(config: &PipelineConfig) -> Result<TrainOutcome> {
    let paths = ArtifactPaths::from_config(config);
    let matrix = FeatureMatrix::read_csv(&paths.features)?;
    let vectorizer = TfidfVectorizer::load(&paths.vectorizer)?;
    if vectorizer.vocabulary_len() != matrix.columns {
        return Err(PipelineError::schema(
            "feature matrix",
            format!(
                "{} columns but the vectorizer has {} terms; re-run `vulnsift features`",
                matrix.columns,
                vectorizer.vocabulary_len()
            ),
        )
        .into());
    }

    let (classifier, outcome) = train_on(&matrix, &config.trainer, &vectorizer.fingerprint())?;
    classifier.save(&paths.classifier)?;
    Ok(outcome)
}

/// Train and evaluate on an in-memory matrix
pub fn train_on(
    matrix: &FeatureMatrix,
    params: &TrainerConfig,
    vectorizer_fingerprint: &str,
) -> Result<(BoostedClassifier, TrainOutcome)> {
    if matrix.len() < 2 {
        return Err(PipelineError::InsufficientData {
            detail: format!("{} sample(s) in the feature matrix", matrix.len()),
        }
        .into());
    }

    let warnings = class_warnings(matrix, params);
    for w in &warnings {
        match w.level {
            WarningLevel::Critical => tracing::warn!(
                label = %w.label,
                count = w.count,
                "class has too few samples to learn reliably"
            ),
            WarningLevel::Advisory => tracing::warn!(
                label = %w.label,
                count = w.count,
                recommended = params.recommend_min_samples,
                "class is under-represented"
            ),
        }
    }

    let counts = split::class_counts(&matrix.labels);
    let stratified = split::can_stratify(&counts);
    if !stratified {
        tracing::warn!("some class has a single sample; using an unstratified split");
    }
    let (train_idx, test_idx) =
        split::train_test_split(&matrix.labels, params.test_fraction, params.seed, stratified);
    let train = matrix.select(&train_idx);
    let test = matrix.select(&test_idx);

    let classifier = BoostedClassifier::fit(&train, params, vectorizer_fingerprint)?;
    let predicted = classifier.predict_matrix(&test);
    let report = ClassificationReport::compute(&test.labels, &predicted);
    let confusion = ConfusionMatrix::compute(&test.labels, &predicted);

    let cross_validation = if train.len() < params.cv_max_train_samples {
        cross_validate(&train, params, vectorizer_fingerprint)?
    } else {
        None
    };

    let outcome = TrainOutcome {
        classes: classifier.classes().to_vec(),
        samples: matrix.len(),
        features: matrix.columns,
        train_size: train.len(),
        test_size: test.len(),
        stratified,
        warnings,
        verdict: QualityVerdict::from_accuracy(report.accuracy),
        report,
        confusion,
        cross_validation,
    };
    Ok((classifier, outcome))
}

/// Stratified k-fold weighted F1 over the training split. Skipped when the
/// rarest class cannot fill two folds.
fn cross_validate(
    train: &FeatureMatrix,
    params: &TrainerConfig,
    fingerprint: &str,
) -> Result<Option<CrossValidation>> {
    let counts = split::class_counts(&train.labels);
    let rarest = counts.values().copied().min().unwrap_or(0);
    let folds = params.cv_folds.min(rarest);
    if folds < 2 || counts.len() < 2 {
        tracing::info!(rarest, "cross-validation skipped");
        return Ok(None);
    }

    let held_out = split::stratified_folds(&train.labels, folds, params.seed);
    let mut scores = Vec::with_capacity(folds);
    for (i, fold) in held_out.iter().enumerate() {
        let rest: Vec<usize> = (0..train.len()).filter(|r| fold.binary_search(r).is_err()).collect();
        let model = BoostedClassifier::fit(&train.select(&rest), params, fingerprint)?;
        let fold_matrix = train.select(fold);
        let predicted = model.predict_matrix(&fold_matrix);
        let score = ClassificationReport::compute(&fold_matrix.labels, &predicted)
            .weighted_avg
            .f1;
        tracing::info!(fold = i + 1, f1 = score, "cross-validation fold");
        scores.push(score);
    }

    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / scores.len() as f64;
    Ok(Some(CrossValidation {
        folds,
        scores,
        mean,
        std: variance.sqrt(),
    }))
}

pub fn print_outcome(outcome: &TrainOutcome) {
    println!("\n{}", "=== TRAINING SUMMARY ===".bold().cyan());
    println!("  Samples:  {}", outcome.samples);
    println!("  Features: {}", outcome.features);
    println!(
        "  Split:    {} train / {} test ({})",
        outcome.train_size,
        outcome.test_size,
        if outcome.stratified {
            "stratified"
        } else {
            "unstratified"
        }
    );
    println!("  Classes:  {}", outcome.classes.join(", "));

    if !outcome.warnings.is_empty() {
        println!("\n{}", "DATASET WARNINGS".bold().yellow());
        for w in &outcome.warnings {
            match w.level {
                WarningLevel::Critical => println!(
                    "  {} class '{}' has only {} sample(s)",
                    "CRITICAL".red().bold(),
                    w.label,
                    w.count
                ),
                WarningLevel::Advisory => println!(
                    "  {} class '{}' has {} samples",
                    "ADVISORY".yellow(),
                    w.label,
                    w.count
                ),
            }
        }
    }

    println!();
    outcome.report.print();
    println!();
    outcome.confusion.print();

    if let Some(cv) = &outcome.cross_validation {
        println!(
            "\n  Weighted F1 ({}-fold CV): {:.4} (+/- {:.4})",
            cv.folds, cv.mean, cv.std
        );
    }

    let accuracy = format!("{:.2}%", outcome.report.accuracy * 100.0);
    let verdict = match outcome.verdict {
        QualityVerdict::Excellent => format!("EXCELLENT: accuracy {accuracy}").green().bold(),
        QualityVerdict::VeryGood => format!("VERY GOOD: accuracy {accuracy}").green(),
        QualityVerdict::Good => format!("GOOD: accuracy {accuracy}").yellow(),
        QualityVerdict::NeedsMoreData => {
            format!("accuracy {accuracy}; more data is needed").red()
        }
    };
    println!("\n  {}", verdict);
}
