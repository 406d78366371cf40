// SPDX-License-Identifier: PMPL-1.0-or-later

//! End-to-end: corpus -> features -> train -> classify

use std::fs;
use std::path::Path;
use tempfile::TempDir;
use vulnsift::config::PipelineConfig;
use vulnsift::corpus::{self, store};
use vulnsift::features::{self, FeatureMatrix, TfidfVectorizer};
use vulnsift::model::{self, BoostedClassifier};
use vulnsift::report::{self, ModelBundle, ThreatTier};
use vulnsift::storage::ArtifactPaths;
use vulnsift::types::*;
use vulnsift::PipelineError;

const TABLES: &[&str] = &["users", "orders", "accounts", "sessions", "products", "invoices"];
const FIELDS: &[&str] = &["name", "email", "token", "comment", "title", "bio"];
const HELPERS: &[&str] = &["total", "average", "render", "parse", "format", "collect"];

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Lay out `per_class` files each of sqli, xss and safe code
fn seed_layout(root: &Path, per_class: usize) -> PipelineConfig {
    let vuln = root.join("dataset/github_poc");
    let safe = root.join("dataset/safe_code");
    for i in 0..per_class {
        let table = TABLES[i % TABLES.len()];
        let field = FIELDS[i % FIELDS.len()];
        let helper = HELPERS[i % HELPERS.len()];

        write(
            &vuln.join(format!("sqli/query_{i}.php")),
            &format!(
                "<?php\n$id = $_GET['id'];\n$sql = \"SELECT {field} FROM {table} WHERE id = \" . $id;\n$result = mysqli_query($conn, $sql);\n"
            ),
        );
        write(
            &vuln.join(format!("xss/render_{i}.js")),
            &format!(
                "const {field} = new URLSearchParams(location.search).get('{field}');\ndocument.getElementById('{table}').innerHTML = {field};\n"
            ),
        );
        write(
            &safe.join(format!("util_{i}.py")),
            &format!(
                "def {helper}_{field}(values):\n    result = [v for v in values if v]\n    return len(result)\n"
            ),
        );
    }

    let mut config = PipelineConfig::rooted(root);
    config.vectorizer.max_features = 500;
    config.trainer.n_trees = 20;
    config.trainer.max_depth = 4;
    config
}

#[test]
fn test_feature_matrix_matches_corpus() {
    let dir = TempDir::new().unwrap();
    let config = seed_layout(dir.path(), 6);
    let built = corpus::run(&config).unwrap();
    let features = features::make_features(&config).unwrap();

    let paths = ArtifactPaths::from_config(&config);
    let matrix = FeatureMatrix::read_csv(&paths.features).unwrap();
    assert_eq!(matrix.len(), built.samples.len());
    assert_eq!(matrix.columns, features.columns);

    let labels: Vec<String> = built.samples.iter().map(|s| s.label.clone()).collect();
    assert_eq!(matrix.labels, labels);

    // Replaying the persisted vectorizer reproduces the stored rows exactly.
    let vectorizer = TfidfVectorizer::load(&paths.vectorizer).unwrap();
    assert_eq!(vectorizer.fingerprint(), features.fingerprint);
    let samples = store::read_samples(&paths.samples).unwrap();
    let texts: Vec<&str> = samples.iter().map(|s| s.code.as_str()).collect();
    let replayed = vectorizer.transform(&texts, labels);
    assert_eq!(replayed, matrix);
}

#[test]
fn test_trained_classifier_beats_majority_guess() {
    let dir = TempDir::new().unwrap();
    let config = seed_layout(dir.path(), 15);
    let built = corpus::run(&config).unwrap();
    assert_eq!(built.label_counts().get(SQLI), Some(&15));
    assert_eq!(built.label_counts().get(XSS), Some(&15));
    assert_eq!(built.label_counts().get(SAFE), Some(&15));

    features::make_features(&config).unwrap();
    let outcome = model::train_model(&config).unwrap();

    assert_eq!(outcome.classes, vec![SAFE, SQLI, XSS]);
    assert!(outcome.stratified);
    assert!(outcome.warnings.is_empty());
    assert_eq!(outcome.train_size + outcome.test_size, 45);
    assert!(
        outcome.report.accuracy > 0.5,
        "accuracy {} not above 0.5",
        outcome.report.accuracy
    );
    let cv = outcome.cross_validation.expect("small train split runs CV");
    assert_eq!(cv.folds, 5);

    assert!(ArtifactPaths::from_config(&config).classifier.is_file());
}

#[test]
fn test_classify_is_idempotent_and_reports_ids() {
    let dir = TempDir::new().unwrap();
    let config = seed_layout(dir.path(), 15);
    corpus::run(&config).unwrap();
    features::make_features(&config).unwrap();
    model::train_model(&config).unwrap();

    let target = dir.path().join("suspect.php");
    write(
        &target,
        "<?php // patched for CVE-2019-0708?\n$sql = \"SELECT email FROM users WHERE id = \" . $_GET['id'];\n",
    );

    let bundle = ModelBundle::load(&config).unwrap();
    let detector = bundle.detector();
    let first = report::classify_file(&target, &detector).unwrap();
    let second = report::classify_file(&target, &detector).unwrap();
    assert_eq!(first, second);

    let d = &first.detection;
    assert_eq!(d.distribution.len(), 3);
    assert!((d.distribution.iter().map(|c| c.probability).sum::<f64>() - 1.0).abs() < 1e-6);
    assert_eq!(d.confidence, d.distribution[0].probability);
    assert_eq!(d.reference_ids, vec!["CVE-2019-0708".to_string()]);
    assert_eq!(d.tier, ThreatTier::assess(&d.label, d.confidence));
}

#[test]
fn test_undecodable_input_is_still_classified() {
    let dir = TempDir::new().unwrap();
    let config = seed_layout(dir.path(), 6);
    corpus::run(&config).unwrap();
    features::make_features(&config).unwrap();
    model::train_model(&config).unwrap();

    let target = dir.path().join("mixed.bin");
    fs::write(&target, b"\xff\xfe SELECT name FROM users \x00\x80").unwrap();
    let bundle = ModelBundle::load(&config).unwrap();
    let result = report::classify_file(&target, &bundle.detector()).unwrap();
    assert_eq!(result.size, 28);
    assert!(!result.detection.label.is_empty());
}

#[test]
fn test_missing_artifacts_name_the_stage() {
    let dir = TempDir::new().unwrap();
    let config = PipelineConfig::rooted(dir.path());

    let err = features::make_features(&config).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::ArtifactMissing { .. })
    ));

    let err = model::train_model(&config).unwrap_err();
    assert!(err.to_string().contains("vulnsift features"));

    let err = ModelBundle::load(&config).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::ArtifactMissing { .. })
    ));
}

#[test]
fn test_mismatched_vectorizer_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = seed_layout(dir.path(), 6);
    corpus::run(&config).unwrap();
    features::make_features(&config).unwrap();
    model::train_model(&config).unwrap();

    // Refit the vectorizer on a different corpus without retraining.
    let paths = ArtifactPaths::from_config(&config);
    let other = TfidfVectorizer::fit(
        &["alpha beta gamma", "alpha beta delta", "gamma delta"],
        &config.vectorizer,
    )
    .unwrap();
    other.save(&paths.vectorizer).unwrap();

    let err = ModelBundle::load(&config).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::FingerprintMismatch { .. })
    ));
}

#[test]
fn test_corpus_empty_when_no_sources_exist() {
    let dir = TempDir::new().unwrap();
    let config = PipelineConfig::rooted(dir.path());
    let err = corpus::run(&config).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::CorpusEmpty { .. })
    ));
    assert!(!ArtifactPaths::from_config(&config).samples.exists());
}

#[test]
fn test_classifier_artifact_round_trips() {
    let dir = TempDir::new().unwrap();
    let config = seed_layout(dir.path(), 6);
    corpus::run(&config).unwrap();
    features::make_features(&config).unwrap();
    model::train_model(&config).unwrap();

    let paths = ArtifactPaths::from_config(&config);
    let loaded = BoostedClassifier::load(&paths.classifier).unwrap();
    let vectorizer = TfidfVectorizer::load(&paths.vectorizer).unwrap();
    assert_eq!(loaded.vectorizer_fingerprint(), vectorizer.fingerprint());
    assert_eq!(loaded.feature_count(), vectorizer.vocabulary_len());
}
