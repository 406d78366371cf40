// SPDX-License-Identifier: PMPL-1.0-or-later

//! `vulnsift doctor`: checks the pipeline layout before a long run

use crate::config::PipelineConfig;
use crate::corpus::reference::ReferenceMap;
use crate::features::TfidfVectorizer;
use crate::model::BoostedClassifier;
use crate::storage::ArtifactPaths;
use anyhow::{anyhow, Result};
use colored::*;
use std::path::Path;

pub fn run_doctor(config: &PipelineConfig) -> Result<()> {
    println!("vulnsift self-diagnostics");
    println!();

    let checks = collect_checks(config);
    for entry in &checks {
        entry.print();
    }

    if checks.iter().any(|entry| entry.level == Level::Error) {
        Err(anyhow!("self-diagnostics reported issues"))
    } else {
        Ok(())
    }
}

pub fn collect_checks(config: &PipelineConfig) -> Vec<Diagnostic> {
    let paths = ArtifactPaths::from_config(config);
    let mut checks = vec![Diagnostic::ok(
        "version",
        format!("vulnsift {}", env!("CARGO_PKG_VERSION")),
    )];

    checks.push(check_references(config));
    for spec in &config.sources {
        checks.push(check_source(spec.source.as_str(), &spec.path));
    }

    checks.push(check_artifact("corpus", &paths.samples, "vulnsift corpus", Level::Warn));
    checks.push(check_artifact("features", &paths.features, "vulnsift features", Level::Warn));
    checks.push(check_artifact("vectorizer", &paths.vectorizer, "vulnsift features", Level::Error));
    checks.push(check_artifact("classifier", &paths.classifier, "vulnsift train", Level::Error));

    if paths.vectorizer.is_file() && paths.classifier.is_file() {
        checks.push(check_pairing(&paths.vectorizer, &paths.classifier));
    }
    checks
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Ok,
    Warn,
    Error,
}

impl Level {
    fn tag(&self) -> ColoredString {
        match self {
            Level::Ok => "OK".green(),
            Level::Warn => "WARN".yellow(),
            Level::Error => "ERR".red(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub label: String,
    pub level: Level,
    pub detail: String,
}

impl Diagnostic {
    fn new(label: impl Into<String>, level: Level, detail: String) -> Self {
        Self {
            label: label.into(),
            level,
            detail,
        }
    }

    fn ok(label: impl Into<String>, detail: String) -> Self {
        Self::new(label, Level::Ok, detail)
    }

    fn warning(label: impl Into<String>, detail: String) -> Self {
        Self::new(label, Level::Warn, detail)
    }

    fn error(label: impl Into<String>, detail: String) -> Self {
        Self::new(label, Level::Error, detail)
    }

    fn print(&self) {
        println!("  [{}] {:22} {}", self.level.tag(), self.label, self.detail);
    }
}

fn check_source(name: &str, path: &Path) -> Diagnostic {
    let label = format!("source {name}");
    if path.is_dir() {
        let files = walkdir::WalkDir::new(path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .count();
        if files == 0 {
            Diagnostic::warning(label, format!("{} is empty", path.display()))
        } else {
            Diagnostic::ok(label, format!("{} ({} files)", path.display(), files))
        }
    } else if path.exists() {
        Diagnostic::warning(label, format!("{} exists but is not a directory", path.display()))
    } else {
        Diagnostic::warning(label, format!("{} missing", path.display()))
    }
}

fn check_references(config: &PipelineConfig) -> Diagnostic {
    let refs = ReferenceMap::with_extra(&config.reference_labels);
    if refs.is_empty() {
        Diagnostic::warning("reference ids", "no id overrides loaded".to_string())
    } else {
        Diagnostic::ok(
            "reference ids",
            format!(
                "{} id overrides ({} from config)",
                refs.len(),
                config.reference_labels.len()
            ),
        )
    }
}

fn check_artifact(label: &'static str, path: &Path, stage: &str, missing: Level) -> Diagnostic {
    if path.is_file() {
        Diagnostic::ok(label, format!("{} exists", path.display()))
    } else if path.exists() {
        Diagnostic::error(label, format!("{} exists but is not a regular file", path.display()))
    } else {
        Diagnostic::new(
            label,
            missing,
            format!("{} missing (run `{}`)", path.display(), stage),
        )
    }
}

fn check_pairing(vectorizer: &Path, classifier: &Path) -> Diagnostic {
    let loaded = TfidfVectorizer::load(vectorizer)
        .and_then(|v| BoostedClassifier::load(classifier).map(|c| (v, c)));
    match loaded {
        Ok((v, c)) => match c.check_pairing(&v.fingerprint()) {
            Ok(()) => Diagnostic::ok(
                "artifact pairing",
                format!(
                    "classifier ({}) matches vectorizer {}",
                    c.trained_at(),
                    &v.fingerprint()[..12]
                ),
            ),
            Err(e) => Diagnostic::error("artifact pairing", e.to_string()),
        },
        Err(e) => Diagnostic::error("artifact pairing", format!("{e:#}")),
    }
}
