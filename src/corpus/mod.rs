// SPDX-License-Identifier: PMPL-1.0-or-later

//! Corpus builder
//!
//! Walks every configured source root, keeps plausible text files, labels
//! them through the root's `LabelPolicy` and emits dense, 1-based sample ids
//! in emission order (vulnerable sources, then safe code, then hand-authored
//! examples).

pub mod filter;
pub mod reference;
pub mod store;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::labeling::{LabelInput, LabelPolicy};
use crate::storage::ArtifactPaths;
use crate::types::*;
use anyhow::Result;
use colored::*;
use filter::FileVerdict;
use reference::ReferenceMap;
use std::collections::BTreeMap;
use std::path::Path;
use walkdir::WalkDir;

/// Counters for one source root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStats {
    pub source: SourceKind,
    pub root: String,
    pub present: bool,
    pub accepted: usize,
    pub skipped_binary: usize,
    pub skipped_invalid: usize,
    /// Samples per labelling rule name
    pub rule_counts: BTreeMap<&'static str, usize>,
}

impl SourceStats {
    fn new(spec: &SourceSpec) -> Self {
        Self {
            source: spec.source,
            root: spec.path.display().to_string(),
            present: spec.path.is_dir(),
            accepted: 0,
            skipped_binary: 0,
            skipped_invalid: 0,
            rule_counts: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorpusStats {
    pub sources: Vec<SourceStats>,
}

impl CorpusStats {
    pub fn skipped_binary(&self) -> usize {
        self.sources.iter().map(|s| s.skipped_binary).sum()
    }

    pub fn skipped_invalid(&self) -> usize {
        self.sources.iter().map(|s| s.skipped_invalid).sum()
    }

    /// Samples labelled by `rule` across all sources
    pub fn rule_count(&self, rule: &str) -> usize {
        self.sources
            .iter()
            .filter_map(|s| s.rule_counts.get(rule))
            .sum()
    }
}

#[derive(Debug, Clone)]
pub struct CorpusBuild {
    pub samples: Vec<Sample>,
    pub stats: CorpusStats,
}

impl CorpusBuild {
    pub fn label_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for sample in &self.samples {
            *counts.entry(sample.label.clone()).or_insert(0) += 1;
        }
        counts
    }

    pub fn source_counts(&self) -> BTreeMap<SourceKind, usize> {
        let mut counts = BTreeMap::new();
        for sample in &self.samples {
            *counts.entry(sample.source).or_insert(0) += 1;
        }
        counts
    }
}

/// Build the labelled corpus described by `config`
pub fn build_corpus(config: &PipelineConfig) -> Result<CorpusBuild> {
    let refs = ReferenceMap::with_extra(&config.reference_labels);

    let mut ordered: Vec<&SourceSpec> = config.sources.iter().collect();
    ordered.sort_by_key(|spec| spec.source.emission_rank());

    let mut samples = Vec::new();
    let mut stats = CorpusStats::default();

    for spec in ordered {
        let policy = LabelPolicy::for_mode(spec.mode, &refs);
        let source_stats = collect_source(spec, &policy, config.max_file_bytes, &mut samples);
        stats.sources.push(source_stats);
    }

    if samples.is_empty() {
        let roots: Vec<String> = stats.sources.iter().map(|s| s.root.clone()).collect();
        return Err(PipelineError::CorpusEmpty {
            hint: format!(
                "collect raw files into the source directories ({}) before running `vulnsift corpus`",
                roots.join(", ")
            ),
        }
        .into());
    }

    Ok(CorpusBuild { samples, stats })
}

/// Build the corpus and persist it to the conventional samples path
pub fn run(config: &PipelineConfig) -> Result<CorpusBuild> {
    let build = build_corpus(config)?;
    let paths = ArtifactPaths::from_config(config);
    store::write_samples(&paths.samples, &build.samples)?;
    Ok(build)
}

fn collect_source(
    spec: &SourceSpec,
    policy: &LabelPolicy,
    max_bytes: u64,
    samples: &mut Vec<Sample>,
) -> SourceStats {
    let mut stats = SourceStats::new(spec);
    if !stats.present {
        tracing::warn!(root = %spec.path.display(), source = %spec.source, "source root missing, skipping");
        return stats;
    }

    let root_name = spec
        .path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let walker = WalkDir::new(&spec.path)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !e.file_type().is_dir()
                || !filter::is_pruned_dir(&e.file_name().to_string_lossy())
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(error = %e, "unreadable directory entry");
                stats.skipped_invalid += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let text = match filter::check_file(path, max_bytes) {
            FileVerdict::Accept(text) => text,
            FileVerdict::Binary => {
                tracing::debug!(path = %path.display(), "skipped binary file");
                stats.skipped_binary += 1;
                continue;
            }
            FileVerdict::Invalid(reason) => {
                tracing::debug!(path = %path.display(), ?reason, "skipped file");
                stats.skipped_invalid += 1;
                continue;
            }
        };

        let rel = relative_path(path, &spec.path);
        let file_path = if root_name.is_empty() {
            rel.clone()
        } else {
            format!("{root_name}/{rel}")
        };
        // The root's own name counts: a root called `CVE-...` tags every file.
        let reference_id = reference::extract_reference_id(&file_path);
        let outcome = {
            let input = LabelInput::new(&rel, &text, reference_id.as_deref());
            policy.label(&input)
        };

        *stats.rule_counts.entry(outcome.rule).or_insert(0) += 1;
        stats.accepted += 1;

        samples.push(Sample {
            id: samples.len() as u64 + 1,
            source: spec.source,
            file_path,
            reference_id,
            code: text,
            label: outcome.label,
        });
    }

    tracing::info!(
        source = %spec.source,
        accepted = stats.accepted,
        skipped_binary = stats.skipped_binary,
        skipped_invalid = stats.skipped_invalid,
        "source collected"
    );
    stats
}

fn relative_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

pub fn print_summary(build: &CorpusBuild) {
    println!("\n{}", "=== CORPUS SUMMARY ===".bold().cyan());

    println!("{}", "SOURCES".bold().yellow());
    for s in &build.stats.sources {
        if !s.present {
            println!("  {:14} {} ({})", s.source.as_str(), "missing".yellow(), s.root);
            continue;
        }
        println!(
            "  {:14} {:>6} samples  {:>5} binary skipped  {:>5} invalid skipped",
            s.source.as_str(),
            s.accepted,
            s.skipped_binary,
            s.skipped_invalid
        );
    }

    let path_labelled = build.stats.rule_count("path-table");
    let reference_labelled = build.stats.rule_count("reference-id");
    println!();
    println!("  Labelled by path rules:    {}", path_labelled);
    println!("  Labelled by reference ids: {}", reference_labelled);
    println!("  Labelled by content scan:  {}", build.stats.rule_count("content-scan"));

    println!("\n{}", "CLASS DISTRIBUTION".bold().yellow());
    let total = build.samples.len().max(1);
    let mut labels: Vec<(String, usize)> = build.label_counts().into_iter().collect();
    labels.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    for (label, count) in labels {
        let pct = count as f64 * 100.0 / total as f64;
        let name = if label == SAFE {
            label.green()
        } else {
            label.red()
        };
        println!("  {:18} {:>6} ({:5.1}%)", name, count, pct);
    }

    println!("\n{}", "SOURCE DISTRIBUTION".bold().yellow());
    for (source, count) in build.source_counts() {
        println!("  {:18} {:>6}", source.as_str(), count);
    }

    println!(
        "\n  Total: {}",
        build.samples.len().to_string().bold()
    );
}
