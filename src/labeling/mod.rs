// SPDX-License-Identifier: PMPL-1.0-or-later

//! Weak labelling policy
//!
//! A label is produced by walking an ordered chain of rules and taking the
//! first answer. The chain depends on the root's `LabelMode`:
//!
//! | mode                  | chain                                      |
//! |-----------------------|--------------------------------------------|
//! | `safe`                | safe-root                                  |
//! | `heuristic`           | reference-id, content-scan                 |
//! | `path-then-heuristic` | reference-id, path-table, content-scan     |
//! | `examples`            | example-filename, content-scan             |
//!
//! The reference-id rule sits first, which makes it the final override
//! over everything after it.

pub mod detectors;
pub mod rules;

use crate::corpus::reference::ReferenceMap;
use crate::types::{LabelMode, OTHER_VULN};

pub use detectors::{default_detectors, scan_content, CategoryDetector, RegexDetector};
pub use rules::{
    ContentScan, ExampleFilename, LabelInput, LabelRule, PathTable, ReferenceOverride, SafeRoot,
};

/// Label plus the rule that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelOutcome {
    pub label: String,
    pub rule: &'static str,
}

pub struct LabelPolicy {
    rules: Vec<Box<dyn LabelRule>>,
}

impl LabelPolicy {
    pub fn new(rules: Vec<Box<dyn LabelRule>>) -> Self {
        Self { rules }
    }

    pub fn for_mode(mode: LabelMode, refs: &ReferenceMap) -> Self {
        let rules: Vec<Box<dyn LabelRule>> = match mode {
            LabelMode::Safe => vec![Box::new(SafeRoot)],
            LabelMode::Heuristic => vec![
                Box::new(ReferenceOverride { refs: refs.clone() }),
                Box::new(ContentScan),
            ],
            LabelMode::PathThenHeuristic => vec![
                Box::new(ReferenceOverride { refs: refs.clone() }),
                Box::new(PathTable::builtin()),
                Box::new(ContentScan),
            ],
            LabelMode::Examples => vec![Box::new(ExampleFilename), Box::new(ContentScan)],
        };
        Self::new(rules)
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Single dispatcher: first rule with an answer wins
    pub fn label(&self, input: &LabelInput<'_>) -> LabelOutcome {
        for rule in &self.rules {
            if let Some(label) = rule.apply(input) {
                return LabelOutcome {
                    label,
                    rule: rule.name(),
                };
            }
        }
        LabelOutcome {
            label: OTHER_VULN.to_string(),
            rule: "fallback",
        }
    }
}
