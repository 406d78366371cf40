// SPDX-License-Identifier: PMPL-1.0-or-later

//! Held-out evaluation: per-class scores and confusion matrix

use colored::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassScores {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Averages {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassScores>,
    pub accuracy: f64,
    pub macro_avg: Averages,
    pub weighted_avg: Averages,
    pub total: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// Sorted union of the labels seen on either side
fn label_set(y_true: &[String], y_pred: &[String]) -> Vec<String> {
    y_true
        .iter()
        .chain(y_pred)
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

impl ClassificationReport {
    /// Undefined ratios (no predictions or no support) score zero
    pub fn compute(y_true: &[String], y_pred: &[String]) -> Self {
        let labels = label_set(y_true, y_pred);
        let total = y_true.len();

        let classes: Vec<ClassScores> = labels
            .iter()
            .map(|label| {
                let mut tp = 0;
                let mut fp = 0;
                let mut fn_ = 0;
                for (t, p) in y_true.iter().zip(y_pred) {
                    match (t == label, p == label) {
                        (true, true) => tp += 1,
                        (false, true) => fp += 1,
                        (true, false) => fn_ += 1,
                        (false, false) => {}
                    }
                }
                let precision = ratio(tp, tp + fp);
                let recall = ratio(tp, tp + fn_);
                ClassScores {
                    label: label.clone(),
                    precision,
                    recall,
                    f1: f1(precision, recall),
                    support: tp + fn_,
                }
            })
            .collect();

        let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();

        let n_classes = classes.len().max(1) as f64;
        let macro_avg = Averages {
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / n_classes,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / n_classes,
            f1: classes.iter().map(|c| c.f1).sum::<f64>() / n_classes,
        };

        let weight = |c: &ClassScores| c.support as f64 / total.max(1) as f64;
        let weighted_avg = Averages {
            precision: classes.iter().map(|c| c.precision * weight(c)).sum(),
            recall: classes.iter().map(|c| c.recall * weight(c)).sum(),
            f1: classes.iter().map(|c| c.f1 * weight(c)).sum(),
        };

        Self {
            classes,
            accuracy: ratio(correct, total),
            macro_avg,
            weighted_avg,
            total,
        }
    }

    pub fn print(&self) {
        println!("{}", "CLASSIFICATION REPORT".bold().yellow());
        println!(
            "  {:>20} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        );
        for c in &self.classes {
            println!(
                "  {:>20} {:>10.4} {:>10.4} {:>10.4} {:>10}",
                c.label, c.precision, c.recall, c.f1, c.support
            );
        }
        println!();
        println!(
            "  {:>20} {:>10} {:>10} {:>10.4} {:>10}",
            "accuracy", "", "", self.accuracy, self.total
        );
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            println!(
                "  {:>20} {:>10.4} {:>10.4} {:>10.4} {:>10}",
                name, avg.precision, avg.recall, avg.f1, self.total
            );
        }
    }
}

/// Rows are true labels, columns predicted labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub labels: Vec<String>,
    pub counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn compute(y_true: &[String], y_pred: &[String]) -> Self {
        let labels = label_set(y_true, y_pred);
        let mut counts = vec![vec![0; labels.len()]; labels.len()];
        for (t, p) in y_true.iter().zip(y_pred) {
            if let (Ok(row), Ok(col)) = (labels.binary_search(t), labels.binary_search(p)) {
                counts[row][col] += 1;
            }
        }
        Self { labels, counts }
    }

    pub fn get(&self, truth: &str, predicted: &str) -> usize {
        let row = self.labels.iter().position(|l| l == truth);
        let col = self.labels.iter().position(|l| l == predicted);
        match (row, col) {
            (Some(r), Some(c)) => self.counts[r][c],
            _ => 0,
        }
    }

    pub fn print(&self) {
        println!("{}", "CONFUSION MATRIX".bold().yellow());
        println!("  rows: true label, columns: predicted label");
        let width = self.labels.iter().map(|l| l.len()).max().unwrap_or(4).max(4);
        print!("  {:>width$}", "");
        for (i, _) in self.labels.iter().enumerate() {
            print!(" {:>6}", format!("[{i}]"));
        }
        println!();
        for (i, (label, row)) in self.labels.iter().zip(&self.counts).enumerate() {
            print!("  {:>width$}", format!("[{i}] {label}"), width = width + 4);
            for (j, count) in row.iter().enumerate() {
                let cell = format!("{count:>6}");
                if i == j {
                    print!(" {}", cell.green());
                } else if *count > 0 {
                    print!(" {}", cell.red());
                } else {
                    print!(" {}", cell.dimmed());
                }
            }
            println!();
        }
    }
}
