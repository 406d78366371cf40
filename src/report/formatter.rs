// SPDX-License-Identifier: PMPL-1.0-or-later

//! Terminal rendering of a file detection

use super::{Detection, FileDetection, ThreatTier};
use crate::types::CategoryInfo;
use colored::*;

const BAR_WIDTH: usize = 40;
const RULE: &str = "======================================================================";

pub struct ReportFormatter;

impl Default for ReportFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn print(&self, report: &FileDetection) {
        println!("\n{}", RULE.bold().cyan());
        println!("{}", "  VULNSIFT DETECTION REPORT".bold().cyan());
        println!("{}\n", RULE.bold().cyan());

        println!("{} {}", "File:".bold(), report.path.display());
        println!("{} {} bytes", "Size:".bold(), report.size);

        self.print_category(&report.detection);
        self.print_distribution(&report.detection);
        self.print_reference_ids(&report.detection.reference_ids);
        self.print_assessment(&report.detection);
    }

    fn print_category(&self, detection: &Detection) {
        let info = CategoryInfo::for_label(&detection.label);
        println!("\n{}", "PREDICTED CATEGORY".bold().yellow());
        println!("  {} ({})", info.name.bold(), detection.label);
        println!("  {} {}", "Description:".bold(), info.description);
        println!("  {} {}", "Severity:".bold(), info.severity);
    }

    fn print_distribution(&self, detection: &Detection) {
        println!("\n{}", "PROBABILITY DISTRIBUTION".bold().yellow());
        for entry in &detection.distribution {
            let filled = ((entry.probability * BAR_WIDTH as f64) as usize).min(BAR_WIDTH);
            let bar = "█".repeat(filled);
            let empty = "░".repeat(BAR_WIDTH - filled);
            let pct = format!("{:6.2}%", entry.probability * 100.0);
            let (pct, bar) = if entry.probability >= 0.7 {
                (pct.red().bold(), bar.red())
            } else if entry.probability >= 0.5 {
                (pct.yellow(), bar.yellow())
            } else if entry.probability >= 0.3 {
                (pct.cyan(), bar.cyan())
            } else {
                (pct.normal(), bar.normal())
            };
            println!("  {:<20} {} {}{}", entry.label, pct, bar, empty.dimmed());
        }
    }

    fn print_reference_ids(&self, ids: &[String]) {
        if ids.is_empty() {
            println!("\n  No reference ids mentioned in the file.");
            return;
        }
        println!("\n{}", "REFERENCE IDS IN FILE".bold().yellow());
        for id in ids {
            println!("  - {}", id.yellow());
        }
    }

    fn print_assessment(&self, detection: &Detection) {
        let info = CategoryInfo::for_label(&detection.label);
        let confidence = format!("{:.2}%", detection.confidence * 100.0);
        println!("\n{}", RULE.bold());

        match detection.tier {
            ThreatTier::Critical => {
                println!("{}", "CRITICAL ALERT".red().bold());
                println!("{}", format!("Likely {} detected", info.name).red());
                println!("{} {}", "Confidence:".bold(), confidence.red());
                println!("\n{}", "Required action:".bold());
                println!("  1. Review this file manually before anything else");
                println!("  2. Keep it out of production builds");
                println!("  3. Notify the security team");
                println!("  4. Record the finding in the issue tracker");
            }
            ThreatTier::Warning => {
                println!("{}", "WARNING: possible vulnerability".yellow().bold());
                println!("{}", format!("Type: {}", info.name).yellow());
                println!("{} {}", "Confidence:".bold(), confidence.yellow());
                println!("\n{}", "Recommended action:".bold());
                println!("  - Manual review recommended");
                println!("  - Check the surrounding code paths");
            }
            ThreatTier::Advisory => {
                println!("{}", "Low-confidence advisory".cyan().bold());
                println!("Prediction: {}", info.name);
                println!("{} {}", "Confidence:".bold(), confidence);
                println!("\n  Optional review; not considered critical.");
            }
            ThreatTier::Clear => {
                println!("{}", "CLEAR".green().bold());
                println!("{}", "No vulnerability category predicted".green());
                println!("{} {}", "Confidence:".bold(), confidence.green());
            }
        }
        println!("{}\n", RULE.bold());
    }
}
