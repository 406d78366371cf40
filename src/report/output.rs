// SPDX-License-Identifier: PMPL-1.0-or-later

//! Serialization helpers for printed/exported detections

use super::FileDetection;
use anyhow::Result;
use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportOutputFormat {
    /// Coloured terminal report
    Text,
    Json,
    Yaml,
}

impl ReportOutputFormat {
    /// Machine-readable rendering; `Text` yields a plain summary without
    /// terminal colours
    pub fn serialize(&self, report: &FileDetection) -> Result<String> {
        match self {
            ReportOutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
            ReportOutputFormat::Yaml => Ok(serde_yaml::to_string(report)?),
            ReportOutputFormat::Text => Ok(plain_text(report)),
        }
    }
}

fn plain_text(report: &FileDetection) -> String {
    let d = &report.detection;
    let mut lines = vec![
        format!("file: {}", report.path.display()),
        format!("size: {}", report.size),
        format!("label: {}", d.label),
        format!("confidence: {:.4}", d.confidence),
        format!("tier: {:?}", d.tier),
        "distribution:".to_string(),
    ];
    for entry in &d.distribution {
        lines.push(format!("  {:<20} {:.4}", entry.label, entry.probability));
    }
    if d.reference_ids.is_empty() {
        lines.push("reference_ids: none".to_string());
    } else {
        lines.push(format!("reference_ids: {}", d.reference_ids.join(", ")));
    }
    lines.join("\n") + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ClassProbability, Detection, ThreatTier};
    use std::path::PathBuf;

    fn sample_report() -> FileDetection {
        FileDetection {
            path: PathBuf::from("app/login.php"),
            size: 120,
            detection: Detection {
                label: "sqli".into(),
                confidence: 0.8,
                distribution: vec![
                    ClassProbability {
                        label: "sqli".into(),
                        probability: 0.8,
                    },
                    ClassProbability {
                        label: "safe".into(),
                        probability: 0.2,
                    },
                ],
                reference_ids: vec!["CVE-2020-0001".into()],
                tier: ThreatTier::Critical,
            },
        }
    }

    #[test]
    fn test_cli_values() {
        assert_eq!(
            ReportOutputFormat::from_str("yaml", true),
            Ok(ReportOutputFormat::Yaml)
        );
        assert_eq!(
            ReportOutputFormat::from_str("JSON", true),
            Ok(ReportOutputFormat::Json)
        );
        assert!(ReportOutputFormat::from_str("sarif", true).is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let report = sample_report();
        let json = ReportOutputFormat::Json.serialize(&report).unwrap();
        assert!(json.contains("\"tier\": \"critical\""));
        let back: FileDetection = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_plain_text_lists_distribution() {
        let text = ReportOutputFormat::Text.serialize(&sample_report()).unwrap();
        assert!(text.contains("label: sqli"));
        assert!(text.contains("reference_ids: CVE-2020-0001"));
        assert!(text.lines().any(|l| l.trim_start().starts_with("safe")));
    }
}
