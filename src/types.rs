// SPDX-License-Identifier: PMPL-1.0-or-later

//! Core type definitions for vulnsift
//!
//! Samples, source tags and labelling modes shared by the corpus builder,
//! the featurizer, the trainer and the reporter.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Label for code taken from curated safe roots
pub const SAFE: &str = "safe";
/// Fallback label when no detector fires on vulnerable-source text
pub const OTHER_VULN: &str = "other_vuln";
pub const SQLI: &str = "sqli";
pub const XSS: &str = "xss";
pub const RCE: &str = "rce";
pub const PATH_TRAVERSAL: &str = "path_traversal";
pub const DESERIALIZATION: &str = "deserialization";
pub const WEAK_CRYPTO: &str = "weak_crypto";

/// Where a sample came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    GithubPoc,
    Searchsploit,
    RealRepos,
    SafeCode,
    Examples,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::GithubPoc => "github_poc",
            SourceKind::Searchsploit => "searchsploit",
            SourceKind::RealRepos => "real_repos",
            SourceKind::SafeCode => "safe_code",
            SourceKind::Examples => "examples",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "github_poc" => Some(SourceKind::GithubPoc),
            "searchsploit" => Some(SourceKind::Searchsploit),
            "real_repos" => Some(SourceKind::RealRepos),
            "safe_code" => Some(SourceKind::SafeCode),
            "examples" => Some(SourceKind::Examples),
            _ => None,
        }
    }

    /// Emission class: vulnerable sources first, safe code next,
    /// hand-authored examples last.
    pub fn emission_rank(&self) -> u8 {
        match self {
            SourceKind::GithubPoc | SourceKind::Searchsploit | SourceKind::RealRepos => 0,
            SourceKind::SafeCode => 1,
            SourceKind::Examples => 2,
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How files under a root are labelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LabelMode {
    Safe,
    Heuristic,
    PathThenHeuristic,
    /// Hand-authored example files: filename rules, then the content scan
    Examples,
}

/// One corpus root as configured
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub path: PathBuf,
    pub source: SourceKind,
    pub mode: LabelMode,
}

impl SourceSpec {
    pub fn new(path: impl Into<PathBuf>, source: SourceKind, mode: LabelMode) -> Self {
        Self {
            path: path.into(),
            source,
            mode,
        }
    }
}

/// One labelled unit of source text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub id: u64,
    pub source: SourceKind,
    pub file_path: String,
    #[serde(rename = "cve", alias = "reference_id")]
    pub reference_id: Option<String>,
    pub code: String,
    pub label: String,
}

/// Human-facing description of a label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub severity: &'static str,
}

impl CategoryInfo {
    pub fn for_label(label: &str) -> Self {
        match label {
            SQLI => CategoryInfo {
                name: "SQL Injection",
                description: "Untrusted input reaches a database query",
                severity: "CRITICAL",
            },
            XSS => CategoryInfo {
                name: "Cross-Site Scripting",
                description: "Untrusted input is rendered as markup or script in a browser",
                severity: "HIGH",
            },
            RCE => CategoryInfo {
                name: "Remote Code Execution",
                description: "Untrusted input reaches a shell or code-evaluation sink",
                severity: "CRITICAL",
            },
            PATH_TRAVERSAL => CategoryInfo {
                name: "Path Traversal",
                description: "Untrusted input selects files outside the intended directory",
                severity: "HIGH",
            },
            DESERIALIZATION => CategoryInfo {
                name: "Unsafe Deserialization",
                description: "Untrusted bytes are turned back into live objects",
                severity: "CRITICAL",
            },
            WEAK_CRYPTO => CategoryInfo {
                name: "Weak Cryptography",
                description: "Broken hash or cipher primitives are in use",
                severity: "MEDIUM",
            },
            SAFE => CategoryInfo {
                name: "Safe Code",
                description: "No known vulnerability pattern was associated with this file",
                severity: "NONE",
            },
            _ => CategoryInfo {
                name: "Other Vulnerability",
                description: "Vulnerable-looking code outside the specific categories",
                severity: "VARIABLE",
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind_roundtrip_names() {
        for kind in [
            SourceKind::GithubPoc,
            SourceKind::Searchsploit,
            SourceKind::RealRepos,
            SourceKind::SafeCode,
            SourceKind::Examples,
        ] {
            assert_eq!(SourceKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(SourceKind::parse("nope"), None);
    }

    #[test]
    fn test_emission_rank_orders_vuln_safe_examples() {
        assert!(SourceKind::Searchsploit.emission_rank() < SourceKind::SafeCode.emission_rank());
        assert!(SourceKind::SafeCode.emission_rank() < SourceKind::Examples.emission_rank());
    }

    #[test]
    fn test_unknown_label_gets_generic_info() {
        let info = CategoryInfo::for_label("ldap_injection");
        assert_eq!(info.name, "Other Vulnerability");
        assert_eq!(CategoryInfo::for_label(SAFE).severity, "NONE");
    }
}
