// SPDX-License-Identifier: PMPL-1.0-or-later

//! Labelling rules
//!
//! Every rule either answers with a label or defers to the next rule in the
//! chain. New categories are added by appending rules or table rows; the
//! dispatcher in `LabelPolicy` never changes.

use super::detectors;
use crate::corpus::reference::ReferenceMap;
use crate::types::*;

/// Everything a rule may look at for one file
#[derive(Debug, Clone)]
pub struct LabelInput<'a> {
    /// Path relative to the source root, lower-cased, `/`-separated
    pub rel_path: String,
    /// First path component under the root (the cloned repository name)
    pub origin: Option<String>,
    /// Lower-cased file name
    pub file_name: String,
    pub text: &'a str,
    pub reference_id: Option<&'a str>,
}

impl<'a> LabelInput<'a> {
    pub fn new(rel_path: &str, text: &'a str, reference_id: Option<&'a str>) -> Self {
        let normalized = rel_path.replace('\\', "/").to_lowercase();
        let mut components = normalized.split('/').filter(|c| !c.is_empty() && *c != ".");
        let first = components.next().map(str::to_string);
        let has_more = components.next().is_some();
        let file_name = normalized
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();

        Self {
            origin: if has_more { first } else { None },
            rel_path: normalized,
            file_name,
            text,
            reference_id,
        }
    }
}

pub trait LabelRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn apply(&self, input: &LabelInput<'_>) -> Option<String>;
}

/// Curated safe roots: always `safe`
pub struct SafeRoot;

impl LabelRule for SafeRoot {
    fn name(&self) -> &'static str {
        "safe-root"
    }

    fn apply(&self, _input: &LabelInput<'_>) -> Option<String> {
        Some(SAFE.to_string())
    }
}

/// Known reference ids map straight to their category
pub struct ReferenceOverride {
    pub refs: ReferenceMap,
}

impl LabelRule for ReferenceOverride {
    fn name(&self) -> &'static str {
        "reference-id"
    }

    fn apply(&self, input: &LabelInput<'_>) -> Option<String> {
        input
            .reference_id
            .and_then(|id| self.refs.label_for(id))
            .map(str::to_string)
    }
}

/// Substring patterns per label, for one cloned repository
#[derive(Debug, Clone)]
pub struct OriginPatterns {
    pub origin: String,
    pub labels: Vec<(String, Vec<String>)>,
}

impl OriginPatterns {
    fn new(origin: &str, labels: &[(&str, &[&str])]) -> Self {
        Self {
            origin: origin.to_string(),
            labels: labels
                .iter()
                .map(|(label, patterns)| {
                    (
                        label.to_string(),
                        patterns.iter().map(|p| p.to_string()).collect(),
                    )
                })
                .collect(),
        }
    }
}

/// Filename keywords used when a known origin has no matching path pattern
const FILENAME_KEYWORDS: &[(&str, &str)] = &[
    ("sqli", SQLI),
    ("sql_injection", SQLI),
    ("xss", XSS),
    ("rce", RCE),
    ("exec", RCE),
    ("command", RCE),
    ("traversal", PATH_TRAVERSAL),
    ("lfi", PATH_TRAVERSAL),
    ("deserializ", DESERIALIZATION),
    ("unserializ", DESERIALIZATION),
    ("crypto", WEAK_CRYPTO),
];

/// Path-pattern table for well-known vulnerable repositories
pub struct PathTable {
    pub entries: Vec<OriginPatterns>,
}

impl PathTable {
    pub fn builtin() -> Self {
        Self {
            entries: vec![
                OriginPatterns::new(
                    "dvwa",
                    &[
                        (SQLI, &["sqli", "sql_injection"]),
                        (XSS, &["xss"]),
                        (RCE, &["/exec/", "command"]),
                        (PATH_TRAVERSAL, &["/fi/", "file_inclusion", "traversal"]),
                        (WEAK_CRYPTO, &["cryptography", "weak_id"]),
                    ],
                ),
                OriginPatterns::new(
                    "webgoat",
                    &[
                        (SQLI, &["sqlinjection", "sql_injection"]),
                        (XSS, &["xss", "crosssitescripting"]),
                        (PATH_TRAVERSAL, &["pathtraversal", "path_traversal"]),
                        (DESERIALIZATION, &["deserialization"]),
                        (WEAK_CRYPTO, &["cryptography", "crypto"]),
                        (RCE, &["xxe", "vulnerablecomponents"]),
                    ],
                ),
                OriginPatterns::new(
                    "nodegoat",
                    &[
                        (SQLI, &["allocations", "sql"]),
                        (XSS, &["profile", "xss", "memos"]),
                        (RCE, &["contributions", "eval"]),
                        (PATH_TRAVERSAL, &["research", "redirect"]),
                    ],
                ),
                OriginPatterns::new(
                    "juice_shop",
                    &[
                        (SQLI, &["sqli", "login", "search"]),
                        (XSS, &["xss", "sanitiz"]),
                        (PATH_TRAVERSAL, &["fileserver", "file-server", "traversal"]),
                        (DESERIALIZATION, &["b2border", "deserializ"]),
                        (WEAK_CRYPTO, &["insecurity", "crypto"]),
                    ],
                ),
                OriginPatterns::new(
                    "php_vulns",
                    &[
                        (SQLI, &["sql"]),
                        (XSS, &["xss", "cross_site"]),
                        (RCE, &["command", "rce", "code_exec", "code execution"]),
                        (PATH_TRAVERSAL, &["lfi", "rfi", "traversal", "inclusion"]),
                        (DESERIALIZATION, &["unserial", "object_injection", "object injection"]),
                    ],
                ),
                OriginPatterns::new(
                    "payloads_all",
                    &[
                        (SQLI, &["sql injection", "sqli"]),
                        (XSS, &["xss injection", "xss"]),
                        (RCE, &["command injection", "server side template injection", "rce"]),
                        (PATH_TRAVERSAL, &["directory traversal", "file inclusion"]),
                        (DESERIALIZATION, &["insecure deserialization"]),
                        (WEAK_CRYPTO, &["insecure randomness", "hash"]),
                    ],
                ),
                OriginPatterns::new("xss_awesome", &[(XSS, &["xss", "payload", "readme"])]),
                OriginPatterns::new(
                    "sqli_testenv",
                    &[(SQLI, &["sql", "mysql", "pgsql", "mssql", "oracle", "sqlite"])],
                ),
            ],
        }
    }

    fn entry(&self, origin: &str) -> Option<&OriginPatterns> {
        self.entries.iter().find(|e| e.origin == origin)
    }

    fn filename_keyword(file_name: &str) -> Option<&'static str> {
        FILENAME_KEYWORDS
            .iter()
            .find(|(keyword, _)| file_name.contains(keyword))
            .map(|(_, label)| *label)
    }
}

impl LabelRule for PathTable {
    fn name(&self) -> &'static str {
        "path-table"
    }

    fn apply(&self, input: &LabelInput<'_>) -> Option<String> {
        let entry = self.entry(input.origin.as_deref()?)?;

        entry
            .labels
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|p| input.rel_path.contains(p.as_str())))
            .map(|(label, _)| label.clone())
            .or_else(|| Self::filename_keyword(&input.file_name).map(str::to_string))
    }
}

/// Category keywords recognised in hand-authored example file names
const EXAMPLE_KEYWORDS: &[(&str, &str)] = &[
    ("sqli", SQLI),
    ("xss", XSS),
    ("rce", RCE),
    ("path_traversal", PATH_TRAVERSAL),
    ("deserialization", DESERIALIZATION),
    ("weak_crypto", WEAK_CRYPTO),
];

/// File-name conventions of the hand-authored examples directory
pub struct ExampleFilename;

impl LabelRule for ExampleFilename {
    fn name(&self) -> &'static str {
        "example-filename"
    }

    fn apply(&self, input: &LabelInput<'_>) -> Option<String> {
        let name = input.file_name.as_str();
        if name.starts_with("safe_") {
            return Some(SAFE.to_string());
        }
        if let Some((_, label)) = EXAMPLE_KEYWORDS.iter().find(|(kw, _)| name.contains(kw)) {
            return Some(label.to_string());
        }
        if name.contains("vulnerable") {
            return Some(OTHER_VULN.to_string());
        }
        None
    }
}

/// Ordered regex scan; always answers
pub struct ContentScan;

impl LabelRule for ContentScan {
    fn name(&self) -> &'static str {
        "content-scan"
    }

    fn apply(&self, input: &LabelInput<'_>) -> Option<String> {
        Some(detectors::scan_content(input.text))
    }
}
