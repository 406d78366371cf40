// SPDX-License-Identifier: PMPL-1.0-or-later

//! Reference ids (vulnerability catalogue numbers) found in paths and text

use crate::types::*;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

static REFERENCE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)CVE-\d{4}-\d+").unwrap());

/// Catalogue entries whose category is known well enough to override
/// the heuristics
const BUILTIN_REFERENCES: &[(&str, &str)] = &[
    ("CVE-2014-6271", RCE),  // Shellshock
    ("CVE-2017-5638", RCE),  // Struts Content-Type OGNL
    ("CVE-2019-0708", RCE),  // BlueKeep
    ("CVE-2020-1472", RCE),  // Zerologon
    ("CVE-2021-3156", RCE),  // sudo Baron Samedit
    ("CVE-2021-44228", RCE), // Log4Shell
    ("CVE-2023-36884", RCE),
    ("CVE-2023-38831", RCE), // WinRAR
    ("CVE-2015-4852", DESERIALIZATION), // WebLogic commons-collections
    ("CVE-2017-9805", DESERIALIZATION), // Struts REST XStream
    ("CVE-2021-41773", PATH_TRAVERSAL), // Apache httpd 2.4.49
    ("CVE-2018-13379", PATH_TRAVERSAL), // FortiOS SSL VPN
];

/// First reference id in a file path, upper-cased
pub fn extract_reference_id(path: &str) -> Option<String> {
    REFERENCE_ID
        .find(path)
        .map(|m| m.as_str().to_ascii_uppercase())
}

/// Every distinct reference id mentioned in `text`, sorted
pub fn find_reference_ids(text: &str) -> Vec<String> {
    REFERENCE_ID
        .find_iter(text)
        .map(|m| m.as_str().to_ascii_uppercase())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Reference id to label mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceMap {
    entries: BTreeMap<String, String>,
}

impl ReferenceMap {
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN_REFERENCES
                .iter()
                .map(|(id, label)| (id.to_string(), label.to_string()))
                .collect(),
        }
    }

    /// Built-in entries with `extra` layered on top
    pub fn with_extra(extra: &BTreeMap<String, String>) -> Self {
        let mut map = Self::builtin();
        for (id, label) in extra {
            map.entries
                .insert(id.trim().to_ascii_uppercase(), label.trim().to_string());
        }
        map
    }

    pub fn label_for(&self, id: &str) -> Option<&str> {
        self.entries
            .get(&id.to_ascii_uppercase())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_from_path() {
        assert_eq!(
            extract_reference_id("dataset/github_poc/cve-2021-44228/exploit/poc.py").as_deref(),
            Some("CVE-2021-44228")
        );
        assert_eq!(extract_reference_id("dataset/github_poc/log4j/poc.py"), None);
    }

    #[test]
    fn test_extract_id_glued_to_word_characters() {
        assert_eq!(
            extract_reference_id("log4j_CVE-2021-44228/poc.py").as_deref(),
            Some("CVE-2021-44228")
        );
        assert_eq!(
            extract_reference_id("exploitCVE-2021-44228.py").as_deref(),
            Some("CVE-2021-44228")
        );
        assert_eq!(
            find_reference_ids("fix_for_cve-2019-0708_here"),
            vec!["CVE-2019-0708".to_string()]
        );
    }

    #[test]
    fn test_find_ids_in_text_dedup_sorted() {
        let text = "see CVE-2023-38831 and cve-2019-0708, again CVE-2023-38831";
        assert_eq!(
            find_reference_ids(text),
            vec!["CVE-2019-0708".to_string(), "CVE-2023-38831".to_string()]
        );
        assert!(find_reference_ids("no ids here").is_empty());
    }

    #[test]
    fn test_extra_entries_override_builtin() {
        let mut extra = BTreeMap::new();
        extra.insert("cve-2021-44228".to_string(), "deserialization".to_string());
        extra.insert("CVE-2022-22965".to_string(), "rce".to_string());
        let map = ReferenceMap::with_extra(&extra);
        assert_eq!(map.label_for("CVE-2021-44228"), Some(DESERIALIZATION));
        assert_eq!(map.label_for("cve-2022-22965"), Some(RCE));
        assert_eq!(map.len(), BUILTIN_REFERENCES.len() + 1);
    }
}
