// SPDX-License-Identifier: PMPL-1.0-or-later

//! Content detectors for the heuristic scan
//!
//! Each category is a set of regular expressions run over lower-cased text.
//! This is lexical pattern matching, not program analysis.

use crate::types::*;
use regex::Regex;
use std::sync::LazyLock;

/// A single vulnerability category recognised from raw text
pub trait CategoryDetector: Send + Sync {
    fn label(&self) -> &str;

    /// `text` is expected to be lower-cased already
    fn matches(&self, text: &str) -> bool;
}

pub struct RegexDetector {
    label: &'static str,
    pattern: Regex,
}

impl RegexDetector {
    fn build(label: &'static str, alternatives: &[&str]) -> Self {
        let joined = alternatives.join("|");
        Self {
            label,
            // Patterns are literals in this file; a typo is a programming error.
            pattern: Regex::new(&format!("(?:{joined})"))
                .unwrap_or_else(|e| panic!("invalid {label} detector pattern: {e}")),
        }
    }
}

impl CategoryDetector for RegexDetector {
    fn label(&self) -> &str {
        self.label
    }

    fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

const SQLI_PATTERNS: &[&str] = &[
    r"select\s+.+\s+from",
    r"union\s+(?:all\s+)?select",
    r"or\s+1\s*=\s*1",
    r"information_schema",
];

const XSS_PATTERNS: &[&str] = &[
    r"<script",
    r"onerror\s*=",
    r"onload\s*=",
    r"document\.cookie",
    r"innerhtml",
    r"outerhtml",
    r"document\.write\s*\(",
    r"insertadjacenthtml",
    r"dangerouslysetinnerhtml",
    r"bypasssecuritytrust(?:html|script|url|resourceurl)",
    r"v-html",
];

const RCE_PATTERNS: &[&str] = &[
    r"system\(",
    r"exec\(",
    r"popen\(",
    r"runtime\.getruntime\(\)",
    r"processbuilder",
    r"shell_exec",
    r"passthru\(",
    r"subprocess\.\w+\([^)]*shell\s*=\s*true",
    r"`[^`\n]+`",
];

const PATH_TRAVERSAL_PATTERNS: &[&str] = &[
    r"\.\./",
    r"\.\.\\",
    r"/etc/passwd",
    r"/etc/shadow",
    r"c:\\+windows\\+",
    r"boot\.ini",
];

const DESERIALIZATION_PATTERNS: &[&str] = &[
    r"objectinputstream",
    r"readobject\(",
    r"pickle\.loads?\(",
    r"cpickle\.loads?\(",
    r"yaml\.load\(",
    r"yaml\.unsafe_load\(",
    r"unserialize\(",
    r"marshal\.loads\(",
    r"binaryformatter",
];

const WEAK_CRYPTO_PATTERNS: &[&str] = &[
    r"md5\(",
    r"sha1\(",
    r"des_crypt",
    r"\brc4\b",
    r#"cipher\.getinstance\(\s*"des"#,
    r#"createhash\(\s*['"](?:md5|sha1)['"]"#,
    r"\bdes\.new\(",
    r"messagedigest\.getinstance\(\s*.(?:md5|sha-?1).",
];

static DEFAULT_DETECTORS: LazyLock<Vec<RegexDetector>> = LazyLock::new(|| {
    vec![
        RegexDetector::build(SQLI, SQLI_PATTERNS),
        RegexDetector::build(XSS, XSS_PATTERNS),
        RegexDetector::build(RCE, RCE_PATTERNS),
        RegexDetector::build(PATH_TRAVERSAL, PATH_TRAVERSAL_PATTERNS),
        RegexDetector::build(DESERIALIZATION, DESERIALIZATION_PATTERNS),
        RegexDetector::build(WEAK_CRYPTO, WEAK_CRYPTO_PATTERNS),
    ]
});

/// Built-in detectors in scan order.
///
/// The order is the tie-break: a file that matches several categories gets
/// the earliest one, so `md5(` next to `select .. from` is `sqli`. Weak
/// labels are only as good as this ordering and it is kept fixed on purpose.
pub fn default_detectors() -> Vec<&'static dyn CategoryDetector> {
    DEFAULT_DETECTORS
        .iter()
        .map(|d| d as &'static dyn CategoryDetector)
        .collect()
}

/// First matching category over `detectors`, or `None`
pub fn first_match<'a>(detectors: &[&'a dyn CategoryDetector], text: &str) -> Option<&'a str> {
    let lowered = text.to_lowercase();
    detectors
        .iter()
        .copied()
        .find(|d| d.matches(&lowered))
        .map(|d| d.label())
}

/// Heuristic content label: first built-in category, else `other_vuln`
pub fn scan_content(text: &str) -> String {
    first_match(&default_detectors(), text)
        .unwrap_or(OTHER_VULN)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector(label: &str) -> &'static dyn CategoryDetector {
        default_detectors()
            .into_iter()
            .find(|d| d.label() == label)
            .unwrap()
    }

    #[test]
    fn test_detector_order() {
        let labels: Vec<&str> = default_detectors().iter().map(|d| d.label()).collect();
        assert_eq!(
            labels,
            vec![SQLI, XSS, RCE, PATH_TRAVERSAL, DESERIALIZATION, WEAK_CRYPTO]
        );
    }

    #[test]
    fn test_sqli_detector() {
        let d = detector(SQLI);
        assert!(d.matches(r#"query = "select * from users where id = " + user_input"#));
        assert!(d.matches("' union select password from admins--"));
        assert!(d.matches("admin' or 1=1 --"));
        assert!(d.matches("select table_name from information_schema.tables"));
        assert!(!d.matches("selected items are shown below"));
    }

    #[test]
    fn test_xss_detector() {
        let d = detector(XSS);
        assert!(d.matches("<script>alert(1)</script>"));
        assert!(d.matches("<img src=x onerror=alert(1)>"));
        assert!(d.matches("el.innerhtml = data;"));
        assert!(d.matches("<div dangerouslysetinnerhtml={{__html: content}} />"));
        assert!(d.matches("this.sanitizer.bypasssecuritytrusthtml(html)"));
        assert!(!d.matches("el.textcontent = data;"));
    }

    #[test]
    fn test_rce_detector() {
        let d = detector(RCE);
        assert!(d.matches(r#"os.system("ls " + filename)"#));
        assert!(d.matches("runtime.getruntime().exec(cmd)"));
        assert!(d.matches(r#"subprocess.call("ping " + host, shell=true)"#));
        assert!(d.matches("$output = `ping $host`;"));
        assert!(!d.matches(r#"cursor.execute("select 1")"#));
    }

    #[test]
    fn test_path_traversal_detector() {
        let d = detector(PATH_TRAVERSAL);
        assert!(d.matches("open('../../etc/hosts')"));
        assert!(d.matches(r"..\..\secrets.txt"));
        assert!(d.matches("cat /etc/passwd"));
        assert!(d.matches(r"c:\windows\system32"));
        assert!(!d.matches("open('./data.txt')"));
    }

    #[test]
    fn test_deserialization_detector() {
        let d = detector(DESERIALIZATION);
        assert!(d.matches("user = pickle.loads(data)"));
        assert!(d.matches("config = yaml.load(config_str)"));
        assert!(d.matches("new objectinputstream(in).readobject()"));
        assert!(d.matches("$object = unserialize($data);"));
        assert!(!d.matches("config = yaml.safe_load(config_str)"));
    }

    #[test]
    fn test_weak_crypto_detector() {
        let d = detector(WEAK_CRYPTO);
        assert!(d.matches("hashlib.md5(password.encode())"));
        assert!(d.matches("$hash = sha1($password);"));
        assert!(d.matches("crypto.createhash('md5').update(data)"));
        assert!(d.matches("cipher = des.new(key, des.mode_ecb)"));
        assert!(!d.matches("hashlib.sha256(password.encode())"));
    }

    #[test]
    fn test_sqli_wins_over_xss() {
        let text = r#"echo "<script>" . $row; $q = "SELECT name FROM users WHERE id=" . $id;"#;
        assert_eq!(scan_content(text), SQLI);
    }

    #[test]
    fn test_sqli_wins_over_weak_crypto() {
        let text = "h = md5(pw)\nq = 'SELECT * FROM users WHERE hash=' + h";
        assert_eq!(scan_content(text), SQLI);
    }

    #[test]
    fn test_no_match_is_other_vuln() {
        assert_eq!(scan_content("fn main() { println!(\"hi\"); }"), OTHER_VULN);
    }

    #[test]
    fn test_scan_is_case_insensitive() {
        assert_eq!(scan_content("Runtime.getRuntime().exec(cmd)"), RCE);
    }
}
