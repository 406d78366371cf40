// SPDX-License-Identifier: PMPL-1.0-or-later

//! File validity checks for corpus intake
//!
//! A rejected file is counted by the caller and skipped; nothing here is
//! fatal.

use std::fs;
use std::path::Path;

/// Bytes inspected for NUL when sniffing binaries
const SNIFF_BYTES: usize = 1024;

/// Extensions treated as source code or text. Extensionless files are
/// accepted too (scripts, exploit drops).
const TEXT_EXTENSIONS: &[&str] = &[
    // web
    "php", "phtml", "php5", "inc", "js", "mjs", "cjs", "jsx", "ts", "tsx", "vue", "html", "htm",
    "xhtml", "asp", "aspx", "jsp", "cfm", "erb", "twig", "ejs", "hbs",
    // systems / jvm / dotnet
    "c", "h", "cc", "cpp", "cxx", "hpp", "rs", "go", "java", "kt", "scala", "cs", "vb", "swift",
    "m",
    // scripting
    "py", "pyw", "rb", "pl", "pm", "sh", "bash", "zsh", "ps1", "psm1", "bat", "cmd", "lua", "r",
    "groovy", "cgi",
    // data and docs
    "sql", "txt", "md", "rst", "xml", "json", "yml", "yaml", "ini", "conf", "cfg", "toml",
    "properties", "nse", "rc",
];

/// Directories never descended into
pub const PRUNED_DIRS: &[&str] = &[
    ".git",
    ".svn",
    "node_modules",
    "vendor",
    "target",
    "build",
    "dist",
    "__pycache__",
    ".venv",
    ".idea",
];

/// Why a file was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Unreadable,
    Empty,
    TooLarge,
    Extension,
    Whitespace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileVerdict {
    Accept(String),
    Binary,
    Invalid(RejectReason),
}

pub fn is_pruned_dir(name: &str) -> bool {
    PRUNED_DIRS.contains(&name)
}

pub fn has_text_extension(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        None => true,
        Some(ext) => TEXT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
    }
}

pub fn looks_binary(bytes: &[u8]) -> bool {
    bytes.iter().take(SNIFF_BYTES).any(|b| *b == 0)
}

/// Strict decode: UTF-8, then Windows-1252. `None` when both fail.
pub fn decode_text(bytes: &[u8]) -> Option<String> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Some(s.to_string()),
        Err(_) => {
            let (cow, _, had_errors) = encoding_rs::WINDOWS_1252.decode(bytes);
            if had_errors {
                None
            } else {
                Some(cow.into_owned())
            }
        }
    }
}

/// Best-effort decode for inference: invalid sequences become U+FFFD
pub fn decode_lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Decide whether `path` enters the corpus
pub fn check_file(path: &Path, max_bytes: u64) -> FileVerdict {
    if !has_text_extension(path) {
        return FileVerdict::Invalid(RejectReason::Extension);
    }

    let size = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(_) => return FileVerdict::Invalid(RejectReason::Unreadable),
    };
    if size == 0 {
        return FileVerdict::Invalid(RejectReason::Empty);
    }
    if size > max_bytes {
        return FileVerdict::Invalid(RejectReason::TooLarge);
    }

    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(_) => return FileVerdict::Invalid(RejectReason::Unreadable),
    };
    if looks_binary(&bytes) {
        return FileVerdict::Binary;
    }

    match decode_text(&bytes) {
        None => FileVerdict::Binary,
        Some(text) if text.trim().is_empty() => FileVerdict::Invalid(RejectReason::Whitespace),
        Some(text) => FileVerdict::Accept(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_accepts_plain_source() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.py", b"print('hi')\n");
        assert_eq!(
            check_file(&path, 1024),
            FileVerdict::Accept("print('hi')\n".to_string())
        );
    }

    #[test]
    fn test_extensionless_is_allowed() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "exploit", b"#!/bin/sh\necho pwned\n");
        assert!(matches!(check_file(&path, 1024), FileVerdict::Accept(_)));
    }

    #[test]
    fn test_rejects_unknown_extension() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "image.png", b"not really a png");
        assert_eq!(
            check_file(&path, 1024),
            FileVerdict::Invalid(RejectReason::Extension)
        );
    }

    #[test]
    fn test_rejects_empty_and_oversized() {
        let dir = TempDir::new().unwrap();
        let empty = write(&dir, "empty.js", b"");
        assert_eq!(check_file(&empty, 1024), FileVerdict::Invalid(RejectReason::Empty));

        let big = write(&dir, "big.js", &vec![b'a'; 2048]);
        assert_eq!(check_file(&big, 1024), FileVerdict::Invalid(RejectReason::TooLarge));
    }

    #[test]
    fn test_nul_byte_is_binary() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "blob.txt", b"abc\0def");
        assert_eq!(check_file(&path, 1024), FileVerdict::Binary);
    }

    #[test]
    fn test_whitespace_only_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "blank.md", b"   \n\t\n");
        assert_eq!(
            check_file(&path, 1024),
            FileVerdict::Invalid(RejectReason::Whitespace)
        );
    }

    #[test]
    fn test_latin1_fallback() {
        // "café" in Windows-1252
        let text = decode_text(&[0x63, 0x61, 0x66, 0xE9]).unwrap();
        assert_eq!(text, "café");
    }

    #[test]
    fn test_lossy_decode_never_fails() {
        let text = decode_lossy(&[0x66, 0xFF, 0x6F]);
        assert!(text.starts_with('f'));
        assert!(text.ends_with('o'));
    }
}
