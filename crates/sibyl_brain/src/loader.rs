//! Locating and reading category files.

use crate::parser::{parse_file, ParseError};
use regex::Regex;
use sibyl_core::Category;
use std::path::{Path, PathBuf};

/// Outcome of reading every file a pattern names.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub files: Vec<PathBuf>,
    pub categories: Vec<Category>,
    pub failures: Vec<(PathBuf, ParseError)>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Expand a path whose file-name component may contain `*` and `?`.
///
/// Only the final component is matched; the directory must be literal.
/// Results are sorted. A pattern without wildcards yields itself if it
/// exists, and nothing otherwise.
pub fn expand(pattern: &str) -> Vec<PathBuf> {
    let path = Path::new(pattern);
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return Vec::new();
    };
    if !name.contains(['*', '?']) {
        return if path.is_file() {
            vec![path.to_path_buf()]
        } else {
            Vec::new()
        };
    }

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut expr = String::from("^");
    for c in name.chars() {
        match c {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            c => expr.push_str(&regex::escape(&c.to_string())),
        }
    }
    expr.push('$');
    let Ok(matcher) = Regex::new(&expr) else {
        return Vec::new();
    };

    let Ok(entries) = std::fs::read_dir(&dir) else {
        tracing::warn!("Cannot read directory {}", dir.display());
        return Vec::new();
    };
    let mut found: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| matcher.is_match(n))
        })
        .collect();
    found.sort();
    found
}

/// Parse every file matching `pattern`. A file that fails to parse is
/// recorded in the report and does not stop the others.
pub fn read_categories(pattern: &str) -> LoadReport {
    let mut report = LoadReport::default();
    for file in expand(pattern) {
        match parse_file(&file) {
            Ok(mut cats) => {
                tracing::debug!("Parsed {} categories from {}", cats.len(), file.display());
                report.categories.append(&mut cats);
            }
            Err(e) => {
                tracing::warn!("Failed to parse {}: {}", file.display(), e);
                report.failures.push((file.clone(), e));
            }
        }
        report.files.push(file);
    }
    report
}
