//! Schema linting - static analysis of method schema files.
//!
//! Validates schema files for:
//! - JSON syntax errors and unreadable files
//! - A missing `properties.parameter` definition
//! - Broken internal $ref anchors
//! - Parameter and response schemas the validation engine can't compile

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::error::ValidateError;
use crate::fixture::RESULT_SUFFIX;
use crate::loader::{load_schema, navigate_fragment};
use crate::validator::{parameter_schema, response_schema, validate_against_schema};

/// Properties of a method schema the dispatcher reads.
const DISPATCH_PROPERTIES: &[&str] = &["parameter", "response"];

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message from linting.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub file: PathBuf,
    /// JSON path to the issue (e.g., "/properties/parameter")
    pub path: String,
    pub message: String,
}

/// Result of linting a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Status of a linted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Result of linting a directory or set of files.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    /// Returns true if all files passed (no errors).
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Lint a file or directory.
///
/// If path is a directory, recursively finds all method schema files.
/// If `strict` is true, warnings are treated as errors.
pub fn lint(path: &Path, strict: bool) -> LintResult {
    let files = collect_schema_files(path);
    let mut results = Vec::new();
    let mut total_errors = 0;
    let mut total_warnings = 0;

    for file in &files {
        let file_result = lint_file(file, path);
        total_errors += file_result
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count();
        total_warnings += file_result
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count();
        results.push(file_result);
    }

    let failed = results
        .iter()
        .filter(|r| {
            if strict {
                r.status != FileStatus::Ok
            } else {
                r.status == FileStatus::Error
            }
        })
        .count();

    LintResult {
        path: path.to_path_buf(),
        files_checked: files.len(),
        passed: files.len() - failed,
        failed,
        errors: total_errors,
        warnings: total_warnings,
        results,
    }
}

/// Lint a single method schema file.
pub fn lint_file(file: &Path, base_path: &Path) -> FileResult {
    let mut diagnostics = Vec::new();
    let mut report = |severity: Severity, code: &str, path: &str, message: String| {
        diagnostics.push(Diagnostic {
            severity,
            code: code.to_string(),
            file: file.to_path_buf(),
            path: path.to_string(),
            message,
        });
    };

    match load_schema(file) {
        Err(e) => report(Severity::Error, "E001", "/", e.to_string()),
        Ok(schema) => {
            check_refs(&schema, "", &schema, &mut report);
            check_dispatch_properties(&schema, &mut report);
        }
    }

    let has_errors = diagnostics.iter().any(|d| d.severity == Severity::Error);
    let has_warnings = diagnostics.iter().any(|d| d.severity == Severity::Warning);

    let status = if has_errors {
        FileStatus::Error
    } else if has_warnings {
        FileStatus::Warning
    } else {
        FileStatus::Ok
    };

    FileResult {
        file: file.strip_prefix(base_path).unwrap_or(file).to_path_buf(),
        status,
        diagnostics,
    }
}

type Report<'a> = dyn FnMut(Severity, &str, &str, String) + 'a;

/// Check the parts of the document the dispatcher relies on.
fn check_dispatch_properties(schema: &Value, report: &mut Report<'_>) {
    match parameter_schema(schema) {
        Err(_) => report(
            Severity::Error,
            "E002",
            "/properties",
            "schema declares no `parameter` property".to_string(),
        ),
        Ok(parameter) => check_compiles(&parameter, "/properties/parameter", report),
    }

    match response_schema(schema) {
        Some(response) => check_compiles(&response, "/properties/response", report),
        None => report(
            Severity::Warning,
            "W001",
            "/properties",
            "no `response` schema declared; results are not validated".to_string(),
        ),
    }

    if let Some(Value::Object(properties)) = schema.get("properties") {
        for key in properties.keys() {
            if !DISPATCH_PROPERTIES.contains(&key.as_str()) {
                report(
                    Severity::Warning,
                    "W002",
                    &format!("/properties/{key}"),
                    format!("property \"{key}\" is ignored by the dispatcher"),
                );
            }
        }
    }
}

fn check_compiles(schema: &Value, path: &str, report: &mut Report<'_>) {
    if let Err(ValidateError::InvalidSchema { message }) =
        validate_against_schema(schema, &Value::Null)
    {
        report(
            Severity::Error,
            "E004",
            path,
            format!("schema does not compile: {message}"),
        );
    }
}

/// Recursively check internal $ref anchors.
fn check_refs(value: &Value, path: &str, root: &Value, report: &mut Report<'_>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(ref_val)) = map.get("$ref") {
                if ref_val.starts_with('#')
                    && ref_val != "#"
                    && navigate_fragment(root, ref_val).is_none()
                {
                    report(
                        Severity::Error,
                        "E003",
                        path,
                        format!("anchor not found: {ref_val}"),
                    );
                }
            }

            for (key, val) in map {
                check_refs(val, &format!("{path}/{key}"), root, report);
            }
        }
        Value::Array(arr) => {
            for (i, item) in arr.iter().enumerate() {
                check_refs(item, &format!("{path}/{i}"), root, report);
            }
        }
        _ => {}
    }
}

/// Collect all method schema files in a path (file or directory).
///
/// Canned `*.result.json` fixtures are skipped in directory mode.
fn collect_schema_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        if is_json(path) {
            return vec![path.to_path_buf()];
        }
        return vec![];
    }

    let mut files = Vec::new();
    collect_files_recursive(path, &mut files);
    files.sort();
    files
}

fn collect_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files_recursive(&path, files);
        } else if is_json(&path) && !is_result_fixture(&path) {
            files.push(path);
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().map(|e| e == "json").unwrap_or(false)
}

fn is_result_fixture(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.ends_with(RESULT_SUFFIX))
        .unwrap_or(false)
}
