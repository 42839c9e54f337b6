//! Directory-backed methods for contract testing.
//!
//! A method `name` exists when `<dir>/<name>.json` exists; that file is its
//! schema. Its handler answers with the content of `<dir>/<name>.result.json`
//! when present and echoes the parameter otherwise.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use http::request::Parts;
use serde_json::Value;

use crate::contract::{ApiMethod, MethodProvider};
use crate::error::HandlerError;

/// Suffix of canned result files, skipped when linting schema directories.
pub const RESULT_SUFFIX: &str = ".result.json";

#[derive(Debug, Clone)]
pub struct FixtureProvider {
    dir: PathBuf,
}

impl FixtureProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl MethodProvider for FixtureProvider {
    fn lookup(&self, method: &str) -> Option<Arc<dyn ApiMethod>> {
        if !is_plain_name(method) {
            return None;
        }

        let schema = self.dir.join(format!("{method}.json"));
        if !schema.is_file() {
            return None;
        }

        Some(Arc::new(FixtureMethod {
            result: self.dir.join(format!("{method}{RESULT_SUFFIX}")),
            schema,
        }))
    }
}

/// Names that stay inside the fixture directory.
fn is_plain_name(method: &str) -> bool {
    !method.is_empty()
        && !method.starts_with('.')
        && method
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

#[derive(Debug)]
struct FixtureMethod {
    schema: PathBuf,
    result: PathBuf,
}

impl ApiMethod for FixtureMethod {
    fn handle(&self, _request: &Parts, parameter: Value) -> Result<Value, HandlerError> {
        if !self.result.exists() {
            return Ok(parameter);
        }

        let content = std::fs::read(&self.result).map_err(|e| HandlerError::failed(e))?;
        serde_json::from_slice(&content).map_err(|e| HandlerError::failed(e))
    }

    fn schema_file(&self) -> &Path {
        &self.schema
    }
}
