//! Traits implemented by the embedding application.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use http::request::Parts;
use serde_json::Value;

use crate::error::HandlerError;

/// Business logic of one API method.
pub trait ApiMethod: Send + Sync {
    /// Run the method.
    ///
    /// `parameter` has already been validated against the method's parameter
    /// schema. The returned value is checked against its response schema, if
    /// one is declared.
    fn handle(&self, request: &Parts, parameter: Value) -> Result<Value, HandlerError>;

    /// Path to the JSON Schema document describing this method.
    fn schema_file(&self) -> &Path;
}

/// Looks up API methods by name.
///
/// Returns `None` for unknown names. Answers must be stable for the
/// duration of a single dispatch.
pub trait MethodProvider: Send + Sync {
    fn lookup(&self, method: &str) -> Option<Arc<dyn ApiMethod>>;
}

/// In-memory method table.
#[derive(Default, Clone)]
pub struct MethodRegistry {
    methods: HashMap<String, Arc<dyn ApiMethod>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `method` under `name`, replacing any previous entry.
    pub fn register(mut self, name: impl Into<String>, method: impl ApiMethod + 'static) -> Self {
        self.methods.insert(name.into(), Arc::new(method));
        self
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl MethodProvider for MethodRegistry {
    fn lookup(&self, method: &str) -> Option<Arc<dyn ApiMethod>> {
        self.methods.get(method).cloned()
    }
}

impl std::fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.methods.keys().collect();
        names.sort();
        f.debug_struct("MethodRegistry")
            .field("methods", &names)
            .finish()
    }
}
