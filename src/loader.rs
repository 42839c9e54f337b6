//! Schema loading.
//!
//! Schemas are read from storage on every call; nothing is cached.

use std::path::Path;

use serde_json::Value;

use crate::error::DispatchError;

/// Reads and parses a JSON Schema document.
///
/// Implementations must be stateless between calls: loading the same path
/// twice with unchanged content yields equal documents.
pub trait SchemaLoader: Send + Sync {
    /// # Errors
    ///
    /// `SchemaNotFound` when nothing exists at `path`, `SchemaNotLoadable` when
    /// it exists but cannot be read, `SchemaInvalid` when it isn't JSON.
    fn load(&self, path: &Path) -> Result<Value, DispatchError>;
}

/// Loads schemas from the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsSchemaLoader;

impl SchemaLoader for FsSchemaLoader {
    fn load(&self, path: &Path) -> Result<Value, DispatchError> {
        load_schema(path)
    }
}

/// Load a schema from a file path.
///
/// # Errors
///
/// Returns `DispatchError::SchemaNotFound` if the file doesn't exist,
/// `DispatchError::SchemaNotLoadable` if it can't be read (a directory, no
/// permission), or `DispatchError::SchemaInvalid` if its bytes aren't valid
/// JSON, invalid UTF-8 included.
pub fn load_schema(path: &Path) -> Result<Value, DispatchError> {
    if !path.exists() {
        return Err(DispatchError::schema_not_found(path));
    }

    let content =
        std::fs::read(path).map_err(|source| DispatchError::schema_not_loadable(path, source))?;

    serde_json::from_slice(&content).map_err(|source| DispatchError::schema_invalid(path, source))
}

/// Navigate a JSON Pointer fragment (e.g., "#/$defs/foo" or "#/properties/bar").
///
/// Returns `None` when the fragment does not resolve within `schema`.
pub fn navigate_fragment<'a>(schema: &'a Value, fragment: &str) -> Option<&'a Value> {
    let pointer = fragment.trim_start_matches('#');
    if pointer.is_empty() {
        return Some(schema);
    }
    if !pointer.starts_with('/') {
        return None;
    }
    schema.pointer(pointer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn load_schema_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"type": "object"}}"#).unwrap();

        let schema = load_schema(file.path()).unwrap();
        assert_eq!(schema["type"], "object");
    }

    #[test]
    fn load_schema_file_not_found() {
        let result = load_schema(Path::new("/nonexistent/path.json"));
        assert!(matches!(result, Err(DispatchError::SchemaNotFound { .. })));
    }

    #[test]
    fn load_schema_directory_not_loadable() {
        let dir = tempdir().unwrap();

        let result = load_schema(dir.path());
        assert!(matches!(
            result,
            Err(DispatchError::SchemaNotLoadable { .. })
        ));
    }

    #[test]
    fn load_schema_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid json").unwrap();

        let result = load_schema(file.path());
        match result {
            Err(DispatchError::SchemaInvalid { path, .. }) => assert_eq!(path, file.path()),
            other => panic!("expected SchemaInvalid, got {other:?}"),
        }
    }

    #[test]
    fn load_schema_non_utf8_is_invalid() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{\"a\": \"\xff\"}").unwrap();

        let result = load_schema(file.path());
        assert!(
            matches!(result, Err(DispatchError::SchemaInvalid { .. })),
            "got {result:?}"
        );
    }

    #[test]
    fn load_errors_point_into_loader() {
        let err = load_schema(Path::new("/nonexistent/path.json")).unwrap_err();
        assert_eq!(err.location().file(), file!());
    }

    #[test]
    fn load_is_idempotent() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"properties": {{"parameter": {{"type": "object"}}}}}}"#
        )
        .unwrap();

        let loader = FsSchemaLoader;
        let first = loader.load(file.path()).unwrap();
        let second = loader.load(file.path()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn navigate_fragment_resolves_pointer() {
        let schema = json!({
            "properties": { "parameter": { "type": "object" } },
            "$defs": { "a/b": { "type": "string" } }
        });

        assert_eq!(
            navigate_fragment(&schema, "#/properties/parameter"),
            Some(&json!({ "type": "object" }))
        );
        assert_eq!(
            navigate_fragment(&schema, "#/$defs/a~1b"),
            Some(&json!({ "type": "string" }))
        );
        assert_eq!(navigate_fragment(&schema, "#"), Some(&schema));
        assert!(navigate_fragment(&schema, "#/properties/response").is_none());
        assert!(navigate_fragment(&schema, "#anchor").is_none());
    }
}
