//! Request body decoding and envelope validation.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DispatchError, ValidateError};
use crate::loader::SchemaLoader;
use crate::validator::validate_against_schema;

/// Envelope schema shipped with the crate.
pub const ENVELOPE_SCHEMA_FILE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/dist/request.json");

/// Decoded top-level request: `{"method": "...", "parameter": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub method: String,
    pub parameter: Value,
}

/// Decodes a raw request body and checks it against the envelope schema.
#[derive(Clone)]
pub struct RequestValidator {
    loader: Arc<dyn SchemaLoader>,
    envelope_schema: PathBuf,
}

impl RequestValidator {
    pub fn new(loader: Arc<dyn SchemaLoader>) -> Self {
        Self {
            loader,
            envelope_schema: PathBuf::from(ENVELOPE_SCHEMA_FILE),
        }
    }

    /// Use a different envelope schema than the bundled one.
    pub fn with_envelope_schema(mut self, path: impl Into<PathBuf>) -> Self {
        self.envelope_schema = path.into();
        self
    }

    pub fn envelope_schema(&self) -> &Path {
        &self.envelope_schema
    }

    /// Read the whole body and return the validated envelope.
    ///
    /// The body is consumed exactly once.
    ///
    /// # Errors
    ///
    /// `JsonInvalid` for bodies that don't parse, `RequestMalformed` for
    /// bodies that don't match the envelope schema, schema loader errors
    /// unchanged, and `Unexpected` if the body can't be read.
    pub fn validate<R: Read>(&self, mut body: R) -> Result<Envelope, DispatchError> {
        let mut raw = Vec::new();
        body.read_to_end(&mut raw).map_err(|e| {
            DispatchError::unexpected(format!("request body not readable ({e})"))
        })?;

        self.validate_slice(&raw)
    }

    /// Same as [`validate`](Self::validate) for an already buffered body.
    pub fn validate_slice(&self, raw: &[u8]) -> Result<Envelope, DispatchError> {
        let decoded: Value =
            serde_json::from_slice(raw).map_err(|source| DispatchError::json_invalid(source))?;

        let schema = self.loader.load(&self.envelope_schema)?;

        validate_against_schema(&schema, &decoded).map_err(|e| match e {
            ValidateError::Invalid { violations } => {
                DispatchError::request_malformed("Request is invalid", violations)
            }
            ValidateError::InvalidSchema { message } => DispatchError::schema_unusable(message),
        })?;

        // A replacement envelope schema may admit shapes we can't decode
        serde_json::from_value(decoded).map_err(|e| {
            DispatchError::request_malformed(
                "Request is invalid",
                vec![crate::error::Violation {
                    path: String::new(),
                    message: e.to_string(),
                }],
            )
        })
    }
}

impl std::fmt::Debug for RequestValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestValidator")
            .field("envelope_schema", &self.envelope_schema)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::FsSchemaLoader;
    use serde_json::json;

    fn validator() -> RequestValidator {
        RequestValidator::new(Arc::new(FsSchemaLoader))
    }

    #[test]
    fn valid_envelope_is_returned_unmodified() {
        let body = br#"{"method": "beerlist", "parameter": {"style": "ipa"}}"#;

        let envelope = validator().validate(&body[..]).unwrap();
        assert_eq!(envelope.method, "beerlist");
        assert_eq!(envelope.parameter, json!({ "style": "ipa" }));
    }

    #[test]
    fn invalid_json_embeds_parser_diagnostic() {
        let result = validator().validate(&b"not-json"[..]);
        match result {
            Err(err @ DispatchError::JsonInvalid { .. }) => {
                let message = err.to_string();
                assert!(message.starts_with("Input is no valid json ("));
                assert!(message.contains("line 1"));
            }
            other => panic!("expected JsonInvalid, got {other:?}"),
        }
    }

    #[test]
    fn empty_body_is_invalid_json() {
        let result = validator().validate(&b""[..]);
        assert!(matches!(result, Err(DispatchError::JsonInvalid { .. })));
    }

    #[test]
    fn missing_method_is_malformed() {
        let result = validator().validate(&br#"{"parameter": {}}"#[..]);
        match result {
            Err(DispatchError::RequestMalformed { message, violations, .. }) => {
                assert_eq!(message, "Request is invalid");
                assert!(!violations.is_empty());
            }
            other => panic!("expected RequestMalformed, got {other:?}"),
        }
    }

    #[test]
    fn wrong_method_type_is_malformed() {
        let result = validator().validate(&br#"{"method": 42, "parameter": {}}"#[..]);
        assert!(matches!(
            result,
            Err(DispatchError::RequestMalformed { .. })
        ));
    }

    #[test]
    fn empty_method_is_malformed() {
        let result = validator().validate(&br#"{"method": "", "parameter": {}}"#[..]);
        assert!(matches!(
            result,
            Err(DispatchError::RequestMalformed { .. })
        ));
    }

    #[test]
    fn non_object_body_is_malformed() {
        let result = validator().validate(&b"[1, 2, 3]"[..]);
        assert!(matches!(
            result,
            Err(DispatchError::RequestMalformed { .. })
        ));
    }

    #[test]
    fn extra_envelope_properties_are_ignored() {
        let body = br#"{"method": "beerlist", "version": 2, "parameter": {}}"#;

        let envelope = validator().validate(&body[..]).unwrap();
        assert_eq!(envelope.method, "beerlist");
    }

    #[test]
    fn missing_envelope_schema_propagates_loader_error() {
        let validator = validator().with_envelope_schema("/nonexistent/request.json");
        let result = validator.validate(&br#"{"method": "a", "parameter": {}}"#[..]);
        assert!(matches!(result, Err(DispatchError::SchemaNotFound { .. })));
    }

    #[test]
    fn unreadable_body_is_unexpected() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::from(std::io::ErrorKind::ConnectionReset))
            }
        }

        let result = validator().validate(Broken);
        assert!(matches!(result, Err(DispatchError::Unexpected { .. })));
    }
}
