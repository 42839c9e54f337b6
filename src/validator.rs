//! Validation of method parameters and results against method schemas.

use serde_json::{json, Map, Value};

use crate::error::{DispatchError, ValidateError, Violation};
use crate::request::Envelope;

/// Root keywords an extracted sub-schema inherits from its document: the
/// declared draft, the base URI, and shared definitions for internal `$ref`s.
const INHERITED_KEYWORDS: &[&str] = &["$schema", "$id", "definitions", "$defs"];

/// Validate an instance against a schema.
///
/// Collects every violation rather than stopping at the first.
///
/// # Errors
///
/// `ValidateError::InvalidSchema` when the schema can't be compiled,
/// `ValidateError::Invalid` when the instance doesn't conform.
pub fn validate_against_schema(schema: &Value, instance: &Value) -> Result<(), ValidateError> {
    let validator =
        jsonschema::validator_for(schema).map_err(|e| ValidateError::InvalidSchema {
            message: e.to_string(),
        })?;

    let violations: Vec<Violation> = validator
        .iter_errors(instance)
        .map(|e| Violation {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidateError::Invalid { violations })
    }
}

/// Group violation messages by instance path for logging.
///
/// The root instance is keyed as `/`.
pub fn format_violations(violations: &[Violation]) -> Value {
    let mut grouped = Map::new();
    for violation in violations {
        let key = if violation.path.is_empty() {
            "/".to_string()
        } else {
            violation.path.clone()
        };
        let entry = grouped
            .entry(key)
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(messages) = entry {
            messages.push(Value::String(violation.message.clone()));
        }
    }
    Value::Object(grouped)
}

/// Returns the `parameter` sub-schema of a method schema document.
///
/// # Errors
///
/// `DispatchError::SchemaUnusable` if the document declares no parameter.
pub fn parameter_schema(document: &Value) -> Result<Value, DispatchError> {
    let parameter = document
        .pointer("/properties/parameter")
        .ok_or_else(|| {
            DispatchError::schema_unusable("schema declares no `properties.parameter`")
        })?;
    Ok(inherit_root_keywords(document, parameter.clone()))
}

/// Returns the schema results are checked against, if the document declares one.
///
/// The bare `response` schema is wrapped so it describes the `{data: ...}`
/// envelope the caller eventually receives.
pub fn response_schema(document: &Value) -> Option<Value> {
    let response = document.pointer("/properties/response")?;
    let wrapped = json!({
        "type": "object",
        "properties": { "data": response },
        "required": ["data"]
    });
    Some(inherit_root_keywords(document, wrapped))
}

/// Copy root-level keywords into an extracted sub-schema so it compiles
/// under the document's draft and internal `#/definitions/...` references
/// still resolve.
fn inherit_root_keywords(document: &Value, mut schema: Value) -> Value {
    if let Value::Object(target) = &mut schema {
        for &keyword in INHERITED_KEYWORDS {
            if let Some(value) = document.get(keyword) {
                target.entry(keyword).or_insert_with(|| value.clone());
            }
        }
    }
    schema
}

/// Checks parameters before and results after a handler runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct MethodValidator;

impl MethodValidator {
    /// Validate `envelope.parameter` against the document's parameter schema.
    ///
    /// # Errors
    ///
    /// `DispatchError::RequestMalformed` when the parameter doesn't conform,
    /// `DispatchError::SchemaUnusable` when the document is broken.
    pub fn validate_input(&self, document: &Value, envelope: &Envelope) -> Result<(), DispatchError> {
        let schema = parameter_schema(document)?;

        validate_against_schema(&schema, &envelope.parameter).map_err(|e| match e {
            ValidateError::Invalid { violations } => {
                DispatchError::request_malformed("Bad Request", violations)
            }
            ValidateError::InvalidSchema { message } => DispatchError::schema_unusable(message),
        })
    }

    /// Validate a handler result against the document's response schema.
    ///
    /// Documents without `properties.response` accept any result.
    ///
    /// # Errors
    ///
    /// `DispatchError::ResponseMalformed` carrying the violations when the
    /// result doesn't conform.
    pub fn validate_output(&self, document: &Value, output: &Value) -> Result<(), DispatchError> {
        let Some(schema) = response_schema(document) else {
            return Ok(());
        };

        let wrapped = json!({ "data": output });
        validate_against_schema(&schema, &wrapped).map_err(|e| match e {
            ValidateError::Invalid { violations } => DispatchError::response_malformed(violations),
            ValidateError::InvalidSchema { message } => DispatchError::schema_unusable(message),
        })
    }
}
