//! Error types for request dispatch and schema validation.

use std::panic::Location;
use std::path::PathBuf;

use http::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;

use crate::validator::format_violations;

/// Which side of the wire caused a failure.
///
/// Client failures are reported to the caller with an error body; internal
/// failures are logged and answered with an empty body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Client,
    Internal,
}

/// Source location an error was raised at.
pub type Origin = &'static Location<'static>;

/// Every way a request can fail between body decoding and the response envelope.
///
/// Each variant records where it was raised; build them through the
/// constructors so the location points at the raising call.
#[derive(Debug, Error)]
pub enum DispatchError {
    // Caller faults (400)
    #[error("Input is no valid json ({source})")]
    JsonInvalid {
        #[source]
        source: serde_json::Error,
        location: Origin,
    },

    #[error("{message}")]
    RequestMalformed {
        message: String,
        violations: Vec<Violation>,
        location: Origin,
    },

    #[error("Method not found")]
    MethodNotFound { method: String, location: Origin },

    #[error(transparent)]
    Handler(#[from] HandlerError),

    // Internal faults (500)
    #[error("Schema file `{}` not found", path.display())]
    SchemaNotFound { path: PathBuf, location: Origin },

    #[error("Schema file `{}` not loadable", path.display())]
    SchemaNotLoadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        location: Origin,
    },

    #[error("Schema does not contain valid json ({source})")]
    SchemaInvalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
        location: Origin,
    },

    #[error("Schema is not usable ({reason})")]
    SchemaUnusable { reason: String, location: Origin },

    #[error("Internal Server Error")]
    ResponseMalformed {
        violations: Vec<Violation>,
        location: Origin,
    },

    #[error("{message}")]
    Unexpected { message: String, location: Origin },
}

impl DispatchError {
    #[track_caller]
    pub fn json_invalid(source: serde_json::Error) -> Self {
        Self::JsonInvalid {
            source,
            location: Location::caller(),
        }
    }

    /// Envelope or parameter rejected by its schema.
    #[track_caller]
    pub fn request_malformed(message: impl Into<String>, violations: Vec<Violation>) -> Self {
        Self::RequestMalformed {
            message: message.into(),
            violations,
            location: Location::caller(),
        }
    }

    #[track_caller]
    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::MethodNotFound {
            method: method.into(),
            location: Location::caller(),
        }
    }

    #[track_caller]
    pub fn schema_not_found(path: impl Into<PathBuf>) -> Self {
        Self::SchemaNotFound {
            path: path.into(),
            location: Location::caller(),
        }
    }

    #[track_caller]
    pub fn schema_not_loadable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::SchemaNotLoadable {
            path: path.into(),
            source,
            location: Location::caller(),
        }
    }

    #[track_caller]
    pub fn schema_invalid(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::SchemaInvalid {
            path: path.into(),
            source,
            location: Location::caller(),
        }
    }

    #[track_caller]
    pub fn schema_unusable(reason: impl Into<String>) -> Self {
        Self::SchemaUnusable {
            reason: reason.into(),
            location: Location::caller(),
        }
    }

    /// Handler result rejected by the response schema.
    #[track_caller]
    pub fn response_malformed(violations: Vec<Violation>) -> Self {
        Self::ResponseMalformed {
            violations,
            location: Location::caller(),
        }
    }

    #[track_caller]
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            message: message.into(),
            location: Location::caller(),
        }
    }

    /// Where the error was raised. Handler errors report the handler's own
    /// raising call.
    pub fn location(&self) -> Origin {
        match self {
            Self::Handler(error) => error.location(),
            Self::JsonInvalid { location, .. }
            | Self::RequestMalformed { location, .. }
            | Self::MethodNotFound { location, .. }
            | Self::SchemaNotFound { location, .. }
            | Self::SchemaNotLoadable { location, .. }
            | Self::SchemaInvalid { location, .. }
            | Self::SchemaUnusable { location, .. }
            | Self::ResponseMalformed { location, .. }
            | Self::Unexpected { location, .. } => location,
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::JsonInvalid { .. }
            | Self::RequestMalformed { .. }
            | Self::MethodNotFound { .. }
            | Self::Handler(HandlerError::Rejected { .. }) => ErrorClass::Client,
            _ => ErrorClass::Internal,
        }
    }

    /// Returns the HTTP status this error is answered with.
    pub fn status(&self) -> StatusCode {
        match self.class() {
            ErrorClass::Client => StatusCode::BAD_REQUEST,
            ErrorClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the `code` reported in the error body and the log line.
    ///
    /// Handlers pick their own code for rejections; everything else reports
    /// its status code.
    pub fn code(&self) -> i64 {
        match self {
            Self::Handler(HandlerError::Rejected { code, .. }) => *code,
            other => i64::from(other.status().as_u16()),
        }
    }

    /// Stable name of the error kind, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::JsonInvalid { .. } => "json_invalid",
            Self::RequestMalformed { .. } => "request_malformed",
            Self::MethodNotFound { .. } => "method_not_found",
            Self::Handler(HandlerError::Rejected { .. }) => "handler_rejected",
            Self::Handler(HandlerError::Failed { .. }) => "handler_failed",
            Self::SchemaNotFound { .. } => "schema_not_found",
            Self::SchemaNotLoadable { .. } => "schema_not_loadable",
            Self::SchemaInvalid { .. } => "schema_invalid",
            Self::SchemaUnusable { .. } => "schema_unusable",
            Self::ResponseMalformed { .. } => "response_malformed",
            Self::Unexpected { .. } => "unexpected",
        }
    }

    /// Structured detail for the log. Never part of a response body.
    pub fn context(&self) -> Value {
        match self {
            Self::RequestMalformed { violations, .. }
            | Self::ResponseMalformed { violations, .. } => {
                json!({ "errors": format_violations(violations) })
            }
            Self::MethodNotFound { method, .. } => json!({ "method": method }),
            Self::SchemaNotFound { path, .. } => json!({ "path": path }),
            Self::SchemaNotLoadable { path, source, .. } => {
                json!({ "path": path, "reason": source.to_string() })
            }
            Self::SchemaInvalid { path, .. } => json!({ "path": path }),
            Self::Handler(HandlerError::Failed { source, .. }) => {
                json!({ "reason": source.to_string() })
            }
            _ => json!({}),
        }
    }

    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::SchemaNotFound { .. }
            | Self::SchemaNotLoadable { .. }
            | Self::Unexpected { .. } => 3,
            Self::SchemaInvalid { .. }
            | Self::SchemaUnusable { .. }
            | Self::Handler(HandlerError::Failed { .. }) => 2,
            _ => 1,
        }
    }
}

/// Failure raised by an API method handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Business rule violation reported to the caller with the given code.
    #[error("{message}")]
    Rejected {
        message: String,
        code: i64,
        location: Origin,
    },

    /// Anything the handler did not anticipate. Logged, never shown.
    #[error("handler failed: {source}")]
    Failed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
        location: Origin,
    },
}

impl HandlerError {
    #[track_caller]
    pub fn rejected(message: impl Into<String>, code: i64) -> Self {
        Self::Rejected {
            message: message.into(),
            code,
            location: Location::caller(),
        }
    }

    #[track_caller]
    pub fn failed(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Failed {
            source: source.into(),
            location: Location::caller(),
        }
    }

    pub fn location(&self) -> Origin {
        match self {
            Self::Rejected { location, .. } | Self::Failed { location, .. } => location,
        }
    }
}

/// Errors from running an instance through the validation engine.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("invalid schema: {message}")]
    InvalidSchema { message: String },

    #[error("validation failed with {} error(s)", violations.len())]
    Invalid { violations: Vec<Violation> },
}

/// Single validation error with path context.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Violation {
    /// JSON Pointer (RFC 6901) to the invalid value; empty for the root.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "/: {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}
