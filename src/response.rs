//! Response envelopes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::DispatchError;

/// Successful response body: `{"data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessBody {
    pub data: Value,
}

/// Client error response body: `{"error": {"message", "code", "id"}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    pub code: i64,
    /// Correlation id of the matching log entry.
    pub id: Uuid,
}

/// Wraps handler results and client errors into their wire envelopes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseBuilder;

impl ResponseBuilder {
    pub fn build_response(&self, data: Value) -> SuccessBody {
        SuccessBody { data }
    }

    /// Only the error's message and code reach the body; its context stays
    /// in the log.
    pub fn build_error_response(&self, error: &DispatchError, id: Uuid) -> ErrorBody {
        ErrorBody {
            error: ErrorDetail {
                message: error.to_string(),
                code: error.code(),
                id,
            },
        }
    }
}
