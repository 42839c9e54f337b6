//! JSON Schema API
//!
//! Schema-validated dispatch of JSON API calls.
//!
//! A request body `{"method": "...", "parameter": ...}` is decoded, checked
//! against the envelope schema, routed to the named [`ApiMethod`], and the
//! parameter and result are checked against that method's schema document.
//! The [`Endpoint`] turns the outcome into a response envelope.
//!
//! # Example
//!
//! ```
//! use std::path::{Path, PathBuf};
//! use std::sync::Arc;
//!
//! use http::request::Parts;
//! use json_schema_api::{ApiMethod, Endpoint, HandlerError, MethodRegistry};
//! use serde_json::{json, Value};
//!
//! struct BeerList(PathBuf);
//!
//! impl ApiMethod for BeerList {
//!     fn handle(&self, _request: &Parts, _parameter: Value) -> Result<Value, HandlerError> {
//!         Ok(json!({ "beer_style_list": ["ipa", "lager"] }))
//!     }
//!
//!     fn schema_file(&self) -> &Path {
//!         &self.0
//!     }
//! }
//!
//! let dir = tempfile::tempdir().unwrap();
//! let schema = dir.path().join("beerlist.json");
//! std::fs::write(&schema, r#"{"properties": {"parameter": {"type": "object"}}}"#).unwrap();
//!
//! let registry = MethodRegistry::new().register("beerlist", BeerList(schema));
//! let endpoint = Endpoint::new(Arc::new(registry));
//!
//! let request = http::Request::new(&br#"{"method": "beerlist", "parameter": {}}"#[..]);
//! let response = endpoint.serve(request);
//!
//! assert_eq!(response.status(), 200);
//! assert_eq!(
//!     response.body().as_slice(),
//!     br#"{"data":{"beer_style_list":["ipa","lager"]}}"#
//! );
//! ```
//!
//! # Status Mapping
//!
//! | Failure | Status | Body |
//! |---------|--------|------|
//! | invalid JSON, envelope or parameter mismatch, unknown method, handler rejection | 400 | `{"error": {"message", "code", "id"}}` |
//! | missing/unreadable/invalid schema, result mismatch, anything unexpected | 500 | empty |
//!
//! # Method Schema Format
//!
//! ```json
//! {
//!   "properties": {
//!     "parameter": { "type": "object" },
//!     "response": { "type": "object" }
//!   }
//! }
//! ```
//!
//! `response` is optional; without it results are not validated.

mod contract;
mod dispatcher;
mod endpoint;
mod error;
mod fixture;
mod linter;
mod loader;
mod request;
mod response;
pub mod telemetry;
mod validator;

pub use contract::{ApiMethod, MethodProvider, MethodRegistry};
pub use dispatcher::MethodDispatcher;
pub use endpoint::{Endpoint, EndpointBuilder};
pub use error::{DispatchError, ErrorClass, HandlerError, Origin, ValidateError, Violation};
pub use fixture::FixtureProvider;
pub use linter::{lint, lint_file, Diagnostic, FileResult, FileStatus, LintResult, Severity};
pub use loader::{load_schema, navigate_fragment, FsSchemaLoader, SchemaLoader};
pub use request::{Envelope, RequestValidator, ENVELOPE_SCHEMA_FILE};
pub use response::{ErrorBody, ErrorDetail, ResponseBuilder, SuccessBody};
pub use validator::{
    format_violations, parameter_schema, response_schema, validate_against_schema,
    MethodValidator,
};
