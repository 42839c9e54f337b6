//! The outward-facing endpoint and single failure boundary.

use std::any::Any;
use std::io::Read;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use http::header::{HeaderValue, CONTENT_TYPE};
use http::request::Parts;
use http::{Request, Response, StatusCode};
use serde_json::Value;
use uuid::Uuid;

use crate::contract::MethodProvider;
use crate::dispatcher::MethodDispatcher;
use crate::error::{DispatchError, ErrorClass};
use crate::loader::{FsSchemaLoader, SchemaLoader};
use crate::request::RequestValidator;
use crate::response::ResponseBuilder;
use crate::validator::MethodValidator;

const APPLICATION_JSON: &str = "application/json";

/// Serves JSON API requests.
///
/// Every failure raised while validating, dispatching or handling a request
/// is caught here exactly once, logged under a fresh correlation id, and
/// turned into a status code. Client faults get an error body carrying the
/// id; internal faults get an empty body.
#[derive(Clone)]
pub struct Endpoint {
    request_validator: RequestValidator,
    dispatcher: MethodDispatcher,
    response_builder: ResponseBuilder,
    id_generator: fn() -> Uuid,
}

impl Endpoint {
    /// Endpoint with the filesystem loader and the bundled envelope schema.
    pub fn new(provider: Arc<dyn MethodProvider>) -> Self {
        Self::builder(provider).build()
    }

    pub fn builder(provider: Arc<dyn MethodProvider>) -> EndpointBuilder {
        EndpointBuilder {
            provider,
            loader: None,
            envelope_schema: None,
            id_generator: None,
        }
    }

    /// Execute the api method and build the response.
    ///
    /// The response always carries `Content-Type: application/json`.
    pub fn serve<B: Read>(&self, request: Request<B>) -> Response<Vec<u8>> {
        let (parts, body) = request.into_parts();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.process(&parts, body)))
            .unwrap_or_else(|payload| Err(DispatchError::unexpected(panic_message(&*payload))));

        let (status, body) = match outcome {
            Ok(data) => (
                StatusCode::OK,
                serde_json::to_vec(&self.response_builder.build_response(data)),
            ),
            Err(error) => {
                let id = (self.id_generator)();
                log_error(&error, id);
                match error.class() {
                    ErrorClass::Client => (
                        error.status(),
                        serde_json::to_vec(&self.response_builder.build_error_response(&error, id)),
                    ),
                    ErrorClass::Internal => (error.status(), Ok(Vec::new())),
                }
            }
        };

        let (status, body) = match body {
            Ok(bytes) => (status, bytes),
            Err(e) => {
                let error = DispatchError::unexpected(format!("response not serializable ({e})"));
                log_error(&error, (self.id_generator)());
                (StatusCode::INTERNAL_SERVER_ERROR, Vec::new())
            }
        };

        let mut response = Response::new(body);
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        response
    }

    fn process<B: Read>(&self, parts: &Parts, body: B) -> Result<Value, DispatchError> {
        let envelope = self.request_validator.validate(body)?;
        self.dispatcher.dispatch(parts, envelope)
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("request_validator", &self.request_validator)
            .finish_non_exhaustive()
    }
}

/// Assembles an [`Endpoint`]; every collaborator but the provider is optional.
pub struct EndpointBuilder {
    provider: Arc<dyn MethodProvider>,
    loader: Option<Arc<dyn SchemaLoader>>,
    envelope_schema: Option<PathBuf>,
    id_generator: Option<fn() -> Uuid>,
}

impl EndpointBuilder {
    pub fn schema_loader(mut self, loader: Arc<dyn SchemaLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Replace the bundled envelope schema.
    pub fn envelope_schema(mut self, path: impl Into<PathBuf>) -> Self {
        self.envelope_schema = Some(path.into());
        self
    }

    /// Source of correlation ids (UUID v4 by default).
    pub fn id_generator(mut self, generator: fn() -> Uuid) -> Self {
        self.id_generator = Some(generator);
        self
    }

    pub fn build(self) -> Endpoint {
        let loader = self
            .loader
            .unwrap_or_else(|| Arc::new(FsSchemaLoader) as Arc<dyn SchemaLoader>);

        let mut request_validator = RequestValidator::new(loader.clone());
        if let Some(path) = self.envelope_schema {
            request_validator = request_validator.with_envelope_schema(path);
        }

        Endpoint {
            request_validator,
            dispatcher: MethodDispatcher::new(loader, MethodValidator, self.provider),
            response_builder: ResponseBuilder,
            id_generator: self.id_generator.unwrap_or(Uuid::new_v4),
        }
    }
}

fn log_error(error: &DispatchError, id: Uuid) {
    let code = error.code();
    let location = error.location();
    match error.class() {
        ErrorClass::Client => tracing::warn!(
            id = %id,
            kind = error.kind(),
            code,
            file = location.file(),
            line = location.line(),
            "{error} ({code})"
        ),
        ErrorClass::Internal => tracing::error!(
            id = %id,
            kind = error.kind(),
            code,
            file = location.file(),
            line = location.line(),
            context = %error.context(),
            "{error} ({code})"
        ),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("handler panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("handler panicked: {message}")
    } else {
        "handler panicked".to_string()
    }
}
