//! The dispatch pipeline: lookup, schema load, input check, handler, output check.

use std::sync::Arc;

use http::request::Parts;
use serde_json::Value;

use crate::contract::MethodProvider;
use crate::error::DispatchError;
use crate::loader::SchemaLoader;
use crate::request::Envelope;
use crate::validator::MethodValidator;

/// Routes a validated envelope to its handler.
///
/// Steps run strictly in order and the first failure ends the dispatch.
/// Nothing is retried and nothing is kept between calls.
#[derive(Clone)]
pub struct MethodDispatcher {
    loader: Arc<dyn SchemaLoader>,
    validator: MethodValidator,
    provider: Arc<dyn MethodProvider>,
}

impl MethodDispatcher {
    pub fn new(
        loader: Arc<dyn SchemaLoader>,
        validator: MethodValidator,
        provider: Arc<dyn MethodProvider>,
    ) -> Self {
        Self {
            loader,
            validator,
            provider,
        }
    }

    /// Run `envelope` through its handler and return the handler's result.
    ///
    /// # Errors
    ///
    /// `MethodNotFound` for unknown methods, loader errors for the method
    /// schema, `RequestMalformed` for parameters the schema rejects,
    /// `Handler` for whatever the handler raised, and `ResponseMalformed`
    /// for results the response schema rejects.
    pub fn dispatch(&self, request: &Parts, envelope: Envelope) -> Result<Value, DispatchError> {
        tracing::debug!(
            method = %envelope.method,
            parameter = %envelope.parameter,
            "dispatching api method"
        );

        let handler = self
            .provider
            .lookup(&envelope.method)
            .ok_or_else(|| DispatchError::method_not_found(envelope.method.as_str()))?;

        tracing::debug!(method = %envelope.method, "api method resolved");

        let schema = self.loader.load(handler.schema_file())?;

        self.validator.validate_input(&schema, &envelope)?;

        let result = handler.handle(request, envelope.parameter)?;

        self.validator.validate_output(&schema, &result)?;

        Ok(result)
    }
}

impl std::fmt::Debug for MethodDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodDispatcher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{ApiMethod, MethodRegistry};
    use crate::error::HandlerError;
    use crate::loader::FsSchemaLoader;
    use serde_json::json;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Returns a fixed result and counts invocations.
    struct Fixed {
        schema: PathBuf,
        result: Value,
        calls: Arc<AtomicUsize>,
    }

    impl ApiMethod for Fixed {
        fn handle(&self, _request: &Parts, _parameter: Value) -> Result<Value, HandlerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.result.clone())
        }

        fn schema_file(&self) -> &Path {
            &self.schema
        }
    }

    struct Echo(PathBuf);

    impl ApiMethod for Echo {
        fn handle(&self, _request: &Parts, parameter: Value) -> Result<Value, HandlerError> {
            Ok(parameter)
        }

        fn schema_file(&self) -> &Path {
            &self.0
        }
    }

    struct Rejecting(PathBuf);

    impl ApiMethod for Rejecting {
        fn handle(&self, _request: &Parts, _parameter: Value) -> Result<Value, HandlerError> {
            Err(HandlerError::rejected("beer is out of stock", 1001))
        }

        fn schema_file(&self) -> &Path {
            &self.0
        }
    }

    /// Loader that counts how often it is asked for a schema.
    struct CountingLoader(AtomicUsize);

    impl SchemaLoader for CountingLoader {
        fn load(&self, path: &Path) -> Result<Value, DispatchError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            FsSchemaLoader.load(path)
        }
    }

    fn write_schema(dir: &TempDir, name: &str, schema: Value) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, schema.to_string()).unwrap();
        path
    }

    fn parts() -> Parts {
        http::Request::new(()).into_parts().0
    }

    fn dispatcher(provider: MethodRegistry) -> MethodDispatcher {
        MethodDispatcher::new(Arc::new(FsSchemaLoader), MethodValidator, Arc::new(provider))
    }

    fn envelope(method: &str, parameter: Value) -> Envelope {
        Envelope {
            method: method.into(),
            parameter,
        }
    }

    fn string_parameter_schema() -> Value {
        json!({
            "properties": {
                "parameter": {
                    "type": "object",
                    "properties": { "style": { "type": "string" } },
                    "required": ["style"]
                }
            }
        })
    }

    #[test]
    fn result_passes_through_without_response_schema() {
        let dir = TempDir::new().unwrap();
        let schema = write_schema(&dir, "echo.json", json!({ "properties": { "parameter": {} } }));
        let registry = MethodRegistry::new().register("echo", Echo(schema));

        let parameter = json!({ "nested": { "list": [1, "two", null] } });
        let result = dispatcher(registry)
            .dispatch(&parts(), envelope("echo", parameter.clone()))
            .unwrap();
        assert_eq!(result, parameter);
    }

    #[test]
    fn unknown_method_never_loads_schema() {
        let loader = Arc::new(CountingLoader(AtomicUsize::new(0)));
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = MethodRegistry::new().register(
            "beerlist",
            Fixed {
                schema: PathBuf::from("/nonexistent.json"),
                result: json!({}),
                calls: calls.clone(),
            },
        );
        let dispatcher = MethodDispatcher::new(loader.clone(), MethodValidator, Arc::new(registry));

        let result = dispatcher.dispatch(&parts(), envelope("unknown", json!({})));
        match result {
            Err(DispatchError::MethodNotFound { method, .. }) => assert_eq!(method, "unknown"),
            other => panic!("expected MethodNotFound, got {other:?}"),
        }
        assert_eq!(loader.0.load(Ordering::SeqCst), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn malformed_parameter_never_invokes_handler() {
        let dir = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = MethodRegistry::new().register(
            "beerlist",
            Fixed {
                schema: write_schema(&dir, "beerlist.json", string_parameter_schema()),
                result: json!({}),
                calls: calls.clone(),
            },
        );

        let result =
            dispatcher(registry).dispatch(&parts(), envelope("beerlist", json!({ "style": 7 })));
        assert!(matches!(
            result,
            Err(DispatchError::RequestMalformed { .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn missing_schema_file_propagates() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.json");
        let registry = MethodRegistry::new().register("beerlist", Echo(missing.clone()));

        let result = dispatcher(registry).dispatch(&parts(), envelope("beerlist", json!({})));
        match result {
            Err(DispatchError::SchemaNotFound { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected SchemaNotFound, got {other:?}"),
        }
    }

    #[test]
    fn handler_rejection_propagates_unchanged() {
        let dir = TempDir::new().unwrap();
        let schema = write_schema(&dir, "order.json", json!({ "properties": { "parameter": {} } }));
        let registry = MethodRegistry::new().register("order", Rejecting(schema));

        let result = dispatcher(registry).dispatch(&parts(), envelope("order", json!({})));
        match result {
            Err(DispatchError::Handler(HandlerError::Rejected { message, code, .. })) => {
                assert_eq!(message, "beer is out of stock");
                assert_eq!(code, 1001);
            }
            other => panic!("expected handler rejection, got {other:?}"),
        }
    }

    #[test]
    fn nonconforming_result_is_response_malformed() {
        let dir = TempDir::new().unwrap();
        let schema = write_schema(
            &dir,
            "count.json",
            json!({
                "properties": {
                    "parameter": {},
                    "response": {
                        "type": "object",
                        "properties": { "count": { "type": "number" } },
                        "required": ["count"]
                    }
                }
            }),
        );
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = MethodRegistry::new().register(
            "count",
            Fixed {
                schema,
                result: json!({ "count": "not-a-number" }),
                calls: calls.clone(),
            },
        );

        let result = dispatcher(registry).dispatch(&parts(), envelope("count", json!({})));
        assert!(matches!(
            result,
            Err(DispatchError::ResponseMalformed { .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn schema_loaded_once_per_dispatch() {
        let dir = TempDir::new().unwrap();
        let schema = write_schema(&dir, "echo.json", json!({ "properties": { "parameter": {} } }));
        let loader = Arc::new(CountingLoader(AtomicUsize::new(0)));
        let registry = MethodRegistry::new().register("echo", Echo(schema));
        let dispatcher = MethodDispatcher::new(loader.clone(), MethodValidator, Arc::new(registry));

        dispatcher
            .dispatch(&parts(), envelope("echo", json!({})))
            .unwrap();
        dispatcher
            .dispatch(&parts(), envelope("echo", json!({})))
            .unwrap();
        assert_eq!(loader.0.load(Ordering::SeqCst), 2);
    }
}
