//! JSON Schema API CLI
//!
//! Command-line interface for linting method schemas, validating requests
//! offline and replaying requests against fixture methods.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use json_schema_api::telemetry::{self, LogFormat, TelemetryConfig};
use json_schema_api::{
    lint, load_schema, DispatchError, Endpoint, FileStatus, FixtureProvider, FsSchemaLoader,
    MethodValidator, RequestValidator, Severity,
};

#[derive(Parser)]
#[command(name = "json-schema-api")]
#[command(about = "Lint method schemas and exercise schema-validated JSON API calls")]
#[command(version)]
struct Cli {
    /// Log line format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Log filter directive (defaults to RUST_LOG, then "warn")
    #[arg(long, global = true)]
    log_filter: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lint method schema files for errors (syntax, missing parameter, broken refs)
    Lint {
        /// File or directory to lint
        path: PathBuf,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Suppress progress output, only show errors
        #[arg(long, short)]
        quiet: bool,
    },

    /// Validate a request body (and optionally a result) against a method schema
    Validate {
        /// Request body file ({"method": ..., "parameter": ...})
        request: PathBuf,

        /// Method schema document
        #[arg(long)]
        schema: PathBuf,

        /// Handler result to check against the response schema
        #[arg(long)]
        response: Option<PathBuf>,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Serve a request body through an endpoint backed by fixture methods
    Call {
        /// Request body file
        request: PathBuf,

        /// Directory holding <method>.json schemas and optional <method>.result.json results
        #[arg(long)]
        methods: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = TelemetryConfig {
        format: cli.log_format,
        filter: cli.log_filter,
    };
    if let Err(e) = telemetry::init(&config) {
        eprintln!("Error: {}", e);
        return ExitCode::from(2);
    }

    let result = match cli.command {
        Commands::Lint {
            path,
            format,
            strict,
            quiet,
        } => run_lint(&path, &format, strict, quiet),

        Commands::Validate {
            request,
            schema,
            response,
            json,
        } => run_validate(&request, &schema, response.as_deref(), json),

        Commands::Call { request, methods } => run_call(&request, methods),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn run_validate(
    request_path: &Path,
    schema_path: &Path,
    response_path: Option<&Path>,
    json_output: bool,
) -> Result<(), u8> {
    let body = std::fs::read(request_path).map_err(|e| {
        report_error(
            json_output,
            &format!("reading {}: {}", request_path.display(), e),
        );
        3u8
    })?;

    let outcome = check_request(&body, schema_path, response_path);

    match outcome {
        Ok(()) => {
            if json_output {
                println!(r#"{{"valid":true}}"#);
            } else {
                println!("Valid");
            }
            Ok(())
        }
        Err(
            DispatchError::RequestMalformed { violations, .. }
            | DispatchError::ResponseMalformed { violations, .. },
        ) => {
            if json_output {
                let output = serde_json::json!({
                    "valid": false,
                    "errors": violations
                });
                println!("{}", output);
            } else {
                eprintln!("Validation failed:");
                for violation in violations {
                    eprintln!("  {}", violation);
                }
            }
            Err(1)
        }
        Err(e) => {
            report_error(json_output, &e.to_string());
            Err(e.exit_code() as u8)
        }
    }
}

/// Run the same checks the endpoint runs, without a handler.
fn check_request(
    body: &[u8],
    schema_path: &Path,
    response_path: Option<&Path>,
) -> Result<(), DispatchError> {
    let envelope = RequestValidator::new(Arc::new(FsSchemaLoader)).validate_slice(body)?;
    let schema = load_schema(schema_path)?;

    MethodValidator.validate_input(&schema, &envelope)?;

    if let Some(path) = response_path {
        let output = read_result(path)?;
        MethodValidator.validate_output(&schema, &output)?;
    }
    Ok(())
}

fn read_result(path: &Path) -> Result<serde_json::Value, DispatchError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        DispatchError::unexpected(format!("reading {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        DispatchError::unexpected(format!("{} is no valid json ({})", path.display(), e))
    })
}

fn run_call(request_path: &Path, methods: PathBuf) -> Result<(), u8> {
    let body = std::fs::read(request_path).map_err(|e| {
        eprintln!("Error: reading {}: {}", request_path.display(), e);
        3u8
    })?;

    let endpoint = Endpoint::new(Arc::new(FixtureProvider::new(methods)));
    let response = endpoint.serve(http::Request::new(body.as_slice()));

    eprintln!("HTTP {}", response.status());
    println!("{}", String::from_utf8_lossy(response.body()));

    if response.status().is_success() {
        Ok(())
    } else if response.status().is_client_error() {
        Err(1)
    } else {
        Err(2)
    }
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        println!("{}", serde_json::json!({ "valid": false, "error": msg }));
    } else {
        eprintln!("Error: {}", msg);
    }
}

fn run_lint(path: &Path, format: &str, strict: bool, quiet: bool) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(2);
    }

    let result = lint(path, strict);

    if format == "json" {
        let output = serde_json::to_string_pretty(&result).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        println!("{}", output);
    } else {
        if !quiet {
            println!("Linting {} ...\n", path.display());
        }

        for file_result in &result.results {
            let status_icon = match file_result.status {
                FileStatus::Ok => "\x1b[32m✓\x1b[0m",
                FileStatus::Warning => "\x1b[33m⚠\x1b[0m",
                FileStatus::Error => "\x1b[31m✗\x1b[0m",
            };

            if !quiet || file_result.status != FileStatus::Ok {
                println!("  {} {}", status_icon, file_result.file.display());
            }

            for diag in &file_result.diagnostics {
                let (color, label) = match diag.severity {
                    Severity::Error => ("\x1b[31m", "error"),
                    Severity::Warning => ("\x1b[33m", "warning"),
                };
                if !quiet || diag.severity == Severity::Error {
                    println!(
                        "    {}{}[{}]\x1b[0m: {} - {}",
                        color, label, diag.code, diag.path, diag.message
                    );
                }
            }
        }

        println!();
        if result.is_ok() && (!strict || result.warnings == 0) {
            println!(
                "\x1b[32m✓ {} files checked, all passed\x1b[0m",
                result.files_checked
            );
        } else {
            println!(
                "\x1b[31m✗ {} files checked: {} passed, {} failed ({} errors, {} warnings)\x1b[0m",
                result.files_checked, result.passed, result.failed, result.errors, result.warnings
            );
        }
    }

    if result.is_ok() && (!strict || result.warnings == 0) {
        Ok(())
    } else {
        Err(1)
    }
}
