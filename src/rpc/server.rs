//! JSON-RPC server over stdin/stdout.
//!
//! Implements the JSON-RPC 2.0 protocol for daemon communication. Stdout
//! carries only the JSON-RPC stream; diagnostics go to stderr.

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::DaemonConfig;
use crate::error::Result;
use crate::pipeline::ClassificationPipeline;

use super::methods::handle_request;
use super::types::{JsonRpcError, JsonRpcErrorResponse, JsonRpcRequest};

/// State shared across all request handlers.
pub struct ServerState {
    /// Classification pipeline holding the loaded models.
    pub pipeline: ClassificationPipeline,
    /// Daemon configuration.
    pub config: DaemonConfig,
    /// Flag to signal server shutdown.
    shutdown: Arc<AtomicBool>,
}

impl ServerState {
    /// Creates new server state around an already-constructed pipeline.
    ///
    /// The pipeline owns the model handles; building it (and failing fatally
    /// on a classifier load error) is the caller's job, before the server
    /// starts accepting requests.
    pub fn new(pipeline: ClassificationPipeline, config: DaemonConfig) -> Self {
        Self {
            pipeline,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Signals the server to shut down.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Returns true if shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

/// Runs the JSON-RPC server, reading from stdin and writing to stdout.
pub fn run_server(state: ServerState) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let reader = stdin.lock();

    eprintln!("JSON-RPC server started, waiting for requests...");

    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Error reading stdin: {}", e);
                break;
            }
        };

        // Skip empty lines
        if line.trim().is_empty() {
            continue;
        }

        // Parse and handle the JSON-RPC request
        let response = process_request(&line, &state);

        // Write response
        if let Some(response) = response {
            writeln!(stdout, "{}", response).ok();
            stdout.flush().ok();
        }

        // Check for shutdown
        if state.is_shutdown() {
            eprintln!("Server shutdown requested");
            break;
        }
    }

    eprintln!("JSON-RPC server stopped");
    Ok(())
}

/// Processes a single JSON-RPC request line.
fn process_request(line: &str, state: &ServerState) -> Option<String> {
    let request = match parse_request(line) {
        Ok(request) => request,
        Err(response) => return Some(response),
    };

    // Handle the request
    let result = handle_request(&request.method, request.params.clone(), state);

    match result {
        Ok(response) => Some(
            serde_json::to_string(&serde_json::json!({
                "jsonrpc": "2.0",
                "id": request.id,
                "result": response
            }))
            .unwrap_or_default(),
        ),
        Err(error) => Some(
            serde_json::to_string(&JsonRpcErrorResponse::new(Some(request.id), error))
                .unwrap_or_default(),
        ),
    }
}

/// Parses a request line, producing a serialized error response on failure.
fn parse_request(line: &str) -> std::result::Result<JsonRpcRequest, String> {
    // Parse JSON
    let request: JsonRpcRequest = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => {
            let error = JsonRpcErrorResponse::new(
                None,
                JsonRpcError::parse_error(format!("Invalid JSON: {}", e)),
            );
            return Err(serde_json::to_string(&error).unwrap_or_default());
        }
    };

    // Validate JSON-RPC version
    if request.jsonrpc != "2.0" {
        let error = JsonRpcErrorResponse::new(
            Some(request.id),
            JsonRpcError::invalid_request("Invalid JSON-RPC version (expected 2.0)"),
        );
        return Err(serde_json::to_string(&error).unwrap_or_default());
    }

    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_invalid_json() {
        let response = parse_request("not json").unwrap_err();
        assert!(response.contains("-32700")); // Parse error
    }

    #[test]
    fn parse_invalid_version() {
        let request = r#"{"jsonrpc":"1.0","method":"test","id":1}"#;
        let response = parse_request(request).unwrap_err();
        assert!(response.contains("-32600")); // Invalid request
    }

    #[test]
    fn parse_valid_request() {
        let request =
            parse_request(r#"{"jsonrpc":"2.0","method":"classify","id":7,"params":{"path":"x"}}"#)
                .unwrap();
        assert_eq!(request.method, "classify");
        assert_eq!(request.id, crate::rpc::types::RequestId::Integer(7));
    }

    #[test]
    fn parse_request_without_params() {
        let request = parse_request(r#"{"jsonrpc":"2.0","method":"ping","id":1}"#).unwrap();
        assert_eq!(request.method, "ping");
        assert!(request.params.is_null());
    }
}
