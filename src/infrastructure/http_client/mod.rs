//! HTTP client for communicating with the tanya-service backend.
//!
//! This module provides a store implementation that proxies document
//! operations to a running tanya-service instance via HTTP, so several
//! clients can share one sled database without fighting over its lock.

mod remote_store;

pub use remote_store::RemoteDocumentStore;

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::domain::DomainError;

/// Default service host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default service port
pub const DEFAULT_PORT: u16 = 3210;

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

/// True when a tanya-service at `host:port` answers its health probe.
pub fn check_service_availability(host: &str, port: u16) -> bool {
    let url = format!("{}/health", get_service_url(host, port));
    debug!(target: "tanya::http_client", %url, "probing service");

    let probe = ureq::get(&url)
        .timeout(Duration::from_secs(2))
        .call()
        .map_err(|err| err.to_string())
        .and_then(|response| {
            response
                .into_json::<HealthResponse>()
                .map_err(|err| err.to_string())
        });

    match probe {
        Ok(health) => health.status == "healthy",
        Err(reason) => {
            debug!(target: "tanya::http_client", %reason, "service not available");
            false
        }
    }
}

pub fn get_service_url(host: &str, port: u16) -> String {
    format!("http://{host}:{port}")
}

/// JSON error body returned by tanya-service.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Rebuild the service's `DomainError` from an HTTP failure.
pub fn handle_http_error(error: ureq::Error) -> DomainError {
    match error {
        ureq::Error::Status(status, response) => match response.into_json::<ErrorResponse>() {
            Ok(body) => from_error_code(&body.code, body.error),
            Err(_) if status == 404 => DomainError::not_found("remote resource"),
            Err(_) => DomainError::storage(format!("tanya-service replied HTTP {status}")),
        },
        ureq::Error::Transport(transport) => {
            DomainError::storage(format!("tanya-service unreachable: {transport}"))
        }
    }
}

fn from_error_code(code: &str, message: String) -> DomainError {
    match code {
        "VALIDATION" => DomainError::Validation(message),
        "LIMIT_EXCEEDED" => DomainError::LimitExceeded(message),
        "NOT_FOUND" => DomainError::NotFound(message),
        "GENERATION_FAILED" => DomainError::Generation(message),
        "CANCELLED" => DomainError::Cancelled,
        _ => DomainError::Storage(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_url_uses_http_scheme() {
        assert_eq!(get_service_url("localhost", 3210), "http://localhost:3210");
    }

    #[test]
    fn service_error_codes_round_trip() {
        assert!(matches!(
            from_error_code("VALIDATION", "bad".into()),
            DomainError::Validation(msg) if msg == "bad"
        ));
        assert!(matches!(
            from_error_code("NOT_FOUND", "doc".into()),
            DomainError::NotFound(_)
        ));
        assert!(matches!(
            from_error_code("INTERNAL", "boom".into()),
            DomainError::Storage(_)
        ));
    }

    #[test]
    fn unreachable_service_is_unavailable() {
        // port 9 (discard) is not expected to run an HTTP server
        assert!(!check_service_availability("127.0.0.1", 9));
    }
}
