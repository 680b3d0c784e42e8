//! Error types for esctl.

use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

/// Exit status for remote API failures and anything unclassified.
pub const EXIT_FAILURE: u8 = 1;
/// Exit status when the cluster cannot be reached at all (sysexits `EX_UNAVAILABLE`).
pub const EXIT_UNAVAILABLE: u8 = 69;
/// Exit status for configuration errors (sysexits `EX_CONFIG`).
pub const EXIT_CONFIG: u8 = 78;

/// Maximum number of body characters echoed back in error messages.
const BODY_PREVIEW_CHARS: usize = 200;

/// A configuration field whose value does not match the expected type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub field: String,
    pub expected: &'static str,
    pub actual: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid type for configuration field '{}'. Should be {}. Got '{}'",
            self.field, self.expected, self.actual
        )
    }
}

/// Errors raised while resolving a context name into a usable [`crate::models::Context`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("context '{0}' is not defined")]
    UnknownContext(String),

    #[error("context '{context}' references undefined cluster '{cluster}'")]
    UnknownCluster { context: String, cluster: String },

    #[error("context '{context}' references undefined user '{user}'")]
    UnknownUser { context: String, user: String },
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("cannot read YAML from {}: {message}{}", .path.display(), position(.line, .column))]
    SyntaxError {
        path: PathBuf,
        line: Option<usize>,
        column: Option<usize>,
        message: String,
    },

    #[error("{} doesn't match expected schema ({} problem(s))", .path.display(), .violations.len())]
    SchemaError {
        path: PathBuf,
        violations: Vec<SchemaViolation>,
    },

    #[error("cannot load context: {0}")]
    ContextResolutionError(#[from] ResolutionError),

    #[error("invalid value for setting '{key}': expected {expected}, got '{value}'")]
    InvalidSetting {
        key: String,
        expected: &'static str,
        value: String,
    },

    #[error("invalid server '{server}': {message}")]
    InvalidServer { server: String, message: String },

    #[error("cluster '{0}' has no servers")]
    NoServers(String),

    #[error("YAML serialize error: {0}")]
    YamlSerializeError(#[from] serde_yaml::Error),

    #[error("path error: {0}")]
    PathError(String),
}

fn position(line: &Option<usize>, column: &Option<usize>) -> String {
    match (line, column) {
        (Some(line), Some(column)) => format!(" (line {line}, column {column})"),
        (Some(line), None) => format!(" (line {line})"),
        _ => String::new(),
    }
}

/// Structured error payload returned by the cluster (`{"error": {"type": ..., "reason": ...}}`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    #[serde(rename = "type", default)]
    pub error_type: String,

    #[serde(default)]
    pub reason: Option<String>,
}

impl ApiError {
    /// Extract the structured error from a raw response body, if it has one.
    pub fn from_body(body: &str) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        match value.get("error")? {
            serde_json::Value::String(reason) => Some(Self {
                error_type: String::new(),
                reason: Some(reason.clone()),
            }),
            error @ serde_json::Value::Object(_) => serde_json::from_value(error.clone()).ok(),
            _ => None,
        }
    }
}

/// Outcome classification of a single failed attempt against one node.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("cannot connect to {url}: {message}")]
    Connection { url: String, message: String },

    #[error("TLS error with {url}: {message}")]
    Tls { url: String, message: String },

    #[error("request to {url} timed out: {message}")]
    Timeout { url: String, message: String },

    #[error("transport error with {url}: {message}")]
    Transport { url: String, message: String },

    #[error("{}", describe_application(.status, .reason, .body))]
    Application {
        status: u16,
        body: String,
        reason: Option<ApiError>,
    },
}

fn describe_application(status: &u16, reason: &Option<ApiError>, body: &str) -> String {
    match reason {
        Some(ApiError {
            error_type,
            reason: Some(text),
        }) if !error_type.is_empty() => format!("HTTP {status} ({error_type}): {text}"),
        Some(ApiError {
            reason: Some(text), ..
        }) => format!("HTTP {status}: {text}"),
        _ => {
            let preview: String = body.chars().take(BODY_PREVIEW_CHARS).collect();
            if preview.is_empty() {
                format!("HTTP {status}")
            } else {
                format!("HTTP {status}: {preview}")
            }
        }
    }
}

impl TransportError {
    /// Build an application error from a status and raw body.
    pub fn application(status: u16, body: String) -> Self {
        let reason = ApiError::from_body(&body);
        TransportError::Application {
            status,
            body,
            reason,
        }
    }

    /// HTTP status for application errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Application { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            TransportError::Application { reason, .. } => reason.as_ref(),
            _ => None,
        }
    }
}

/// Final failure of a logical request, after the transport gave up.
#[derive(Debug, Error)]
#[error("{source} (after {attempts} attempt(s))")]
pub struct RequestError {
    pub attempts: u32,
    #[source]
    pub source: TransportError,
}

impl RequestError {
    pub fn status(&self) -> Option<u16> {
        self.source.status()
    }

    pub fn api_error(&self) -> Option<&ApiError> {
        self.source.api_error()
    }

    /// True when the cluster could not be reached at the network level.
    pub fn is_unreachable(&self) -> bool {
        matches!(self.source, TransportError::Connection { .. })
    }
}

/// Errors surfaced by the cluster API client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("invalid response from {path}: {source}")]
    InvalidResponse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot encode request body for {path}: {source}")]
    InvalidRequest {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ClientError {
    pub fn request(&self) -> Option<&RequestError> {
        match self {
            ClientError::Request(err) => Some(err),
            ClientError::InvalidResponse { .. } | ClientError::InvalidRequest { .. } => None,
        }
    }
}

/// Map an error bubbling out of a command to the process exit status.
pub fn exit_status(error: &anyhow::Error) -> u8 {
    for cause in error.chain() {
        if cause.downcast_ref::<ConfigError>().is_some() {
            return EXIT_CONFIG;
        }
        let request = cause
            .downcast_ref::<RequestError>()
            .or_else(|| cause.downcast_ref::<ClientError>().and_then(ClientError::request));
        if let Some(request) = request {
            return if request.is_unreachable() {
                EXIT_UNAVAILABLE
            } else {
                EXIT_FAILURE
            };
        }
    }
    EXIT_FAILURE
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_api_error_from_structured_body() {
        let body = r#"{"error":{"root_cause":[],"type":"index_not_found_exception","reason":"no such index [logs]"},"status":404}"#;
        let error = ApiError::from_body(body).unwrap();
        assert_eq!(error.error_type, "index_not_found_exception");
        assert_eq!(error.reason.as_deref(), Some("no such index [logs]"));
    }

    #[test]
    fn test_api_error_from_legacy_string_body() {
        let error = ApiError::from_body(r#"{"error":"IndexMissingException[[logs] missing]"}"#).unwrap();
        assert!(error.error_type.is_empty());
        assert_eq!(
            error.reason.as_deref(),
            Some("IndexMissingException[[logs] missing]")
        );
    }

    #[test]
    fn test_api_error_absent() {
        assert!(ApiError::from_body("<html>bad gateway</html>").is_none());
        assert!(ApiError::from_body(r#"{"acknowledged":false}"#).is_none());
    }

    #[test]
    fn test_application_display() {
        let err = TransportError::application(
            404,
            r#"{"error":{"type":"index_not_found_exception","reason":"no such index [logs]"}}"#
                .to_string(),
        );
        assert_eq!(
            err.to_string(),
            "HTTP 404 (index_not_found_exception): no such index [logs]"
        );

        let err = TransportError::application(503, String::new());
        assert_eq!(err.to_string(), "HTTP 503");
    }

    #[test]
    fn test_request_error_display() {
        let err = RequestError {
            attempts: 4,
            source: TransportError::application(502, "bad gateway".to_string()),
        };
        assert_eq!(err.to_string(), "HTTP 502: bad gateway (after 4 attempt(s))");
        assert_eq!(err.status(), Some(502));
        assert!(!err.is_unreachable());
    }

    #[test]
    fn test_schema_violation_display() {
        let violation = SchemaViolation {
            field: "clusters".to_string(),
            expected: "dict",
            actual: "oops".to_string(),
        };
        assert_eq!(
            violation.to_string(),
            "Invalid type for configuration field 'clusters'. Should be dict. Got 'oops'"
        );
    }

    #[test]
    fn test_exit_status_mapping() {
        let config: anyhow::Error = ConfigError::from(ResolutionError::UnknownContext(
            "prod".to_string(),
        ))
        .into();
        assert_eq!(exit_status(&config), EXIT_CONFIG);

        let unreachable: anyhow::Error = RequestError {
            attempts: 1,
            source: TransportError::Connection {
                url: "http://localhost:9200".to_string(),
                message: "connection refused".to_string(),
            },
        }
        .into();
        let unreachable = unreachable.context("failed to fetch cluster health");
        assert_eq!(exit_status(&unreachable), EXIT_UNAVAILABLE);

        let wrapped: anyhow::Error = ClientError::from(RequestError {
            attempts: 2,
            source: TransportError::Connection {
                url: "http://localhost:9200".to_string(),
                message: "connection refused".to_string(),
            },
        })
        .into();
        assert_eq!(exit_status(&wrapped), EXIT_UNAVAILABLE);

        let other = anyhow::anyhow!("something else");
        assert_eq!(exit_status(&other), EXIT_FAILURE);
    }
}
