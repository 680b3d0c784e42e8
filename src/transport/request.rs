//! Request and response values exchanged with a single node.

use std::time::Duration;

use reqwest::Method;
use reqwest::header::HeaderMap;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// One logical request to the cluster, replayable across retries.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub params: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    /// Overrides the connection's default timeout for this request only.
    pub timeout: Option<Duration>,
    /// Non-2xx statuses that should be returned as responses instead of errors.
    pub ignore: Vec<u16>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };

        Self {
            method,
            path,
            params: Vec::new(),
            body: None,
            timeout: None,
            ignore: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Serialize `body` as the JSON request body.
    pub fn with_json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, serde_json::Error> {
        self.body = Some(serde_json::to_vec(body)?);
        Ok(self)
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn ignore_status(mut self, status: u16) -> Self {
        self.ignore.push(status);
        self
    }
}

/// Raw response from a node. Decoding is left to the caller.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = Request::get("_cat/indices")
            .with_param("format", "json")
            .with_timeout(Duration::from_secs(2))
            .ignore_status(404);

        assert_eq!(request.method, Method::GET);
        assert_eq!(request.path, "/_cat/indices");
        assert_eq!(
            request.params,
            vec![("format".to_string(), "json".to_string())]
        );
        assert_eq!(request.timeout, Some(Duration::from_secs(2)));
        assert_eq!(request.ignore, vec![404]);
        assert!(request.body.is_none());
    }

    #[test]
    fn test_request_json_body() {
        let request = Request::put("/_cluster/settings")
            .with_json(&serde_json::json!({"transient": {"a": 1}}))
            .unwrap();
        assert_eq!(
            request.body.as_deref(),
            Some(br#"{"transient":{"a":1}}"#.as_slice())
        );
    }

    #[test]
    fn test_response_json() {
        let response = Response {
            status: 200,
            headers: HeaderMap::new(),
            body: r#"{"status":"green"}"#.to_string(),
        };
        assert!(response.is_success());
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["status"], "green");
    }
}
