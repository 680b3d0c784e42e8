//! Typed access to the cluster's administrative endpoints.

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::error::ClientError;
use crate::transport::{Request, Transport};

/// Where a dynamic cluster setting is stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Persistency {
    #[default]
    Transient,
    Persistent,
}

impl Persistency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Persistency::Transient => "transient",
            Persistency::Persistent => "persistent",
        }
    }
}

impl fmt::Display for Persistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cluster API client. Created once per invocation and handed to commands.
#[derive(Debug)]
pub struct EsClient {
    transport: Transport,
}

impl EsClient {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    /// Send a request and return the raw response body.
    pub async fn send(&self, request: Request) -> Result<String, ClientError> {
        Ok(self.transport.perform_request(request).await?.body)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: Request) -> Result<T, ClientError> {
        let path = request.path.clone();
        let response = self.transport.perform_request(request).await?;
        response
            .json()
            .map_err(|source| ClientError::InvalidResponse { path, source })
    }

    async fn cat(&self, endpoint: &str) -> Result<Vec<Map<String, Value>>, ClientError> {
        self.send_json(Request::get(format!("/_cat/{endpoint}")).with_param("format", "json"))
            .await
    }

    pub async fn cluster_health(&self) -> Result<Map<String, Value>, ClientError> {
        self.send_json(Request::get("/_cluster/health")).await
    }

    pub async fn cluster_stats(&self) -> Result<Map<String, Value>, ClientError> {
        self.send_json(Request::get("/_cluster/stats")).await
    }

    pub async fn allocation_explain(&self) -> Result<Map<String, Value>, ClientError> {
        self.send_json(Request::get("/_cluster/allocation/explain"))
            .await
    }

    /// Dynamic cluster settings, flattened to dotted keys.
    pub async fn cluster_settings(&self) -> Result<Map<String, Value>, ClientError> {
        self.send_json(Request::get("/_cluster/settings").with_param("flat_settings", "true"))
            .await
    }

    pub async fn put_cluster_settings(&self, body: &Value) -> Result<Value, ClientError> {
        let request = Request::put("/_cluster/settings")
            .with_json(body)
            .map_err(|source| ClientError::InvalidRequest {
                path: "/_cluster/settings".to_string(),
                source,
            })?;
        self.send_json(request).await
    }

    pub async fn cat_indices(&self) -> Result<Vec<Map<String, Value>>, ClientError> {
        self.cat("indices").await
    }

    pub async fn cat_nodes(&self) -> Result<Vec<Map<String, Value>>, ClientError> {
        self.cat("nodes").await
    }

    pub async fn cat_allocation(&self) -> Result<Vec<Map<String, Value>>, ClientError> {
        self.cat("allocation").await
    }

    pub async fn create_index(
        &self,
        index: &str,
        shards: Option<u32>,
        replicas: Option<u32>,
    ) -> Result<Value, ClientError> {
        let mut request = Request::put(format!("/{index}"));
        let mut settings = Map::new();
        if let Some(shards) = shards {
            settings.insert("number_of_shards".to_string(), json!(shards));
        }
        if let Some(replicas) = replicas {
            settings.insert("number_of_replicas".to_string(), json!(replicas));
        }
        if !settings.is_empty() {
            request = request
                .with_json(&json!({ "settings": settings }))
                .map_err(|source| ClientError::InvalidRequest {
                    path: format!("/{index}"),
                    source,
                })?;
        }
        self.send_json(request).await
    }

    pub async fn open_index(&self, index: &str) -> Result<Value, ClientError> {
        self.send_json(Request::post(format!("/{index}/_open"))).await
    }

    pub async fn close_index(&self, index: &str) -> Result<Value, ClientError> {
        self.send_json(Request::post(format!("/{index}/_close"))).await
    }

    pub async fn delete_index(&self, index: &str) -> Result<Value, ClientError> {
        self.send_json(Request::delete(format!("/{index}"))).await
    }

    /// Hot threads report, returned as plain text.
    pub async fn hot_threads(&self, thread_type: &str) -> Result<String, ClientError> {
        self.send(Request::get("/_nodes/hot_threads").with_param("type", thread_type))
            .await
    }
}

/// Reads and writes single dynamic cluster settings.
pub struct ClusterSettings<'a> {
    client: &'a EsClient,
}

impl<'a> ClusterSettings<'a> {
    pub fn new(client: &'a EsClient) -> Self {
        Self { client }
    }

    /// Current value of `key` in the given persistency, if set.
    pub async fn get(&self, key: &str, persistency: Persistency) -> Result<Option<String>, ClientError> {
        let settings = self.client.cluster_settings().await?;
        let value = settings
            .get(persistency.as_str())
            .and_then(|section| section.get(key))
            .map(|value| match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            });
        debug!("{} setting {} = {:?}", persistency, key, value);
        Ok(value)
    }

    /// Set `key` to `value`; `None` resets it to its default.
    pub async fn set(
        &self,
        key: &str,
        value: Option<&str>,
        persistency: Persistency,
    ) -> Result<Value, ClientError> {
        let body = json!({ persistency.as_str(): { key: value } });
        debug!("Updating cluster settings: {}", body);
        self.client.put_cluster_settings(&body).await
    }
}

/// True when the failure is the cluster rejecting an explain request because
/// no shard is unassigned.
pub fn is_nothing_to_explain(error: &ClientError) -> bool {
    error.request().is_some_and(|request| {
        request.status() == Some(400)
            && request
                .api_error()
                .is_some_and(|api| api.error_type == "illegal_argument_exception")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{
        Connection, ConnectionOptions, ConnectionPool, HttpConnection, TransportConfig,
    };
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> EsClient {
        let connection =
            HttpConnection::new(&server.uri(), ConnectionOptions::default()).unwrap();
        let pool = ConnectionPool::new(vec![Box::new(connection) as Box<dyn Connection>]).unwrap();
        EsClient::new(Transport::new(pool, TransportConfig::default()))
    }

    #[test]
    fn test_persistency_display() {
        assert_eq!(Persistency::default().to_string(), "transient");
        assert_eq!(Persistency::Persistent.as_str(), "persistent");
    }

    #[tokio::test]
    async fn test_cat_indices_requests_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/_cat/indices"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"index": "logs", "health": "green", "status": "open"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let indices = client(&server).cat_indices().await.unwrap();
        assert_eq!(indices.len(), 1);
        assert_eq!(indices[0]["index"], "logs");
    }

    #[tokio::test]
    async fn test_create_index_with_settings() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/logs"))
            .and(body_json(json!({
                "settings": {"number_of_shards": 3, "number_of_replicas": 1}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"acknowledged": true})))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server)
            .create_index("logs", Some(3), Some(1))
            .await
            .unwrap();
        assert_eq!(response["acknowledged"], true);
    }

    #[tokio::test]
    async fn test_invalid_json_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/_cluster/health"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client(&server).cluster_health().await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_cluster_settings_get() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/_cluster/settings"))
            .and(query_param("flat_settings", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "persistent": {"logger.org.elasticsearch.discovery": "DEBUG"},
                "transient": {}
            })))
            .mount(&server)
            .await;

        let client = client(&server);
        let settings = ClusterSettings::new(&client);
        let level = settings
            .get("logger.org.elasticsearch.discovery", Persistency::Persistent)
            .await
            .unwrap();
        assert_eq!(level.as_deref(), Some("DEBUG"));

        let level = settings
            .get("logger.org.elasticsearch.discovery", Persistency::Transient)
            .await
            .unwrap();
        assert!(level.is_none());
    }

    #[tokio::test]
    async fn test_cluster_settings_reset_sends_null() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/_cluster/settings"))
            .and(body_json(json!({"transient": {"logger.discovery": null}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"acknowledged": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        ClusterSettings::new(&client)
            .set("logger.discovery", None, Persistency::Transient)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_nothing_to_explain_detection() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/_cluster/allocation/explain"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "type": "illegal_argument_exception",
                    "reason": "unable to find any unassigned shards to explain"
                },
                "status": 400
            })))
            .mount(&server)
            .await;

        let err = client(&server).allocation_explain().await.unwrap_err();
        assert!(is_nothing_to_explain(&err));
    }

    #[tokio::test]
    async fn test_hot_threads_plain_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/_nodes/hot_threads"))
            .and(query_param("type", "wait"))
            .respond_with(ResponseTemplate::new(200).set_body_string("::: {node-1}\n   Hot threads"))
            .mount(&server)
            .await;

        let report = client(&server).hot_threads("wait").await.unwrap();
        assert!(report.starts_with("::: {node-1}"));
    }
}
