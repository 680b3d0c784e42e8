//! A single logical endpoint and the HTTP request it performs.

use std::error::Error as StdError;
use std::fmt;
use std::io::Write;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use flate2::Compression;
use flate2::write::GzEncoder;
use reqwest::header::{ACCEPT, CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::{Client, Url};
use tracing::{debug, info, warn};

use super::request::{Request, Response};
use crate::error::{ConfigError, TransportError};
use crate::models::Context;
use crate::models::context::DEFAULT_TIMEOUT;

const JSON_MIME: &str = "application/json";

/// One node of the cluster.
#[async_trait]
pub trait Connection: Send + Sync + fmt::Debug {
    /// Base URL of the node.
    fn host(&self) -> &str;

    /// Perform one request against this node and classify its outcome.
    async fn perform(&self, request: &Request) -> Result<Response, TransportError>;
}

/// Per-connection options derived from a context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionOptions {
    pub timeout: Duration,
    pub verify_certs: bool,
    pub http_compress: bool,
    pub credentials: Option<(String, String)>,
    /// Major version for `compatible-with` media types.
    pub compatibility: Option<u8>,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            verify_certs: true,
            http_compress: false,
            credentials: None,
            compatibility: None,
        }
    }
}

impl ConnectionOptions {
    pub fn from_context(context: &Context, compatibility: Option<u8>) -> Result<Self, ConfigError> {
        let settings = &context.settings;
        Ok(Self {
            timeout: settings.timeout()?,
            verify_certs: !settings.no_check_certificate()?,
            http_compress: settings.http_compress()?,
            credentials: context
                .credentials()
                .map(|(username, password)| (username.to_string(), password.to_string())),
            compatibility,
        })
    }

    fn accept_header(&self) -> String {
        match self.compatibility {
            Some(major) => format!("application/vnd.elasticsearch+json; compatible-with={major}"),
            None => JSON_MIME.to_string(),
        }
    }
}

/// Parse a configured server into a base URL. Servers given without a scheme
/// get `https://`; only `http` and `https` with a non-empty host are accepted.
pub fn normalize_server(server: &str) -> Result<Url, String> {
    let server = server.trim();
    let candidate = if server.contains("://") {
        server.to_string()
    } else {
        let prefix = server.split(':').next().unwrap_or_default();
        if server.contains(':')
            && (prefix.eq_ignore_ascii_case("http") || prefix.eq_ignore_ascii_case("https"))
        {
            return Err(format!("malformed scheme in '{server}'"));
        }
        format!("https://{server}")
    };

    let url = Url::parse(&candidate).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported scheme '{other}'")),
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err("missing host".to_string());
    }
    Ok(url)
}

/// HTTP connection to one node, backed by its own reqwest client.
#[derive(Debug)]
pub struct HttpConnection {
    host: String,
    base: Url,
    client: Client,
    options: ConnectionOptions,
}

impl HttpConnection {
    pub fn new(server: &str, options: ConnectionOptions) -> Result<Self, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidServer {
            server: server.to_string(),
            message,
        };

        let base = normalize_server(server).map_err(invalid)?;
        let host = base.as_str().trim_end_matches('/').to_string();

        let client = Client::builder()
            .timeout(options.timeout)
            .danger_accept_invalid_certs(!options.verify_certs)
            .build()
            .map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            host,
            base,
            client,
            options,
        })
    }

    /// Connection identity: scheme, host and port.
    pub fn identity(&self) -> (&str, &str, Option<u16>) {
        (
            self.base.scheme(),
            self.base.host_str().unwrap_or_default(),
            self.base.port_or_known_default(),
        )
    }

    fn build_url(&self, request: &Request) -> Result<Url, TransportError> {
        let mut url = Url::parse(&format!("{}{}", self.host, request.path)).map_err(|e| {
            TransportError::Transport {
                url: format!("{}{}", self.host, request.path),
                message: e.to_string(),
            }
        })?;
        if !request.params.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.params);
        }
        Ok(url)
    }

    fn encode_body(&self, body: &[u8], url: &Url) -> Result<Vec<u8>, TransportError> {
        if !self.options.http_compress {
            return Ok(body.to_vec());
        }
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(body)
            .and_then(|()| encoder.finish())
            .map_err(|e| TransportError::Transport {
                url: url.to_string(),
                message: format!("failed to compress request body: {e}"),
            })
    }

    fn build(&self, request: &Request, url: &Url) -> Result<reqwest::RequestBuilder, TransportError> {
        let mut builder = self
            .client
            .request(request.method.clone(), url.clone())
            .header(ACCEPT, self.options.accept_header());

        if let Some((username, password)) = &self.options.credentials {
            builder = builder.basic_auth(username, Some(password));
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = &request.body {
            builder = builder
                .header(CONTENT_TYPE, self.options.accept_header())
                .body(self.encode_body(body, url)?);
            if self.options.http_compress {
                builder = builder.header(CONTENT_ENCODING, "gzip");
            }
        }
        Ok(builder)
    }
}

#[async_trait]
impl Connection for HttpConnection {
    fn host(&self) -> &str {
        &self.host
    }

    async fn perform(&self, request: &Request) -> Result<Response, TransportError> {
        let url = self.build_url(request)?;
        let builder = self.build(request, &url)?;
        let method = &request.method;

        debug!("{} {} starting", method, url);
        let start = Instant::now();
        let result = async {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let headers = response.headers().clone();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, headers, body))
        }
        .await;
        let elapsed = start.elapsed().as_secs_f64();

        let (status, headers, body) = match result {
            Ok(parts) => parts,
            Err(err) => {
                warn!("{} {} [status:N/A request:{:.3}s]", method, url, elapsed);
                log_request_body(request);
                let error = classify(&err, url.as_str());
                warn!("{error}");
                return Err(error);
            }
        };

        if !(200..300).contains(&status) && !request.ignore.contains(&status) {
            warn!("{} {} [status:{} request:{:.3}s]", method, url, status, elapsed);
            log_request_body(request);
            debug!("< {body}");
            return Err(TransportError::application(status, body));
        }

        info!("{} {} [status:{} request:{:.3}s]", method, url, status, elapsed);
        log_request_body(request);
        debug!("< {body}");

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

fn log_request_body(request: &Request) {
    if let Some(body) = &request.body {
        debug!("> {}", String::from_utf8_lossy(body));
    }
}

/// Classify a failed exchange: connect, then TLS, then timeout, then anything else.
fn classify(err: &reqwest::Error, url: &str) -> TransportError {
    let causes = source_chain(err);
    let message = if causes.is_empty() {
        err.to_string()
    } else {
        causes.clone()
    };
    let url = url.to_string();
    let tls = looks_like_tls(&causes);

    if err.is_connect() && !tls && !err.is_timeout() {
        TransportError::Connection { url, message }
    } else if tls {
        TransportError::Tls { url, message }
    } else if err.is_timeout() {
        TransportError::Timeout { url, message }
    } else {
        TransportError::Transport { url, message }
    }
}

fn source_chain(err: &(dyn StdError + 'static)) -> String {
    let mut causes = Vec::new();
    let mut current = err.source();
    while let Some(cause) = current {
        let text = cause.to_string();
        if !causes.contains(&text) {
            causes.push(text);
        }
        current = cause.source();
    }
    causes.join(": ")
}

// reqwest has no TLS error kind; handshake failures surface as connect errors
// whose source messages come from the TLS backend.
fn looks_like_tls(causes: &str) -> bool {
    let lower = causes.to_lowercase();
    [
        "certificate",
        "tls",
        "ssl",
        "handshake",
        "wrong version number",
        "corrupt message",
    ]
        .iter()
        .any(|needle| lower.contains(needle))
}
