//! Retrying, failover-aware request pipeline over a pool of connections.

pub mod connection;
pub mod pool;
pub mod request;

pub use connection::{Connection, ConnectionOptions, HttpConnection, normalize_server};
pub use pool::ConnectionPool;
pub use request::{Request, Response};

use tracing::{debug, warn};

use crate::error::{ConfigError, RequestError, TransportError};
use crate::models::Context;
use crate::models::context::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_ON_STATUS, Settings};

/// Retry policy of the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Application statuses that are retried on another node.
    pub retry_on_status: Vec<u16>,
    pub retry_on_timeout: bool,
    /// An unreachable node ends the request immediately.
    pub fail_fast_on_connect: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_on_status: DEFAULT_RETRY_ON_STATUS.to_vec(),
            retry_on_timeout: false,
            fail_fast_on_connect: true,
        }
    }
}

impl TransportConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        Ok(Self {
            max_retries: settings.max_retries()?,
            retry_on_status: settings.retry_on_status()?,
            retry_on_timeout: settings.retry_on_timeout()?,
            fail_fast_on_connect: settings.fail_fast_on_connect()?,
        })
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_retry_on_timeout(mut self, retry: bool) -> Self {
        self.retry_on_timeout = retry;
        self
    }

    #[must_use]
    pub fn with_fail_fast_on_connect(mut self, fail_fast: bool) -> Self {
        self.fail_fast_on_connect = fail_fast;
        self
    }

    /// Whether another node may be tried after this failure.
    pub fn is_retryable(&self, error: &TransportError) -> bool {
        match error {
            TransportError::Application { status, .. } => self.retry_on_status.contains(status),
            TransportError::Timeout { .. } => self.retry_on_timeout,
            TransportError::Connection { .. } => !self.fail_fast_on_connect,
            TransportError::Tls { .. } | TransportError::Transport { .. } => true,
        }
    }
}

/// Owns the pool and applies the retry policy to each logical request.
#[derive(Debug)]
pub struct Transport {
    pool: ConnectionPool,
    config: TransportConfig,
}

impl Transport {
    pub fn new(pool: ConnectionPool, config: TransportConfig) -> Self {
        Self { pool, config }
    }

    /// Build the pool and policy for a resolved context.
    pub fn from_context(context: &Context, compatibility: Option<u8>) -> Result<Self, ConfigError> {
        let options = ConnectionOptions::from_context(context, compatibility)?;
        let config = TransportConfig::from_settings(&context.settings)?;
        let pool = ConnectionPool::from_context(context, &options)?;
        debug!(
            "Transport for context '{}': {} node(s), max_retries={}",
            context.name,
            pool.len(),
            config.max_retries
        );
        Ok(Self::new(pool, config))
    }

    /// Perform `request`, moving to the next node on retryable failures.
    pub async fn perform_request(&self, request: Request) -> Result<Response, RequestError> {
        let mut attempts = 0;

        loop {
            let connection = self.pool.select();
            attempts += 1;

            let error = match connection.perform(&request).await {
                Ok(response) => return Ok(response),
                Err(error) => error,
            };

            let retries_used = attempts - 1;
            if !self.config.is_retryable(&error) || retries_used >= self.config.max_retries {
                return Err(RequestError {
                    attempts,
                    source: error,
                });
            }

            warn!(
                "Attempt {} of {} {} on {} failed, retrying: {}",
                attempts,
                request.method,
                request.path,
                connection.host(),
                error
            );
        }
    }
}
