//! Fixed-size pool of connections with a round-robin cursor.

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

use super::connection::{Connection, ConnectionOptions, HttpConnection};
use crate::error::ConfigError;
use crate::models::Context;

#[derive(Debug)]
pub struct ConnectionPool {
    connections: Vec<Box<dyn Connection>>,
    cursor: AtomicUsize,
}

impl ConnectionPool {
    /// Build a pool over the given connections. An empty pool is rejected.
    pub fn new(connections: Vec<Box<dyn Connection>>) -> Result<Self, ConfigError> {
        if connections.is_empty() {
            return Err(ConfigError::NoServers("<pool>".to_string()));
        }
        debug!("Connection pool created with {} member(s)", connections.len());
        Ok(Self {
            connections,
            cursor: AtomicUsize::new(0),
        })
    }

    /// One HTTP connection per server of the context's cluster, created eagerly.
    pub fn from_context(context: &Context, options: &ConnectionOptions) -> Result<Self, ConfigError> {
        if context.cluster.servers.is_empty() {
            return Err(ConfigError::NoServers(context.cluster.name.clone()));
        }
        let connections = http_connections(&context.cluster.servers, options)?;
        Self::new(connections)
    }

    /// Next connection in round-robin order.
    pub fn select(&self) -> &dyn Connection {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.connections.len();
        self.connections[index].as_ref()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn connections(&self) -> impl Iterator<Item = &dyn Connection> {
        self.connections.iter().map(|c| c.as_ref())
    }
}

impl Drop for ConnectionPool {
    fn drop(&mut self) {
        debug!("Releasing {} connection(s)", self.connections.len());
    }
}

pub(crate) fn http_connections(
    servers: &[String],
    options: &ConnectionOptions,
) -> Result<Vec<Box<dyn Connection>>, ConfigError> {
    servers
        .iter()
        .map(|server| {
            HttpConnection::new(server, options.clone()).map(|c| Box::new(c) as Box<dyn Connection>)
        })
        .collect()
}
