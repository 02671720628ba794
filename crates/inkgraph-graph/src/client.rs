//! Neo4j connection management and the read/write execution primitives.

use neo4rs::{query, ConfigBuilder, Graph, Query, Row};
use serde::Deserialize;

use inkgraph_core::InkgraphError;

use crate::txn::WriteTxn;

/// Errors from graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Neo4j connection error: {0}")]
    Connection(String),

    #[error("Neo4j query error: {0}")]
    Query(#[from] neo4rs::Error),

    #[error("Transaction failed during {operation}: {source}")]
    Transaction {
        operation: &'static str,
        #[source]
        source: Box<GraphError>,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Credential error: {0}")]
    Credential(String),
}

impl GraphError {
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    pub fn is_transaction_failure(&self) -> bool {
        matches!(self, Self::Transaction { .. })
    }
}

impl From<InkgraphError> for GraphError {
    fn from(err: InkgraphError) -> Self {
        match err {
            InkgraphError::InvalidArgument(msg) => Self::InvalidArgument(msg),
            other => Self::Serialization(other.to_string()),
        }
    }
}

/// Configuration for connecting to Neo4j.
///
/// Loaded from the `[neo4j]` config section; every field has a default.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_uri")]
    pub uri: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Target database; the server default when unset.
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
}

fn default_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_max_connections() -> u32 {
    16
}

fn default_fetch_size() -> usize {
    256
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            user: Some("neo4j".to_string()),
            password: Some("inkgraph-dev".to_string()),
            database: None,
            max_connections: default_max_connections(),
            fetch_size: default_fetch_size(),
        }
    }
}

/// Thread-safe Neo4j client with connection pooling.
///
/// One client is created at startup and shared by every operation.
/// Clone is cheap (inner Arc).
#[derive(Clone)]
pub struct GraphClient {
    graph: Graph,
    uri: String,
}

impl GraphClient {
    /// Connect to Neo4j and verify the server answers.
    ///
    /// `Graph::connect` only builds the pool, so a `RETURN 1` round trip
    /// forces the bolt handshake and surfaces a bad endpoint here.
    pub async fn connect(config: &GraphConfig) -> Result<Self, GraphError> {
        let mut builder = ConfigBuilder::default()
            .uri(config.uri.as_str())
            .user(config.user.as_deref().unwrap_or_default())
            .password(config.password.as_deref().unwrap_or_default())
            .max_connections(config.max_connections as usize)
            .fetch_size(config.fetch_size);
        if let Some(db) = config.database.as_deref() {
            builder = builder.db(db);
        }
        let neo_config = builder
            .build()
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        graph
            .run(query("RETURN 1"))
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        tracing::info!(uri = %config.uri, "Connected to Neo4j");
        Ok(Self {
            graph,
            uri: config.uri.clone(),
        })
    }

    /// Execute a statement that returns nothing (schema changes, cleanup).
    pub async fn run(&self, query: Query) -> Result<(), GraphError> {
        self.graph.run(query).await?;
        Ok(())
    }

    /// Single-shot read returning every row.
    pub async fn read_rows(&self, query: Query) -> Result<Vec<Row>, GraphError> {
        tracing::debug!("Sending graph query");
        let mut stream = self.graph.execute(query).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            rows.push(row);
        }
        tracing::debug!(rows = rows.len(), "Received graph response");
        Ok(rows)
    }

    /// Single-shot read returning the first row, if any.
    pub async fn read_one(&self, query: Query) -> Result<Option<Row>, GraphError> {
        tracing::debug!("Sending graph query");
        let mut stream = self.graph.execute(query).await?;
        Ok(stream.next().await?)
    }

    /// Open a read-write transaction. The caller must `commit` and then
    /// `discard` it; `discard` is safe on every path.
    pub async fn begin_write(&self, operation: &'static str) -> Result<WriteTxn, GraphError> {
        let txn = self.graph.start_txn().await?;
        Ok(WriteTxn::new(operation, txn))
    }

    /// Run one mutation in its own transaction: execute, commit, then
    /// unconditionally discard. Any failure is logged with its cause and
    /// reported as [`GraphError::Transaction`]. There are no retries.
    pub async fn mutate(
        &self,
        operation: &'static str,
        query: Query,
    ) -> Result<Vec<Row>, GraphError> {
        let mut txn = match self.begin_write(operation).await {
            Ok(txn) => txn,
            Err(e) => return Err(transaction_failed(operation, e)),
        };

        let outcome = match txn.execute(query).await {
            Ok(rows) => txn.commit().await.map(|()| rows),
            Err(e) => Err(e),
        };
        txn.discard().await;

        outcome.map_err(|e| transaction_failed(operation, e))
    }

    /// Release this handle on the shared connection pool.
    pub fn close(self) {
        tracing::info!(uri = %self.uri, "Closing Neo4j connection");
    }
}

fn transaction_failed(operation: &'static str, source: GraphError) -> GraphError {
    tracing::warn!(operation, error = %source, "Mutation failed; transaction discarded");
    GraphError::Transaction {
        operation,
        source: Box::new(source),
    }
}
