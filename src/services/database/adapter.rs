// Driver abstraction: what the session cache needs from a database client
use crate::models::{ConnectionDetails, Row};
use std::sync::Arc;

/// A live client bound to one physical database connection.
///
/// Implementations must serialize concurrent calls on the same client;
/// the engine makes no assumption about driver-level thread safety.
#[async_trait::async_trait]
pub trait SqlClient: Send + Sync {
    /// Run one statement with positional string bind parameters and return all rows.
    async fn query(&self, sql: &str, params: &[&str]) -> anyhow::Result<Vec<Row>>;

    /// Close the underlying connection.
    async fn close(&self) -> anyhow::Result<()>;
}

/// Opens clients from stored connection details.
#[async_trait::async_trait]
pub trait SessionConnector: Send + Sync {
    async fn connect(&self, details: &ConnectionDetails) -> anyhow::Result<Arc<dyn SqlClient>>;
}
