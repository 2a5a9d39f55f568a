// In-memory stand-ins for the connection directory and the database driver
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::api::middleware::AppError;
use crate::models::{ConnectionDetails, Row};
use crate::services::database::{SessionConnector, SqlClient};
use crate::services::session_cache::ConnectionDirectory;

pub(crate) type QueryHandler = Arc<dyn Fn(&str, &[&str]) -> anyhow::Result<Vec<Row>> + Send + Sync>;

pub(crate) struct FakeDirectory {
    entries: Mutex<HashMap<String, ConnectionDetails>>,
}

impl FakeDirectory {
    pub(crate) fn with_names(names: &[&str]) -> Self {
        let entries = names
            .iter()
            .map(|name| {
                (
                    name.to_string(),
                    ConnectionDetails::new(*name, "localhost", 3306, *name, "root", "secret"),
                )
            })
            .collect();
        Self {
            entries: Mutex::new(entries),
        }
    }
}

#[async_trait::async_trait]
impl ConnectionDirectory for FakeDirectory {
    async fn lookup(&self, name: &str) -> Result<Option<ConnectionDetails>, AppError> {
        Ok(self.entries.lock().unwrap().get(name).cloned())
    }
}

pub(crate) struct FakeClient {
    handler: QueryHandler,
    statements: Mutex<Vec<String>>,
    closes: AtomicUsize,
}

impl FakeClient {
    pub(crate) fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub(crate) fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SqlClient for FakeClient {
    async fn query(&self, sql: &str, params: &[&str]) -> anyhow::Result<Vec<Row>> {
        self.statements.lock().unwrap().push(sql.to_string());
        (self.handler)(sql, params)
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub(crate) struct FakeConnector {
    handler: QueryHandler,
    delay: Duration,
    failure: Option<String>,
    connects: AtomicUsize,
    clients: Mutex<Vec<Arc<FakeClient>>>,
}

impl FakeConnector {
    pub(crate) fn new() -> Self {
        Self::with_handler(Arc::new(|_: &str, _: &[&str]| -> anyhow::Result<Vec<Row>> {
            Ok(Vec::new())
        }))
    }

    pub(crate) fn with_handler(handler: QueryHandler) -> Self {
        Self {
            handler,
            delay: Duration::ZERO,
            failure: None,
            connects: AtomicUsize::new(0),
            clients: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub(crate) fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// The n-th client handed out
    pub(crate) fn client(&self, n: usize) -> Arc<FakeClient> {
        Arc::clone(&self.clients.lock().unwrap()[n])
    }

    /// Statements issued across every client
    pub(crate) fn statements(&self) -> Vec<String> {
        self.clients
            .lock()
            .unwrap()
            .iter()
            .flat_map(|client| client.statements())
            .collect()
    }
}

#[async_trait::async_trait]
impl SessionConnector for FakeConnector {
    async fn connect(&self, _details: &ConnectionDetails) -> anyhow::Result<Arc<dyn SqlClient>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(message) = &self.failure {
            return Err(anyhow::anyhow!(message.clone()));
        }

        let client = Arc::new(FakeClient {
            handler: Arc::clone(&self.handler),
            statements: Mutex::new(Vec::new()),
            closes: AtomicUsize::new(0),
        });
        self.clients.lock().unwrap().push(Arc::clone(&client));
        Ok(client as Arc<dyn SqlClient>)
    }
}

/// Build a row from a JSON object literal
pub(crate) fn row(value: serde_json::Value) -> Row {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("row fixture must be an object, got {}", other),
    }
}
