use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use crate::services::database::SqlClient;

/// A live connection to one named database, plus the client that runs queries on it.
///
/// Owned by exactly one session cache entry; callers receive shared handles.
pub struct Session {
    connection_name: String,
    id: u64,
    client: Arc<dyn SqlClient>,
    last_access: Mutex<Instant>,
}

impl Session {
    pub fn new(connection_name: impl Into<String>, id: u64, client: Arc<dyn SqlClient>) -> Self {
        Self {
            connection_name: connection_name.into(),
            id,
            client,
            last_access: Mutex::new(Instant::now()),
        }
    }

    pub fn connection_name(&self) -> &str {
        &self.connection_name
    }

    /// Identifier unique among the sessions opened by one cache.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Mark the session as used now; restarts its idle window
    pub fn touch(&self) {
        *self.last_access.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    /// Time since the last successful use
    pub fn idle_for(&self, now: Instant) -> Duration {
        let last_access = *self.last_access.lock().unwrap_or_else(PoisonError::into_inner);
        now.saturating_duration_since(last_access)
    }

    pub(crate) fn client(&self) -> &dyn SqlClient {
        self.client.as_ref()
    }

    pub async fn close(&self) -> anyhow::Result<()> {
        self.client.close().await
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("connection_name", &self.connection_name)
            .field("id", &self.id)
            .finish()
    }
}
