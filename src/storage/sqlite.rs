use rusqlite::{Connection, ErrorCode, OptionalExtension, Result as SqliteResult};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::api::middleware::AppError;
use crate::models::ConnectionDetails;
use crate::services::session_cache::ConnectionDirectory;

const SELECT_COLUMNS: &str = "SELECT id, name, hostname, port, database_name, username, password FROM connections";

/// SQLite storage for named connection details
/// Uses tokio::Mutex for async-friendly locking
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Create a new SQLite storage instance
    pub async fn new<P: AsRef<Path>>(db_path: P) -> SqliteResult<Self> {
        // Handle SQLite URL format (sqlite:./path or sqlite://path)
        let path_str = db_path.as_ref().to_string_lossy();
        let clean_path: &str = if path_str.starts_with("sqlite:") {
            path_str.trim_start_matches("sqlite:").trim_start_matches("//")
        } else {
            path_str.as_ref()
        };

        let conn = Connection::open(clean_path)?;
        let storage = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Initialize database schema
    async fn init_schema(&self) -> SqliteResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS connections (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT UNIQUE NOT NULL,
                hostname TEXT NOT NULL,
                port INTEGER NOT NULL,
                database_name TEXT NOT NULL,
                username TEXT NOT NULL,
                password TEXT NOT NULL
            )
            "#,
            [],
        )?;
        Ok(())
    }

    /// Store new connection details; the name must not be taken yet
    pub async fn create(&self, details: &ConnectionDetails) -> Result<ConnectionDetails, AppError> {
        let db_conn = self.conn.lock().await;
        db_conn
            .execute(
                r#"
                INSERT INTO connections (name, hostname, port, database_name, username, password)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                rusqlite::params![
                    details.name,
                    details.hostname,
                    details.port,
                    details.database_name,
                    details.username,
                    details.password,
                ],
            )
            .map_err(|e| Self::map_write_error(e, &details.name))?;

        let mut created = details.clone();
        created.id = db_conn.last_insert_rowid();
        tracing::info!("Stored connection {} ({})", created.name, created.masked_url());
        Ok(created)
    }

    /// Get connection details by name
    pub async fn find_by_name(&self, name: &str) -> Result<Option<ConnectionDetails>, AppError> {
        let db_conn = self.conn.lock().await;
        let mut stmt = db_conn.prepare(&format!("{} WHERE name = ?1", SELECT_COLUMNS))?;
        let details = stmt
            .query_row(rusqlite::params![name], Self::map_row)
            .optional()?;
        Ok(details)
    }

    /// Replace everything but the id of the entry stored under `name`.
    ///
    /// Returns `false` when no such entry exists. The new name may differ from `name`.
    pub async fn update_by_name(&self, name: &str, details: &ConnectionDetails) -> Result<bool, AppError> {
        let db_conn = self.conn.lock().await;
        let rows_affected = db_conn
            .execute(
                r#"
                UPDATE connections
                SET name = ?1, hostname = ?2, port = ?3, database_name = ?4, username = ?5, password = ?6
                WHERE name = ?7
                "#,
                rusqlite::params![
                    details.name,
                    details.hostname,
                    details.port,
                    details.database_name,
                    details.username,
                    details.password,
                    name,
                ],
            )
            .map_err(|e| Self::map_write_error(e, &details.name))?;
        Ok(rows_affected > 0)
    }

    /// List all connection details ordered by name
    pub async fn list(&self) -> Result<Vec<ConnectionDetails>, AppError> {
        let db_conn = self.conn.lock().await;
        let mut stmt = db_conn.prepare(&format!("{} ORDER BY name", SELECT_COLUMNS))?;
        let rows = stmt.query_map([], Self::map_row)?;

        let mut connections = Vec::new();
        for row in rows {
            connections.push(row?);
        }
        Ok(connections)
    }

    /// Delete connection details; returns whether an entry was removed
    pub async fn delete_by_name(&self, name: &str) -> Result<bool, AppError> {
        let db_conn = self.conn.lock().await;
        let rows_affected = db_conn.execute("DELETE FROM connections WHERE name = ?1", rusqlite::params![name])?;
        Ok(rows_affected > 0)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> SqliteResult<ConnectionDetails> {
        Ok(ConnectionDetails {
            id: row.get(0)?,
            name: row.get(1)?,
            hostname: row.get(2)?,
            port: row.get(3)?,
            database_name: row.get(4)?,
            username: row.get(5)?,
            password: row.get(6)?,
        })
    }

    fn map_write_error(err: rusqlite::Error, name: &str) -> AppError {
        match &err {
            rusqlite::Error::SqliteFailure(failure, _) if failure.code == ErrorCode::ConstraintViolation => {
                AppError::ConnectionAlreadyExists(name.to_string())
            }
            _ => err.into(),
        }
    }
}

#[async_trait::async_trait]
impl ConnectionDirectory for SqliteStorage {
    async fn lookup(&self, name: &str) -> Result<Option<ConnectionDetails>, AppError> {
        self.find_by_name(name).await
    }
}
