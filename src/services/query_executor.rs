use crate::api::middleware::AppError;
use crate::models::{CatalogEntry, Row};
use crate::services::session::Session;

/// Runs statements against a session and wraps every failure uniformly.
///
/// Exactly one attempt per call, no retries. Driver errors and failures of the result
/// mapping both surface as `AppError::SqlExecution` carrying the original message.
/// A statement that succeeds restarts the session's idle window.
pub struct QueryExecutor;

impl QueryExecutor {
    /// Execute `sql` and hand the rows to `map`.
    pub async fn execute<T, F, E>(
        session: &Session,
        sql: &str,
        params: &[&str],
        map: F,
    ) -> Result<T, AppError>
    where
        F: FnOnce(Vec<Row>) -> Result<T, E>,
        E: Into<anyhow::Error>,
    {
        let outcome = match session.client().query(sql, params).await {
            Ok(rows) => {
                session.touch();
                map(rows).map_err(Into::into)
            }
            Err(e) => Err(e),
        };

        outcome.map_err(|e| {
            tracing::info!(
                "Exception occurred while executing query on {}: {:#}",
                session.connection_name(),
                e
            );
            AppError::SqlExecution(format!("{:#}", e))
        })
    }

    /// Execute `sql` and return the raw rows
    pub async fn query(session: &Session, sql: &str, params: &[&str]) -> Result<Vec<Row>, AppError> {
        Self::execute(session, sql, params, Ok::<_, anyhow::Error>).await
    }

    /// Execute `sql` and project every row onto `E`
    pub async fn query_entries<E: CatalogEntry>(
        session: &Session,
        sql: &str,
        params: &[&str],
    ) -> Result<Vec<E>, AppError> {
        Self::execute(session, sql, params, |rows| {
            rows.iter().map(E::from_row).collect::<Result<Vec<_>, _>>()
        })
        .await
    }

    /// Execute `sql`, which must yield exactly one row
    pub async fn query_single(session: &Session, sql: &str, params: &[&str]) -> Result<Row, AppError> {
        Self::execute(session, sql, params, single_row).await
    }
}

fn single_row(rows: Vec<Row>) -> anyhow::Result<Row> {
    let count = rows.len();
    let mut rows = rows.into_iter();
    match (rows.next(), count) {
        (Some(row), 1) => Ok(row),
        _ => Err(anyhow::anyhow!(
            "Incorrect result size: expected 1, actual {}",
            count
        )),
    }
}
