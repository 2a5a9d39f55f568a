// Pre-flight catalog checks: an identifier must exist before any statement interpolates it
use crate::api::middleware::AppError;
use crate::models::catalog::RowReader;
use crate::services::query_executor::QueryExecutor;
use crate::services::session::Session;
use crate::validation::identifier::{ValidatedSchema, ValidatedTable};

const SCHEMA_COUNT_SQL: &str =
    "select count(*) as row_count from INFORMATION_SCHEMA.SCHEMATA where SCHEMA_NAME = ?";

const TABLE_COUNT_SQL: &str = "select count(*) as row_count from INFORMATION_SCHEMA.TABLES \
     where TABLE_NAME = ? and TABLE_SCHEMA = ? and TABLE_TYPE = 'BASE TABLE'";

/// Catalog existence checks
pub struct ExistenceValidator;

impl ExistenceValidator {
    /// Confirm `schema` exists behind the session.
    pub async fn check_schema(session: &Session, schema: &str) -> Result<ValidatedSchema, AppError> {
        match Self::count(session, SCHEMA_COUNT_SQL, &[schema]).await? {
            0 => Err(AppError::SchemaNotFound {
                schema: schema.to_string(),
                connection: session.connection_name().to_string(),
            }),
            1 => Ok(ValidatedSchema::new(schema)),
            n => Err(AppError::InvariantViolation(format!(
                "{} schemas named {} in the catalog of {}",
                n,
                schema,
                session.connection_name()
            ))),
        }
    }

    /// Confirm `table` exists as a base table (views excluded) in `schema`.
    pub async fn check_table(session: &Session, schema: &str, table: &str) -> Result<ValidatedTable, AppError> {
        match Self::count(session, TABLE_COUNT_SQL, &[table, schema]).await? {
            0 => Err(AppError::TableNotFound {
                table: table.to_string(),
                schema: schema.to_string(),
            }),
            1 => Ok(ValidatedTable::new(schema, table)),
            n => Err(AppError::InvariantViolation(format!(
                "{} tables named {} in schema {} of {}",
                n,
                table,
                schema,
                session.connection_name()
            ))),
        }
    }

    async fn count(session: &Session, sql: &str, params: &[&str]) -> Result<u64, AppError> {
        let row = QueryExecutor::query_single(session, sql, params).await?;
        RowReader(&row)
            .u64("row_count")
            .map_err(|e| AppError::SqlExecution(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConnectionDetails, Row};
    use crate::services::database::SessionConnector;
    use crate::services::testing::{row, FakeConnector};
    use serde_json::json;
    use std::sync::Arc;

    async fn session_counting(count: u64) -> Session {
        let handler = move |_: &str, _: &[&str]| -> anyhow::Result<Vec<Row>> {
            Ok(vec![row(json!({ "row_count": count }))])
        };
        let connector = FakeConnector::with_handler(Arc::new(handler));
        let details = ConnectionDetails::new("mydb", "localhost", 3306, "app", "root", "");
        Session::new("mydb", 1, connector.connect(&details).await.unwrap())
    }

    #[tokio::test]
    async fn test_schema_exists() {
        let session = session_counting(1).await;
        let schema = ExistenceValidator::check_schema(&session, "mydb_app").await.unwrap();
        assert_eq!(schema.name(), "mydb_app");
    }

    #[tokio::test]
    async fn test_schema_missing() {
        let session = session_counting(0).await;
        let result = ExistenceValidator::check_schema(&session, "nope").await;
        assert_eq!(
            result.unwrap_err(),
            AppError::SchemaNotFound {
                schema: "nope".to_string(),
                connection: "mydb".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_duplicate_catalog_rows_are_invariant_violations() {
        let session = session_counting(2).await;
        assert!(matches!(
            ExistenceValidator::check_schema(&session, "dup").await,
            Err(AppError::InvariantViolation(_))
        ));
        assert!(matches!(
            ExistenceValidator::check_table(&session, "dup", "t").await,
            Err(AppError::InvariantViolation(_))
        ));
    }

    #[tokio::test]
    async fn test_table_missing() {
        let session = session_counting(0).await;
        let result = ExistenceValidator::check_table(&session, "mydb_app", "ghost").await;
        assert_eq!(
            result.unwrap_err(),
            AppError::TableNotFound {
                table: "ghost".to_string(),
                schema: "mydb_app".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_table_check_binds_names() {
        let handler = |sql: &str, params: &[&str]| -> anyhow::Result<Vec<Row>> {
            assert!(sql.contains("TABLE_TYPE = 'BASE TABLE'"));
            assert_eq!(params.to_vec(), vec!["orders", "mydb_app"]);
            Ok(vec![row(json!({ "row_count": "1" }))])
        };
        let connector = FakeConnector::with_handler(Arc::new(handler));
        let details = ConnectionDetails::new("mydb", "localhost", 3306, "app", "root", "");
        let session = Session::new("mydb", 1, connector.connect(&details).await.unwrap());

        let table = ExistenceValidator::check_table(&session, "mydb_app", "orders").await.unwrap();
        assert_eq!(table.qualified_name(), "`mydb_app`.`orders`");
    }
}
