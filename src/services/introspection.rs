use std::sync::Arc;

use crate::api::middleware::AppError;
use crate::models::{CatalogEntry, ColumnEntry, ColumnStatistics, PageRequest, Row, SchemaEntry, TableEntry};
use crate::services::query_executor::QueryExecutor;
use crate::services::session::Session;
use crate::services::session_cache::SessionCache;
use crate::services::statistics;
use crate::validation::{ExistenceValidator, SqlValidator, ValidatedTable};

/// Introspection of the databases behind named connections.
///
/// Sessions come from the shared [`SessionCache`]; schema and table names are checked
/// against the catalog before any statement that embeds them is built.
pub struct IntrospectionService {
    cache: SessionCache,
}

impl IntrospectionService {
    pub fn new(cache: SessionCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    /// Drop any live session for `connection_name`, e.g. after its details changed
    pub async fn invalidate_connection(&self, connection_name: &str) {
        self.cache.invalidate(connection_name).await;
    }

    /// Verify the connection works by listing its schemas
    pub async fn test_connection(&self, connection_name: &str) -> Result<(), AppError> {
        self.list_schemas(connection_name).await.map(|_| ())
    }

    /// All schemas, ordered by name
    pub async fn list_schemas(&self, connection_name: &str) -> Result<Vec<SchemaEntry>, AppError> {
        let session = self.session(connection_name).await?;
        let sql = format!(
            "select {} from INFORMATION_SCHEMA.SCHEMATA order by SCHEMA_NAME",
            SchemaEntry::select_list()
        );
        QueryExecutor::query_entries(&session, &sql, &[]).await
    }

    /// Base tables of `schema_name`; views are excluded
    pub async fn list_tables(
        &self,
        connection_name: &str,
        schema_name: &str,
    ) -> Result<Vec<TableEntry>, AppError> {
        let session = self.session(connection_name).await?;
        let schema = ExistenceValidator::check_schema(&session, schema_name).await?;

        let sql = format!(
            "select {} from INFORMATION_SCHEMA.TABLES where TABLE_SCHEMA = ? and TABLE_TYPE = 'BASE TABLE'",
            TableEntry::select_list()
        );
        QueryExecutor::query_entries(&session, &sql, &[schema.name()]).await
    }

    /// Columns of a base table in catalog order
    pub async fn list_columns(
        &self,
        connection_name: &str,
        schema_name: &str,
        table_name: &str,
    ) -> Result<Vec<ColumnEntry>, AppError> {
        let session = self.session(connection_name).await?;
        let (_, columns) = Self::table_columns(&session, schema_name, table_name).await?;
        Ok(columns)
    }

    /// Min/max/avg/median of every numeric non-key column.
    ///
    /// No statement is issued when the table has no such column.
    pub async fn list_column_statistics(
        &self,
        connection_name: &str,
        schema_name: &str,
        table_name: &str,
    ) -> Result<ColumnStatistics, AppError> {
        let session = self.session(connection_name).await?;
        let (table, columns) = Self::table_columns(&session, schema_name, table_name).await?;

        let sql = match statistics::build_statistics_query(&table, &columns) {
            Some(sql) => sql,
            None => {
                tracing::debug!(
                    "No numeric columns in {}.{}, skipping statistics",
                    schema_name,
                    table_name
                );
                return Ok(ColumnStatistics::new());
            }
        };
        SqlValidator::validate_select_only(&sql)?;

        let row = QueryExecutor::query_single(&session, &sql, &[]).await?;
        statistics::parse_statistics(row).map_err(|e| AppError::SqlExecution(e.to_string()))
    }

    /// One page of raw rows; order is whatever the engine returns
    pub async fn preview_data(
        &self,
        connection_name: &str,
        schema_name: &str,
        table_name: &str,
        page: PageRequest,
    ) -> Result<Vec<Row>, AppError> {
        let session = self.session(connection_name).await?;
        let table = ExistenceValidator::check_table(&session, schema_name, table_name).await?;

        let sql = format!(
            "select * from {} limit {} offset {}",
            table.qualified_name(),
            page.size(),
            page.offset()
        );
        SqlValidator::validate_select_only(&sql)?;

        QueryExecutor::query(&session, &sql, &[]).await
    }

    async fn session(&self, connection_name: &str) -> Result<Arc<Session>, AppError> {
        self.cache.get(connection_name).await
    }

    async fn table_columns(
        session: &Session,
        schema_name: &str,
        table_name: &str,
    ) -> Result<(ValidatedTable, Vec<ColumnEntry>), AppError> {
        let table = ExistenceValidator::check_table(session, schema_name, table_name).await?;

        let sql = format!(
            "select {} from INFORMATION_SCHEMA.COLUMNS where TABLE_SCHEMA = ? and TABLE_NAME = ?",
            ColumnEntry::select_list()
        );
        let columns = QueryExecutor::query_entries(session, &sql, &[table.schema(), table.table()]).await?;
        Ok((table, columns))
    }
}
