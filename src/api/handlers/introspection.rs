use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::api::handlers::connection::AppState;
use crate::api::middleware::AppError;
use crate::models::{ColumnEntry, ColumnStatistics, PageParams, PageRequest, Row, SchemaEntry, TableEntry};

/// List schemas of a connection
pub async fn list_schemas(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<SchemaEntry>>, AppError> {
    let schemas = state.introspection.list_schemas(&name).await?;
    Ok(Json(schemas))
}

/// List base tables of a schema
pub async fn list_tables(
    State(state): State<AppState>,
    Path((name, schema)): Path<(String, String)>,
) -> Result<Json<Vec<TableEntry>>, AppError> {
    let tables = state.introspection.list_tables(&name, &schema).await?;
    Ok(Json(tables))
}

/// List columns of a table
pub async fn list_columns(
    State(state): State<AppState>,
    Path((name, schema, table)): Path<(String, String, String)>,
) -> Result<Json<Vec<ColumnEntry>>, AppError> {
    let columns = state.introspection.list_columns(&name, &schema, &table).await?;
    Ok(Json(columns))
}

/// Numeric column statistics of a table
pub async fn column_statistics(
    State(state): State<AppState>,
    Path((name, schema, table)): Path<(String, String, String)>,
) -> Result<Json<ColumnStatistics>, AppError> {
    let stats = state
        .introspection
        .list_column_statistics(&name, &schema, &table)
        .await?;
    Ok(Json(stats))
}

/// One page of table rows
pub async fn preview_data(
    State(state): State<AppState>,
    Path((name, schema, table)): Path<(String, String, String)>,
    Query(params): Query<PageParams>,
) -> Result<Json<Vec<Row>>, AppError> {
    let page = PageRequest::try_from(params)?;
    tracing::debug!(
        "Previewing {}.{} on {} (page {}, size {})",
        schema,
        table,
        name,
        page.page(),
        page.size()
    );

    let rows = state
        .introspection
        .preview_data(&name, &schema, &table, page)
        .await?;
    Ok(Json(rows))
}
