use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::api::handlers::connection::AppState;
use crate::api::handlers::{connection, introspection};
use crate::config::Config;
use crate::services::IntrospectionService;
use crate::storage::SqliteStorage;

/// Create router with application state
pub fn create_router_with_state(
    storage: Arc<SqliteStorage>,
    config: Config,
    introspection: Arc<IntrospectionService>,
) -> Router {
    let state = AppState {
        storage,
        config,
        introspection,
    };

    Router::new()
        .route("/health", get(health_check))
        .route(
            "/connection",
            get(connection::list_connections).post(connection::create_connection),
        )
        .route(
            "/connection/{name}",
            get(connection::get_connection)
                .put(connection::update_connection)
                .delete(connection::delete_connection),
        )
        .route("/connection/{name}/test", post(connection::test_connection))
        .route("/connection/{name}/schemas", get(introspection::list_schemas))
        .route(
            "/connection/{name}/schemas/{schema}/tables",
            get(introspection::list_tables),
        )
        .route(
            "/connection/{name}/schemas/{schema}/tables/{table}/columns",
            get(introspection::list_columns),
        )
        .route(
            "/connection/{name}/schemas/{schema}/tables/{table}/data",
            get(introspection::preview_data),
        )
        .route(
            "/connection/{name}/schemas/{schema}/tables/{table}/stats",
            get(introspection::column_statistics),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
