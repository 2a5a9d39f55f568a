use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    Json,
};
use std::sync::Arc;

use crate::api::middleware::AppError;
use crate::config::Config;
use crate::models::{ConnectionDetails, ConnectionDetailsRequest};
use crate::services::IntrospectionService;
use crate::storage::SqliteStorage;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<SqliteStorage>,
    pub config: Config,
    pub introspection: Arc<IntrospectionService>,
}

fn validate_request(payload: &ConnectionDetailsRequest) -> Result<(), AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("Connection name cannot be empty".to_string()));
    }
    if payload.hostname.trim().is_empty() {
        return Err(AppError::Validation("Hostname cannot be empty".to_string()));
    }
    if payload.port == 0 {
        return Err(AppError::Validation("Port must be between 1 and 65535".to_string()));
    }
    if payload.username.is_empty() {
        return Err(AppError::Validation("Username cannot be empty".to_string()));
    }
    Ok(())
}

/// List all connections
pub async fn list_connections(
    State(state): State<AppState>,
) -> Result<Json<Vec<ConnectionDetails>>, AppError> {
    let connections = state.storage.list().await?;
    Ok(Json(connections))
}

/// Store new connection details
pub async fn create_connection(
    State(state): State<AppState>,
    Json(payload): Json<ConnectionDetailsRequest>,
) -> Result<(StatusCode, HeaderMap, Json<ConnectionDetails>), AppError> {
    validate_request(&payload)?;

    let created = state.storage.create(&payload.into()).await?;

    let location = format!("{}/connection/{}", state.config.server.base_url, created.name);
    let mut headers = HeaderMap::new();
    headers.insert(
        header::LOCATION,
        HeaderValue::from_str(&location)
            .map_err(|e| AppError::Validation(format!("Connection name is not usable in a URL: {}", e)))?,
    );

    Ok((StatusCode::CREATED, headers, Json(created)))
}

/// Get connection details
pub async fn get_connection(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ConnectionDetails>, AppError> {
    let connection = state
        .storage
        .find_by_name(&name)
        .await?
        .ok_or_else(|| AppError::ConnectionNotFound(name.clone()))?;

    Ok(Json(connection))
}

/// Replace connection details and drop any session opened with the old ones
pub async fn update_connection(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(payload): Json<ConnectionDetailsRequest>,
) -> Result<StatusCode, AppError> {
    validate_request(&payload)?;

    let updated = state.storage.update_by_name(&name, &payload.into()).await?;
    if !updated {
        return Err(AppError::ConnectionNotFound(name));
    }

    tracing::info!("Connection updated: {}", name);
    state.introspection.invalidate_connection(&name).await;
    Ok(StatusCode::OK)
}

/// Delete a connection; succeeds also when it does not exist
pub async fn delete_connection(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, AppError> {
    tracing::info!("Deleting connection: {}", name);

    let deleted = state.storage.delete_by_name(&name).await.map_err(|e| {
        tracing::error!("Failed to delete connection {}: {}", name, e);
        e
    })?;
    if !deleted {
        tracing::warn!("Connection not found for deletion: {}", name);
    }

    state.introspection.invalidate_connection(&name).await;
    Ok(StatusCode::OK)
}

/// Check that a session can be opened and the catalog read
pub async fn test_connection(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, AppError> {
    state.introspection.test_connection(&name).await?;
    Ok(StatusCode::OK)
}
