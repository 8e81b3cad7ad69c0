use std::sync::Arc;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::sync::watch;
use shared::protocol::API_PREFIX;
use shared::types::EntryView;
use crate::config::BrowseConfig;
use crate::registry::RegistryHandle;

#[derive(Clone)]
pub struct AppState {
    pub registry: RegistryHandle,
    pub hash_rx: watch::Receiver<String>,
    pub config: Arc<BrowseConfig>,
}

#[derive(Serialize)]
pub struct ConfigResponse {
    pub service: String,
    pub continuous: bool,
    pub interfaces: Vec<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(&format!("{API_PREFIX}/config"), get(get_config))
        .route(&format!("{API_PREFIX}/entries"), get(get_entries))
        .route(&format!("{API_PREFIX}/entries/hash"), get(get_hash))
        .route(&format!("{API_PREFIX}/entries/:instance"), get(get_instance))
        .with_state(state)
}

async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        service: state.config.service.clone(),
        continuous: state.config.continuous,
        interfaces: state.config.interfaces.clone(),
    })
}

async fn get_entries(State(state): State<AppState>) -> Result<Json<Vec<EntryView>>, StatusCode> {
    state
        .registry
        .get_all()
        .await
        .map(Json)
        .map_err(|e| {
            tracing::error!("Failed to query entries: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

async fn get_hash(State(state): State<AppState>) -> String {
    state.hash_rx.borrow().clone()
}

async fn get_instance(
    State(state): State<AppState>,
    Path(instance): Path<String>,
) -> Result<Json<Vec<EntryView>>, StatusCode> {
    let entries = state
        .registry
        .get_instance(instance)
        .await
        .map_err(|e| {
            tracing::error!("Failed to query instance: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    if entries.is_empty() {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(entries))
}
