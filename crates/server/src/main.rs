use std::{net::SocketAddr, sync::Arc};

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use server_api::{parse_save_request, save_experiment_data, ApiContext};
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{SaveDataResponse, SAVE_DATA_ROUTE},
};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::info;

mod app_state;
mod config;

use app_state::AppState;
use config::load_settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    let api = ApiContext {
        data_dir: settings.data_dir.clone(),
    };
    let app = build_router(Arc::new(AppState { api }), settings.body_limit_bytes);

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, data_dir = %settings.data_dir.display(), "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>, body_limit_bytes: usize) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(SAVE_DATA_ROUTE, post(save_data))
        .layer(RequestBodyLimitLayer::new(body_limit_bytes))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn save_data(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<SaveDataResponse>, (StatusCode, Json<ApiError>)> {
    let req = parse_save_request(&body).map_err(|e| (StatusCode::BAD_REQUEST, Json(e)))?;
    let response = save_experiment_data(&state.api, &req, Utc::now())
        .await
        .map_err(|e| (status_for(e.code), Json(e)))?;
    Ok(Json(response))
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
