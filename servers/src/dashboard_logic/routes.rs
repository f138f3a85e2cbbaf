//! # HTTP Surface
//!
//! Thin axum handlers over [`DashboardHub`]. Every route maps to exactly one hub
//! operation; no dashboard logic lives here.

use std::sync::Arc;

use axum::{
    extract::{Query, State, WebSocketUpgrade},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use lib_dashboard::{DashboardHub, HubError};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use crate::dashboard_logic::downstream;

/// Header carrying the fallback warning of a snapshot query.
pub const VIEW_WARNING_HEADER: &str = "x-view-warning";

/// Shared state of the router.
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<DashboardHub>,
}

#[derive(Debug, Deserialize)]
pub struct ViewQuery {
    pub view: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    pub mode: String,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .route("/api/dashboard", get(dashboard_handler))
        .route("/api/mode", get(get_mode_handler).post(set_mode_handler))
        .route("/api/refresh", post(refresh_handler))
        .route("/api/status", get(status_handler))
        .layer(cors)
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "OK"
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let manager = Arc::clone(state.hub.connections());
    ws.on_upgrade(move |socket| downstream::handle_socket(socket, manager))
}

async fn dashboard_handler(State(state): State<AppState>, Query(query): Query<ViewQuery>) -> Response {
    let response = state.hub.get_snapshot(query.view.as_deref()).await;
    let warning = response.warning.clone();

    let mut http = Json(response).into_response();
    if let Some(warning) = warning {
        // Non-visible characters in the echoed view name would make an invalid header.
        if let Ok(value) = HeaderValue::from_str(&warning) {
            http.headers_mut()
                .insert(HeaderName::from_static(VIEW_WARNING_HEADER), value);
        }
    }
    http
}

async fn get_mode_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "mode": state.hub.current_view().await }))
}

async fn set_mode_handler(State(state): State<AppState>, Json(req): Json<ModeRequest>) -> Response {
    match state.hub.set_default_view(&req.mode).await {
        Ok(view) => Json(json!({ "success": true, "mode": view })).into_response(),
        Err(err @ HubError::InvalidView(_)) => {
            (StatusCode::BAD_REQUEST, Json(json!({ "success": false, "error": err.to_string() }))).into_response()
        }
        Err(err) => {
            log::error!("Mode change failed: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "success": false, "error": err.to_string() })))
                .into_response()
        }
    }
}

async fn refresh_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let delivered = state.hub.trigger_refresh().await;
    Json(json!({ "success": true, "delivered": delivered }))
}

async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.hub.status().await)
}
