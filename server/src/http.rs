//! HTTP-Oberflaeche – Health-Check, WebSocket-Endpunkt, 404-Fallback
//!
//! Endpoints:
//! - `GET /health`  Status, Version, Uptime, Anzahl Benutzer und Verbindungen
//! - `GET /socket`  WebSocket-Upgrade (siehe `ringline_signaling::ws`)
//! - alles andere  JSON-404

use axum::{
    extract::State,
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use ringline_signaling::{ws_router, ConnectionLifecycle, SignalingState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Antwort des Health-Check-Endpunkts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub started_at: DateTime<Utc>,
    pub online_users: usize,
    pub connections: usize,
}

/// Geteilter Zustand der HTTP-Handler
#[derive(Clone)]
struct HttpState {
    signaling: Arc<SignalingState>,
    gestartet: DateTime<Utc>,
}

/// Baut den vollstaendigen HTTP-Router
pub fn router(signaling: Arc<SignalingState>, shutdown_rx: watch::Receiver<bool>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST]);

    let state = HttpState {
        signaling: Arc::clone(&signaling),
        gestartet: Utc::now(),
    };

    Router::new()
        .route("/health", get(health_handler))
        .fallback(nicht_gefunden)
        .with_state(state)
        .merge(ws_router(ConnectionLifecycle::neu(signaling), shutdown_rx))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// `GET /health` – gibt den Serverstatus zurueck
async fn health_handler(State(state): State<HttpState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        uptime_seconds: state.signaling.uptime_sek(),
        started_at: state.gestartet,
        online_users: state.signaling.koordinator.online_anzahl(),
        connections: state.signaling.broadcaster.verbindungs_anzahl(),
    })
}

/// Fallback fuer unbekannte Routen
async fn nicht_gefunden(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "success": false,
            "status": 404,
            "message": format!("Can't find {} on the server.", uri.path()),
        })),
    )
}
