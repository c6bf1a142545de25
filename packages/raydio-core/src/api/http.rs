//! HTTP route handlers.
//!
//! All handlers are thin - they delegate to the session handle and the
//! now-playing surface.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::response::{api_ok, api_success};
use crate::api::ws::ws_handler;
use crate::api::AppState;
use crate::constants::SERVICE_ID;
use crate::error::{RaydioError, RaydioResult};
use crate::media::RemoteCommand;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Creates the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/state", get(get_state))
        .route("/api/streams", get(list_streams))
        .route("/api/streams/{id}/press", post(press_stream))
        .route("/api/lifecycle/{event}", post(handle_lifecycle))
        .route("/api/now-playing", get(get_now_playing))
        .route("/api/remote/{command}", post(handle_remote_command))
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Liveness probe.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    api_success(json!({
        "status": "ok",
        "service": SERVICE_ID,
        "sessionRunning": state.session.is_running(),
        "networkAvailable": state.monitor.current_availability(),
    }))
}

/// Returns the latest session snapshot.
async fn get_state(State(state): State<AppState>) -> impl IntoResponse {
    api_success(state.session.snapshot())
}

async fn list_streams(State(state): State<AppState>) -> impl IntoResponse {
    api_success(json!({ "streams": state.session.streams() }))
}

/// Toggles playback of a stream from the current flattened list.
async fn press_stream(
    Path(stream_id): Path<String>,
    State(state): State<AppState>,
) -> RaydioResult<Response> {
    let known = state
        .session
        .streams()
        .iter()
        .any(|s| s.stream_id == stream_id);
    if !known {
        return Err(RaydioError::StreamNotFound(stream_id));
    }

    state.session.on_stream_pressed(stream_id)?;
    Ok(api_ok().into_response())
}

async fn handle_lifecycle(
    Path(event): Path<String>,
    State(state): State<AppState>,
) -> RaydioResult<Response> {
    match event.as_str() {
        "appear" => state.session.on_appear()?,
        "background" => state.session.on_went_to_background()?,
        "foreground" => state.session.on_went_to_foreground()?,
        other => {
            return Err(RaydioError::InvalidRequest(format!(
                "Unknown lifecycle event: {}",
                other
            )))
        }
    }
    Ok(api_ok().into_response())
}

async fn get_now_playing(State(state): State<AppState>) -> impl IntoResponse {
    api_success(json!({ "nowPlaying": state.now_playing.now_playing() }))
}

/// Dispatches a remote command as the OS media surface would.
///
/// Responds with `dispatched: false` when the command is disabled or no
/// handler is installed yet.
async fn handle_remote_command(
    Path(command): Path<String>,
    State(state): State<AppState>,
) -> RaydioResult<Response> {
    let parsed = RemoteCommand::parse(&command)
        .ok_or_else(|| RaydioError::InvalidRequest(format!("Unknown command: {}", command)))?;

    let dispatched = state.now_playing.dispatch(parsed);
    Ok(Json(json!({ "command": parsed, "dispatched": dispatched })).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::bootstrap::{bootstrap_services, BootstrappedServices};
    use crate::catalog::{StreamEntry, StreamGroup};
    use crate::media::NoopAudioOutput;
    use crate::sdk::SimulatedSdk;
    use crate::state::Config;

    async fn services() -> BootstrappedServices {
        let sdk = Arc::new(SimulatedSdk::start(
            3,
            vec![StreamGroup::new("News", vec![StreamEntry::new("a", "EN")])],
        ));
        let services =
            bootstrap_services(&Config::default(), sdk, Arc::new(NoopAudioOutput)).unwrap();

        let mut watch = services.session.watch();
        tokio::time::timeout(Duration::from_secs(2), watch.wait_for(|s| !s.streams.is_empty()))
            .await
            .unwrap()
            .unwrap();
        services
    }

    async fn call(
        services: &BootstrappedServices,
        method: &str,
        uri: &str,
    ) -> (StatusCode, serde_json::Value) {
        let app = create_router(AppState::from(services));
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn lists_flattened_streams() {
        let services = services().await;
        let (status, body) = call(&services, "GET", "/api/streams").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["streams"][0]["streamId"], "a");
        assert_eq!(body["streams"][0]["title"], "News");
        assert_eq!(body["streams"][0]["muted"], false);

        services.shutdown().await;
    }

    #[tokio::test]
    async fn pressing_unknown_stream_is_404() {
        let services = services().await;
        let (status, body) = call(&services, "POST", "/api/streams/nope/press").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "stream_not_found");

        services.shutdown().await;
    }

    #[tokio::test]
    async fn pressing_known_stream_activates_it() {
        let services = services().await;
        let (status, _) = call(&services, "POST", "/api/streams/a/press").await;
        assert_eq!(status, StatusCode::OK);

        let mut watch = services.session.watch();
        tokio::time::timeout(
            Duration::from_secs(2),
            watch.wait_for(|s| s.active_stream_id.as_deref() == Some("a")),
        )
        .await
        .unwrap()
        .unwrap();

        let (_, body) = call(&services, "GET", "/api/state").await;
        assert_eq!(body["activeStreamId"], "a");

        services.shutdown().await;
    }

    #[tokio::test]
    async fn unknown_lifecycle_event_is_rejected() {
        let services = services().await;
        let (status, _) = call(&services, "POST", "/api/lifecycle/appear").await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&services, "POST", "/api/lifecycle/sleep").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_request");

        services.shutdown().await;
    }

    #[tokio::test]
    async fn remote_command_without_playback_is_not_dispatched() {
        let services = services().await;
        let (status, body) = call(&services, "POST", "/api/remote/play").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["dispatched"], false);

        let (status, _) = call(&services, "POST", "/api/remote/rewind").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = call(&services, "GET", "/api/now-playing").await;
        assert!(body["nowPlaying"].is_null());

        services.shutdown().await;
    }

    #[tokio::test]
    async fn health_reports_service() {
        let services = services().await;
        let (status, body) = call(&services, "GET", "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "raydio");
        assert_eq!(body["sessionRunning"], true);

        services.shutdown().await;
    }
}
