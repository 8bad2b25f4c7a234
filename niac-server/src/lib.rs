//! The Control-Plane Server (C15): a REST + WebSocket front over the
//! engine, built on `axum` the way the pack's `aero-l2-proxy` crate fronts
//! its own proxy engine (`spec.md` §4.15).
//!
//! [`build_router`] wires every route behind the optional bearer-token
//! middleware and the token-bucket rate limiter; the caller supplies the
//! [`AppState`] and is responsible for serving it (see `niac-cli`'s
//! `daemon` subcommand).

pub mod auth;
pub mod error;
pub mod logging;
pub mod ratelimit;
pub mod routes;
pub mod state;
pub mod supervisor;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use logging::LogBroadcaster;
pub use state::AppState;
pub use supervisor::EngineHandle;

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/status", get(routes::status::get_status))
        .route("/simulation/start", post(routes::simulation::start))
        .route("/simulation/stop", post(routes::simulation::stop))
        .route("/stats", get(routes::stats::get_stats))
        .route("/devices", get(routes::devices::list_devices))
        .route("/neighbors", get(routes::neighbors::list_neighbors))
        .route("/topology", get(routes::neighbors::get_topology))
        .route("/history", get(routes::neighbors::list_history))
        .route("/config", get(routes::config::get_config).put(routes::config::put_config))
        .route("/alerts", get(routes::alerts::get_alerts).put(routes::alerts::put_alerts))
        .route("/replay", get(routes::replay::get_replay).post(routes::replay::start_replay).delete(routes::replay::stop_replay))
        .route("/inject", post(routes::inject::set_inject).delete(routes::inject::clear_inject))
        .route("/events", get(routes::events::events))
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), ratelimit::enforce))
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), auth::require_bearer_token));

    Router::new()
        .nest("/api/v1", api)
        .route("/metrics", get(routes::metrics::metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds and serves the control plane until `Ctrl-C`/`SIGTERM`, then drains
/// in-flight requests before returning. The `daemon` CLI subcommand is the
/// only caller; tests exercise [`build_router`] directly via `tower::ServiceExt`.
pub async fn serve(addr: std::net::SocketAddr, state: AppState) -> std::io::Result<()> {
    let cleanup = state.rate_limiter.spawn_cleanup();
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "control plane listening");

    axum::serve(listener, router.into_make_service_with_connect_info::<std::net::SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cleanup.abort();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received, draining connections");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let store = Arc::new(niac_store::Store::disabled());
        let supervisor = EngineHandle::spawn(store.clone());
        AppState::new(supervisor, store, None, LogBroadcaster::new())
    }

    #[tokio::test]
    async fn status_route_reports_not_running_before_any_start() {
        let router = build_router(test_state());
        let response = router.oneshot(Request::builder().uri("/api/v1/status").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unauthenticated_request_is_rejected_when_a_token_is_configured() {
        let store = Arc::new(niac_store::Store::disabled());
        let supervisor = EngineHandle::spawn(store.clone());
        let state = AppState::new(supervisor, store, Some("s3cr3t".into()), LogBroadcaster::new());
        let router = build_router(state);
        let response = router.oneshot(Request::builder().uri("/api/v1/status").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn metrics_route_is_not_gated_by_the_api_prefix_middleware() {
        let router = build_router(test_state());
        let response = router.oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
