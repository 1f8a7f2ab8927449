use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as CorsAny, CorsLayer};

use ajo_piggybank::{ChainClient, Config, JsonRpcClient, SystemClock};

use super::handlers;
use crate::manager::DashboardManager;

pub async fn start_server(addr: &str) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let client = Arc::new(JsonRpcClient::new(config.rpc_url.clone()));
    let manager = Arc::new(DashboardManager::new(config, client, Arc::new(SystemClock)));

    // Load the contract state once so the countdown starts populated.
    let initial = manager.clone();
    tokio::spawn(async move {
        if let Err(e) = initial.refresh().await {
            log::warn!("Initial contract read failed: {}", e);
        }
    });

    let app = build_router(manager.clone()).layer(cors_layer());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// All dashboard routes over `manager`.
pub fn build_router<C: ChainClient>(manager: Arc<DashboardManager<C>>) -> Router {
    Router::new()
        // Session
        .route("/api/session/connect", post(handlers::connect_handler::<C>))
        .route(
            "/api/session/disconnect",
            post(handlers::disconnect_handler::<C>),
        )
        // Contract state
        .route("/api/dashboard", get(handlers::dashboard_handler::<C>))
        .route("/api/timelock", get(handlers::timelock_handler::<C>))
        .route("/api/refresh", post(handlers::refresh_handler::<C>))
        .route("/api/admin/stats", get(handlers::admin_stats_handler::<C>))
        // Writes
        .route("/api/deposit", post(handlers::deposit_handler::<C>))
        .route("/api/withdraw", post(handlers::withdraw_handler::<C>))
        .route(
            "/api/withdraw-all",
            post(handlers::withdraw_all_handler::<C>),
        )
        // Transactions & toasts
        .route(
            "/api/transactions",
            get(handlers::transactions_handler::<C>),
        )
        .route(
            "/api/transactions/submitted",
            get(handlers::submissions_handler::<C>),
        )
        .route("/api/toasts", get(handlers::toasts_handler::<C>))
        .route(
            "/api/toasts/:id",
            delete(handlers::dismiss_toast_handler::<C>),
        )
        // Saved drafts
        .route(
            "/api/bookmarks",
            get(handlers::list_bookmarks_handler::<C>).post(handlers::save_bookmark_handler::<C>),
        )
        .route(
            "/api/bookmarks/:id",
            delete(handlers::delete_bookmark_handler::<C>),
        )
        // Diagnostics
        .route(
            "/api/diagnostics",
            get(handlers::diagnostics_handler::<C>).delete(handlers::clear_diagnostics_handler::<C>),
        )
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(manager)
}

/// CORS from `ALLOWED_ORIGINS` (comma separated); any origin when unset.
fn cors_layer() -> CorsLayer {
    match std::env::var("ALLOWED_ORIGINS") {
        Ok(origins) if !origins.is_empty() => {
            log::info!("CORS configured for origins: {}", origins);
            let origin_list: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| match s.trim().parse() {
                    Ok(origin) => Some(origin),
                    Err(_) => {
                        log::warn!("Ignoring invalid CORS origin '{}'", s.trim());
                        None
                    }
                })
                .collect();
            CorsLayer::new()
                .allow_origin(origin_list)
                .allow_methods(CorsAny)
                .allow_headers(CorsAny)
        }
        _ => {
            log::warn!("CORS: Allowing all origins (development mode). Set ALLOWED_ORIGINS env var for production.");
            CorsLayer::new()
                .allow_origin(CorsAny)
                .allow_methods(CorsAny)
                .allow_headers(CorsAny)
        }
    }
}

/// A panicking handler answers 500 and the rest of the service keeps running.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    log::error!("💥 Request handler panicked: {}", detail);

    let body = Json(json!({
        "error": "Something went wrong. Please reload the application.",
        "recovery": "reload",
    }));
    (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
}

/// Handle graceful shutdown signals (Ctrl+C, SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            log::info!("Received SIGTERM signal");
        },
    }

    log::info!("Shutdown signal received, exiting gracefully...");
}
