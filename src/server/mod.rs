//! HTTP API
//!
//! | Method | Path | |
//! |---|---|---|
//! | GET | `/api/health` | liveness |
//! | GET | `/api/providers` | chain order, credentials, circuit state |
//! | GET | `/api/questions` | partner question bank |
//! | POST | `/api/generate-partner` | `{answers}` |
//! | POST | `/api/generate-personality` | `{answers}` (20+) |
//! | POST | `/api/generate-image` | `{personality \| partner, count?, aspectRatio?}` |
//! | POST | `/api/echo` | save a generated echo |
//! | GET | `/api/echo/{id}` | load a saved echo |

mod error;
mod handlers;

pub use error::{ApiError, ApiResult};

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::studio::{EchoStore, Studio};
use crate::types::Result;

#[derive(Clone)]
pub struct AppState {
    pub studio: Arc<Studio>,
    pub store: EchoStore,
}

impl AppState {
    pub fn new(studio: Studio) -> Self {
        Self {
            studio: Arc::new(studio),
            store: EchoStore::new(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(handlers::health))
        .route("/providers", get(handlers::providers))
        .route("/questions", get(handlers::questions))
        .route("/generate-partner", post(handlers::generate_partner))
        .route("/generate-personality", post(handlers::generate_personality))
        .route("/generate-image", post(handlers::generate_image))
        .route("/echo", post(handlers::save_echo))
        .route("/echo/{id}", get(handlers::get_echo));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until Ctrl-C
pub async fn serve(host: &str, port: u16, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    info!(addr = %listener.local_addr()?, "Echo Studio listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}
