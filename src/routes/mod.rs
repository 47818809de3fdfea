//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every procedure goes through one RPC endpoint. `POST /rpc` accepts any
//! procedure as a request frame; `GET /rpc/{procedure}` serves queries only
//! so they can be fetched and cached like plain resources.

pub mod rpc;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/rpc", post(rpc::post_rpc))
        .route("/rpc/{procedure}", get(rpc::get_rpc))
        .route("/healthz", get(healthz))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
