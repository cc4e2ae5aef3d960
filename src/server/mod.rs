pub mod routes;

use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

/// JSON API over the pricing core. Every handler is a thin caller: it
/// validates scalars, calls the engine or solver and serializes the result.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/price", post(routes::post_price))
        .route("/api/iv", post(routes::post_iv))
        .route("/api/iv/curve", post(routes::post_iv_curve))
        .route("/api/heatmap", post(routes::post_heatmap))
        .route("/api/payoff", post(routes::post_payoff))
        .route("/api/quote", get(routes::get_quote))
        .route("/api/counters", get(routes::get_counters))
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .with_state(state)
}
