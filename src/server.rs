use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::middleware::tracking;
use crate::track::debug;
use crate::AppState;

/// Builds the full Axum `Router` with all routes and middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // ── Debug / instrumentation ─────────────────────────────
        .route("/api/debug", get(debug::debug_handler))
        // ── Network recon ───────────────────────────────────────
        .route("/api/recon/whois", post(handlers::network::whois))
        .route("/api/recon/ping", post(handlers::network::ping))
        .route("/api/recon/dig", post(handlers::network::dig))
        .route("/api/recon/portscan", post(handlers::portscan::portscan))
        .route("/api/recon/subdomains", post(handlers::dns::subdomains))
        .route("/api/recon/dnsenum", post(handlers::dns::dnsenum))
        .route("/api/recon/webtech", post(handlers::web::webtech))
        .route("/api/recon/sslscan", post(handlers::web::sslscan))
        // ── OSINT tools ─────────────────────────────────────────
        .route("/api/recon/emailharvest", post(handlers::osint::emailharvest))
        .route("/api/recon/socialmedia", post(handlers::osint::socialmedia))
        .route("/api/recon/metadata", post(handlers::osint::metadata))
        .route("/api/recon/shodan", post(handlers::shodan::shodan))
        .route("/api/recon/spiderfoot", post(handlers::spiderfoot::spiderfoot))
        // ── Provide shared state to all routes above ────────────
        .with_state(state.clone())
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn_with_state(state, tracking::track_requests))
        .layer(CorsLayer::permissive())
}
