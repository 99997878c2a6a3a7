use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use recon_api::config::Config;
use recon_api::server;
use recon_api::track::DebugReporter;
use recon_api::AppState;

/// Cadence of the in-flight request report.
const REPORT_INTERVAL: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env();
    let port = config.port;
    let state = Arc::new(AppState::new(config));

    // Reporter runs for the life of the process; the handle is only kept
    // alive, never stopped.
    let _reporter = DebugReporter::spawn(state.tracker.clone(), REPORT_INTERVAL);

    let app = server::create_router(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to port {port}: {e}"));

    info!("Recon API server running on port {port}");
    info!("Debug monitor active - reporting ongoing requests every 5 seconds");
    info!("Available endpoints:");
    info!("  GET  /api/debug");
    for endpoint in [
        "whois",
        "ping",
        "dig",
        "portscan",
        "subdomains",
        "dnsenum",
        "webtech",
        "sslscan",
        "emailharvest",
        "socialmedia",
        "metadata",
        "shodan",
        "spiderfoot",
    ] {
        info!("  POST /api/recon/{endpoint}");
    }

    axum::serve(listener, app)
        .await
        .expect("Server exited with error");
}
