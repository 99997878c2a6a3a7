pub mod config;
pub mod exec;
pub mod handlers;
pub mod middleware;
pub mod server;
pub mod track;

use std::sync::Arc;

use crate::track::RequestTracker;

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// In-flight request registry — the middleware writes, the debug
    /// endpoint and the periodic reporter read.
    pub tracker: Arc<RequestTracker>,

    /// Env-derived settings (listen port, tool-path overrides).
    pub config: config::Config,

    /// Shared HTTP client for the handlers that fall back to direct
    /// web lookups (InternetDB, webtech, file download).
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: config::Config) -> Self {
        Self {
            tracker: Arc::new(RequestTracker::new()),
            config,
            http: reqwest::Client::new(),
        }
    }
}
