use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use serde::Deserialize;

use crate::exec::{command_exists, run_tool};
use crate::AppState;

use super::{decode_body, ApiResponse};

#[derive(Debug, Deserialize)]
pub struct ShodanSearchRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub port: u16,
}

// ─── POST /api/recon/shodan ──────────────────────────────────────

pub async fn shodan(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ShodanSearchRequest>, JsonRejection>,
) -> Json<ApiResponse> {
    let req = match decode_body(body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    if req.query.is_empty() && req.ip_address.is_empty() {
        return ApiResponse::error("Either a query or an IP address is required");
    }

    let cli = &state.config.tools.shodan;
    if command_exists(cli) {
        let result = if !req.ip_address.is_empty() {
            run_tool(cli, &["host", &req.ip_address]).await
        } else {
            let mut query = req.query.clone();
            if req.port > 0 {
                query = format!("{query} port:{}", req.port);
            }
            run_tool(cli, &["search", &query]).await
        };

        match result {
            Ok(out) if out.success => return ApiResponse::success(out.combined),
            Ok(out) => {
                // CLI ran but failed (usually a missing API key) — try the
                // unauthenticated InternetDB route before giving up.
                if let Some(resp) = internetdb_fallback(&state, &req, "CLI error").await {
                    return resp;
                }
                return ApiResponse::error_with_output(
                    "Error executing Shodan search: shodan exited with an error",
                    out.combined,
                );
            }
            Err(e) => {
                if let Some(resp) = internetdb_fallback(&state, &req, "CLI error").await {
                    return resp;
                }
                return ApiResponse::error(format!("Error executing Shodan search: {e}"));
            }
        }
    }

    if let Some(resp) = internetdb_fallback(&state, &req, "CLI was not available").await {
        return resp;
    }

    ApiResponse::error("Shodan search failed: CLI not available and fallback methods not applicable")
}

/// Free InternetDB lookup, either for the request's IP directly or for the
/// first address a `hostname:` query resolves to. `None` when the request
/// offers nothing the fallback can use.
async fn internetdb_fallback(
    state: &AppState,
    req: &ShodanSearchRequest,
    reason: &str,
) -> Option<Json<ApiResponse>> {
    if !req.ip_address.is_empty() {
        if let Ok(data) = internetdb_lookup(&state.http, &req.ip_address).await {
            return Some(ApiResponse::success_with_note(
                format!("Used fallback HTTP search due to {reason}"),
                data,
            ));
        }
        return None;
    }

    if let Some(domain) = req.query.strip_prefix("hostname:") {
        let resolver = TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default());
        let ip = resolver
            .lookup_ip(domain.to_string())
            .await
            .ok()
            .and_then(|lookup| lookup.iter().next())?;

        if let Ok(data) = internetdb_lookup(&state.http, &ip.to_string()).await {
            return Some(ApiResponse::success_with_note(
                format!("Used fallback HTTP search for IP {ip} (resolved from {domain})"),
                data,
            ));
        }
    }

    None
}

/// Unauthenticated query against Shodan's InternetDB service.
async fn internetdb_lookup(client: &reqwest::Client, ip: &str) -> Result<String, String> {
    let url = format!("https://internetdb.shodan.io/{ip}");
    let response = client
        .get(&url)
        .timeout(Duration::from_secs(15))
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let status = response.status();
    let body = response.text().await.map_err(|e| e.to_string())?;
    if !status.is_success() {
        return Err(format!("API returned status {status}: {body}"));
    }
    Ok(body)
}
