use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::exec::{command_exists, file_exists, run_tool};
use crate::AppState;

use super::{decode_body, ApiResponse};

// ─── POST /api/recon/emailharvest ────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct EmailHarvestRequest {
    pub domain: Option<String>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub limit: u32,
}

pub async fn emailharvest(
    State(state): State<Arc<AppState>>,
    body: Result<Json<EmailHarvestRequest>, JsonRejection>,
) -> Json<ApiResponse> {
    let req = match decode_body(body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let Some(domain) = req.domain.filter(|d| !d.is_empty()) else {
        return ApiResponse::error("Domain is required");
    };

    let harvester = &state.config.tools.theharvester;
    if command_exists(harvester) {
        let source = if req.source.is_empty() {
            "all"
        } else {
            &req.source
        };
        let limit = req.limit.to_string();

        let mut args = vec!["-d", domain.as_str(), "-b", source];
        if req.limit > 0 {
            args.push("-l");
            args.push(&limit);
        }
        // DNS TLD expansion; flag only, takes no value.
        args.push("-t");

        return match run_tool(harvester, &args).await {
            Ok(out) if out.success => ApiResponse::success(out.combined),
            Ok(out) => ApiResponse::error_with_output(
                "Error executing email harvest: theHarvester exited with an error",
                out.combined,
            ),
            Err(e) => ApiResponse::error(format!("Error executing email harvest: {e}")),
        };
    }

    let h8mail = &state.config.tools.h8mail;
    if command_exists(h8mail) {
        return match run_tool(h8mail, &["-t", &domain, "-c"]).await {
            Ok(out) if out.success => ApiResponse::success(out.combined),
            Ok(out) => ApiResponse::error_with_output(
                "Error executing email harvest with h8mail: h8mail exited with an error",
                out.combined,
            ),
            Err(e) => {
                ApiResponse::error(format!("Error executing email harvest with h8mail: {e}"))
            }
        };
    }

    ApiResponse::error("No email harvesting tool available on the system")
}

// ─── POST /api/recon/socialmedia ─────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SocialMediaSearchRequest {
    pub username: Option<String>,
    #[serde(default)]
    pub sites: Vec<String>,
    #[serde(default)]
    pub timeout: u32,
}

pub async fn socialmedia(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SocialMediaSearchRequest>, JsonRejection>,
) -> Json<ApiResponse> {
    let req = match decode_body(body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let Some(username) = req.username.filter(|u| !u.is_empty()) else {
        return ApiResponse::error("Username is required");
    };

    let timeout = if req.timeout > 0 { req.timeout } else { 60 };
    let timeout = timeout.to_string();

    let sherlock = &state.config.tools.sherlock;
    if command_exists(sherlock) {
        let mut args = vec![username.as_str(), "--timeout", &timeout];
        if !req.sites.is_empty() {
            args.push("--site");
            args.extend(req.sites.iter().map(String::as_str));
        }

        return match run_tool(sherlock, &args).await {
            Ok(out) if out.success => ApiResponse::success(out.combined),
            // Sherlock exits non-zero when individual sites are down even
            // though the search itself worked; keep the output.
            Ok(out) => ApiResponse::partial_success(
                "Sherlock exited with a non-zero code",
                out.combined,
            ),
            Err(e) => ApiResponse::error(format!("Error executing sherlock: {e}")),
        };
    }

    let analyzer = &state.config.tools.social_analyzer;
    if command_exists(analyzer) {
        return match run_tool(analyzer, &["--username", &username, "--output", "json"]).await {
            Ok(out) if out.success => ApiResponse::success(out.combined),
            Ok(out) => ApiResponse::error_with_output(
                "Error executing social-analyzer: tool exited with an error",
                out.combined,
            ),
            Err(e) => ApiResponse::error(format!("Error executing social-analyzer: {e}")),
        };
    }

    ApiResponse::error("No social media search tool available on the system")
}

// ─── POST /api/recon/metadata ────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MetadataExtractionRequest {
    /// URL, domain or local file path.
    pub target: Option<String>,
    #[serde(default)]
    pub file_ext: String,
    #[serde(default)]
    pub limit: u32,
}

pub async fn metadata(
    State(state): State<Arc<AppState>>,
    body: Result<Json<MetadataExtractionRequest>, JsonRejection>,
) -> Json<ApiResponse> {
    let req = match decode_body(body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let Some(target) = req.target.filter(|t| !t.is_empty()) else {
        return ApiResponse::error("Target is required");
    };

    let is_url = target.starts_with("http://") || target.starts_with("https://");
    let is_file = file_exists(&target);
    let is_domain = !is_url && !is_file && target.contains('.');

    let metagoofil = &state.config.tools.metagoofil;
    if command_exists(metagoofil) && is_domain {
        let extensions = if req.file_ext.is_empty() {
            "pdf,doc,docx,ppt,pptx,xls,xlsx"
        } else {
            &req.file_ext
        };
        let limit = req.limit.to_string();

        let out_dir = std::env::temp_dir().join(format!("metagoofil-{}", Uuid::new_v4()));
        let out_dir_str = out_dir.to_string_lossy().into_owned();

        let mut args = vec!["-d", target.as_str(), "-t", extensions];
        if req.limit > 0 {
            args.push("-l");
            args.push(&limit);
        }
        if tokio::fs::create_dir_all(&out_dir).await.is_ok() {
            args.push("-o");
            args.push(&out_dir_str);
        }

        let result = run_tool(metagoofil, &args).await;
        if let Err(e) = tokio::fs::remove_dir_all(&out_dir).await {
            warn!("failed to clean up metagoofil output dir: {e}");
        }

        return match result {
            Ok(out) if out.success => ApiResponse::success(out.combined),
            Ok(out) => ApiResponse::error_with_output(
                "Error executing metadata extraction: metagoofil exited with an error",
                out.combined,
            ),
            Err(e) => ApiResponse::error(format!("Error executing metadata extraction: {e}")),
        };
    }

    if command_exists("exiftool") {
        if is_file {
            return exiftool(&target).await;
        }
        if is_url {
            let temp_path = match download_file(&state.http, &target).await {
                Ok(path) => path,
                Err(e) => return ApiResponse::error(format!("Error downloading file: {e}")),
            };
            let response = exiftool(&temp_path.to_string_lossy()).await;
            if let Err(e) = tokio::fs::remove_file(&temp_path).await {
                warn!("failed to remove downloaded file: {e}");
            }
            return response;
        }
        if is_domain {
            return ApiResponse::info(
                "Metadata extraction for domains requires document URLs rather than domain names",
                format!(
                    "To extract metadata, provide direct URLs to documents on {target} instead of just the domain name."
                ),
            );
        }
    }

    ApiResponse::error("No metadata extraction tool available or target type not supported")
}

async fn exiftool(path: &str) -> Json<ApiResponse> {
    match run_tool("exiftool", &[path]).await {
        Ok(out) if out.success => ApiResponse::success(out.combined),
        Ok(out) => ApiResponse::error_with_output(
            "Error executing exiftool: exiftool exited with an error",
            out.combined,
        ),
        Err(e) => ApiResponse::error(format!("Error executing exiftool: {e}")),
    }
}

/// Fetch `url` into a uniquely-named temp file and return its path.
async fn download_file(client: &reqwest::Client, url: &str) -> Result<PathBuf, String> {
    let response = client.get(url).send().await.map_err(|e| e.to_string())?;
    if !response.status().is_success() {
        return Err(format!("bad status: {}", response.status()));
    }

    let bytes = response.bytes().await.map_err(|e| e.to_string())?;
    let path = std::env::temp_dir().join(format!("download-{}", Uuid::new_v4()));
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| e.to_string())?;
    Ok(path)
}
