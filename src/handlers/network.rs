use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::exec::{command_exists, run_tool};

use super::{decode_body, ApiResponse};

// ─── POST /api/recon/whois ───────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct WhoisRequest {
    pub domain: Option<String>,
}

pub async fn whois(body: Result<Json<WhoisRequest>, JsonRejection>) -> Json<ApiResponse> {
    let req = match decode_body(body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let Some(domain) = req.domain.filter(|d| !d.is_empty()) else {
        return ApiResponse::error("Domain is required");
    };

    if command_exists("whois") {
        return match run_tool("whois", &[&domain]).await {
            Ok(out) if out.success => ApiResponse::success(out.combined),
            Ok(out) => ApiResponse::error_with_output(
                "Error performing WHOIS lookup: whois exited with an error",
                out.combined,
            ),
            Err(e) => ApiResponse::error(format!("Error performing WHOIS lookup: {e}")),
        };
    }

    // No whois binary: raw RFC 3912 query against the IANA server.
    match raw_whois_query(&domain).await {
        Ok(answer) => ApiResponse::success(answer),
        Err(e) => ApiResponse::error(format!("Error performing WHOIS lookup: {e}")),
    }
}

async fn raw_whois_query(domain: &str) -> std::io::Result<String> {
    let mut stream = TcpStream::connect(("whois.iana.org", 43)).await?;
    stream.write_all(format!("{domain}\r\n").as_bytes()).await?;

    let mut answer = String::new();
    stream.read_to_string(&mut answer).await?;
    Ok(answer)
}

// ─── POST /api/recon/ping ────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PingRequest {
    pub target: Option<String>,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub timeout: u32,
}

pub async fn ping(body: Result<Json<PingRequest>, JsonRejection>) -> Json<ApiResponse> {
    let req = match decode_body(body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let Some(target) = req.target.filter(|t| !t.is_empty()) else {
        return ApiResponse::error("Target is required");
    };

    let count = if req.count > 0 { req.count } else { 4 };
    let timeout = if req.timeout > 0 { req.timeout } else { 2 };

    let count = count.to_string();
    #[cfg(windows)]
    let timeout = (timeout * 1000).to_string();
    #[cfg(windows)]
    let args: Vec<&str> = vec!["-n", &count, "-w", &timeout, &target];
    #[cfg(not(windows))]
    let timeout = timeout.to_string();
    #[cfg(not(windows))]
    let args: Vec<&str> = vec!["-c", &count, "-W", &timeout, &target];

    match run_tool("ping", &args).await {
        Ok(out) if out.success => ApiResponse::success(out.combined),
        Ok(out) => ApiResponse::error_with_output(
            "Error executing ping: ping exited with an error",
            out.combined,
        ),
        Err(e) => ApiResponse::error(format!("Error executing ping: {e}")),
    }
}

// ─── POST /api/recon/dig ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DigRequest {
    pub domain: Option<String>,
}

pub async fn dig(body: Result<Json<DigRequest>, JsonRejection>) -> Json<ApiResponse> {
    let req = match decode_body(body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let Some(domain) = req.domain.filter(|d| !d.is_empty()) else {
        return ApiResponse::error("Domain is required");
    };

    let result = if command_exists("dig") {
        run_tool("dig", &["+nocmd", &domain, "+noall", "+answer"]).await
    } else if command_exists("nslookup") {
        run_tool("nslookup", &[&domain]).await
    } else {
        return ApiResponse::error("No DNS lookup tool available on the system");
    };

    match result {
        Ok(out) if out.success => ApiResponse::success(out.combined),
        Ok(out) => ApiResponse::error_with_output(
            "Error executing DNS lookup: tool exited with an error",
            out.combined,
        ),
        Err(e) => ApiResponse::error(format!("Error executing DNS lookup: {e}")),
    }
}
