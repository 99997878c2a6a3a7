use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use native_tls::TlsConnector;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::task::spawn_blocking;
use x509_parser::prelude::*;

use crate::exec::{command_exists, run_tool};
use crate::AppState;

use super::{decode_body, ApiResponse};

// ─── POST /api/recon/webtech ─────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct WebTechRequest {
    pub target: Option<String>,
    #[serde(default)]
    pub depth: u32,
}

pub async fn webtech(
    State(state): State<Arc<AppState>>,
    body: Result<Json<WebTechRequest>, JsonRejection>,
) -> Json<ApiResponse> {
    let req = match decode_body(body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let Some(target) = req.target.filter(|t| !t.is_empty()) else {
        return ApiResponse::error("Target is required");
    };

    let target = if target.starts_with("http://") || target.starts_with("https://") {
        target
    } else {
        format!("http://{target}")
    };

    if command_exists("whatweb") {
        let mut args = vec![
            "-a".to_string(),
            "3".to_string(),
            "--log-json".to_string(),
            "-".to_string(),
            "--colour".to_string(),
            "never".to_string(),
        ];

        // Depth is only supported by some whatweb builds; probe the help
        // text before passing it.
        if req.depth > 0 {
            if let Ok(help) = run_tool("whatweb", &["--help"]).await {
                if help.combined.contains("-d, --depth") {
                    args.push("-d".to_string());
                    args.push(req.depth.to_string());
                }
            }
        }
        args.push(target.clone());

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        return match run_tool("whatweb", &arg_refs).await {
            Ok(out) if out.success => match serde_json::from_str::<Value>(&out.combined) {
                Ok(parsed) => ApiResponse::success(parsed),
                // Not valid JSON (banner noise etc.) — hand back the raw text.
                Err(_) => ApiResponse::success(out.combined),
            },
            Ok(out) => ApiResponse::error_with_output(
                "Error executing web technology detection: whatweb exited with an error",
                out.combined,
            ),
            Err(e) => {
                ApiResponse::error(format!("Error executing web technology detection: {e}"))
            }
        };
    }

    // Fallback: fetch the page ourselves and fingerprint headers + body.
    let response = match state
        .http
        .get(&target)
        .timeout(Duration::from_secs(10))
        .send()
        .await
    {
        Ok(resp) => resp,
        Err(e) => return ApiResponse::error(format!("Error making HTTP request: {e}")),
    };

    let mut technologies = Map::new();
    for (header, label) in [
        ("server", "Server"),
        ("x-powered-by", "X-Powered-By"),
        ("x-generator", "CMS"),
    ] {
        if let Some(value) = response.headers().get(header) {
            if let Ok(value) = value.to_str() {
                technologies.insert(label.to_string(), json!(value));
            }
        }
    }

    let body_text = match response.text().await {
        Ok(text) => text,
        Err(e) => return ApiResponse::error(format!("Error reading response body: {e}")),
    };

    for (name, detected) in detect_frameworks(&body_text) {
        technologies.insert(name, json!(detected));
    }

    ApiResponse::success(Value::Object(technologies))
}

/// Framework fingerprints applied to the response body. Version capture
/// groups are returned when the pattern matches one.
const FRAMEWORK_PATTERNS: &[(&str, &str)] = &[
    ("jQuery", r"jquery[.-](\d+\.\d+\.\d+)"),
    ("Bootstrap", r"bootstrap[.-](\d+\.\d+\.\d+)"),
    ("React", r"react[.-](\d+\.\d+\.\d+)"),
    ("Angular", r"angular[.-](\d+\.\d+\.\d+)"),
    ("Vue.js", r"vue[.-](\d+\.\d+\.\d+)"),
    ("WordPress", r"wp-content|wordpress"),
    ("Drupal", r"drupal"),
    ("Joomla", r"joomla"),
    ("Magento", r"magento"),
    ("Laravel", r"laravel"),
    ("Django", r"django"),
    ("Express.js", r"express"),
    ("Ruby on Rails", r"rails"),
];

fn detect_frameworks(body: &str) -> Vec<(String, String)> {
    let mut found = Vec::new();
    for (name, pattern) in FRAMEWORK_PATTERNS {
        let Ok(re) = Regex::new(pattern) else {
            continue;
        };
        if let Some(caps) = re.captures(body) {
            let detected = caps
                .get(1)
                .map(|version| version.as_str().to_string())
                .unwrap_or_else(|| "detected".to_string());
            found.push((name.to_string(), detected));
        }
    }
    found
}

// ─── POST /api/recon/sslscan ─────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SslScanRequest {
    pub target: Option<String>,
    #[serde(default)]
    pub port: u16,
}

pub async fn sslscan(body: Result<Json<SslScanRequest>, JsonRejection>) -> Json<ApiResponse> {
    let req = match decode_body(body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let Some(target) = req.target.filter(|t| !t.is_empty()) else {
        return ApiResponse::error("Target is required");
    };
    let port = if req.port > 0 { req.port } else { 443 };

    if command_exists("sslscan") {
        let address = format!("{target}:{port}");
        return match run_tool("sslscan", &["--no-colour", &address]).await {
            Ok(out) if out.success => ApiResponse::success(out.combined),
            Ok(out) => ApiResponse::error_with_output(
                "Error executing SSL scan: sslscan exited with an error",
                out.combined,
            ),
            Err(e) => ApiResponse::error(format!("Error executing SSL scan: {e}")),
        };
    }

    // Fallback: native TLS handshake and certificate inspection. native-tls
    // blocks, so the handshake runs on the blocking pool.
    let result = spawn_blocking(move || inspect_certificate(&target, port)).await;
    match result {
        Ok(Ok(details)) => ApiResponse::success(details),
        Ok(Err(e)) => ApiResponse::error(format!("Error establishing TLS connection: {e}")),
        Err(e) => ApiResponse::error(format!("Error establishing TLS connection: {e}")),
    }
}

fn inspect_certificate(target: &str, port: u16) -> Result<Value, String> {
    // Expired or self-signed endpoints are exactly what callers want to
    // inspect, so certificate validation stays off for the handshake.
    let connector = TlsConnector::builder()
        .danger_accept_invalid_certs(true)
        .danger_accept_invalid_hostnames(true)
        .build()
        .map_err(|e| e.to_string())?;

    let stream = TcpStream::connect((target, port)).map_err(|e| e.to_string())?;
    let stream = connector.connect(target, stream).map_err(|e| e.to_string())?;

    let cert = stream
        .peer_certificate()
        .map_err(|e| e.to_string())?
        .ok_or_else(|| "peer presented no certificate".to_string())?;
    let der = cert.to_der().map_err(|e| e.to_string())?;

    let (_, x509) = parse_x509_certificate(&der).map_err(|e| e.to_string())?;

    let not_before = asn1_time_to_utc(&x509.validity().not_before);
    let not_after = asn1_time_to_utc(&x509.validity().not_after);

    let dns_names: Vec<String> = x509
        .subject_alternative_name()
        .ok()
        .flatten()
        .map(|san| {
            san.value
                .general_names
                .iter()
                .filter_map(|name| match name {
                    GeneralName::DNSName(dns) => Some(dns.to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(json!({
        "subject": x509.subject().to_string(),
        "issuer": x509.issuer().to_string(),
        "valid_from": not_before.to_rfc3339(),
        "valid_until": not_after.to_rfc3339(),
        "dns_names": dns_names,
        "version": x509.version().0,
        "serial_number": x509.raw_serial_as_string(),
        "certificate_expired": Utc::now() > not_after,
    }))
}

fn asn1_time_to_utc(time: &ASN1Time) -> DateTime<Utc> {
    DateTime::from_timestamp(time.timestamp(), 0).unwrap_or_default()
}
