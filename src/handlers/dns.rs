use axum::extract::rejection::JsonRejection;
use axum::Json;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::proto::rr::RecordType;
use hickory_resolver::TokioAsyncResolver;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::exec::{command_exists, run_tool};

use super::{decode_body, ApiResponse};

/// Subdomain labels probed when amass is not installed.
const COMMON_SUBDOMAINS: &[&str] = &[
    "www", "mail", "remote", "blog", "webmail", "server", "ns1", "ns2", "smtp", "secure", "vpn",
    "m", "shop", "ftp", "api",
];

const DEFAULT_RECORD_TYPES: &[&str] = &["A", "AAAA", "MX", "NS", "TXT", "SOA", "CNAME"];

fn resolver() -> TokioAsyncResolver {
    TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
}

// ─── POST /api/recon/subdomains ──────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SubdomainEnumRequest {
    pub domain: Option<String>,
    #[serde(default)]
    pub use_passive: bool,
}

pub async fn subdomains(
    body: Result<Json<SubdomainEnumRequest>, JsonRejection>,
) -> Json<ApiResponse> {
    let req = match decode_body(body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let Some(domain) = req.domain.filter(|d| !d.is_empty()) else {
        return ApiResponse::error("Domain is required");
    };

    if command_exists("amass") {
        let mut args = vec!["enum", "-d", domain.as_str()];
        if req.use_passive {
            args.push("-passive");
        }

        return match run_tool("amass", &args).await {
            Ok(out) if out.success => {
                ApiResponse::success(json!(parse_subdomains(&out.combined, &domain)))
            }
            Ok(out) => ApiResponse::error_with_output(
                "Error executing subdomain enumeration: amass exited with an error",
                out.combined,
            ),
            Err(e) => ApiResponse::error(format!("Error executing subdomain enumeration: {e}")),
        };
    }

    // Fallback: resolve a fixed list of common labels.
    let resolver = resolver();
    let mut results = Map::new();
    for label in COMMON_SUBDOMAINS {
        let candidate = format!("{label}.{domain}");
        if resolver.lookup_ip(candidate.clone()).await.is_ok() {
            results.insert(candidate, json!("found"));
        }
    }

    ApiResponse::success(Value::Object(results))
}

/// Keep only the amass output lines that actually mention the target domain.
fn parse_subdomains(output: &str, domain: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| line.contains(domain))
        .map(str::to_string)
        .collect()
}

// ─── POST /api/recon/dnsenum ─────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DnsEnumRequest {
    pub domain: Option<String>,
    #[serde(default)]
    pub record_types: Vec<String>,
}

pub async fn dnsenum(body: Result<Json<DnsEnumRequest>, JsonRejection>) -> Json<ApiResponse> {
    let req = match decode_body(body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let Some(domain) = req.domain.filter(|d| !d.is_empty()) else {
        return ApiResponse::error("Domain is required");
    };

    let record_types: Vec<String> = if req.record_types.is_empty() {
        DEFAULT_RECORD_TYPES.iter().map(|t| t.to_string()).collect()
    } else {
        req.record_types
    };

    let resolver = resolver();
    let mut results = Map::new();

    for record_type in &record_types {
        match record_type.as_str() {
            "A" => {
                if let Ok(lookup) = resolver.lookup_ip(domain.clone()).await {
                    let v4: Vec<String> = lookup
                        .iter()
                        .filter(|ip| ip.is_ipv4())
                        .map(|ip| ip.to_string())
                        .collect();
                    results.insert("A".into(), json!(v4));
                }
            }
            "AAAA" => {
                if let Ok(lookup) = resolver.lookup_ip(domain.clone()).await {
                    let v6: Vec<String> = lookup
                        .iter()
                        .filter(|ip| ip.is_ipv6())
                        .map(|ip| ip.to_string())
                        .collect();
                    results.insert("AAAA".into(), json!(v6));
                }
            }
            "MX" => {
                if let Ok(lookup) = resolver.mx_lookup(domain.clone()).await {
                    let mx: Vec<String> = lookup
                        .iter()
                        .map(|mx| format!("{} (priority: {})", mx.exchange(), mx.preference()))
                        .collect();
                    results.insert("MX".into(), json!(mx));
                }
            }
            "NS" => {
                if let Ok(lookup) = resolver.ns_lookup(domain.clone()).await {
                    let ns: Vec<String> = lookup.iter().map(|ns| ns.to_string()).collect();
                    results.insert("NS".into(), json!(ns));
                }
            }
            "TXT" => {
                if let Ok(lookup) = resolver.txt_lookup(domain.clone()).await {
                    let txt: Vec<String> = lookup.iter().map(|txt| txt.to_string()).collect();
                    results.insert("TXT".into(), json!(txt));
                }
            }
            "SOA" | "CNAME" => {
                let rtype = if record_type == "SOA" {
                    RecordType::SOA
                } else {
                    RecordType::CNAME
                };
                if let Ok(lookup) = resolver.lookup(domain.clone(), rtype).await {
                    let records: Vec<String> =
                        lookup.iter().map(|rdata| rdata.to_string()).collect();
                    results.insert(record_type.clone(), json!(records));
                }
            }
            _ => {}
        }
    }

    // dig sees records the resolver shortcuts miss; layer its view on top.
    if command_exists("dig") {
        for record_type in &record_types {
            if let Ok(out) = run_tool("dig", &[domain.as_str(), record_type, "+short"]).await {
                let lines: Vec<&str> = out.combined.trim().lines().collect();
                if out.success && !lines.is_empty() && !lines[0].is_empty() {
                    results.insert(format!("DIG_{record_type}"), json!(lines));
                }
            }
        }
    }

    ApiResponse::success(Value::Object(results))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_subdomains_keeps_matching_lines_only() {
        let output = "\
www.example.com\n\
Querying servers...\n\
  api.example.com  \n\
unrelated.other.net\n";
        let subs = parse_subdomains(output, "example.com");
        assert_eq!(subs, vec!["www.example.com", "api.example.com"]);
    }

    #[test]
    fn parse_subdomains_handles_empty_output() {
        assert!(parse_subdomains("", "example.com").is_empty());
    }
}
