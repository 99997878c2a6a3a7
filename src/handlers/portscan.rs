use std::collections::BTreeMap;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde::Deserialize;
use tokio::net::TcpStream;
use tracing::debug;

use crate::exec::{command_exists, run_tool};

use super::{decode_body, ApiResponse};

/// Ports probed when the request names none and `--top-ports` is not used.
const DEFAULT_PORTS: &[&str] = &[
    "21", "22", "23", "25", "53", "80", "110", "111", "135", "139", "143", "443", "445", "993",
    "995", "1723", "3306", "3389", "5900", "8080",
];

#[derive(Debug, Default, Deserialize)]
pub struct PortScanRequest {
    pub target: Option<String>,
    #[serde(default)]
    pub ports: Vec<String>,
    /// "tcp", "udp" or "syn".
    #[serde(default)]
    pub scan_type: String,
    #[serde(default)]
    pub timeout: u32,
    /// "light", "medium" or "aggressive" — preset that wins over the
    /// individual detection toggles below (except service detection and
    /// default scripts, which still apply).
    #[serde(default)]
    pub intensity: String,
    #[serde(default)]
    pub enable_os_detection: bool,
    #[serde(default)]
    pub enable_service_detection: bool,
    /// 1–9, passed through to `--version-intensity`.
    #[serde(default)]
    pub version_intensity: u8,
    #[serde(default)]
    pub use_all_probes: bool,
    #[serde(default)]
    pub run_default_scripts: bool,
    /// Comma-separated nmap script list.
    #[serde(default)]
    pub custom_scripts: String,
    #[serde(default)]
    pub script_args: String,
    #[serde(default)]
    pub top_ports: u32,
    /// 1–5; defaults to T4 (T3 for "light" intensity).
    #[serde(default)]
    pub timing_template: u8,
    #[serde(default)]
    pub aggressive_scan: bool,
    #[serde(default)]
    pub verbose: bool,
}

// ─── POST /api/recon/portscan ────────────────────────────────────

pub async fn portscan(body: Result<Json<PortScanRequest>, JsonRejection>) -> Json<ApiResponse> {
    let req = match decode_body(body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let Some(target) = req.target.clone().filter(|t| !t.is_empty()) else {
        return ApiResponse::error("Target is required");
    };

    debug!(
        target,
        top_ports = req.top_ports,
        service_detection = req.enable_service_detection,
        default_scripts = req.run_default_scripts,
        intensity = %req.intensity,
        "port scan request"
    );

    if command_exists("nmap") {
        let args = build_nmap_args(&req, &target);
        debug!("executing: nmap {}", args.join(" "));

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        return match run_tool("nmap", &arg_refs).await {
            Ok(out) if out.success => ApiResponse::success(out.combined),
            Ok(out) => ApiResponse::error_with_output(
                "Error executing port scan: nmap exited with an error",
                out.combined,
            ),
            Err(e) => ApiResponse::error(format!("Error executing port scan: {e}")),
        };
    }

    // No nmap: plain TCP connect probe over the requested port list.
    let timeout = if req.timeout > 0 { req.timeout } else { 2 };
    let ports: Vec<String> = if req.ports.is_empty() {
        DEFAULT_PORTS.iter().map(|p| p.to_string()).collect()
    } else {
        req.ports.clone()
    };

    let results = connect_scan(&target, &ports, Duration::from_secs(timeout as u64)).await;
    match serde_json::to_value(results) {
        Ok(value) => ApiResponse::success(value),
        Err(e) => ApiResponse::error(format!("Error executing port scan: {e}")),
    }
}

/// Translate the request's independent toggles into a coherent nmap
/// command line. Pure so the branch soup stays testable.
pub fn build_nmap_args(req: &PortScanRequest, target: &str) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    let mut timing_template = 4u8;

    match req.scan_type.as_str() {
        "syn" => args.push("-sS".into()),
        "udp" => args.push("-sU".into()),
        "tcp" => args.push("-sT".into()),
        _ => {}
    }

    if !req.intensity.is_empty() {
        match req.intensity.as_str() {
            "aggressive" => args.push("-A".into()),
            "light" => timing_template = 3,
            // "medium" keeps the T4 default
            _ => {}
        }

        // Service detection and script scanning still apply under a preset.
        if req.enable_service_detection {
            args.push("-sV".into());
        }
        if req.run_default_scripts {
            args.push("-sC".into());
        }
    } else {
        if req.enable_os_detection {
            args.push("-O".into());
        }
        if req.enable_service_detection {
            args.push("-sV".into());
        }
        if req.version_intensity > 0 && req.version_intensity <= 9 {
            args.push("--version-intensity".into());
            args.push(req.version_intensity.to_string());
        }
        if req.use_all_probes {
            args.push("--version-all".into());
        }
        if req.run_default_scripts {
            args.push("-sC".into());
        }
        if !req.custom_scripts.is_empty() {
            args.push("--script".into());
            args.push(req.custom_scripts.clone());
        }
        if !req.script_args.is_empty() {
            args.push("--script-args".into());
            args.push(req.script_args.clone());
        }
        if req.aggressive_scan {
            args.push("-A".into());
        }
    }

    // An explicit timing template always wins.
    if req.timing_template > 0 && req.timing_template <= 5 {
        timing_template = req.timing_template;
    }
    args.push(format!("-T{timing_template}"));

    if req.top_ports > 0 {
        args.push("--top-ports".into());
        args.push(req.top_ports.to_string());
    } else {
        let ports: Vec<&str> = if req.ports.is_empty() {
            DEFAULT_PORTS.to_vec()
        } else {
            req.ports.iter().map(String::as_str).collect()
        };
        args.push("-p".into());
        args.push(ports.join(","));
    }

    if req.verbose {
        args.push("-v".into());
    }

    args.push(target.to_string());
    args
}

/// Sequential TCP connect scan with a per-port timeout.
async fn connect_scan(
    target: &str,
    ports: &[String],
    timeout: Duration,
) -> BTreeMap<String, &'static str> {
    let mut results = BTreeMap::new();
    for port in ports {
        let address = format!("{target}:{port}");
        let open = matches!(
            tokio::time::timeout(timeout, TcpStream::connect(&address)).await,
            Ok(Ok(_))
        );
        results.insert(port.clone(), if open { "open" } else { "closed" });
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request(target: &str) -> PortScanRequest {
        PortScanRequest {
            target: Some(target.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn default_scan_uses_t4_and_the_default_ports() {
        let args = build_nmap_args(&base_request("10.0.0.1"), "10.0.0.1");
        assert_eq!(args[0], "-T4");
        assert_eq!(args[1], "-p");
        assert!(args[2].starts_with("21,22,23,"));
        assert_eq!(args.last().unwrap(), "10.0.0.1");
    }

    #[test]
    fn light_intensity_drops_to_t3() {
        let mut req = base_request("scanme.example");
        req.intensity = "light".into();
        let args = build_nmap_args(&req, "scanme.example");
        assert!(args.contains(&"-T3".to_string()));
        assert!(!args.contains(&"-A".to_string()));
    }

    #[test]
    fn aggressive_intensity_adds_dash_a_but_keeps_t4() {
        let mut req = base_request("scanme.example");
        req.intensity = "aggressive".into();
        req.enable_service_detection = true;
        req.run_default_scripts = true;
        let args = build_nmap_args(&req, "scanme.example");
        assert_eq!(args[0], "-A");
        assert!(args.contains(&"-sV".to_string()));
        assert!(args.contains(&"-sC".to_string()));
        assert!(args.contains(&"-T4".to_string()));
    }

    #[test]
    fn intensity_preset_suppresses_individual_toggles() {
        let mut req = base_request("scanme.example");
        req.intensity = "medium".into();
        req.enable_os_detection = true;
        req.custom_scripts = "vuln".into();
        let args = build_nmap_args(&req, "scanme.example");
        assert!(!args.contains(&"-O".to_string()));
        assert!(!args.contains(&"--script".to_string()));
    }

    #[test]
    fn individual_toggles_apply_without_a_preset() {
        let mut req = base_request("scanme.example");
        req.scan_type = "syn".into();
        req.enable_os_detection = true;
        req.enable_service_detection = true;
        req.version_intensity = 7;
        req.use_all_probes = true;
        req.run_default_scripts = true;
        req.custom_scripts = "vuln,safe".into();
        req.script_args = "timeout=5".into();
        let args = build_nmap_args(&req, "scanme.example");

        let joined = args.join(" ");
        assert!(joined.starts_with("-sS -O -sV --version-intensity 7 --version-all -sC"));
        assert!(joined.contains("--script vuln,safe"));
        assert!(joined.contains("--script-args timeout=5"));
    }

    #[test]
    fn explicit_timing_template_wins_over_presets() {
        let mut req = base_request("scanme.example");
        req.intensity = "light".into();
        req.timing_template = 2;
        let args = build_nmap_args(&req, "scanme.example");
        assert!(args.contains(&"-T2".to_string()));
        assert!(!args.contains(&"-T3".to_string()));
    }

    #[test]
    fn out_of_range_knobs_are_ignored() {
        let mut req = base_request("scanme.example");
        req.version_intensity = 12;
        req.timing_template = 9;
        let args = build_nmap_args(&req, "scanme.example");
        assert!(!args.contains(&"--version-intensity".to_string()));
        assert!(args.contains(&"-T4".to_string()));
    }

    #[test]
    fn top_ports_replaces_the_port_list() {
        let mut req = base_request("scanme.example");
        req.top_ports = 100;
        req.ports = vec!["80".into(), "443".into()];
        req.verbose = true;
        let args = build_nmap_args(&req, "scanme.example");

        let joined = args.join(" ");
        assert!(joined.contains("--top-ports 100"));
        assert!(!joined.contains("-p 80,443"));
        assert!(args.contains(&"-v".to_string()));
    }

    #[test]
    fn explicit_ports_are_joined_with_commas() {
        let mut req = base_request("scanme.example");
        req.ports = vec!["22".into(), "8443".into()];
        let args = build_nmap_args(&req, "scanme.example");
        let joined = args.join(" ");
        assert!(joined.contains("-p 22,8443"));
    }

    #[tokio::test]
    async fn connect_scan_marks_unreachable_ports_closed() {
        // TEST-NET-1 is guaranteed non-routable; the timeout path fires.
        let results = connect_scan(
            "192.0.2.1",
            &["81".to_string()],
            Duration::from_millis(50),
        )
        .await;
        assert_eq!(results.get("81"), Some(&"closed"));
    }
}
