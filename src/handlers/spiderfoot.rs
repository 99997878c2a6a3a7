use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use tokio::process::Command;

use crate::exec::{command_exists, file_exists};
use crate::AppState;

use super::{decode_body, ApiResponse};

#[derive(Debug, Deserialize)]
pub struct SpiderFootRequest {
    /// Domain, email address, IP — anything SpiderFoot accepts as a seed.
    pub target: Option<String>,
    #[serde(default)]
    pub module: String,
    /// Minutes; scans are killed past this bound (default 5 minutes).
    #[serde(default)]
    pub timeout: u32,
}

// ─── POST /api/recon/spiderfoot ──────────────────────────────────

pub async fn spiderfoot(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SpiderFootRequest>, JsonRejection>,
) -> Json<ApiResponse> {
    let req = match decode_body(body) {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    let Some(target) = req.target.clone().filter(|t| !t.is_empty()) else {
        return ApiResponse::error("Target is required");
    };

    let Some((program, script)) = locate_spiderfoot(state.config.tools.spiderfoot_dir.as_deref())
    else {
        return ApiResponse::error(
            "SpiderFoot not available on the system or could not be properly executed",
        );
    };

    let deadline = if req.timeout > 0 {
        Duration::from_secs(req.timeout as u64 * 60)
    } else {
        Duration::from_secs(300)
    };

    let mut command = Command::new(&program);
    if let Some(script) = &script {
        command.arg(script);
    }
    command.args(spiderfoot_args(&target, &req));
    // Dropping the future on timeout must take the scan down with it.
    command.kill_on_drop(true);

    let run = async {
        let output = command.output().await?;
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok::<_, std::io::Error>((output.status.success(), combined))
    };

    match tokio::time::timeout(deadline, run).await {
        Err(_) => ApiResponse::error("SpiderFoot scan timed out"),
        Ok(Err(e)) => ApiResponse::error(format!("Error executing SpiderFoot: {e}")),
        Ok(Ok((false, combined))) => ApiResponse::error_with_output(
            "Error executing SpiderFoot: tool exited with an error",
            combined,
        ),
        Ok(Ok((true, combined))) => ApiResponse::success(combined),
    }
}

/// Work out how to invoke SpiderFoot: a checkout directory with its own
/// venv takes precedence, then `sf.py` / `spiderfoot` on PATH.
/// Returns `(program, optional script argument)`.
fn locate_spiderfoot(install_dir: Option<&str>) -> Option<(String, Option<String>)> {
    if let Some(dir) = install_dir {
        let venv_python = format!("{dir}/venv/bin/python");
        if file_exists(&venv_python) {
            for script in [format!("{dir}/sf.py"), format!("{dir}/spiderfoot.py")] {
                if file_exists(&script) {
                    return Some((venv_python, Some(script)));
                }
            }
        }
    }

    if command_exists("sf.py") {
        return Some(("sf.py".to_string(), None));
    }
    if command_exists("spiderfoot") {
        return Some(("spiderfoot".to_string(), None));
    }
    None
}

fn spiderfoot_args(target: &str, req: &SpiderFootRequest) -> Vec<String> {
    let mut args = vec!["-s".to_string(), target.to_string()];
    if !req.module.is_empty() {
        args.push("-m".to_string());
        args.push(req.module.clone());
    }
    if req.timeout > 0 {
        args.push("-t".to_string());
        args.push((req.timeout * 60).to_string());
    }
    args.push("-o".to_string());
    args.push("CLI".to_string());
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_include_module_and_timeout() {
        let req = SpiderFootRequest {
            target: Some("example.com".into()),
            module: "sfp_dnsresolve".into(),
            timeout: 2,
        };
        let args = spiderfoot_args("example.com", &req);
        assert_eq!(
            args,
            vec!["-s", "example.com", "-m", "sfp_dnsresolve", "-t", "120", "-o", "CLI"]
        );
    }

    #[test]
    fn minimal_args_force_cli_output() {
        let req = SpiderFootRequest {
            target: Some("example.com".into()),
            module: String::new(),
            timeout: 0,
        };
        let args = spiderfoot_args("example.com", &req);
        assert_eq!(args, vec!["-s", "example.com", "-o", "CLI"]);
    }

    #[test]
    fn missing_install_falls_back_to_path_lookup() {
        // No checkout dir and (almost certainly) no sf.py on PATH here.
        assert!(locate_spiderfoot(Some("/nonexistent/spiderfoot")).is_none());
    }
}
