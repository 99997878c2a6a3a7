use std::path::Path;

use tokio::process::Command;

/// Result of running an external tool: whether it exited zero, plus its
/// interleaved stdout+stderr. The tools we wrap write useful diagnostics to
/// both streams, so handlers return the combined text either way.
pub struct ToolOutput {
    pub success: bool,
    pub combined: String,
}

/// Run `program` with `args`, capturing stdout and stderr together.
///
/// Spawn failures (binary missing, permission denied) surface as `Err` so
/// handlers can distinguish "tool ran and complained" from "tool absent".
pub async fn run_tool(program: &str, args: &[&str]) -> std::io::Result<ToolOutput> {
    let output = Command::new(program).args(args).output().await?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    Ok(ToolOutput {
        success: output.status.success(),
        combined,
    })
}

/// Check whether `program` resolves to an executable, either as an explicit
/// path or through `PATH`. Mirrors what the shell would find.
pub fn command_exists(program: &str) -> bool {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return is_executable(candidate);
    }

    let Some(path_var) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path_var).any(|dir| is_executable(&dir.join(program)))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

pub fn file_exists(path: &str) -> bool {
    Path::new(path).is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_a_ubiquitous_binary() {
        // `sh` is present on every unix box this runs on.
        assert!(command_exists("sh"));
    }

    #[test]
    fn rejects_a_nonexistent_binary() {
        assert!(!command_exists("definitely-not-a-real-tool-9f3a"));
    }

    #[tokio::test]
    async fn captures_combined_output() {
        let out = run_tool("sh", &["-c", "echo out; echo err 1>&2"])
            .await
            .unwrap();
        assert!(out.success);
        assert!(out.combined.contains("out"));
        assert!(out.combined.contains("err"));
    }

    #[tokio::test]
    async fn spawn_failure_is_an_error() {
        assert!(run_tool("definitely-not-a-real-tool-9f3a", &[])
            .await
            .is_err());
    }
}
