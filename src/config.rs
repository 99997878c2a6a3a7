use std::env;

/// Runtime configuration, read once from the environment at startup.
///
/// The server itself only needs a listen port; everything else is a set of
/// optional overrides for where the wrapped OSINT tools live on disk. When an
/// override is unset the tool is resolved through `PATH` under its usual name.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub tools: ToolPaths,
}

/// Per-tool binary overrides. Empty string / unset → PATH lookup.
#[derive(Debug, Clone)]
pub struct ToolPaths {
    pub theharvester: String,
    pub h8mail: String,
    pub sherlock: String,
    pub social_analyzer: String,
    pub metagoofil: String,
    pub shodan: String,
    /// Directory containing a SpiderFoot checkout (sf.py + venv), not a binary.
    pub spiderfoot_dir: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        Self {
            port,
            tools: ToolPaths {
                theharvester: tool_override("THEHARVESTER_PATH", "theHarvester"),
                h8mail: tool_override("H8MAIL_PATH", "h8mail"),
                sherlock: tool_override("SHERLOCK_PATH", "sherlock"),
                social_analyzer: tool_override("SOCIAL_ANALYZER_PATH", "social-analyzer"),
                metagoofil: tool_override("METAGOOFIL_PATH", "metagoofil"),
                shodan: tool_override("SHODAN_CLI_PATH", "shodan"),
                spiderfoot_dir: env::var("SPIDERFOOT_PATH").ok().filter(|p| !p.is_empty()),
            },
        }
    }
}

fn tool_override(var: &str, default: &str) -> String {
    match env::var(var) {
        Ok(path) if !path.is_empty() => path,
        _ => default.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_port_is_3000() {
        std::env::remove_var("PORT");
        let config = Config::from_env();
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn unset_overrides_fall_back_to_path_names() {
        std::env::remove_var("SHERLOCK_PATH");
        let config = Config::from_env();
        assert_eq!(config.tools.sherlock, "sherlock");
    }
}
