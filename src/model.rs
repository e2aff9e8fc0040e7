use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "ds-console.yaml";

/// Console settings, read from YAML and overridden by command-line flags.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Instance name; the ldapi socket is `<run_dir>/slapd-<server_id>.socket`.
    pub server_id: String,
    pub dsconf: String,
    pub dsctl: String,
    pub run_dir: String,
    // Prefix for privileged invocations, e.g. ["sudo", "-n"]
    pub privilege: Vec<String>,
    pub log_file: Option<PathBuf>,
    pub tick_ms: u64,
    pub log_lines: usize,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            server_id: "localhost".into(),
            dsconf: "dsconf".into(),
            dsctl: "dsctl".into(),
            run_dir: "/var/run".into(),
            privilege: Vec::new(),
            log_file: None,
            tick_ms: 200,
            log_lines: 200,
        }
    }
}

pub fn parse_console_config(text: &str, path: &Path) -> Result<ConsoleConfig, ConfigError> {
    // An empty file is a valid, all-defaults config.
    if text.trim().is_empty() {
        return Ok(ConsoleConfig::default());
    }
    serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Explicit path wins; otherwise `ds-console.yaml` in the working directory, else defaults.
pub fn load_console_config(explicit: Option<&Path>) -> Result<ConsoleConfig, ConfigError> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            let candidate = cwd.join(DEFAULT_CONFIG_FILE);
            if !candidate.exists() {
                return Ok(ConsoleConfig::default());
            }
            candidate
        }
    };
    let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    parse_console_config(&text, &path)
}

pub fn validate_console_config(cfg: &ConsoleConfig) -> Result<(), ConfigError> {
    let id = cfg.server_id.trim();
    if id.is_empty() {
        return Err(ConfigError::Invalid("server_id must not be empty".into()));
    }
    if id.contains('/') || id.chars().any(char::is_whitespace) {
        return Err(ConfigError::Invalid(format!(
            "server_id '{id}' must not contain '/' or whitespace"
        )));
    }
    if cfg.dsconf.trim().is_empty() || cfg.dsctl.trim().is_empty() {
        return Err(ConfigError::Invalid("dsconf/dsctl must name a program".into()));
    }
    if cfg.tick_ms == 0 {
        return Err(ConfigError::Invalid("tick_ms must be positive".into()));
    }
    Ok(())
}
