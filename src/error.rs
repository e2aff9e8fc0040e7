use std::path::PathBuf;
use thiserror::Error;

/// Failure of one `dsconf`/`dsctl` invocation.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Empty command line")]
    Empty,

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Non-zero exit; `desc` is the tool's own error text.
    #[error("{desc}")]
    Failed { desc: String },

    #[error("Unreadable output from {program}: {source}")]
    Parse {
        program: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CommandError {
    /// Text shown to the user in notifications.
    pub fn desc(&self) -> String {
        match self {
            CommandError::Failed { desc } => desc.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("reading config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}
