use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to read config {}: {source}", path.display())]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {}: {source}", path.display())]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("backend command is empty")]
    EmptyBackendCommand,
    #[error("failed to start backend `{program}`: {source}")]
    SpawnBackend {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("backend process has no {0} pipe")]
    MissingPipe(&'static str),
    #[error("unknown log level {0:?}")]
    InvalidLogLevel(String),
    #[error("a logger is already installed")]
    LoggerInstalled,
    #[error("could not encode ui event: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("ui stream failed: {0}")]
    Io(#[from] io::Error),
}
