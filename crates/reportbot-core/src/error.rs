//! Error types shared by every ReportBot crate.

use std::path::PathBuf;

/// Errors raised by the report receiver.
#[derive(Debug, thiserror::Error)]
pub enum ReportBotError {
    /// Configuration could not be loaded, parsed or validated.
    #[error("Config error: {0}")]
    Config(String),

    /// A submission directory could not be listed. Transient: watchers retry.
    #[error("Failed to read directory {}: {source}", path.display())]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An artifact could not be fetched or written.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The chat transport rejected or failed a request.
    #[error("Channel error: {0}")]
    Channel(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, ReportBotError>;
