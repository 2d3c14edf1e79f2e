use std::path::PathBuf;

use crate::phase::Phase;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed recon document {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Discovery is disabled and nothing was persisted for the target yet.
    #[error("no recon document found for {target}; enable domain_discovery to create it first")]
    MissingDocument { target: String },

    #[error("stored document belongs to {found}, expected {expected}")]
    IdentityMismatch { expected: String, found: String },

    #[error("phase {0} is enabled but no module is configured for it")]
    MissingCollaborator(Phase),

    #[error("{phase} failed: {source:#}")]
    Phase {
        phase: Phase,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("unknown module '{0}'")]
    UnknownModule(String),
}
