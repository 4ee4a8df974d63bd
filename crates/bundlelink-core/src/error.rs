use std::path::PathBuf;
use thiserror::Error;

/// Core error type for bundlelink operations that fall outside the
/// linker's own diagnostic log (spec §7 distinguishes linker diagnostics,
/// which are data the pipeline accumulates, from a hard failure of the
/// pipeline's surrounding machinery, which still uses `Result`).
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read \"{path}\": {source}")]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write \"{path}\": {source}")]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize metafile: {0}")]
    Metafile(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    #[must_use]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
