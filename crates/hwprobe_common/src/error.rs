//! Error types for evidence collection.
//!
//! There is exactly one failure class in hwprobe: a piece of evidence was
//! unavailable. Callers convert these into documented defaults; nothing in
//! the snapshot path escalates them.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvidenceError {
    #[error("evidence source not present: {path}")]
    Missing { path: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("evidence source is empty: {path}")]
    Empty { path: String },

    #[error("detection helper unavailable: {0}")]
    Helper(String),

    #[error("kernel interface failed: {0}")]
    Kernel(String),
}

impl EvidenceError {
    /// Build an error from an I/O failure, folding NotFound into `Missing`.
    pub fn from_io(path: &str, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            EvidenceError::Missing {
                path: path.to_string(),
            }
        } else {
            EvidenceError::Io {
                path: path.to_string(),
                source,
            }
        }
    }
}
