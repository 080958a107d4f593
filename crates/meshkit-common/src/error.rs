use std::io;

use thiserror::Error;

/// Error taxonomy shared by every codec and the scene store.
///
/// `Format`/`Unsupported`/`Integrity` carry a message rather than a typed
/// payload because the detail that matters (which chunk, which line, which
/// accessor) is different for every codec and isn't worth a type per case.
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("format error: {0}")]
    Format(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("resource limit exceeded")]
    Resource,

    #[error("integrity violation: {0}")]
    Integrity(String),
}

impl MeshError {
    pub fn format(msg: impl Into<String>) -> Self {
        MeshError::Format(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        MeshError::Unsupported(msg.into())
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        MeshError::Integrity(msg.into())
    }
}

pub type MeshResult<T> = Result<T, MeshError>;
