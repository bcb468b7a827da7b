use std::io;

use thiserror::Error;

use crate::handle::StreamKind;

#[derive(Debug, Error)]
pub enum VfsError {
    #[error("file not found: {name}")]
    NotFound { name: String },

    #[error("file already open: {name}")]
    AlreadyOpen { name: String },

    #[error("failed to attach stream for {name}: {source}")]
    OpenFailed {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("conflicting mode on {name}: stream is {state}")]
    ConflictingMode { name: String, state: StreamKind },

    #[error("invalid file name: {0:?}")]
    InvalidName(String),

    #[error("handle for {name} was not issued by this vfs")]
    ForeignHandle { name: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, VfsError>;
