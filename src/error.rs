use std::path::PathBuf;

use crate::Hash;

/// error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid key: empty keys are not allowed")]
    InvalidKey,

    #[error("key not found")]
    KeyNotFound,

    #[error("commit not found: {0}")]
    CommitNotFound(Hash),

    #[error("object not found: {0}")]
    ObjectNotFound(Hash),

    #[error("corrupt object: {0}")]
    CorruptObject(String),

    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("branch already exists: {0}")]
    BranchExists(String),

    #[error("branch not found: {0}")]
    BranchNotFound(String),

    #[error("branch name conflicts with existing branch path: {0}")]
    BranchPathConflict(String),

    #[error("cannot delete the currently checked out branch: {0}")]
    CannotDeleteCurrent(String),

    #[error("invalid HEAD file: {0}")]
    InvalidHead(String),

    #[error("invalid hash hex: {0}")]
    InvalidHashHex(String),

    #[error("invalid chunker parameters: {0}")]
    InvalidConfig(String),

    #[error("store is locked by another process")]
    StoreLocked,

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("commit encoding error: {0}")]
    CommitEncode(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("config serialization error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// helper to wrap io errors with path context
pub trait IoResultExt<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| Error::Io {
            path: path.into(),
            source,
        })
    }
}
