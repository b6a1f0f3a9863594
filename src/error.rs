use thiserror::Error;

/// Failures of registry operations. These are user-facing: the shell turns
/// them into red output lines, never panics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FsError {
    #[error("{0}: No such file or directory")]
    NotFound(String),
    #[error("{0}: File exists")]
    AlreadyExists(String),
    #[error("{0}: protected file")]
    Protected(String),
    #[error("{0}: Is a directory")]
    IsADirectory(String),
    #[error("{0}: Not a directory")]
    NotADirectory(String),
    #[error("{0}: invalid path")]
    InvalidPath(String),
    #[error("cannot move '{0}' into itself")]
    IntoItself(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable")]
    Unavailable,
    #[error("storage write failed for key {0}")]
    Write(String),
    #[error("malformed stored data: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("archive io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("nothing to export")]
    Empty,
}
