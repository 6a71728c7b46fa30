use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error in {path}: {message}")]
    Config { path: String, message: String },

    #[error("Git error: {0}")]
    Git(String),

    #[error("patch {patch_id} does not belong to review {review_id}")]
    PatchNotInReview { patch_id: i64, review_id: i64 },
}

impl Error {
    /// Create a Git error from any displayable source error.
    pub fn git(err: impl std::fmt::Display) -> Self {
        Self::Git(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
