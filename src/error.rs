//! Error types for the CLI

/// CLI Result type
pub type Result<T> = std::result::Result<T, Error>;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Batch(#[from] batchlaunch_common::Error),

    #[error("{failed} of {total} job(s) failed")]
    JobsFailed { failed: usize, total: usize },
}
