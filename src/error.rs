//! Error taxonomy shared by the service layer, the CLI, and the HTTP API.
//!
//! Soft failures (a pull that fails during a build, a 3D conversion that
//! produces no preview) are *not* errors — they are reported inside result
//! payloads so downstream steps can keep going.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Project directory absent from the content store.
    #[error("project not found: {0}")]
    ProjectNotFound(String),

    /// Requested path is absent or not a regular file.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// Uploaded archive carries an extension outside the recognized set.
    #[error("unsupported archive format: {0}")]
    UnsupportedFormat(String),

    /// Repository URL is empty or shapeless.
    #[error("invalid repository url: {0}")]
    InvalidUrl(String),

    /// Path resolution escaped the project root.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Archive extraction failed; partial state has been rolled back.
    #[error("ingestion failed: {0}")]
    IngestionFailed(String),

    /// `git clone` failed; partial state has been rolled back.
    #[error("clone failed: {0}")]
    CloneFailed(String),

    /// `git pull` failed. Callers that run a build capture this as a soft
    /// `sync_status: error` instead of propagating it.
    #[error("sync failed: {0}")]
    SyncFailed(String),

    /// Best-effort directory removal failed; state may be partial.
    #[error("deletion failed: {0}")]
    DeletionFailed(String),

    /// The design tool binary could not be spawned at all.
    #[error("design tool unavailable: {0}")]
    ToolUnavailable(String),

    /// A build output target exited nonzero, timed out, or a precondition
    /// (missing project descriptor) failed. Carries the first failure only.
    #[error("build failed: {0}")]
    BuildFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
