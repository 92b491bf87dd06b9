//! Core data models used throughout PCB Workbench.
//!
//! These types represent the catalog entries, file-tree nodes, and operation
//! outcomes that flow between the service layer, the CLI, and the HTTP API.
//! Everything here is derived from disk state on read — nothing is persisted.

use serde::Serialize;

/// One managed hardware project, as reported by the catalog.
///
/// Only `id` is stable; every other field is recomputed from the project
/// directory on each listing.
#[derive(Debug, Clone, Serialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub path: String,
    pub is_git_repo: bool,
    pub thumbnail_url: Option<String>,
    /// Directory mtime, ISO-8601.
    pub updated_at: String,
    pub sync_status: SyncStatus,
}

/// Outcome of the most recent sync attempt. Transient — not persisted
/// across process restarts, so a fresh listing reports `Success`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Success,
    Error,
}

/// One filesystem entry in a materialized project tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    pub name: String,
    /// Relative to the root the materializer was asked to walk.
    pub path: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Present for directories, absent for files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Directory,
}

/// Result payload of `ingest_from_remote`.
#[derive(Debug, Clone, Serialize)]
pub struct CloneOutcome {
    pub id: String,
    pub name: String,
    pub repository_url: String,
    pub sync_status: SyncStatus,
}

/// Result payload of a sync. A pull failure lands in `error_message`
/// instead of aborting the caller.
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub id: String,
    pub sync_status: SyncStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Result payload of a build. `sync_status` reflects the pull that ran
/// first; `outputs_run` lists the targets that completed, in order.
#[derive(Debug, Clone, Serialize)]
pub struct BuildOutcome {
    pub id: String,
    pub message: String,
    pub sync_status: SyncStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_error: Option<String>,
    pub outputs_run: Vec<String>,
}
