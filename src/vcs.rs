//! Version-control contract: clone and pull against the external `git`
//! engine, always as an explicit argument list — never a shell string.
//!
//! Git-specific failures (nonzero exit) are distinguished from generic
//! spawn/I/O failures so diagnostics can tell "bad remote" from "git is not
//! installed".

use std::path::Path;
use std::process::Command;
use tracing::warn;

use crate::error::{Error, Result};
use crate::models::{SyncOutcome, SyncStatus};
use crate::store::ContentStore;

/// True when the directory carries version-control metadata.
pub fn is_git_repo(root: &Path) -> bool {
    root.join(".git").exists()
}

/// Clone `url` into `dest`. The destination is created by git itself.
pub fn clone(url: &str, dest: &Path) -> Result<()> {
    let output = Command::new("git")
        .args(["clone", "--", url])
        .arg(dest)
        .output()
        .map_err(|e| Error::CloneFailed(format!("failed to execute 'git clone': {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::CloneFailed(stderr.trim().to_string()));
    }

    Ok(())
}

/// Pull the configured remote into an existing working copy.
pub fn pull(root: &Path) -> Result<()> {
    let output = Command::new("git")
        .args(["pull", "--ff-only"])
        .current_dir(root)
        .output()
        .map_err(|e| Error::SyncFailed(format!("failed to execute 'git pull': {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::SyncFailed(stderr.trim().to_string()));
    }

    Ok(())
}

/// Sync an existing project from its remote.
///
/// A missing project is a hard `ProjectNotFound`; a pull failure is captured
/// as a soft `sync_status: error` so callers (notably the build pipeline)
/// can proceed against the last-known-good local state.
pub fn sync(store: &ContentStore, id: &str) -> Result<SyncOutcome> {
    let root = store.require_project(id)?;

    match pull(&root) {
        Ok(()) => Ok(SyncOutcome {
            id: id.to_string(),
            sync_status: SyncStatus::Success,
            error_message: None,
        }),
        Err(e) => {
            warn!(project = id, error = %e, "sync failed");
            Ok(SyncOutcome {
                id: id.to_string(),
                sync_status: SyncStatus::Error,
                error_message: Some(e.to_string()),
            })
        }
    }
}

/// Remote URL of the `origin` remote, or `None` when the repository has no
/// usable remote configuration. Failures degrade to `None` so a single
/// unreadable project cannot abort a catalog listing.
pub fn remote_url(root: &Path) -> Option<String> {
    let output = Command::new("git")
        .args(["config", "--get", "remote.origin.url"])
        .current_dir(root)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if url.is_empty() {
        None
    } else {
        Some(url)
    }
}

/// Last non-empty path segment of a repository URL with any trailing `.git`
/// stripped. Handles both `https://host/org/repo.git` and scp-like
/// `git@host:org/repo.git` forms.
pub fn name_from_url(url: &str) -> Option<String> {
    let trimmed = url.trim().trim_end_matches('/');
    let segment = trimmed
        .rsplit('/')
        .next()
        .and_then(|s| s.rsplit(':').next())?;

    let name = segment.strip_suffix(".git").unwrap_or(segment);
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_from_https_url() {
        assert_eq!(
            name_from_url("https://host/org/widget-board.git"),
            Some("widget-board".to_string())
        );
    }

    #[test]
    fn test_name_from_url_trailing_slash() {
        assert_eq!(
            name_from_url("https://host/org/widget-board/"),
            Some("widget-board".to_string())
        );
    }

    #[test]
    fn test_name_from_scp_like_url() {
        assert_eq!(
            name_from_url("git@github.com:org/widget-board.git"),
            Some("widget-board".to_string())
        );
        assert_eq!(
            name_from_url("git@host:widget-board.git"),
            Some("widget-board".to_string())
        );
    }

    #[test]
    fn test_name_from_url_unresolvable() {
        assert_eq!(name_from_url(""), None);
        assert_eq!(name_from_url("///"), None);
        assert_eq!(name_from_url(".git"), None);
    }

    #[test]
    fn test_is_git_repo() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(!is_git_repo(tmp.path()));
        std::fs::create_dir(tmp.path().join(".git")).unwrap();
        assert!(is_git_repo(tmp.path()));
    }
}
