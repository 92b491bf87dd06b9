//! Build orchestrator: re-syncs a project from its remote, locates its
//! jobset, and invokes the design tool once per configured output target.
//!
//! The sequence is strictly ordered with no retries. A sync failure is soft
//! (the build proceeds against the last-known-good working copy); the first
//! hard output failure aborts the remaining targets, since later targets may
//! depend on artifacts from earlier ones.

use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, warn};

use crate::catalog::{self, JOBSET_FILE};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{BuildOutcome, SyncStatus};
use crate::store::ContentStore;
use crate::vcs;

/// Run the full sync-and-build pipeline for one project.
pub async fn run_build(config: &Config, store: &ContentStore, id: &str) -> Result<BuildOutcome> {
    let root = store.require_project(id)?;

    // Sync first; a pull failure is captured, not propagated.
    let (sync_status, sync_error) = match vcs::pull(&root) {
        Ok(()) => (SyncStatus::Success, None),
        Err(e) => {
            warn!(project = id, error = %e, "sync failed, building from local state");
            (SyncStatus::Error, Some(e.to_string()))
        }
    };

    // A project without a jobset has nothing to build; that is a soft
    // success, not an error.
    let jobset = root.join(JOBSET_FILE);
    if !jobset.is_file() {
        return Ok(BuildOutcome {
            id: id.to_string(),
            message: format!("synced; no '{}' found to build", JOBSET_FILE),
            sync_status,
            sync_error,
            outputs_run: Vec::new(),
        });
    }

    // Every jobset invocation needs the project descriptor.
    let descriptor = catalog::find_project_descriptor(&root).ok_or_else(|| {
        Error::BuildFailed("no project descriptor (.kicad_pro) found".to_string())
    })?;

    ensure_tool_available(&config.build.tool).await?;

    // Run targets in declared order, aborting on the first failure.
    let mut outputs_run = Vec::new();
    for target in &config.build.outputs {
        run_output_target(config, &root, &jobset, &descriptor, target).await?;
        outputs_run.push(target.clone());
    }

    info!(project = id, outputs = outputs_run.len(), "build completed");
    Ok(BuildOutcome {
        id: id.to_string(),
        message: "sync and build completed".to_string(),
        sync_status,
        sync_error,
        outputs_run,
    })
}

/// Probe the design tool before any output is attempted, so a missing
/// binary fails fast and distinctly from a build-logic failure.
async fn ensure_tool_available(tool: &str) -> Result<()> {
    match Command::new(tool).arg("--version").output().await {
        Ok(_) => Ok(()),
        Err(e) => Err(Error::ToolUnavailable(format!(
            "'{}' not runnable on host: {}",
            tool, e
        ))),
    }
}

/// One jobset output invocation: explicit argument list, bounded wait,
/// stderr captured into the failure detail.
async fn run_output_target(
    config: &Config,
    root: &Path,
    jobset: &Path,
    descriptor: &Path,
    target: &str,
) -> Result<()> {
    info!(target, jobset = %jobset.display(), "running output target");

    let result = tokio::time::timeout(
        Duration::from_secs(config.build.timeout_secs),
        Command::new(&config.build.tool)
            .args(["jobset", "run", "--output", target, "--project"])
            .arg(descriptor)
            .arg(jobset)
            .current_dir(root)
            .output(),
    )
    .await;

    let output = match result {
        Err(_) => {
            return Err(Error::BuildFailed(format!(
                "output '{}' timed out after {}s",
                target, config.build.timeout_secs
            )));
        }
        Ok(Err(e)) => {
            return Err(Error::BuildFailed(format!(
                "output '{}': failed to execute '{}': {}",
                target, config.build.tool, e
            )));
        }
        Ok(Ok(output)) => output,
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::BuildFailed(format!(
            "output '{}' exited {}: {}",
            target,
            output.status.code().unwrap_or(-1),
            stderr.trim()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup(id: &str) -> (TempDir, ContentStore, std::path::PathBuf, Config) {
        let tmp = TempDir::new().unwrap();
        let store = ContentStore::new(tmp.path().join("projects"));
        let dir = store.project_dir(id);
        std::fs::create_dir_all(&dir).unwrap();
        let config = Config::minimal();
        (tmp, store, dir, config)
    }

    /// Fake design tool: answers the availability probe, appends every
    /// jobset invocation to a log, and exits per `exit_code`.
    #[cfg(unix)]
    fn fake_tool(dir: &std::path::Path, log: &std::path::Path, exit_code: i32) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-kicad-cli");
        let script = format!(
            "#!/bin/sh\nif [ \"$1\" = \"--version\" ]; then exit 0; fi\necho \"$@\" >> \"{}\"\nexit {}\n",
            log.display(),
            exit_code
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    fn invocation_count(log: &std::path::Path) -> usize {
        std::fs::read_to_string(log)
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn test_missing_project() {
        let (_tmp, store, _dir, config) = setup("p1");
        let err = run_build(&config, &store, "ghost").await.unwrap_err();
        assert!(matches!(err, Error::ProjectNotFound(_)));
    }

    #[tokio::test]
    async fn test_no_jobset_is_soft_success() {
        let (_tmp, store, _dir, mut config) = setup("p1");
        // Point at a tool that does not exist: it must never be probed.
        config.build.tool = "definitely-not-a-real-tool".to_string();

        let outcome = run_build(&config, &store, "p1").await.unwrap();
        assert!(outcome.message.contains("no 'Outputs.kicad_jobset'"));
        assert!(outcome.outputs_run.is_empty());
        // Not a git repo either, so the sync is a soft error.
        assert_eq!(outcome.sync_status, SyncStatus::Error);
        assert!(outcome.sync_error.is_some());
    }

    #[tokio::test]
    async fn test_missing_descriptor_fails() {
        let (_tmp, store, dir, config) = setup("p1");
        std::fs::write(dir.join(JOBSET_FILE), "jobset").unwrap();

        let err = run_build(&config, &store, "p1").await.unwrap_err();
        assert!(matches!(err, Error::BuildFailed(_)));
    }

    #[tokio::test]
    async fn test_tool_unavailable() {
        let (_tmp, store, dir, mut config) = setup("p1");
        std::fs::write(dir.join(JOBSET_FILE), "jobset").unwrap();
        std::fs::write(dir.join("board.kicad_pro"), "{}").unwrap();
        config.build.tool = "definitely-not-a-real-tool".to_string();

        let err = run_build(&config, &store, "p1").await.unwrap_err();
        assert!(matches!(err, Error::ToolUnavailable(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_first_failing_output_aborts_rest() {
        let (tmp, store, dir, mut config) = setup("p1");
        std::fs::write(dir.join(JOBSET_FILE), "jobset").unwrap();
        std::fs::write(dir.join("board.kicad_pro"), "{}").unwrap();

        let log = tmp.path().join("invocations.log");
        config.build.tool = fake_tool(tmp.path(), &log, 1);
        config.build.outputs = vec![
            "first".to_string(),
            "second".to_string(),
            "third".to_string(),
        ];

        let err = run_build(&config, &store, "p1").await.unwrap_err();
        assert!(matches!(err, Error::BuildFailed(_)));
        assert!(err.to_string().contains("first"));
        // Second and third targets were never invoked.
        assert_eq!(invocation_count(&log), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_all_outputs_run_in_declared_order() {
        let (tmp, store, dir, mut config) = setup("p1");
        std::fs::write(dir.join(JOBSET_FILE), "jobset").unwrap();
        std::fs::write(dir.join("board.kicad_pro"), "{}").unwrap();

        let log = tmp.path().join("invocations.log");
        config.build.tool = fake_tool(tmp.path(), &log, 0);
        config.build.outputs = vec!["docs".to_string(), "gerbers".to_string()];

        let outcome = run_build(&config, &store, "p1").await.unwrap();
        assert_eq!(outcome.outputs_run, vec!["docs", "gerbers"]);
        assert_eq!(outcome.message, "sync and build completed");
        assert_eq!(invocation_count(&log), 2);

        let recorded = std::fs::read_to_string(&log).unwrap();
        let lines: Vec<_> = recorded.lines().collect();
        assert!(lines[0].contains("--output docs"));
        assert!(lines[1].contains("--output gerbers"));
    }
}
