//! Catalog service: enumerates project directories and derives display
//! metadata by inspecting their contents. Nothing is persisted — every
//! listing is a live filesystem scan, so the catalog cannot diverge from
//! disk state even when projects are mutated out-of-band.

use globset::GlobBuilder;
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::models::{Project, SyncStatus};
use crate::store::ContentStore;
use crate::vcs;

/// Fixed root-level name of the build-job descriptor.
pub const JOBSET_FILE: &str = "Outputs.kicad_jobset";

/// Project-descriptor extension used for name resolution and builds.
pub const DESCRIPTOR_EXT: &str = "kicad_pro";

/// Ordered thumbnail discovery rules, relative to the project root.
/// First rule with a match wins; matches are sorted for determinism.
const THUMBNAIL_RULES: [&str; 3] = [
    "assets/renders/thumbnail-*",
    "assets/renders/*.png",
    "assets/*.png",
];

/// List every project in the store. A missing store root yields an empty
/// list, and per-project resolution failures degrade to the next strategy
/// rather than aborting the whole listing.
pub fn list_projects(store: &ContentStore) -> Vec<Project> {
    let Ok(entries) = std::fs::read_dir(store.root()) else {
        return Vec::new();
    };

    let mut projects = Vec::new();
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let id = entry.file_name().to_string_lossy().to_string();
        projects.push(inspect_project(&id, &path));
    }

    projects.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    projects
}

fn inspect_project(id: &str, path: &Path) -> Project {
    Project {
        id: id.to_string(),
        name: resolve_name(path, id),
        path: path.display().to_string(),
        is_git_repo: vcs::is_git_repo(path),
        thumbnail_url: resolve_thumbnail(path),
        updated_at: dir_mtime_iso(path),
        sync_status: SyncStatus::Success,
    }
}

/// Ordered name resolvers, tried in sequence; first non-empty result wins.
fn resolve_name(root: &Path, id: &str) -> String {
    name_from_remote(root)
        .or_else(|| name_from_descriptor(root))
        .unwrap_or_else(|| id.to_string())
}

/// Strategy 1: last path segment of the git remote URL.
fn name_from_remote(root: &Path) -> Option<String> {
    if !vcs::is_git_repo(root) {
        return None;
    }
    vcs::remote_url(root).and_then(|url| vcs::name_from_url(&url))
}

/// Strategy 2: base name of a project-descriptor file anywhere in the tree.
fn name_from_descriptor(root: &Path) -> Option<String> {
    find_project_descriptor(root)
        .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().to_string()))
}

/// First `*.kicad_pro` in a sorted walk of the tree, skipping hidden
/// entries, so repeated scans of an unchanged project always agree.
pub fn find_project_descriptor(root: &Path) -> Option<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name().to_string_lossy().as_ref()))
        .filter_map(|e| e.ok())
        .find(|e| {
            e.file_type().is_file()
                && e.path()
                    .extension()
                    .is_some_and(|ext| ext == DESCRIPTOR_EXT)
        })
        .map(|e| e.into_path())
}

/// Apply the ordered thumbnail rules over the `assets` subtree.
fn resolve_thumbnail(root: &Path) -> Option<String> {
    let assets = root.join("assets");
    if !assets.is_dir() {
        return None;
    }

    let mut candidates: Vec<String> = WalkDir::new(&assets)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            e.path()
                .strip_prefix(root)
                .ok()
                .map(|rel| rel.to_string_lossy().replace('\\', "/"))
        })
        .collect();
    candidates.sort();

    for rule in THUMBNAIL_RULES {
        // literal_separator: `*` must not cross directory levels, so
        // `assets/*.png` matches direct children only.
        let matcher = GlobBuilder::new(rule)
            .literal_separator(true)
            .build()
            .ok()?
            .compile_matcher();

        if let Some(hit) = candidates.iter().find(|c| matcher.is_match(c.as_str())) {
            return Some(hit.clone());
        }
    }

    None
}

pub(crate) fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

fn dir_mtime_iso(path: &Path) -> String {
    let secs = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(std::time::SystemTime::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    chrono::DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| secs.to_string())
}

/// Remove a project's entire directory subtree. Best-effort, not
/// transactional: an I/O failure may leave a partial directory behind.
pub fn delete_project(store: &ContentStore, id: &str) -> Result<()> {
    let dir = store.require_project(id)?;

    std::fs::remove_dir_all(&dir).map_err(|e| Error::DeletionFailed(e.to_string()))?;
    info!(project = id, "project deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_with_project(id: &str) -> (TempDir, ContentStore, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let store = ContentStore::new(tmp.path());
        let dir = store.project_dir(id);
        std::fs::create_dir_all(&dir).unwrap();
        (tmp, store, dir)
    }

    #[test]
    fn test_missing_store_is_empty_listing() {
        let tmp = TempDir::new().unwrap();
        let store = ContentStore::new(tmp.path().join("absent"));
        assert!(list_projects(&store).is_empty());
    }

    #[test]
    fn test_name_falls_back_to_id() {
        let (_tmp, store, _dir) = store_with_project("p1");
        let projects = list_projects(&store);
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name, "p1");
        assert!(!projects[0].is_git_repo);
        assert_eq!(projects[0].sync_status, SyncStatus::Success);
    }

    #[test]
    fn test_name_from_remote_url() {
        if std::process::Command::new("git")
            .arg("--version")
            .output()
            .is_err()
        {
            return; // git not installed on this host
        }

        let (_tmp, store, dir) = store_with_project("p1");
        let git = |args: &[&str]| {
            let status = std::process::Command::new("git")
                .args(args)
                .current_dir(&dir)
                .output()
                .unwrap()
                .status;
            assert!(status.success(), "git {:?} failed", args);
        };
        git(&["init", "-q"]);
        git(&["remote", "add", "origin", "https://host/org/widget-board.git"]);

        let projects = list_projects(&store);
        assert_eq!(projects[0].name, "widget-board");
        assert!(projects[0].is_git_repo);
    }

    #[test]
    fn test_name_from_nested_descriptor() {
        let (_tmp, store, dir) = store_with_project("p1");
        std::fs::create_dir_all(dir.join("sub")).unwrap();
        std::fs::write(dir.join("sub/design.kicad_pro"), "{}").unwrap();

        let projects = list_projects(&store);
        assert_eq!(projects[0].name, "design");
    }

    #[test]
    fn test_descriptor_in_hidden_dir_ignored() {
        let (_tmp, store, dir) = store_with_project("p1");
        std::fs::create_dir_all(dir.join(".backup")).unwrap();
        std::fs::write(dir.join(".backup/old.kicad_pro"), "{}").unwrap();

        let projects = list_projects(&store);
        assert_eq!(projects[0].name, "p1");
    }

    #[test]
    fn test_thumbnail_rule_order() {
        let (_tmp, store, dir) = store_with_project("p1");
        let renders = dir.join("assets/renders");
        std::fs::create_dir_all(&renders).unwrap();

        // Only the generic assets rule matches at first.
        std::fs::write(dir.join("assets/photo.png"), b"png").unwrap();
        assert_eq!(
            list_projects(&store)[0].thumbnail_url.as_deref(),
            Some("assets/photo.png")
        );

        // A render takes priority over it.
        std::fs::write(renders.join("front.png"), b"png").unwrap();
        assert_eq!(
            list_projects(&store)[0].thumbnail_url.as_deref(),
            Some("assets/renders/front.png")
        );

        // And a designated thumbnail beats both.
        std::fs::write(renders.join("thumbnail-top.jpg"), b"jpg").unwrap();
        assert_eq!(
            list_projects(&store)[0].thumbnail_url.as_deref(),
            Some("assets/renders/thumbnail-top.jpg")
        );
    }

    #[test]
    fn test_no_assets_no_thumbnail() {
        let (_tmp, store, _dir) = store_with_project("p1");
        assert!(list_projects(&store)[0].thumbnail_url.is_none());
    }

    #[test]
    fn test_delete_project() {
        let (_tmp, store, dir) = store_with_project("p1");
        std::fs::write(dir.join("f.txt"), "x").unwrap();

        delete_project(&store, "p1").unwrap();
        assert!(!dir.exists());
        assert!(matches!(
            delete_project(&store, "p1").unwrap_err(),
            Error::ProjectNotFound(_)
        ));
    }

    #[test]
    fn test_listing_sorted_by_name() {
        let tmp = TempDir::new().unwrap();
        let store = ContentStore::new(tmp.path());
        for id in ["zz", "aa"] {
            std::fs::create_dir_all(store.project_dir(id)).unwrap();
        }
        let names: Vec<_> = list_projects(&store).into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["aa", "zz"]);
    }
}
