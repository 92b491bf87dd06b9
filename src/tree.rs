//! Tree materializer: turns a project directory into a navigable listing
//! and serves individual files, with traversal defense.
//!
//! The walk reflects exact on-disk contents at traversal time — no caching,
//! no mutation. Hidden entries (leading `.`) never appear.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use crate::catalog::is_hidden;
use crate::error::{Error, Result};
use crate::models::{NodeKind, TreeNode};
use crate::store::ContentStore;

/// Category holding root-level files during top-level discovery.
pub const ROOT_FILES_CATEGORY: &str = "Root Files";

/// Reserved directory excluded from top-level discovery (thumbnails and
/// renders live there and are served through the catalog instead).
const ASSETS_DIR: &str = "assets";

/// Materialize a project's tree.
///
/// With a `scope`, only that named subtree is walked and returned under its
/// own key. Without one, every immediate directory of the project root
/// becomes a category and root-level files are grouped under
/// [`ROOT_FILES_CATEGORY`]; hidden entries and the `assets` directory are
/// excluded from discovery.
pub fn get_tree(
    store: &ContentStore,
    id: &str,
    scope: Option<&str>,
) -> Result<BTreeMap<String, Vec<TreeNode>>> {
    let root = store.require_project(id)?;

    let mut categories = BTreeMap::new();

    match scope {
        Some(scope) => {
            let sub = resolve_within(&root, scope)?;
            if !sub.is_dir() {
                return Err(Error::FileNotFound(scope.to_string()));
            }
            categories.insert(scope.to_string(), walk_dir(&sub, Path::new(scope))?);
        }
        None => {
            let mut root_files = Vec::new();

            for entry in sorted_entries(&root)? {
                let name = entry.file_name().to_string_lossy().to_string();
                if is_hidden(&name) {
                    continue;
                }

                let path = entry.path();
                if path.is_dir() {
                    if name == ASSETS_DIR {
                        continue;
                    }
                    categories.insert(name.clone(), walk_dir(&path, Path::new(&name))?);
                } else {
                    root_files.push(TreeNode {
                        name: name.clone(),
                        path: name,
                        kind: NodeKind::File,
                        children: None,
                    });
                }
            }

            if !root_files.is_empty() {
                root_files.sort_by_key(|n| n.name.to_lowercase());
                categories.insert(ROOT_FILES_CATEGORY.to_string(), root_files);
            }
        }
    }

    Ok(categories)
}

/// Recursive walk of one directory. `prefix` is the path each node reports,
/// relative to the project root.
fn walk_dir(dir: &Path, prefix: &Path) -> Result<Vec<TreeNode>> {
    let mut dirs = Vec::new();
    let mut files = Vec::new();

    for entry in sorted_entries(dir)? {
        let name = entry.file_name().to_string_lossy().to_string();
        if is_hidden(&name) {
            continue;
        }

        let rel = prefix.join(&name).to_string_lossy().replace('\\', "/");
        if entry.path().is_dir() {
            dirs.push(TreeNode {
                children: Some(walk_dir(&entry.path(), &prefix.join(&name))?),
                name,
                path: rel,
                kind: NodeKind::Directory,
            });
        } else {
            files.push(TreeNode {
                name,
                path: rel,
                kind: NodeKind::File,
                children: None,
            });
        }
    }

    // Directories before files, case-insensitive within each group.
    dirs.sort_by_key(|n| n.name.to_lowercase());
    files.sort_by_key(|n| n.name.to_lowercase());
    dirs.extend(files);
    Ok(dirs)
}

fn sorted_entries(dir: &Path) -> Result<Vec<std::fs::DirEntry>> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)?.filter_map(|e| e.ok()).collect();
    entries.sort_by_key(|e| e.file_name());
    Ok(entries)
}

/// Read one file from a project, returning its bytes and media type.
///
/// Any resolution escaping the project root fails with `AccessDenied`
/// before a handle is opened; absent or non-regular files are
/// `FileNotFound`.
pub fn get_file(store: &ContentStore, id: &str, relative: &str) -> Result<(Vec<u8>, &'static str)> {
    let root = store.require_project(id)?;
    let path = resolve_within(&root, relative)?;

    if !path.is_file() {
        return Err(Error::FileNotFound(relative.to_string()));
    }

    let bytes = std::fs::read(&path)?;
    Ok((bytes, media_type_for(&path)))
}

/// Resolve an untrusted relative path against `root`, rejecting absolute
/// paths, `..` components, and symlink escapes.
pub fn resolve_within(root: &Path, relative: &str) -> Result<PathBuf> {
    let rel = Path::new(relative);

    if rel.is_absolute() {
        return Err(Error::AccessDenied(relative.to_string()));
    }
    if rel
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
    {
        return Err(Error::AccessDenied(relative.to_string()));
    }

    let joined = root.join(rel);

    // Canonicalize to collapse symlinks; a target that escapes the
    // canonical root is denied even if the lexical path looked safe.
    match joined.canonicalize() {
        Ok(resolved) => {
            let canonical_root = root.canonicalize()?;
            if resolved.starts_with(&canonical_root) {
                Ok(resolved)
            } else {
                Err(Error::AccessDenied(relative.to_string()))
            }
        }
        Err(_) => Err(Error::FileNotFound(relative.to_string())),
    }
}

/// Media type from the file extension; unknown extensions map to a generic
/// binary type.
pub fn media_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "html" | "htm" => "text/html",
        "md" => "text/markdown",
        "txt" | "log" | "gbr" | "drl" | "pos" | "net" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "zip" => "application/zip",
        "glb" => "model/gltf-binary",
        "wrl" => "model/vrml",
        "step" | "stp" => "model/step",
        // KiCad's own formats are s-expression text
        "kicad_pcb" | "kicad_sch" | "kicad_pro" | "kicad_jobset" | "kicad_mod" => "text/plain",
        _ => "application/octet-stream",
    }
}
