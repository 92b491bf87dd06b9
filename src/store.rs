//! Content store: the filesystem root holding one directory per project.
//!
//! The store *is* the database — every catalog read is a live scan, so the
//! listing can never diverge from what is actually on disk.

use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the store root if it does not exist yet.
    pub fn ensure_root(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// Opaque identifier for a new project, stable for its lifetime.
    pub fn fresh_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    /// Path a project with this ID would occupy, whether or not it exists.
    pub fn project_dir(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    /// Path of an existing project, or `ProjectNotFound`.
    pub fn require_project(&self, id: &str) -> Result<PathBuf> {
        let dir = self.project_dir(id);
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(Error::ProjectNotFound(id.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_require_project_missing() {
        let tmp = TempDir::new().unwrap();
        let store = ContentStore::new(tmp.path());
        let err = store.require_project("nope").unwrap_err();
        assert!(matches!(err, Error::ProjectNotFound(_)));
    }

    #[test]
    fn test_require_project_present() {
        let tmp = TempDir::new().unwrap();
        let store = ContentStore::new(tmp.path());
        std::fs::create_dir(store.project_dir("p1")).unwrap();
        assert_eq!(store.require_project("p1").unwrap(), tmp.path().join("p1"));
    }

    #[test]
    fn test_fresh_ids_unique() {
        let store = ContentStore::new("/tmp/unused");
        assert_ne!(store.fresh_id(), store.fresh_id());
    }
}
