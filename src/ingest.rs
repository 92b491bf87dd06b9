//! Ingestion service: creates project directories from uploaded archives or
//! remote repositories.
//!
//! Both paths roll back partial filesystem state before surfacing an error —
//! a failed ingestion leaves neither a half-extracted project directory nor a
//! temporary spool file behind.

use std::fs::File;
use std::io::Read;
use std::path::{Component, Path};
use tracing::{info, warn};

use crate::catalog;
use crate::error::{Error, Result};
use crate::models::{CloneOutcome, SyncStatus};
use crate::store::ContentStore;
use crate::vcs;

/// Archive container formats recognized by `ingest_from_archive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
}

impl ArchiveFormat {
    /// Detect the format from the uploaded filename, case-insensitively.
    pub fn from_filename(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else if lower.ends_with(".tar.gz") {
            Some(Self::TarGz)
        } else if lower.ends_with(".tar") {
            Some(Self::Tar)
        } else {
            None
        }
    }
}

/// Extract an uploaded archive stream into a fresh project directory.
///
/// Returns the new project ID. On any extraction failure the partial project
/// directory is removed and the temp spool file deleted before the error
/// surfaces; on success the project is immediately visible to the catalog.
pub fn ingest_from_archive<R: Read>(
    store: &ContentStore,
    mut upload: R,
    original_filename: &str,
) -> Result<String> {
    let format = ArchiveFormat::from_filename(original_filename)
        .ok_or_else(|| Error::UnsupportedFormat(original_filename.to_string()))?;

    store.ensure_root()?;

    // Spool the stream to disk next to the store so extraction reads a
    // seekable file. NamedTempFile deletes itself on drop, which covers
    // every early-return below.
    let mut spool = tempfile::NamedTempFile::new_in(store.root())?;
    std::io::copy(&mut upload, spool.as_file_mut())?;

    let id = store.fresh_id();
    let project_dir = store.project_dir(&id);
    std::fs::create_dir_all(&project_dir)?;

    if let Err(e) = extract_archive(format, spool.path(), &project_dir) {
        let _ = std::fs::remove_dir_all(&project_dir);
        return Err(Error::IngestionFailed(e.to_string()));
    }

    info!(project = %id, file = original_filename, "archive ingested");
    Ok(id)
}

/// Clone a remote repository into a fresh project directory.
///
/// Name resolution at clone time: URL segment → project descriptor base name
/// → the ID itself. A clone failure removes the partial directory.
pub fn ingest_from_remote(store: &ContentStore, url: &str) -> Result<CloneOutcome> {
    validate_url(url)?;
    store.ensure_root()?;

    let id = store.fresh_id();
    let project_dir = store.project_dir(&id);

    if let Err(e) = vcs::clone(url, &project_dir) {
        let _ = std::fs::remove_dir_all(&project_dir);
        return Err(e);
    }

    let name = vcs::name_from_url(url)
        .or_else(|| {
            catalog::find_project_descriptor(&project_dir)
                .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().to_string()))
        })
        .unwrap_or_else(|| id.clone());

    info!(project = %id, name = %name, url, "repository cloned");
    Ok(CloneOutcome {
        id,
        name,
        repository_url: url.to_string(),
        sync_status: SyncStatus::Success,
    })
}

fn validate_url(url: &str) -> Result<()> {
    let trimmed = url.trim();
    if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
        return Err(Error::InvalidUrl(url.to_string()));
    }
    // A usable remote has either a scheme/scp separator or a path.
    if !trimmed.contains(':') && !trimmed.contains('/') {
        return Err(Error::InvalidUrl(url.to_string()));
    }
    Ok(())
}

fn extract_archive(format: ArchiveFormat, archive: &Path, dest: &Path) -> anyhow::Result<()> {
    match format {
        ArchiveFormat::Zip => extract_zip(archive, dest),
        ArchiveFormat::Tar => extract_tar(File::open(archive)?, dest),
        ArchiveFormat::TarGz => {
            extract_tar(flate2::read::GzDecoder::new(File::open(archive)?), dest)
        }
    }
}

fn extract_zip(archive_path: &Path, dest: &Path) -> anyhow::Result<()> {
    let file = File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;

        // Untrusted input: enclosed_name() is None for absolute paths and
        // traversal attempts.
        let Some(rel) = entry.enclosed_name() else {
            warn!(entry = entry.name(), "rejected unsafe path in archive");
            continue;
        };

        let out_path = dest.join(&rel);
        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)?;
        } else {
            if let Some(parent) = out_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&out_path)?;
            std::io::copy(&mut entry, &mut out)?;
        }
    }

    Ok(())
}

fn extract_tar<R: Read>(reader: R, dest: &Path) -> anyhow::Result<()> {
    let mut archive = tar::Archive::new(reader);

    for entry in archive.entries()? {
        let mut entry = entry?;
        let entry_path = entry.path()?.into_owned();

        if entry_path.is_absolute()
            || entry_path
                .components()
                .any(|c| matches!(c, Component::ParentDir))
        {
            warn!(path = %entry_path.display(), "rejected unsafe path in archive");
            continue;
        }

        let out_path = dest.join(&entry_path);
        if entry.header().entry_type().is_dir() {
            std::fs::create_dir_all(&out_path)?;
        } else {
            if let Some(parent) = out_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            entry.unpack(&out_path)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::TempDir;

    fn store() -> (TempDir, ContentStore) {
        let tmp = TempDir::new().unwrap();
        let store = ContentStore::new(tmp.path().join("projects"));
        (tmp, store)
    }

    fn sample_zip() -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file("board.kicad_pro", options).unwrap();
            writer.write_all(b"{}").unwrap();
            writer.add_directory("docs", options).unwrap();
            writer.start_file("docs/readme.md", options).unwrap();
            writer.write_all(b"# board\n").unwrap();
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    fn sample_tar_gz() -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        let data = b"# notes\n";
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "notes.md", data.as_slice())
            .unwrap();
        let tar_bytes = builder.into_inner().unwrap();

        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&tar_bytes).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(
            ArchiveFormat::from_filename("Board.ZIP"),
            Some(ArchiveFormat::Zip)
        );
        assert_eq!(
            ArchiveFormat::from_filename("a.tar.gz"),
            Some(ArchiveFormat::TarGz)
        );
        assert_eq!(
            ArchiveFormat::from_filename("a.tar"),
            Some(ArchiveFormat::Tar)
        );
        assert_eq!(ArchiveFormat::from_filename("a.rar"), None);
        assert_eq!(ArchiveFormat::from_filename("a.gz"), None);
    }

    #[test]
    fn test_ingest_zip_round_trip() {
        let (_tmp, store) = store();
        let id = ingest_from_archive(&store, Cursor::new(sample_zip()), "board.zip").unwrap();

        let dir = store.require_project(&id).unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.join("board.kicad_pro")).unwrap(),
            "{}"
        );
        assert_eq!(
            std::fs::read_to_string(dir.join("docs/readme.md")).unwrap(),
            "# board\n"
        );
    }

    #[test]
    fn test_ingest_tar_gz() {
        let (_tmp, store) = store();
        let id = ingest_from_archive(&store, Cursor::new(sample_tar_gz()), "b.tar.gz").unwrap();
        let dir = store.require_project(&id).unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.join("notes.md")).unwrap(),
            "# notes\n"
        );
    }

    #[test]
    fn test_unsupported_extension_leaves_no_residue() {
        let (_tmp, store) = store();
        let err = ingest_from_archive(&store, Cursor::new(vec![1, 2, 3]), "board.rar").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
        // Store root was never created, so nothing can have leaked.
        assert!(!store.root().exists());
    }

    #[test]
    fn test_corrupt_archive_rolls_back() {
        let (_tmp, store) = store();
        let err =
            ingest_from_archive(&store, Cursor::new(b"not a zip".to_vec()), "bad.zip").unwrap_err();
        assert!(matches!(err, Error::IngestionFailed(_)));

        // No project directory and no temp spool file remain.
        let residue: Vec<_> = std::fs::read_dir(store.root())
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        assert!(residue.is_empty(), "residue left behind: {:?}", residue);
    }

    #[test]
    fn test_traversal_entries_skipped() {
        let (_tmp, store) = store();

        // Hand-built zip whose entry path points above the extraction root.
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file("../escape.txt", options).unwrap();
            writer.write_all(b"evil").unwrap();
            writer.start_file("safe.txt", options).unwrap();
            writer.write_all(b"ok").unwrap();
            writer.finish().unwrap();
        }

        let id = ingest_from_archive(&store, Cursor::new(cursor.into_inner()), "evil.zip").unwrap();
        let dir = store.require_project(&id).unwrap();
        assert!(!store.root().join("escape.txt").exists());
        assert_eq!(std::fs::read_to_string(dir.join("safe.txt")).unwrap(), "ok");
        assert!(!dir.join("escape.txt").exists());
    }

    #[test]
    fn test_invalid_url_rejected() {
        let (_tmp, store) = store();
        assert!(matches!(
            ingest_from_remote(&store, "").unwrap_err(),
            Error::InvalidUrl(_)
        ));
        assert!(matches!(
            ingest_from_remote(&store, "not a url").unwrap_err(),
            Error::InvalidUrl(_)
        ));
        assert!(matches!(
            ingest_from_remote(&store, "plainword").unwrap_err(),
            Error::InvalidUrl(_)
        ));
    }
}
