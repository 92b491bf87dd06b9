//! 3D model cache: converts a board file to a web-viewable model via the
//! design tool, keyed by source location and invalidated by mtime.
//!
//! Everything here fails soft — callers treat `None` as "no preview
//! available", never as a fatal error. There is no negative-result caching:
//! a failed conversion is re-attempted on the next call.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::Config;

/// Web-viewable model formats the design tool can export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    Glb,
    Vrml,
}

impl ModelFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Glb => "glb",
            Self::Vrml => "wrl",
        }
    }

    /// Export subcommand understood by the design tool.
    fn subcommand(&self) -> &'static str {
        match self {
            Self::Glb => "glb",
            Self::Vrml => "vrml",
        }
    }
}

impl std::str::FromStr for ModelFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "glb" => Ok(Self::Glb),
            "vrml" | "wrl" => Ok(Self::Vrml),
            other => Err(format!("unknown model format: {}", other)),
        }
    }
}

/// Return a converted model for `source`, regenerating when the cached
/// artifact is missing or not strictly newer than the source.
pub async fn get_or_convert(
    config: &Config,
    project_root: &Path,
    source: &Path,
    format: ModelFormat,
) -> Option<PathBuf> {
    if !source.is_file() {
        return None;
    }

    let cached = cache_path(project_root, source, format)?;
    if is_fresh(&cached, source) {
        debug!(cached = %cached.display(), "model cache hit");
        return Some(cached);
    }

    if convert(config, source, &cached, format).await {
        Some(cached)
    } else {
        None
    }
}

/// Cache location derived from the source's identity (stem plus a short
/// location hash), never its content.
fn cache_path(project_root: &Path, source: &Path, format: ModelFormat) -> Option<PathBuf> {
    let stem = source.file_stem()?.to_string_lossy();
    let key = short_hash(&source.to_string_lossy());
    let dir = project_root.join(".cache").join("3d-models");
    Some(dir.join(format!("{}-{}.{}", stem, key, format.extension())))
}

/// A cached artifact is fresh only when strictly newer than its source.
fn is_fresh(cached: &Path, source: &Path) -> bool {
    let Some(cached_mtime) = mtime(cached) else {
        return false;
    };
    let Some(source_mtime) = mtime(source) else {
        return false;
    };
    cached_mtime > source_mtime
}

fn mtime(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Invoke the design tool export. True only when the process exits zero
/// within the bound *and* the declared output file exists afterwards.
async fn convert(config: &Config, source: &Path, output: &Path, format: ModelFormat) -> bool {
    if let Some(parent) = output.parent() {
        if std::fs::create_dir_all(parent).is_err() {
            return false;
        }
    }

    let result = tokio::time::timeout(
        Duration::from_secs(config.convert.timeout_secs),
        Command::new(&config.build.tool)
            .args(["pcb", "export", format.subcommand(), "--output"])
            .arg(output)
            .arg(source)
            .output(),
    )
    .await;

    match result {
        Err(_) => {
            warn!(source = %source.display(), "model conversion timed out");
            false
        }
        Ok(Err(e)) => {
            warn!(source = %source.display(), error = %e, "model conversion failed to spawn");
            false
        }
        Ok(Ok(out)) => {
            if out.status.success() && output.is_file() {
                true
            } else {
                let stderr = String::from_utf8_lossy(&out.stderr);
                warn!(
                    source = %source.display(),
                    code = out.status.code().unwrap_or(-1),
                    stderr = %stderr.trim(),
                    "model conversion failed"
                );
                false
            }
        }
    }
}

fn short_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())[..12].to_string()
}
