use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub convert: ConvertConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Content store root: one subdirectory per project ID.
    #[serde(default = "default_store_root")]
    pub root: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: default_store_root(),
        }
    }
}

fn default_store_root() -> PathBuf {
    PathBuf::from("./data/projects")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8337".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct BuildConfig {
    /// Design tool command name, resolved on PATH. Overridable for hosts
    /// with versioned binaries (e.g. `kicad-cli-nightly`).
    #[serde(default = "default_tool")]
    pub tool: String,
    /// Jobset output targets invoked per build, in declared order.
    #[serde(default = "default_outputs")]
    pub outputs: Vec<String>,
    /// Upper bound per output-target invocation.
    #[serde(default = "default_build_timeout")]
    pub timeout_secs: u64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            tool: default_tool(),
            outputs: default_outputs(),
            timeout_secs: default_build_timeout(),
        }
    }
}

fn default_tool() -> String {
    "kicad-cli".to_string()
}

fn default_outputs() -> Vec<String> {
    vec!["documentation".to_string(), "fabrication".to_string()]
}

fn default_build_timeout() -> u64 {
    600
}

#[derive(Debug, Deserialize, Clone)]
pub struct ConvertConfig {
    /// Upper bound per 3D model conversion.
    #[serde(default = "default_convert_timeout")]
    pub timeout_secs: u64,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_convert_timeout(),
        }
    }
}

fn default_convert_timeout() -> u64 {
    60
}

impl Config {
    /// Minimal configuration with every default, for tests and tooling that
    /// run without a config file on disk.
    pub fn minimal() -> Self {
        Self {
            store: StoreConfig::default(),
            server: ServerConfig::default(),
            build: BuildConfig::default(),
            convert: ConvertConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.server.bind.is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    if config.build.tool.is_empty() {
        anyhow::bail!("build.tool must not be empty");
    }

    if config.build.timeout_secs == 0 {
        anyhow::bail!("build.timeout_secs must be > 0");
    }

    if config.convert.timeout_secs == 0 {
        anyhow::bail!("convert.timeout_secs must be > 0");
    }

    if config.build.outputs.iter().any(|o| o.trim().is_empty()) {
        anyhow::bail!("build.outputs must not contain empty target names");
    }

    Ok(config)
}
