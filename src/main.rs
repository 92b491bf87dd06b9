//! # PCB Workbench CLI (`pcbw`)
//!
//! The `pcbw` binary is the primary interface for PCB Workbench. It provides
//! commands for importing and cloning projects, listing the catalog,
//! browsing project trees, running builds, converting 3D previews, and
//! starting the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! pcbw --config ./config/pcbw.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pcbw list` | List all projects with derived metadata |
//! | `pcbw import <archive>` | Create a project from a `.zip`/`.tar`/`.tar.gz` |
//! | `pcbw link <url>` | Create a project by cloning a git remote |
//! | `pcbw sync <id>` | Pull the latest remote state into a project |
//! | `pcbw build <id>` | Sync, then run the configured jobset outputs |
//! | `pcbw tree <id>` | Print the materialized file tree |
//! | `pcbw convert <id> <path>` | Convert a board file to a 3D preview |
//! | `pcbw delete <id>` | Remove a project directory |
//! | `pcbw serve` | Start the HTTP JSON API |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use pcb_workbench::convert::ModelFormat;
use pcb_workbench::store::ContentStore;
use pcb_workbench::{build, catalog, config, convert, ingest, server, tree, vcs};

/// PCB Workbench — a local-first catalog and build server for KiCad
/// hardware projects.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/pcbw.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "pcbw",
    about = "PCB Workbench — a local-first catalog and build server for KiCad hardware projects",
    version,
    long_about = "PCB Workbench manages hardware design projects as plain directories, creates \
    them from uploaded archives or git remotes, and drives kicad-cli to regenerate build \
    artifacts and 3D previews. The filesystem is the only state."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/pcbw.toml`. Store root, server bind address,
    /// build targets, and timeouts are read from this file.
    #[arg(long, global = true, default_value = "./config/pcbw.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// List all projects in the content store.
    ///
    /// Every entry's name, thumbnail, and git state are derived from disk
    /// on the spot — the listing always matches the filesystem.
    List,

    /// Create a project from a local archive file.
    ///
    /// Recognized formats: `.zip`, `.tar`, `.tar.gz`. The archive's full
    /// contents become the new project directory.
    Import {
        /// Path to the archive file.
        archive: PathBuf,
    },

    /// Create a project by cloning a remote repository.
    Link {
        /// Repository URL (https or scp-like).
        url: String,
    },

    /// Pull the latest remote state into an existing project.
    Sync {
        /// Project ID.
        id: String,
    },

    /// Sync a project, then run its jobset output targets in order.
    ///
    /// A missing jobset is reported as a soft success; the first failing
    /// output aborts the rest.
    Build {
        /// Project ID.
        id: String,
    },

    /// Print a project's materialized file tree as JSON.
    Tree {
        /// Project ID.
        id: String,

        /// Restrict the walk to one named subdirectory.
        #[arg(long)]
        scope: Option<String>,
    },

    /// Convert a board file to a web-viewable 3D model.
    ///
    /// Serves from the per-project cache when the artifact is newer than
    /// the source; otherwise re-runs the design tool.
    Convert {
        /// Project ID.
        id: String,

        /// Board file path, relative to the project root.
        path: String,

        /// Output format: `glb` (default) or `vrml`.
        #[arg(long, default_value = "glb")]
        format: String,
    },

    /// Remove a project's entire directory subtree.
    Delete {
        /// Project ID.
        id: String,
    },

    /// Start the HTTP JSON API server.
    ///
    /// Binds to the address configured in `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    let store = ContentStore::new(cfg.store.root.clone());

    match cli.command {
        Commands::List => {
            let projects = catalog::list_projects(&store);
            println!("{:<38} {:<24} GIT  NAME", "ID", "UPDATED");
            for p in &projects {
                println!(
                    "{:<38} {:<24} {:<4} {}",
                    p.id,
                    p.updated_at,
                    if p.is_git_repo { "yes" } else { "no" },
                    p.name
                );
            }
            println!("{} project(s)", projects.len());
        }
        Commands::Import { archive } => {
            let filename = archive
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let file = File::open(&archive)?;
            let id = ingest::ingest_from_archive(&store, file, &filename)?;
            println!("imported project {}", id);
        }
        Commands::Link { url } => {
            let outcome = ingest::ingest_from_remote(&store, &url)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::Sync { id } => {
            let outcome = vcs::sync(&store, &id)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::Build { id } => {
            let outcome = build::run_build(&cfg, &store, &id).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::Tree { id, scope } => {
            let tree = tree::get_tree(&store, &id, scope.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&tree)?);
        }
        Commands::Convert { id, path, format } => {
            let format: ModelFormat = format.parse().map_err(anyhow::Error::msg)?;
            let root = store.require_project(&id)?;
            let source = tree::resolve_within(&root, &path)?;
            match convert::get_or_convert(&cfg, &root, &source, format).await {
                Some(converted) => println!("{}", converted.display()),
                None => {
                    eprintln!("no preview available for {}", path);
                    std::process::exit(1);
                }
            }
        }
        Commands::Delete { id } => {
            catalog::delete_project(&store, &id)?;
            println!("deleted project {}", id);
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
