//! # PCB Workbench
//!
//! A local-first catalog and build server for KiCad hardware projects.
//!
//! PCB Workbench manages a directory of hardware design projects, each
//! created from an uploaded archive or a cloned git remote, and drives
//! `kicad-cli` to regenerate build artifacts (documents, fabrication files,
//! 3D previews) from project sources. There is no database: the content
//! store on disk is the only state, and every catalog read is a live scan.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌─────────────┐
//! │  Ingestion   │──▶│ Content Store │◀──│    Build     │
//! │ archive/git  │   │ one dir per  │   │ kicad-cli   │
//! └──────────────┘   │  project ID  │   └─────────────┘
//!                    └──────┬───────┘
//!                           │ live scan
//!                 ┌─────────┴─────────┐
//!                 ▼                   ▼
//!            ┌──────────┐       ┌──────────┐
//!            │   CLI    │       │   HTTP   │
//!            │  (pcbw)  │       │  (axum)  │
//!            └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! pcbw import ./widget-board.zip       # create a project from an archive
//! pcbw link https://host/org/board.git # or clone one
//! pcbw list                            # catalog with derived metadata
//! pcbw build <id>                      # sync + run jobset outputs
//! pcbw serve                           # start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Catalog, tree, and outcome types |
//! | [`store`] | Content store root and project paths |
//! | [`ingest`] | Archive extraction and remote cloning |
//! | [`vcs`] | Git clone/pull/remote contract |
//! | [`catalog`] | Project listing, name/thumbnail resolution, deletion |
//! | [`tree`] | File-tree materialization and file serving |
//! | [`build`] | Sync-and-build orchestration |
//! | [`convert`] | Cached 3D model conversion |
//! | [`server`] | HTTP JSON API |

pub mod build;
pub mod catalog;
pub mod config;
pub mod convert;
pub mod error;
pub mod ingest;
pub mod models;
pub mod server;
pub mod store;
pub mod tree;
pub mod vcs;
