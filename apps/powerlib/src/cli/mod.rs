//! # Powerlib CLI Module
//!
//! This module implements the CLI interface for Powerlib.
//!
//! ## Available Commands
//!
//! - `status` - Show library and document status
//! - `list` - List collections, assets and components
//! - `collection` - Add, rename or remove collections
//! - `asset` - Add, rename or remove assets
//! - `component` - Add, remove or repoint components
//! - `groups` - List the groups in a source file
//! - `link` - Link an asset into the scene document
//! - `init` - Write an empty library file

mod commands;

use crate::config::{Config, Overrides};
use clap::{Parser, Subcommand};
use powerlib_core::{ComponentType, PowerlibError};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Powerlib - asset library manager
///
/// Browse and edit a JSON asset catalog and link assets into a scene document.
#[derive(Parser, Debug)]
#[command(name = "powerlib")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the config file [default: powerlib.toml]
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the library (catalog JSON) file
    #[arg(short = 'L', long, global = true)]
    pub library: Option<PathBuf>,

    /// Path to the scene document file
    #[arg(short = 'D', long, global = true)]
    pub document: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Command-line values that override configuration.
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        Overrides {
            config: self.config.clone(),
            library: self.library.clone(),
            document: self.document.clone(),
        }
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show library and document status
    Status,

    /// List collections, assets and components
    List {
        /// Only this collection
        collection: Option<String>,
    },

    /// Edit collections
    #[command(subcommand)]
    Collection(CollectionCommand),

    /// Edit assets
    #[command(subcommand)]
    Asset(AssetCommand),

    /// Edit components
    #[command(subcommand)]
    Component(ComponentCommand),

    /// List the groups in a source file
    Groups {
        /// Source file (absolute, library-relative or `//` document-relative)
        file: String,
    },

    /// Link an asset into the scene document
    Link {
        /// Collection name
        collection: String,

        /// Asset name
        asset: String,
    },

    /// Write an empty library file
    Init {
        /// Overwrite an existing library file
        #[arg(short, long)]
        force: bool,
    },
}

/// Collection edits.
#[derive(Subcommand, Debug)]
pub enum CollectionCommand {
    /// Add a collection
    Add { name: String },
    /// Rename a collection
    Rename { old: String, new: String },
    /// Remove a collection and its assets
    Remove { name: String },
}

/// Asset edits.
#[derive(Subcommand, Debug)]
pub enum AssetCommand {
    /// Add an asset (named NewAsset, NewAsset.001, ... when no name is given)
    Add {
        collection: String,
        name: Option<String>,
    },
    /// Rename an asset
    Rename {
        collection: String,
        old: String,
        new: String,
    },
    /// Remove an asset
    Remove { collection: String, name: String },
}

/// Component edits.
#[derive(Subcommand, Debug)]
pub enum ComponentCommand {
    /// Add a component
    Add {
        collection: String,
        asset: String,
        /// instance_groups, noninstance_groups or group_reference_objects
        #[arg(short = 't', long = "type")]
        component_type: ComponentType,
        /// Source file (absolute, library-relative or `//` document-relative)
        filepath: String,
        /// Group name inside the source file
        id: String,
    },
    /// Remove a component
    Remove {
        collection: String,
        asset: String,
        #[arg(short = 't', long = "type")]
        component_type: ComponentType,
        index: usize,
    },
    /// Point a component at another source file
    SetFile {
        collection: String,
        asset: String,
        #[arg(short = 't', long = "type")]
        component_type: ComponentType,
        index: usize,
        filepath: String,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments and resolved configuration.
pub fn execute(cli: Cli, config: &Config) -> Result<(), PowerlibError> {
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Status) | None => cmd_status(config, json_mode),
        Some(Commands::List { collection }) => cmd_list(config, json_mode, collection.as_deref()),
        Some(Commands::Collection(command)) => cmd_collection(config, json_mode, command),
        Some(Commands::Asset(command)) => cmd_asset(config, json_mode, command),
        Some(Commands::Component(command)) => cmd_component(config, json_mode, command),
        Some(Commands::Groups { file }) => cmd_groups(config, json_mode, &file),
        Some(Commands::Link { collection, asset }) => {
            cmd_link(config, json_mode, &collection, &asset)
        }
        Some(Commands::Init { force }) => cmd_init(config, json_mode, force),
    }
}
