//! Defines the command-line arguments and subcommands for the specforge CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "specforge",
    version,
    about = "Compiles declarative test specifications into executable test files."
)]
pub struct ForgeArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compile every specification document and list the synthetic files.
    Compile {
        /// The directory containing specification documents.
        #[arg(required = true)]
        dir: PathBuf,
        /// Base directory for resolving fixture module paths.
        #[arg(long, default_value = "fixtures")]
        fixture_root: PathBuf,
    },
    /// Resolve the entity graph and list every entity.
    List {
        /// The directory containing specification documents.
        #[arg(required = true)]
        dir: PathBuf,
        /// Emit machine-readable JSON records instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Compile and print one entity's generated source text.
    Show {
        /// The directory containing specification documents.
        #[arg(required = true)]
        dir: PathBuf,
        /// Name of the entity to show.
        #[arg(required = true)]
        entity: String,
        /// Base directory for resolving fixture module paths.
        #[arg(long, default_value = "fixtures")]
        fixture_root: PathBuf,
    },
}
