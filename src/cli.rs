// src/cli.rs
//! CLI definitions for reqlock.
//!
//! This module contains the command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "reqlock")]
#[command(version)]
#[command(about = "Keep per-venv .in/.unlock/.lock requirements files in sync", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve -c/-r directives and write flattened .unlock files
    Unlock {
        /// Venv key from [[tool.venvs]] (its venv_base_path)
        #[arg(short, long)]
        venv: String,

        /// Project base folder containing pyproject.toml
        #[arg(short, long)]
        path: Option<PathBuf>,
    },

    /// Detect cross-file version discrepancies and write nudge pins
    Fix {
        /// Venv key from [[tool.venvs]] (its venv_base_path)
        #[arg(short, long)]
        venv: String,

        /// Project base folder containing pyproject.toml
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Report what would change without writing anything
        #[arg(long)]
        dry_run: bool,
    },
}
