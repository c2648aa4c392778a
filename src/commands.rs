// src/commands.rs
//! Command handlers for the reqlock CLI

use anyhow::Result;
use reqlock::resolver::ResolutionSet;
use reqlock::{Fixer, VenvMapLoader};
use std::path::PathBuf;
use tracing::info;

fn project_base(path: Option<PathBuf>) -> Result<PathBuf> {
    match path {
        Some(p) => Ok(p),
        None => Ok(std::env::current_dir()?),
    }
}

/// Resolve a venv's `.in` graph and render the `.unlock` files.
pub fn unlock(venv: &str, path: Option<PathBuf>) -> Result<()> {
    let base = project_base(path)?;
    let loader = VenvMapLoader::load(&base)?;
    let in_paths = loader.reqs_abspaths(venv, ".in")?;
    info!("Resolving {} source file(s) for venv {}", in_paths.len(), venv);

    let resolution = ResolutionSet::load_sources(venv, &in_paths)?;
    let written = resolution.write_flattened()?;
    if written.is_empty() {
        println!("All .unlock files already current");
    } else {
        for target in &written {
            println!("Wrote {}", target.display());
        }
    }
    Ok(())
}

/// Detect discrepancies for a venv and apply (or preview) nudge pins.
pub fn fix(venv: &str, path: Option<PathBuf>, dry_run: bool) -> Result<()> {
    let base = project_base(path)?;
    let loader = VenvMapLoader::load(&base)?;
    let fixer = Fixer::new(&loader, venv)?;
    let outcome = fixer.fix(dry_run)?;

    if outcome.fixed.is_empty() && outcome.unresolvable.is_empty() && outcome.shared.is_empty() {
        println!("No version discrepancies found");
        return Ok(());
    }

    if !outcome.fixed.is_empty() {
        let verb = if dry_run { "Would fix" } else { "Fixed" };
        println!("{verb}:");
        for msg in &outcome.fixed {
            println!("  {msg}");
        }
    }

    if !outcome.shared.is_empty() {
        println!("Shared files need manual review (not modified):");
        for notice in &outcome.shared {
            println!(
                "  {} in {} -> suggested {}",
                notice.pin.line,
                notice.pin.file_abspath.display(),
                notice.resolvable.nudge_lock,
            );
        }
    }

    if !outcome.unresolvable.is_empty() {
        println!("Unresolvable conflicts:");
        for unresolvable in &outcome.unresolvable {
            print!("{unresolvable}");
        }
    }
    Ok(())
}
