// src/resolver/mod.rs

//! Recursive resolution of `-c`/`-r` directive graphs.
//!
//! A [`ResolutionSet`] owns every requirements file reachable from one
//! venv's listed sources, split into `unresolved` and `resolved`
//! containers. The loop promotes, discovers, and resolves to a fixed
//! point; a pass that makes no progress while files remain unresolved is
//! a stall (cycle or missing file) and fails with a diagnostic naming
//! every outstanding directive.

pub mod conflict;
pub mod discrepancy;

pub use conflict::{NudgeOutcome, Resolvable, ResolvedMsg, UnResolvable, choose_nudge};
pub use discrepancy::{find_version_discrepancies, qualifiers_by_pkg};

use crate::error::{Error, Result};
use crate::pins::FilePins;
use crate::reqfile::{self, FileKind};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// All requirements files of one venv, in their resolution state.
#[derive(Debug)]
pub struct ResolutionSet {
    venv: String,
    unresolved: Vec<FilePins>,
    resolved: Vec<FilePins>,
}

impl ResolutionSet {
    /// Load the venv's `.in` sources and run the resolution loop to
    /// completion. Directive targets are discovered and loaded on the way.
    pub fn load_sources(venv: &str, paths: &[PathBuf]) -> Result<Self> {
        let mut set = Self::load_flat(venv, paths)?;
        set.run_loop()?;
        Ok(set)
    }

    /// Load compiled `.lock` files as-is. Lock files carry no directives
    /// worth resolving; every container lands in `resolved` directly.
    pub fn load_exact_pins(venv: &str, paths: &[PathBuf]) -> Result<Self> {
        let mut set = Self::load_flat(venv, paths)?;
        let mut drained = std::mem::take(&mut set.unresolved);
        set.resolved.append(&mut drained);
        Ok(set)
    }

    fn load_flat(venv: &str, paths: &[PathBuf]) -> Result<Self> {
        let mut unresolved = Vec::new();
        for path in paths {
            if !path.is_file() {
                return Err(Error::MissingRequirementsFile(format!(
                    "venv {venv:?} lists {} which does not exist. Create it",
                    path.display()
                )));
            }
            unresolved.push(FilePins::load(path)?);
        }
        Ok(Self {
            venv: venv.to_string(),
            unresolved,
            resolved: Vec::new(),
        })
    }

    pub fn venv(&self) -> &str {
        &self.venv
    }

    /// Fully resolved containers. Meaningful after the loop has run.
    pub fn resolved(&self) -> &[FilePins] {
        &self.resolved
    }

    fn tracks(&self, path: &Path) -> bool {
        self.unresolved
            .iter()
            .chain(self.resolved.iter())
            .any(|c| c.file_abspath == path)
    }

    /// Move every depth-0 container into `resolved`. Monotonic; nothing
    /// ever moves back.
    fn promote(&mut self) {
        let mut idx = 0;
        while idx < self.unresolved.len() {
            if self.unresolved[idx].depth() == 0 {
                let container = self.unresolved.swap_remove(idx);
                debug!(file = %container.file_abspath.display(), "promoted");
                self.resolved.push(container);
            } else {
                idx += 1;
            }
        }
    }

    /// One promote/discover/resolve pass repeated to a fixed point.
    fn run_loop(&mut self) -> Result<()> {
        self.promote();
        while !self.unresolved.is_empty() {
            let files_before = self.unresolved.len();
            let zeroes_before = self.resolved.len();

            // discover new directive targets
            let mut pending: Vec<PathBuf> = Vec::new();
            for container in &self.unresolved {
                for target in container.directive_targets() {
                    if self.tracks(target) || pending.contains(target) {
                        continue;
                    }
                    if !target.is_file() {
                        return Err(Error::MissingRequirementsFile(format!(
                            "{} is missing support requirements file {}",
                            container.file_abspath.display(),
                            target.display()
                        )));
                    }
                    pending.push(target.clone());
                }
            }
            for target in pending {
                self.unresolved.push(FilePins::load(&target)?);
            }
            self.promote();

            // satisfy directives against the resolved set
            let resolved = &self.resolved;
            for container in &mut self.unresolved {
                let satisfied: Vec<&FilePins> = resolved
                    .iter()
                    .filter(|child| {
                        container.constraints.contains(&child.file_abspath)
                            || container.requirements.contains(&child.file_abspath)
                    })
                    .collect();
                for child in satisfied {
                    container.absorb_resolved(child);
                }
            }
            self.promote();

            let stalled = !self.unresolved.is_empty()
                && self.unresolved.len() == files_before
                && self.resolved.len() == zeroes_before;
            if stalled {
                let outstanding: Vec<String> =
                    self.unresolved.iter().map(|c| c.outstanding()).collect();
                return Err(Error::MissingRequirementsFile(format!(
                    "resolution stalled (cycle or missing file). Unresolved: {}",
                    outstanding.join("; ")
                )));
            }
        }
        debug!(venv = %self.venv, files = self.resolved.len(), "resolution complete");
        Ok(())
    }

    /// Render each non-shared source's own pins plus everything donated by
    /// its resolved children into the `.unlock` sibling. Files whose
    /// rendered contents already match on disk are left untouched.
    pub fn write_flattened(&self) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for container in &self.resolved {
            if container.role.kind != FileKind::Source || container.role.is_shared() {
                continue;
            }
            let mut lines: BTreeSet<String> = container.donated.clone();
            for pin in container.pins() {
                lines.insert(pin.line.clone());
            }
            let mut contents = lines.into_iter().collect::<Vec<_>>().join("\n");
            if !contents.is_empty() {
                contents.push('\n');
            }
            let target = reqfile::replace_last_suffix(&container.file_abspath, ".unlock");
            let unchanged = fs::read_to_string(&target)
                .map(|current| current == contents)
                .unwrap_or(false);
            if unchanged {
                debug!(file = %target.display(), "flattened file already current");
                continue;
            }
            fs::write(&target, contents)?;
            info!(file = %target.display(), "wrote flattened file");
            written.push(target);
        }
        Ok(written)
    }
}
