// src/fixer/mod.rs

//! Applies chosen nudge pins to `.lock` and `.unlock` files.
//!
//! The fixer never edits `.in` sources and never edits shared files; a
//! shared file's conflict goes into a manual-review bucket instead,
//! because a nudge computed from one venv's constraints is not guaranteed
//! correct for a sibling venv. Dry-run performs the identical matching and
//! produces the identical report, writing nothing.

use crate::error::Result;
use crate::pins::{self, Pin};
use crate::reqfile::{self, FileKind, ParsedLine};
use crate::resolver::{
    NudgeOutcome, Resolvable, ResolutionSet, ResolvedMsg, UnResolvable, choose_nudge,
    find_version_discrepancies, qualifiers_by_pkg,
};
use crate::venvs::VenvMapLoader;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// A conflict that touches a shared file, set aside for a human.
#[derive(Debug, Clone)]
pub struct SharedNotice {
    pub venv: String,
    /// Which file rendering the notice was raised on. Always the exact-pin
    /// pass; one notice stands in for the `.unlock` sibling too.
    pub kind: FileKind,
    pub resolvable: Resolvable,
    /// The conflicting pin inside the shared file.
    pub pin: Pin,
}

/// Everything one fix pass produced.
#[derive(Debug, Default)]
pub struct FixOutcome {
    pub fixed: Vec<ResolvedMsg>,
    pub unresolvable: Vec<UnResolvable>,
    pub shared: Vec<SharedNotice>,
}

/// Loads a venv's `.in` and `.lock` sets once and repairs discrepancies.
#[derive(Debug)]
pub struct Fixer {
    venv: String,
    ins: ResolutionSet,
    locks: ResolutionSet,
}

impl Fixer {
    pub fn new(loader: &VenvMapLoader, venv: &str) -> Result<Self> {
        let in_paths = loader.reqs_abspaths(venv, ".in")?;
        let lock_paths = loader.reqs_abspaths(venv, ".lock")?;
        Ok(Self {
            venv: venv.to_string(),
            ins: ResolutionSet::load_sources(venv, &in_paths)?,
            locks: ResolutionSet::load_exact_pins(venv, &lock_paths)?,
        })
    }

    /// Detect discrepancies, choose nudges, apply them. `dry_run` skips
    /// every write while producing the same outcome report.
    pub fn fix(&self, dry_run: bool) -> Result<FixOutcome> {
        let (resolvables, unresolvable) = self.issues()?;
        let (fixed, shared) = self.apply(&resolvables, dry_run)?;
        Ok(FixOutcome {
            fixed,
            unresolvable,
            shared,
        })
    }

    /// Classify each flagged package as resolvable or unresolvable.
    fn issues(&self) -> Result<(Vec<Resolvable>, Vec<UnResolvable>)> {
        let notable = pins::group_notable(self.ins.resolved());
        let all_in = pins::group_all(self.ins.resolved());
        let all_lock = pins::group_all(self.locks.resolved());

        let spreads = find_version_discrepancies(&all_lock);
        let quals_in = qualifiers_by_pkg(&notable);
        let quals_lock = qualifiers_by_pkg(&all_lock);

        let mut resolvables = Vec::new();
        let mut unresolvables = Vec::new();
        for (pkg_name, spread) in &spreads {
            if !notable.contains_key(pkg_name) {
                // the package only exists in lock files; pin it at the
                // highest version seen, nothing flattened to update
                let qualifiers = quals_lock.get(pkg_name).cloned().unwrap_or_default();
                resolvables.push(Resolvable {
                    venv: self.venv.clone(),
                    pkg_name: pkg_name.clone(),
                    qualifiers,
                    nudge_unlock: None,
                    nudge_lock: format!("{pkg_name}=={}", spread.highest),
                });
                continue;
            }

            let in_pins = all_in.get(pkg_name).cloned().unwrap_or_default();
            let qualifiers = quals_in.get(pkg_name).cloned().unwrap_or_default();
            match choose_nudge(pkg_name, &in_pins, &spread.highest, &spread.others)? {
                NudgeOutcome::Chosen { op, version } => resolvables.push(Resolvable {
                    venv: self.venv.clone(),
                    pkg_name: pkg_name.clone(),
                    qualifiers,
                    nudge_unlock: Some(format!("{pkg_name}{op}{version}")),
                    nudge_lock: format!("{pkg_name}=={version}"),
                }),
                NudgeOutcome::Unresolvable { specifier_sets } => {
                    unresolvables.push(UnResolvable {
                        venv: self.venv.clone(),
                        pkg_name: pkg_name.clone(),
                        qualifiers,
                        specifier_sets,
                        highest: spread.highest.clone(),
                        others: spread.others.clone(),
                        pins: in_pins,
                    });
                }
            }
        }
        info!(
            venv = %self.venv,
            resolvable = resolvables.len(),
            unresolvable = unresolvables.len(),
            "issues collected"
        );
        Ok((resolvables, unresolvables))
    }

    /// Walk every lock pin, fixing the `.lock` file and its `.unlock`
    /// sibling for each matching resolvable. Shared files get one notice
    /// on the lock pass and are never written.
    fn apply(
        &self,
        resolvables: &[Resolvable],
        dry_run: bool,
    ) -> Result<(Vec<ResolvedMsg>, Vec<SharedNotice>)> {
        let mut fixed = Vec::new();
        let mut shared = Vec::new();
        for container in self.locks.resolved() {
            for pin in container.pins() {
                for resolvable in resolvables {
                    if pin.pkg_name != resolvable.pkg_name {
                        continue;
                    }
                    for kind in [FileKind::ExactPin, FileKind::Flattened] {
                        if container.role.is_shared() {
                            if kind == FileKind::ExactPin {
                                shared.push(SharedNotice {
                                    venv: self.venv.clone(),
                                    kind,
                                    resolvable: resolvable.clone(),
                                    pin: pin.clone(),
                                });
                            }
                            continue;
                        }
                        let (path, nudge) = match kind {
                            FileKind::ExactPin => {
                                (pin.file_abspath.clone(), resolvable.nudge_lock.as_str())
                            }
                            FileKind::Flattened => {
                                let sibling = reqfile::replace_last_suffix(
                                    &pin.file_abspath,
                                    ".unlock",
                                );
                                match resolvable.nudge_unlock.as_deref() {
                                    Some(nudge) => (sibling, nudge),
                                    None => continue,
                                }
                            }
                            FileKind::Source => continue,
                        };
                        if kind == FileKind::Flattened && !path.is_file() {
                            debug!(file = %path.display(), "no flattened sibling; skipped");
                            continue;
                        }
                        let line = format!("{nudge}{}", resolvable.qualifiers);
                        substitute_nudge_pin(&path, &resolvable.pkg_name, &line, dry_run)?;
                        fixed.push(ResolvedMsg {
                            venv: self.venv.clone(),
                            file_abspath: path,
                            line,
                        });
                    }
                }
            }
        }
        Ok((fixed, shared))
    }
}

/// Replace every line naming `pkg_name` with the nudge line, or append it
/// when the package is absent. Matching is exact on the package token, so
/// `tox` never touches `tox-gh-actions`. All other lines are preserved
/// byte for byte. Returns whether the file changed (would change, under
/// `dry_run`).
pub fn substitute_nudge_pin(
    path: &Path,
    pkg_name: &str,
    nudge_line: &str,
    dry_run: bool,
) -> Result<bool> {
    let contents = fs::read_to_string(path)?;
    let mut out: Vec<&str> = Vec::new();
    let mut found = false;
    for line in contents.lines() {
        let names_pkg = matches!(
            reqfile::parse_line(line),
            Some(ParsedLine::Package(ref p)) if p.name == pkg_name
        );
        if names_pkg {
            out.push(nudge_line);
            found = true;
        } else {
            out.push(line);
        }
    }
    if !found {
        out.push(nudge_line);
    }
    let mut updated = out.join("\n");
    updated.push('\n');

    if updated == contents {
        return Ok(false);
    }
    if dry_run {
        debug!(file = %path.display(), pkg = pkg_name, "dry run; write skipped");
    } else {
        fs::write(path, updated)?;
        info!(file = %path.display(), pkg = pkg_name, line = nudge_line, "nudge pin written");
    }
    Ok(true)
}
