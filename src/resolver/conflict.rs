// src/resolver/conflict.rs

//! Nudge-pin selection and the result records it produces.
//!
//! Given every version observed for a package across a venv's lock files
//! and every specifier collected from its `.in`-derived pins,
//! [`choose_nudge`] picks the single replacement version (and the operator
//! to write into flattened files) or declares the conflict unresolvable.

use crate::error::{Error, Result};
use crate::pins::Pin;
use crate::version::{CompareOp, PkgVersion, Specifier, SpecifierSet};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

/// A conflict the engine can repair: both replacement lines, ready to
/// substitute into the affected files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolvable {
    pub venv: String,
    pub pkg_name: String,
    /// Qualifier suffix carried onto both nudge lines; empty or `"; ..."`.
    pub qualifiers: String,
    /// Replacement for `.unlock` files, e.g. `pip>=24.2`. Absent for
    /// pure-lock discrepancies, which have no flattened counterpart.
    pub nudge_unlock: Option<String>,
    /// Replacement for `.lock` files, always `pkg==version`.
    pub nudge_lock: String,
}

/// A conflict the engine refuses to repair. Carries everything needed to
/// diagnose it without re-running the pipeline.
#[derive(Debug, Clone)]
pub struct UnResolvable {
    pub venv: String,
    pub pkg_name: String,
    pub qualifiers: String,
    /// Version restrictions collected from the `.in`-derived pins.
    pub specifier_sets: Vec<SpecifierSet>,
    pub highest: PkgVersion,
    pub others: BTreeSet<PkgVersion>,
    /// The originating pins, with their files.
    pub pins: Vec<Pin>,
}

impl fmt::Display for UnResolvable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Unresolvable conflict for package {} (venv {})",
            self.pkg_name, self.venv
        )?;
        let restrictions: Vec<String> =
            self.specifier_sets.iter().map(|ss| ss.to_string()).collect();
        writeln!(f, "  restrictions: [{}]", restrictions.join(", "))?;
        let others: Vec<String> = self.others.iter().map(|v| v.to_string()).collect();
        writeln!(
            f,
            "  versions seen: highest {} others [{}]",
            self.highest,
            others.join(", ")
        )?;
        for pin in &self.pins {
            writeln!(f, "  {}: {}", pin.file_abspath.display(), pin.line)?;
        }
        Ok(())
    }
}

/// Audit record of one replacement actually chosen for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMsg {
    pub venv: String,
    pub file_abspath: PathBuf,
    /// The exact line substituted (or that would be, in dry-run mode).
    pub line: String,
}

impl fmt::Display for ResolvedMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} <- {}",
            self.venv,
            self.file_abspath.display(),
            self.line
        )
    }
}

/// Outcome of nudge selection for one flagged package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NudgeOutcome {
    /// Use `pkg <op> version` in flattened files, `pkg==version` in lock
    /// files.
    Chosen { op: CompareOp, version: PkgVersion },
    /// No observed version satisfies the collected constraints.
    Unresolvable { specifier_sets: Vec<SpecifierSet> },
}

/// Select a replacement version for one package.
///
/// `pins` are the package's pins from the resolved `.in` set; `highest`
/// and `others` are the distinct versions observed across the venv's lock
/// files. The candidate pool is exactly those observed versions. The
/// selection never invents a version outside all known constraints:
///
/// 1. drop candidates failing any collected specifier set
/// 2. drop candidates excluded by `!=`; an `==` wins outright, or
///    escalates to unresolvable when its version is not an acceptable
///    candidate
/// 3. with no specifiers anywhere, default to `>= highest`
/// 4. otherwise derive the operator and bound from the written lines and
///    pick the boundary-closest acceptable candidate
///
/// Lines with more than two specifiers, or any `~=`, abort with
/// [`Error::UnsupportedSpecifier`] rather than approximating.
pub fn choose_nudge(
    pkg_name: &str,
    pins: &[Pin],
    highest: &PkgVersion,
    others: &BTreeSet<PkgVersion>,
) -> Result<NudgeOutcome> {
    let specifier_sets = collect_specifier_sets(pins);

    let mut acceptable: BTreeSet<PkgVersion> = others
        .iter()
        .chain(std::iter::once(highest))
        .filter(|v| specifier_sets.iter().all(|ss| ss.contains(v)))
        .cloned()
        .collect();

    let spec_lines: Vec<&[Specifier]> = pins
        .iter()
        .map(|pin| pin.specifiers.as_slice())
        .filter(|specs| !specs.is_empty())
        .collect();

    // != prunes; == overrides everything else
    let mut eq_target: Option<PkgVersion> = None;
    for line in &spec_lines {
        for spec in *line {
            match spec.op {
                CompareOp::Ne => {
                    acceptable.remove(&spec.version);
                }
                CompareOp::Eq => {
                    acceptable.retain(|v| v == &spec.version);
                    eq_target = Some(spec.version.clone());
                }
                _ => {}
            }
        }
    }
    if let Some(version) = eq_target {
        if !acceptable.contains(&version) {
            debug!(pkg = pkg_name, %version, "== version not among observed candidates");
            return Ok(NudgeOutcome::Unresolvable { specifier_sets });
        }
        return Ok(NudgeOutcome::Chosen {
            op: CompareOp::Eq,
            version,
        });
    }

    if specifier_sets.is_empty() {
        return Ok(NudgeOutcome::Chosen {
            op: CompareOp::Ge,
            version: highest.clone(),
        });
    }

    // derive the nudge target from how the lines were written
    let mut target: Option<(CompareOp, PkgVersion)> = None;
    for line in &spec_lines {
        match line {
            [only] => {
                reject_compatible(pkg_name, line)?;
                if matches!(only.op, CompareOp::Eq | CompareOp::Ne) {
                    continue;
                }
                target = Some((only.op, only.version.clone()));
            }
            [first, second] => {
                reject_compatible(pkg_name, line)?;
                let first_ok = acceptable.contains(&first.version);
                let second_ok = acceptable.contains(&second.version);
                let chosen = match (first_ok, second_ok) {
                    (false, false) => None,
                    (false, true) => Some(second),
                    // both bounds acceptable: prefer the first listed.
                    // A heuristic, not a proven rule.
                    (true, false) | (true, true) => Some(first),
                };
                if let Some(bound) = chosen {
                    if bound.op != CompareOp::Eq {
                        target = Some((bound.op, bound.version.clone()));
                    }
                }
            }
            [] => {}
            _ => {
                return Err(Error::UnsupportedSpecifier {
                    pkg_name: pkg_name.to_string(),
                    detail: format!("{} comparison clauses on one line", line.len()),
                });
            }
        }
    }

    let outcome = match target {
        None => match acceptable.iter().next_back() {
            Some(version) => NudgeOutcome::Chosen {
                op: CompareOp::Eq,
                version: version.clone(),
            },
            None => NudgeOutcome::Unresolvable { specifier_sets },
        },
        Some((op, bound)) => {
            let keep = |v: &&PkgVersion| match op {
                CompareOp::Le => **v <= bound,
                CompareOp::Lt => **v < bound,
                CompareOp::Ge => **v >= bound,
                CompareOp::Gt => **v > bound,
                _ => false,
            };
            // lowest candidate hugs an upper bound, highest hugs a lower one
            let picked = match op {
                CompareOp::Le | CompareOp::Lt => acceptable.iter().filter(keep).next(),
                _ => acceptable.iter().filter(keep).next_back(),
            };
            match picked {
                Some(version) => NudgeOutcome::Chosen {
                    op,
                    version: version.clone(),
                },
                None => NudgeOutcome::Unresolvable { specifier_sets },
            }
        }
    };
    Ok(outcome)
}

fn collect_specifier_sets(pins: &[Pin]) -> Vec<SpecifierSet> {
    let mut sets: Vec<SpecifierSet> = Vec::new();
    for pin in pins {
        if pin.specifiers.is_empty() {
            continue;
        }
        let set = SpecifierSet::new(pin.specifiers.clone());
        if !sets.contains(&set) {
            sets.push(set);
        }
    }
    sets
}

fn reject_compatible(pkg_name: &str, line: &[Specifier]) -> Result<()> {
    if line.iter().any(|s| s.op == CompareOp::Compatible) {
        return Err(Error::UnsupportedSpecifier {
            pkg_name: pkg_name.to_string(),
            detail: "~= compatible-release operator".to_string(),
        });
    }
    Ok(())
}
