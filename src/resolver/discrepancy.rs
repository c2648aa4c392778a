// src/resolver/discrepancy.rs

//! Cross-file version discrepancy detection.
//!
//! Only the compiled `.lock` set can see every transitive package, so the
//! version spread is computed there; the `.in`-derived groupings are used
//! downstream to recover the author's intent.

use crate::pins::PinsByPkg;
use crate::version::PkgVersion;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// The distinct versions observed for one package across lock files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSpread {
    pub highest: PkgVersion,
    /// Every other distinct version seen. Non-empty by construction.
    pub others: BTreeSet<PkgVersion>,
}

/// Scan the all-lock grouping for packages pinned at more than one
/// distinct version. A lock pin's version is its first specifier's
/// version; lock lines without one contribute nothing.
pub fn find_version_discrepancies(all_lock: &PinsByPkg) -> BTreeMap<String, VersionSpread> {
    let mut out = BTreeMap::new();
    for (pkg_name, pins) in all_lock {
        let mut versions: BTreeSet<PkgVersion> = BTreeSet::new();
        for pin in pins {
            match pin.specifiers.first() {
                Some(spec) => {
                    versions.insert(spec.version.clone());
                }
                None => {
                    debug!(
                        pkg = pkg_name.as_str(),
                        file = %pin.file_abspath.display(),
                        "lock line without version; ignored"
                    );
                }
            }
        }
        if versions.len() > 1 {
            if let Some(highest) = versions.pop_last() {
                out.insert(
                    pkg_name.clone(),
                    VersionSpread {
                        highest,
                        others: versions,
                    },
                );
            }
        }
    }
    out
}

/// Per package, the qualifier suffix to carry onto a nudge line: the first
/// non-empty qualifier list wins, rendered `"; q1; q2"`. Packages whose
/// pins all lack qualifiers map to an empty string.
pub fn qualifiers_by_pkg(grouping: &PinsByPkg) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for (pkg_name, pins) in grouping {
        let suffix = pins
            .iter()
            .find(|pin| pin.has_qualifiers())
            .map(|pin| format!("; {}", pin.qualifiers_joined()))
            .unwrap_or_default();
        out.insert(pkg_name.clone(), suffix);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pins::Pin;
    use crate::version::{CompareOp, Specifier};
    use std::path::PathBuf;

    fn lock_pin(file: &str, pkg: &str, version: &str) -> Pin {
        Pin {
            file_abspath: PathBuf::from(file),
            pkg_name: pkg.to_string(),
            line: format!("{pkg}=={version}"),
            specifiers: vec![Specifier {
                op: CompareOp::Eq,
                version: PkgVersion::parse(version).unwrap(),
            }],
            qualifiers: Vec::new(),
        }
    }

    #[test]
    fn test_single_version_is_not_a_discrepancy() {
        let mut grouping = PinsByPkg::new();
        grouping.insert(
            "pip".to_string(),
            vec![
                lock_pin("/r/dev.lock", "pip", "24.2"),
                lock_pin("/r/prod.lock", "pip", "24.2"),
            ],
        );
        assert!(find_version_discrepancies(&grouping).is_empty());
    }

    #[test]
    fn test_spread_splits_highest_from_others() {
        let mut grouping = PinsByPkg::new();
        grouping.insert(
            "pip".to_string(),
            vec![
                lock_pin("/r/dev.lock", "pip", "24.2"),
                lock_pin("/r/prod.lock", "pip", "23.0"),
                lock_pin("/r/docs.lock", "pip", "24.1"),
            ],
        );
        let found = find_version_discrepancies(&grouping);
        let spread = &found["pip"];
        assert_eq!(spread.highest, PkgVersion::parse("24.2").unwrap());
        assert_eq!(spread.others.len(), 2);
    }

    #[test]
    fn test_qualifiers_first_nonempty_wins() {
        let mut windows = lock_pin("/r/dev.lock", "colorama", "0.4.6");
        windows.qualifiers = vec!["platform_system==\"Windows\"".to_string()];
        let mut grouping = PinsByPkg::new();
        grouping.insert(
            "colorama".to_string(),
            vec![lock_pin("/r/prod.lock", "colorama", "0.4.6"), windows],
        );
        grouping.insert(
            "pip".to_string(),
            vec![lock_pin("/r/dev.lock", "pip", "24.2")],
        );

        let quals = qualifiers_by_pkg(&grouping);
        assert_eq!(quals["colorama"], "; platform_system==\"Windows\"");
        assert_eq!(quals["pip"], "");
    }
}
