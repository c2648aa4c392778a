// src/pins/mod.rs

//! Pins and the per-file pin container.
//!
//! A [`Pin`] is one dependency line tied to the file it came from. Identity
//! is (file path, package name, qualifiers): the same package can appear
//! twice in one file with different environment markers and both pins are
//! tracked separately. Ordering is package name, then joined qualifiers,
//! so rendered output is deterministic.

use crate::error::Result;
use crate::reqfile::{self, FileRole, ParsedLine};
use crate::version::Specifier;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use tracing::debug;

/// One dependency line from a requirements file.
#[derive(Debug, Clone)]
pub struct Pin {
    /// Absolute path of the owning file.
    pub file_abspath: PathBuf,
    pub pkg_name: String,
    /// The line as written, trailing comment stripped.
    pub line: String,
    /// Comparison clauses in written order. Empty for bare dependencies.
    pub specifiers: Vec<Specifier>,
    /// Environment markers in written order, without the `;` separator.
    pub qualifiers: Vec<String>,
}

impl Pin {
    /// A pin constrains a version; a bare dependency does not.
    pub fn is_pin(&self) -> bool {
        !self.specifiers.is_empty()
    }

    pub fn has_qualifiers(&self) -> bool {
        !self.qualifiers.is_empty()
    }

    /// Qualifiers joined the way they are compared and reported.
    pub fn qualifiers_joined(&self) -> String {
        self.qualifiers.join("; ")
    }

    fn identity(&self) -> (&Path, &str, String) {
        (&self.file_abspath, &self.pkg_name, self.qualifiers_joined())
    }
}

impl PartialEq for Pin {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for Pin {}

impl Hash for Pin {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl Ord for Pin {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.pkg_name, self.qualifiers_joined(), &self.file_abspath).cmp(&(
            &other.pkg_name,
            other.qualifiers_joined(),
            &other.file_abspath,
        ))
    }
}

impl PartialOrd for Pin {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// All pins of one requirements file plus its outstanding directives.
///
/// Directive paths are resolved to absolute paths at load time, relative to
/// the file that contains the directive. `depth()` counts outstanding `-c`
/// constraints; a container is promotable once it reaches zero.
#[derive(Debug, Clone)]
pub struct FilePins {
    pub file_abspath: PathBuf,
    pub role: FileRole,
    pins: Vec<Pin>,
    /// Unresolved `-c` targets.
    pub constraints: BTreeSet<PathBuf>,
    /// Unresolved `-r` targets.
    pub requirements: BTreeSet<PathBuf>,
    /// Package lines merged up from resolved children.
    pub donated: BTreeSet<String>,
}

impl FilePins {
    /// Read and parse one requirements file.
    pub fn load(abspath: &Path) -> Result<Self> {
        let role = FileRole::from_path(abspath)?;
        let contents = fs::read_to_string(abspath)?;

        let mut pins = Vec::new();
        let mut constraints = BTreeSet::new();
        let mut requirements = BTreeSet::new();
        for raw in contents.lines() {
            match reqfile::parse_line(raw) {
                None => {}
                Some(ParsedLine::Directive { kind, path }) => {
                    let target = reqfile::resolve_directive_path(abspath, &path);
                    match kind {
                        reqfile::DirectiveKind::Constraint => constraints.insert(target),
                        reqfile::DirectiveKind::Requirement => requirements.insert(target),
                    };
                }
                Some(ParsedLine::Package(pkg)) => {
                    pins.push(Pin {
                        file_abspath: abspath.to_path_buf(),
                        pkg_name: pkg.name,
                        line: clean_line(raw),
                        specifiers: pkg.specifiers,
                        qualifiers: pkg.qualifiers,
                    });
                }
            }
        }
        pins.sort();
        pins.dedup();
        debug!(
            file = %abspath.display(),
            pins = pins.len(),
            constraints = constraints.len(),
            requirements = requirements.len(),
            "loaded requirements file"
        );

        Ok(Self {
            file_abspath: abspath.to_path_buf(),
            role,
            pins,
            constraints,
            requirements,
            donated: BTreeSet::new(),
        })
    }

    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    /// Outstanding constraint count; zero means promotable.
    pub fn depth(&self) -> usize {
        self.constraints.len()
    }

    /// Every directive target, both kinds.
    pub fn directive_targets(&self) -> impl Iterator<Item = &PathBuf> {
        self.constraints.iter().chain(self.requirements.iter())
    }

    /// Discard a satisfied directive and take the child's packages.
    pub fn absorb_resolved(&mut self, child: &FilePins) {
        self.constraints.remove(&child.file_abspath);
        self.requirements.remove(&child.file_abspath);
        for pin in &child.pins {
            self.donated.insert(pin.line.clone());
        }
        for line in &child.donated {
            self.donated.insert(line.clone());
        }
    }

    /// Human-readable list of still-outstanding directives, for stall and
    /// missing-file diagnostics.
    pub fn outstanding(&self) -> String {
        let listed: Vec<String> = self
            .directive_targets()
            .map(|p| p.display().to_string())
            .collect();
        format!("{} -> [{}]", self.file_abspath.display(), listed.join(", "))
    }
}

fn clean_line(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.find('#') {
        Some(pos) => trimmed[..pos].trim_end().to_string(),
        None => trimmed.to_string(),
    }
}

/// Pins grouped by package name; insertion order inside each group follows
/// the container iteration order.
pub type PinsByPkg = std::collections::BTreeMap<String, Vec<Pin>>;

/// Group pins that carry version or qualifier intent. Recovers what the
/// author actually asked for, as opposed to what the compiler emitted.
pub fn group_notable(containers: &[FilePins]) -> PinsByPkg {
    let mut by_pkg = PinsByPkg::new();
    for container in containers {
        for pin in container.pins() {
            if pin.is_pin() || pin.has_qualifiers() {
                by_pkg.entry(pin.pkg_name.clone()).or_default().push(pin.clone());
            }
        }
    }
    by_pkg
}

/// Group every pin, including bare dependencies.
pub fn group_all(containers: &[FilePins]) -> PinsByPkg {
    let mut by_pkg = PinsByPkg::new();
    for container in containers {
        for pin in container.pins() {
            by_pkg.entry(pin.pkg_name.clone()).or_default().push(pin.clone());
        }
    }
    by_pkg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::{CompareOp, PkgVersion, Specifier};

    fn pin(file: &str, pkg: &str, line: &str, qualifiers: &[&str]) -> Pin {
        Pin {
            file_abspath: PathBuf::from(file),
            pkg_name: pkg.to_string(),
            line: line.to_string(),
            specifiers: Vec::new(),
            qualifiers: qualifiers.iter().map(|q| q.to_string()).collect(),
        }
    }

    #[test]
    fn test_identity_ignores_specifiers_and_line_text() {
        let mut a = pin("/r/dev.in", "pip", "pip>=24.2", &[]);
        a.specifiers = vec![Specifier {
            op: CompareOp::Ge,
            version: PkgVersion::parse("24.2").unwrap(),
        }];
        let b = pin("/r/dev.in", "pip", "pip >= 24.2   ", &[]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_qualifiers_make_pins_distinct() {
        let plain = pin("/r/dev.in", "colorama", "colorama", &[]);
        let windows = pin(
            "/r/dev.in",
            "colorama",
            "colorama; platform_system==\"Windows\"",
            &["platform_system==\"Windows\""],
        );
        assert_ne!(plain, windows);
    }

    #[test]
    fn test_ordering_by_name_then_qualifiers() {
        let mut pins = vec![
            pin("/r/a.in", "zope", "zope", &[]),
            pin("/r/a.in", "attrs", "attrs; python_version<\"3.11\"", &["python_version<\"3.11\""]),
            pin("/r/a.in", "attrs", "attrs", &[]),
        ];
        pins.sort();
        assert_eq!(pins[0].pkg_name, "attrs");
        assert!(pins[0].qualifiers.is_empty());
        assert!(pins[1].has_qualifiers());
        assert_eq!(pins[2].pkg_name, "zope");
    }

    #[test]
    fn test_grouping_notable_vs_all() {
        let mut constrained = pin("/r/a.in", "pip", "pip>=24.2", &[]);
        constrained.specifiers = vec![Specifier {
            op: CompareOp::Ge,
            version: PkgVersion::parse("24.2").unwrap(),
        }];
        let bare = pin("/r/a.in", "requests", "requests", &[]);

        let container = FilePins {
            file_abspath: PathBuf::from("/r/a.in"),
            role: FileRole::from_path(Path::new("/r/a.in")).unwrap(),
            pins: vec![constrained, bare],
            constraints: BTreeSet::new(),
            requirements: BTreeSet::new(),
            donated: BTreeSet::new(),
        };
        let containers = vec![container];

        let notable = group_notable(&containers);
        assert!(notable.contains_key("pip"));
        assert!(!notable.contains_key("requests"));

        let all = group_all(&containers);
        assert_eq!(all.len(), 2);
    }
}
