// src/reqfile/mod.rs

//! Requirement-file line grammar and file-role classification.
//!
//! One physical line parses into nothing (blank, comment, unsupported
//! option), a directive (`-c`/`-r` referencing another requirements file),
//! or a package requirement (name, version specifiers, environment marker
//! qualifiers). File roles are decided once from the filename: the final
//! suffix picks the kind (`.in`, `.unlock`, `.lock`) and a `.shared` infix
//! marks the file as owned by more than one venv.

use crate::error::{Error, Result};
use crate::version::{CompareOp, PkgVersion, Specifier};
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};

static PKG_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?").unwrap());

static SPECIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(==|<=|>=|<|>|~=|!=)\s*(\S+)\s*$").unwrap());

/// Requirements-file suffixes, in pipeline order.
pub const ENDINGS: [&str; 3] = [".in", ".unlock", ".lock"];

/// What the file is for in the lock pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Hand-edited `.in` source, may contain `-c`/`-r` directives.
    Source,
    /// Generated `.unlock` rendering of a fully resolved source.
    Flattened,
    /// Compiled `.lock` file with exact `==` pins.
    ExactPin,
}

impl FileKind {
    pub fn suffix(self) -> &'static str {
        match self {
            FileKind::Source => ".in",
            FileKind::Flattened => ".unlock",
            FileKind::ExactPin => ".lock",
        }
    }
}

/// Whether one venv owns the file or several share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ownership {
    PerVenv,
    Shared,
}

/// Role of a requirements file, fixed at load time from its name alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileRole {
    pub kind: FileKind,
    pub ownership: Ownership,
}

impl FileRole {
    /// Classify a path by its final suffix and optional `.shared` infix.
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::UnrecognizedSuffix {
                path: path.to_path_buf(),
            })?;
        let kind = if name.ends_with(".in") {
            FileKind::Source
        } else if name.ends_with(".unlock") {
            FileKind::Flattened
        } else if name.ends_with(".lock") {
            FileKind::ExactPin
        } else {
            return Err(Error::UnrecognizedSuffix {
                path: path.to_path_buf(),
            });
        };
        let ownership = if is_shared_name(name) {
            Ownership::Shared
        } else {
            Ownership::PerVenv
        };
        Ok(Self { kind, ownership })
    }

    pub fn is_shared(self) -> bool {
        self.ownership == Ownership::Shared
    }
}

/// True when the second-to-last suffix is `.shared`, e.g. `prod.shared.in`.
/// Names without a recognized ending are never shared.
pub fn is_shared_name(file_name: &str) -> bool {
    let Some(stem) = ENDINGS
        .iter()
        .find_map(|ending| file_name.strip_suffix(ending))
    else {
        return false;
    };
    stem.ends_with(".shared")
}

/// Swap the last suffix of a path, keeping any `.shared` infix in place:
/// `reqs/prod.shared.lock` + `.unlock` → `reqs/prod.shared.unlock`.
pub fn replace_last_suffix(path: &Path, suffix: &str) -> PathBuf {
    path.with_extension(suffix.trim_start_matches('.'))
}

/// Resolve a directive's relative path against the file that contains the
/// directive. The result is lexically normalized; existence is checked by
/// the caller during discovery.
pub fn resolve_directive_path(referencing_file: &Path, relpath: &str) -> PathBuf {
    let base = referencing_file.parent().unwrap_or_else(|| Path::new(""));
    let mut out = PathBuf::new();
    for component in base.join(relpath).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Which kind of file reference a directive line makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    /// `-c`: constrains versions without installing.
    Constraint,
    /// `-r`: pulls the referenced file's packages in.
    Requirement,
}

/// The meaningful content of one requirement-file line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    Directive { kind: DirectiveKind, path: String },
    Package(PackageLine),
}

/// A parsed package requirement line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLine {
    pub name: String,
    /// Comparison clauses in the order they were written.
    pub specifiers: Vec<Specifier>,
    /// Environment markers, trimmed, without the leading `;`.
    pub qualifiers: Vec<String>,
}

/// Parse one line. Returns `None` for lines that contribute nothing to
/// resolution: blanks, comments, unsupported pip options, and lines whose
/// package token or specifiers do not fit the supported grammar (those are
/// logged and skipped rather than failing the whole file).
pub fn parse_line(line: &str) -> Option<ParsedLine> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    if let Some(rest) = trimmed.strip_prefix("-c ") {
        return Some(ParsedLine::Directive {
            kind: DirectiveKind::Constraint,
            path: strip_inline_comment(rest).trim().to_string(),
        });
    }
    if let Some(rest) = trimmed.strip_prefix("-r ") {
        return Some(ParsedLine::Directive {
            kind: DirectiveKind::Requirement,
            path: strip_inline_comment(rest).trim().to_string(),
        });
    }
    if trimmed.starts_with('-') {
        // pip options (--hash, -e, ...) carry no version information
        debug!(line = trimmed, "skipping option line");
        return None;
    }

    let bare = strip_inline_comment(trimmed);
    let qualifiers = parse_qualifiers(bare);
    let head = bare.split(';').next().unwrap_or("").trim_end();

    let Some(name_match) = PKG_NAME_RE.find(head) else {
        warn!(line = trimmed, "unparsable package name; line skipped");
        return None;
    };
    let name = name_match.as_str().to_string();
    let mut rest = &head[name_match.end()..];

    // extras contribute nothing to version agreement
    if rest.starts_with('[') {
        match rest.find(']') {
            Some(pos) => rest = &rest[pos + 1..],
            None => {
                warn!(line = trimmed, "unterminated extras bracket; line skipped");
                return None;
            }
        }
    }
    let rest = rest.trim();

    let mut specifiers = Vec::new();
    if !rest.is_empty() && !rest.starts_with('@') {
        for clause in rest.split(',') {
            let Some(caps) = SPECIFIER_RE.captures(clause) else {
                warn!(line = trimmed, clause, "unsupported specifier clause; line skipped");
                return None;
            };
            let op = CompareOp::parse(&caps[1]).unwrap();
            let version = match PkgVersion::parse(&caps[2]) {
                Ok(v) => v,
                Err(err) => {
                    warn!(line = trimmed, %err, "unparsable version; line skipped");
                    return None;
                }
            };
            specifiers.push(Specifier { op, version });
        }
    }

    Some(ParsedLine::Package(PackageLine {
        name,
        specifiers,
        qualifiers,
    }))
}

/// Everything after the first `;`, split, trimmed, empties dropped.
/// `os_name=="nt"` normalizes to `platform_system=="Windows"` so Windows
/// markers written either way group together.
pub fn parse_qualifiers(line: &str) -> Vec<String> {
    let mut parts = line.split(';');
    parts.next();
    parts
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(|q| {
            if q.starts_with("os_name") && q.contains("nt") {
                "platform_system==\"Windows\"".to_string()
            } else {
                q.to_string()
            }
        })
        .collect()
}

fn strip_inline_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => line[..pos].trim_end(),
        None => line,
    }
}
