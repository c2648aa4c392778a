// src/version.rs

//! Version handling and specifier satisfaction for requirements files.
//!
//! Versions follow a practical subset of the PEP 440 grammar:
//! `[epoch!]release[{a|b|rc}N][.postN][.devN][+local]`. Comparison implements
//! the PEP 440 total order for that subset (dev < pre < final < post), with
//! shorter releases zero-padded so `1.0 == 1.0.0`.

use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Pre-release phase tag, ordered alpha < beta < release candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PreTag {
    Alpha,
    Beta,
    Rc,
}

impl fmt::Display for PreTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreTag::Alpha => write!(f, "a"),
            PreTag::Beta => write!(f, "b"),
            PreTag::Rc => write!(f, "rc"),
        }
    }
}

/// A parsed package version.
///
/// Equality and ordering are semantic, not textual: `1.0` equals `1.0.0`.
#[derive(Debug, Clone, Eq)]
pub struct PkgVersion {
    pub epoch: u64,
    pub release: Vec<u64>,
    pub pre: Option<(PreTag, u64)>,
    pub post: Option<u64>,
    pub dev: Option<u64>,
    pub local: Option<String>,
}

impl PkgVersion {
    /// Parse a version string.
    ///
    /// Examples:
    /// - "1.2.3" → release=[1, 2, 3]
    /// - "2!1.0" → epoch=2, release=[1, 0]
    /// - "1.0rc2" → release=[1, 0], pre=(Rc, 2)
    /// - "24.2.post1" → release=[24, 2], post=Some(1)
    /// - "1.0.dev3" → release=[1, 0], dev=Some(3)
    pub fn parse(s: &str) -> Result<Self> {
        let raw = s.trim();
        let err = |reason: &str| Error::VersionParse {
            input: raw.to_string(),
            reason: reason.to_string(),
        };

        let mut rest = raw;
        let mut epoch = 0u64;
        if let Some(pos) = rest.find('!') {
            epoch = rest[..pos].parse().map_err(|_| err("invalid epoch"))?;
            rest = &rest[pos + 1..];
        }

        let mut local = None;
        if let Some(pos) = rest.find('+') {
            let l = &rest[pos + 1..];
            if l.is_empty() {
                return Err(err("empty local segment"));
            }
            local = Some(l.to_ascii_lowercase());
            rest = &rest[..pos];
        }

        let mut release = Vec::new();
        loop {
            let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
            if digits.is_empty() {
                if release.is_empty() {
                    return Err(err("expected a numeric release segment"));
                }
                break;
            }
            release.push(digits.parse().map_err(|_| err("release segment overflow"))?);
            rest = &rest[digits.len()..];
            if let Some(tail) = rest.strip_prefix('.') {
                if tail.starts_with(|c: char| c.is_ascii_digit()) {
                    rest = tail;
                    continue;
                }
            }
            break;
        }

        let mut pre = None;
        let mut post = None;
        let mut dev = None;
        while !rest.is_empty() {
            let trimmed = rest.trim_start_matches(['.', '-', '_']);
            let lowered = trimmed.to_ascii_lowercase();
            // Longest tag first so "preview" is not mistaken for "pre".
            let tags: &[(&str, &str)] = &[
                ("preview", "pre"),
                ("alpha", "a"),
                ("beta", "b"),
                ("post", "post"),
                ("dev", "dev"),
                ("pre", "pre"),
                ("rev", "post"),
                ("rc", "rc"),
                ("a", "a"),
                ("b", "b"),
                ("c", "rc"),
                ("r", "post"),
            ];
            let Some((word, kind)) = tags.iter().find(|(w, _)| lowered.starts_with(w)) else {
                return Err(err("unrecognized version segment"));
            };
            let after = &trimmed[word.len()..];
            let after = after.trim_start_matches(['.', '-', '_']);
            let digits: String = after.chars().take_while(|c| c.is_ascii_digit()).collect();
            let number: u64 = if digits.is_empty() {
                0
            } else {
                digits.parse().map_err(|_| err("segment number overflow"))?
            };
            match *kind {
                "a" => pre = Some((PreTag::Alpha, number)),
                "b" => pre = Some((PreTag::Beta, number)),
                "rc" | "pre" => pre = Some((PreTag::Rc, number)),
                "post" => post = Some(number),
                "dev" => dev = Some(number),
                _ => unreachable!(),
            }
            rest = &after[digits.len()..];
        }

        Ok(Self {
            epoch,
            release,
            pre,
            post,
            dev,
            local,
        })
    }

    /// Release segments with trailing zeroes removed, so `1.0` and `1.0.0`
    /// normalize identically.
    fn release_trimmed(&self) -> &[u64] {
        let mut len = self.release.len();
        while len > 1 && self.release[len - 1] == 0 {
            len -= 1;
        }
        &self.release[..len]
    }

    /// Phase rank: dev-only < pre < final < post.
    fn phase(&self) -> (u8, u8, u64) {
        if let Some((tag, n)) = self.pre {
            (1, tag as u8, n)
        } else if let Some(n) = self.post {
            (3, 0, n)
        } else if self.dev.is_some() {
            (0, 0, 0)
        } else {
            (2, 0, 0)
        }
    }

    fn compare(&self, other: &PkgVersion) -> Ordering {
        match self.epoch.cmp(&other.epoch) {
            Ordering::Equal => {}
            ord => return ord,
        }

        let len = self.release.len().max(other.release.len());
        for i in 0..len {
            let a = self.release.get(i).copied().unwrap_or(0);
            let b = other.release.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => {}
                ord => return ord,
            }
        }

        match self.phase().cmp(&other.phase()) {
            Ordering::Equal => {}
            ord => return ord,
        }

        // Within the same phase a .devN variant sorts before the plain one.
        let dev_key = |v: &PkgVersion| match v.dev {
            Some(n) => (0u8, n),
            None => (1u8, 0),
        };
        match dev_key(self).cmp(&dev_key(other)) {
            Ordering::Equal => {}
            ord => return ord,
        }

        self.local.cmp(&other.local)
    }
}

impl PartialEq for PkgVersion {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl Hash for PkgVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.epoch.hash(state);
        self.release_trimmed().hash(state);
        self.phase().hash(state);
        self.dev.hash(state);
        self.local.hash(state);
    }
}

impl Ord for PkgVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl PartialOrd for PkgVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PkgVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch > 0 {
            write!(f, "{}!", self.epoch)?;
        }
        let segments: Vec<String> = self.release.iter().map(|n| n.to_string()).collect();
        write!(f, "{}", segments.join("."))?;
        if let Some((tag, n)) = self.pre {
            write!(f, "{tag}{n}")?;
        }
        if let Some(n) = self.post {
            write!(f, ".post{n}")?;
        }
        if let Some(n) = self.dev {
            write!(f, ".dev{n}")?;
        }
        if let Some(ref local) = self.local {
            write!(f, "+{local}")?;
        }
        Ok(())
    }
}

/// Version comparison operators recognized in requirement lines.
///
/// `~=` is recognized so that the parser carries it as data; the conflict
/// resolver refuses to compute a nudge pin from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Compatible,
}

impl CompareOp {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "==" => Some(CompareOp::Eq),
            "!=" => Some(CompareOp::Ne),
            "<" => Some(CompareOp::Lt),
            "<=" => Some(CompareOp::Le),
            ">" => Some(CompareOp::Gt),
            ">=" => Some(CompareOp::Ge),
            "~=" => Some(CompareOp::Compatible),
            _ => None,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Compatible => "~=",
        };
        write!(f, "{s}")
    }
}

/// One version-comparison clause, e.g. `>=1.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Specifier {
    pub op: CompareOp,
    pub version: PkgVersion,
}

impl Specifier {
    /// Check whether a version satisfies this clause.
    pub fn satisfies(&self, version: &PkgVersion) -> bool {
        match self.op {
            CompareOp::Eq => version == &self.version,
            CompareOp::Ne => version != &self.version,
            CompareOp::Lt => version < &self.version,
            CompareOp::Le => version <= &self.version,
            CompareOp::Gt => version > &self.version,
            CompareOp::Ge => version >= &self.version,
            CompareOp::Compatible => {
                // ~=X.Y means >=X.Y and matching X.* prefix.
                if version < &self.version {
                    return false;
                }
                let bound = self.version.release_trimmed();
                if bound.len() < 2 {
                    return true;
                }
                let prefix = &bound[..bound.len() - 1];
                prefix
                    .iter()
                    .enumerate()
                    .all(|(i, n)| version.release.get(i).copied().unwrap_or(0) == *n)
            }
        }
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op, self.version)
    }
}

/// A conjunction of specifiers collected from one requirement line.
///
/// A candidate version is acceptable only if every clause holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SpecifierSet(pub Vec<Specifier>);

impl SpecifierSet {
    pub fn new(specifiers: Vec<Specifier>) -> Self {
        Self(specifiers)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, version: &PkgVersion) -> bool {
        self.0.iter().all(|spec| spec.satisfies(version))
    }
}

impl fmt::Display for SpecifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clauses: Vec<String> = self.0.iter().map(|s| s.to_string()).collect();
        write!(f, "{}", clauses.join(","))
    }
}
