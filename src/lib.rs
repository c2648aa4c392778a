// src/lib.rs

//! reqlock — keeps per-venv requirements files agreeing on versions.
//!
//! A venv's dependencies live in three renderings distinguished by suffix:
//! hand-authored `.in` sources (may reference other files via `-c`/`-r`),
//! flattened `.unlock` files produced here, and `.lock` files compiled by
//! an external pin compiler. Because each `.lock` is compiled in its own
//! run, sibling lock files drift apart on transitive versions. This crate
//! resolves the directive graph, detects those discrepancies, chooses a
//! single nudge pin per package, and rewrites the affected files — except
//! shared files, which are only ever reported.

mod error;
pub mod fixer;
pub mod pins;
pub mod reqfile;
pub mod resolver;
pub mod venvs;
pub mod version;

pub use error::{Error, Result};
pub use fixer::{FixOutcome, Fixer, SharedNotice};
pub use pins::{FilePins, Pin};
pub use reqfile::{FileKind, FileRole, Ownership};
pub use resolver::{Resolvable, ResolutionSet, ResolvedMsg, UnResolvable};
pub use venvs::VenvMapLoader;
pub use version::{CompareOp, PkgVersion, Specifier, SpecifierSet};
