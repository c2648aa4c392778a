// src/venvs.rs

//! Venv-to-requirements mapping from `pyproject.toml`.
//!
//! ```toml
//! [[tool.venvs]]
//! venv_base_path = '.venv'
//! reqs = ['requirements/prod', 'requirements/pins.shared']
//! ```
//!
//! `reqs` entries are relative stems without the final `.in`/`.unlock`/
//! `.lock` suffix; the caller picks which rendering it wants.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct PyProject {
    tool: Option<ToolSection>,
}

#[derive(Debug, Deserialize)]
struct ToolSection {
    venvs: Option<Vec<VenvEntry>>,
}

/// One `[[tool.venvs]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct VenvEntry {
    /// Relative path to the venv base folder; doubles as the venv key.
    pub venv_base_path: String,
    /// Ordered requirement-file stems, relative to the project base.
    pub reqs: Vec<String>,
}

/// Loads and answers queries against the `[[tool.venvs]]` map.
#[derive(Debug)]
pub struct VenvMapLoader {
    pub project_base: PathBuf,
    entries: Vec<VenvEntry>,
}

impl VenvMapLoader {
    /// Read `pyproject.toml` under the project base.
    pub fn load(project_base: &Path) -> Result<Self> {
        let path = project_base.join("pyproject.toml");
        let raw = fs::read_to_string(&path).map_err(|source| Error::VenvMapRead {
            path: path.clone(),
            source,
        })?;
        let parsed: PyProject =
            toml::from_str(&raw).map_err(|source| Error::VenvMapParse { path, source })?;
        let entries = parsed
            .tool
            .and_then(|tool| tool.venvs)
            .unwrap_or_default();
        Ok(Self {
            project_base: project_base.to_path_buf(),
            entries,
        })
    }

    pub fn venv_keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.venv_base_path.as_str())
    }

    /// Absolute paths of the venv's requirement files with the given
    /// suffix appended, in listed order.
    pub fn reqs_abspaths(&self, venv: &str, suffix: &str) -> Result<Vec<PathBuf>> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.venv_base_path == venv)
            .ok_or_else(|| Error::UnknownVenv(venv.to_string()))?;
        Ok(entry
            .reqs
            .iter()
            .map(|stem| self.project_base.join(format!("{stem}{suffix}")))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project_with(map: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("pyproject.toml"), map).unwrap();
        dir
    }

    #[test]
    fn test_load_and_resolve_stems() {
        let dir = project_with(
            r#"
[project]
name = "sample"

[[tool.venvs]]
venv_base_path = '.venv'
reqs = ['requirements/prod', 'requirements/pins.shared']

[[tool.venvs]]
venv_base_path = '.doc/.venv'
reqs = ['docs/requirements']
"#,
        );
        let loader = VenvMapLoader::load(dir.path()).unwrap();
        assert_eq!(loader.venv_keys().count(), 2);

        let paths = loader.reqs_abspaths(".venv", ".lock").unwrap();
        assert_eq!(paths[0], dir.path().join("requirements/prod.lock"));
        assert_eq!(paths[1], dir.path().join("requirements/pins.shared.lock"));
    }

    #[test]
    fn test_unknown_venv() {
        let dir = project_with("[[tool.venvs]]\nvenv_base_path = '.venv'\nreqs = []\n");
        let loader = VenvMapLoader::load(dir.path()).unwrap();
        assert!(matches!(
            loader.reqs_abspaths(".venv2", ".in"),
            Err(Error::UnknownVenv(_))
        ));
    }

    #[test]
    fn test_missing_and_malformed_map() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            VenvMapLoader::load(dir.path()),
            Err(Error::VenvMapRead { .. })
        ));

        let dir = project_with("[[tool.venvs]\nnot toml");
        assert!(matches!(
            VenvMapLoader::load(dir.path()),
            Err(Error::VenvMapParse { .. })
        ));
    }

    #[test]
    fn test_map_without_venvs_tables() {
        let dir = project_with("[project]\nname = \"sample\"\n");
        let loader = VenvMapLoader::load(dir.path()).unwrap();
        assert_eq!(loader.venv_keys().count(), 0);
    }
}
