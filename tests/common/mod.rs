// tests/common/mod.rs

//! Shared fixtures for reqlock integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Create a project folder with a `pyproject.toml` declaring one venv
/// (`.venv`) whose `reqs` stems are given.
///
/// Returns (TempDir, base path) - keep the TempDir alive to prevent cleanup.
pub fn project_with_venv(stems: &[&str]) -> (TempDir, PathBuf) {
    let temp_dir = tempfile::tempdir().unwrap();
    let base = temp_dir.path().to_path_buf();
    let listed: Vec<String> = stems.iter().map(|s| format!("'{s}'")).collect();
    let pyproject = format!(
        "[project]\nname = \"sample\"\nversion = \"0.0.1\"\n\n\
         [[tool.venvs]]\nvenv_base_path = '.venv'\nreqs = [{}]\n",
        listed.join(", ")
    );
    fs::write(base.join("pyproject.toml"), pyproject).unwrap();
    (temp_dir, base)
}

/// Write one requirements file under the project base, creating parents.
pub fn write_req(base: &Path, relpath: &str, contents: &str) -> PathBuf {
    let path = base.join(relpath);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

pub fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}
