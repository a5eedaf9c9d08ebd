//! Package-location index: name -> installed directory.
//!
//! `anchor fetch` resolves a project's dependencies and records where each
//! package landed in `.anchor/package-index.json`. Flotilla consumes that
//! index read-only; it never computes install locations itself.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::errors::Error;
use crate::core::PACKAGE_INDEX_FILE;
use crate::util::fs;

/// A resolved mapping from package name to install location.
#[derive(Debug, Clone)]
pub struct PackageIndex {
    packages: HashMap<String, PathBuf>,
    dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct IndexSchema {
    packages: HashMap<String, PathBuf>,
}

impl PackageIndex {
    /// Load the index sidecar of `dir`. Missing, unreadable, or malformed
    /// files are fatal; they mean the package manager has not produced a
    /// usable resolution for this project.
    pub fn load(dir: &Path) -> Result<PackageIndex, Error> {
        read_index(dir).map_err(|err| Error::PackageIndexParse {
            dir: dir.to_path_buf(),
            message: format!("{:#}", err),
        })
    }

    /// Load the index sidecar of `dir`, downgrading any failure to `None`.
    /// The include walker uses this: a half-configured project should stop
    /// its chain, not abort discovery.
    pub fn load_optional(dir: &Path) -> Option<PackageIndex> {
        read_index(dir).ok()
    }

    /// Whether the index file exists next to `dir` at all.
    pub fn exists(dir: &Path) -> bool {
        dir.join(PACKAGE_INDEX_FILE).is_file()
    }

    /// The install location of `name`, if resolved.
    pub fn locate(&self, name: &str) -> Option<&Path> {
        self.packages.get(name).map(PathBuf::as_path)
    }

    /// Whether `name` has a resolved location.
    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    /// The directory whose sidecar this index came from.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn read_index(dir: &Path) -> Result<PackageIndex> {
    let path = dir.join(PACKAGE_INDEX_FILE);
    let text = fs::read_to_string(&path)?;
    let schema: IndexSchema = serde_json::from_str(&text)
        .with_context(|| format!("invalid package index: {}", path.display()))?;

    // Relative entries are relative to the directory holding the sidecar.
    let base = path.parent().unwrap_or(dir);
    let packages = schema
        .packages
        .into_iter()
        .map(|(name, location)| {
            let absolute = fs::absolutize(&location, base);
            (name, fs::normalize_path(&absolute))
        })
        .collect();

    Ok(PackageIndex {
        packages,
        dir: dir.to_path_buf(),
    })
}
