//! Lint-configuration documents and the include-chain walker.
//!
//! A project opts into flotilla through a `lint.yaml` file whose `lint`
//! section lists enabled plugins. Configuration files can `include` one
//! another, including files living inside other installed packages via
//! `package:` URIs, so answering "is the tool enabled here" means walking a
//! chain of documents.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use url::Url;

use crate::core::errors::Error;
use crate::core::package_index::PackageIndex;
use crate::core::{INCLUDE_KEY, LINT_KEY, PACKAGE_SCHEME, PLUGINS_KEY, TOOL_NAME};
use crate::util::fs;

/// Lazily walks the chain of configuration documents reachable from a root
/// file by following `include` keys.
///
/// The walk is finite, forward-only, and not restartable. Missing or
/// malformed files end the chain silently (a half-configured project is not
/// an error); a revisited file is a cycle and fails. Cycle detection happens
/// before the next file is dereferenced.
#[derive(Debug)]
pub struct OptionsChain {
    next_path: Option<PathBuf>,
    visited: HashSet<PathBuf>,
    root_dir: PathBuf,
    /// Package index next to the root file, loaded at most once per walk.
    /// Outer `None` = not yet loaded; inner `None` = load failed.
    index: Option<Option<PackageIndex>>,
}

impl OptionsChain {
    /// Start a walk at `root_file`.
    pub fn new(root_file: &Path) -> OptionsChain {
        let root_dir = root_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        OptionsChain {
            next_path: Some(root_file.to_path_buf()),
            visited: HashSet::new(),
            root_dir,
            index: None,
        }
    }

    /// Resolve an `include` value against the current file's location, or
    /// through the package index for `package:` references.
    fn resolve_include(&mut self, value: &str, current: &Path) -> Option<PathBuf> {
        if let Ok(url) = Url::parse(value) {
            if url.scheme() == PACKAGE_SCHEME {
                return self.resolve_package_reference(url.path());
            }
        }

        let current_dir = current.parent().unwrap_or(Path::new("."));
        Some(fs::absolutize(Path::new(value), current_dir))
    }

    /// Resolve `name/rest...` through the package-location index: the first
    /// segment names the package, the remaining segments join onto its
    /// install location. An unknown package or unloadable index ends the
    /// chain silently.
    fn resolve_package_reference(&mut self, locator: &str) -> Option<PathBuf> {
        let mut segments = locator.trim_start_matches('/').split('/');
        let package = segments.next()?;
        if package.is_empty() {
            return None;
        }

        let index = self
            .index
            .get_or_insert_with(|| PackageIndex::load_optional(&self.root_dir))
            .as_ref()?;
        let install = index.locate(package)?;

        let mut resolved = install.to_path_buf();
        for segment in segments {
            resolved.push(segment);
        }
        Some(resolved)
    }
}

impl Iterator for OptionsChain {
    type Item = Result<Mapping, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.next_path.take()?;

        // Cycle check comes before any dereferencing.
        if !self.visited.insert(fs::normalize_path(&path)) {
            return Some(Err(Error::IncludeCycle { path }));
        }

        let Ok(text) = std::fs::read_to_string(&path) else {
            return None;
        };
        let Ok(value) = serde_yaml::from_str::<Value>(&text) else {
            return None;
        };
        let Value::Mapping(doc) = value else {
            return None;
        };

        if let Some(Value::String(include)) = doc.get(INCLUDE_KEY) {
            self.next_path = self.resolve_include(include, &path);
        }

        Some(Ok(doc))
    }
}

/// Whether the chain rooted at `root_file` enables the flotilla tool.
///
/// The first document in the chain that defines a `plugins` list under the
/// `lint` key decides; later documents cannot re-enable or disable it. An
/// exhausted chain answers false.
pub fn plugins_enabled(root_file: &Path) -> Result<bool, Error> {
    for doc in OptionsChain::new(root_file) {
        let doc = doc?;
        if let Some(plugins) = doc.get(LINT_KEY).and_then(|lint| lint.get(PLUGINS_KEY)) {
            let enabled = plugins
                .as_sequence()
                .is_some_and(|list| list.iter().any(|entry| entry.as_str() == Some(TOOL_NAME)));
            return Ok(enabled);
        }
    }
    Ok(false)
}
