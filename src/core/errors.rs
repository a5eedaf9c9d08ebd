//! Error taxonomy for discovery and synthesis.
//!
//! Every variant is cheap to clone: the manifest cache stores failures and
//! replays them identically on later lookups for the same directory.

use std::path::PathBuf;

use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// Where a constraint conflict was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Two owners declare mutually-exclusive versions of one dependency.
    Dependency,
    /// Two projects declare mutually-exclusive environment ranges.
    Environment,
    /// Two owners declare mutually-exclusive override pins.
    Override,
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictKind::Dependency => write!(f, "dependency"),
            ConflictKind::Environment => write!(f, "environment"),
            ConflictKind::Override => write!(f, "override"),
        }
    }
}

/// One side of a constraint conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// Display name of the owning project.
    pub project: String,
    /// Owning project path, relative to the working directory.
    pub path: PathBuf,
    /// The declaration, rendered via `Declaration::describe`.
    pub declaration: String,
}

/// Error during workspace discovery or manifest synthesis.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The include chain revisited a file.
    #[error("include cycle: {path} was already visited in this chain")]
    IncludeCycle {
        /// The first re-visited file.
        path: PathBuf,
    },

    /// No manifest exists in the directory or any of its ancestors.
    #[error("no Anchor.toml found in {dir} or any ancestor directory")]
    ManifestNotFound {
        /// Where the upward search started.
        dir: PathBuf,
    },

    /// The manifest exists but could not be parsed.
    #[error("failed to parse Anchor.toml in {dir}: {message}")]
    ManifestParse {
        /// Directory holding the manifest.
        dir: PathBuf,
        /// Underlying parse failure.
        message: String,
    },

    /// The package-location index is missing, unreadable, or malformed.
    #[error("failed to load package index in {dir}: {message}")]
    PackageIndexParse {
        /// Directory holding the `.anchor` sidecar.
        dir: PathBuf,
        /// Underlying failure.
        message: String,
    },

    /// A declared dependency has no entry in the resolved package index.
    #[error("dependency `{dependency}` is missing from the package index in {dir}; has `anchor fetch` been run?")]
    PluginNotFound {
        /// The dependency name.
        dependency: String,
        /// The directory whose index was consulted.
        dir: PathBuf,
    },

    /// Two or more owners declare mutually-exclusive constraints.
    #[error("incompatible {kind} constraints for `{name}`")]
    IncompatibleConstraints {
        /// Dependency, environment, or override conflict.
        kind: ConflictKind,
        /// The dependency name or environment key.
        name: String,
        /// Every conflicting declaration with its owner.
        conflicts: Vec<Conflict>,
    },

    /// The external package manager exited non-zero.
    #[error("`{command} fetch` failed with exit code {code:?}\nstdout:\n{stdout}\nstderr:\n{stderr}")]
    PackageManager {
        /// The command that was invoked.
        command: String,
        /// Exit code, if the process terminated normally.
        code: Option<i32>,
        /// Captured stdout, verbatim.
        stdout: String,
        /// Captured stderr, verbatim.
        stderr: String,
    },
}

impl Error {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Error::IncludeCycle { path } => {
                Diagnostic::error("include cycle in lint configuration")
                    .with_location(path.clone())
                    .with_context(format!("{} includes itself, directly or transitively", path.display()))
            }

            Error::ManifestNotFound { dir } => Diagnostic::error(self.to_string())
                .with_location(dir.clone())
                .with_suggestion(suggestions::NO_MANIFEST),

            Error::ManifestParse { dir, message } => Diagnostic::error(self.to_string())
                .with_location(dir.clone())
                .with_context(message.clone()),

            Error::PackageIndexParse { dir, message } => Diagnostic::error(self.to_string())
                .with_location(dir.clone())
                .with_context(message.clone())
                .with_suggestion(suggestions::RUN_FETCH),

            Error::PluginNotFound { dependency, dir } => {
                Diagnostic::error(format!("dependency `{}` not found in package index", dependency))
                    .with_location(dir.clone())
                    .with_suggestion(suggestions::RUN_FETCH)
            }

            Error::IncompatibleConstraints { kind, name, conflicts } => {
                let mut diag =
                    Diagnostic::error(format!("incompatible {} constraints for `{}`", kind, name));
                for conflict in conflicts {
                    diag = diag.with_context(format!(
                        "`{}` ({}) declares {}",
                        conflict.project,
                        conflict.path.display(),
                        conflict.declaration
                    ));
                }
                diag.with_suggestion(suggestions::ALIGN_CONSTRAINTS)
            }

            Error::PackageManager { command, code, stderr, .. } => {
                Diagnostic::error(format!("`{} fetch` failed with exit code {:?}", command, code))
                    .with_context(stderr.trim_end().to_string())
            }
        }
    }
}
