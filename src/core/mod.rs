//! Core data structures for flotilla.
//!
//! This module contains the foundational types used throughout flotilla:
//! - Dependency declarations and their merge algebra
//! - Manifests and the package-location index
//! - Project / plugin modeling
//! - Workspace aggregation and host-manifest synthesis

pub mod declaration;
pub mod errors;
pub mod host;
pub mod manifest;
pub mod package_index;
pub mod project;
pub mod workspace;

pub use declaration::Declaration;
pub use errors::{Conflict, ConflictKind, Error};
pub use manifest::Manifest;
pub use package_index::PackageIndex;
pub use project::{Plugin, Project};
pub use workspace::{discover_roots, AnalysisRoot, Workspace};

/// Dependency manifest file name.
pub const MANIFEST_FILE: &str = "Anchor.toml";

/// Optional override sidecar next to the manifest.
pub const OVERRIDE_MANIFEST_FILE: &str = "Anchor.override.toml";

/// Package-location index written by the package manager, relative to the
/// manifest directory.
pub const PACKAGE_INDEX_FILE: &str = ".anchor/package-index.json";

/// Lint configuration file name.
pub const OPTIONS_FILE: &str = "lint.yaml";

/// Top-level key of the lint section in `lint.yaml`.
pub const LINT_KEY: &str = "lint";

/// Key of the plugins list under [`LINT_KEY`].
pub const PLUGINS_KEY: &str = "plugins";

/// Top-level include-directive key in `lint.yaml`.
pub const INCLUDE_KEY: &str = "include";

/// URI scheme of include directives pointing into installed packages.
pub const PACKAGE_SCHEME: &str = "package";

/// The name projects list under `plugins:` to opt in.
pub const TOOL_NAME: &str = "flotilla";

/// A package is a plugin iff it declares a regular dependency on this.
pub const PLUGIN_MARKER_PACKAGE: &str = "flotilla-core";

/// Presence of this package in any index switches the fetch command.
pub const FRAMEWORK_PACKAGE: &str = "capstan";

/// Default package-manager command.
pub const PM_COMMAND: &str = "anchor";

/// Framework-flavored package-manager command.
pub const FRAMEWORK_COMMAND: &str = "capstan";

/// Subcommand that fetches dependencies.
pub const FETCH_ARG: &str = "fetch";

/// Name of the synthesized host package.
pub const HOST_PACKAGE_NAME: &str = "flotilla-host";

/// Environment key carrying the runtime SDK requirement.
pub const ENVIRONMENT_SDK_KEY: &str = "sdk";

/// Baseline range emitted for the SDK environment entry.
pub const SDK_BASELINE_RANGE: &str = ">=1.0.0";
