//! Flotilla - workspace aggregation and plugin-host synthesis for the
//! anchor package manager.
//!
//! This crate provides the core library functionality for flotilla:
//! discovering lint-enabled projects, resolving their plugin dependencies,
//! and merging every project's constraints into one synthetic host manifest.

pub mod core;
pub mod options;
pub mod resolver;
pub mod util;

/// Test utilities and mocks for flotilla unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides workspace fixtures and a recording process
/// runner.
#[cfg(test)]
pub mod test_support;

pub use crate::core::{
    declaration::Declaration, errors::Error, manifest::Manifest,
    package_index::PackageIndex, project::Project, workspace::Workspace,
};

pub use crate::util::context::GlobalContext;
