//! Command implementations

pub mod host;
pub mod status;

use flotilla::core::Error;
use flotilla::util::GlobalContext;

use std::path::PathBuf;

/// Default the scan list to the working directory.
pub(crate) fn scan_paths(paths: Vec<PathBuf>, ctx: &GlobalContext) -> Vec<PathBuf> {
    if paths.is_empty() {
        vec![ctx.cwd().to_path_buf()]
    } else {
        paths
    }
}

/// Render a discovery/synthesis failure as a user-facing diagnostic.
pub(crate) fn fail(err: Error, color: bool) -> anyhow::Error {
    anyhow::anyhow!("{}", err.to_diagnostic().format(color))
}
