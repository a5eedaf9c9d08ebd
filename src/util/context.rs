//! Global context for flotilla operations.
//!
//! Carries the working directory and the two injectable seams: the process
//! runner and the platform shell flag. Nothing here is process-global; tests
//! construct their own context with a mock runner.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::util::process::{ProcessRunner, SystemRunner};

/// Shared context threaded through discovery and synthesis.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// The invoking user's working directory (their own project).
    cwd: PathBuf,

    /// How external commands are spawned.
    runner: Arc<dyn ProcessRunner>,

    /// Whether package-manager invocations must run through a shell.
    shell_required: bool,
}

impl GlobalContext {
    /// Create a context for the current working directory with the system
    /// process runner and platform defaults.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to determine current directory")?;
        Ok(Self::with_cwd(cwd))
    }

    /// Create a context rooted at `cwd` with platform defaults.
    pub fn with_cwd(cwd: PathBuf) -> Self {
        GlobalContext {
            cwd,
            runner: Arc::new(SystemRunner),
            shell_required: cfg!(windows),
        }
    }

    /// Substitute the process runner (tests).
    pub fn with_runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Override the shell flag (tests).
    pub fn with_shell_required(mut self, shell_required: bool) -> Self {
        self.shell_required = shell_required;
        self
    }

    /// The working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// The process runner.
    pub fn runner(&self) -> &Arc<dyn ProcessRunner> {
        &self.runner
    }

    /// Whether invocations must go through a shell.
    pub fn shell_required(&self) -> bool {
        self.shell_required
    }
}
