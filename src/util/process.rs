//! Subprocess execution utilities.
//!
//! The package manager is an opaque external process. Everything that spawns
//! it goes through the [`ProcessRunner`] seam so tests can substitute a
//! recording mock instead of overriding process-wide state.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use anyhow::{Context, Result};

/// Captured outcome of a finished subprocess.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Exit code, if the process terminated normally.
    pub code: Option<i32>,
    /// Captured stdout, lossily decoded.
    pub stdout: String,
    /// Captured stderr, lossily decoded.
    pub stderr: String,
}

impl ProcessOutput {
    /// Whether the process exited with code zero.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// The seam through which external commands are invoked.
pub trait ProcessRunner: Send + Sync + std::fmt::Debug {
    /// Run `program` with `args` in `cwd`, capturing output.
    ///
    /// When `use_shell` is set the invocation is routed through the platform
    /// shell; some platforms install the package manager as a script that
    /// cannot be spawned directly.
    fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
        use_shell: bool,
    ) -> Result<ProcessOutput>;
}

/// [`ProcessRunner`] backed by `std::process`.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
        use_shell: bool,
    ) -> Result<ProcessOutput> {
        let builder = if use_shell {
            shell_builder(program, args)
        } else {
            ProcessBuilder::new(program).args(args)
        };
        let output = builder.cwd(cwd).exec()?;
        Ok(ProcessOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(windows)]
fn shell_builder(program: &str, args: &[String]) -> ProcessBuilder {
    ProcessBuilder::new("cmd").arg("/C").arg(program).args(args)
}

#[cfg(not(windows))]
fn shell_builder(program: &str, args: &[String]) -> ProcessBuilder {
    let mut line = vec![program.to_string()];
    line.extend(args.iter().cloned());
    ProcessBuilder::new("sh").arg("-c").arg(line.join(" "))
}

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Execute the command and wait for completion, capturing output.
    pub fn exec(&self) -> Result<Output> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        cmd.output()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_builder() {
        let output = ProcessBuilder::new("echo").arg("hello").exec().unwrap();

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("hello"));
    }

    #[test]
    fn test_system_runner_captures_output() {
        let runner = SystemRunner;
        let out = runner
            .run("echo", &["hi".to_string()], Path::new("."), false)
            .unwrap();
        assert!(out.success());
        assert!(out.stdout.contains("hi"));
    }
}
