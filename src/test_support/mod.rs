//! Test fixtures and mocks for flotilla unit tests.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use tempfile::TempDir;

use crate::core::{
    MANIFEST_FILE, OPTIONS_FILE, OVERRIDE_MANIFEST_FILE, PACKAGE_INDEX_FILE, PLUGIN_MARKER_PACKAGE,
    TOOL_NAME,
};
use crate::util::process::{ProcessOutput, ProcessRunner};
use crate::util::GlobalContext;

/// A temporary directory laid out like a real multi-project workspace:
/// projects at the top level, installed packages under `pkgs/`.
#[derive(Debug)]
pub struct WorkspaceFixture {
    tmp: TempDir,
}

impl WorkspaceFixture {
    pub fn new() -> WorkspaceFixture {
        WorkspaceFixture {
            tmp: TempDir::new().expect("failed to create fixture dir"),
        }
    }

    /// The fixture root.
    pub fn root(&self) -> &Path {
        self.tmp.path()
    }

    /// Path of a project or package directory by name.
    pub fn dir(&self, name: &str) -> PathBuf {
        self.root().join(name)
    }

    /// Install location used for packages created by the fixture.
    pub fn pkg_dir(&self, name: &str) -> PathBuf {
        self.root().join("pkgs").join(name)
    }

    /// Create an installed package whose manifest declares the plugin
    /// marker dependency, making it an eligible plugin.
    pub fn plugin_package(&self, name: &str) -> PathBuf {
        self.package_raw(
            name,
            &format!(
                "[package]\nname = \"{name}\"\n\n[dependencies]\n{PLUGIN_MARKER_PACKAGE} = \"^1.0.0\"\n"
            ),
        )
    }

    /// Create an installed package that is not a plugin.
    pub fn package(&self, name: &str) -> PathBuf {
        self.package_raw(name, &format!("[package]\nname = \"{name}\"\n"))
    }

    /// Create an installed package with verbatim manifest content.
    pub fn package_raw(&self, name: &str, manifest: &str) -> PathBuf {
        let dir = self.pkg_dir(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(MANIFEST_FILE), manifest).unwrap();
        dir
    }

    /// Start building a project directory.
    pub fn project(&self, name: &str) -> ProjectBuilder<'_> {
        ProjectBuilder {
            fixture: self,
            name: name.to_string(),
            environment: Vec::new(),
            dependencies: Vec::new(),
            dev_dependencies: Vec::new(),
            overrides: Vec::new(),
            sidecar_overrides: Vec::new(),
            lint_plugins: Some(vec![TOOL_NAME.to_string()]),
            extra_index: Vec::new(),
        }
    }

    /// Overwrite a project's package index with explicit entries.
    pub fn write_index(&self, project: &str, entries: &[(&str, &Path)]) {
        write_index_file(&self.dir(project), entries);
    }

    /// A context whose working directory is the named project.
    pub fn context_for(&self, project: &str) -> GlobalContext {
        GlobalContext::with_cwd(self.dir(project)).with_shell_required(false)
    }
}

impl Default for WorkspaceFixture {
    fn default() -> Self {
        WorkspaceFixture::new()
    }
}

fn write_index_file(dir: &Path, entries: &[(&str, &Path)]) {
    let body: Vec<String> = entries
        .iter()
        .map(|(name, path)| format!(r#""{}": "{}""#, name, path.display()))
        .collect();
    let path = dir.join(PACKAGE_INDEX_FILE);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, format!(r#"{{"packages": {{{}}}}}"#, body.join(", "))).unwrap();
}

/// Builder for one project directory: manifest, lint configuration, and a
/// package index covering every declared dependency.
#[derive(Debug)]
pub struct ProjectBuilder<'a> {
    fixture: &'a WorkspaceFixture,
    name: String,
    environment: Vec<(String, String)>,
    dependencies: Vec<(String, String)>,
    dev_dependencies: Vec<(String, String)>,
    overrides: Vec<(String, String)>,
    sidecar_overrides: Vec<(String, String)>,
    lint_plugins: Option<Vec<String>>,
    extra_index: Vec<(String, PathBuf)>,
}

impl ProjectBuilder<'_> {
    /// Add a `[dependencies]` entry; `spec` is raw TOML (e.g. `"\"^1.0.0\""`).
    pub fn dependency(mut self, name: &str, spec: &str) -> Self {
        self.dependencies.push((name.to_string(), spec.to_string()));
        self
    }

    /// Add a `[dev-dependencies]` entry.
    pub fn dev_dependency(mut self, name: &str, spec: &str) -> Self {
        self.dev_dependencies.push((name.to_string(), spec.to_string()));
        self
    }

    /// Add an `[overrides]` entry.
    pub fn override_dep(mut self, name: &str, spec: &str) -> Self {
        self.overrides.push((name.to_string(), spec.to_string()));
        self
    }

    /// Add an entry to the `Anchor.override.toml` sidecar.
    pub fn sidecar_override(mut self, name: &str, spec: &str) -> Self {
        self.sidecar_overrides.push((name.to_string(), spec.to_string()));
        self
    }

    /// Add an `[environment]` entry.
    pub fn environment(mut self, key: &str, range: &str) -> Self {
        self.environment.push((key.to_string(), range.to_string()));
        self
    }

    /// Replace the default `plugins: [flotilla]` lint list.
    pub fn lint_plugins(mut self, plugins: &[&str]) -> Self {
        self.lint_plugins = Some(plugins.iter().map(|p| p.to_string()).collect());
        self
    }

    /// Write no lint configuration at all.
    pub fn no_lint(mut self) -> Self {
        self.lint_plugins = None;
        self
    }

    /// Add an extra package-index entry.
    pub fn index_entry(mut self, name: &str, path: &Path) -> Self {
        self.extra_index.push((name.to_string(), path.to_path_buf()));
        self
    }

    /// Write the project directory and return its path.
    pub fn write(self) -> PathBuf {
        let dir = self.fixture.dir(&self.name);
        std::fs::create_dir_all(&dir).unwrap();

        let mut manifest = format!("[package]\nname = \"{}\"\n", self.name);
        if !self.environment.is_empty() {
            manifest.push_str("\n[environment]\n");
            for (key, range) in &self.environment {
                manifest.push_str(&format!("{key} = \"{range}\"\n"));
            }
        }
        for (section, entries) in [
            ("dependencies", &self.dependencies),
            ("dev-dependencies", &self.dev_dependencies),
            ("overrides", &self.overrides),
        ] {
            if !entries.is_empty() {
                manifest.push_str(&format!("\n[{section}]\n"));
                for (name, spec) in entries {
                    manifest.push_str(&format!("{name} = {spec}\n"));
                }
            }
        }
        std::fs::write(dir.join(MANIFEST_FILE), manifest).unwrap();

        if !self.sidecar_overrides.is_empty() {
            let mut sidecar = String::from("[overrides]\n");
            for (name, spec) in &self.sidecar_overrides {
                sidecar.push_str(&format!("{name} = {spec}\n"));
            }
            std::fs::write(dir.join(OVERRIDE_MANIFEST_FILE), sidecar).unwrap();
        }

        if let Some(plugins) = &self.lint_plugins {
            let list = plugins
                .iter()
                .map(|p| format!("    - {p}"))
                .collect::<Vec<_>>()
                .join("\n");
            std::fs::write(
                dir.join(OPTIONS_FILE),
                format!("lint:\n  plugins:\n{list}\n"),
            )
            .unwrap();
        }

        // Index every declared dependency at the fixture's install location.
        let mut entries: Vec<(String, PathBuf)> = self
            .dependencies
            .iter()
            .chain(self.dev_dependencies.iter())
            .map(|(name, _)| (name.clone(), self.fixture.pkg_dir(name)))
            .collect();
        entries.extend(self.extra_index);
        let borrowed: Vec<(&str, &Path)> = entries
            .iter()
            .map(|(name, path)| (name.as_str(), path.as_path()))
            .collect();
        write_index_file(&dir, &borrowed);

        dir
    }
}

/// A [`ProcessRunner`] that records invocations and replays a canned
/// outcome.
#[derive(Debug)]
pub struct MockRunner {
    /// Recorded `(program, args, cwd, use_shell)` tuples.
    pub calls: Mutex<Vec<(String, Vec<String>, PathBuf, bool)>>,
    outcome: ProcessOutput,
}

impl MockRunner {
    /// A runner whose every invocation succeeds with empty output.
    pub fn succeeding() -> MockRunner {
        MockRunner {
            calls: Mutex::new(Vec::new()),
            outcome: ProcessOutput {
                code: Some(0),
                stdout: String::new(),
                stderr: String::new(),
            },
        }
    }

    /// A runner whose every invocation fails with the given outcome.
    pub fn failing(code: i32, stdout: &str, stderr: &str) -> MockRunner {
        MockRunner {
            calls: Mutex::new(Vec::new()),
            outcome: ProcessOutput {
                code: Some(code),
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            },
        }
    }

    /// Recorded invocations so far.
    pub fn recorded(&self) -> Vec<(String, Vec<String>, PathBuf, bool)> {
        self.calls.lock().unwrap().clone()
    }
}

impl ProcessRunner for MockRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
        use_shell: bool,
    ) -> Result<ProcessOutput> {
        self.calls.lock().unwrap().push((
            program.to_string(),
            args.to_vec(),
            cwd.to_path_buf(),
            use_shell,
        ));
        Ok(self.outcome.clone())
    }
}
