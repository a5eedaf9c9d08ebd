//! Workspace - the top-level aggregate.
//!
//! A Workspace discovers candidate analysis roots, keeps the ones whose lint
//! configuration enables flotilla, builds their Projects concurrently, and
//! exposes manifest synthesis plus the package-manager invocation.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use walkdir::WalkDir;

use crate::core::errors::Error;
use crate::core::host;
use crate::core::package_index::PackageIndex;
use crate::core::project::{Plugin, Project};
use crate::core::{
    FETCH_ARG, FRAMEWORK_COMMAND, FRAMEWORK_PACKAGE, MANIFEST_FILE, OPTIONS_FILE,
    OVERRIDE_MANIFEST_FILE, PM_COMMAND,
};
use crate::options;
use crate::util::{fs, Caches, GlobalContext};

/// One surviving analysis root, with the other surviving roots that are its
/// path-prefix ancestors (for nested-root relationships).
#[derive(Debug, Clone)]
pub struct AnalysisRoot {
    /// The root directory.
    pub dir: PathBuf,
    /// Surviving roots that contain this one.
    pub ancestors: Vec<PathBuf>,
}

/// The discovered workspace: root projects plus the union of their enabled
/// plugins. Constructed once, then queried.
#[derive(Debug)]
pub struct Workspace {
    working_dir: PathBuf,
    /// Projects whose analysis root is their manifest directory.
    projects: Vec<Project>,
    /// Projects built from nested analysis roots. Not listed publicly, but
    /// their plugins and manifests still participate in synthesis.
    nested_projects: Vec<Project>,
    /// Every surviving analysis root, including non-root ones.
    roots: Vec<AnalysisRoot>,
    /// Distinct plugin names enabled anywhere.
    plugin_names: BTreeSet<String>,
    ctx: GlobalContext,
}

impl Workspace {
    /// Discover and build the workspace under `paths`.
    ///
    /// Project construction runs concurrently across roots; the shared
    /// caches are the only shared state, and the joint collect surfaces the
    /// first fatal error.
    pub fn build(paths: &[PathBuf], ctx: &GlobalContext) -> Result<Workspace, Error> {
        let candidates = discover_roots(paths, ctx.cwd());
        tracing::debug!("{} candidate root(s)", candidates.len());

        let mut eligible: Vec<PathBuf> = Vec::new();
        for dir in candidates {
            let Some(options_dir) = fs::find_ancestor_with(&dir, OPTIONS_FILE) else {
                tracing::debug!("{}: no lint configuration, skipping", dir.display());
                continue;
            };
            if options::plugins_enabled(&options_dir.join(OPTIONS_FILE))? {
                eligible.push(dir);
            } else {
                tracing::debug!("{}: flotilla not enabled, skipping", dir.display());
            }
        }

        let roots: Vec<AnalysisRoot> = eligible
            .iter()
            .map(|dir| AnalysisRoot {
                dir: dir.clone(),
                ancestors: eligible
                    .iter()
                    .filter(|other| *other != dir && dir.starts_with(other))
                    .cloned()
                    .collect(),
            })
            .collect();

        let caches = Caches::new();
        let built: Vec<Project> = roots
            .par_iter()
            .map(|root| Project::parse(&root.dir, ctx, &caches))
            .collect::<Result<_, Error>>()?;

        let plugin_names: BTreeSet<String> = built
            .iter()
            .flat_map(|project| project.plugins.iter().map(|plugin| plugin.name.clone()))
            .collect();

        let (projects, nested_projects): (Vec<Project>, Vec<Project>) =
            built.into_iter().partition(Project::is_project_root);

        tracing::info!(
            "workspace: {} project(s), {} plugin(s)",
            projects.len(),
            plugin_names.len()
        );

        Ok(Workspace {
            working_dir: ctx.cwd().to_path_buf(),
            projects,
            nested_projects,
            roots,
            plugin_names,
            ctx: ctx.clone(),
        })
    }

    /// The invoking user's working directory.
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// The root projects.
    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    /// Every surviving analysis root, including nested ones.
    pub fn roots(&self) -> &[AnalysisRoot] {
        &self.roots
    }

    /// Distinct plugin names enabled anywhere, sorted.
    pub fn plugin_names(&self) -> &BTreeSet<String> {
        &self.plugin_names
    }

    /// Every built project, root or nested. Synthesis merges across all of
    /// them so a plugin enabled only through a nested root is still honored.
    pub fn all_projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.iter().chain(self.nested_projects.iter())
    }

    /// Every plugin of every built project.
    pub fn plugins(&self) -> impl Iterator<Item = (&Project, &Plugin)> {
        self.all_projects()
            .flat_map(|project| project.plugins.iter().map(move |plugin| (project, plugin)))
    }

    /// Whether any project's package index carries the framework package.
    /// Decides which package-manager command variant to invoke.
    pub fn is_using_framework(&self) -> bool {
        self.all_projects()
            .any(|project| project.package_index.contains(FRAMEWORK_PACKAGE))
    }

    /// Build the synthetic host manifest satisfying every project.
    pub fn synthesize_manifest(&self) -> Result<String, Error> {
        host::synthesize_manifest(self)
    }

    /// Build the synthetic override manifest, if any project declares
    /// overrides.
    pub fn synthesize_override_manifest(&self) -> Result<Option<String>, Error> {
        host::synthesize_override_manifest(self)
    }

    /// Write the synthesized manifest(s) into `target_dir` and fetch the
    /// host's dependencies.
    pub fn resolve_plugin_host(&self, target_dir: &Path) -> anyhow::Result<()> {
        let manifest = self.synthesize_manifest()?;
        fs::write_string(&target_dir.join(MANIFEST_FILE), &manifest)?;

        if let Some(overrides) = self.synthesize_override_manifest()? {
            fs::write_string(&target_dir.join(OVERRIDE_MANIFEST_FILE), &overrides)?;
        }

        self.fetch_dependencies(target_dir)?;
        Ok(())
    }

    /// Invoke the package manager's fetch in `target_dir`.
    ///
    /// There is no timeout at this layer; a hung invocation blocks.
    pub fn fetch_dependencies(&self, target_dir: &Path) -> Result<(), Error> {
        let command = if self.is_using_framework() {
            FRAMEWORK_COMMAND
        } else {
            PM_COMMAND
        };
        tracing::info!("running `{} {}` in {}", command, FETCH_ARG, target_dir.display());

        let output = self
            .ctx
            .runner()
            .run(
                command,
                &[FETCH_ARG.to_string()],
                target_dir,
                self.ctx.shell_required(),
            )
            .map_err(|err| Error::PackageManager {
                command: command.to_string(),
                code: None,
                stdout: String::new(),
                stderr: format!("{err:#}"),
            })?;

        if !output.success() {
            return Err(Error::PackageManager {
                command: command.to_string(),
                code: output.code,
                stdout: output.stdout,
                stderr: output.stderr,
            });
        }
        Ok(())
    }
}

/// Recursively scan `paths` for analysis-root candidates: directories with a
/// manifest, or with a lint configuration next to a resolved package index.
pub fn discover_roots(paths: &[PathBuf], cwd: &Path) -> Vec<PathBuf> {
    let mut found = BTreeSet::new();
    for path in paths {
        let base = fs::normalize_path(&fs::absolutize(path, cwd));
        for entry in WalkDir::new(&base).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_dir() {
                continue;
            }
            let dir = entry.path();
            let has_manifest = dir.join(MANIFEST_FILE).is_file();
            let has_rooted_options = dir.join(OPTIONS_FILE).is_file() && PackageIndex::exists(dir);
            if has_manifest || has_rooted_options {
                found.insert(dir.to_path_buf());
            }
        }
    }
    found.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockRunner, WorkspaceFixture};
    use std::sync::Arc;

    fn build(fix: &WorkspaceFixture, cwd_project: &str) -> Workspace {
        let ctx = fix.context_for(cwd_project);
        Workspace::build(&[fix.root().to_path_buf()], &ctx).unwrap()
    }

    #[test]
    fn test_discovery_and_aggregation() {
        let fix = WorkspaceFixture::new();
        fix.plugin_package("lint-extra");
        fix.plugin_package("style-guard");
        fix.project("app").dependency("lint-extra", "\"^1.0.0\"").write();
        fix.project("tool")
            .dependency("lint-extra", "\"^1.2.0\"")
            .dev_dependency("style-guard", "\"^0.3.0\"")
            .write();
        // Opted out: no lint configuration at all.
        fix.project("silent").no_lint().write();
        // Opted out: flotilla not in the plugins list.
        fix.project("other").lint_plugins(&["other-tool"]).write();

        let ws = build(&fix, "app");
        let names: Vec<&str> = ws.projects().iter().map(|p| p.display_name()).collect();
        assert_eq!(names, ["app", "tool"]);
        assert_eq!(
            ws.plugin_names().iter().cloned().collect::<Vec<_>>(),
            ["lint-extra", "style-guard"]
        );
    }

    #[test]
    fn test_nested_roots_record_ancestors() {
        let fix = WorkspaceFixture::new();
        fix.plugin_package("lint-extra");
        fix.project("app").dependency("lint-extra", "\"^1.0.0\"").write();
        fix.project("app/nested")
            .dependency("lint-extra", "\"^1.0.0\"")
            .write();

        let ws = build(&fix, "app");
        let nested = ws
            .roots()
            .iter()
            .find(|root| root.dir.ends_with("nested"))
            .unwrap();
        assert_eq!(nested.ancestors.len(), 1);
        assert!(nested.ancestors[0].ends_with("app"));
    }

    #[test]
    fn test_framework_detection_switches_command() {
        let fix = WorkspaceFixture::new();
        fix.plugin_package("lint-extra");
        fix.project("app")
            .dependency("lint-extra", "\"^1.0.0\"")
            .index_entry(crate::core::FRAMEWORK_PACKAGE, &fix.pkg_dir("capstan"))
            .write();

        let runner = Arc::new(MockRunner::succeeding());
        let ctx = fix.context_for("app").with_runner(runner.clone());
        let ws = Workspace::build(&[fix.root().to_path_buf()], &ctx).unwrap();
        assert!(ws.is_using_framework());

        ws.fetch_dependencies(fix.root()).unwrap();
        let calls = runner.recorded();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, FRAMEWORK_COMMAND);
        assert_eq!(calls[0].1, vec![FETCH_ARG.to_string()]);
        assert!(!calls[0].3);
    }

    #[test]
    fn test_fetch_failure_embeds_output() {
        let fix = WorkspaceFixture::new();
        fix.plugin_package("lint-extra");
        fix.project("app").dependency("lint-extra", "\"^1.0.0\"").write();

        let runner = Arc::new(MockRunner::failing(65, "Resolving...", "solver failed"));
        let ctx = fix.context_for("app").with_runner(runner);
        let ws = Workspace::build(&[fix.root().to_path_buf()], &ctx).unwrap();

        let err = ws.fetch_dependencies(fix.root()).unwrap_err();
        match err {
            Error::PackageManager { command, code, stdout, stderr } => {
                assert_eq!(command, PM_COMMAND);
                assert_eq!(code, Some(65));
                assert_eq!(stdout, "Resolving...");
                assert_eq!(stderr, "solver failed");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_resolve_plugin_host_writes_manifest_then_fetches() {
        let fix = WorkspaceFixture::new();
        fix.plugin_package("lint-extra");
        fix.project("app").dependency("lint-extra", "\"^1.0.0\"").write();

        let runner = Arc::new(MockRunner::succeeding());
        let ctx = fix.context_for("app").with_runner(runner.clone());
        let ws = Workspace::build(&[fix.root().to_path_buf()], &ctx).unwrap();

        let target = fix.root().join("host");
        ws.resolve_plugin_host(&target).unwrap();

        let written = std::fs::read_to_string(target.join(MANIFEST_FILE)).unwrap();
        assert!(written.contains("flotilla-host"));
        assert!(written.contains("lint-extra"));

        let calls = runner.recorded();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, PM_COMMAND);
        assert_eq!(calls[0].2, target);
    }

    #[test]
    fn test_include_cycle_fails_build() {
        let fix = WorkspaceFixture::new();
        fix.plugin_package("lint-extra");
        let dir = fix.project("app").dependency("lint-extra", "\"^1.0.0\"").write();
        std::fs::write(dir.join(OPTIONS_FILE), "include: lint.yaml\n").unwrap();

        let ctx = fix.context_for("app");
        let err = Workspace::build(&[fix.root().to_path_buf()], &ctx).unwrap_err();
        assert!(matches!(err, Error::IncludeCycle { .. }));
    }
}
