//! Project and plugin modeling.
//!
//! A `Project` is one analysis root: its manifest, its resolved
//! package-location index, and the plugins it enables. A `Plugin` is one of
//! the project's dependencies that itself depends on the plugin marker
//! package. Both are immutable value objects built during discovery.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;

use crate::core::declaration::Declaration;
use crate::core::errors::Error;
use crate::core::manifest::Manifest;
use crate::core::package_index::PackageIndex;
use crate::core::MANIFEST_FILE;
use crate::util::{fs, Caches, GlobalContext};

/// One analysis root and everything parsed out of it.
#[derive(Debug, Clone)]
pub struct Project {
    /// The analysis root directory.
    pub root: PathBuf,

    /// The directory that actually contains the manifest. Differs from
    /// `root` when the lint configuration lives below the package root.
    pub manifest_dir: PathBuf,

    /// The owning manifest.
    pub manifest: Arc<Manifest>,

    /// Forced resolutions from the `Anchor.override.toml` sidecar, if any.
    pub override_manifest: Option<Arc<std::collections::HashMap<String, Declaration>>>,

    /// The resolved package-location index, consumed read-only.
    pub package_index: Arc<PackageIndex>,

    /// The plugins this project enables, ordered by name.
    pub plugins: Vec<Plugin>,
}

/// One enabled plugin of a project.
#[derive(Debug, Clone)]
pub struct Plugin {
    /// Plugin package name.
    pub name: String,

    /// Where the package manager installed it.
    pub install_dir: PathBuf,

    /// The plugin's own manifest.
    pub manifest: Arc<Manifest>,

    /// The declaration the owning project used to reach it.
    pub declaration: Declaration,

    /// Back-reference to the owning project's manifest.
    pub owner_manifest: Arc<Manifest>,

    /// Back-reference to the owning project's package index.
    pub owner_index: Arc<PackageIndex>,
}

impl Project {
    /// Parse one analysis root into a Project.
    ///
    /// The manifest directory is found by walking upward from the root. The
    /// project's manifest, override sidecar, and package index are all fatal
    /// on failure, as are the working directory's own manifest and index:
    /// a broken invoking project means nothing downstream can be trusted.
    /// Dependencies that are not plugins are silently dropped.
    pub fn parse(root: &Path, ctx: &GlobalContext, caches: &Caches) -> Result<Project, Error> {
        let root = fs::normalize_path(root);
        let manifest_dir =
            fs::find_ancestor_with(&root, MANIFEST_FILE).ok_or(Error::ManifestNotFound {
                dir: root.clone(),
            })?;

        let manifest = caches.manifests.parse(&manifest_dir)?;
        let override_manifest = Manifest::load_overrides(&manifest_dir)?.map(Arc::new);
        let package_index = Arc::new(PackageIndex::load(&manifest_dir)?);

        // The invoking user's own project must parse and be fetched too.
        caches.manifests.parse(ctx.cwd())?;
        PackageIndex::load(ctx.cwd())?;

        let plugins = resolve_plugins(&manifest, &package_index, caches)?;

        tracing::debug!(
            "parsed project `{}` at {} ({} plugin(s))",
            manifest.name,
            manifest_dir.display(),
            plugins.len()
        );

        Ok(Project {
            root,
            manifest_dir,
            manifest,
            override_manifest,
            package_index,
            plugins,
        })
    }

    /// True iff the analysis root is the directory holding the manifest,
    /// i.e. the lint configuration was not found via an ancestor walk.
    pub fn is_project_root(&self) -> bool {
        self.root == self.manifest_dir
    }

    /// Display name for conflict reports.
    pub fn display_name(&self) -> &str {
        &self.manifest.name
    }
}

/// Resolve every regular + dev dependency of `manifest` to a plugin, or drop
/// it when it is not one. Resolution runs concurrently across names; a
/// dependency missing from the index fails the joint operation.
fn resolve_plugins(
    manifest: &Arc<Manifest>,
    index: &Arc<PackageIndex>,
    caches: &Caches,
) -> Result<Vec<Plugin>, Error> {
    let mut names: Vec<(&String, &Declaration)> = manifest.all_dependencies().collect();
    names.sort_by_key(|(name, _)| name.as_str());

    let resolved: Vec<Option<Plugin>> = names
        .par_iter()
        .map(|(name, declaration)| {
            let install_dir = index.locate(name).ok_or_else(|| Error::PluginNotFound {
                dependency: (*name).clone(),
                dir: index.dir().to_path_buf(),
            })?;

            if !caches.plugins.is_plugin(install_dir, &caches.manifests) {
                return Ok(None);
            }

            // Eligibility held, so the manifest is cached and parses.
            let plugin_manifest = caches.manifests.parse(install_dir)?;
            Ok(Some(Plugin {
                name: (*name).clone(),
                install_dir: install_dir.to_path_buf(),
                manifest: plugin_manifest,
                declaration: (*declaration).clone(),
                owner_manifest: Arc::clone(manifest),
                owner_index: Arc::clone(index),
            }))
        })
        .collect::<Result<_, Error>>()?;

    Ok(resolved.into_iter().flatten().collect())
}
