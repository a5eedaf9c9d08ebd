//! Anchor.toml manifest parsing and schema.
//!
//! The manifest is the dependency-declaration document of one sub-project:
//! a name, an `[environment]` table of runtime requirements, and three
//! name-keyed dependency tables (`[dependencies]`, `[dev-dependencies]`,
//! `[overrides]`). An optional `Anchor.override.toml` sidecar pins
//! resolutions regardless of ranges.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use semver::VersionReq;
use serde::Deserialize;
use url::Url;

use crate::core::declaration::Declaration;
use crate::core::errors::Error;
use crate::core::{MANIFEST_FILE, OVERRIDE_MANIFEST_FILE};
use crate::resolver::range;
use crate::util::fs;

/// A parsed Anchor.toml.
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Package name.
    pub name: String,

    /// Environment requirements (e.g. the `sdk` key), keyed by name.
    pub environment: BTreeMap<String, VersionReq>,

    /// Regular dependencies.
    pub dependencies: HashMap<String, Declaration>,

    /// Dev-only dependencies.
    pub dev_dependencies: HashMap<String, Declaration>,

    /// Forced resolutions.
    pub overrides: HashMap<String, Declaration>,

    /// The directory containing this manifest.
    pub manifest_dir: PathBuf,
}

impl Manifest {
    /// Parse the manifest in `dir`.
    pub fn load(dir: &Path) -> Result<Manifest, Error> {
        let path = dir.join(MANIFEST_FILE);
        read_manifest(&path, dir).map_err(|err| Error::ManifestParse {
            dir: dir.to_path_buf(),
            message: format!("{:#}", err),
        })
    }

    /// Parse the optional override sidecar in `dir`. An absent file is
    /// `None`; a malformed file is an error.
    pub fn load_overrides(dir: &Path) -> Result<Option<HashMap<String, Declaration>>, Error> {
        let path = dir.join(OVERRIDE_MANIFEST_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        read_overrides(&path, dir)
            .map(Some)
            .map_err(|err| Error::ManifestParse {
                dir: dir.to_path_buf(),
                message: format!("{:#}", err),
            })
    }

    /// Regular and dev dependencies, chained.
    pub fn all_dependencies(&self) -> impl Iterator<Item = (&String, &Declaration)> {
        self.dependencies.iter().chain(self.dev_dependencies.iter())
    }

    /// Look up one name across regular and dev dependencies.
    pub fn dependency(&self, name: &str) -> Option<&Declaration> {
        self.dependencies
            .get(name)
            .or_else(|| self.dev_dependencies.get(name))
    }
}

fn read_manifest(path: &Path, dir: &Path) -> Result<Manifest> {
    let text = fs::read_to_string(path)?;
    let schema: ManifestSchema =
        toml::from_str(&text).with_context(|| format!("invalid manifest: {}", path.display()))?;
    schema.into_manifest(dir)
}

fn read_overrides(path: &Path, dir: &Path) -> Result<HashMap<String, Declaration>> {
    let text = fs::read_to_string(path)?;
    let schema: OverrideSchema = toml::from_str(&text)
        .with_context(|| format!("invalid override manifest: {}", path.display()))?;
    convert_dependency_table(&schema.overrides, dir)
}

/// On-disk schema of Anchor.toml.
#[derive(Debug, Deserialize)]
struct ManifestSchema {
    package: PackageSchema,

    #[serde(default)]
    environment: BTreeMap<String, String>,

    #[serde(default)]
    dependencies: HashMap<String, DependencySpec>,

    #[serde(default, rename = "dev-dependencies")]
    dev_dependencies: HashMap<String, DependencySpec>,

    #[serde(default)]
    overrides: HashMap<String, DependencySpec>,
}

#[derive(Debug, Deserialize)]
struct PackageSchema {
    name: String,
}

/// On-disk schema of Anchor.override.toml.
#[derive(Debug, Deserialize)]
struct OverrideSchema {
    #[serde(default)]
    overrides: HashMap<String, DependencySpec>,
}

impl ManifestSchema {
    fn into_manifest(self, dir: &Path) -> Result<Manifest> {
        let mut environment = BTreeMap::new();
        for (key, value) in &self.environment {
            let req = range::parse_req(value)
                .with_context(|| format!("invalid environment range for `{}`: {}", key, value))?;
            environment.insert(key.clone(), req);
        }

        Ok(Manifest {
            name: self.package.name,
            environment,
            dependencies: convert_dependency_table(&self.dependencies, dir)?,
            dev_dependencies: convert_dependency_table(&self.dev_dependencies, dir)?,
            overrides: convert_dependency_table(&self.overrides, dir)?,
            manifest_dir: dir.to_path_buf(),
        })
    }
}

fn convert_dependency_table(
    table: &HashMap<String, DependencySpec>,
    dir: &Path,
) -> Result<HashMap<String, Declaration>> {
    table
        .iter()
        .map(|(name, spec)| Ok((name.clone(), spec.to_declaration(name, dir)?)))
        .collect()
}

/// Dependency specification as it appears in Anchor.toml.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DependencySpec {
    /// Simple version string: `foo = "^1.0"` (or the literal `any`).
    Simple(String),

    /// Detailed specification.
    Detailed(DetailedDependencySpec),
}

/// Detailed dependency specification.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetailedDependencySpec {
    /// Version requirement (hosted).
    #[serde(default)]
    pub version: Option<String>,

    /// Registry URL (uses the default registry if not specified).
    #[serde(default)]
    pub registry: Option<String>,

    /// Path to a local dependency.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Source-control repository URL.
    #[serde(default)]
    pub git: Option<String>,

    /// Source-control reference (branch, tag, or revision).
    #[serde(default, rename = "ref")]
    pub reference: Option<String>,

    /// Sub-path within the repository.
    #[serde(default)]
    pub subdir: Option<PathBuf>,

    /// SDK identifier.
    #[serde(default)]
    pub sdk: Option<String>,
}

impl DependencySpec {
    /// Convert to a Declaration given the dependency name and the directory
    /// of the declaring manifest.
    pub fn to_declaration(&self, name: &str, manifest_dir: &Path) -> Result<Declaration> {
        match self {
            DependencySpec::Simple(version) => {
                let req = range::parse_req(version)
                    .with_context(|| format!("invalid version for `{}`: {}", name, version))?;
                Ok(Declaration::hosted(req))
            }
            DependencySpec::Detailed(spec) => spec.to_declaration(name, manifest_dir),
        }
    }
}

impl DetailedDependencySpec {
    /// Convert to a Declaration.
    pub fn to_declaration(&self, name: &str, manifest_dir: &Path) -> Result<Declaration> {
        if let Some(ref path) = self.path {
            return Ok(Declaration::path(path, manifest_dir));
        }

        if let Some(ref git) = self.git {
            let url = Url::parse(git)
                .with_context(|| format!("invalid git url for `{}`: {}", name, git))?;
            return Ok(Declaration::SourceControl {
                url,
                reference: self.reference.clone(),
                subdir: self.subdir.clone(),
            });
        }

        if let Some(ref sdk) = self.sdk {
            return Ok(Declaration::Sdk { name: sdk.clone() });
        }

        if self.registry.is_some() || self.version.is_some() {
            let registry = match self.registry {
                Some(ref url) => Some(
                    Url::parse(url)
                        .with_context(|| format!("invalid registry url for `{}`: {}", name, url))?,
                ),
                None => None,
            };
            let req = match self.version {
                Some(ref v) => range::parse_req(v)
                    .with_context(|| format!("invalid version for `{}`: {}", name, v))?,
                None => VersionReq::STAR,
            };
            return Ok(Declaration::Hosted {
                registry,
                range: req,
            });
        }

        bail!(
            "dependency `{}` must specify `path`, `git`, `sdk`, `registry`, or `version`",
            name
        );
    }
}
