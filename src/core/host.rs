//! Host-manifest synthesis.
//!
//! Builds the `Anchor.toml` of the synthetic `flotilla-host` package: one
//! manifest whose dependency set is exactly the enabled plugins, constrained
//! so that every project's declaration is honored simultaneously. Merging is
//! a left fold through `Declaration::intersect`; the first incompatible pair
//! aborts with a conflict naming every declaring project.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use semver::VersionReq;
use toml_edit::{value, DocumentMut, InlineTable, Item, Table, Value};

use crate::core::declaration::Declaration;
use crate::core::errors::{Conflict, ConflictKind, Error};
use crate::core::project::Project;
use crate::core::workspace::Workspace;
use crate::core::{ENVIRONMENT_SDK_KEY, HOST_PACKAGE_NAME, SDK_BASELINE_RANGE};
use crate::resolver::range;
use crate::util::fs;

/// Render the synthetic host manifest.
pub fn synthesize_manifest(ws: &Workspace) -> Result<String, Error> {
    let mut doc = DocumentMut::new();

    let mut package = Table::new();
    package["name"] = value(HOST_PACKAGE_NAME);
    package["description"] = value("Generated plugin host. Do not edit by hand.");
    package["version"] = value("0.1.0");
    package["publish"] = value(false);
    doc.insert("package", Item::Table(package));

    let environment = merged_environment(ws)?;
    if !environment.is_empty() {
        let mut table = Table::new();
        for (key, baseline) in &environment {
            table[key.as_str()] = value(range::display_req(baseline));
        }
        doc.insert("environment", Item::Table(table));
    }

    let (dependencies, overrides) = merged_dependencies(ws)?;
    if !dependencies.is_empty() {
        let mut table = Table::new();
        for (name, declaration) in &dependencies {
            table[name.as_str()] = declaration_to_item(declaration, ws.working_dir());
        }
        doc.insert("dependencies", Item::Table(table));
    }
    if !overrides.is_empty() {
        let mut table = Table::new();
        for (name, declaration) in &overrides {
            table[name.as_str()] = declaration_to_item(declaration, ws.working_dir());
        }
        doc.insert("overrides", Item::Table(table));
    }

    tracing::debug!(
        "synthesized host manifest: {} dependencies, {} overrides",
        dependencies.len(),
        overrides.len()
    );
    Ok(doc.to_string())
}

/// Render the synthetic `Anchor.override.toml`, merging the overrides every
/// project declares (manifest `[overrides]` plus the sidecar file). `None`
/// when no project declares any.
pub fn synthesize_override_manifest(ws: &Workspace) -> Result<Option<String>, Error> {
    let mut collected: BTreeMap<String, Vec<(&Project, Declaration)>> = BTreeMap::new();
    for project in ws.all_projects() {
        let manifest_overrides = project.manifest.overrides.iter();
        let sidecar_overrides = project
            .override_manifest
            .iter()
            .flat_map(|sidecar| sidecar.iter());
        for (name, declaration) in manifest_overrides.chain(sidecar_overrides) {
            collected
                .entry(name.clone())
                .or_default()
                .push((project, declaration.clone()));
        }
    }

    if collected.is_empty() {
        return Ok(None);
    }

    let mut table = Table::new();
    for (name, declarations) in &collected {
        let merged = fold_declarations(ws, name, declarations, ConflictKind::Override)?;
        table[name.as_str()] = declaration_to_item(&merged, ws.working_dir());
    }

    let mut doc = DocumentMut::new();
    doc.insert("overrides", Item::Table(table));
    Ok(Some(doc.to_string()))
}

/// Union of environment keys with per-key conflict detection.
///
/// The emitted range is the baseline, not the computed intersection: the
/// host must not be stricter than any single project asked for. The
/// intersection is still computed so an unsatisfiable combination fails
/// loudly instead of producing a host no project can run.
fn merged_environment(ws: &Workspace) -> Result<BTreeMap<String, VersionReq>, Error> {
    let mut keys: BTreeSet<&String> = BTreeSet::new();
    for project in ws.all_projects() {
        keys.extend(project.manifest.environment.keys());
    }

    let mut out = BTreeMap::new();
    for key in keys {
        let baseline = environment_baseline(key);
        let mut merged = baseline.clone();
        let declaring: Vec<(&Project, &VersionReq)> = ws
            .all_projects()
            .filter_map(|project| {
                project
                    .manifest
                    .environment
                    .get(key)
                    .map(|range| (project, range))
            })
            .collect();

        for (_, range) in &declaring {
            if !range::intersects(&merged, range) {
                return Err(Error::IncompatibleConstraints {
                    kind: ConflictKind::Environment,
                    name: key.clone(),
                    conflicts: declaring
                        .iter()
                        .map(|(project, range)| {
                            conflict_entry(ws, project, &Declaration::hosted((*range).clone()))
                        })
                        .collect(),
                });
            }
            merged = range::req_intersection(&merged, range);
        }

        out.insert(key.clone(), baseline);
    }
    Ok(out)
}

fn environment_baseline(key: &str) -> VersionReq {
    if key == ENVIRONMENT_SDK_KEY {
        // The baseline is a constant; a parse failure here is unreachable.
        SDK_BASELINE_RANGE.parse().unwrap_or(VersionReq::STAR)
    } else {
        VersionReq::STAR
    }
}

/// Merge every plugin declaration per name. A name with at least one
/// override pin among the owning manifests is emitted unconstrained and the
/// merged pin moves to the `[overrides]` table.
fn merged_dependencies(
    ws: &Workspace,
) -> Result<(BTreeMap<String, Declaration>, BTreeMap<String, Declaration>), Error> {
    let mut dependencies = BTreeMap::new();
    let mut overrides = BTreeMap::new();

    for name in ws.plugin_names() {
        let mut declarations: Vec<(&Project, Declaration)> = Vec::new();
        let mut override_declarations: Vec<(&Project, Declaration)> = Vec::new();

        for (project, plugin) in ws.plugins() {
            if &plugin.name != name {
                continue;
            }
            declarations.push((project, plugin.declaration.clone()));
            if let Some(pinned) = plugin.owner_manifest.overrides.get(name) {
                override_declarations.push((project, pinned.clone()));
            }
        }

        if declarations.is_empty() {
            tracing::debug!("plugin `{}` has no declaration; skipping", name);
            continue;
        }

        if override_declarations.is_empty() {
            let merged = fold_declarations(ws, name, &declarations, ConflictKind::Dependency)?;
            dependencies.insert(name.clone(), merged);
        } else {
            // A pin takes precedence over every regular declaration, so the
            // dependency entry carries no constraint of its own.
            dependencies.insert(name.clone(), Declaration::any());
            let merged =
                fold_declarations(ws, name, &override_declarations, ConflictKind::Override)?;
            overrides.insert(name.clone(), merged);
        }
    }

    Ok((dependencies, overrides))
}

/// Left fold through `intersect`, first declaration as the accumulator.
fn fold_declarations(
    ws: &Workspace,
    name: &str,
    declarations: &[(&Project, Declaration)],
    kind: ConflictKind,
) -> Result<Declaration, Error> {
    let mut iter = declarations.iter();
    let Some((_, first)) = iter.next() else {
        return Ok(Declaration::any());
    };
    let mut merged = first.clone();
    for (_, declaration) in iter {
        merged = merged.intersect(declaration).ok_or_else(|| {
            Error::IncompatibleConstraints {
                kind,
                name: name.to_string(),
                conflicts: declarations
                    .iter()
                    .map(|(project, declaration)| conflict_entry(ws, project, declaration))
                    .collect(),
            }
        })?;
    }
    Ok(merged)
}

fn conflict_entry(ws: &Workspace, project: &Project, declaration: &Declaration) -> Conflict {
    Conflict {
        project: project.display_name().to_string(),
        path: fs::relative_path(ws.working_dir(), &project.manifest_dir),
        declaration: declaration.describe(),
    }
}

/// Render a declaration as a TOML item: a bare version string for default
/// hosted declarations, an inline table otherwise. Path declarations are
/// rewritten relative to `base` (the invoking working directory).
fn declaration_to_item(declaration: &Declaration, base: &Path) -> Item {
    match declaration {
        Declaration::Hosted {
            registry: None,
            range,
        } => value(range::display_req(range)),

        Declaration::Hosted {
            registry: Some(registry),
            range,
        } => {
            let mut table = InlineTable::new();
            table.insert("version", range::display_req(range).into());
            table.insert("registry", registry.to_string().into());
            Item::Value(Value::InlineTable(table))
        }

        Declaration::Path { path } => {
            let mut table = InlineTable::new();
            let rendered = fs::relative_path(base, path);
            table.insert("path", rendered.display().to_string().into());
            Item::Value(Value::InlineTable(table))
        }

        Declaration::SourceControl {
            url,
            reference,
            subdir,
        } => {
            let mut table = InlineTable::new();
            table.insert("git", url.to_string().into());
            if let Some(reference) = reference {
                table.insert("ref", reference.as_str().into());
            }
            if let Some(subdir) = subdir {
                table.insert("subdir", subdir.display().to_string().into());
            }
            Item::Value(Value::InlineTable(table))
        }

        Declaration::Sdk { name } => {
            let mut table = InlineTable::new();
            table.insert("sdk", name.as_str().into());
            Item::Value(Value::InlineTable(table))
        }
    }
}
