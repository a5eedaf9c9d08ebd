//! `flotilla status` command

use anyhow::Result;

use crate::cli::StatusArgs;
use flotilla::core::{Workspace, FRAMEWORK_COMMAND, PM_COMMAND};
use flotilla::util::process::find_executable;
use flotilla::util::{fs, GlobalContext};

use super::{fail, scan_paths};

pub fn execute(args: StatusArgs, color: bool) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let paths = scan_paths(args.paths, &ctx);

    let ws = Workspace::build(&paths, &ctx).map_err(|e| fail(e, color))?;

    println!("{} project(s) use flotilla", ws.projects().len());
    for project in ws.projects() {
        let rel = fs::relative_path(ws.working_dir(), &project.manifest_dir);
        println!("  {} ({})", project.display_name(), rel.display());
        for plugin in &project.plugins {
            println!("    plugin {} - {}", plugin.name, plugin.declaration);
        }
    }

    let command = if ws.is_using_framework() {
        println!("framework detected: dependency fetching will use `{FRAMEWORK_COMMAND}`");
        FRAMEWORK_COMMAND
    } else {
        PM_COMMAND
    };
    if find_executable(command).is_none() {
        println!("warning: `{command}` was not found on PATH");
    }

    // Dry-run the merge so conflicts show up without writing anything.
    ws.synthesize_manifest().map_err(|e| fail(e, color))?;
    println!("plugin constraints are mutually compatible");

    Ok(())
}
