//! `flotilla host` command

use anyhow::Result;

use crate::cli::HostArgs;
use flotilla::core::Workspace;
use flotilla::util::GlobalContext;

use super::{fail, scan_paths};

pub fn execute(args: HostArgs, color: bool) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let paths = scan_paths(args.paths, &ctx);

    let ws = Workspace::build(&paths, &ctx).map_err(|e| fail(e, color))?;

    if args.print {
        let manifest = ws.synthesize_manifest().map_err(|e| fail(e, color))?;
        print!("{manifest}");
        if let Some(overrides) = ws.synthesize_override_manifest().map_err(|e| fail(e, color))? {
            print!("\n# Anchor.override.toml\n{overrides}");
        }
        return Ok(());
    }

    let target = if args.out.is_absolute() {
        args.out
    } else {
        ctx.cwd().join(args.out)
    };

    ws.resolve_plugin_host(&target).map_err(|e| match e.downcast::<flotilla::core::Error>() {
        Ok(core) => fail(core, color),
        Err(other) => other,
    })?;

    eprintln!("    Resolved plugin host in {}", target.display());
    Ok(())
}
