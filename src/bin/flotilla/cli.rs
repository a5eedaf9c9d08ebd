//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Flotilla - workspace aggregation and plugin-host synthesis for anchor
#[derive(Parser)]
#[command(name = "flotilla")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the discovered projects and their enabled plugins
    Status(StatusArgs),

    /// Synthesize the plugin-host manifest and fetch its dependencies
    Host(HostArgs),
}

#[derive(Args)]
pub struct StatusArgs {
    /// Directories to scan (defaults to the current directory)
    pub paths: Vec<PathBuf>,
}

#[derive(Args)]
pub struct HostArgs {
    /// Directories to scan (defaults to the current directory)
    pub paths: Vec<PathBuf>,

    /// Directory to write the host package into
    #[arg(long, default_value = ".flotilla")]
    pub out: PathBuf,

    /// Print the synthesized manifest instead of writing and fetching
    #[arg(long)]
    pub print: bool,
}
