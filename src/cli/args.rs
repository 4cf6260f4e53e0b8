//! CLI argument definitions using clap derive

use crate::package::PackageFormat;
use crate::resolver::{Arch, SourceFlavor};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// crossforge - reproducible from-source cross toolchains
///
/// Bootstraps a GNU cross-compilation toolchain (binutils, GCC, glibc,
/// kernel headers) from pinned upstream source archives.
#[derive(Parser, Debug)]
#[command(name = "crossforge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug; build output is shown at -v)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "CROSSFORGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Working directory for sources, scratch, and the install tree
    /// (defaults to the current directory)
    #[arg(short, long, global = true, env = "CROSSFORGE_WORKDIR")]
    pub workdir: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a cross toolchain end to end
    Build(BuildArgs),

    /// Resolve and print the pinned configuration without building
    Resolve(ResolveArgs),

    /// Check host prerequisites and mount privileges
    Status,

    /// Remove run-local scratch state from the working directory
    Clean(CleanArgs),
}

/// Arguments for the build command
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Target architecture
    #[arg(short, long, value_enum)]
    pub arch: Arch,

    /// GCC source lineage
    #[arg(short, long, value_enum, default_value = "official")]
    pub flavor: SourceFlavor,

    /// GCC major version to build (e.g. 10)
    #[arg(short = 'g', long = "gcc")]
    pub gcc: u32,

    /// Job-parallelism hint (default: CPU count + 1)
    #[arg(short, long)]
    pub jobs: Option<u32>,

    /// Keep scratch directories on persistent storage
    #[arg(long)]
    pub no_tmpfs: bool,

    /// Package the finished toolchain with this compression format
    #[arg(long, value_enum)]
    pub compress: Option<PackageFormat>,
}

/// Arguments for the resolve command
#[derive(Parser, Debug)]
pub struct ResolveArgs {
    /// Target architecture
    #[arg(short, long, value_enum)]
    pub arch: Arch,

    /// GCC source lineage
    #[arg(short, long, value_enum, default_value = "official")]
    pub flavor: SourceFlavor,

    /// GCC major version
    #[arg(short = 'g', long = "gcc")]
    pub gcc: u32,

    /// Output format
    #[arg(long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the clean command
#[derive(Parser, Debug)]
pub struct CleanArgs {
    /// Also remove the retained sources/ and prebuilts/ caches
    #[arg(long)]
    pub all: bool,
}

/// Output format for the resolve command
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable key/value listing
    Table,
    /// JSON output
    Json,
}
