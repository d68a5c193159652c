//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// jsongen - Generate native build JSON for Android ABIs with CMake
#[derive(Parser)]
#[command(name = "jsongen")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Project config file (defaults to .jsongen/config.toml)
    #[arg(long, global = true, env = "JSONGEN_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate build JSON for every ABI of a request
    Generate(GenerateArgs),

    /// Print the CMake arguments used for one ABI
    Args(ArgsArgs),

    /// Detect the CMake version and the strategy it selects
    Version(VersionArgs),
}

#[derive(Args)]
pub struct GenerateArgs {
    /// Build request file
    #[arg(default_value = "jsongen.toml")]
    pub request: PathBuf,

    /// Only generate these ABIs
    #[arg(long = "abi")]
    pub abis: Vec<String>,

    /// Number of ABIs generated in parallel
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Append telemetry records to this JSON lines file
    #[arg(long)]
    pub stats: Option<PathBuf>,

    /// CMake install directory
    #[arg(long)]
    pub cmake: Option<PathBuf>,
}

#[derive(Args)]
pub struct ArgsArgs {
    /// Build request file
    #[arg(default_value = "jsongen.toml")]
    pub request: PathBuf,

    /// ABI to print arguments for
    #[arg(long)]
    pub abi: String,

    /// CMake install directory
    #[arg(long)]
    pub cmake: Option<PathBuf>,

    /// Print every generation input as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct VersionArgs {
    /// CMake install directory
    #[arg(long)]
    pub cmake: Option<PathBuf>,
}
