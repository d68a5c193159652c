//! jsongen CLI - native build JSON for Android ABIs

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::CommandContext;

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("jsongen=debug")
    } else if cli.quiet {
        EnvFilter::new("jsongen=warn")
    } else {
        EnvFilter::new("jsongen=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let ctx = CommandContext::new(&cli)?;

    match cli.command {
        Commands::Generate(args) => commands::generate::execute(args, &ctx),
        Commands::Args(args) => commands::args::execute(args, &ctx),
        Commands::Version(args) => commands::version::execute(args, &ctx),
    }
}
