//! Command implementations

pub mod args;
pub mod generate;
pub mod version;

use std::sync::Arc;

use anyhow::{bail, Result};

use crate::cli::Cli;
use jsongen::util::config::{global_config_path, load_config, project_config_path, Config};
use jsongen::util::shell::{ColorChoice, Shell};

/// State shared by every command.
pub struct CommandContext {
    pub shell: Arc<Shell>,
    pub config: Config,
}

impl CommandContext {
    pub fn new(cli: &Cli) -> Result<Self> {
        let color = if cli.no_color {
            ColorChoice::Never
        } else {
            ColorChoice::Auto
        };
        let shell = Arc::new(Shell::from_flags(cli.quiet, cli.verbose, color));

        let project_path = match &cli.config {
            Some(path) => {
                if !path.is_file() {
                    bail!("config file not found: {}", path.display());
                }
                path.clone()
            }
            None => project_config_path(&std::env::current_dir()?),
        };
        let config = load_config(global_config_path().as_deref(), &project_path);

        Ok(CommandContext { shell, config })
    }
}
