//! `jsongen version` command

use anyhow::{bail, Result};

use super::CommandContext;
use crate::cli::VersionArgs;
use jsongen::ops::version::detect;
use jsongen::util::diagnostic::emit;

pub fn execute(args: VersionArgs, ctx: &CommandContext) -> Result<()> {
    let report = detect(args.cmake.as_deref(), &ctx.config)?;

    println!("cmake {} ({})", report.version, report.cmake.root().display());

    match report.strategy {
        Ok(strategy) => {
            println!("strategy: {}", strategy);
            Ok(())
        }
        Err(err) => {
            emit(&err.to_diagnostic(), ctx.shell.use_color());
            bail!("CMake {} cannot generate build JSON", report.version);
        }
    }
}
