//! `jsongen generate` command

use anyhow::{bail, Result};

use super::CommandContext;
use crate::cli::GenerateArgs;
use jsongen::ops::generate::{generate, GenerateOptions};
use jsongen::util::diagnostic::emit;

pub fn execute(args: GenerateArgs, ctx: &CommandContext) -> Result<()> {
    let opts = GenerateOptions {
        request: args.request,
        abis: args.abis,
        jobs: args.jobs,
        stats: args.stats,
        cmake: args.cmake,
    };

    let report = generate(&opts, &ctx.config, &ctx.shell)?;
    let color = ctx.shell.use_color();

    if let Some(err) = &report.aborted {
        emit(&err.root_cause().to_diagnostic(), color);
        bail!("could not generate build JSON for `{}`", report.variant);
    }

    let failed: Vec<_> = report.failed().collect();
    if !failed.is_empty() {
        for (_, err) in &failed {
            emit(&err.to_diagnostic(), color);
        }
        let names: Vec<&str> = failed.iter().map(|(abi, _)| *abi).collect();
        bail!(
            "build JSON generation failed for `{}`: {}",
            report.variant,
            names.join(", ")
        );
    }

    Ok(())
}
