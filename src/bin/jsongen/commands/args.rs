//! `jsongen args` command

use anyhow::Result;

use super::CommandContext;
use crate::cli::ArgsArgs;
use jsongen::builder::strategy::GenerationStrategy;
use jsongen::ops::generate::{describe, GenerateOptions};

pub fn execute(args: ArgsArgs, ctx: &CommandContext) -> Result<()> {
    let opts = GenerateOptions {
        request: args.request,
        cmake: args.cmake,
        ..Default::default()
    };

    let inputs = describe(&opts, &ctx.config, &args.abi)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&inputs)?);
        return Ok(());
    }

    ctx.shell.note(format!("{} strategy", inputs.strategy));
    println!("{}", inputs.cmake.display());
    for arg in &inputs.arguments {
        println!("{}", arg);
    }

    // Sent over the protocol, not on the command line
    if inputs.strategy == GenerationStrategy::InteractiveServer {
        println!();
        for arg in &inputs.cache_arguments {
            println!("{}", arg);
        }
    }

    Ok(())
}
