// usagelogger/src/main.rs
//! usagelogger entry point.

use anyhow::Result;
use clap::Parser;
use std::io;

use usagelogger::cli::{Cli, Commands};
use usagelogger::commands::{apply::run_apply, check::run_check, submit::run_submit};
use usagelogger::logger;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init_logger(logger::level_from_flags(cli.debug, cli.quiet));

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match &cli.command {
        Commands::Check(cmd) => run_check(cmd, &mut out),
        Commands::Apply(cmd) => run_apply(cmd, &mut out),
        Commands::Submit(cmd) => run_submit(cmd, &mut out).await,
    }
}
