// usagelogger/src/cli.rs
//! Command line interface for the usagelogger tool.
//! License: MIT OR APACHE 2.0

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(
    name = "usagelogger",
    version = env!("CARGO_PKG_VERSION"),
    about = "Check usage-logging rules, apply them to messages and submit messages to a collector",
    arg_required_else_help = true,
)]
pub struct Cli {
    #[arg(long, short = 'q', global = true, help = "Suppress all log output.")]
    pub quiet: bool,

    #[arg(long, short = 'd', global = true, help = "Enable debug logging.")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compiles rules and prints a summary.
    Check(CheckCommand),
    /// Applies rules to one JSON message and prints the result.
    Apply(ApplyCommand),
    /// Submits one JSON message through a logger and prints the counters.
    Submit(SubmitCommand),
}

#[derive(Parser, Debug)]
pub struct CheckCommand {
    /// Rule text or `file://<path>`. The strict rules are used when absent.
    #[arg(long, short = 'r', value_name = "RULES")]
    pub rules: Option<String>,
}

#[derive(Parser, Debug)]
pub struct ApplyCommand {
    #[arg(long, short = 'r', value_name = "RULES", help = "Rule text or file://<path>.")]
    pub rules: Option<String>,

    /// File holding a `[[name, value], ...]` message (reads stdin if not provided).
    #[arg(long, short = 'i', value_name = "FILE")]
    pub input: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct SubmitCommand {
    /// Collector URL used when the config file names none.
    #[arg(long, env = "USAGE_LOGGERS_URL", value_name = "URL")]
    pub url: Option<String>,

    /// YAML logger configuration.
    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Rule text or `file://<path>`; overrides the config file.
    #[arg(long, short = 'r', value_name = "RULES")]
    pub rules: Option<String>,

    #[arg(long, short = 'i', value_name = "FILE", help = "Read the message from a file instead of stdin.")]
    pub input: Option<PathBuf>,

    /// Host name reported in the message trailer.
    #[arg(long, env = "HOSTNAME", value_name = "NAME")]
    pub host: Option<String>,

    /// Disable every logger in this process. `USAGE_LOGGERS_DISABLE=true` does the same.
    #[arg(long = "disable-all")]
    pub disable_all: bool,
}
