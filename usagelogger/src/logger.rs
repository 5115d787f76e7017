// usagelogger/src/logger.rs
//! Logger initialisation for the CLI.
//! License: MIT OR APACHE 2.0

use env_logger::{Builder, Env};
use log::LevelFilter;

/// Initialises `env_logger`. An explicit level overrides `RUST_LOG`; otherwise
/// `RUST_LOG` applies, defaulting to `warn`.
pub fn init_logger(level: Option<LevelFilter>) {
    let mut builder = Builder::from_env(Env::default().default_filter_or("warn"));
    if let Some(level) = level {
        builder.filter_level(level);
    }
    builder.format_timestamp(None).format_target(false);
    // A second initialisation (tests) is not an error worth reporting.
    let _ = builder.try_init();
}

/// Maps the global `--debug` / `--quiet` flags to a level. `--quiet` wins.
pub fn level_from_flags(debug: bool, quiet: bool) -> Option<LevelFilter> {
    if quiet {
        Some(LevelFilter::Off)
    } else if debug {
        Some(LevelFilter::Debug)
    } else {
        None
    }
}
