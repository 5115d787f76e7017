// usagelogger/src/commands/mod.rs
//! Subcommand implementations. Each writes its report to the given writer.

pub mod apply;
pub mod check;
pub mod submit;

use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

/// Reads the whole input file, or stdin when no path is given.
pub fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file {}", path.display())),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read stdin")?;
            Ok(input)
        }
    }
}
