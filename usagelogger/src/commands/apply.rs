// usagelogger/src/commands/apply.rs
//! `usagelogger apply`: run one message through the rules.

use anyhow::{Context, Result};
use log::debug;
use std::io::Write;

use usagelogger_core::{DefaultRules, Message, RuleSet};

use crate::cli::ApplyCommand;
use crate::commands::read_input;

pub fn run_apply(cmd: &ApplyCommand, out: &mut impl Write) -> Result<()> {
    let rules = RuleSet::new(cmd.rules.as_deref(), &DefaultRules::new())?;
    let input = read_input(cmd.input.as_deref())?;
    apply_to(&rules, &input, out)
}

/// Prints the filtered message as JSON, or `dropped`.
pub fn apply_to(rules: &RuleSet, input: &str, out: &mut impl Write) -> Result<()> {
    let message = Message::from_json(input.trim()).context("Input is not a [[name, value], ...] message")?;
    debug!("Applying {} rules to a message with {} fields.", rules.len(), message.len());
    match rules.apply(message) {
        Some(message) => writeln!(out, "{}", message.to_json())?,
        None => writeln!(out, "dropped")?,
    }
    Ok(())
}
