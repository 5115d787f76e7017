// usagelogger/src/commands/check.rs
//! `usagelogger check`: compile rules and summarise them.

use anyhow::Result;
use log::info;
use std::io::Write;

use usagelogger_core::{DefaultRules, RuleSet, Verb};

use crate::cli::CheckCommand;

pub fn run_check(cmd: &CheckCommand, out: &mut impl Write) -> Result<()> {
    let rules = RuleSet::new(cmd.rules.as_deref(), &DefaultRules::new())?;
    info!("Rules compiled.");
    write_summary(&rules, out)
}

/// Prints the rule count per verb followed by the flags.
pub fn write_summary(rules: &RuleSet, out: &mut impl Write) -> Result<()> {
    writeln!(out, "Compiled {} rules.", rules.len())?;
    for verb in Verb::ALL {
        let count = rules.rules_for(verb).len();
        if count > 0 {
            writeln!(out, "  {verb}: {count}")?;
        }
    }
    writeln!(out, "allow_http_url: {}", rules.allow_http_url())?;
    writeln!(out, "skip_compression: {}", rules.skip_compression())?;
    writeln!(out, "skip_submission: {}", rules.skip_submission())?;
    match rules.sample() {
        Some(percent) => writeln!(out, "sample: {percent}%")?,
        None => writeln!(out, "sample: none")?,
    }
    Ok(())
}
