// usagelogger/src/commands/submit.rs
//! `usagelogger submit`: send one message through an `HttpLogger`.

use anyhow::{Context, Result};
use log::{info, warn};
use std::env;
use std::io::Write;

use usagelogger_core::{usage_loggers, HttpLogger, LoggerConfig, LoggerOptions, Message};

use crate::cli::SubmitCommand;
use crate::commands::read_input;

/// Environment variable that disables every logger when set to exactly `true`.
pub const DISABLE_ENV: &str = "USAGE_LOGGERS_DISABLE";

/// Any value other than `true` leaves logging enabled.
pub fn hard_disabled(flag: bool, env_value: Option<&str>) -> bool {
    flag || env_value == Some("true")
}

pub async fn run_submit(cmd: &SubmitCommand, out: &mut impl Write) -> Result<()> {
    let env_value = env::var(DISABLE_ENV).ok();
    usage_loggers::set_hard_disabled(hard_disabled(cmd.disable_all, env_value.as_deref()));

    let mut options = match &cmd.config {
        Some(path) => LoggerConfig::load_from_file(path)?.into_options(),
        None => LoggerOptions::default(),
    };
    if cmd.rules.is_some() {
        options.rules = cmd.rules.clone();
    }
    if let Some(host) = &cmd.host {
        options.host = host.clone();
    }
    options.default_url = cmd.url.clone();

    let logger = HttpLogger::new(options).context("Failed to create logger")?;
    if !logger.is_enabled() {
        warn!("Logger is disabled; nothing will be submitted.");
        writeln!(out, "disabled")?;
        return Ok(());
    }

    let input = read_input(cmd.input.as_deref())?;
    let message = Message::from_json(input.trim()).context("Input is not a [[name, value], ...] message")?;
    logger.submit_if_passing(message).await;
    logger.drain().await;

    info!(
        "Submission finished: {} succeeded, {} failed.",
        logger.submit_successes(),
        logger.submit_failures()
    );
    writeln!(out, "submitted: {}", logger.submit_successes())?;
    writeln!(out, "failed: {}", logger.submit_failures())?;
    Ok(())
}
