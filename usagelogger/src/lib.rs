// usagelogger/src/lib.rs
//! # Usagelogger CLI
//!
//! Command line front end for `usagelogger-core`: checks rule files, applies
//! rules to a single message and submits messages to a collector.
//!
//! Process-wide settings (`USAGE_LOGGERS_URL`, `USAGE_LOGGERS_DISABLE`) are read
//! here, once, and handed to the core as plain values.

pub mod cli;
pub mod commands;
pub mod logger;
