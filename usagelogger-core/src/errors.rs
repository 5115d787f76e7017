//! errors.rs - Custom error types for the usagelogger-core library.
//!
//! Rule compilation errors are returned to the caller and make logger
//! construction fail. Compression and delivery errors never reach the caller:
//! the delivery pipeline logs them and counts them as failed submissions.
//!
//! License: MIT OR APACHE 2.0

use thiserror::Error;

/// Broad category of a [`LoggerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed rule line or delimited literal.
    Syntax,
    /// Well-formed rule with an unacceptable meaning (bad sample percent, duplicate sample).
    Semantic,
    /// Rule text could not be read from disk.
    Load,
    /// Message payload could not be compressed.
    Compression,
    /// Transport failure or unexpected collector status.
    Delivery,
}

/// All error types produced by the `usagelogger-core` library.
///
/// Marked `#[non_exhaustive]` so new variants can be added without breaking
/// downstream matches.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LoggerError {
    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    #[error("Invalid expression ({expression}) in rule: {rule}")]
    InvalidExpression { expression: String, rule: String },

    #[error("Invalid regex ({expression}) in rule: {rule}")]
    InvalidRegex {
        expression: String,
        rule: String,
        #[source]
        source: regex::Error,
    },

    #[error("Unescaped separator ({separator}) in rule: {rule}")]
    UnescapedSeparator { separator: char, rule: String },

    #[error("Invalid sample percent: {0}")]
    InvalidSamplePercent(String),

    #[error("Multiple sample rules")]
    MultipleSampleRules(usize),

    #[error("Failed to load rules: {path}")]
    RulesLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to compress message: {0}")]
    Compression(#[source] std::io::Error),

    #[error("Failed to deliver message: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Collector responded with unexpected status {0}")]
    UnexpectedStatus(u16),
}

impl LoggerError {
    /// Returns the category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LoggerError::InvalidRule(_)
            | LoggerError::InvalidExpression { .. }
            | LoggerError::InvalidRegex { .. }
            | LoggerError::UnescapedSeparator { .. } => ErrorKind::Syntax,
            LoggerError::InvalidSamplePercent(_) | LoggerError::MultipleSampleRules(_) => {
                ErrorKind::Semantic
            }
            LoggerError::RulesLoad { .. } => ErrorKind::Load,
            LoggerError::Compression(_) => ErrorKind::Compression,
            LoggerError::Transport(_) | LoggerError::UnexpectedStatus(_) => ErrorKind::Delivery,
        }
    }
}
