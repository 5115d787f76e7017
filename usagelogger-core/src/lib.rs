// usagelogger-core/src/lib.rs
//! # Usagelogger Core Library
//!
//! `usagelogger-core` captures HTTP request/response exchanges as ordered
//! name/value messages, filters and redacts them with a small line-oriented
//! rule language, and delivers the survivors to a collector or an in-process
//! queue.
//!
//! ## Modules
//!
//! * `rules`: the rule language, its compiler, canned rule sets and the `RuleSet` pipeline.
//! * `message`: the `Message` type and the builder turning request/response facts into pairs.
//! * `capture`: `BodyCapture`, a bounded observer for outbound bodies.
//! * `delivery`: `DeliveryPipeline`, compression, bounded concurrent POST and counters.
//! * `usage_loggers`: the process-wide enable/disable switch.
//! * `logger`: `HttpLogger`, tying rules and delivery together.
//! * `config`: YAML configuration files for `HttpLogger`.
//! * `errors`: the `LoggerError` type.
//!
//! ## Usage Example
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use usagelogger_core::{DeliveryTarget, HttpLogger, LoggerOptions, Message};
//!
//! # async fn run() -> Result<(), usagelogger_core::LoggerError> {
//! let queue = Arc::new(Mutex::new(Vec::<String>::new()));
//! let logger = HttpLogger::new(LoggerOptions {
//!     target: DeliveryTarget::Queue(queue.clone()),
//!     rules: Some("include standard".to_string()),
//!     ..Default::default()
//! })?;
//!
//! let mut message = Message::new();
//! message.push("request_body", "mail me at kurt@example.com");
//! logger.submit_if_passing(message).await;
//! assert!(queue.lock().unwrap()[0].contains("x@y.com"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Rule errors are returned as `LoggerError` when a logger is built. Delivery
//! never returns errors: failures are logged and counted.
//!
//! ---
//! License: MIT OR APACHE 2.0

pub mod capture;
pub mod config;
pub mod delivery;
pub mod errors;
pub mod logger;
pub mod message;
pub mod rules;
pub mod usage_loggers;

pub use capture::BodyCapture;
pub use config::LoggerConfig;
pub use delivery::{DeliveryPipeline, DeliverySettings, DeliveryTarget, MessageQueue};
pub use errors::{ErrorKind, LoggerError};
pub use logger::{is_string_content_type, HttpLogger, LoggerOptions};
pub use message::{HeaderValue, HttpRequestFacts, HttpResponseFacts, Message};
pub use rules::defaults::DefaultRules;
pub use rules::ruleset::RuleSet;
pub use rules::{HttpRule, RuleParam, Verb};
