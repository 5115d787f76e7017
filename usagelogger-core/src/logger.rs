//! logger.rs - `HttpLogger`, which ties compiled rules to a delivery pipeline.
//!
//! License: MIT OR APACHE 2.0

use std::sync::Arc;
use std::time::Duration;

use lazy_static::lazy_static;
use log::info;
use regex::{Regex, RegexBuilder};

use crate::delivery::{DeliveryPipeline, DeliverySettings, DeliveryTarget, DEFAULT_MAX_IN_FLIGHT};
use crate::errors::LoggerError;
use crate::message::{self, HttpRequestFacts, HttpResponseFacts, Message, Trailer};
use crate::rules::defaults::DefaultRules;
use crate::rules::ruleset::RuleSet;
use crate::rules::Verb;

/// Agent name reported by loggers built from this crate.
pub const AGENT: &str = "http_logger.rs";

lazy_static! {
    static ref STRING_CONTENT_TYPE: Regex =
        RegexBuilder::new(r"^(text/(html|plain|xml))|(application/(json|soap|xml|x-www-form-urlencoded))")
            .case_insensitive(true)
            .build()
            .unwrap();
}

/// Construction options for [`HttpLogger`].
#[derive(Debug, Clone)]
pub struct LoggerOptions {
    pub target: DeliveryTarget,
    /// Rule text, or `file://<path>`. Blank or absent means the default rules.
    pub rules: Option<String>,
    /// Holder consulted for blank rules and `include default`; a fresh strict
    /// holder is used when absent.
    pub default_rules: Option<Arc<DefaultRules>>,
    /// URL used with [`DeliveryTarget::Default`].
    pub default_url: Option<String>,
    pub enabled: bool,
    pub max_in_flight: usize,
    pub agent: String,
    pub host: String,
    pub version: String,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            target: DeliveryTarget::Default,
            rules: None,
            default_rules: None,
            default_url: None,
            enabled: true,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            agent: AGENT.to_string(),
            host: "unknown".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Usage logger for HTTP request/response exchanges.
#[derive(Debug)]
pub struct HttpLogger {
    rules: RuleSet,
    pipeline: DeliveryPipeline,
    agent: String,
    host: String,
    version: String,
}

impl HttpLogger {
    /// Compiles the rules and builds the delivery pipeline.
    ///
    /// Fails only on rule errors; a bad destination gives a disabled logger.
    pub fn new(options: LoggerOptions) -> Result<Self, LoggerError> {
        let defaults = options.default_rules.unwrap_or_else(|| Arc::new(DefaultRules::new()));
        let rules = RuleSet::new(options.rules.as_deref(), &defaults)?;

        let settings = DeliverySettings {
            enabled: options.enabled,
            allow_http_url: rules.allow_http_url(),
            skip_compression: rules.skip_compression(),
            skip_submission: rules.skip_submission(),
            max_in_flight: options.max_in_flight,
            agent: options.agent.clone(),
            version: options.version.clone(),
        };
        let pipeline = DeliveryPipeline::new(options.target, options.default_url.as_deref(), settings);
        info!(
            "HttpLogger created with {} rules (enabled: {}, url: {:?}, queue: {}).",
            rules.len(),
            pipeline.is_enabled(),
            pipeline.url(),
            pipeline.has_queue()
        );

        Ok(Self { rules, pipeline, agent: options.agent, host: options.host, version: options.version })
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn pipeline(&self) -> &DeliveryPipeline {
        &self.pipeline
    }

    pub fn agent(&self) -> &str {
        &self.agent
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Formats an exchange as a JSON message, or `None` if the rules drop it.
    pub fn format(
        &self,
        request: &HttpRequestFacts,
        response: &HttpResponseFacts,
        response_body: Option<&str>,
        request_body: Option<&str>,
        now: Option<&str>,
        interval: Option<Duration>,
    ) -> Option<String> {
        let mut message = message::build(request, response, response_body, request_body);
        if !self.rules.rules_for(Verb::CopySessionField).is_empty() {
            self.rules.copy_session_fields(&mut message, &request.session);
        }
        self.finish(message, now, interval)
    }

    /// Formats and submits an exchange. Does nothing while disabled.
    pub async fn send(
        &self,
        request: &HttpRequestFacts,
        response: &HttpResponseFacts,
        response_body: Option<&str>,
        request_body: Option<&str>,
        now: Option<&str>,
        interval: Option<Duration>,
    ) {
        if !self.is_enabled() {
            return;
        }
        let json = self.format(request, response, response_body, request_body, now, interval);
        self.pipeline.submit(json).await;
    }

    /// Applies the rules to an already built message and submits what survives.
    pub async fn submit_if_passing(&self, message: Message) {
        let json = self.finish(message, None, None);
        self.pipeline.submit(json).await;
    }

    pub async fn submit(&self, message: Option<String>) {
        self.pipeline.submit(message).await;
    }

    /// Waits for in-flight deliveries to finish.
    pub async fn drain(&self) {
        self.pipeline.drain().await;
    }

    pub fn enable(&self) {
        self.pipeline.enable();
    }

    pub fn disable(&self) {
        self.pipeline.disable();
    }

    pub fn is_enabled(&self) -> bool {
        self.pipeline.is_enabled()
    }

    pub fn is_enableable(&self) -> bool {
        self.pipeline.is_enableable()
    }

    pub fn submit_successes(&self) -> u64 {
        self.pipeline.submit_successes()
    }

    pub fn submit_failures(&self) -> u64 {
        self.pipeline.submit_failures()
    }

    fn finish(&self, message: Message, now: Option<&str>, interval: Option<Duration>) -> Option<String> {
        let mut message = self.rules.apply(message)?;
        Trailer { now, interval, agent: &self.agent, host: &self.host, version: &self.version }
            .append_to(&mut message);
        Some(message.to_json())
    }
}

/// True when a content type names a textual body worth capturing.
pub fn is_string_content_type(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|s| STRING_CONTENT_TYPE.is_match(s))
}
