//! message.rs - Ordered usage messages and the builder that derives them from request/response facts.
//!
//! A message is an ordered list of `(name, value)` pairs. It serializes to a
//! JSON array of two-element arrays, which is the wire format accepted by the
//! collector.
//!
//! License: MIT OR APACHE 2.0

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered name/value pairs describing one request/response interaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message(Vec<(String, String)>);

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Value of the first pair with the given name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut String)> {
        self.0.iter_mut().map(|(n, v)| (n.as_str(), v))
    }

    /// Keeps the pairs for which `keep(name, value)` is true, preserving order.
    pub(crate) fn retain(&mut self, mut keep: impl FnMut(&str, &str) -> bool) {
        self.0.retain(|(n, v)| keep(n, v));
    }

    pub fn to_json(&self) -> String {
        // String pairs always serialize.
        serde_json::to_string(&self.0).unwrap_or_default()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl From<Vec<(String, String)>> for Message {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }
}

/// A header carrying one value or several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Single(String),
    Multiple(Vec<String>),
}

impl HeaderValue {
    /// Multiple values are concatenated with no separator.
    pub fn joined(&self) -> String {
        match self {
            HeaderValue::Single(v) => v.clone(),
            HeaderValue::Multiple(values) => values.concat(),
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(v: &str) -> Self {
        HeaderValue::Single(v.to_string())
    }
}

impl From<Vec<&str>> for HeaderValue {
    fn from(values: Vec<&str>) -> Self {
        HeaderValue::Multiple(values.into_iter().map(str::to_string).collect())
    }
}

/// What the host framework observed about an inbound request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpRequestFacts {
    pub method: Option<String>,
    pub protocol: Option<String>,
    pub hostname: Option<String>,
    /// Path plus query string.
    pub url: Option<String>,
    pub headers: Vec<(String, HeaderValue)>,
    pub body_params: Vec<(String, String)>,
    pub query_params: Vec<(String, String)>,
    pub session: Vec<(String, Value)>,
}

/// What the host framework observed about the outbound response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpResponseFacts {
    pub status_code: Option<u16>,
    pub headers: Vec<(String, HeaderValue)>,
}

/// Builds the pairs describing a request and its response, before any rules run.
pub fn build(
    request: &HttpRequestFacts,
    response: &HttpResponseFacts,
    response_body: Option<&str>,
    request_body: Option<&str>,
) -> Message {
    let mut message = Message::new();
    if let Some(method) = &request.method {
        message.push("request_method", method.as_str());
    }
    if let (Some(protocol), Some(hostname), Some(url)) = (&request.protocol, &request.hostname, &request.url) {
        message.push("request_url", format!("{protocol}://{hostname}{url}"));
    }
    if let Some(code) = response.status_code {
        message.push("response_code", code.to_string());
    }
    for (name, value) in &request.headers {
        message.push(format!("request_header:{}", name.to_lowercase()), value.joined());
    }
    for (name, value) in request.body_params.iter().chain(&request.query_params) {
        message.push(format!("request_param:{}", name.to_lowercase()), value.as_str());
    }
    for (name, value) in &response.headers {
        message.push(format!("response_header:{}", name.to_lowercase()), value.joined());
    }
    if let Some(body) = request_body.filter(|b| !b.is_empty()) {
        message.push("request_body", body);
    }
    if let Some(body) = response_body.filter(|b| !b.is_empty()) {
        message.push("response_body", body);
    }
    message
}

/// Fields appended to every message that survives the rules.
#[derive(Debug, Clone, Copy)]
pub struct Trailer<'a> {
    /// Epoch milliseconds; the current time when absent.
    pub now: Option<&'a str>,
    pub interval: Option<Duration>,
    pub agent: &'a str,
    pub host: &'a str,
    pub version: &'a str,
}

impl Trailer<'_> {
    pub fn append_to(&self, message: &mut Message) {
        let now = self.now.map_or_else(now_millis, str::to_string);
        message.push("now", now);
        if let Some(interval) = self.interval {
            message.push("interval", format_interval(interval));
        }
        message.push("agent", self.agent);
        message.push("host", self.host);
        message.push("version", self.version);
    }
}

/// Current wall-clock time as epoch milliseconds.
pub fn now_millis() -> String {
    chrono::Utc::now().timestamp_millis().to_string()
}

fn format_interval(interval: Duration) -> String {
    let millis = interval.as_nanos() as f64 / 1_000_000.0;
    millis.to_string()
}
