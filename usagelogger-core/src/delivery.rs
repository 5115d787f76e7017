//! delivery.rs - Bounded, best-effort delivery of usage messages.
//!
//! A pipeline sends each message either to an in-process queue or, compressed
//! with zlib unless disabled, as an HTTP POST to a collector. Network
//! deliveries run on spawned tasks; a fair semaphore caps how many are in
//! flight, and `submit` waits for a permit when the cap is reached. Outcomes
//! only update the success and failure counters. Nothing is retried.
//!
//! License: MIT OR APACHE 2.0

use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use flate2::write::ZlibEncoder;
use flate2::Compression;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_ENCODING, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, StatusCode, Url};
use tokio::sync::{mpsc, Semaphore};

use crate::errors::LoggerError;
use crate::usage_loggers;

/// Default cap on concurrent network deliveries.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 128;

/// In-process sink receiving raw JSON messages in submission order.
pub trait MessageQueue: Send + Sync {
    fn push(&self, message: String);
}

impl MessageQueue for Mutex<Vec<String>> {
    fn push(&self, message: String) {
        match self.lock() {
            Ok(mut queue) => queue.push(message),
            Err(poisoned) => poisoned.into_inner().push(message),
        }
    }
}

impl MessageQueue for mpsc::UnboundedSender<String> {
    fn push(&self, message: String) {
        if self.send(message).is_err() {
            debug!("Queue receiver dropped; message discarded.");
        }
    }
}

/// Where a pipeline sends messages.
#[derive(Clone, Default)]
pub enum DeliveryTarget {
    /// POST to this collector URL.
    Url(String),
    /// Append to an in-process queue. Takes precedence over any URL.
    Queue(Arc<dyn MessageQueue>),
    /// POST to the default URL supplied by the host, if any.
    #[default]
    Default,
}

impl fmt::Debug for DeliveryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryTarget::Url(url) => f.debug_tuple("Url").field(url).finish(),
            DeliveryTarget::Queue(_) => f.write_str("Queue"),
            DeliveryTarget::Default => f.write_str("Default"),
        }
    }
}

/// Behaviour switches for a pipeline, mostly derived from the compiled rules.
#[derive(Debug, Clone)]
pub struct DeliverySettings {
    pub enabled: bool,
    pub allow_http_url: bool,
    pub skip_compression: bool,
    pub skip_submission: bool,
    pub max_in_flight: usize,
    pub agent: String,
    pub version: String,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            allow_http_url: false,
            skip_compression: false,
            skip_submission: false,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            agent: crate::logger::AGENT.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    successes: AtomicU64,
    failures: AtomicU64,
}

struct Endpoint {
    url: Url,
    client: Client,
}

pub struct DeliveryPipeline {
    enabled: AtomicBool,
    enableable: bool,
    url: Option<String>,
    endpoint: Option<Endpoint>,
    queue: Option<Arc<dyn MessageQueue>>,
    skip_compression: bool,
    skip_submission: bool,
    max_in_flight: usize,
    permits: Arc<Semaphore>,
    counters: Arc<Counters>,
}

impl fmt::Debug for DeliveryPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliveryPipeline")
            .field("enabled", &self.enabled)
            .field("enableable", &self.enableable)
            .field("url", &self.url)
            .field("queue", &self.queue.is_some())
            .field("max_in_flight", &self.max_in_flight)
            .field("counters", &self.counters)
            .finish()
    }
}

impl DeliveryPipeline {
    /// Builds a pipeline. Never fails: an unusable destination yields a
    /// disabled pipeline that cannot be enabled.
    pub fn new(target: DeliveryTarget, default_url: Option<&str>, settings: DeliverySettings) -> Self {
        let (url, queue) = match target {
            DeliveryTarget::Queue(queue) => (None, Some(queue)),
            DeliveryTarget::Url(url) => (Some(url), None),
            DeliveryTarget::Default => (default_url.map(str::to_string), None),
        };

        let endpoint = match (&queue, &url) {
            (None, Some(url)) => build_endpoint(url, &settings),
            _ => None,
        };
        let enableable = queue.is_some() || endpoint.is_some();
        if !enableable {
            debug!("No usable destination ({url:?}); pipeline disabled.");
        }

        let max_in_flight = settings.max_in_flight.clamp(1, Semaphore::MAX_PERMITS.min(u32::MAX as usize));
        Self {
            enabled: AtomicBool::new(settings.enabled && enableable),
            enableable,
            url: if queue.is_some() { None } else { url },
            endpoint,
            queue,
            skip_compression: settings.skip_compression,
            skip_submission: settings.skip_submission,
            max_in_flight,
            permits: Arc::new(Semaphore::new(max_in_flight)),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Submits a message. Always completes normally; outcomes go to the counters.
    ///
    /// Waits for a delivery permit when `max_in_flight` deliveries are running.
    pub async fn submit(&self, message: Option<String>) {
        let Some(message) = message else {
            return;
        };
        if !self.is_enabled() || self.skip_submission {
            return;
        }

        if let Some(queue) = &self.queue {
            queue.push(message);
            self.counters.successes.fetch_add(1, Ordering::SeqCst);
            return;
        }

        let Some(endpoint) = &self.endpoint else {
            return;
        };
        let permit = match self.permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                warn!("Delivery permits unavailable: {e}");
                self.counters.failures.fetch_add(1, Ordering::SeqCst);
                return;
            }
        };

        let client = endpoint.client.clone();
        let url = endpoint.url.clone();
        let counters = Arc::clone(&self.counters);
        let skip_compression = self.skip_compression;
        tokio::spawn(async move {
            match post(&client, url, message, skip_compression).await {
                Ok(()) => {
                    counters.successes.fetch_add(1, Ordering::SeqCst);
                }
                Err(e) => {
                    warn!("Failed to deliver usage message: {e}");
                    counters.failures.fetch_add(1, Ordering::SeqCst);
                }
            }
            drop(permit);
        });
    }

    /// Waits until no delivery is in flight.
    pub async fn drain(&self) {
        let all = u32::try_from(self.max_in_flight).unwrap_or(u32::MAX);
        match self.permits.acquire_many(all).await {
            Ok(permits) => drop(permits),
            Err(e) => debug!("Drain skipped: {e}"),
        }
    }

    /// Number of network deliveries currently running.
    pub fn in_flight(&self) -> usize {
        self.max_in_flight.saturating_sub(self.permits.available_permits())
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    pub fn enable(&self) {
        if self.enableable {
            self.enabled.store(true, Ordering::SeqCst);
        }
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    /// True when this pipeline and the process-wide switch are both enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst) && usage_loggers::is_enabled()
    }

    pub fn is_enableable(&self) -> bool {
        self.enableable
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn has_queue(&self) -> bool {
        self.queue.is_some()
    }

    pub fn skip_compression(&self) -> bool {
        self.skip_compression
    }

    pub fn skip_submission(&self) -> bool {
        self.skip_submission
    }

    pub fn submit_successes(&self) -> u64 {
        self.counters.successes.load(Ordering::SeqCst)
    }

    pub fn submit_failures(&self) -> u64 {
        self.counters.failures.load(Ordering::SeqCst)
    }
}

fn build_endpoint(raw: &str, settings: &DeliverySettings) -> Option<Endpoint> {
    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(e) => {
            debug!("Invalid collector URL {raw:?}: {e}");
            return None;
        }
    };
    match url.scheme() {
        "https" => {}
        "http" if settings.allow_http_url => {}
        "http" => {
            debug!("Refusing http URL without allow_http_url: {raw}");
            return None;
        }
        other => {
            debug!("Unsupported collector scheme {other:?}: {raw}");
            return None;
        }
    }

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json;charset=UTF-8"));
    let agent = format!("Resurface/{} ({})", settings.version, settings.agent);
    match HeaderValue::from_str(&agent) {
        Ok(value) => {
            headers.insert(USER_AGENT, value);
        }
        Err(e) => warn!("Ignoring invalid user agent {agent:?}: {e}"),
    }

    match Client::builder().default_headers(headers).build() {
        Ok(client) => Some(Endpoint { url, client }),
        Err(e) => {
            warn!("Failed to build HTTP client: {e}");
            None
        }
    }
}

/// Compresses `data` as a zlib stream.
pub fn compress(data: &[u8]) -> Result<Vec<u8>, LoggerError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).map_err(LoggerError::Compression)?;
    encoder.finish().map_err(LoggerError::Compression)
}

async fn post(client: &Client, url: Url, message: String, skip_compression: bool) -> Result<(), LoggerError> {
    let (body, encoding) = if skip_compression {
        (message.into_bytes(), "identity")
    } else {
        (compress(message.as_bytes())?, "deflated")
    };

    let response = client.post(url).header(CONTENT_ENCODING, encoding).body(body).send().await?;
    let status = response.status();
    if status == StatusCode::NO_CONTENT {
        Ok(())
    } else {
        Err(LoggerError::UnexpectedStatus(status.as_u16()))
    }
}
