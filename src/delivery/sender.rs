//! Webhook sender.
//!
//! # Responsibilities
//! - Encode the payload once and deliver the exact same bytes on every attempt
//! - Resolve per-call options against the sender's defaults
//! - Drive the attempt loop: backoff wait, bounded POST, classification
//! - Report every attempt to the caller's hook, then to the circuit breaker
//!
//! # Data Flow
//! ```text
//! send(ctx, url, data, options)
//!     → encode + validate (fail fast, no network)
//!     → plan (defaults overridden by options, immutable for this call)
//!     → breaker.allow()? (fail fast, no network)
//!     → attempt loop:
//!         backoff wait (raced against ctx)
//!         → POST within min(attempt timeout, ctx deadline) (raced against ctx)
//!         → hook(DeliveryResult)
//!         → breaker.record_*()
//!         → delivered | permanent | retry | exhausted
//! ```
//!
//! # Design Decisions
//! - `send` spawns nothing; attempts run strictly in sequence on the
//!   caller's task
//! - One delivery ID per `send`, reused across retries so receivers can
//!   deduplicate; the signature timestamp is refreshed per attempt
//! - A cancelled attempt is reported to the hook but not to the breaker

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, USER_AGENT};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{info_span, Instrument};
use url::Url;
use uuid::Uuid;

use crate::config::schema::default_user_agent;
use crate::config::SenderConfig;
use crate::delivery::error::{DeliveryError, Result};
use crate::delivery::options::SendOptions;
use crate::delivery::result::{DeliveryHook, DeliveryResult};
use crate::lifecycle::Context;
use crate::observability::metrics;
use crate::resilience::backoff::BackoffStrategy;
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::registry::CircuitBreakerRegistry;
use crate::resilience::retries::{classify_status, FailureClass};
use crate::resilience::timeouts::attempt_deadline;
use crate::security::limits::{
    sanitize_diagnostic, DEFAULT_MAX_PAYLOAD_BYTES, DEFAULT_MAX_RESPONSE_BYTES,
};
use crate::security::signing::{sign_payload_with_id, SignatureError};
use crate::security::validate_destination;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Reusable webhook sender. Cheap to clone; clones share the connection
/// pool and the breaker registry.
#[derive(Clone)]
pub struct Sender {
    client: reqwest::Client,
    user_agent: String,
    timeout: Duration,
    max_retries: u32,
    backoff: BackoffStrategy,
    headers: Vec<(String, String)>,
    signature_secret: Option<String>,
    max_payload_size: usize,
    max_response_size: usize,
    breakers: Option<Arc<CircuitBreakerRegistry>>,
}

/// Effective settings for one `send` call.
struct Plan {
    client: reqwest::Client,
    headers: HeaderMap,
    timeout: Duration,
    max_retries: u32,
    backoff: BackoffStrategy,
    secret: Option<String>,
    breaker: Option<Arc<CircuitBreaker>>,
    hook: Option<DeliveryHook>,
    max_response_size: usize,
}

impl Sender {
    /// Sender with a fresh pooled client and default settings.
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(build_client()?))
    }

    /// Sender around an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            user_agent: default_user_agent(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: BackoffStrategy::default(),
            headers: Vec::new(),
            signature_secret: None,
            max_payload_size: DEFAULT_MAX_PAYLOAD_BYTES,
            max_response_size: DEFAULT_MAX_RESPONSE_BYTES,
            breakers: None,
        }
    }

    /// Sender whose defaults come from a loaded configuration.
    ///
    /// The signing secret is read from `signing.secret_env`; a per-destination
    /// breaker registry is created when `circuit_breaker.enabled` is set.
    ///
    /// # Errors
    ///
    /// `Signing` when `secret_env` is set but the variable is unset or empty.
    pub fn from_config(config: &SenderConfig) -> Result<Self> {
        let mut sender = Self::new()?
            .with_user_agent(config.delivery.user_agent.clone())
            .with_timeout(Duration::from_secs(config.delivery.timeout_secs))
            .with_max_retries(config.delivery.max_retries)
            .with_backoff(config.backoff.strategy())
            .with_max_payload_size(config.limits.max_payload_bytes)
            .with_max_response_size(config.limits.max_response_bytes);

        for (name, value) in &config.delivery.headers {
            sender = sender.with_header(name.clone(), value.clone());
        }
        if let Some(secret) = config.signing.resolve_secret()? {
            sender = sender.with_signature_secret(secret);
        }
        if config.circuit_breaker.enabled {
            sender = sender.with_breaker_registry(Arc::new(CircuitBreakerRegistry::new(
                &config.circuit_breaker,
            )));
        }

        tracing::debug!(
            timeout_secs = config.delivery.timeout_secs,
            max_retries = config.delivery.max_retries,
            backoff = sender.backoff.kind(),
            signed = sender.signature_secret.is_some(),
            circuit_breaker = config.circuit_breaker.enabled,
            "Sender configured"
        );
        Ok(sender)
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Default per-attempt timeout. Zero keeps the current value.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.timeout = timeout;
        }
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff(mut self, backoff: impl Into<BackoffStrategy>) -> Self {
        self.backoff = backoff.into();
        self
    }

    /// Header sent with every delivery; per-call headers override it.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_signature_secret(mut self, secret: impl Into<String>) -> Self {
        self.signature_secret = Some(secret.into());
        self
    }

    pub fn with_max_payload_size(mut self, bytes: usize) -> Self {
        self.max_payload_size = bytes;
        self
    }

    pub fn with_max_response_size(mut self, bytes: usize) -> Self {
        self.max_response_size = bytes;
        self
    }

    /// Gate every destination without an explicit per-call breaker on a
    /// shared registry.
    pub fn with_breaker_registry(mut self, registry: Arc<CircuitBreakerRegistry>) -> Self {
        self.breakers = Some(registry);
        self
    }

    pub fn breakers(&self) -> Option<&Arc<CircuitBreakerRegistry>> {
        self.breakers.as_ref()
    }

    /// Deliver `data` as JSON to `url`.
    ///
    /// # Errors
    ///
    /// - configuration errors (encode, URL, payload size, headers, secret)
    ///   before any request is made
    /// - `CircuitOpen` when the destination's breaker rejects the call
    /// - `Permanent` on the first 4xx that is not 408, 425 or 429
    /// - `RetriesExhausted` wrapping the last temporary failure
    /// - `Context` when `ctx` is cancelled or its deadline passes
    pub async fn send<T>(
        &self,
        ctx: &Context,
        url: &str,
        data: &T,
        options: SendOptions,
    ) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let body = serde_json::to_vec(data).map_err(|e| DeliveryError::Encode(Arc::new(e)))?;
        self.send_raw(ctx, url, body, options).await
    }

    /// Deliver pre-encoded JSON bytes.
    pub async fn send_raw(
        &self,
        ctx: &Context,
        url: &str,
        body: Vec<u8>,
        options: SendOptions,
    ) -> Result<()> {
        let url = validate_destination(url).map_err(DeliveryError::InvalidUrl)?;
        if body.is_empty() {
            return Err(DeliveryError::EmptyPayload);
        }

        let plan = self.plan(&url, body.len(), options)?;
        let destination = origin(&url);

        if let Some(breaker) = &plan.breaker {
            if !breaker.allow() {
                metrics::record_circuit_rejection();
                tracing::warn!(destination = %destination, "Circuit open, delivery rejected");
                return Err(DeliveryError::circuit_open(destination));
            }
        }

        let delivery_id = Uuid::new_v4().to_string();
        let span = info_span!(
            "webhook_delivery",
            delivery_id = %delivery_id,
            destination = %destination
        );

        self.run(ctx, &plan, &url, &body, &delivery_id)
            .instrument(span)
            .await
    }

    fn plan(&self, url: &Url, payload_len: usize, options: SendOptions) -> Result<Plan> {
        let limit = options.max_payload_size.unwrap_or(self.max_payload_size);
        if payload_len > limit {
            return Err(DeliveryError::PayloadTooLarge {
                size: payload_len,
                limit,
            });
        }

        let secret = match options
            .signature_secret
            .or_else(|| self.signature_secret.clone())
        {
            Some(secret) if secret.is_empty() => return Err(SignatureError::EmptySecret.into()),
            other => other,
        };

        let breaker = options.circuit_breaker.or_else(|| {
            self.breakers
                .as_ref()
                .and_then(|registry| registry.breaker_for(url.as_str()))
        });

        Ok(Plan {
            client: options.http_client.unwrap_or_else(|| self.client.clone()),
            headers: self.base_headers(&options.headers)?,
            timeout: options
                .timeout
                .filter(|t| !t.is_zero())
                .unwrap_or(self.timeout),
            max_retries: options.max_retries.unwrap_or(self.max_retries),
            backoff: options.backoff.unwrap_or(self.backoff),
            secret,
            breaker,
            hook: options.on_delivery,
            max_response_size: options.max_response_size.unwrap_or(self.max_response_size),
        })
    }

    /// Content type, user agent, then sender headers, then per-call headers.
    fn base_headers(&self, extra: &[(String, String)]) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, header_value("User-Agent", &self.user_agent)?);

        for (name, value) in self.headers.iter().chain(extra) {
            headers.insert(header_name(name)?, header_value(name, value)?);
        }
        Ok(headers)
    }

    async fn run(
        &self,
        ctx: &Context,
        plan: &Plan,
        url: &Url,
        body: &[u8],
        delivery_id: &str,
    ) -> Result<()> {
        let mut attempt: u32 = 0;

        loop {
            if attempt > 0 {
                let wait = plan.backoff.next_interval(attempt);
                tracing::debug!(
                    attempt,
                    wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                    "Waiting before retry"
                );
                if let Err(err) = ctx.sleep(wait).await {
                    metrics::record_delivery("cancelled");
                    tracing::info!(attempt, error = %err, "Delivery cancelled during backoff");
                    return Err(err.into());
                }
            } else if let Some(err) = ctx.err() {
                metrics::record_delivery("cancelled");
                return Err(err.into());
            }

            let headers = signed_headers(plan, body, delivery_id)?;
            let number = attempt.saturating_add(1);
            let started = Instant::now();
            let (status_code, outcome) = execute(ctx, plan, url, body, headers).await;
            let duration = started.elapsed();

            tracing::debug!(
                attempt = number,
                status = status_code,
                duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
                success = outcome.is_ok(),
                "Delivery attempt finished"
            );
            metrics::record_attempt(outcome.is_ok(), status_code, duration);

            if let Some(hook) = &plan.hook {
                hook(&DeliveryResult {
                    success: outcome.is_ok(),
                    status_code,
                    attempt: number,
                    duration,
                    error: outcome.as_ref().err().cloned(),
                });
            }

            let err = match outcome {
                Ok(()) => {
                    if let Some(breaker) = &plan.breaker {
                        breaker.record_success();
                    }
                    metrics::record_delivery("delivered");
                    tracing::info!(attempt = number, status = status_code, "Webhook delivered");
                    return Ok(());
                }
                Err(err) => err,
            };

            if err.is_cancelled() {
                metrics::record_delivery("cancelled");
                tracing::info!(attempt = number, error = %err, "Delivery cancelled");
                return Err(err);
            }

            if let Some(breaker) = &plan.breaker {
                breaker.record_failure();
            }

            if err.is_permanent() {
                metrics::record_delivery("permanent");
                tracing::warn!(
                    attempt = number,
                    status = status_code,
                    error = %err,
                    "Webhook rejected, not retrying"
                );
                return Err(err);
            }

            if attempt >= plan.max_retries {
                metrics::record_delivery("exhausted");
                tracing::error!(
                    attempts = number,
                    error = %err,
                    "Webhook delivery failed, retries exhausted"
                );
                return Err(DeliveryError::RetriesExhausted {
                    attempts: number,
                    last: Box::new(err),
                });
            }

            tracing::warn!(attempt = number, error = %err, "Delivery attempt failed, will retry");
            attempt += 1;
        }
    }
}

impl fmt::Debug for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sender")
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("backoff", &self.backoff)
            .field("headers", &self.headers.iter().map(|(k, _)| k).collect::<Vec<_>>())
            .field("signed", &self.signature_secret.is_some())
            .field("max_payload_size", &self.max_payload_size)
            .field("max_response_size", &self.max_response_size)
            .field("breakers", &self.breakers.as_ref().map(|r| r.len()))
            .finish()
    }
}

fn build_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .map_err(|e| DeliveryError::Client(Arc::new(e)))
}

/// Plan headers plus signature headers, which always win.
fn signed_headers(plan: &Plan, body: &[u8], delivery_id: &str) -> Result<HeaderMap> {
    let mut headers = plan.headers.clone();
    if let Some(secret) = &plan.secret {
        let signature = sign_payload_with_id(secret, body, delivery_id)?;
        for (name, value) in signature.to_pairs() {
            headers.insert(header_name(name)?, header_value(name, &value)?);
        }
    }
    Ok(headers)
}

/// One POST, bounded by the attempt deadline and raced against `ctx`.
///
/// Returns the response status (0 if none arrived) and the outcome.
async fn execute(
    ctx: &Context,
    plan: &Plan,
    url: &Url,
    body: &[u8],
    headers: HeaderMap,
) -> (u16, Result<()>) {
    let deadline = attempt_deadline(Instant::now(), plan.timeout, ctx.deadline());
    let request = plan
        .client
        .post(url.clone())
        .headers(headers)
        .body(body.to_vec());

    let round_trip = async {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return (0, Err(request_error(e, plan.timeout))),
        };

        let status = response.status().as_u16();
        if response.status().is_success() {
            return (status, Ok(()));
        }

        let body = read_capped(response, plan.max_response_size).await;
        let err = match classify_status(status) {
            FailureClass::Permanent => DeliveryError::Permanent { status, body },
            FailureClass::Temporary => DeliveryError::Temporary { status, body },
        };
        (status, Err(err))
    };

    tokio::select! {
        biased;
        err = ctx.done() => (0, Err(err.into())),
        outcome = tokio::time::timeout_at(deadline, round_trip) => match outcome {
            Ok(outcome) => outcome,
            Err(_) => (0, Err(DeliveryError::Timeout(plan.timeout))),
        },
    }
}

fn request_error(err: reqwest::Error, timeout: Duration) -> DeliveryError {
    if err.is_timeout() {
        return DeliveryError::Timeout(timeout);
    }
    // The URL may carry credentials in its query string.
    DeliveryError::Network(Arc::new(err.without_url()))
}

/// Read at most `cap` bytes of an error response for diagnostics.
async fn read_capped(mut response: reqwest::Response, cap: usize) -> String {
    let mut buf = Vec::new();
    while buf.len() < cap {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                let take = (cap - buf.len()).min(chunk.len());
                buf.extend_from_slice(&chunk[..take]);
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(error = %e.without_url(), "Failed to read error response body");
                break;
            }
        }
    }
    sanitize_diagnostic(&buf)
}

fn header_name(name: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(name.trim().as_bytes())
        .map_err(|e| DeliveryError::invalid_header(name, e.to_string()))
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| DeliveryError::invalid_header(name, e.to_string()))
}

/// `scheme://host:port`, safe to log.
fn origin(url: &Url) -> String {
    match (url.host_str(), url.port_or_known_default()) {
        (Some(host), Some(port)) => format!("{}://{}:{}", url.scheme(), host, port),
        (Some(host), None) => format!("{}://{}", url.scheme(), host),
        _ => url.scheme().to_string(),
    }
}
