//! HMAC-SHA256 webhook signatures.
//!
//! The signed message is `"{timestamp}.{body}"` over the exact bytes sent on
//! the wire. Receivers recompute it from the received timestamp and body and
//! compare in constant time.
//!
//! # Wire Format
//! ```text
//! X-Webhook-Signature: <hex HMAC-SHA256>
//! X-Webhook-Timestamp: <unix seconds>
//! X-Webhook-ID:        <opaque id, for receiver-side deduplication>
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";
pub const TIMESTAMP_HEADER: &str = "X-Webhook-Timestamp";
pub const ID_HEADER: &str = "X-Webhook-ID";

/// Allowed clock skew for timestamps from the future.
pub const MAX_FUTURE_SKEW: Duration = Duration::from_secs(60);

/// Errors from signing, header extraction and verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("signing secret must not be empty")]
    EmptySecret,

    #[error("signing secret variable {0} is unset or empty")]
    SecretEnvUnset(String),

    #[error("payload must not be empty")]
    EmptyPayload,

    #[error("missing {0} header")]
    MissingHeader(&'static str),

    #[error("malformed {header} header: {value:?}")]
    MalformedHeader { header: &'static str, value: String },

    #[error("signature mismatch")]
    Mismatch,

    #[error("signature expired: {age_secs}s old (max {max_age_secs}s)")]
    Expired { age_secs: u64, max_age_secs: u64 },

    #[error("timestamp is {ahead_secs}s in the future")]
    FutureTimestamp { ahead_secs: u64 },
}

/// Signature material attached to a signed delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeaders {
    /// Lowercase hex HMAC-SHA256.
    pub signature: String,
    /// Unix seconds the signature is bound to.
    pub timestamp: i64,
    /// Delivery ID; not part of the signed message.
    pub id: String,
}

impl SignatureHeaders {
    /// `(name, value)` pairs ready to attach to a request.
    pub fn to_pairs(&self) -> [(&'static str, String); 3] {
        [
            (SIGNATURE_HEADER, self.signature.clone()),
            (TIMESTAMP_HEADER, self.timestamp.to_string()),
            (ID_HEADER, self.id.clone()),
        ]
    }
}

/// Sign `payload` at the current time with a fresh delivery ID.
pub fn sign_payload(secret: &str, payload: &[u8]) -> Result<SignatureHeaders, SignatureError> {
    sign_payload_at(secret, payload, unix_now(), Uuid::new_v4().to_string())
}

/// Sign at the current time under an existing delivery ID, so retries of
/// one delivery share an ID while each carries a fresh timestamp.
pub fn sign_payload_with_id(
    secret: &str,
    payload: &[u8],
    id: &str,
) -> Result<SignatureHeaders, SignatureError> {
    sign_payload_at(secret, payload, unix_now(), id)
}

/// Sign with an explicit timestamp and ID.
pub fn sign_payload_at(
    secret: &str,
    payload: &[u8],
    timestamp: i64,
    id: impl Into<String>,
) -> Result<SignatureHeaders, SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::EmptySecret);
    }
    if payload.is_empty() {
        return Err(SignatureError::EmptyPayload);
    }

    let mac = keyed_mac(secret, timestamp, payload);
    Ok(SignatureHeaders {
        signature: hex::encode(mac.finalize().into_bytes()),
        timestamp,
        id: id.into(),
    })
}

/// Verify a received signature.
///
/// `max_age` of zero disables the freshness checks.
pub fn verify_signature(
    secret: &str,
    payload: &[u8],
    headers: &SignatureHeaders,
    max_age: Duration,
) -> Result<(), SignatureError> {
    verify_signature_at(secret, payload, headers, max_age, unix_now())
}

pub(crate) fn verify_signature_at(
    secret: &str,
    payload: &[u8],
    headers: &SignatureHeaders,
    max_age: Duration,
    now: i64,
) -> Result<(), SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::EmptySecret);
    }

    // A non-hex signature can never match; report it the same way.
    let received = hex::decode(headers.signature.trim()).map_err(|_| SignatureError::Mismatch)?;
    keyed_mac(secret, headers.timestamp, payload)
        .verify_slice(&received)
        .map_err(|_| SignatureError::Mismatch)?;

    if max_age.is_zero() {
        return Ok(());
    }

    let age = now.saturating_sub(headers.timestamp);
    if age > 0 && age.unsigned_abs() > max_age.as_secs() {
        return Err(SignatureError::Expired {
            age_secs: age.unsigned_abs(),
            max_age_secs: max_age.as_secs(),
        });
    }
    if age < 0 && age.unsigned_abs() > MAX_FUTURE_SKEW.as_secs() {
        return Err(SignatureError::FutureTimestamp {
            ahead_secs: age.unsigned_abs(),
        });
    }
    Ok(())
}

/// Pull signature material out of any header collection.
///
/// Names are matched case-insensitively. The ID header is optional.
pub fn extract_signature_headers<I, K, V>(headers: I) -> Result<SignatureHeaders, SignatureError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut signature = None;
    let mut timestamp = None;
    let mut id = None;

    for (name, value) in headers {
        let name = name.as_ref();
        if name.eq_ignore_ascii_case(SIGNATURE_HEADER) {
            signature = Some(value.as_ref().trim().to_string());
        } else if name.eq_ignore_ascii_case(TIMESTAMP_HEADER) {
            timestamp = Some(value.as_ref().trim().to_string());
        } else if name.eq_ignore_ascii_case(ID_HEADER) {
            id = Some(value.as_ref().trim().to_string());
        }
    }

    let signature = signature
        .filter(|s| !s.is_empty())
        .ok_or(SignatureError::MissingHeader(SIGNATURE_HEADER))?;
    let raw_timestamp = timestamp
        .filter(|t| !t.is_empty())
        .ok_or(SignatureError::MissingHeader(TIMESTAMP_HEADER))?;
    let timestamp = raw_timestamp
        .parse::<i64>()
        .map_err(|_| SignatureError::MalformedHeader {
            header: TIMESTAMP_HEADER,
            value: raw_timestamp.clone(),
        })?;

    Ok(SignatureHeaders {
        signature,
        timestamp,
        id: id.unwrap_or_default(),
    })
}

/// Extract from an `http::HeaderMap`. Non-UTF-8 values are skipped.
pub fn extract_from_header_map(
    headers: &reqwest::header::HeaderMap,
) -> Result<SignatureHeaders, SignatureError> {
    extract_signature_headers(
        headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v))),
    )
}

/// Extract and verify in one step, for receivers.
pub fn verify_request<I, K, V>(
    secret: &str,
    payload: &[u8],
    headers: I,
    max_age: Duration,
) -> Result<SignatureHeaders, SignatureError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let extracted = extract_signature_headers(headers)?;
    verify_signature(secret, payload, &extracted, max_age)?;
    Ok(extracted)
}

fn keyed_mac(secret: &str, timestamp: i64, payload: &[u8]) -> HmacSha256 {
    // HMAC accepts keys of any length; new_from_slice only fails for
    // fixed-size MACs.
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC key can be of any size"),
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}
