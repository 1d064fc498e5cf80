//! Security subsystem.
//!
//! # Responsibilities
//! - Payload authenticity (HMAC-SHA256 signing and verification)
//! - Destination vetting (scheme and host checks before any connection)
//! - Resource limits on outbound payloads and inbound error bodies
//!
//! # Design Decisions
//! - Signature comparison is constant time
//! - Secrets are never logged
//! - Remote text is sanitized before it is embedded in errors

pub mod destination;
pub mod limits;
pub mod signing;

pub use destination::{validate_destination, DestinationError};
pub use signing::{
    extract_from_header_map, extract_signature_headers, sign_payload, sign_payload_at,
    sign_payload_with_id, verify_request, verify_signature, SignatureError, SignatureHeaders,
    ID_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER,
};
