//! Size limits and diagnostic sanitization.
//!
//! # Responsibilities
//! - Cap outbound payload size
//! - Cap how much of an error response body is read
//! - Strip line breaks from remote text before it reaches logs or errors

/// Default cap on the marshaled payload (10 MiB).
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Default cap on error response bytes kept for diagnostics (64 KiB).
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 64 * 1024;

/// Lossy UTF-8 decode with CR and LF removed.
///
/// Response bodies come from the remote side; embedded newlines would let a
/// receiver forge extra log lines.
pub fn sanitize_diagnostic(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .chars()
        .filter(|c| *c != '\n' && *c != '\r')
        .collect::<String>()
        .trim()
        .to_string()
}
