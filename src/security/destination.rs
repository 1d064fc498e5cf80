//! Destination URL validation.
//!
//! Only absolute `http`/`https` URLs with a host are accepted. Anything else
//! (`file:`, `gopher:`, `unix:`, scheme-relative strings) is rejected before
//! a connection is attempted.

use url::Url;

/// Why a destination was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationError {
    Empty,
    Unparseable(String),
    UnsupportedScheme(String),
    MissingHost,
}

impl std::fmt::Display for DestinationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DestinationError::Empty => write!(f, "URL is empty"),
            DestinationError::Unparseable(e) => write!(f, "URL does not parse: {}", e),
            DestinationError::UnsupportedScheme(s) => {
                write!(f, "scheme {:?} is not allowed (use http or https)", s)
            }
            DestinationError::MissingHost => write!(f, "URL has no host"),
        }
    }
}

impl std::error::Error for DestinationError {}

/// Parse and vet a webhook destination.
pub fn validate_destination(raw: &str) -> Result<Url, DestinationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(DestinationError::Empty);
    }

    let url = Url::parse(raw).map_err(|e| DestinationError::Unparseable(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(DestinationError::UnsupportedScheme(other.to_string())),
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(DestinationError::MissingHost),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_http_and_https() {
        assert!(validate_destination("http://localhost:8080/hook").is_ok());
        assert!(validate_destination("https://hooks.example.com/a?b=c").is_ok());
        assert!(validate_destination("  https://example.com  ").is_ok());
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(validate_destination(""), Err(DestinationError::Empty));
        assert_eq!(validate_destination("   "), Err(DestinationError::Empty));
    }

    #[test]
    fn test_rejects_other_schemes() {
        for raw in ["file:///etc/passwd", "ftp://example.com/x", "gopher://example.com"] {
            assert!(
                matches!(validate_destination(raw), Err(DestinationError::UnsupportedScheme(_))),
                "{raw}"
            );
        }
    }

    #[test]
    fn test_rejects_unparseable() {
        assert!(matches!(
            validate_destination("not a url"),
            Err(DestinationError::Unparseable(_))
        ));
        assert!(matches!(
            validate_destination("//example.com/hook"),
            Err(DestinationError::Unparseable(_))
        ));
    }

    #[test]
    fn test_error_display() {
        let err = DestinationError::UnsupportedScheme("file".into());
        assert!(err.to_string().contains("\"file\""));
    }
}
