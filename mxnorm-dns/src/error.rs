use thiserror::Error;

/// Errors that can occur while resolving MX records.
///
/// These never surface from normalization; the cache turns every failure into
/// an empty record list.
#[derive(Debug, Error)]
pub enum DnsError {
    /// The domain exists but has no MX records.
    #[error("No MX records found for domain: {0}")]
    NoAnswer(String),

    /// Domain does not exist (NXDOMAIN).
    #[error("Domain does not exist: {0}")]
    DomainNotFound(String),

    /// DNS query timed out.
    #[error("DNS query timed out for domain: {0}")]
    Timeout(String),

    /// DNS query failed due to network or resolver issues.
    #[error("DNS lookup failed: {0}")]
    LookupFailed(#[from] hickory_resolver::ResolveError),

    /// A configured name server is not an `ip` or `ip:port`.
    #[error("Invalid name server address: {0}")]
    InvalidNameServer(String),
}

impl DnsError {
    /// Returns `true` if this error is temporary and a later lookup may succeed.
    #[must_use]
    pub const fn is_temporary(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::LookupFailed(_))
    }

    /// Short, stable name for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NoAnswer(_) => "no_answer",
            Self::DomainNotFound(_) => "nxdomain",
            Self::Timeout(_) => "timeout",
            Self::LookupFailed(_) => "lookup_failed",
            Self::InvalidNameServer(_) => "invalid_name_server",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporary_errors() {
        assert!(DnsError::Timeout("example.com".to_string()).is_temporary());
        assert!(!DnsError::NoAnswer("example.com".to_string()).is_temporary());
        assert!(!DnsError::DomainNotFound("example.com".to_string()).is_temporary());
    }

    #[test]
    fn display_names_domain() {
        let err = DnsError::DomainNotFound("nope.invalid".to_string());
        assert_eq!(err.to_string(), "Domain does not exist: nope.invalid");
        assert_eq!(err.kind(), "nxdomain");
    }
}
