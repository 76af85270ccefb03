use std::fmt;

use serde::{Deserialize, Serialize};

/// A single mail exchanger for a domain.
///
/// Ordering is by `(priority, host)`, which is the canonical order the cache
/// stores and returns records in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MxRecord {
    /// MX preference (lower value = higher priority).
    pub priority: u16,
    /// Lower-cased exchange hostname without the trailing root dot.
    pub host: String,
}

impl MxRecord {
    #[must_use]
    pub fn new(priority: u16, host: &str) -> Self {
        Self {
            priority,
            host: canonical_host(host),
        }
    }
}

impl fmt::Display for MxRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.priority, self.host)
    }
}

/// A raw MX answer as reported by a resolver, including its record TTL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxAnswer {
    pub priority: u16,
    pub host: String,
    /// Record TTL in seconds.
    pub ttl: u32,
}

impl MxAnswer {
    #[must_use]
    pub fn new(priority: u16, host: &str, ttl: u32) -> Self {
        Self {
            priority,
            host: host.to_string(),
            ttl,
        }
    }
}

impl From<&MxAnswer> for MxRecord {
    fn from(answer: &MxAnswer) -> Self {
        Self::new(answer.priority, &answer.host)
    }
}

pub(crate) fn canonical_host(host: &str) -> String {
    host.trim_end_matches('.').to_ascii_lowercase()
}
