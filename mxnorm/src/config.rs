use std::path::Path;

use mxnorm_dns::DnsConfig;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Top-level configuration, read from RON:
///
/// ```ron
/// (
///     dns: (
///         name_servers: Some(["1.1.1.1", "8.8.8.8:53"]),
///         cache_limit: 4096,
///         cache_failures: true,
///         failure_ttl: 60,
///     ),
/// )
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    #[serde(default)]
    pub dns: DnsConfig,
}

impl NormalizerConfig {
    /// Parses a RON document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the document is malformed.
    pub fn from_ron_str(content: &str) -> Result<Self, Error> {
        Ok(ron::from_str(content)?)
    }

    /// Reads and parses the RON file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, or [`Error::Config`]
    /// if its contents are malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron_str(&content)
    }
}
