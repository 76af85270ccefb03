use std::{
    net::{IpAddr, SocketAddr},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::DnsError;

/// Configuration for MX resolution and caching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsConfig {
    /// Name servers to query instead of the system configuration.
    /// Each entry is an IP address with an optional port (default 53).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_servers: Option<Vec<String>>,

    /// DNS query timeout in seconds (default: 5)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum number of domains kept in the cache (default: 1024)
    #[serde(default = "default_cache_limit")]
    pub cache_limit: usize,

    /// Cache failed and empty resolutions for `failure_ttl` seconds (default: true)
    #[serde(default = "default_cache_failures")]
    pub cache_failures: bool,

    /// Seconds a failed or empty resolution stays cached (default: 300)
    #[serde(default = "default_failure_ttl")]
    pub failure_ttl: u64,
}

const fn default_timeout_secs() -> u64 {
    5
}

const fn default_cache_limit() -> usize {
    1024
}

const fn default_cache_failures() -> bool {
    true
}

const fn default_failure_ttl() -> u64 {
    300 // 5 minutes
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            name_servers: None,
            timeout_secs: default_timeout_secs(),
            cache_limit: default_cache_limit(),
            cache_failures: default_cache_failures(),
            failure_ttl: default_failure_ttl(),
        }
    }
}

impl DnsConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Parses the configured name servers.
    ///
    /// # Errors
    ///
    /// Returns [`DnsError::InvalidNameServer`] for an entry that is neither an
    /// IP address nor an `ip:port` pair.
    pub fn name_server_addrs(&self) -> Result<Vec<SocketAddr>, DnsError> {
        self.name_servers
            .iter()
            .flatten()
            .map(|server| parse_name_server(server))
            .collect()
    }
}

fn parse_name_server(server: &str) -> Result<SocketAddr, DnsError> {
    let server = server.trim();
    server
        .parse::<SocketAddr>()
        .or_else(|_| server.parse::<IpAddr>().map(|ip| SocketAddr::new(ip, 53)))
        .map_err(|_| DnsError::InvalidNameServer(server.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = DnsConfig::default();
        assert_eq!(config.cache_limit, 1024);
        assert!(config.cache_failures);
        assert_eq!(config.failure_ttl, 300);
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert!(config.name_server_addrs().unwrap().is_empty());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: DnsConfig = ron::from_str("(cache_limit: 16)").unwrap();
        assert_eq!(config.cache_limit, 16);
        assert!(config.cache_failures);
        assert_eq!(config.failure_ttl, 300);
    }

    #[test]
    fn name_servers_accept_optional_port() {
        let config = DnsConfig {
            name_servers: Some(vec!["1.1.1.1".to_string(), "[::1]:5353".to_string()]),
            ..Default::default()
        };

        let addrs = config.name_server_addrs().unwrap();
        assert_eq!(addrs[0], "1.1.1.1:53".parse().unwrap());
        assert_eq!(addrs[1], "[::1]:5353".parse().unwrap());
    }

    #[test]
    fn hostname_name_server_is_rejected() {
        let config = DnsConfig {
            name_servers: Some(vec!["dns.example.com".to_string()]),
            ..Default::default()
        };

        assert!(matches!(
            config.name_server_addrs(),
            Err(DnsError::InvalidNameServer(server)) if server == "dns.example.com"
        ));
    }
}
