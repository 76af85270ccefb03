//! The DNS transport seam.
//!
//! [`MxResolver`] is the only thing the cache knows about DNS. The production
//! implementation wraps hickory's tokio resolver; tests substitute scripted
//! resolvers.

use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use hickory_resolver::{
    TokioResolver,
    config::{NameServerConfig, ResolverConfig, ResolverOpts},
    name_server::TokioConnectionProvider,
    proto::{rr::RData, xfer::Protocol},
};
use tracing::{debug, warn};

use crate::{DnsConfig, DnsError, MxAnswer};

/// Resolves the MX records of a domain.
#[async_trait]
pub trait MxResolver: Send + Sync + Debug {
    /// Returns every MX answer for `domain`, in whatever order the server sent them.
    ///
    /// # Errors
    ///
    /// Returns a [`DnsError`] describing why the domain could not be resolved.
    async fn resolve_mx(&self, domain: &str) -> Result<Vec<MxAnswer>, DnsError>;
}

/// [`MxResolver`] backed by `hickory-resolver`.
#[derive(Debug)]
pub struct HickoryMxResolver {
    resolver: TokioResolver,
    timeout: Duration,
}

impl HickoryMxResolver {
    /// Creates a resolver from the system configuration, or from
    /// `config.name_servers` when any are set.
    ///
    /// # Errors
    ///
    /// Returns an error if the system DNS configuration cannot be loaded or a
    /// configured name server is not a valid address.
    pub fn new(config: &DnsConfig) -> Result<Self, DnsError> {
        let mut opts = ResolverOpts::default();
        opts.timeout = config.timeout();

        let name_servers = config.name_server_addrs()?;
        let resolver = if name_servers.is_empty() {
            TokioResolver::builder(TokioConnectionProvider::default())?
                .with_options(opts)
                .build()
        } else {
            let mut resolver_config = ResolverConfig::new();
            for addr in name_servers {
                resolver_config.add_name_server(NameServerConfig::new(addr, Protocol::Udp));
                resolver_config.add_name_server(NameServerConfig::new(addr, Protocol::Tcp));
            }

            TokioResolver::builder_with_config(resolver_config, TokioConnectionProvider::default())
                .with_options(opts)
                .build()
        };

        Ok(Self {
            resolver,
            timeout: config.timeout(),
        })
    }
}

#[async_trait]
impl MxResolver for HickoryMxResolver {
    async fn resolve_mx(&self, domain: &str) -> Result<Vec<MxAnswer>, DnsError> {
        debug!("Resolving MX records for domain: {domain}");

        let lookup = match tokio::time::timeout(self.timeout, self.resolver.mx_lookup(domain)).await
        {
            Ok(Ok(lookup)) => lookup,
            Ok(Err(err)) if err.is_nx_domain() => {
                debug!("Domain {domain} does not exist");
                return Err(DnsError::DomainNotFound(domain.to_string()));
            }
            Ok(Err(err)) if err.is_no_records_found() => {
                debug!("No MX records found for {domain}");
                return Err(DnsError::NoAnswer(domain.to_string()));
            }
            Ok(Err(err)) => {
                warn!("MX lookup failed for {domain}: {err}");
                return Err(DnsError::LookupFailed(err));
            }
            Err(_) => {
                warn!("MX lookup for {domain} exceeded {:?}", self.timeout);
                return Err(DnsError::Timeout(domain.to_string()));
            }
        };

        let answers: Vec<MxAnswer> = lookup
            .as_lookup()
            .records()
            .iter()
            .filter_map(|record| match record.data() {
                RData::MX(mx) => Some(MxAnswer::new(
                    mx.preference(),
                    &mx.exchange().to_utf8(),
                    record.ttl(),
                )),
                _ => None,
            })
            .collect();

        debug!("Resolved {} MX record(s) for {domain}", answers.len());
        Ok(answers)
    }
}
