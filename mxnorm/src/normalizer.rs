use std::{fmt, sync::Arc};

use mxnorm_common::{Mailbox, extract_address, internal};
use mxnorm_dns::{DnsConfig, HickoryMxResolver, MxCache, MxRecord, MxResolver};
use serde::Serialize;
use tokio::runtime::Runtime;

use crate::{Error, NormalizerConfig, providers};

/// Outcome of normalizing one address.
///
/// An empty `mx_records` list with no `mailbox_provider` means the domain
/// could not be resolved; the address is then returned lower-cased but
/// otherwise untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizeResult {
    address: String,
    normalized_address: String,
    mx_records: Vec<MxRecord>,
    mailbox_provider: Option<&'static str>,
}

impl NormalizeResult {
    /// The input exactly as given.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn normalized_address(&self) -> &str {
        &self.normalized_address
    }

    /// MX records of the domain, sorted by `(priority, host)`.
    pub fn mx_records(&self) -> &[MxRecord] {
        &self.mx_records
    }

    /// Name of the detected provider, if any.
    pub const fn mailbox_provider(&self) -> Option<&'static str> {
        self.mailbox_provider
    }

    /// Returns `true` if any MX records were found.
    pub fn is_resolved(&self) -> bool {
        !self.mx_records.is_empty()
    }
}

impl fmt::Display for NormalizeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized_address)
    }
}

/// Normalizes addresses using MX lookups through an owned [`MxCache`].
///
/// One instance is meant to be shared (e.g. in an `Arc`) by every caller that
/// should benefit from the same cache.
#[derive(Debug)]
pub struct Normalizer {
    cache: MxCache,
}

impl Normalizer {
    /// Creates a normalizer resolving through hickory.
    ///
    /// # Errors
    ///
    /// Returns an error if the system DNS configuration cannot be loaded or a
    /// configured name server is invalid.
    pub fn new(config: &NormalizerConfig) -> Result<Self, Error> {
        let resolver = HickoryMxResolver::new(&config.dns)?;
        Ok(Self::with_resolver(Arc::new(resolver), &config.dns))
    }

    /// Creates a normalizer resolving through `resolver`.
    #[must_use]
    pub fn with_resolver(resolver: Arc<dyn MxResolver>, config: &DnsConfig) -> Self {
        Self {
            cache: MxCache::new(resolver, config),
        }
    }

    /// The MX cache backing this normalizer.
    pub const fn cache(&self) -> &MxCache {
        &self.cache
    }

    /// MX records for `domain`, served from the cache when fresh.
    pub async fn mx_records(&self, domain: &str) -> Vec<MxRecord> {
        self.cache.lookup(&domain.to_ascii_lowercase()).await
    }

    /// Normalizes `raw`, which may be a bare address or a `"Name" <address>` form.
    ///
    /// Never fails. Input without a domain part (no `@`, or nothing after
    /// it) is returned as the lower-cased extracted address with no DNS lookup.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn normalize(&self, raw: &str) -> NormalizeResult {
        let extracted = extract_address(raw);
        let mailbox = Mailbox::from(extracted.as_str());

        if !mailbox.has_domain() {
            internal!(level = DEBUG, "No domain in {raw:?}, passing through");
            return NormalizeResult {
                address: raw.to_string(),
                normalized_address: extracted,
                mx_records: Vec::new(),
                mailbox_provider: None,
            };
        }

        let mx_records = self.cache.lookup(&mailbox.domain).await;
        let provider = providers::match_provider(mx_records.iter().map(|record| &record.host));

        let normalized = match provider {
            Some(provider) => {
                internal!(
                    "{} matched {} ({:?})",
                    mailbox.domain,
                    provider.name,
                    provider.rules
                );
                provider.apply(mailbox)
            }
            None => mailbox,
        };

        NormalizeResult {
            address: raw.to_string(),
            normalized_address: normalized.to_string(),
            mx_records,
            mailbox_provider: provider.map(|provider| provider.name),
        }
    }
}

/// Synchronous front end over [`Normalizer`] that owns its own runtime.
///
/// Must not be used from inside an async context.
#[derive(Debug)]
pub struct BlockingNormalizer {
    runtime: Runtime,
    inner: Normalizer,
}

impl BlockingNormalizer {
    /// Creates a blocking normalizer resolving through hickory.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be started or the resolver
    /// cannot be created.
    pub fn new(config: &NormalizerConfig) -> Result<Self, Error> {
        let runtime = Self::runtime()?;
        let inner = {
            let _guard = runtime.enter();
            Normalizer::new(config)?
        };

        Ok(Self { runtime, inner })
    }

    /// Creates a blocking normalizer resolving through `resolver`.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be started.
    pub fn with_resolver(resolver: Arc<dyn MxResolver>, config: &DnsConfig) -> Result<Self, Error> {
        Ok(Self {
            runtime: Self::runtime()?,
            inner: Normalizer::with_resolver(resolver, config),
        })
    }

    fn runtime() -> Result<Runtime, Error> {
        Ok(tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?)
    }

    /// See [`Normalizer::normalize`].
    pub fn normalize(&self, raw: &str) -> NormalizeResult {
        self.runtime.block_on(self.inner.normalize(raw))
    }

    pub const fn normalizer(&self) -> &Normalizer {
        &self.inner
    }
}
