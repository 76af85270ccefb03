//! Normalize email addresses by stripping the decorations their mailbox
//! provider ignores.
//!
//! The provider is inferred from the domain's MX records, so
//! `First.Last+news@example.com` collapses to `firstlast@example.com` when
//! `example.com` is hosted by Google, but stays as written when it is not.
//!
//! ```no_run
//! # async fn demo() -> Result<(), mxnorm::Error> {
//! let normalizer = mxnorm::Normalizer::new(&mxnorm::NormalizerConfig::default())?;
//! let result = normalizer.normalize("\"Me\" <Gavin.M.Roy+spam@gmail.com>").await;
//! assert_eq!(result.normalized_address(), "gavinmroy@gmail.com");
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod normalizer;
pub mod providers;

pub use config::NormalizerConfig;
pub use error::Error;
pub use mxnorm_dns::{
    CacheEntryInfo, CacheStats, DnsConfig, DnsError, MxAnswer, MxCache, MxRecord, MxResolver,
};
pub use normalizer::{BlockingNormalizer, NormalizeResult, Normalizer};
pub use providers::{PROVIDERS, Provider, Rules, match_provider};
