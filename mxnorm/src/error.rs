use mxnorm_dns::DnsError;
use thiserror::Error;

/// Errors from setting a normalizer up.
///
/// Normalizing an address never fails; resolution problems show up as an
/// empty record list on the result instead.
#[derive(Debug, Error)]
pub enum Error {
    /// The resolver could not be created.
    #[error(transparent)]
    Dns(#[from] DnsError),

    /// The configuration file is not valid RON for [`crate::NormalizerConfig`].
    #[error("Invalid configuration: {0}")]
    Config(#[from] ron::error::SpannedError),

    /// Reading configuration or starting a runtime failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
