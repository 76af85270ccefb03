//! MX record resolution and caching.
//!
//! This crate provides:
//! - The [`MxResolver`] seam over DNS transport, with a hickory-backed implementation
//! - [`MxCache`], a bounded, TTL-respecting cache that evicts the least
//!   frequently used entry first and the least recently used among ties
//! - Optional caching of resolution failures for a configurable TTL

mod cache;
mod config;
mod error;
mod record;
mod resolver;

pub use cache::{CacheEntryInfo, CacheStats, MxCache};
pub use config::DnsConfig;
pub use error::DnsError;
pub use record::{MxAnswer, MxRecord};
pub use resolver::{HickoryMxResolver, MxResolver};
