//! Bounded MX record cache.
//!
//! # Caching Strategy
//!
//! - **DNS TTL**: a successful answer lives for the smallest TTL among its records
//! - **Failure TTL**: failed and empty answers are cached for `failure_ttl`
//!   seconds, or not at all when `cache_failures` is disabled
//! - **Eviction**: inserting into a full cache first removes the entry with the
//!   lowest `(hits, last_access)`, i.e. least frequently used, then least
//!   recently used
//! - **Coalescing**: concurrent cold lookups of one domain share a single
//!   resolver call
//!
//! The entry map sits behind one mutex that is never held across an `.await`,
//! so a cancelled lookup cannot leave a partially written entry behind.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use ahash::AHashMap;
use dashmap::DashMap;
use mxnorm_common::cache;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::{sync::OwnedMutexGuard, time::Instant};

use crate::{DnsConfig, MxRecord, MxResolver};

#[derive(Debug)]
struct CacheEntry {
    records: Vec<MxRecord>,
    ttl: Duration,
    cached_at: Instant,
    hits: u64,
    last_access: Instant,
}

impl CacheEntry {
    fn new(records: Vec<MxRecord>, ttl: Duration, now: Instant) -> Self {
        Self {
            records,
            ttl,
            cached_at: now,
            hits: 0,
            last_access: now,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.cached_at) > self.ttl
    }

    fn touch(&mut self, now: Instant) -> Vec<MxRecord> {
        self.hits += 1;
        self.last_access = now;
        self.records.clone()
    }

    fn info(&self, domain: &str, now: Instant) -> CacheEntryInfo {
        CacheEntryInfo {
            domain: domain.to_string(),
            records: self.records.clone(),
            ttl: self.ttl,
            age: now.duration_since(self.cached_at),
            idle: now.duration_since(self.last_access),
            hits: self.hits,
        }
    }
}

/// Point-in-time view of a cached domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntryInfo {
    pub domain: String,
    pub records: Vec<MxRecord>,
    pub ttl: Duration,
    /// Time since the entry was resolved.
    pub age: Duration,
    /// Time since the entry was last read.
    pub idle: Duration,
    pub hits: u64,
}

impl CacheEntryInfo {
    /// Time left before the entry expires.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.ttl.saturating_sub(self.age)
    }
}

/// Cache counters since construction (or the last [`MxCache::clear`]).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups answered from a fresh entry.
    pub hits: u64,
    /// Lookups that had to call the resolver.
    pub misses: u64,
    /// Entries removed to make room for a new one.
    pub evictions: u64,
    /// Resolutions that failed or came back empty.
    pub failures: u64,
    /// Domains currently cached.
    pub size: usize,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    failures: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn reset(&self) {
        for counter in [&self.hits, &self.misses, &self.evictions, &self.failures] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// MX record cache keyed by lower-cased domain.
#[derive(Debug)]
pub struct MxCache {
    resolver: Arc<dyn MxResolver>,
    entries: Mutex<AHashMap<String, CacheEntry>>,
    inflight: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
    capacity: usize,
    cache_failures: bool,
    failure_ttl: Duration,
    counters: Counters,
}

impl MxCache {
    /// Creates an empty cache that resolves through `resolver`.
    ///
    /// A `cache_limit` of zero is treated as one.
    #[must_use]
    pub fn new(resolver: Arc<dyn MxResolver>, config: &DnsConfig) -> Self {
        let capacity = config.cache_limit.max(1);

        Self {
            resolver,
            entries: Mutex::new(AHashMap::with_capacity(capacity)),
            inflight: DashMap::new(),
            capacity,
            cache_failures: config.cache_failures,
            failure_ttl: Duration::from_secs(config.failure_ttl),
            counters: Counters::default(),
        }
    }

    /// Returns the MX records for `domain`, sorted by `(priority, host)`.
    ///
    /// An empty list means the domain could not be resolved. The returned
    /// records are a copy; nothing the caller does to them reaches the cache.
    pub async fn lookup(&self, domain: &str) -> Vec<MxRecord> {
        if let Some(records) = self.get_fresh(domain) {
            return records;
        }

        let _slot = InflightSlot::acquire(&self.inflight, domain).await;

        // Whoever held the slot before us may have just filled the entry.
        if let Some(records) = self.get_fresh(domain) {
            return records;
        }

        self.resolve_and_store(domain).await
    }

    /// Reads an unexpired entry, recording the access. Expired entries are dropped.
    fn get_fresh(&self, domain: &str) -> Option<Vec<MxRecord>> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        let entry = entries.get_mut(domain)?;
        if entry.is_expired(now) {
            cache!(
                level = DEBUG,
                "Cache entry for {domain} expired after {:?}",
                entry.ttl
            );
            entries.remove(domain);
            return None;
        }

        let records = entry.touch(now);
        drop(entries);

        Counters::bump(&self.counters.hits);
        cache!("Cache hit for {domain}, {} record(s)", records.len());
        Some(records)
    }

    async fn resolve_and_store(&self, domain: &str) -> Vec<MxRecord> {
        Counters::bump(&self.counters.misses);

        let (records, ttl) = match self.resolver.resolve_mx(domain).await {
            Ok(answers) if !answers.is_empty() => {
                let ttl = answers.iter().map(|answer| answer.ttl).min().unwrap_or(0);
                let mut records: Vec<MxRecord> = answers.iter().map(MxRecord::from).collect();
                records.sort();
                (records, Duration::from_secs(u64::from(ttl)))
            }
            outcome => {
                Counters::bump(&self.counters.failures);
                match outcome {
                    Err(err) => cache!(
                        level = DEBUG,
                        "Failed to resolve {domain} ({}): {err}",
                        err.kind()
                    ),
                    Ok(_) => cache!(level = DEBUG, "Resolver returned no MX records for {domain}"),
                }

                if !self.cache_failures {
                    return Vec::new();
                }
                (Vec::new(), self.failure_ttl)
            }
        };

        let now = Instant::now();
        let mut entries = self.entries.lock();

        if !entries.contains_key(domain) && entries.len() >= self.capacity {
            if let Some(victim) = least_used(&entries) {
                entries.remove(&victim);
                Counters::bump(&self.counters.evictions);
                cache!(level = DEBUG, "Evicted {victim} to make room for {domain}");
            }
        }

        let mut entry = CacheEntry::new(records, ttl, now);
        let records = entry.touch(now);
        entries.insert(domain.to_string(), entry);
        drop(entries);

        cache!(
            level = DEBUG,
            "Cached {} record(s) for {domain} with TTL {}s",
            records.len(),
            ttl.as_secs()
        );
        records
    }

    /// Number of cached domains.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Maximum number of cached domains.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `true` if `domain` has an entry, expired or not.
    pub fn contains(&self, domain: &str) -> bool {
        self.entries.lock().contains_key(domain)
    }

    /// Drops the entry for `domain` so the next lookup resolves it again.
    ///
    /// Returns `true` if an entry was present.
    pub fn remove(&self, domain: &str) -> bool {
        self.entries.lock().remove(domain).is_some()
    }

    /// Empties the cache and resets the counters.
    pub fn clear(&self) {
        self.entries.lock().clear();
        self.counters.reset();
    }

    /// Snapshot of the entry for `domain`, without counting as an access.
    pub fn entry(&self, domain: &str) -> Option<CacheEntryInfo> {
        let now = Instant::now();
        self.entries
            .lock()
            .get(domain)
            .map(|entry| entry.info(domain, now))
    }

    /// Snapshot of every cached entry, ordered by domain.
    pub fn entries(&self) -> Vec<CacheEntryInfo> {
        let now = Instant::now();
        let mut infos: Vec<CacheEntryInfo> = self
            .entries
            .lock()
            .iter()
            .map(|(domain, entry)| entry.info(domain, now))
            .collect();

        infos.sort_by(|a, b| a.domain.cmp(&b.domain));
        infos
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            size: self.len(),
        }
    }
}

/// The domain with the lowest `(hits, last_access)`.
fn least_used(entries: &AHashMap<String, CacheEntry>) -> Option<String> {
    entries
        .iter()
        .min_by_key(|(_, entry)| (entry.hits, entry.last_access))
        .map(|(domain, _)| domain.clone())
}

/// Exclusive right to resolve one domain.
///
/// Dropping the slot, including when the owning future is cancelled, releases
/// the lock and removes it from the map once nobody else is waiting on it.
struct InflightSlot<'a> {
    inflight: &'a DashMap<String, Arc<tokio::sync::Mutex<()>>>,
    domain: &'a str,
    lock: Option<Arc<tokio::sync::Mutex<()>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<'a> InflightSlot<'a> {
    async fn acquire(
        inflight: &'a DashMap<String, Arc<tokio::sync::Mutex<()>>>,
        domain: &'a str,
    ) -> Self {
        let lock = inflight
            .entry(domain.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();

        let mut slot = Self {
            inflight,
            domain,
            lock: Some(Arc::clone(&lock)),
            guard: None,
        };
        slot.guard = Some(lock.lock_owned().await);
        slot
    }
}

impl Drop for InflightSlot<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        drop(self.lock.take());
        self.inflight
            .remove_if(self.domain, |_, lock| Arc::strong_count(lock) == 1);
    }
}
