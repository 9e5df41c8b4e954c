//! Coalescing TTL cache for license decisions.
//!
//! # States per key
//! ```text
//! (absent) ──first caller──▶ Pending ──Ok(decision)──▶ Ready ──age ≥ ttl──▶ refetch
//!                               │
//!                               └──Err / abandoned──▶ (absent)
//! ```
//!
//! # Design Decisions
//! - `DashMap` shards keys, so unrelated (tenant, module) pairs never contend
//! - Shard locks are only held for synchronous slot transitions, never across `.await`
//! - The first caller on a cold key owns the fetch; others await its `watch` channel
//! - The fetch runs on its own task: an aborted caller does not cancel it
//! - Only explicit decisions are cached; failures leave the key absent

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::licensing::client::ValidatorError;
use crate::licensing::types::{LicenseCacheEntry, LicenseDecision, LicenseKey};
use crate::observability::metrics;

/// Result shared between the fetch owner and its waiters.
pub type FetchOutcome = Result<LicenseDecision, ValidatorError>;

/// Cache tunables.
#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    /// Lifetime of an `Allowed` entry.
    pub ttl: Duration,
    /// Lifetime of a `Denied` entry, capped at `ttl`.
    pub deny_ttl: Duration,
    /// Bound on a single fetch.
    pub fetch_timeout: Duration,
    /// Maximum number of entries; the oldest decisions are evicted first.
    pub max_entries: usize,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            deny_ttl: Duration::from_secs(300),
            fetch_timeout: Duration::from_secs(5),
            max_entries: 10_000,
        }
    }
}

/// How a lookup was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Served from a fresh entry.
    Hit,
    /// This caller started the fetch.
    Miss,
    /// This caller joined a fetch already in flight.
    Coalesced,
}

impl Lookup {
    pub fn as_str(self) -> &'static str {
        match self {
            Lookup::Hit => "hit",
            Lookup::Miss => "miss",
            Lookup::Coalesced => "coalesced",
        }
    }
}

enum Slot {
    Ready(LicenseCacheEntry),
    Pending {
        generation: u64,
        outcome: watch::Receiver<Option<FetchOutcome>>,
    },
}

enum Step {
    Serve(LicenseDecision),
    Join(watch::Receiver<Option<FetchOutcome>>),
    Own {
        generation: u64,
        publish: watch::Sender<Option<FetchOutcome>>,
        outcome: watch::Receiver<Option<FetchOutcome>>,
    },
}

struct Inner {
    entries: DashMap<LicenseKey, Slot>,
    policy: CachePolicy,
    generation: AtomicU64,
}

/// Thread-safe license cache. Cloning shares the underlying map.
#[derive(Clone)]
pub struct LicenseCache {
    inner: Arc<Inner>,
}

impl LicenseCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: DashMap::new(),
                policy,
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.inner.policy
    }

    /// Number of keys present, including fetches in flight.
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Return the fresh decision for `key`, or fetch it with `fetch`.
    ///
    /// At most one fetch per key is in flight at any time; concurrent callers
    /// for a cold key all receive the outcome of that single fetch.
    pub async fn get_or_fetch<F, Fut>(&self, key: LicenseKey, fetch: F) -> (FetchOutcome, Lookup)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FetchOutcome> + Send + 'static,
    {
        match self.next_step(&key) {
            Step::Serve(decision) => (Ok(decision), Lookup::Hit),
            Step::Join(outcome) => (Self::wait(outcome).await, Lookup::Coalesced),
            Step::Own {
                generation,
                publish,
                outcome,
            } => {
                self.spawn_fetch(key, generation, publish, fetch());
                (Self::wait(outcome).await, Lookup::Miss)
            }
        }
    }

    /// Decide what to do for `key` under its shard lock.
    fn next_step(&self, key: &LicenseKey) -> Step {
        let now = Instant::now();
        match self.inner.entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let current = match occupied.get() {
                    Slot::Ready(entry) if self.is_fresh(entry, now) => {
                        Some(Step::Serve(entry.decision.clone()))
                    }
                    Slot::Pending { outcome, .. } => Some(Step::Join(outcome.clone())),
                    Slot::Ready(_) => None,
                };
                current.unwrap_or_else(|| {
                    let (slot, step) = self.pending_slot();
                    occupied.insert(slot);
                    step
                })
            }
            Entry::Vacant(vacant) => {
                let (slot, step) = self.pending_slot();
                vacant.insert(slot);
                step
            }
        }
    }

    fn pending_slot(&self) -> (Slot, Step) {
        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed);
        let (publish, outcome) = watch::channel(None);
        let slot = Slot::Pending {
            generation,
            outcome: outcome.clone(),
        };
        (
            slot,
            Step::Own {
                generation,
                publish,
                outcome,
            },
        )
    }

    fn spawn_fetch<Fut>(
        &self,
        key: LicenseKey,
        generation: u64,
        publish: watch::Sender<Option<FetchOutcome>>,
        fetch: Fut,
    ) where
        Fut: Future<Output = FetchOutcome> + Send + 'static,
    {
        let cache = self.clone();
        let timeout = self.inner.policy.fetch_timeout;

        tokio::spawn(async move {
            let guard = PendingGuard {
                cache: cache.clone(),
                key,
                generation,
            };

            let outcome = tokio::time::timeout(timeout, fetch)
                .await
                .unwrap_or_else(|_| {
                    Err(ValidatorError::Unavailable(
                        "licensing service timed out".to_string(),
                    ))
                });

            if let Ok(decision) = &outcome {
                cache.complete(&guard.key, generation, decision.clone());
            }
            // Clear a still-pending slot before waking waiters, so late
            // arrivals start a new fetch instead of joining a failed one.
            drop(guard);
            publish.send_replace(Some(outcome));
        });
    }

    async fn wait(mut outcome: watch::Receiver<Option<FetchOutcome>>) -> FetchOutcome {
        let abandoned = || Err(ValidatorError::Unavailable("license fetch abandoned".to_string()));
        match outcome.wait_for(Option::is_some).await {
            Ok(value) => (*value).clone().unwrap_or_else(abandoned),
            Err(_) => abandoned(),
        }
    }

    /// Promote the pending slot of `generation` to a ready entry.
    fn complete(&self, key: &LicenseKey, generation: u64, decision: LicenseDecision) {
        if let Some(mut slot) = self.inner.entries.get_mut(key) {
            if matches!(*slot, Slot::Pending { generation: g, .. } if g == generation) {
                *slot = Slot::Ready(LicenseCacheEntry {
                    decision,
                    fetched_at: Instant::now(),
                });
            }
        }
        self.enforce_bound();
        metrics::record_license_cache_size(self.len());
    }

    /// Drop the pending slot of `generation` if it was never completed.
    fn abandon(&self, key: &LicenseKey, generation: u64) {
        self.inner.entries.remove_if(key, |_, slot| {
            matches!(slot, Slot::Pending { generation: g, .. } if *g == generation)
        });
    }

    fn ttl_for(&self, decision: &LicenseDecision) -> Duration {
        if decision.is_allowed() {
            self.inner.policy.ttl
        } else {
            self.inner.policy.deny_ttl.min(self.inner.policy.ttl)
        }
    }

    fn is_fresh(&self, entry: &LicenseCacheEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.fetched_at) < self.ttl_for(&entry.decision)
    }

    /// Evict ready entries whose age has reached their TTL. Returns the count.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut evicted = 0;
        self.inner.entries.retain(|_, slot| match slot {
            Slot::Ready(entry) if !self.is_fresh(entry, now) => {
                evicted += 1;
                false
            }
            _ => true,
        });
        metrics::record_license_cache_size(self.len());
        evicted
    }

    fn enforce_bound(&self) {
        let max = self.inner.policy.max_entries;
        while self.inner.entries.len() > max {
            let oldest = self
                .inner
                .entries
                .iter()
                .filter_map(|item| match item.value() {
                    Slot::Ready(entry) => Some((item.key().clone(), entry.fetched_at)),
                    Slot::Pending { .. } => None,
                })
                .min_by_key(|(_, fetched_at)| *fetched_at);

            let Some((key, fetched_at)) = oldest else {
                break;
            };
            self.inner.entries.remove_if(&key, |_, slot| {
                matches!(slot, Slot::Ready(entry) if entry.fetched_at == fetched_at)
            });
        }
    }
}

/// Clears the owner's pending slot when the fetch task ends, including on panic.
struct PendingGuard {
    cache: LicenseCache,
    key: LicenseKey,
    generation: u64,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.cache.abandon(&self.key, self.generation);
    }
}
