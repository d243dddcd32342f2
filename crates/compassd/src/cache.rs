//! Verified-response cache with single-flight computation.
//!
//! Keyed by request fingerprint, bounded by LRU capacity, expired by
//! TTL on read. Concurrent callers for the same fingerprint subscribe
//! to one in-flight computation; a failed or cancelled leader never
//! populates the cache, and waiting callers retry instead of erroring.

use lru::LruCache;
use std::collections::HashMap;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{debug, info};

use compass_common::{Fingerprint, GuidanceError, GuidanceResponse, VerificationReport};

use crate::config::CacheConfig;

/// One cached, verified response. The report travels with the response
/// and is returned unchanged on every hit.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub fingerprint: Fingerprint,
    pub response: GuidanceResponse,
    pub report: VerificationReport,
    pub created_at: Instant,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn new(
        fingerprint: Fingerprint,
        response: GuidanceResponse,
        report: VerificationReport,
        ttl: Duration,
    ) -> Self {
        Self {
            fingerprint,
            response,
            report,
            created_at: Instant::now(),
            ttl,
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.created_at.elapsed() < self.ttl
    }
}

/// What a computation hands back: the entry, plus whether it is
/// eligible for storage (only fully verified results are).
pub struct Computed {
    pub entry: CacheEntry,
    pub store: bool,
}

struct CacheState {
    entries: LruCache<Fingerprint, CacheEntry>,
    in_flight: HashMap<Fingerprint, broadcast::Sender<CacheEntry>>,
}

pub struct ResponseCache {
    state: Mutex<CacheState>,
    ttl: Duration,
}

enum Flight {
    Hit(CacheEntry),
    Join(broadcast::Receiver<CacheEntry>),
    Lead(broadcast::Sender<CacheEntry>),
}

impl ResponseCache {
    pub fn new(config: &CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity.max(1)).expect("capacity >= 1");
        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                in_flight: HashMap::new(),
            }),
            ttl: Duration::from_secs(config.ttl_secs),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh entry for a fingerprint, touching LRU order. Expired
    /// entries are evicted on the way.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<CacheEntry> {
        let mut state = self.state.lock().expect("cache lock poisoned");
        match state.entries.get(fingerprint) {
            Some(entry) if entry.is_fresh() => Some(entry.clone()),
            Some(_) => {
                debug!("[$]  Entry for {} expired, evicting", fingerprint);
                state.entries.pop(fingerprint);
                None
            }
            None => None,
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("cache lock poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// At most one concurrent computation per fingerprint. The first
    /// caller computes; everyone else either gets the stored entry or
    /// subscribes to the in-flight result. Returns the entry and whether
    /// it came from the cache (stored or shared) rather than this
    /// caller's own computation.
    pub async fn get_or_compute<F, Fut>(
        &self,
        fingerprint: &Fingerprint,
        compute: F,
    ) -> Result<(CacheEntry, bool), GuidanceError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Computed, GuidanceError>>,
    {
        loop {
            let flight = {
                let mut state = self.state.lock().expect("cache lock poisoned");

                let fresh = state
                    .entries
                    .get(fingerprint)
                    .filter(|entry| entry.is_fresh())
                    .cloned();

                if let Some(entry) = fresh {
                    Flight::Hit(entry)
                } else {
                    // Anything still stored here is stale
                    state.entries.pop(fingerprint);

                    if let Some(sender) = state.in_flight.get(fingerprint) {
                        Flight::Join(sender.subscribe())
                    } else {
                        let (sender, _) = broadcast::channel(1);
                        state.in_flight.insert(fingerprint.clone(), sender.clone());
                        Flight::Lead(sender)
                    }
                }
            };

            match flight {
                Flight::Hit(entry) => {
                    debug!("[$]  Cache hit for {}", fingerprint);
                    return Ok((entry, true));
                }
                Flight::Join(mut receiver) => match receiver.recv().await {
                    Ok(entry) => {
                        debug!("[$]  Joined in-flight computation for {}", fingerprint);
                        return Ok((entry, true));
                    }
                    // Leader failed or was cancelled; take another turn
                    Err(_) => continue,
                },
                Flight::Lead(sender) => {
                    let guard = FlightGuard {
                        cache: self,
                        fingerprint,
                        armed: true,
                    };

                    let computed = compute().await;

                    return match computed {
                        Ok(Computed { entry, store }) => {
                            let mut guard = guard;
                            guard.armed = false;

                            let mut state = self.state.lock().expect("cache lock poisoned");
                            if store {
                                info!("[$]  Stored verified response for {}", fingerprint);
                                state.entries.put(fingerprint.clone(), entry.clone());
                            }
                            // Wake subscribers before clearing the flight
                            let _ = sender.send(entry.clone());
                            state.in_flight.remove(fingerprint);

                            Ok((entry, false))
                        }
                        Err(e) => Err(e),
                    };
                }
            }
        }
    }
}

/// Clears the in-flight marker if the leading computation errors or is
/// dropped mid-way, so the fingerprint never deadlocks and a partial
/// result never lands in the cache.
struct FlightGuard<'a> {
    cache: &'a ResponseCache,
    fingerprint: &'a Fingerprint,
    armed: bool,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.cache.state.lock().expect("cache lock poisoned");
            state.in_flight.remove(self.fingerprint);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compass_common::{
        CagBlock, ComplianceBlock, Decision, GenerationParams, GuidanceRequest, GuidanceResponse,
        ResponseSource, SanitisedProfile, StageName,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn fingerprint(query: &str) -> Fingerprint {
        Fingerprint::of(&GuidanceRequest::new(
            query,
            SanitisedProfile::default(),
            GenerationParams::default(),
        ))
    }

    fn report() -> VerificationReport {
        VerificationReport {
            decision: Decision::Accept,
            confidence: 0.92,
            issues: vec![],
            stages_completed: vec![
                StageName::FactCheck,
                StageName::ConsistencyCheck,
                StageName::ConfidenceScore,
                StageName::Decision,
            ],
            revision_count: 0,
        }
    }

    fn entry(fp: &Fingerprint, text: &str, ttl: Duration) -> CacheEntry {
        let rep = report();
        let response = GuidanceResponse {
            success: true,
            response: text.to_string(),
            source: ResponseSource::Generated,
            compliance: ComplianceBlock {
                consent: true,
                sanitised: true,
                cag_verified: true,
            },
            cag: Some(CagBlock::from_report(&rep, 100)),
        };
        CacheEntry::new(fp.clone(), response, rep, ttl)
    }

    fn cache(capacity: usize, ttl_secs: u64) -> ResponseCache {
        ResponseCache::new(&CacheConfig {
            capacity,
            ttl_secs,
        })
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let cache = cache(8, 3_600);
        let fp = fingerprint("q");

        assert!(cache.get(&fp).is_none());

        let (computed, from_cache) = cache
            .get_or_compute(&fp, || async {
                Ok(Computed {
                    entry: entry(&fp, "generated", Duration::from_secs(3_600)),
                    store: true,
                })
            })
            .await
            .unwrap();
        assert!(!from_cache);
        assert_eq!(computed.response.response, "generated");

        let (hit, from_cache) = cache
            .get_or_compute(&fp, || async { panic!("must not recompute") })
            .await
            .unwrap();
        assert!(from_cache);
        assert_eq!(hit.response.response, "generated");
        assert_eq!(hit.report.decision, Decision::Accept);
    }

    #[tokio::test]
    async fn test_expired_entry_recomputed() {
        let cache = cache(8, 3_600);
        let fp = fingerprint("q");

        cache
            .get_or_compute(&fp, || async {
                Ok(Computed {
                    entry: entry(&fp, "old", Duration::from_millis(1)),
                    store: true,
                })
            })
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;

        let (fresh, from_cache) = cache
            .get_or_compute(&fp, || async {
                Ok(Computed {
                    entry: entry(&fp, "new", Duration::from_secs(3_600)),
                    store: true,
                })
            })
            .await
            .unwrap();
        assert!(!from_cache);
        assert_eq!(fresh.response.response, "new");
    }

    #[tokio::test]
    async fn test_single_flight_dedup() {
        let cache = Arc::new(cache(8, 3_600));
        let fp = fingerprint("q");
        let computations = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            let fp = fp.clone();
            let computations = computations.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute(&fp, || {
                        let computations = computations.clone();
                        let fp = fp.clone();
                        async move {
                            computations.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            Ok(Computed {
                                entry: entry(&fp, "shared", Duration::from_secs(3_600)),
                                store: true,
                            })
                        }
                    })
                    .await
                    .unwrap()
            }));
        }

        for handle in handles {
            let (got, _) = handle.await.unwrap();
            assert_eq!(got.response.response, "shared");
        }
        assert_eq!(computations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_leader_does_not_populate() {
        let cache = cache(8, 3_600);
        let fp = fingerprint("q");

        let result = cache
            .get_or_compute(&fp, || async {
                Err(GuidanceError::AllProvidersExhausted)
            })
            .await;
        assert!(result.is_err());
        assert!(cache.get(&fp).is_none());

        // Fingerprint is not deadlocked; next caller computes
        let (entry_after, from_cache) = cache
            .get_or_compute(&fp, || async {
                Ok(Computed {
                    entry: entry(&fp, "second try", Duration::from_secs(3_600)),
                    store: true,
                })
            })
            .await
            .unwrap();
        assert!(!from_cache);
        assert_eq!(entry_after.response.response, "second try");
    }

    #[tokio::test]
    async fn test_unstorable_result_not_cached() {
        let cache = cache(8, 3_600);
        let fp = fingerprint("q");

        cache
            .get_or_compute(&fp, || async {
                Ok(Computed {
                    entry: entry(&fp, "escalated", Duration::from_secs(3_600)),
                    store: false,
                })
            })
            .await
            .unwrap();

        assert!(cache.get(&fp).is_none());
    }

    #[tokio::test]
    async fn test_lru_eviction_bounds_capacity() {
        let cache = cache(2, 3_600);

        for query in ["a", "b", "c"] {
            let fp = fingerprint(query);
            cache
                .get_or_compute(&fp, || async {
                    Ok(Computed {
                        entry: entry(&fp, query, Duration::from_secs(3_600)),
                        store: true,
                    })
                })
                .await
                .unwrap();
        }

        assert_eq!(cache.len(), 2);
        // Oldest fingerprint evicted
        assert!(cache.get(&fingerprint("a")).is_none());
        assert!(cache.get(&fingerprint("c")).is_some());
    }
}
