use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, OnceLock};

use serde::{Deserialize, Serialize};

use crate::Direction;
use crate::scalar::Precision;

/// How planning heuristics are produced for a transform key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlanningStrategy {
    /// Static estimate only; cheapest and deterministic.
    #[default]
    EstimateOnly,
}

/// Algorithm chosen for one 1-D length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlanStrategy {
    /// Length 1: the transform is the identity.
    Identity,
    /// Recursive Cooley-Tukey over small prime radices.
    MixedRadix,
    /// Chirp-z convolution through a power-of-two transform.
    Bluestein,
}

/// Admission mode controlling what enters the plan cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CacheAdmissionPolicy {
    Disabled,
    /// Insert everything, evicting the least recently used entry at capacity.
    #[default]
    Lru,
}

/// Stable cache key for 1-D planning decisions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanKey {
    pub len: usize,
    pub precision: Precision,
    pub direction: Direction,
}

impl PlanKey {
    #[must_use]
    pub fn new(len: usize, precision: Precision, direction: Direction) -> Self {
        Self {
            len,
            precision,
            direction,
        }
    }
}

/// Fingerprint proving how a concrete FFT plan was selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanFingerprint {
    pub strategy: PlanStrategy,
    pub radix_path: Vec<usize>,
    pub estimated_flops: u64,
    pub scratch_bytes: usize,
}

/// Persistent metadata associated with a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanMetadata {
    pub key: PlanKey,
    pub fingerprint: PlanFingerprint,
    pub generated_by: PlanningStrategy,
}

/// Control-plane configuration for plan caching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanCacheConfig {
    pub capacity: usize,
    pub planning_strategy: PlanningStrategy,
    pub admission_policy: CacheAdmissionPolicy,
}

impl Default for PlanCacheConfig {
    fn default() -> Self {
        Self {
            capacity: 128,
            planning_strategy: PlanningStrategy::EstimateOnly,
            admission_policy: CacheAdmissionPolicy::Lru,
        }
    }
}

/// Storage interface to decouple planning from cache implementation details.
pub trait PlanCacheBackend {
    fn lookup(&mut self, key: &PlanKey) -> Option<PlanMetadata>;
    fn store(&mut self, metadata: PlanMetadata) -> bool;
    fn config(&self) -> &PlanCacheConfig;
}

/// Bounded LRU map of plan metadata.
#[derive(Debug, Default)]
pub struct PlanCache {
    config: PlanCacheConfig,
    entries: HashMap<PlanKey, PlanMetadata>,
    recency: VecDeque<PlanKey>,
}

impl PlanCache {
    #[must_use]
    pub fn new(config: PlanCacheConfig) -> Self {
        Self {
            config,
            entries: HashMap::new(),
            recency: VecDeque::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }

    fn touch(&mut self, key: &PlanKey) {
        if let Some(pos) = self.recency.iter().position(|k| k == key) {
            self.recency.remove(pos);
        }
        self.recency.push_back(key.clone());
    }
}

impl PlanCacheBackend for PlanCache {
    fn lookup(&mut self, key: &PlanKey) -> Option<PlanMetadata> {
        let hit = self.entries.get(key).cloned();
        if hit.is_some() {
            self.touch(key);
        }
        hit
    }

    fn store(&mut self, metadata: PlanMetadata) -> bool {
        if self.config.admission_policy == CacheAdmissionPolicy::Disabled
            || self.config.capacity == 0
        {
            return false;
        }
        let key = metadata.key.clone();
        if !self.entries.contains_key(&key) && self.entries.len() >= self.config.capacity {
            if let Some(oldest) = self.recency.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        self.entries.insert(key.clone(), metadata);
        self.touch(&key);
        true
    }

    fn config(&self) -> &PlanCacheConfig {
        &self.config
    }
}

static SHARED_PLAN_CACHE: OnceLock<Mutex<PlanCache>> = OnceLock::new();

fn shared_cache() -> &'static Mutex<PlanCache> {
    SHARED_PLAN_CACHE.get_or_init(|| Mutex::new(PlanCache::default()))
}

#[must_use]
pub fn lookup_shared_plan(key: &PlanKey) -> Option<PlanMetadata> {
    shared_cache()
        .lock()
        .ok()
        .and_then(|mut cache| cache.lookup(key))
}

pub fn store_shared_plan(metadata: PlanMetadata) {
    if let Ok(mut cache) = shared_cache().lock() {
        let _ = cache.store(metadata);
    }
}

/// Replace the shared cache configuration, dropping every cached entry.
pub fn configure_shared_plan_cache(config: PlanCacheConfig) {
    if let Ok(mut cache) = shared_cache().lock() {
        *cache = PlanCache::new(config);
    }
}

#[must_use]
pub fn shared_plan_cache_len() -> usize {
    shared_cache().lock().map_or(0, |cache| cache.len())
}

pub fn clear_shared_plan_cache() {
    if let Ok(mut cache) = shared_cache().lock() {
        cache.clear();
    }
}

/// Prime factors of `n` in ascending order (empty for `n <= 1`).
#[must_use]
pub fn prime_factors(mut n: usize) -> Vec<usize> {
    let mut factors = Vec::new();
    let mut p = 2usize;
    while p * p <= n {
        while n.is_multiple_of(p) {
            factors.push(p);
            n /= p;
        }
        p += if p == 2 { 1 } else { 2 };
    }
    if n > 1 {
        factors.push(n);
    }
    factors
}

/// Largest prime the mixed-radix recursion handles with a direct butterfly.
pub const MAX_MIXED_RADIX_PRIME: usize = 13;

/// Algorithm used for a 1-D transform of length `len`.
#[must_use]
pub fn select_strategy(len: usize) -> PlanStrategy {
    if len <= 1 {
        PlanStrategy::Identity
    } else if prime_factors(len)
        .last()
        .is_some_and(|&largest| largest <= MAX_MIXED_RADIX_PRIME)
    {
        PlanStrategy::MixedRadix
    } else {
        PlanStrategy::Bluestein
    }
}

/// Static cost estimate for a length-`len` plan at `precision`.
#[must_use]
pub fn estimate_fingerprint(len: usize, precision: Precision) -> PlanFingerprint {
    let elem_bytes = match precision {
        Precision::Single => 8,
        Precision::Double => 16,
    };
    let strategy = select_strategy(len);
    let (path, work_len) = match strategy {
        PlanStrategy::Identity => (Vec::new(), 0),
        PlanStrategy::MixedRadix => (radix_path(len), len),
        PlanStrategy::Bluestein => {
            let conv_len = len
                .saturating_mul(2)
                .saturating_sub(1)
                .checked_next_power_of_two()
                .unwrap_or(usize::MAX);
            // Two inner transforms plus the chirp products.
            (radix_path(conv_len), conv_len.saturating_mul(2))
        }
    };
    let work = work_len.max(1) as f64;
    PlanFingerprint {
        strategy,
        radix_path: path,
        estimated_flops: (5.0 * work * work.log2().max(1.0)) as u64,
        scratch_bytes: work_len.saturating_mul(elem_bytes),
    }
}

/// Radix sequence for the mixed-radix recursion, outermost stage first:
/// radix-4 stages, then at most one radix-2, then odd primes ascending.
#[must_use]
pub fn radix_path(n: usize) -> Vec<usize> {
    let primes = prime_factors(n);
    let twos = primes.iter().filter(|&&p| p == 2).count();
    let mut path = vec![4; twos / 2];
    if twos % 2 == 1 {
        path.push(2);
    }
    path.extend(primes.into_iter().filter(|&p| p != 2));
    path
}

#[cfg(test)]
mod tests {
    use super::{
        CacheAdmissionPolicy, PlanCache, PlanCacheBackend, PlanCacheConfig, PlanFingerprint,
        PlanKey, PlanMetadata, PlanStrategy, PlanningStrategy, estimate_fingerprint,
        prime_factors, radix_path, select_strategy,
    };
    use crate::Direction;
    use crate::scalar::Precision;

    fn metadata(len: usize) -> PlanMetadata {
        PlanMetadata {
            key: PlanKey::new(len, Precision::Double, Direction::Forward),
            fingerprint: PlanFingerprint {
                strategy: PlanStrategy::MixedRadix,
                radix_path: radix_path(len),
                estimated_flops: 0,
                scratch_bytes: 0,
            },
            generated_by: PlanningStrategy::EstimateOnly,
        }
    }

    #[test]
    fn default_cache_config_is_bounded() {
        let config = PlanCacheConfig::default();
        assert_eq!(config.capacity, 128);
        assert_eq!(config.admission_policy, CacheAdmissionPolicy::Lru);
    }

    #[test]
    fn lru_evicts_least_recently_used() {
        let mut cache = PlanCache::new(PlanCacheConfig {
            capacity: 2,
            ..PlanCacheConfig::default()
        });
        assert!(cache.store(metadata(8)));
        assert!(cache.store(metadata(9)));
        assert!(cache.lookup(&metadata(8).key).is_some());
        assert!(cache.store(metadata(10)));
        assert_eq!(cache.len(), 2);
        assert!(cache.lookup(&metadata(9).key).is_none());
        assert!(cache.lookup(&metadata(8).key).is_some());
    }

    #[test]
    fn disabled_policy_never_admits() {
        let mut cache = PlanCache::new(PlanCacheConfig {
            admission_policy: CacheAdmissionPolicy::Disabled,
            ..PlanCacheConfig::default()
        });
        assert!(!cache.store(metadata(16)));
        assert!(cache.is_empty());
        assert_eq!(cache.config().admission_policy, CacheAdmissionPolicy::Disabled);
    }

    #[test]
    fn radix_path_groups_twos_into_fours() {
        assert_eq!(radix_path(64), vec![4, 4, 4]);
        assert_eq!(radix_path(24), vec![4, 2, 3]);
        assert_eq!(radix_path(90), vec![2, 3, 3, 5]);
        assert!(radix_path(1).is_empty());
        assert_eq!(prime_factors(97), vec![97]);
    }

    #[test]
    fn strategy_switches_to_bluestein_above_thirteen() {
        assert_eq!(select_strategy(1), PlanStrategy::Identity);
        assert_eq!(select_strategy(13 * 64), PlanStrategy::MixedRadix);
        assert_eq!(select_strategy(17), PlanStrategy::Bluestein);
        assert_eq!(select_strategy(2 * 101), PlanStrategy::Bluestein);
    }

    #[test]
    fn bluestein_estimate_reports_power_of_two_path() {
        let fingerprint = estimate_fingerprint(97, Precision::Double);
        assert_eq!(fingerprint.strategy, PlanStrategy::Bluestein);
        assert_eq!(fingerprint.radix_path, radix_path(256));
        assert_eq!(fingerprint.scratch_bytes, 512 * 16);
    }
}
