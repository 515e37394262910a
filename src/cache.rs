use moka::future::Cache;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_MAX_CAPACITY: u64 = 1000;
/// How long an expired entry stays readable through `get_stale` before eviction.
pub const DEFAULT_STALE_GRACE: Duration = Duration::from_secs(60 * 60);

#[derive(Clone, Debug)]
pub struct CacheEntry<T> {
    pub value: T,
    pub inserted_at: Instant,
    /// `None` keeps the entry for the lifetime of the process.
    pub ttl: Option<Duration>,
}

impl<T> CacheEntry<T> {
    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.inserted_at)
    }

    pub fn is_fresh(&self) -> bool {
        match self.ttl {
            Some(ttl) => self.age() <= ttl,
            None => true,
        }
    }

    fn is_dead(&self, grace: Duration) -> bool {
        match self.ttl {
            Some(ttl) => self.age() > ttl + grace,
            None => false,
        }
    }
}

/// TTL key/value store shared by the adapters. Expiry is checked on lookup;
/// nothing sweeps the map in the background.
#[derive(Clone)]
pub struct TtlCache<T> {
    name: &'static str,
    entries: Cache<String, CacheEntry<T>>,
    stale_grace: Duration,
}

impl<T> TtlCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str) -> Self {
        Self::with_limits(name, DEFAULT_MAX_CAPACITY, DEFAULT_STALE_GRACE)
    }

    pub fn with_limits(name: &'static str, max_capacity: u64, stale_grace: Duration) -> Self {
        Self {
            name,
            entries: Cache::builder().max_capacity(max_capacity).build(),
            stale_grace,
        }
    }

    /// Returns the value only while it is younger than its TTL.
    pub async fn get(&self, key: &str) -> Option<T> {
        let entry = self.lookup(key).await?;
        if entry.is_fresh() {
            tracing::debug!(cache = self.name, key, "cache hit");
            Some(entry.value)
        } else {
            tracing::debug!(cache = self.name, key, "cache entry expired");
            None
        }
    }

    /// Returns the last stored value even if its TTL has passed.
    pub async fn get_stale(&self, key: &str) -> Option<T> {
        self.lookup(key).await.map(|entry| entry.value)
    }

    pub async fn set(&self, key: impl Into<String>, value: T, ttl: Option<Duration>) {
        let entry = CacheEntry {
            value,
            inserted_at: Instant::now(),
            ttl,
        };
        self.entries.insert(key.into(), entry).await;
    }

    pub async fn invalidate(&self, key: &str) {
        self.entries.invalidate(key).await;
    }

    async fn lookup(&self, key: &str) -> Option<CacheEntry<T>> {
        let entry = self.entries.get(key).await?;
        if entry.is_dead(self.stale_grace) {
            tracing::debug!(cache = self.name, key, "evicting expired entry");
            self.entries.invalidate(key).await;
            return None;
        }
        Some(entry)
    }
}

/// Builds a deterministic key from an operation name and its normalized parameters.
pub fn cache_key(operation: &str, params: &[String]) -> String {
    if params.is_empty() {
        return operation.to_string();
    }
    format!("{}:{}", operation, params.join(":"))
}

/// Rounds a coordinate to two decimals (about 1 km) so nearby requests share a key.
pub fn round_coord(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    // avoid "-0.00" and "0.00" producing different keys
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{:.2}", rounded)
}
