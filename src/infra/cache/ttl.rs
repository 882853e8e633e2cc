use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Values remembered for a bounded window. Time is passed in explicitly so
/// callers decide what "now" is.
#[derive(Debug, Clone)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: HashMap<K, (DateTime<Utc>, V)>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh value for `key`; expired entries are evicted.
    pub fn get(&mut self, key: &K, now: DateTime<Utc>) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some((stored_at, value)) if now - *stored_at < self.ttl => {
                debug!(key = ?key, "cache hit");
                return Some(value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            debug!(key = ?key, "cache entry expired");
            self.entries.remove(key);
        }
        None
    }

    pub fn insert(&mut self, key: K, value: V, now: DateTime<Utc>) {
        self.entries.insert(key, (now, value));
    }

    /// Cached value, or the result of `load` stored under `key`. A failed load
    /// stores nothing.
    pub fn get_or_try_insert_with<E>(
        &mut self,
        key: &K,
        now: DateTime<Utc>,
        load: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(value) = self.get(key, now) {
            return Ok(value);
        }
        debug!(key = ?key, "cache miss");
        let value = load()?;
        self.insert(key.clone(), value.clone(), now);
        Ok(value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0)
            .single()
            .expect("timestamp should be valid")
    }

    #[test]
    fn values_expire_after_ttl() {
        let mut cache = TtlCache::new(Duration::seconds(600));
        cache.insert("RevbyNat".to_string(), 1, at(0));

        assert_eq!(cache.get(&"RevbyNat".to_string(), at(599)), Some(1));
        assert_eq!(cache.get(&"RevbyNat".to_string(), at(600)), None);
        assert!(cache.is_empty(), "expired entry should be evicted");
    }

    #[test]
    fn loader_runs_only_on_miss() {
        let mut cache = TtlCache::new(Duration::seconds(10));
        let mut loads = 0;

        for secs in [0, 5, 9] {
            let value: Result<&str, ()> = cache.get_or_try_insert_with(&"k", at(secs), || {
                loads += 1;
                Ok("v")
            });
            assert_eq!(value, Ok("v"));
        }

        assert_eq!(loads, 1);
    }

    #[test]
    fn failed_load_is_not_cached() {
        let mut cache: TtlCache<&str, i32> = TtlCache::new(Duration::seconds(10));

        let first: Result<i32, &str> = cache.get_or_try_insert_with(&"k", at(0), || Err("boom"));
        let second: Result<i32, &str> = cache.get_or_try_insert_with(&"k", at(1), || Ok(7));

        assert_eq!(first, Err("boom"));
        assert_eq!(second, Ok(7));
    }
}
