use crate::model::Employee;
use moka::future::Cache;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Short-lived cache of tag lookups. Holds active employees only, so a
/// deactivation is never masked by a cached "active" entry once the writer
/// has called `invalidate`.
///
/// Every invalidation bumps a generation counter. A lookup that started
/// before an invalidation cannot fill the cache afterwards.
#[derive(Clone)]
pub struct TagCache {
    inner: Cache<String, Employee>,
    generation: Arc<AtomicU64>,
}

impl TagCache {
    /// `None` when `ttl` is zero, meaning caching is off.
    pub fn new(ttl: Duration, max_capacity: u64) -> Option<Self> {
        if ttl.is_zero() {
            return None;
        }

        let inner = Cache::builder()
            .max_capacity(max_capacity) // tune based on memory
            .time_to_live(ttl)
            .build();

        Some(Self {
            inner,
            generation: Arc::new(AtomicU64::new(0)),
        })
    }

    pub async fn get(&self, tag: &str) -> Option<Employee> {
        self.inner.get(tag).await
    }

    /// Read before the directory lookup and hand back to `remember`.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Caches `employee` unless it is inactive or an invalidation happened
    /// since `seen` was read.
    pub async fn remember(&self, employee: &Employee, seen: u64) {
        if !employee.active || self.generation() != seen {
            return;
        }

        self.inner
            .insert(employee.rfid_tag.clone(), employee.clone())
            .await;

        // An invalidation that landed between the check and the insert.
        if self.generation() != seen {
            self.inner.invalidate(employee.rfid_tag.as_str()).await;
        }
    }

    pub async fn invalidate(&self, tag: &str) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.inner.invalidate(tag).await;
    }

    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.inner.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ana() -> Employee {
        Employee::new(1, "Ana", "ana@company.com", "RFID001")
    }

    #[test]
    fn zero_ttl_disables_the_cache() {
        assert!(TagCache::new(Duration::ZERO, 100).is_none());
    }

    #[actix_web::test]
    async fn only_active_employees_are_remembered() {
        let cache = TagCache::new(Duration::from_secs(60), 100).unwrap();
        let inactive = Employee::new(2, "Bo", "bo@company.com", "RFID002").inactive();

        let seen = cache.generation();
        cache.remember(&ana(), seen).await;
        cache.remember(&inactive, seen).await;

        assert_eq!(cache.get("RFID001").await, Some(ana()));
        assert_eq!(cache.get("RFID002").await, None);
    }

    #[actix_web::test]
    async fn invalidate_drops_the_entry() {
        let cache = TagCache::new(Duration::from_secs(60), 100).unwrap();
        cache.remember(&ana(), cache.generation()).await;

        cache.invalidate("RFID001").await;
        assert_eq!(cache.get("RFID001").await, None);
    }

    #[actix_web::test]
    async fn lookup_older_than_an_invalidation_is_not_cached() {
        let cache = TagCache::new(Duration::from_secs(60), 100).unwrap();

        let seen = cache.generation();
        cache.invalidate("RFID001").await;
        cache.remember(&ana(), seen).await;
        assert_eq!(cache.get("RFID001").await, None);

        let seen = cache.generation();
        cache.invalidate_all();
        cache.remember(&ana(), seen).await;
        assert_eq!(cache.get("RFID001").await, None);

        cache.remember(&ana(), cache.generation()).await;
        assert_eq!(cache.get("RFID001").await, Some(ana()));
    }
}
