use crate::model::SpanKey;
use futures::lock::Mutex as AsyncMutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// Dead entries are swept once the map grows past this many keys.
const SWEEP_THRESHOLD: usize = 256;

/// One async mutex per `(employee, date)`. Callers on different keys never
/// contend; entries vanish once nobody holds or waits on them.
#[derive(Default)]
pub struct KeyLocks {
    slots: Mutex<HashMap<SpanKey, Weak<AsyncMutex<()>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` while holding the lock for `key`.
    pub async fn run<F, Fut, T>(&self, key: SpanKey, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let slot = self.slot(key);
        let _guard = slot.lock().await;
        f().await
    }

    fn slot(&self, key: SpanKey) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(live) = slots.get(&key).and_then(Weak::upgrade) {
            return live;
        }

        if slots.len() >= SWEEP_THRESHOLD {
            slots.retain(|_, w| w.strong_count() > 0);
        }

        let fresh = Arc::new(AsyncMutex::new(()));
        slots.insert(key, Arc::downgrade(&fresh));
        fresh
    }

    /// Keys with a live lock.
    pub fn active(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.values().filter(|w| w.strong_count() > 0).count()
    }
}
