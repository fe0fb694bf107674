//! Single timestamp source for every record the store writes.

use chrono::{DateTime, Utc};
use mockable::Clock;
use std::sync::{Arc, Mutex};

/// Millisecond clock that never repeats or goes backwards.
///
/// Wraps an injectable [`Clock`]; when the source stalls or steps back, the
/// next stamp is one millisecond after the previous one.
pub struct MonotonicClock {
    source: Arc<dyn Clock + Send + Sync>,
    last_millis: Mutex<i64>,
}

impl MonotonicClock {
    pub fn new(source: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            source,
            last_millis: Mutex::new(i64::MIN),
        }
    }

    pub fn system() -> Self {
        Self::new(Arc::new(mockable::DefaultClock))
    }

    /// Never hand out a stamp at or before `millis`.
    pub fn observe(&self, millis: i64) {
        let mut last = self.lock();
        if millis > *last {
            *last = millis;
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        let candidate = self.source.utc().timestamp_millis();
        let mut last = self.lock();
        let next = if candidate > *last {
            candidate
        } else {
            last.saturating_add(1)
        };
        *last = next;
        DateTime::from_timestamp_millis(next).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, i64> {
        // The guarded value is a plain integer, so a poisoned lock is still usable.
        match self.last_millis.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
