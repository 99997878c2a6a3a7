use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Thread-safe registry of in-flight requests.
///
/// The instrumentation middleware calls `add`/`remove` around every handler;
/// the debug endpoint and the periodic reporter call `snapshot`. Keys are
/// `"<METHOD> <PATH>"` identifiers, so two concurrent requests to the same
/// route share a key: the second `add` overwrites the first's start time and
/// the first `remove` then measures against it. That understated duration is
/// an accepted trade-off — the debug report is keyed by path and stays that
/// way for compatibility.
pub struct RequestTracker {
    active: Mutex<HashMap<String, Instant>>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self {
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Register `id` as in-flight, stamped with the current instant.
    /// Overwrites any existing entry for the same identifier.
    pub fn add(&self, id: &str) {
        self.active.lock().insert(id.to_string(), Instant::now());
    }

    /// Deregister `id` and return how long it was in flight.
    /// Removing an absent key is a no-op yielding a zero duration.
    pub fn remove(&self, id: &str) -> Duration {
        match self.active.lock().remove(id) {
            Some(start) => start.elapsed(),
            None => Duration::ZERO,
        }
    }

    /// Point-in-time copy of every in-flight request with its elapsed time,
    /// all measured against a single `now`. The internal map is never
    /// exposed, so callers cannot observe later mutations.
    pub fn snapshot(&self) -> HashMap<String, Duration> {
        let now = Instant::now();
        self.active
            .lock()
            .iter()
            .map(|(id, start)| (id.clone(), now.saturating_duration_since(*start)))
            .collect()
    }
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn add_then_remove_measures_nonnegative_elapsed() {
        let tracker = RequestTracker::new();
        let before = Instant::now();
        tracker.add("GET /api/recon/whois");
        std::thread::sleep(Duration::from_millis(5));
        let measured = tracker.remove("GET /api/recon/whois");
        let upper = before.elapsed();

        assert!(measured >= Duration::from_millis(5));
        assert!(measured <= upper);
    }

    #[test]
    fn removing_an_absent_key_yields_zero() {
        let tracker = RequestTracker::new();
        assert_eq!(tracker.remove("GET /never-added"), Duration::ZERO);

        tracker.add("POST /api/recon/ping");
        tracker.remove("POST /api/recon/ping");
        assert_eq!(tracker.remove("POST /api/recon/ping"), Duration::ZERO);
    }

    #[test]
    fn snapshot_returns_every_registered_entry() {
        let tracker = RequestTracker::new();
        for i in 0..7 {
            tracker.add(&format!("GET /api/recon/{i}"));
        }

        let snap = tracker.snapshot();
        assert_eq!(snap.len(), 7);
        for (id, elapsed) in &snap {
            assert!(id.starts_with("GET /api/recon/"));
            assert!(*elapsed >= Duration::ZERO);
        }

        // The snapshot is a copy: mutating afterwards does not change it.
        tracker.add("GET /api/recon/extra");
        assert_eq!(snap.len(), 7);
    }

    #[test]
    fn concurrent_distinct_ids_leave_the_registry_empty() {
        let tracker = Arc::new(RequestTracker::new());
        let handles: Vec<_> = (0..32)
            .map(|i| {
                let tracker = tracker.clone();
                std::thread::spawn(move || {
                    let id = format!("POST /api/recon/portscan/{i}");
                    tracker.add(&id);
                    std::thread::yield_now();
                    let d = tracker.remove(&id);
                    assert!(d >= Duration::ZERO);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert!(tracker.snapshot().is_empty());
    }

    #[test]
    fn duplicate_ids_do_not_leak_entries() {
        let tracker = Arc::new(RequestTracker::new());
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let tracker = tracker.clone();
                std::thread::spawn(move || {
                    tracker.add("POST /api/recon/ping");
                    std::thread::sleep(Duration::from_millis(2));
                    tracker.remove("POST /api/recon/ping");
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        // Durations may be inaccurate under collision (documented caveat),
        // but nothing is leaked or duplicated.
        assert!(tracker.snapshot().is_empty());
    }
}
