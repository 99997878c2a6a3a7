use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::info;

use super::RequestTracker;

/// Background observer that logs a bordered report of in-flight requests on
/// a fixed cadence. Purely read-only over the tracker; an empty snapshot
/// produces no output at all.
pub struct DebugReporter;

/// Handle to a spawned reporter. Production code holds it for the life of
/// the process; tests call `stop()` to shut the loop down deterministically.
pub struct ReporterHandle {
    shutdown: watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
}

impl DebugReporter {
    pub fn spawn(tracker: Arc<RequestTracker>, interval: Duration) -> ReporterHandle {
        let (shutdown, mut stopped) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The immediate first tick would report before anything is
            // in flight; skip it.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Some(report) = format_report(&tracker.snapshot()) {
                            info!("{report}");
                        }
                    }
                    _ = stopped.changed() => break,
                }
            }
        });

        ReporterHandle { shutdown, task }
    }
}

impl ReporterHandle {
    /// Signal the loop to exit and wait for it.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

/// Render a snapshot as the bordered multi-line report, or `None` when there
/// is nothing in flight. Durations are rounded to millisecond precision.
pub fn format_report(snapshot: &HashMap<String, Duration>) -> Option<String> {
    if snapshot.is_empty() {
        return None;
    }

    let mut report = format!(
        "=== DEBUG: Currently running requests ({}) ===",
        snapshot.len()
    );
    for (id, elapsed) in snapshot {
        let _ = write!(report, "\n⏳ {id} - running for {}ms", elapsed.as_millis());
    }
    report.push_str("\n==================================================");
    Some(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot_renders_nothing() {
        assert!(format_report(&HashMap::new()).is_none());
    }

    #[test]
    fn report_names_every_identifier() {
        let mut snap = HashMap::new();
        snap.insert("POST /api/recon/whois".to_string(), Duration::from_millis(1534));
        snap.insert("GET /api/debug".to_string(), Duration::from_millis(3));

        let report = format_report(&snap).unwrap();
        assert!(report.contains("running requests (2)"));
        assert!(report.contains("POST /api/recon/whois - running for 1534ms"));
        assert!(report.contains("GET /api/debug - running for 3ms"));
    }

    #[tokio::test]
    async fn handle_stops_the_loop() {
        let tracker = Arc::new(RequestTracker::new());
        tracker.add("POST /api/recon/spiderfoot");

        let handle = DebugReporter::spawn(tracker.clone(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(35)).await;
        handle.stop().await;

        // Reporter never mutates the registry.
        assert_eq!(tracker.snapshot().len(), 1);
    }
}
