use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::info;

use crate::track::RequestTracker;
use crate::AppState;

/// Instrumentation applied to every route: register the request in the
/// tracker, run the handler, deregister and log the measured duration.
/// The response passes through untouched.
pub async fn track_requests(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let id = format!("{} {}", req.method(), req.uri().path());

    // The snapshot endpoint reports in-flight work; registering it would
    // make every snapshot observe the request that asked for it.
    if req.uri().path() == "/api/debug" {
        info!("Started {id}");
        let start = std::time::Instant::now();
        let response = next.run(req).await;
        info!("Completed {id} in {:?}", start.elapsed());
        return response;
    }

    let mut guard = InFlightGuard::register(state.tracker.clone(), id);
    info!("Started {}", guard.id());

    let response = next.run(req).await;

    let elapsed = guard.finish();
    info!("Completed {} in {:?}", guard.id(), elapsed);

    response
}

/// RAII registration in the tracker. Axum drops the middleware future when a
/// client disconnects mid-request, so deregistration lives in `Drop` rather
/// than relying on straight-line code after `next.run`.
struct InFlightGuard {
    tracker: Arc<RequestTracker>,
    id: String,
    done: bool,
}

impl InFlightGuard {
    fn register(tracker: Arc<RequestTracker>, id: String) -> Self {
        tracker.add(&id);
        Self {
            tracker,
            id,
            done: false,
        }
    }

    fn id(&self) -> &str {
        &self.id
    }

    /// Deregister and return the measured duration.
    fn finish(&mut self) -> std::time::Duration {
        self.done = true;
        self.tracker.remove(&self.id)
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if !self.done {
            self.tracker.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn finish_deregisters_and_measures() {
        let tracker = Arc::new(RequestTracker::new());
        let mut guard = InFlightGuard::register(tracker.clone(), "GET /api/debug".into());
        assert_eq!(tracker.snapshot().len(), 1);

        let elapsed = guard.finish();
        assert!(elapsed >= Duration::ZERO);
        assert!(tracker.snapshot().is_empty());
    }

    #[test]
    fn dropping_an_unfinished_guard_cleans_up() {
        let tracker = Arc::new(RequestTracker::new());
        {
            let _guard =
                InFlightGuard::register(tracker.clone(), "POST /api/recon/portscan".into());
            assert_eq!(tracker.snapshot().len(), 1);
            // Simulates the handler future being dropped mid-flight.
        }
        assert!(tracker.snapshot().is_empty());
    }
}
