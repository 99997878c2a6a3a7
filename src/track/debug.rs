use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

/// One in-flight request as reported by `GET /api/debug`.
/// `duration` is elapsed nanoseconds, matching what API consumers already
/// parse; order follows map iteration and is deliberately unspecified.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveRequest {
    pub path: String,
    pub duration: u64,
}

// ─── GET /api/debug ──────────────────────────────────────────────
/// Read-only view of the tracker. An idle server yields `[]`, never an error.

pub async fn debug_handler(State(state): State<Arc<AppState>>) -> Json<Vec<ActiveRequest>> {
    let entries = state
        .tracker
        .snapshot()
        .into_iter()
        .map(|(path, elapsed)| ActiveRequest {
            path,
            duration: elapsed.as_nanos() as u64,
        })
        .collect();

    Json(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_path_and_duration_keys() {
        let entry = ActiveRequest {
            path: "POST /api/recon/ping".to_string(),
            duration: 1_500_000,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["path"], "POST /api/recon/ping");
        assert_eq!(json["duration"], 1_500_000);
    }
}
