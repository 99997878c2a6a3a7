pub mod dns;
pub mod network;
pub mod osint;
pub mod portscan;
pub mod shodan;
pub mod spiderfoot;
pub mod web;

use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde::Serialize;
use serde_json::Value;

// ─── Shared response envelope ────────────────────────────────────

/// Every recon endpoint answers HTTP 200 and signals failure through the
/// `status` field instead of HTTP status codes. Existing API consumers
/// depend on that convention, so it is preserved as-is.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ApiResponse {
    pub fn success(data: impl Into<Value>) -> Json<Self> {
        Json(Self {
            status: "success".into(),
            message: None,
            data: Some(data.into()),
        })
    }

    /// Success with an explanatory note (e.g. a fallback path was used).
    pub fn success_with_note(message: impl Into<String>, data: impl Into<Value>) -> Json<Self> {
        Json(Self {
            status: "success".into(),
            message: Some(message.into()),
            data: Some(data.into()),
        })
    }

    /// Tool produced output but exited non-zero for reasons that are not
    /// necessarily fatal (sherlock does this when individual sites are down).
    pub fn partial_success(message: impl Into<String>, data: impl Into<Value>) -> Json<Self> {
        Json(Self {
            status: "partial_success".into(),
            message: Some(message.into()),
            data: Some(data.into()),
        })
    }

    pub fn info(message: impl Into<String>, data: impl Into<Value>) -> Json<Self> {
        Json(Self {
            status: "info".into(),
            message: Some(message.into()),
            data: Some(data.into()),
        })
    }

    pub fn error(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            status: "error".into(),
            message: Some(message.into()),
            data: None,
        })
    }

    /// Failure that still carries the tool's partial output.
    pub fn error_with_output(message: impl Into<String>, output: impl Into<Value>) -> Json<Self> {
        Json(Self {
            status: "error".into(),
            message: Some(message.into()),
            data: Some(output.into()),
        })
    }
}

// ─── Request-body plumbing ───────────────────────────────────────

/// Unwrap a JSON body extraction, mapping any rejection (bad JSON, wrong
/// content type, type mismatch) to the in-band error envelope. Axum's
/// default rejection would answer 4xx, which this API never does.
pub fn decode_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, Json<ApiResponse>> {
    match body {
        Ok(Json(req)) => Ok(req),
        Err(_) => Err(ApiResponse::error("Invalid request body")),
    }
}
