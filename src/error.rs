use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde_json::json;
use thiserror::Error;

use crate::models::outreach::OutreachState;
use crate::models::quota::{BillingCycle, QuotaKind};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{kind} quota exhausted for cycle {cycle} (limit {limit})")]
    QuotaExceeded {
        kind: QuotaKind,
        limit: u32,
        cycle: BillingCycle,
    },

    #[error("invalid transition from {from} to {attempted}")]
    InvalidTransition {
        from: OutreachState,
        attempted: OutreachState,
    },

    #[error("pair is cooling down until {until}")]
    CooldownActive { until: DateTime<Utc> },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("outreach dispatch failed: {0}")]
    DispatchFailed(String),

    #[error("ranking used preference version {requested}, current is {current}")]
    StaleVersion { requested: u64, current: u64 },

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    fn code(&self) -> &'static str {
        match self {
            EngineError::QuotaExceeded { .. } => "quota_exceeded",
            EngineError::InvalidTransition { .. } => "invalid_transition",
            EngineError::CooldownActive { .. } => "cooldown_active",
            EngineError::NotFound(_) => "not_found",
            EngineError::DispatchFailed(_) => "dispatch_failed",
            EngineError::StaleVersion { .. } => "stale_version",
            EngineError::BadRequest(_) => "bad_request",
            EngineError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = match &self {
            EngineError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            EngineError::InvalidTransition { .. }
            | EngineError::CooldownActive { .. }
            | EngineError::StaleVersion { .. } => StatusCode::CONFLICT,
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::DispatchFailed(_) => StatusCode::BAD_GATEWAY,
            EngineError::BadRequest(_) => StatusCode::BAD_REQUEST,
            EngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code()
        }));

        (status, body).into_response()
    }
}
