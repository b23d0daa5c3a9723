use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::post;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::outreach::{OutreachRecord, ResponseOutcome};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/carriers/:id/outreach/:driver_id/contact",
            post(contact_driver),
        )
        .route(
            "/carriers/:id/outreach/:driver_id/response",
            post(record_response),
        )
}

#[derive(Deserialize)]
pub struct ContactRequest {
    pub message: String,
}

async fn contact_driver(
    State(state): State<Arc<AppState>>,
    Path((carrier_id, driver_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ContactRequest>,
) -> Result<Json<OutreachRecord>, EngineError> {
    if payload.message.trim().is_empty() {
        return Err(EngineError::BadRequest("message cannot be empty".to_string()));
    }

    let record = state
        .engine
        .contact_driver(carrier_id, driver_id, &payload.message)?;
    Ok(Json(record))
}

#[derive(Deserialize)]
pub struct RecordResponseRequest {
    pub outcome: ResponseOutcome,
}

async fn record_response(
    State(state): State<Arc<AppState>>,
    Path((carrier_id, driver_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<RecordResponseRequest>,
) -> Result<Json<OutreachRecord>, EngineError> {
    let record = state
        .engine
        .record_response(carrier_id, driver_id, payload.outcome)?;
    Ok(Json(record))
}
