use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::driver::{GeoPoint, HomeTimePattern, PayRange};
use crate::models::outreach::OutreachRecord;
use crate::models::preference::{CarrierPreference, HardConstraints, SoftWeights};
use crate::models::quota::QuotaLedger;
use crate::models::score::RankedCandidate;
use crate::state::AppState;
use crate::stores::PreferenceStore;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/carriers/:id/preferences",
            put(upsert_preference).get(get_preference),
        )
        .route("/carriers/:id/matches", get(rank_candidates))
        .route(
            "/carriers/:id/matches/:driver_id/consume",
            post(consume_match),
        )
        .route("/carriers/:id/pipeline", get(get_pipeline))
        .route("/carriers/:id/quota", get(get_quota))
}

#[derive(Deserialize)]
pub struct UpsertPreferenceRequest {
    pub base: GeoPoint,
    #[serde(default = "default_radius")]
    pub radius_miles: f64,
    pub offered_pay: PayRange,
    pub home_time: HomeTimePattern,
    pub target_experience_years: u32,
    #[serde(default)]
    pub hard: HardConstraints,
    #[serde(default)]
    pub weights: SoftWeights,
}

fn default_radius() -> f64 {
    100.0
}

async fn upsert_preference(
    State(state): State<Arc<AppState>>,
    Path(carrier_id): Path<Uuid>,
    Json(payload): Json<UpsertPreferenceRequest>,
) -> Result<Json<CarrierPreference>, EngineError> {
    if payload.radius_miles <= 0.0 {
        return Err(EngineError::BadRequest("radius_miles must be > 0".to_string()));
    }

    let weights = payload.weights;
    if weights.location < 0.0 || weights.pay < 0.0 || weights.experience < 0.0 || weights.home_time < 0.0
    {
        return Err(EngineError::BadRequest("weights must be non-negative".to_string()));
    }

    let pref = CarrierPreference {
        carrier_id,
        base: payload.base,
        radius_miles: payload.radius_miles,
        offered_pay: payload.offered_pay,
        home_time: payload.home_time,
        target_experience_years: payload.target_experience_years,
        hard: payload.hard,
        weights,
        version: 0,
        updated_at: state.clock.now(),
    };

    let stored = state.preferences.upsert(pref);
    tracing::info!(carrier_id = %carrier_id, version = stored.version, "carrier preference updated");
    Ok(Json(stored))
}

async fn get_preference(
    State(state): State<Arc<AppState>>,
    Path(carrier_id): Path<Uuid>,
) -> Result<Json<CarrierPreference>, EngineError> {
    let pref = state
        .preferences
        .preference(carrier_id)
        .ok_or_else(|| EngineError::NotFound(format!("no preference for carrier {carrier_id}")))?;

    Ok(Json(pref))
}

async fn rank_candidates(
    State(state): State<Arc<AppState>>,
    Path(carrier_id): Path<Uuid>,
) -> Result<Json<Vec<RankedCandidate>>, EngineError> {
    let ranked = state.engine.rank_candidates(carrier_id)?;
    Ok(Json(ranked))
}

#[derive(Deserialize, Default)]
pub struct ConsumeMatchRequest {
    #[serde(default)]
    pub preference_version: Option<u64>,
    #[serde(default)]
    pub note: Option<String>,
}

async fn consume_match(
    State(state): State<Arc<AppState>>,
    Path((carrier_id, driver_id)): Path<(Uuid, Uuid)>,
    payload: Option<Json<ConsumeMatchRequest>>,
) -> Result<Json<OutreachRecord>, EngineError> {
    let payload = payload.map(|Json(body)| body).unwrap_or_default();
    let record = state
        .engine
        .consume_match(carrier_id, driver_id, payload.preference_version, payload.note)?;
    Ok(Json(record))
}

async fn get_pipeline(
    State(state): State<Arc<AppState>>,
    Path(carrier_id): Path<Uuid>,
) -> Json<Vec<OutreachRecord>> {
    Json(state.engine.pipeline(carrier_id))
}

async fn get_quota(
    State(state): State<Arc<AppState>>,
    Path(carrier_id): Path<Uuid>,
) -> Json<QuotaLedger> {
    Json(state.engine.quota_ledger(carrier_id))
}
