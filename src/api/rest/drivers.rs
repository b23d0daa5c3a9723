use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::driver::{
    CdlClass, DriverProfile, EquipmentType, GeoPoint, HomeTimePattern, PayRange, ViolationClass,
};
use crate::state::AppState;
use crate::stores::ProfileStore;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drivers", post(create_driver).get(list_drivers))
        .route("/drivers/:id", get(get_driver))
}

#[derive(Deserialize)]
pub struct CreateDriverRequest {
    pub name: String,
    pub location: GeoPoint,
    #[serde(default = "default_radius_tolerance")]
    pub radius_tolerance_miles: f64,
    pub equipment: Vec<EquipmentType>,
    pub cdl_class: CdlClass,
    #[serde(default)]
    pub endorsements: Vec<String>,
    pub years_experience: u32,
    #[serde(default)]
    pub violation_count: u32,
    #[serde(default)]
    pub violation_class: ViolationClass,
    pub home_time: HomeTimePattern,
    pub desired_pay: PayRange,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_radius_tolerance() -> f64 {
    100.0
}

fn default_available() -> bool {
    true
}

async fn create_driver(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateDriverRequest>,
) -> Result<Json<DriverProfile>, EngineError> {
    if payload.name.trim().is_empty() {
        return Err(EngineError::BadRequest("name cannot be empty".to_string()));
    }

    if payload.radius_tolerance_miles <= 0.0 {
        return Err(EngineError::BadRequest(
            "radius_tolerance_miles must be > 0".to_string(),
        ));
    }

    if payload.desired_pay.min_cpm < 0.0 || payload.desired_pay.min_cpm > payload.desired_pay.max_cpm {
        return Err(EngineError::BadRequest("invalid desired_pay range".to_string()));
    }

    let driver = DriverProfile {
        id: Uuid::new_v4(),
        name: payload.name,
        location: payload.location,
        radius_tolerance_miles: payload.radius_tolerance_miles,
        equipment: payload.equipment,
        cdl_class: payload.cdl_class,
        endorsements: payload.endorsements,
        years_experience: payload.years_experience,
        violation_count: payload.violation_count,
        violation_class: payload.violation_class,
        home_time: payload.home_time,
        desired_pay: payload.desired_pay,
        available: payload.available,
        updated_at: state.clock.now(),
    };

    state.profiles.insert(driver.clone());
    Ok(Json(driver))
}

async fn list_drivers(State(state): State<Arc<AppState>>) -> Json<Vec<DriverProfile>> {
    Json(state.profiles.driver_pool())
}

async fn get_driver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DriverProfile>, EngineError> {
    let driver = state
        .profiles
        .driver(id)
        .ok_or_else(|| EngineError::NotFound(format!("driver {id} not found")))?;

    Ok(Json(driver))
}
