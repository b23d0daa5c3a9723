use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::driver::{CdlClass, EquipmentType, GeoPoint, HomeTimePattern, PayRange, ViolationClass};

/// Exclusionary filters. A candidate failing any of these is never scored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HardConstraints {
    #[serde(default)]
    pub required_equipment: Vec<EquipmentType>,
    #[serde(default)]
    pub required_cdl_class: Option<CdlClass>,
    #[serde(default)]
    pub max_violation_class: Option<ViolationClass>,
    #[serde(default)]
    pub max_violation_count: Option<u32>,
    #[serde(default)]
    pub min_experience_years: Option<u32>,
    /// When set, candidates outside `radius_miles` of the carrier base are
    /// excluded outright instead of just scoring low on location.
    #[serde(default)]
    pub enforce_radius: bool,
    #[serde(default)]
    pub require_available: bool,
}

/// Soft criterion weights. Values need not sum to anything in particular;
/// they are renormalized at scoring time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SoftWeights {
    pub location: f64,
    pub pay: f64,
    pub experience: f64,
    pub home_time: f64,
}

impl Default for SoftWeights {
    fn default() -> Self {
        Self {
            location: 25.0,
            pay: 20.0,
            experience: 15.0,
            home_time: 10.0,
        }
    }
}

/// A carrier's hiring preferences. Mutated only through the preference
/// store's upsert, which bumps `version`; rankings computed against an older
/// version are stale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarrierPreference {
    pub carrier_id: Uuid,
    pub base: GeoPoint,
    pub radius_miles: f64,
    pub offered_pay: PayRange,
    pub home_time: HomeTimePattern,
    pub target_experience_years: u32,
    pub hard: HardConstraints,
    pub weights: SoftWeights,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}
