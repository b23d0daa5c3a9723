use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::driver::DriverProfile;

/// One soft criterion's contribution: the normalized subscore in [0,1] and
/// the raw weight it carried at scoring time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FactorScore {
    pub subscore: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub location: FactorScore,
    pub experience: FactorScore,
    pub pay: FactorScore,
    pub home_time: FactorScore,
}

impl ScoreBreakdown {
    pub fn factors(&self) -> [FactorScore; 4] {
        [self.location, self.experience, self.pay, self.home_time]
    }
}

/// Ephemeral, derived value. Never persisted as source of truth; recomputed
/// on demand and cached only per preference version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchScore {
    pub carrier_id: Uuid,
    pub driver_id: Uuid,
    pub preference_version: u64,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    pub rationale: Vec<String>,
    pub computed_at: DateTime<Utc>,
}

/// Ranking entry handed to UI bridges and analytics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub driver_id: Uuid,
    pub driver_name: String,
    pub years_experience: u32,
    pub score: f64,
    pub preference_version: u64,
    pub breakdown: ScoreBreakdown,
    pub rationale: Vec<String>,
    pub computed_at: DateTime<Utc>,
}

impl RankedCandidate {
    pub fn new(driver: &DriverProfile, score: MatchScore) -> Self {
        Self {
            driver_id: driver.id,
            driver_name: driver.name.clone(),
            years_experience: driver.years_experience,
            score: score.score,
            preference_version: score.preference_version,
            breakdown: score.breakdown,
            rationale: score.rationale,
            computed_at: score.computed_at,
        }
    }
}
