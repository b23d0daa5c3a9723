use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Variant order gives Class A the highest rank, so a driver satisfies a
/// required class whenever `driver.cdl_class >= required`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CdlClass {
    C,
    B,
    A,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EquipmentType {
    DryVan,
    Reefer,
    Flatbed,
    Tanker,
    Stepdeck,
}

/// Ascending severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ViolationClass {
    #[default]
    Clean,
    Minor,
    Serious,
    Disqualifying,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HomeTimePattern {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
}

impl HomeTimePattern {
    fn rank(self) -> u8 {
        match self {
            HomeTimePattern::Daily => 0,
            HomeTimePattern::Weekly => 1,
            HomeTimePattern::Biweekly => 2,
            HomeTimePattern::Monthly => 3,
        }
    }

    /// Adjacent patterns are compatible-but-not-identical; anything further
    /// apart is a mismatch.
    pub fn is_compatible_with(self, other: HomeTimePattern) -> bool {
        self.rank().abs_diff(other.rank()) == 1
    }
}

/// Pay expressed in cents per mile.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PayRange {
    pub min_cpm: f64,
    pub max_cpm: f64,
}

impl PayRange {
    pub fn midpoint(&self) -> f64 {
        (self.min_cpm + self.max_cpm) / 2.0
    }
}

/// Immutable snapshot of a driver as the engine consumes it. Owned and
/// mutated by the external profile store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverProfile {
    pub id: Uuid,
    pub name: String,
    pub location: GeoPoint,
    pub radius_tolerance_miles: f64,
    pub equipment: Vec<EquipmentType>,
    pub cdl_class: CdlClass,
    pub endorsements: Vec<String>,
    pub years_experience: u32,
    pub violation_count: u32,
    pub violation_class: ViolationClass,
    pub home_time: HomeTimePattern,
    pub desired_pay: PayRange,
    pub available: bool,
    pub updated_at: DateTime<Utc>,
}
