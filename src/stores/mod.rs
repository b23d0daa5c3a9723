pub mod memory;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::driver::DriverProfile;
use crate::models::preference::CarrierPreference;
use crate::models::quota::{BillingCycle, QuotaLimits};

/// Read-only view over driver profiles. Profile ownership and mutation live
/// with the external profile-management collaborator.
pub trait ProfileStore: Send + Sync {
    fn driver_pool(&self) -> Vec<DriverProfile>;
    fn driver(&self, id: Uuid) -> Option<DriverProfile>;
}

pub trait PreferenceStore: Send + Sync {
    fn preference(&self, carrier_id: Uuid) -> Option<CarrierPreference>;
}

/// Resolves subscription-tier limits. The gate treats these as read-only
/// inputs; it owns only the consumption counters.
pub trait TierResolver: Send + Sync {
    fn limits_for(&self, carrier_id: Uuid, cycle: &BillingCycle) -> QuotaLimits;
}

/// Delivers outreach messages (email/SMS behind it). Failure is transient
/// and must not advance pipeline state.
pub trait OutreachDispatcher: Send + Sync {
    fn send(&self, carrier_id: Uuid, driver_id: Uuid, message: &str) -> Result<(), EngineError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
