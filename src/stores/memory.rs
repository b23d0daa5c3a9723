use std::sync::Mutex;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::driver::DriverProfile;
use crate::models::preference::CarrierPreference;
use crate::models::quota::{BillingCycle, QuotaLimits};
use crate::stores::{Clock, OutreachDispatcher, PreferenceStore, ProfileStore, TierResolver};

#[derive(Default)]
pub struct InMemoryProfiles {
    drivers: DashMap<Uuid, DriverProfile>,
}

impl InMemoryProfiles {
    pub fn insert(&self, driver: DriverProfile) {
        self.drivers.insert(driver.id, driver);
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}

impl ProfileStore for InMemoryProfiles {
    fn driver_pool(&self) -> Vec<DriverProfile> {
        self.drivers.iter().map(|entry| entry.value().clone()).collect()
    }

    fn driver(&self, id: Uuid) -> Option<DriverProfile> {
        self.drivers.get(&id).map(|entry| entry.value().clone())
    }
}

#[derive(Default)]
pub struct InMemoryPreferences {
    preferences: DashMap<Uuid, CarrierPreference>,
}

impl InMemoryPreferences {
    /// Assigns the next version under the entry guard, so concurrent upserts
    /// for the same carrier never reuse a version number.
    pub fn upsert(&self, mut pref: CarrierPreference) -> CarrierPreference {
        match self.preferences.entry(pref.carrier_id) {
            Entry::Occupied(mut occupied) => {
                pref.version = occupied.get().version + 1;
                occupied.insert(pref.clone());
            }
            Entry::Vacant(vacant) => {
                pref.version = 1;
                vacant.insert(pref.clone());
            }
        }
        pref
    }

    pub fn len(&self) -> usize {
        self.preferences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.preferences.is_empty()
    }
}

impl PreferenceStore for InMemoryPreferences {
    fn preference(&self, carrier_id: Uuid) -> Option<CarrierPreference> {
        self.preferences
            .get(&carrier_id)
            .map(|entry| entry.value().clone())
    }
}

/// Tier resolver with a default tier and optional per-carrier overrides.
pub struct StaticTierResolver {
    default_limits: QuotaLimits,
    overrides: DashMap<Uuid, QuotaLimits>,
}

impl StaticTierResolver {
    pub fn new(default_limits: QuotaLimits) -> Self {
        Self {
            default_limits,
            overrides: DashMap::new(),
        }
    }

    pub fn set_limits(&self, carrier_id: Uuid, limits: QuotaLimits) {
        self.overrides.insert(carrier_id, limits);
    }
}

impl TierResolver for StaticTierResolver {
    fn limits_for(&self, carrier_id: Uuid, _cycle: &BillingCycle) -> QuotaLimits {
        self.overrides
            .get(&carrier_id)
            .map(|entry| *entry.value())
            .unwrap_or(self.default_limits)
    }
}

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub carrier_id: Uuid,
    pub driver_id: Uuid,
    pub message: String,
}

/// Dispatcher stand-in that records every send. Real delivery is an external
/// collaborator; this keeps the seam observable for dashboards and tests.
#[derive(Default)]
pub struct RecordingDispatcher {
    sent: Mutex<Vec<SentMessage>>,
}

impl RecordingDispatcher {
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

impl OutreachDispatcher for RecordingDispatcher {
    fn send(&self, carrier_id: Uuid, driver_id: Uuid, message: &str) -> Result<(), EngineError> {
        tracing::info!(carrier_id = %carrier_id, driver_id = %driver_id, "outreach message dispatched");
        self.sent
            .lock()
            .map_err(|_| EngineError::Internal("dispatcher mutex poisoned".to_string()))?
            .push(SentMessage {
                carrier_id,
                driver_id,
                message: message.to_string(),
            });
        Ok(())
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Test clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn advance(&self, by: chrono::Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|now| *now).unwrap_or_else(|_| Utc::now())
    }
}
