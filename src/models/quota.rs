use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Billing period key, `YYYY-MM`. The boundary comes from the externally
/// supplied clock; the gate never rolls cycles on its own timer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BillingCycle(pub String);

impl BillingCycle {
    pub fn containing(now: DateTime<Utc>) -> Self {
        Self(now.format("%Y-%m").to_string())
    }
}

impl fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuotaKind {
    Match,
    Contact,
}

impl QuotaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            QuotaKind::Match => "match",
            QuotaKind::Contact => "contact",
        }
    }
}

impl fmt::Display for QuotaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only limits resolved from the carrier's subscription tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuotaLimits {
    pub match_limit: u32,
    pub contact_limit: u32,
}

/// One active ledger per carrier per cycle. Counters only ever move through
/// the gate's atomic check-and-increment, so consumed <= limit always holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaLedger {
    pub carrier_id: Uuid,
    pub cycle: BillingCycle,
    pub matches_consumed: u32,
    pub contacts_consumed: u32,
    pub match_limit: u32,
    pub contact_limit: u32,
}

impl QuotaLedger {
    pub fn open(carrier_id: Uuid, cycle: BillingCycle, limits: &QuotaLimits) -> Self {
        Self {
            carrier_id,
            cycle,
            matches_consumed: 0,
            contacts_consumed: 0,
            match_limit: limits.match_limit,
            contact_limit: limits.contact_limit,
        }
    }

    pub fn remaining(&self, kind: QuotaKind) -> u32 {
        match kind {
            QuotaKind::Match => self.match_limit.saturating_sub(self.matches_consumed),
            QuotaKind::Contact => self.contact_limit.saturating_sub(self.contacts_consumed),
        }
    }
}
