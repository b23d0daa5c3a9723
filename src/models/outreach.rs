use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutreachState {
    Matched,
    Contacted,
    Responded,
    Hired,
    Rejected,
    Expired,
}

impl OutreachState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OutreachState::Hired | OutreachState::Rejected | OutreachState::Expired
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OutreachState::Matched => "matched",
            OutreachState::Contacted => "contacted",
            OutreachState::Responded => "responded",
            OutreachState::Hired => "hired",
            OutreachState::Rejected => "rejected",
            OutreachState::Expired => "expired",
        }
    }
}

impl fmt::Display for OutreachState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalReason {
    Hired,
    Rejected,
    NoContact,
    NoResponse,
    MaxRemindersExhausted,
}

/// Outcome a caller reports through the response endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseOutcome {
    Responded,
    Hired,
    Rejected,
}

/// Durable unit of the outreach pipeline, keyed by (carrier, driver).
/// Records are never deleted, only marked terminal; re-matching a pair after
/// a terminal record appends a fresh one once the cooldown has elapsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachRecord {
    pub carrier_id: Uuid,
    pub driver_id: Uuid,
    pub state: OutreachState,
    pub state_entered_at: DateTime<Utc>,
    pub attempt_count: u32,
    pub last_reminder_at: Option<DateTime<Utc>>,
    /// Contact quota is spent once per pair, not per dispatch attempt; this
    /// flag keeps dispatch retries from double-spending.
    pub contact_quota_spent: bool,
    pub terminal_reason: Option<TerminalReason>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl OutreachRecord {
    pub fn matched(carrier_id: Uuid, driver_id: Uuid, note: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            carrier_id,
            driver_id,
            state: OutreachState::Matched,
            state_entered_at: now,
            attempt_count: 0,
            last_reminder_at: None,
            contact_quota_spent: false,
            terminal_reason: None,
            note,
            created_at: now,
        }
    }
}
