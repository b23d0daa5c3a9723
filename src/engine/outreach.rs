use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::models::outreach::{OutreachRecord, OutreachState, TerminalReason};

/// Transition table for the outreach state machine. Anything not listed here
/// fails with `InvalidTransition` and leaves the record untouched.
fn transition_allowed(from: OutreachState, to: OutreachState) -> bool {
    use OutreachState::*;
    matches!(
        (from, to),
        (Matched, Contacted)
            | (Matched, Expired)
            | (Contacted, Responded)
            | (Contacted, Expired)
            | (Responded, Hired)
            | (Responded, Rejected)
    )
}

/// What a timeout sweep changed. Counts are derivable; the records are kept
/// so the caller can dispatch reminder messages after the locks are released.
#[derive(Debug, Default)]
pub struct SweepOutcome {
    pub expired: Vec<OutreachRecord>,
    pub reminded: Vec<OutreachRecord>,
}

impl SweepOutcome {
    pub fn is_empty(&self) -> bool {
        self.expired.is_empty() && self.reminded.is_empty()
    }
}

/// Durable state machine per (carrier, driver) pair. Records per pair are
/// append-only; at most the last one is live. The dashmap entry guard
/// serializes operations on a pair while leaving other pairs free.
pub struct OutreachTracker {
    pairs: DashMap<(Uuid, Uuid), Vec<OutreachRecord>>,
}

impl OutreachTracker {
    pub fn new() -> Self {
        Self {
            pairs: DashMap::new(),
        }
    }

    /// Opens a pair's outreach, creating a fresh `Matched` record. If a live
    /// record already exists it is returned unchanged and `spend` is never
    /// called, so a dispatch retry does not re-spend match quota. After a
    /// terminal record the cooldown must have elapsed. `spend` runs before
    /// the record is created; if it fails, nothing changes.
    pub fn begin<F>(
        &self,
        carrier_id: Uuid,
        driver_id: Uuid,
        note: Option<String>,
        now: DateTime<Utc>,
        cooldown: Duration,
        spend: F,
    ) -> Result<(OutreachRecord, bool), EngineError>
    where
        F: FnOnce() -> Result<(), EngineError>,
    {
        let mut entry = self.pairs.entry((carrier_id, driver_id)).or_default();
        let records = entry.value_mut();

        if let Some(live) = records.iter().rev().find(|r| !r.state.is_terminal()) {
            return Ok((live.clone(), false));
        }

        if let Some(last) = records.last() {
            let until = last.state_entered_at + cooldown;
            if now < until {
                return Err(EngineError::CooldownActive { until });
            }
        }

        spend()?;

        let record = OutreachRecord::matched(carrier_id, driver_id, note, now);
        records.push(record.clone());
        Ok((record, true))
    }

    /// Validates the pair is ready for a contact dispatch and spends contact
    /// quota exactly once per pair. The dispatch itself happens outside the
    /// pair lock; `commit_contact` applies the transition afterwards.
    pub fn prepare_contact<F>(
        &self,
        carrier_id: Uuid,
        driver_id: Uuid,
        spend: F,
    ) -> Result<OutreachRecord, EngineError>
    where
        F: FnOnce() -> Result<(), EngineError>,
    {
        let mut entry = self
            .pairs
            .get_mut(&(carrier_id, driver_id))
            .ok_or_else(|| no_record(driver_id))?;
        let records = entry.value_mut();

        let Some(idx) = records.iter().rposition(|r| !r.state.is_terminal()) else {
            return match records.last() {
                Some(last) => Err(EngineError::InvalidTransition {
                    from: last.state,
                    attempted: OutreachState::Contacted,
                }),
                None => Err(no_record(driver_id)),
            };
        };
        let record = &mut records[idx];

        if record.state != OutreachState::Matched {
            return Err(EngineError::InvalidTransition {
                from: record.state,
                attempted: OutreachState::Contacted,
            });
        }

        if !record.contact_quota_spent {
            spend()?;
            record.contact_quota_spent = true;
        }

        Ok(record.clone())
    }

    pub fn commit_contact(
        &self,
        carrier_id: Uuid,
        driver_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<OutreachRecord, EngineError> {
        self.transition(carrier_id, driver_id, OutreachState::Contacted, None, now)
    }

    /// The only way state changes. Applies one validated transition to the
    /// pair's live record; terminal records never transition again.
    pub fn transition(
        &self,
        carrier_id: Uuid,
        driver_id: Uuid,
        to: OutreachState,
        reason: Option<TerminalReason>,
        now: DateTime<Utc>,
    ) -> Result<OutreachRecord, EngineError> {
        let mut entry = self
            .pairs
            .get_mut(&(carrier_id, driver_id))
            .ok_or_else(|| no_record(driver_id))?;
        let records = entry.value_mut();

        let Some(idx) = records.iter().rposition(|r| !r.state.is_terminal()) else {
            return match records.last() {
                Some(last) => Err(EngineError::InvalidTransition {
                    from: last.state,
                    attempted: to,
                }),
                None => Err(no_record(driver_id)),
            };
        };
        let record = &mut records[idx];

        if !transition_allowed(record.state, to) {
            return Err(EngineError::InvalidTransition {
                from: record.state,
                attempted: to,
            });
        }

        record.state = to;
        record.state_entered_at = now;
        if to.is_terminal() {
            record.terminal_reason = reason;
        }

        Ok(record.clone())
    }

    /// Idempotent time-based sweep: with non-decreasing `now`, a record is
    /// never double-transitioned and a reminder never fires twice for the
    /// same instant.
    pub fn evaluate_timeouts(&self, now: DateTime<Utc>, cfg: &EngineConfig) -> SweepOutcome {
        let mut outcome = SweepOutcome::default();

        for mut entry in self.pairs.iter_mut() {
            let records = entry.value_mut();
            let Some(idx) = records.iter().rposition(|r| !r.state.is_terminal()) else {
                continue;
            };
            let record = &mut records[idx];

            match record.state {
                OutreachState::Matched => {
                    if now - record.state_entered_at >= cfg.match_window() {
                        expire(record, TerminalReason::NoContact, now);
                        outcome.expired.push(record.clone());
                    }
                }
                OutreachState::Contacted => {
                    if now - record.state_entered_at >= cfg.response_window() {
                        expire(record, TerminalReason::NoResponse, now);
                        outcome.expired.push(record.clone());
                    } else {
                        let since = record.last_reminder_at.unwrap_or(record.state_entered_at);
                        if now - since >= cfg.reminder_interval() {
                            if record.attempt_count >= cfg.max_reminder_attempts {
                                expire(record, TerminalReason::MaxRemindersExhausted, now);
                                outcome.expired.push(record.clone());
                            } else {
                                record.attempt_count += 1;
                                record.last_reminder_at = Some(now);
                                outcome.reminded.push(record.clone());
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        outcome
    }

    /// Full history for a carrier, oldest first. Live and terminal records
    /// both appear; nothing is ever deleted.
    pub fn pipeline(&self, carrier_id: Uuid) -> Vec<OutreachRecord> {
        let mut out: Vec<OutreachRecord> = self
            .pairs
            .iter()
            .filter(|entry| entry.key().0 == carrier_id)
            .flat_map(|entry| entry.value().clone())
            .collect();
        out.sort_by_key(|r| (r.created_at, r.driver_id));
        out
    }

    pub fn live_total(&self) -> usize {
        self.pairs
            .iter()
            .filter(|entry| entry.value().iter().any(|r| !r.state.is_terminal()))
            .count()
    }

    pub fn live_state_counts(&self) -> [(OutreachState, i64); 3] {
        let mut matched = 0i64;
        let mut contacted = 0i64;
        let mut responded = 0i64;

        for entry in self.pairs.iter() {
            if let Some(record) = entry.value().iter().rev().find(|r| !r.state.is_terminal()) {
                match record.state {
                    OutreachState::Matched => matched += 1,
                    OutreachState::Contacted => contacted += 1,
                    OutreachState::Responded => responded += 1,
                    _ => {}
                }
            }
        }

        [
            (OutreachState::Matched, matched),
            (OutreachState::Contacted, contacted),
            (OutreachState::Responded, responded),
        ]
    }
}

impl Default for OutreachTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn expire(record: &mut OutreachRecord, reason: TerminalReason, now: DateTime<Utc>) {
    record.state = OutreachState::Expired;
    record.state_entered_at = now;
    record.terminal_reason = Some(reason);
}

fn no_record(driver_id: Uuid) -> EngineError {
    EngineError::NotFound(format!("no outreach record for driver {driver_id}"))
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use uuid::Uuid;

    use super::{OutreachTracker, transition_allowed};
    use crate::config::EngineConfig;
    use crate::error::EngineError;
    use crate::models::outreach::{OutreachState, TerminalReason};

    fn carrier() -> Uuid {
        Uuid::from_u128(100)
    }

    fn driver() -> Uuid {
        Uuid::from_u128(200)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap()
    }

    fn no_spend() -> Result<(), EngineError> {
        Ok(())
    }

    fn begin(tracker: &OutreachTracker, now: DateTime<Utc>) {
        tracker
            .begin(carrier(), driver(), None, now, Duration::hours(720), no_spend)
            .unwrap();
    }

    #[test]
    fn transition_table_matches_design() {
        use OutreachState::*;

        assert!(transition_allowed(Matched, Contacted));
        assert!(transition_allowed(Matched, Expired));
        assert!(transition_allowed(Contacted, Responded));
        assert!(transition_allowed(Contacted, Expired));
        assert!(transition_allowed(Responded, Hired));
        assert!(transition_allowed(Responded, Rejected));

        assert!(!transition_allowed(Matched, Responded));
        assert!(!transition_allowed(Contacted, Hired));
        for terminal in [Hired, Rejected, Expired] {
            for to in [Matched, Contacted, Responded, Hired, Rejected, Expired] {
                assert!(!transition_allowed(terminal, to));
            }
        }
    }

    #[test]
    fn full_chain_to_hired() {
        let tracker = OutreachTracker::new();
        begin(&tracker, t0());

        tracker.commit_contact(carrier(), driver(), t0()).unwrap();
        tracker
            .transition(carrier(), driver(), OutreachState::Responded, None, t0())
            .unwrap();
        let hired = tracker
            .transition(
                carrier(),
                driver(),
                OutreachState::Hired,
                Some(TerminalReason::Hired),
                t0(),
            )
            .unwrap();

        assert_eq!(hired.state, OutreachState::Hired);
        assert_eq!(hired.terminal_reason, Some(TerminalReason::Hired));
    }

    #[test]
    fn skipping_a_state_is_rejected_and_record_unchanged() {
        let tracker = OutreachTracker::new();
        begin(&tracker, t0());

        let err = tracker
            .transition(carrier(), driver(), OutreachState::Hired, None, t0())
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidTransition {
                from: OutreachState::Matched,
                attempted: OutreachState::Hired,
            }
        ));

        let record = &tracker.pipeline(carrier())[0];
        assert_eq!(record.state, OutreachState::Matched);
    }

    #[test]
    fn terminal_records_never_transition() {
        let tracker = OutreachTracker::new();
        begin(&tracker, t0());
        tracker.commit_contact(carrier(), driver(), t0()).unwrap();
        tracker
            .transition(carrier(), driver(), OutreachState::Responded, None, t0())
            .unwrap();
        tracker
            .transition(
                carrier(),
                driver(),
                OutreachState::Rejected,
                Some(TerminalReason::Rejected),
                t0(),
            )
            .unwrap();

        let err = tracker
            .transition(carrier(), driver(), OutreachState::Contacted, None, t0())
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidTransition {
                from: OutreachState::Rejected,
                ..
            }
        ));
    }

    #[test]
    fn cooldown_blocks_then_allows_rematch_with_reset_attempts() {
        let tracker = OutreachTracker::new();
        let cooldown = Duration::hours(720);
        begin(&tracker, t0());
        tracker.commit_contact(carrier(), driver(), t0()).unwrap();
        tracker
            .transition(carrier(), driver(), OutreachState::Responded, None, t0())
            .unwrap();
        let rejected_at = t0() + Duration::hours(1);
        tracker
            .transition(
                carrier(),
                driver(),
                OutreachState::Rejected,
                Some(TerminalReason::Rejected),
                rejected_at,
            )
            .unwrap();

        let too_soon = rejected_at + cooldown - Duration::hours(1);
        let err = tracker
            .begin(carrier(), driver(), None, too_soon, cooldown, no_spend)
            .unwrap_err();
        assert!(matches!(err, EngineError::CooldownActive { .. }));

        let after = rejected_at + cooldown;
        let (fresh, created) = tracker
            .begin(carrier(), driver(), None, after, cooldown, no_spend)
            .unwrap();
        assert!(created);
        assert_eq!(fresh.state, OutreachState::Matched);
        assert_eq!(fresh.attempt_count, 0);
        assert_eq!(tracker.pipeline(carrier()).len(), 2);
    }

    #[test]
    fn begin_is_idempotent_while_a_record_is_live() {
        let tracker = OutreachTracker::new();
        begin(&tracker, t0());

        let (record, created) = tracker
            .begin(carrier(), driver(), None, t0(), Duration::hours(720), || {
                panic!("quota must not be spent for an existing live record")
            })
            .unwrap();
        assert!(!created);
        assert_eq!(record.state, OutreachState::Matched);
    }

    #[test]
    fn failed_spend_creates_nothing() {
        let tracker = OutreachTracker::new();
        let err = tracker
            .begin(carrier(), driver(), None, t0(), Duration::hours(720), || {
                Err(EngineError::Internal("spend failed".to_string()))
            })
            .unwrap_err();
        assert!(matches!(err, EngineError::Internal(_)));
        assert!(tracker.pipeline(carrier()).is_empty());
    }

    #[test]
    fn contact_quota_spent_once_per_pair() {
        let tracker = OutreachTracker::new();
        begin(&tracker, t0());

        tracker
            .prepare_contact(carrier(), driver(), no_spend)
            .unwrap();

        // Retry after a failed dispatch: the record is still Matched but the
        // spend closure must not run again.
        let record = tracker
            .prepare_contact(carrier(), driver(), || {
                panic!("contact quota must not be spent twice")
            })
            .unwrap();
        assert!(record.contact_quota_spent);
        assert_eq!(record.state, OutreachState::Matched);
    }

    #[test]
    fn matched_record_expires_after_match_window() {
        let tracker = OutreachTracker::new();
        let cfg = EngineConfig::default();
        begin(&tracker, t0());

        let before = t0() + cfg.match_window() - Duration::hours(1);
        assert!(tracker.evaluate_timeouts(before, &cfg).is_empty());

        let after = t0() + cfg.match_window();
        let outcome = tracker.evaluate_timeouts(after, &cfg);
        assert_eq!(outcome.expired.len(), 1);
        assert_eq!(outcome.expired[0].terminal_reason, Some(TerminalReason::NoContact));
    }

    #[test]
    fn sweep_is_idempotent_for_the_same_instant() {
        let tracker = OutreachTracker::new();
        let cfg = EngineConfig::default();
        begin(&tracker, t0());
        tracker.commit_contact(carrier(), driver(), t0()).unwrap();

        let reminder_due = t0() + cfg.reminder_interval();
        let first = tracker.evaluate_timeouts(reminder_due, &cfg);
        assert_eq!(first.reminded.len(), 1);
        assert_eq!(first.reminded[0].attempt_count, 1);

        let second = tracker.evaluate_timeouts(reminder_due, &cfg);
        assert!(second.is_empty());
    }

    #[test]
    fn reminders_stop_at_max_attempts_and_force_expiry() {
        let tracker = OutreachTracker::new();
        let cfg = EngineConfig {
            max_reminder_attempts: 2,
            // Keep reminders firing before the response window closes.
            response_window_hours: 1_000,
            ..EngineConfig::default()
        };
        begin(&tracker, t0());
        tracker.commit_contact(carrier(), driver(), t0()).unwrap();

        let mut now = t0();
        for expected_attempt in 1..=2u32 {
            now += cfg.reminder_interval();
            let outcome = tracker.evaluate_timeouts(now, &cfg);
            assert_eq!(outcome.reminded.len(), 1);
            assert_eq!(outcome.reminded[0].attempt_count, expected_attempt);
        }

        now += cfg.reminder_interval();
        let outcome = tracker.evaluate_timeouts(now, &cfg);
        assert!(outcome.reminded.is_empty());
        assert_eq!(outcome.expired.len(), 1);
        assert_eq!(
            outcome.expired[0].terminal_reason,
            Some(TerminalReason::MaxRemindersExhausted)
        );
    }

    #[test]
    fn contacted_record_expires_after_response_window() {
        let tracker = OutreachTracker::new();
        let cfg = EngineConfig {
            // No reminders in the way.
            reminder_interval_hours: 10_000,
            ..EngineConfig::default()
        };
        begin(&tracker, t0());
        tracker.commit_contact(carrier(), driver(), t0()).unwrap();

        let after = t0() + cfg.response_window();
        let outcome = tracker.evaluate_timeouts(after, &cfg);
        assert_eq!(outcome.expired.len(), 1);
        assert_eq!(outcome.expired[0].terminal_reason, Some(TerminalReason::NoResponse));
    }

    #[test]
    fn live_counts_track_pipeline_states() {
        let tracker = OutreachTracker::new();
        let other_driver = Uuid::from_u128(201);
        begin(&tracker, t0());
        tracker
            .begin(carrier(), other_driver, None, t0(), Duration::hours(720), no_spend)
            .unwrap();
        tracker.commit_contact(carrier(), other_driver, t0()).unwrap();

        let counts = tracker.live_state_counts();
        assert_eq!(counts[0], (OutreachState::Matched, 1));
        assert_eq!(counts[1], (OutreachState::Contacted, 1));
        assert_eq!(counts[2], (OutreachState::Responded, 0));
        assert_eq!(tracker.live_total(), 2);
    }
}
