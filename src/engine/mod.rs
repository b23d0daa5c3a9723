pub mod matcher;
pub mod outreach;
pub mod quota;
pub mod scoring;
pub mod sweeper;

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::warn;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::models::outreach::{OutreachRecord, OutreachState, ResponseOutcome, TerminalReason};
use crate::models::quota::{BillingCycle, QuotaKind, QuotaLedger};
use crate::models::score::RankedCandidate;
use crate::observability::metrics::Metrics;
use crate::stores::{Clock, OutreachDispatcher, PreferenceStore, ProfileStore, TierResolver};

pub use outreach::SweepOutcome;

const REMINDER_MESSAGE: &str = "Following up on our earlier message about the open position.";

/// Facade over the matching pipeline: filter, score, quota-gate, and track
/// outreach. Collaborators (stores, tier resolver, dispatcher, clock) are
/// injected; the engine owns only the ledgers, pair records, and the
/// per-version ranking cache.
pub struct MatchEngine {
    profiles: Arc<dyn ProfileStore>,
    preferences: Arc<dyn PreferenceStore>,
    tiers: Arc<dyn TierResolver>,
    dispatcher: Arc<dyn OutreachDispatcher>,
    clock: Arc<dyn Clock>,
    quota: quota::QuotaGate,
    outreach: outreach::OutreachTracker,
    rankings: DashMap<Uuid, (u64, Vec<RankedCandidate>)>,
    metrics: Metrics,
    cfg: EngineConfig,
}

impl MatchEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        preferences: Arc<dyn PreferenceStore>,
        tiers: Arc<dyn TierResolver>,
        dispatcher: Arc<dyn OutreachDispatcher>,
        clock: Arc<dyn Clock>,
        metrics: Metrics,
        cfg: EngineConfig,
    ) -> Self {
        Self {
            profiles,
            preferences,
            tiers,
            dispatcher,
            clock,
            quota: quota::QuotaGate::new(),
            outreach: outreach::OutreachTracker::new(),
            rankings: DashMap::new(),
            metrics,
            cfg,
        }
    }

    /// Ranked candidates for a carrier. Cached per preference version; a
    /// version bump invalidates the cache lazily on the next call.
    pub fn rank_candidates(&self, carrier_id: Uuid) -> Result<Vec<RankedCandidate>, EngineError> {
        let start = Instant::now();

        let Some(pref) = self.preferences.preference(carrier_id) else {
            self.observe_rank(start, "error");
            return Err(no_preference(carrier_id));
        };

        if let Some(cached) = self.rankings.get(&carrier_id) {
            let (version, ranked) = cached.value();
            if *version == pref.version {
                let ranked = ranked.clone();
                self.observe_rank(start, "success");
                return Ok(ranked);
            }
        }

        let now = self.clock.now();
        let scored: Vec<_> = matcher::filter(self.profiles.driver_pool().into_iter(), &pref)
            .map(|driver| {
                let score = scoring::compute_score(&driver, &pref, &self.cfg, now);
                (driver, score)
            })
            .collect();

        let ranked: Vec<RankedCandidate> = scoring::rank_matches(scored)
            .into_iter()
            .map(|(driver, score)| RankedCandidate::new(&driver, score))
            .collect();

        self.rankings.insert(carrier_id, (pref.version, ranked.clone()));
        self.observe_rank(start, "success");
        Ok(ranked)
    }

    /// Consumes one match unit and opens the pair's outreach record. The
    /// quota is spent only when a record is actually created, so repeating
    /// the call while a live record exists is free and returns it unchanged.
    pub fn consume_match(
        &self,
        carrier_id: Uuid,
        driver_id: Uuid,
        expected_version: Option<u64>,
        note: Option<String>,
    ) -> Result<OutreachRecord, EngineError> {
        let pref = self
            .preferences
            .preference(carrier_id)
            .ok_or_else(|| no_preference(carrier_id))?;

        if let Some(requested) = expected_version {
            if requested != pref.version {
                return Err(EngineError::StaleVersion {
                    requested,
                    current: pref.version,
                });
            }
        }

        self.profiles
            .driver(driver_id)
            .ok_or_else(|| EngineError::NotFound(format!("driver {driver_id} not found")))?;

        let now = self.clock.now();
        let cycle = BillingCycle::containing(now);
        let limits = self.tiers.limits_for(carrier_id, &cycle);

        let result = self.outreach.begin(
            carrier_id,
            driver_id,
            note,
            now,
            self.cfg.cooldown(),
            || {
                self.quota
                    .try_consume(carrier_id, QuotaKind::Match, &cycle, &limits)
                    .map(|_| ())
            },
        );

        match result {
            Ok((record, true)) => {
                self.metrics
                    .outreach_transitions_total
                    .with_label_values(&[OutreachState::Matched.as_str()])
                    .inc();
                tracing::info!(
                    carrier_id = %carrier_id,
                    driver_id = %driver_id,
                    "match consumed"
                );
                Ok(record)
            }
            Ok((record, false)) => Ok(record),
            Err(err) => {
                if let EngineError::QuotaExceeded { kind, .. } = &err {
                    self.metrics
                        .quota_denials_total
                        .with_label_values(&[kind.as_str()])
                        .inc();
                }
                Err(err)
            }
        }
    }

    /// Spends contact quota (once per pair), dispatches the message, then
    /// commits Matched -> Contacted. A dispatch failure leaves the record in
    /// Matched; retrying does not re-spend. The pair lock is not held across
    /// the dispatcher call.
    pub fn contact_driver(
        &self,
        carrier_id: Uuid,
        driver_id: Uuid,
        message: &str,
    ) -> Result<OutreachRecord, EngineError> {
        let now = self.clock.now();
        let cycle = BillingCycle::containing(now);
        let limits = self.tiers.limits_for(carrier_id, &cycle);

        let prepared = self.outreach.prepare_contact(carrier_id, driver_id, || {
            self.quota
                .try_consume(carrier_id, QuotaKind::Contact, &cycle, &limits)
                .map(|_| ())
        });

        if let Err(err) = &prepared {
            if let EngineError::QuotaExceeded { kind, .. } = err {
                self.metrics
                    .quota_denials_total
                    .with_label_values(&[kind.as_str()])
                    .inc();
            }
        }
        prepared?;

        self.dispatcher.send(carrier_id, driver_id, message)?;

        let record = self.outreach.commit_contact(carrier_id, driver_id, now)?;
        self.metrics
            .outreach_transitions_total
            .with_label_values(&[OutreachState::Contacted.as_str()])
            .inc();
        tracing::info!(
            carrier_id = %carrier_id,
            driver_id = %driver_id,
            "driver contacted"
        );
        Ok(record)
    }

    pub fn record_response(
        &self,
        carrier_id: Uuid,
        driver_id: Uuid,
        outcome: ResponseOutcome,
    ) -> Result<OutreachRecord, EngineError> {
        let now = self.clock.now();

        let (state, reason) = match outcome {
            ResponseOutcome::Responded => (OutreachState::Responded, None),
            ResponseOutcome::Hired => (OutreachState::Hired, Some(TerminalReason::Hired)),
            ResponseOutcome::Rejected => (OutreachState::Rejected, Some(TerminalReason::Rejected)),
        };

        let record = self
            .outreach
            .transition(carrier_id, driver_id, state, reason, now)?;
        self.metrics
            .outreach_transitions_total
            .with_label_values(&[state.as_str()])
            .inc();
        Ok(record)
    }

    /// Periodic sweep entry point; reminder messages are dispatched after
    /// the tracker has released its locks, and a failed reminder dispatch is
    /// logged but never rolls back the recorded attempt.
    pub fn evaluate_timeouts(&self, now: DateTime<Utc>) -> SweepOutcome {
        let outcome = self.outreach.evaluate_timeouts(now, &self.cfg);

        self.metrics
            .outreach_transitions_total
            .with_label_values(&[OutreachState::Expired.as_str()])
            .inc_by(outcome.expired.len() as u64);
        self.metrics
            .outreach_transitions_total
            .with_label_values(&["reminded"])
            .inc_by(outcome.reminded.len() as u64);

        for record in &outcome.reminded {
            if let Err(err) = self
                .dispatcher
                .send(record.carrier_id, record.driver_id, REMINDER_MESSAGE)
            {
                warn!(
                    carrier_id = %record.carrier_id,
                    driver_id = %record.driver_id,
                    error = %err,
                    "reminder dispatch failed"
                );
            }
        }

        outcome
    }

    pub fn pipeline(&self, carrier_id: Uuid) -> Vec<OutreachRecord> {
        self.outreach.pipeline(carrier_id)
    }

    /// Current-cycle ledger view. A carrier that has consumed nothing this
    /// cycle gets a zeroed ledger at its tier limits, without creating one.
    pub fn quota_ledger(&self, carrier_id: Uuid) -> QuotaLedger {
        let now = self.clock.now();
        let cycle = BillingCycle::containing(now);
        let limits = self.tiers.limits_for(carrier_id, &cycle);
        self.quota
            .ledger(carrier_id, &cycle)
            .unwrap_or_else(|| QuotaLedger::open(carrier_id, cycle, &limits))
    }

    pub fn live_outreach_total(&self) -> usize {
        self.outreach.live_total()
    }

    pub fn refresh_pipeline_gauges(&self) {
        let mut live_total = 0i64;
        for (state, count) in self.outreach.live_state_counts() {
            self.metrics
                .pipeline_state_records
                .with_label_values(&[state.as_str()])
                .set(count);
            live_total += count;
        }
        self.metrics.live_outreach_records.set(live_total);
    }

    fn observe_rank(&self, start: Instant, outcome: &str) {
        self.metrics
            .rank_latency_seconds
            .with_label_values(&[outcome])
            .observe(start.elapsed().as_secs_f64());
    }
}

fn no_preference(carrier_id: Uuid) -> EngineError {
    EngineError::NotFound(format!("no preference for carrier {carrier_id}"))
}
