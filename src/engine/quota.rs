use dashmap::DashMap;
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::quota::{BillingCycle, QuotaKind, QuotaLedger, QuotaLimits};

/// Per-carrier, per-cycle consumption counters. The dashmap entry guard
/// serializes check-and-increment per ledger key, so two callers racing for
/// the last unit see exactly one success; ledgers for different carriers or
/// cycles proceed independently.
pub struct QuotaGate {
    ledgers: DashMap<(Uuid, BillingCycle), QuotaLedger>,
}

impl QuotaGate {
    pub fn new() -> Self {
        Self {
            ledgers: DashMap::new(),
        }
    }

    /// Atomic check-and-increment. Cycle rollover is the lazy create-if-absent
    /// here; no background timer owns it. On failure nothing is mutated.
    pub fn try_consume(
        &self,
        carrier_id: Uuid,
        kind: QuotaKind,
        cycle: &BillingCycle,
        limits: &QuotaLimits,
    ) -> Result<QuotaLedger, EngineError> {
        let mut ledger = self
            .ledgers
            .entry((carrier_id, cycle.clone()))
            .or_insert_with(|| QuotaLedger::open(carrier_id, cycle.clone(), limits));

        match kind {
            QuotaKind::Match => {
                if ledger.matches_consumed >= ledger.match_limit {
                    return Err(EngineError::QuotaExceeded {
                        kind,
                        limit: ledger.match_limit,
                        cycle: cycle.clone(),
                    });
                }
                ledger.matches_consumed += 1;
            }
            QuotaKind::Contact => {
                if ledger.contacts_consumed >= ledger.contact_limit {
                    return Err(EngineError::QuotaExceeded {
                        kind,
                        limit: ledger.contact_limit,
                        cycle: cycle.clone(),
                    });
                }
                ledger.contacts_consumed += 1;
            }
        }

        Ok(ledger.clone())
    }

    pub fn ledger(&self, carrier_id: Uuid, cycle: &BillingCycle) -> Option<QuotaLedger> {
        self.ledgers
            .get(&(carrier_id, cycle.clone()))
            .map(|entry| entry.clone())
    }
}

impl Default for QuotaGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use uuid::Uuid;

    use super::QuotaGate;
    use crate::error::EngineError;
    use crate::models::quota::{BillingCycle, QuotaKind, QuotaLimits};

    fn limits(match_limit: u32, contact_limit: u32) -> QuotaLimits {
        QuotaLimits {
            match_limit,
            contact_limit,
        }
    }

    #[test]
    fn consume_increments_until_limit() {
        let gate = QuotaGate::new();
        let carrier = Uuid::from_u128(1);
        let cycle = BillingCycle("2026-08".to_string());
        let l = limits(2, 1);

        let first = gate.try_consume(carrier, QuotaKind::Match, &cycle, &l).unwrap();
        assert_eq!(first.matches_consumed, 1);

        let second = gate.try_consume(carrier, QuotaKind::Match, &cycle, &l).unwrap();
        assert_eq!(second.matches_consumed, 2);

        let denied = gate.try_consume(carrier, QuotaKind::Match, &cycle, &l);
        assert!(matches!(
            denied,
            Err(EngineError::QuotaExceeded {
                kind: QuotaKind::Match,
                limit: 2,
                ..
            })
        ));

        // Denial mutates nothing.
        let ledger = gate.ledger(carrier, &cycle).unwrap();
        assert_eq!(ledger.matches_consumed, 2);
    }

    #[test]
    fn match_and_contact_counters_are_independent() {
        let gate = QuotaGate::new();
        let carrier = Uuid::from_u128(1);
        let cycle = BillingCycle("2026-08".to_string());
        let l = limits(1, 1);

        gate.try_consume(carrier, QuotaKind::Match, &cycle, &l).unwrap();
        let ledger = gate.try_consume(carrier, QuotaKind::Contact, &cycle, &l).unwrap();

        assert_eq!(ledger.matches_consumed, 1);
        assert_eq!(ledger.contacts_consumed, 1);
    }

    #[test]
    fn cycle_rollover_opens_a_fresh_ledger() {
        let gate = QuotaGate::new();
        let carrier = Uuid::from_u128(1);
        let l = limits(1, 1);

        let august = BillingCycle("2026-08".to_string());
        let september = BillingCycle("2026-09".to_string());

        gate.try_consume(carrier, QuotaKind::Match, &august, &l).unwrap();
        assert!(gate.try_consume(carrier, QuotaKind::Match, &august, &l).is_err());

        let rolled = gate.try_consume(carrier, QuotaKind::Match, &september, &l).unwrap();
        assert_eq!(rolled.matches_consumed, 1);
        assert_eq!(gate.ledger(carrier, &august).unwrap().matches_consumed, 1);
    }

    #[test]
    fn carriers_do_not_share_ledgers() {
        let gate = QuotaGate::new();
        let cycle = BillingCycle("2026-08".to_string());
        let l = limits(1, 1);

        gate.try_consume(Uuid::from_u128(1), QuotaKind::Match, &cycle, &l).unwrap();
        let other = gate.try_consume(Uuid::from_u128(2), QuotaKind::Match, &cycle, &l).unwrap();
        assert_eq!(other.matches_consumed, 1);
    }

    #[test]
    fn exactly_one_of_racing_callers_wins_the_last_unit() {
        let gate = Arc::new(QuotaGate::new());
        let carrier = Uuid::from_u128(1);
        let cycle = BillingCycle("2026-08".to_string());
        let l = limits(1, 1);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = gate.clone();
                let cycle = cycle.clone();
                thread::spawn(move || gate.try_consume(carrier, QuotaKind::Match, &cycle, &l).is_ok())
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(successes, 1);
        assert_eq!(gate.ledger(carrier, &cycle).unwrap().matches_consumed, 1);
    }
}
