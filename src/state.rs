use std::sync::Arc;

use crate::config::EngineConfig;
use crate::engine::MatchEngine;
use crate::models::quota::QuotaLimits;
use crate::observability::metrics::Metrics;
use crate::stores::memory::{
    InMemoryPreferences, InMemoryProfiles, RecordingDispatcher, StaticTierResolver, SystemClock,
};
use crate::stores::{Clock, OutreachDispatcher, TierResolver};

pub struct AppState {
    pub engine: MatchEngine,
    pub profiles: Arc<InMemoryProfiles>,
    pub preferences: Arc<InMemoryPreferences>,
    pub clock: Arc<dyn Clock>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(cfg: EngineConfig) -> Self {
        let tiers = Arc::new(StaticTierResolver::new(QuotaLimits {
            match_limit: cfg.default_match_limit,
            contact_limit: cfg.default_contact_limit,
        }));
        Self::with_collaborators(
            cfg,
            Arc::new(SystemClock),
            tiers,
            Arc::new(RecordingDispatcher::default()),
        )
    }

    /// Wiring seam for tests and alternate deployments: any clock, tier
    /// resolver, or dispatcher implementation slots in here.
    pub fn with_collaborators(
        cfg: EngineConfig,
        clock: Arc<dyn Clock>,
        tiers: Arc<dyn TierResolver>,
        dispatcher: Arc<dyn OutreachDispatcher>,
    ) -> Self {
        let profiles = Arc::new(InMemoryProfiles::default());
        let preferences = Arc::new(InMemoryPreferences::default());
        let metrics = Metrics::new();

        let engine = MatchEngine::new(
            profiles.clone(),
            preferences.clone(),
            tiers,
            dispatcher,
            clock.clone(),
            metrics.clone(),
            cfg,
        );

        Self {
            engine,
            profiles,
            preferences,
            clock,
            metrics,
        }
    }
}
