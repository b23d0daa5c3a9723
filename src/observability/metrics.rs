use prometheus::{
    Encoder, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub outreach_transitions_total: IntCounterVec,
    pub quota_denials_total: IntCounterVec,
    pub rank_latency_seconds: HistogramVec,
    pub live_outreach_records: IntGauge,
    pub pipeline_state_records: IntGaugeVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let outreach_transitions_total = IntCounterVec::new(
            Opts::new(
                "outreach_transitions_total",
                "Outreach state transitions by resulting state",
            ),
            &["state"],
        )
        .expect("valid outreach_transitions_total metric");

        let quota_denials_total = IntCounterVec::new(
            Opts::new("quota_denials_total", "Quota consumption denials by kind"),
            &["kind"],
        )
        .expect("valid quota_denials_total metric");

        let rank_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "rank_latency_seconds",
                "Latency of candidate ranking in seconds",
            ),
            &["outcome"],
        )
        .expect("valid rank_latency_seconds metric");

        let live_outreach_records =
            IntGauge::new("live_outreach_records", "Current number of live outreach records")
                .expect("valid live_outreach_records metric");

        let pipeline_state_records = IntGaugeVec::new(
            Opts::new(
                "pipeline_state_records",
                "Live outreach records by pipeline state",
            ),
            &["state"],
        )
        .expect("valid pipeline_state_records metric");

        registry
            .register(Box::new(outreach_transitions_total.clone()))
            .expect("register outreach_transitions_total");
        registry
            .register(Box::new(quota_denials_total.clone()))
            .expect("register quota_denials_total");
        registry
            .register(Box::new(rank_latency_seconds.clone()))
            .expect("register rank_latency_seconds");
        registry
            .register(Box::new(live_outreach_records.clone()))
            .expect("register live_outreach_records");
        registry
            .register(Box::new(pipeline_state_records.clone()))
            .expect("register pipeline_state_records");

        Self {
            registry,
            outreach_transitions_total,
            quota_denials_total,
            rank_latency_seconds,
            live_outreach_records,
            pipeline_state_records,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
