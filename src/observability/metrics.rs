use prometheus::{
    Encoder, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub assignments_total: IntCounterVec,
    pub assignment_latency_seconds: HistogramVec,
    pub stop_transitions_total: IntCounterVec,
    pub buggy_onboard_guests: IntGaugeVec,
    pub pending_stops: IntGauge,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let assignments_total = IntCounterVec::new(
            Opts::new("assignments_total", "Total ride assignments by outcome"),
            &["outcome"],
        )
        .expect("valid assignments_total metric");

        let assignment_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "assignment_latency_seconds",
                "Latency of ride assignment in seconds",
            ),
            &["outcome"],
        )
        .expect("valid assignment_latency_seconds metric");

        let stop_transitions_total = IntCounterVec::new(
            Opts::new("stop_transitions_total", "Stop lifecycle transitions"),
            &["action", "stop_type"],
        )
        .expect("valid stop_transitions_total metric");

        let buggy_onboard_guests = IntGaugeVec::new(
            Opts::new("buggy_onboard_guests", "Guests currently aboard each buggy"),
            &["buggy_id"],
        )
        .expect("valid buggy_onboard_guests metric");

        let pending_stops = IntGauge::new("pending_stops", "Stops not yet completed across the fleet")
            .expect("valid pending_stops metric");

        registry
            .register(Box::new(assignments_total.clone()))
            .expect("register assignments_total");
        registry
            .register(Box::new(assignment_latency_seconds.clone()))
            .expect("register assignment_latency_seconds");
        registry
            .register(Box::new(stop_transitions_total.clone()))
            .expect("register stop_transitions_total");
        registry
            .register(Box::new(buggy_onboard_guests.clone()))
            .expect("register buggy_onboard_guests");
        registry
            .register(Box::new(pending_stops.clone()))
            .expect("register pending_stops");

        Self {
            registry,
            assignments_total,
            assignment_latency_seconds,
            stop_transitions_total,
            buggy_onboard_guests,
            pending_stops,
        }
    }

    pub fn observe_assignment(&self, outcome: &str, elapsed_seconds: f64) {
        self.assignment_latency_seconds
            .with_label_values(&[outcome])
            .observe(elapsed_seconds);
        self.assignments_total.with_label_values(&[outcome]).inc();
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
