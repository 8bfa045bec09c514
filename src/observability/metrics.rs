use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub assignment_passes_total: IntCounterVec,
    pub deliveries_assigned_total: IntCounter,
    pub assignment_pass_duration_seconds: Histogram,
    pub driver_directory_errors_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let assignment_passes_total = IntCounterVec::new(
            Opts::new(
                "assignment_passes_total",
                "Assignment passes by outcome (assigned, idle, no_drivers)",
            ),
            &["outcome"],
        )
        .expect("valid assignment_passes_total metric");

        let deliveries_assigned_total = IntCounter::new(
            "deliveries_assigned_total",
            "Deliveries created by the assignment engine",
        )
        .expect("valid deliveries_assigned_total metric");

        let assignment_pass_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "assignment_pass_duration_seconds",
            "Duration of one assignment pass in seconds",
        ))
        .expect("valid assignment_pass_duration_seconds metric");

        let driver_directory_errors_total = IntCounter::new(
            "driver_directory_errors_total",
            "Failed calls to the driver directory",
        )
        .expect("valid driver_directory_errors_total metric");

        registry
            .register(Box::new(assignment_passes_total.clone()))
            .expect("register assignment_passes_total");
        registry
            .register(Box::new(deliveries_assigned_total.clone()))
            .expect("register deliveries_assigned_total");
        registry
            .register(Box::new(assignment_pass_duration_seconds.clone()))
            .expect("register assignment_pass_duration_seconds");
        registry
            .register(Box::new(driver_directory_errors_total.clone()))
            .expect("register driver_directory_errors_total");

        Self {
            registry,
            assignment_passes_total,
            deliveries_assigned_total,
            assignment_pass_duration_seconds,
            driver_directory_errors_total,
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

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
