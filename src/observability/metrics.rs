use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub actions_total: IntCounterVec,
    pub open_orders: IntGauge,
    pub reminders_scheduled_total: IntCounter,
    pub reminders_fired_total: IntCounter,
    pub trials_granted_total: IntCounter,
    pub trial_evictions_total: IntCounter,
    pub receipts_total: IntCounter,
    pub approvals_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let actions_total = IntCounterVec::new(
            Opts::new("actions_total", "Dispatch actions by kind and outcome"),
            &["action", "outcome"],
        )
        .expect("valid actions_total metric");

        let open_orders = IntGauge::new("open_orders", "Orders currently open on the board")
            .expect("valid open_orders metric");

        let reminders_scheduled_total =
            IntCounter::new("reminders_scheduled_total", "Milestone reminders scheduled")
                .expect("valid reminders_scheduled_total metric");

        let reminders_fired_total =
            IntCounter::new("reminders_fired_total", "Milestone reminders delivered")
                .expect("valid reminders_fired_total metric");

        let trials_granted_total = IntCounter::new("trials_granted_total", "Trial windows granted")
            .expect("valid trials_granted_total metric");

        let trial_evictions_total =
            IntCounter::new("trial_evictions_total", "Expired trials evicted by the sweep")
                .expect("valid trial_evictions_total metric");

        let receipts_total =
            IntCounter::new("receipts_total", "Payment receipts forwarded for review")
                .expect("valid receipts_total metric");

        let approvals_total = IntCounter::new("approvals_total", "Payments approved by admins")
            .expect("valid approvals_total metric");

        registry
            .register(Box::new(actions_total.clone()))
            .expect("register actions_total");
        registry
            .register(Box::new(open_orders.clone()))
            .expect("register open_orders");
        registry
            .register(Box::new(reminders_scheduled_total.clone()))
            .expect("register reminders_scheduled_total");
        registry
            .register(Box::new(reminders_fired_total.clone()))
            .expect("register reminders_fired_total");
        registry
            .register(Box::new(trials_granted_total.clone()))
            .expect("register trials_granted_total");
        registry
            .register(Box::new(trial_evictions_total.clone()))
            .expect("register trial_evictions_total");
        registry
            .register(Box::new(receipts_total.clone()))
            .expect("register receipts_total");
        registry
            .register(Box::new(approvals_total.clone()))
            .expect("register approvals_total");

        Self {
            registry,
            actions_total,
            open_orders,
            reminders_scheduled_total,
            reminders_fired_total,
            trials_granted_total,
            trial_evictions_total,
            receipts_total,
            approvals_total,
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
