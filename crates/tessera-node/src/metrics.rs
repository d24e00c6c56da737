//! Prometheus metrics

use prometheus::{Encoder, Gauge, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

/// Pool metrics on a private registry
#[derive(Clone)]
pub struct PoolMetrics {
    registry: Registry,
    commands: IntCounterVec,
    events: IntCounterVec,
    total_staked: Gauge,
    active_proposals: IntGauge,
}

impl PoolMetrics {
    /// Create and register every metric under `namespace`
    pub fn new(namespace: &str) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let commands = IntCounterVec::new(
            Opts::new("commands_total", "Commands processed, by outcome").namespace(namespace),
            &["command", "outcome"],
        )?;
        let events = IntCounterVec::new(
            Opts::new("events_total", "Events published").namespace(namespace),
            &["event"],
        )?;
        let total_staked = Gauge::with_opts(
            Opts::new("total_staked", "Sum of active stake").namespace(namespace),
        )?;
        let active_proposals = IntGauge::with_opts(
            Opts::new("active_proposals", "Proposals still in voting or awaiting finalize")
                .namespace(namespace),
        )?;

        registry.register(Box::new(commands.clone()))?;
        registry.register(Box::new(events.clone()))?;
        registry.register(Box::new(total_staked.clone()))?;
        registry.register(Box::new(active_proposals.clone()))?;

        Ok(Self {
            registry,
            commands,
            events,
            total_staked,
            active_proposals,
        })
    }

    /// Count one command; `outcome` is "ok" or an error code
    pub fn record_command(&self, command: &str, outcome: &str) {
        self.commands.with_label_values(&[command, outcome]).inc();
    }

    pub fn record_event(&self, event: &str) {
        self.events.with_label_values(&[event]).inc();
    }

    /// Refresh the state gauges
    pub fn observe(&self, total_staked: u128, active_proposals: usize) {
        // exact only up to 2^53
        self.total_staked.set(total_staked as f64);
        self.active_proposals.set(active_proposals as i64);
    }

    pub fn command_count(&self, command: &str, outcome: &str) -> u64 {
        self.commands.with_label_values(&[command, outcome]).get()
    }

    /// Text exposition format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
