use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use tracing::info;
use std::sync::Arc;
use tokio::sync::OnceCell;

// Direction labels for relayed frames
pub const DOWNSTREAM_TO_UPSTREAM: &str = "downstream_to_upstream";
pub const UPSTREAM_TO_DOWNSTREAM: &str = "upstream_to_downstream";

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE.get_or_init(|| async {
        info!("Initializing Metrics ...");
        Metrics::new()}
    ).await
}


#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Token broker
    pub tokens_issued: IntCounter,
    pub tokens_consumed: IntCounter,
    pub tokens_rejected: IntCounterVec,
    pub tokens_swept: IntCounter,
    pub token_store_size: IntGauge,

    // Relay
    pub relay_sessions_active: IntGauge,
    pub relay_frames: IntCounterVec,
    pub relay_frames_dropped: IntCounter,
    pub upstream_failures: IntCounterVec,

    // Recording pass-through
    pub recording_requests: IntCounterVec,
    pub recording_duration: HistogramVec,

    // Config/runtime
    pub config_validation_errors: IntCounter,
    pub up: IntGauge,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("interviewrelay".into()), None)
            .expect("static registry prefix is valid");

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Broker
            tokens_issued: IntCounter::new("tokens_issued_total", "Relay tokens issued").expect("metric"),
            tokens_consumed: IntCounter::new("tokens_consumed_total", "Relay tokens consumed by a relay connection").expect("metric"),
            tokens_rejected: IntCounterVec::new(Opts::new("tokens_rejected_total", "Rejected token presentations and issuance requests"), &["reason"]).expect("metric"),
            tokens_swept: IntCounter::new("tokens_swept_total", "Expired tokens purged by the sweep").expect("metric"),
            token_store_size: IntGauge::new("token_store_size", "Tokens currently held in memory").expect("metric"),

            // Relay
            relay_sessions_active: IntGauge::new("relay_sessions_active", "Relay sessions currently bridging").expect("metric"),
            relay_frames: IntCounterVec::new(Opts::new("relay_frames_total", "Frames forwarded by direction"), &["direction"]).expect("metric"),
            relay_frames_dropped: IntCounter::new("relay_frames_dropped_total", "Upstream frames dropped because they were not JSON").expect("metric"),
            upstream_failures: IntCounterVec::new(Opts::new("upstream_failures_total", "Upstream provider failures"), &["component"]).expect("metric"),

            // Recording
            recording_requests: IntCounterVec::new(Opts::new("recording_requests_total", "Recording provider pass-through requests"), &["route", "outcome"]).expect("metric"),
            recording_duration: HistogramVec::new(HistogramOpts::new("recording_request_duration_seconds", "Recording provider call duration seconds").buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 25.0]), &["route"]).expect("metric"),

            // Config/runtime
            config_validation_errors: IntCounter::new("config_validation_errors_total", "Validation errors during startup").expect("metric"),
            up: IntGauge::new("up", "1 if service is healthy").expect("metric"),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(metrics.tokens_issued.clone()),
            Box::new(metrics.tokens_consumed.clone()),
            Box::new(metrics.tokens_rejected.clone()),
            Box::new(metrics.tokens_swept.clone()),
            Box::new(metrics.token_store_size.clone()),
            Box::new(metrics.relay_sessions_active.clone()),
            Box::new(metrics.relay_frames.clone()),
            Box::new(metrics.relay_frames_dropped.clone()),
            Box::new(metrics.upstream_failures.clone()),
            Box::new(metrics.recording_requests.clone()),
            Box::new(metrics.recording_duration.clone()),
            Box::new(metrics.config_validation_errors.clone()),
            Box::new(metrics.up.clone()),
        ];
        for collector in collectors {
            reg.register(collector).expect("metric names are unique");
        }

        metrics
    }
}
