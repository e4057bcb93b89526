use std::time::Duration;

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Gauge, HistogramVec,
};

/// Registered into the process-global default registry, grounded on
/// `raiko-metrics`'s `lazy_static!`-vec pattern. `texcompile-host`'s
/// `GET /metrics` exposes these via `prometheus::gather()` without needing
/// to know about this crate's metric names.
lazy_static! {
    pub static ref COMPILE_ATTEMPTS: CounterVec = register_counter_vec!(
        "texcompile_compile_attempts",
        "the number of terminal compile attempts",
        &["output_format", "reason"]
    )
    .unwrap();

    pub static ref COMPILE_IN_FLIGHT: Gauge = register_gauge!(
        "texcompile_compile_in_flight",
        "the number of tasks currently being executed by this worker"
    )
    .unwrap();

    pub static ref COMPILE_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "texcompile_compile_duration_seconds",
        "the duration of one worker execution, enqueue to terminal status",
        &["output_format"]
    )
    .unwrap();
}

pub fn inc_in_flight() {
    COMPILE_IN_FLIGHT.inc();
}

pub fn dec_in_flight() {
    COMPILE_IN_FLIGHT.dec();
}

pub fn observe_attempt(output_format: &str, reason: &str) {
    COMPILE_ATTEMPTS.with_label_values(&[output_format, reason]).inc();
}

pub fn observe_duration(output_format: &str, duration: Duration) {
    COMPILE_DURATION_SECONDS
        .with_label_values(&[output_format])
        .observe(duration.as_secs_f64());
}
