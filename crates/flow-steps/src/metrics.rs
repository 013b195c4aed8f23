use lazy_static::lazy_static;
use prometheus::{
    register_int_counter_vec_with_registry, Encoder, IntCounterVec, Registry, TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref STEPS_TOTAL: IntCounterVec = register_int_counter_vec_with_registry!(
        "flowsteps_steps_total",
        "Total number of flow step invocations.",
        &["step"],
        REGISTRY
    )
    .unwrap();
    pub static ref DISPATCH_TOTAL: IntCounterVec = register_int_counter_vec_with_registry!(
        "flowsteps_dispatch_total",
        "Total number of dispatched calls by verb or document action.",
        &["target"],
        REGISTRY
    )
    .unwrap();
    pub static ref STEP_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec_with_registry!(
        "flowsteps_step_failures_total",
        "Total number of flow step invocations that failed.",
        &["step"],
        REGISTRY
    )
    .unwrap();
}

pub fn record_step(step: &str) {
    STEPS_TOTAL.with_label_values(&[step]).inc();
}

pub fn record_dispatch(target: &str) {
    DISPATCH_TOTAL.with_label_values(&[target]).inc();
}

pub fn record_failure(step: &str) {
    STEP_FAILURES_TOTAL.with_label_values(&[step]).inc();
}

// Function to gather metrics for exposition
pub fn gather_metrics() -> crate::Result<String> {
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| crate::Error::Internal(format!("Failed to encode metrics: {}", e)))?;
    String::from_utf8(buffer)
        .map_err(|e| crate::Error::Internal(format!("Metrics are not valid UTF-8: {}", e)))
}
