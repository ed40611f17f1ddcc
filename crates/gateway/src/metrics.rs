use crate::{errors::DetectError, pipeline::ComponentCount};
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use std::time::Duration;

#[derive(Clone)]
pub struct DetectMetrics {
    requests: Counter<u64>,
    failures: Counter<u64>,
    duration: Histogram<f64>,
    components: Counter<u64>,
}

impl DetectMetrics {
    pub fn new(meter_name: &'static str) -> Self {
        let meter = global::meter(meter_name);
        let latency_buckets = [
            0.01, 0.025, 0.05, 0.075, 0.1, 0.15, 0.2, 0.3, 0.5, 0.75, 1.0, 2.0, 5.0,
        ];

        Self {
            requests: meter
                .u64_counter("detect_requests_total")
                .with_description("Total /detect requests handled")
                .build(),
            failures: meter
                .u64_counter("detect_failures_total")
                .with_description("Total /detect requests answered with success=false")
                .build(),
            duration: meter
                .f64_histogram("detect_duration_seconds")
                .with_description("Time to answer a /detect request (upload + decode + infer + aggregate)")
                .with_unit("s")
                .with_boundaries(latency_buckets.to_vec())
                .build(),
            components: meter
                .u64_counter("detect_components_total")
                .with_description("Total components counted across all responses")
                .build(),
        }
    }

    pub fn record(&self, result: &Result<Vec<ComponentCount>, DetectError>, elapsed: Duration) {
        self.requests.add(1, &[]);
        self.duration.record(elapsed.as_secs_f64(), &[]);

        match result {
            Ok(detections) => {
                let total: u64 = detections.iter().map(|d| d.quantity as u64).sum();
                self.components.add(total, &[]);
            }
            Err(e) => {
                self.failures.add(1, &[KeyValue::new("reason", e.kind())]);
            }
        }
    }
}
