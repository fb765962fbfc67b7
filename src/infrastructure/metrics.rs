// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::describe_counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

pub const TASKS_SUBMITTED: &str = "seors_tasks_submitted_total";
pub const TASKS_COMPLETED: &str = "seors_tasks_completed_total";
pub const TASKS_FAILED: &str = "seors_tasks_failed_total";
pub const RATE_LIMITED: &str = "seors_rate_limited_total";
pub const QUEUE_REJECTED: &str = "seors_queue_rejected_total";
pub const QUOTA_SELECTED: &str = "seors_quota_selected_total";
pub const RESULTS_SWEPT: &str = "seors_results_swept_total";

pub fn init_metrics() {
    let builder = PrometheusBuilder::new();
    let addr: SocketAddr = "0.0.0.0:9000".parse().expect("Invalid metrics address");

    // Start the exporter
    // Ignore error if address is already in use (for development/testing)
    if let Err(e) = builder.with_http_listener(addr).install() {
        tracing::warn!("Failed to install Prometheus recorder: {}. This might happen if the port is already in use.", e);
    }

    describe_counter!(TASKS_SUBMITTED, "Analysis tasks accepted for processing");
    describe_counter!(TASKS_COMPLETED, "Analysis tasks finished successfully");
    describe_counter!(TASKS_FAILED, "Analysis tasks that ended in failure");
    describe_counter!(RATE_LIMITED, "Submissions denied by the rate limiter");
    describe_counter!(QUEUE_REJECTED, "Submissions rejected because the wait queue was full");
    describe_counter!(QUOTA_SELECTED, "AI backend selections, labelled by backend");
    describe_counter!(RESULTS_SWEPT, "Expired results reclaimed by the sweep worker");

    info!("Metrics exporter listening on {}", addr);
}
