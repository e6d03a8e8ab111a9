//! Publisher metrics regression tests

use super::helpers::*;
use command_resilience_executor::CommandExecutor;
use command_resilience_metrics::{MetricsFacadeSink, MetricsPublisher};
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
#[serial]
async fn facade_sink_gauges_exist() {
    init_recorder();

    let executor = CommandExecutor::new();
    let _ = executor
        .execute(
            "metrics_pub",
            || async { Err::<u32, _>("down".to_string()) },
            || async { Ok(0) },
        )
        .await;

    MetricsPublisher::new(Arc::clone(executor.registry()), Duration::from_secs(1))
        .with_sink(MetricsFacadeSink)
        .publish_now();

    for name in [
        "command_window_requests",
        "command_window_errors",
        "command_error_percentage",
        "command_bulkhead_queued",
    ] {
        assert_gauge_exists(name);
        assert_metric_has_label(name, "command", "metrics_pub");
    }
}
