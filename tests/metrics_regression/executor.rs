//! Executor metrics regression tests

use super::helpers::*;
use command_resilience_executor::CommandExecutor;
use serial_test::serial;

#[tokio::test]
#[serial]
async fn execution_counter_labels_every_outcome() {
    init_recorder();

    let executor = CommandExecutor::new();
    executor
        .execute("metrics_exec", || async { Ok::<_, String>(1) }, || async { Ok(0) })
        .await
        .unwrap();
    let _ = executor
        .execute(
            "metrics_exec",
            || async { Err::<u32, _>("down".to_string()) },
            || async { Ok(0) },
        )
        .await;

    assert_counter_exists("command_executions_total");
    assert_metric_has_label("command_executions_total", "command", "metrics_exec");
    assert_metric_has_label("command_executions_total", "outcome", "success");
    assert_metric_has_label("command_executions_total", "outcome", "failure");
    assert_metric_has_label("command_executions_total", "outcome", "fallback_success");
}
