//! Configuration loaded from serialized settings.

use command_resilience_executor::{
    CommandConfig, CommandExecutor, CommandSettings, ConfigError, Isolation,
};
use std::time::Duration;

#[test]
fn settings_from_json() {
    let settings: CommandSettings = serde_json::from_str(
        r#"{
            "rollingWindowMs": 20000,
            "numBuckets": 20,
            "errorThresholdPercentage": 25.0,
            "requestVolumeThreshold": 5,
            "sleepWindowMs": 30000,
            "executionTimeoutMs": 250,
            "bulkheadCapacity": 4,
            "bulkheadQueueSize": 8,
            "bulkheadMaxWaitMs": 50,
            "isolation": "inline",
            "circuitBreakerEnabled": true,
            "fallbackEnabled": false
        }"#,
    )
    .unwrap();

    let config = CommandConfig::try_from(settings).unwrap();
    assert_eq!(config.rolling_window(), Duration::from_secs(20));
    assert_eq!(config.num_buckets(), 20);
    assert_eq!(config.error_threshold_percentage(), 25.0);
    assert_eq!(config.request_volume_threshold(), 5);
    assert_eq!(config.sleep_window(), Duration::from_secs(30));
    assert_eq!(config.execution_timeout(), Duration::from_millis(250));
    assert_eq!(config.bulkhead_capacity(), 4);
    assert_eq!(config.bulkhead_queue_size(), 8);
    assert_eq!(config.bulkhead_max_wait(), Duration::from_millis(50));
    assert_eq!(config.isolation(), Isolation::Inline);
    assert!(!config.fallback_enabled());
}

#[test]
fn missing_fields_use_defaults() {
    let settings: CommandSettings = serde_json::from_str("{}").unwrap();
    assert_eq!(settings, CommandSettings::default());

    let config = CommandConfig::try_from(settings).unwrap();
    assert_eq!(config.request_volume_threshold(), 20);
    assert_eq!(config.bulkhead_max_wait(), config.execution_timeout());
}

#[test]
fn invalid_settings_are_rejected() {
    let settings: CommandSettings =
        serde_json::from_str(r#"{ "rollingWindowMs": 10000, "numBuckets": 3 }"#).unwrap();
    assert!(matches!(
        CommandConfig::try_from(settings),
        Err(ConfigError::UnevenBuckets { num_buckets: 3, .. })
    ));

    let settings: CommandSettings =
        serde_json::from_str(r#"{ "errorThresholdPercentage": 150.0 }"#).unwrap();
    assert_eq!(
        CommandConfig::try_from(settings).unwrap_err(),
        ConfigError::ThresholdOutOfRange(150.0)
    );
}

#[tokio::test]
async fn registered_settings_apply_per_key() {
    let executor = CommandExecutor::new();
    let settings: CommandSettings =
        serde_json::from_str(r#"{ "bulkheadCapacity": 2 }"#).unwrap();
    assert!(executor.register("tuned", CommandConfig::try_from(settings).unwrap()));

    assert_eq!(executor.bulkhead("tuned").max_concurrent_calls(), 2);
    assert_eq!(executor.bulkhead("untuned").max_concurrent_calls(), 10);
}
