//! Health aggregation tests.
//!
//! Tests the health status aggregation logic and the serialized report shape.

use dockmeta_core::pipeline::HealthStatus;
use dockmeta_daemon::health::{
    DaemonHealth, ENRICHMENT_MODULE, ModuleHealth, STREAM_MODULE, aggregate_status,
};

fn module(name: &str, enabled: bool, status: HealthStatus) -> ModuleHealth {
    ModuleHealth {
        name: name.to_owned(),
        enabled,
        status,
    }
}

#[test]
fn test_aggregate_status_all_healthy() {
    // Given: All modules are healthy
    let modules = vec![
        ModuleHealth::enabled(ENRICHMENT_MODULE, HealthStatus::Healthy),
        ModuleHealth::enabled(STREAM_MODULE, HealthStatus::Healthy),
    ];

    // When: Aggregating status
    let status = aggregate_status(&modules);

    // Then: Overall status should be Healthy
    assert!(status.is_healthy());
}

#[test]
fn test_aggregate_status_one_degraded() {
    // Given: The processor reports a failed sync
    let modules = vec![
        ModuleHealth::enabled(
            ENRICHMENT_MODULE,
            HealthStatus::Degraded("last sync failed: docker unreachable".to_owned()),
        ),
        ModuleHealth::enabled(STREAM_MODULE, HealthStatus::Healthy),
    ];

    // When: Aggregating status
    let status = aggregate_status(&modules);

    // Then: Overall status is Degraded and names the module
    match status {
        HealthStatus::Degraded(reason) => {
            assert_eq!(
                reason,
                "enrichment-processor: last sync failed: docker unreachable"
            );
        }
        other => panic!("expected Degraded, got: {other:?}"),
    }
}

#[test]
fn test_aggregate_status_unhealthy_takes_precedence_over_degraded() {
    // Given: One degraded and one unhealthy module
    let modules = vec![
        ModuleHealth::enabled(STREAM_MODULE, HealthStatus::Degraded("slow".to_owned())),
        ModuleHealth::enabled(ENRICHMENT_MODULE, HealthStatus::Unhealthy("stopped".to_owned())),
    ];

    // When: Aggregating status
    let status = aggregate_status(&modules);

    // Then: Only the unhealthy reason is reported
    assert_eq!(
        status,
        HealthStatus::Unhealthy("enrichment-processor: stopped".to_owned())
    );
}

#[test]
fn test_aggregate_status_degraded_after_unhealthy_is_ignored() {
    let modules = vec![
        ModuleHealth::enabled(ENRICHMENT_MODULE, HealthStatus::Unhealthy("stopped".to_owned())),
        ModuleHealth::enabled(STREAM_MODULE, HealthStatus::Degraded("slow".to_owned())),
    ];

    assert_eq!(
        aggregate_status(&modules),
        HealthStatus::Unhealthy("enrichment-processor: stopped".to_owned())
    );
}

#[test]
fn test_aggregate_status_multiple_unhealthy_modules() {
    let modules = vec![
        ModuleHealth::enabled(ENRICHMENT_MODULE, HealthStatus::Unhealthy("stopped".to_owned())),
        ModuleHealth::enabled(STREAM_MODULE, HealthStatus::Unhealthy("closed".to_owned())),
    ];

    match aggregate_status(&modules) {
        HealthStatus::Unhealthy(reason) => {
            assert_eq!(reason, "enrichment-processor: stopped; log-stream: closed");
        }
        other => panic!("expected Unhealthy, got: {other:?}"),
    }
}

#[test]
fn test_aggregate_status_disabled_modules_ignored() {
    // Given: An unhealthy module that is disabled
    let modules = vec![
        ModuleHealth::enabled(ENRICHMENT_MODULE, HealthStatus::Healthy),
        module(STREAM_MODULE, false, HealthStatus::Unhealthy("closed".to_owned())),
    ];

    // Then: It does not affect the overall status
    assert!(aggregate_status(&modules).is_healthy());
}

#[test]
fn test_aggregate_status_empty_modules() {
    assert!(aggregate_status(&[]).is_healthy());
}

#[test]
fn test_aggregate_status_combines_multiple_degraded_reasons() {
    let modules = vec![
        ModuleHealth::enabled(ENRICHMENT_MODULE, HealthStatus::Degraded("a".to_owned())),
        ModuleHealth::enabled(STREAM_MODULE, HealthStatus::Degraded("b".to_owned())),
    ];

    assert_eq!(
        aggregate_status(&modules),
        HealthStatus::Degraded("enrichment-processor: a; log-stream: b".to_owned())
    );
}

#[test]
fn test_daemon_health_serializes_to_json() {
    // Given: A health report with a degraded module
    let modules = vec![ModuleHealth::enabled(
        ENRICHMENT_MODULE,
        HealthStatus::Degraded("last sync failed".to_owned()),
    )];
    let health = DaemonHealth {
        status: aggregate_status(&modules),
        uptime_secs: 42,
        cached_containers: 3,
        modules,
    };

    // When: Serializing
    let json = serde_json::to_value(&health).expect("health should serialize");

    // Then: Status carries its reason
    assert_eq!(json["status"]["status"], "degraded");
    assert_eq!(
        json["status"]["reason"],
        "enrichment-processor: last sync failed"
    );
    assert_eq!(json["uptime_secs"], 42);
    assert_eq!(json["cached_containers"], 3);
    assert_eq!(json["modules"][0]["name"], "enrichment-processor");
    assert_eq!(json["modules"][0]["enabled"], true);
}
