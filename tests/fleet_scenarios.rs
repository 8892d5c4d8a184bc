//! End-to-end fleet scenarios
//!
//! Exercises the engine through its public producer and reader API only.

mod common;

use chrono::Utc;
use common::{at_offset, empty_engine, engine_with_agents, event_between, ActivityGenerator};
use fleetwatch_core::types::event_types;
use fleetwatch_core::{
    AgentStatus, EventFilter, FleetConfig, FleetEngine, FleetError, MetricsUpdate,
    NewCoordinationEvent,
};

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}

#[test]
fn test_first_sample_sets_average_and_health() {
    let engine = engine_with_agents(&["a1"]);

    let health = engine
        .update_metrics(
            "a1",
            MetricsUpdate::new()
                .requests(1)
                .response_time_ms(100.0)
                .success(true)
                .load(0.2),
        )
        .unwrap();

    let agent = engine.get_agent("a1").unwrap().unwrap();
    assert_close(agent.metrics.average_response_time_ms, 100.0);
    assert_close(agent.metrics.success_rate, 1.0);
    // 0.4 * 1.0 + 0.3 * 0.9 + 0.2 * 0.8 + 0.1 * 1.0
    assert_close(health, 0.93);
    assert_close(agent.health_score, 0.93);
}

#[test]
fn test_second_sample_rolls_average_and_counts_failure() {
    let engine = engine_with_agents(&["a1"]);
    engine
        .update_metrics(
            "a1",
            MetricsUpdate::new()
                .requests(1)
                .response_time_ms(100.0)
                .success(true)
                .load(0.2),
        )
        .unwrap();
    engine
        .update_metrics(
            "a1",
            MetricsUpdate::new()
                .requests(1)
                .response_time_ms(300.0)
                .success(false),
        )
        .unwrap();

    let metrics = engine.get_agent("a1").unwrap().unwrap().metrics;
    assert_eq!(metrics.requests_processed, 2);
    assert_close(metrics.average_response_time_ms, 200.0);
    assert_eq!(metrics.error_count, 1);
    assert_close(metrics.success_rate, 0.5);
}

#[test]
fn test_transaction_workflow_graph() {
    let engine = empty_engine();
    let base = Utc::now();
    let log = engine.event_log();

    log.append(event_between(event_types::REQUEST, "a1", "a2", "t1", at_offset(base, 0)))
        .unwrap();
    log.append(event_between(event_types::RESPONSE, "a2", "a1", "t1", at_offset(base, 1)))
        .unwrap();
    log.append(event_between(event_types::ESCALATION, "a1", "a3", "t1", at_offset(base, 2)))
        .unwrap();
    log.append(event_between(event_types::REQUEST, "a4", "a5", "t2", at_offset(base, 3)))
        .unwrap();

    let graph = engine.workflow("t1").unwrap();
    let mut nodes = graph.nodes.clone();
    nodes.sort();
    assert_eq!(nodes, vec!["a1", "a2", "a3"]);
    assert_eq!(graph.edges.len(), 3);
    assert_eq!(graph.total_events, 3);
    let types: Vec<_> = graph.timeline.iter().map(|e| e.event_type.as_str()).collect();
    assert_eq!(
        types,
        vec![event_types::REQUEST, event_types::RESPONSE, event_types::ESCALATION]
    );
    assert_eq!(graph.edges[2].from, "a1");
    assert_eq!(graph.edges[2].to, "a3");
}

#[test]
fn test_uneven_workload_scores_below_even_workload() {
    let skewed = engine_with_agents(&["a1", "a2"]);
    skewed
        .update_metrics("a1", MetricsUpdate::new().requests(90))
        .unwrap();
    skewed
        .update_metrics("a2", MetricsUpdate::new().requests(10))
        .unwrap();

    let even = engine_with_agents(&["a1", "a2"]);
    even.update_metrics("a1", MetricsUpdate::new().requests(50))
        .unwrap();
    even.update_metrics("a2", MetricsUpdate::new().requests(50))
        .unwrap();

    let skewed_score = skewed
        .workload_distribution()
        .unwrap()
        .balance_metrics
        .balance_score;
    let even_score = even
        .workload_distribution()
        .unwrap()
        .balance_metrics
        .balance_score;

    assert!(skewed_score < even_score);
    assert_close(even_score, 1.0);
}

#[test]
fn test_empty_fleet_views_default_without_error() {
    let engine = empty_engine();

    let summary = engine.dashboard_summary().unwrap();
    assert_eq!(summary.agents.total, 0);
    assert_eq!(summary.performance.total_requests_processed, 0);
    assert_eq!(summary.performance.total_errors, 0);
    assert_close(summary.performance.overall_success_rate, 1.0);

    let workload = engine.workload_distribution().unwrap();
    assert!(workload.distribution.is_empty());
    assert_close(workload.balance_metrics.balance_score, 1.0);

    let efficiency = engine.coordination_efficiency().unwrap();
    assert_eq!(efficiency.total_events, 0);
    assert_close(efficiency.efficiency_score, 1.0);
    assert_close(efficiency.overall_success_rate, 1.0);
}

#[test]
fn test_log_keeps_last_thousand_oldest_first() {
    let engine = empty_engine();
    let base = Utc::now();
    for i in 0..1500 {
        engine
            .event_log()
            .append(event_between(
                event_types::COORDINATION,
                &format!("src{}", i),
                "sink",
                "bulk",
                at_offset(base, i),
            ))
            .unwrap();
    }

    let events = engine.event_log().snapshot().unwrap();
    assert_eq!(events.len(), 1000);
    assert_eq!(events.first().unwrap().source_agent, "src500");
    assert_eq!(events.last().unwrap().source_agent, "src1499");
    assert!(events
        .windows(2)
        .all(|pair| pair[0].timestamp < pair[1].timestamp));
}

#[test]
fn test_history_evicts_oldest_first() {
    let engine = engine_with_agents(&["a1"]);
    for i in 1..=120u64 {
        engine
            .update_metrics("a1", MetricsUpdate::new().requests(1).load(i as f64 / 1000.0))
            .unwrap();
    }

    let history = engine.metrics_history("a1", 500).unwrap();
    assert_eq!(history.len(), 100);
    assert_close(history.first().unwrap().load, 0.021);
    assert_close(history.last().unwrap().load, 0.12);
}

#[test]
fn test_repeated_reads_are_identical() {
    let engine = FleetEngine::from_config(&FleetConfig::default()).unwrap();
    let ids = [
        "txn_analyzer_001",
        "pattern_detector_001",
        "risk_assessor_001",
    ];
    ActivityGenerator::new(7).drive(&engine, &ids, 25);
    engine
        .log_event(
            NewCoordinationEvent::new(event_types::REQUEST, "orchestrator_001")
                .target("txn_analyzer_001")
                .transaction("t-9")
                .duration_ms(40.0),
        )
        .unwrap();

    let now = Utc::now();
    let analytics = engine.analytics();
    assert_eq!(
        analytics.dashboard_summary_at(now).unwrap(),
        analytics.dashboard_summary_at(now).unwrap()
    );
    assert_eq!(
        analytics.workload_distribution_at(now).unwrap(),
        analytics.workload_distribution_at(now).unwrap()
    );
    assert_eq!(
        analytics.coordination_efficiency_at(now).unwrap(),
        analytics.coordination_efficiency_at(now).unwrap()
    );
    assert_eq!(
        analytics.performance_trend("txn_analyzer_001").unwrap(),
        analytics.performance_trend("txn_analyzer_001").unwrap()
    );
    assert_eq!(engine.workflow("t-9").unwrap(), engine.workflow("t-9").unwrap());
}

#[test]
fn test_failed_update_leaves_other_agents_untouched() {
    let engine = engine_with_agents(&["a1", "a2"]);
    engine
        .update_metrics("a2", MetricsUpdate::new().requests(3).load(0.4))
        .unwrap();
    let before = engine.list_agents().unwrap();

    assert!(matches!(
        engine.update_metrics("a1", MetricsUpdate::new().load(-0.1)),
        Err(FleetError::InvalidInput(_))
    ));
    assert!(matches!(
        engine.update_metrics("ghost", MetricsUpdate::new().requests(1)),
        Err(FleetError::NotFound(_))
    ));
    assert!(matches!(
        engine.update_status("ghost", AgentStatus::Busy),
        Err(FleetError::NotFound(_))
    ));

    assert_eq!(engine.list_agents().unwrap(), before);
    assert!(engine.event_log().is_empty().unwrap());
}

#[test]
fn test_event_queries_by_agent_and_transaction() {
    let engine = empty_engine();
    let base = Utc::now();
    let log = engine.event_log();
    log.append(event_between(event_types::REQUEST, "a1", "a2", "t1", at_offset(base, 0)))
        .unwrap();
    log.append(event_between(event_types::REQUEST, "a3", "a1", "t2", at_offset(base, 1)))
        .unwrap();
    log.append(event_between(event_types::REQUEST, "a3", "a4", "t2", at_offset(base, 2)))
        .unwrap();

    let a1 = engine
        .coordination_events(&EventFilter::new().agent("a1"), 100)
        .unwrap();
    assert_eq!(a1.len(), 2);

    let t2 = engine
        .coordination_events(&EventFilter::new().transaction("t2"), 1)
        .unwrap();
    assert_eq!(t2.len(), 1);
    assert_eq!(t2[0].target_agent.as_deref(), Some("a4"));

    let both = engine
        .coordination_events(&EventFilter::new().agent("a1").transaction("t2"), 100)
        .unwrap();
    assert_eq!(both.len(), 1);
    assert_eq!(both[0].source_agent, "a3");

    assert!(engine.workflow("t404").unwrap().is_empty());
}

#[test]
fn test_status_relay_and_dashboard_counts() {
    let engine = FleetEngine::from_config(&FleetConfig::default()).unwrap();
    engine
        .update_status("compliance_001", AgentStatus::Offline)
        .unwrap();
    engine
        .update_status("compliance_001", AgentStatus::Busy)
        .unwrap();
    engine
        .update_status("pattern_detector_001", AgentStatus::Error)
        .unwrap();

    let summary = engine.dashboard_summary().unwrap();
    assert_eq!(summary.agents.total, 5);
    assert_eq!(summary.agents.active, 3);
    assert_eq!(summary.agents.busy, 1);
    assert_eq!(summary.agents.error, 1);
    assert_eq!(summary.agents.offline, 0);
}

#[test]
fn test_non_finite_event_duration_is_rejected() {
    let engine = empty_engine();
    engine
        .log_event(
            NewCoordinationEvent::new(event_types::REQUEST, "a1")
                .target("a2")
                .duration_ms(100.0),
        )
        .unwrap();

    for bad in [f64::NAN, -5_000.0] {
        let result = engine.log_event(
            NewCoordinationEvent::new(event_types::REQUEST, "a1")
                .target("a2")
                .duration_ms(bad),
        );
        assert!(matches!(result, Err(FleetError::InvalidInput(_))));
    }

    assert_eq!(engine.event_log().len().unwrap(), 1);
    let efficiency = engine.coordination_efficiency().unwrap();
    assert_close(efficiency.avg_coordination_time_ms, 100.0);
    assert_close(efficiency.efficiency_score, 0.94);
}

#[test]
fn test_oversized_summary_window_errors_instead_of_panicking() {
    let mut config = FleetConfig::empty_fleet();
    config.analytics.summary_window_minutes = i64::MAX;
    assert!(matches!(config.validate(), Err(FleetError::Config(_))));
    assert!(FleetEngine::from_config(&config).is_err());

    // Settings built in code skip config validation
    let engine = FleetEngine::new(config.engine.clone(), config.analytics.clone());
    assert!(matches!(engine.dashboard_summary(), Err(FleetError::InvalidInput(_))));
    assert!(matches!(
        engine.event_log().recent(i64::MAX),
        Err(FleetError::InvalidInput(_))
    ));
}
