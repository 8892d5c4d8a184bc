//! Concurrent producers and readers sharing one engine

mod common;

use common::{empty_engine, engine_with_agents, ActivityGenerator};
use fleetwatch_core::types::event_types;
use fleetwatch_core::{
    AgentDescriptor, AgentType, EventFilter, FleetError, MetricsUpdate, NewCoordinationEvent,
};
use std::sync::Arc;
use std::thread;

#[test]
fn test_parallel_updates_to_distinct_agents_are_not_lost() {
    let ids: Vec<String> = (0..8).map(|i| format!("worker_{}", i)).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let engine = Arc::new(engine_with_agents(&id_refs));

    let handles: Vec<_> = ids
        .iter()
        .cloned()
        .map(|id| {
            let engine = engine.clone();
            thread::spawn(move || {
                for _ in 0..250 {
                    engine
                        .update_metrics(&id, MetricsUpdate::new().requests(2).success(true))
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    for agent in engine.list_agents().unwrap() {
        assert_eq!(agent.metrics.requests_processed, 500);
        assert_eq!(agent.metrics.error_count, 0);
    }
}

#[test]
fn test_parallel_updates_to_one_agent_serialize() {
    let engine = Arc::new(engine_with_agents(&["hot"]));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = engine.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    engine
                        .update_metrics(
                            "hot",
                            MetricsUpdate::new().requests(1).response_time_ms(100.0),
                        )
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let agent = engine.get_agent("hot").unwrap().unwrap();
    assert_eq!(agent.metrics.requests_processed, 400);
    assert!((agent.metrics.average_response_time_ms - 100.0).abs() < 1e-9);
    assert_eq!(engine.metrics_history("hot", 1000).unwrap().len(), 100);
}

#[test]
fn test_concurrent_appends_never_exceed_capacity() {
    let engine = Arc::new(empty_engine());

    let writers: Vec<_> = (0..6)
        .map(|w| {
            let engine = engine.clone();
            thread::spawn(move || {
                for i in 0..400 {
                    engine
                        .log_event(
                            NewCoordinationEvent::new(event_types::COORDINATION, format!("w{}", w))
                                .transaction(format!("t{}", i % 10))
                                .duration_ms(1.0),
                        )
                        .unwrap();
                }
            })
        })
        .collect();

    let reader = {
        let engine = engine.clone();
        thread::spawn(move || {
            for _ in 0..200 {
                assert!(engine.event_log().len().unwrap() <= 1000);
                let recent = engine
                    .coordination_events(&EventFilter::new(), 50)
                    .unwrap();
                assert!(recent.len() <= 50);
            }
        })
    };

    for handle in writers {
        handle.join().unwrap();
    }
    reader.join().unwrap();

    let log = engine.event_log();
    assert_eq!(log.len().unwrap(), 1000);
    let events = log.snapshot().unwrap();
    assert!(events
        .windows(2)
        .all(|pair| pair[0].timestamp <= pair[1].timestamp));
}

#[test]
fn test_readers_see_consistent_views_during_writes() {
    let ids = ["a", "b", "c", "d"];
    let engine = Arc::new(engine_with_agents(&ids));

    let writer = {
        let engine = engine.clone();
        thread::spawn(move || {
            ActivityGenerator::new(42).drive(&engine, &ids, 200);
        })
    };

    let reader = {
        let engine = engine.clone();
        thread::spawn(move || {
            for _ in 0..200 {
                let summary = engine.dashboard_summary().unwrap();
                assert_eq!(summary.agents.total, 4);
                let performance = &summary.performance;
                assert!(performance.total_errors <= performance.total_requests_processed);
                assert!((0.0..=1.0).contains(&summary.performance.overall_success_rate));

                let workload = engine.workload_distribution().unwrap();
                let score = workload.balance_metrics.balance_score;
                assert!((0.0..=1.0).contains(&score));
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();
}

#[test]
fn test_concurrent_registration_of_same_id_admits_one() {
    let engine = Arc::new(empty_engine());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = engine.clone();
            thread::spawn(move || {
                engine.register_agent(AgentDescriptor::new(
                    "dup",
                    "Duplicate",
                    AgentType::Compliance,
                ))
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let admitted = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(FleetError::AlreadyExists(_))))
        .count();

    assert_eq!(admitted, 1);
    assert_eq!(rejected, 7);
    assert_eq!(engine.list_agents().unwrap().len(), 1);
}

#[tokio::test]
async fn test_async_producers_share_engine() {
    let engine = Arc::new(engine_with_agents(&["x", "y"]));

    let mut tasks = Vec::new();
    for id in ["x", "y"] {
        let engine = engine.clone();
        tasks.push(tokio::spawn(async move {
            for _ in 0..50 {
                engine
                    .update_metrics(id, MetricsUpdate::new().requests(1).load(0.5))
                    .unwrap();
                tokio::task::yield_now().await;
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let distribution = engine.workload_distribution().unwrap();
    assert_eq!(distribution.balance_metrics.total_requests, 100);
    assert!((distribution.balance_metrics.balance_score - 1.0).abs() < 1e-9);
}
