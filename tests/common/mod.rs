//! Common test utilities and helpers

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use fleetwatch_core::types::event_status;
use fleetwatch_core::{
    AgentDescriptor, AgentType, CoordinationEvent, FleetConfig, FleetEngine, MetricsUpdate,
    NewCoordinationEvent,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Engine with no seeded agents and default settings
pub fn empty_engine() -> FleetEngine {
    FleetEngine::from_config(&FleetConfig::empty_fleet()).expect("Failed to build empty engine")
}

/// Engine with the given agent ids registered as transaction analyzers
pub fn engine_with_agents(ids: &[&str]) -> FleetEngine {
    let engine = empty_engine();
    for id in ids {
        engine
            .register_agent(AgentDescriptor::new(
                *id,
                format!("Agent {}", id),
                AgentType::TransactionAnalyzer,
            ))
            .expect("Failed to register test agent");
    }
    engine
}

/// Completed event between two agents at a fixed time
pub fn event_between(
    event_type: &str,
    source: &str,
    target: &str,
    transaction_id: &str,
    timestamp: DateTime<Utc>,
) -> CoordinationEvent {
    CoordinationEvent::from_new_at(
        NewCoordinationEvent::new(event_type, source)
            .target(target)
            .transaction(transaction_id)
            .status(event_status::COMPLETED)
            .duration_ms(20.0),
        timestamp,
    )
}

/// Timestamp `seconds` after a fixed base
pub fn at_offset(base: DateTime<Utc>, seconds: i64) -> DateTime<Utc> {
    base + Duration::seconds(seconds)
}

/// Seeded random metrics source standing in for live reporters
pub struct ActivityGenerator {
    rng: StdRng,
}

impl ActivityGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next_update(&mut self) -> MetricsUpdate {
        MetricsUpdate::new()
            .requests(self.rng.gen_range(1..=5))
            .response_time_ms(self.rng.gen_range(50.0..300.0))
            .success(self.rng.gen_bool(0.95))
            .load(self.rng.gen_range(0.1..0.8))
    }

    /// Apply `rounds` updates to every listed agent
    pub fn drive(&mut self, engine: &FleetEngine, agent_ids: &[&str], rounds: usize) {
        for _ in 0..rounds {
            for id in agent_ids {
                let update = self.next_update();
                engine
                    .update_metrics(id, update)
                    .expect("Generated update should be valid");
            }
        }
    }
}
