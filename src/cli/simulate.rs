//! Simulated fleet activity
//!
//! One tokio task per agent reports metrics and occasional status changes,
//! while a coordinator task plays out transaction workflows between agents.
//! Every task has its own seeded RNG so a run is reproducible per task.

use anyhow::Result;
use fleetwatch_core::types::{event_status, event_types};
use fleetwatch_core::{
    AgentStatus, AgentType, FleetEngine, FleetError, MetricsUpdate, NewCoordinationEvent,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct SimulationOptions {
    pub ticks: u32,
    pub interval: Duration,
    pub seed: u64,
}

/// Run the simulation to completion
pub async fn run(engine: Arc<FleetEngine>, options: SimulationOptions) -> Result<()> {
    let agents = engine.list_agents()?;
    info!(
        "Simulating {} ticks across {} agents (seed {})",
        options.ticks,
        agents.len(),
        options.seed
    );

    let mut handles = Vec::with_capacity(agents.len() + 1);

    for (index, agent) in agents.iter().enumerate() {
        let engine = engine.clone();
        let agent_id = agent.agent_id.clone();
        let seed = options.seed.wrapping_add(index as u64 + 1);
        let ticks = options.ticks;
        let interval = options.interval;

        handles.push(tokio::spawn(async move {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut timer = tokio::time::interval(interval);
            for _ in 0..ticks {
                timer.tick().await;
                if let Err(e) = agent_tick(&engine, &agent_id, &mut rng) {
                    warn!("Agent {} tick failed: {}", agent_id, e);
                }
            }
        }));
    }

    let coordinator_engine = engine.clone();
    let participants: Vec<(String, AgentType)> = agents
        .iter()
        .map(|a| (a.agent_id.clone(), a.agent_type))
        .collect();
    let seed = options.seed;
    let ticks = options.ticks;
    let interval = options.interval;

    handles.push(tokio::spawn(async move {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut timer = tokio::time::interval(interval);
        for tick in 0..ticks {
            timer.tick().await;
            let transaction_id = format!("txn_{:06}", tick);
            if let Err(e) =
                play_transaction(&coordinator_engine, &participants, &transaction_id, &mut rng)
            {
                warn!("Transaction {} failed to record: {}", transaction_id, e);
            }
        }
    }));

    for handle in handles {
        handle.await?;
    }

    info!("Simulation finished");
    Ok(())
}

/// One metrics report for an agent, plus an occasional status flip
fn agent_tick(engine: &FleetEngine, agent_id: &str, rng: &mut StdRng) -> Result<(), FleetError> {
    if rng.gen_bool(0.05) {
        let status = match rng.gen_range(0..3) {
            0 => AgentStatus::Busy,
            1 => AgentStatus::Idle,
            _ => AgentStatus::Active,
        };
        engine.update_status(agent_id, status)?;
    }

    let agent = engine
        .get_agent(agent_id)?
        .ok_or_else(|| FleetError::NotFound(agent_id.to_string()))?;
    if agent.status != AgentStatus::Active && agent.status != AgentStatus::Busy {
        return Ok(());
    }

    let health = engine.update_metrics(
        agent_id,
        MetricsUpdate::new()
            .requests(rng.gen_range(1..=5))
            .response_time_ms(rng.gen_range(50.0..300.0))
            .success(rng.gen_bool(0.95))
            .load(rng.gen_range(0.1..0.8))
            .cpu_usage_percent(rng.gen_range(5.0..90.0))
            .memory_usage_mb(rng.gen_range(96.0..512.0)),
    )?;
    debug!(agent_id, health, "Simulated metrics report");
    Ok(())
}

/// Orchestrator -> analyzer request/response, with an occasional escalation
fn play_transaction(
    engine: &FleetEngine,
    participants: &[(String, AgentType)],
    transaction_id: &str,
    rng: &mut StdRng,
) -> Result<(), FleetError> {
    let find = |kind: AgentType| {
        participants
            .iter()
            .find(|(_, t)| *t == kind)
            .map(|(id, _)| id.clone())
    };

    let (Some(orchestrator), Some(analyzer)) = (
        find(AgentType::Orchestrator),
        find(AgentType::TransactionAnalyzer),
    ) else {
        return Ok(());
    };

    let status = |rng: &mut StdRng| {
        if rng.gen_bool(0.9) {
            event_status::COMPLETED
        } else {
            event_status::TIMEOUT
        }
    };

    engine.log_event(
        NewCoordinationEvent::new(event_types::REQUEST, orchestrator.as_str())
            .target(analyzer.as_str())
            .transaction(transaction_id)
            .status(status(rng))
            .duration_ms(rng.gen_range(5.0..120.0)),
    )?;
    engine.log_event(
        NewCoordinationEvent::new(event_types::RESPONSE, analyzer.as_str())
            .target(orchestrator.as_str())
            .transaction(transaction_id)
            .status(status(rng))
            .duration_ms(rng.gen_range(5.0..120.0)),
    )?;

    if rng.gen_bool(0.2) {
        if let Some(assessor) = find(AgentType::RiskAssessor) {
            engine.log_event(
                NewCoordinationEvent::new(event_types::ESCALATION, orchestrator.as_str())
                    .target(assessor)
                    .transaction(transaction_id)
                    .status(status(rng))
                    .duration_ms(rng.gen_range(50.0..600.0)),
            )?;
        }
    }

    Ok(())
}
