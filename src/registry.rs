//! Agent Registry
//!
//! Holds one record per known agent. The id -> agent table sits behind a
//! `RwLock`, and every agent lives in its own `Mutex` cell, so:
//!
//! - per-agent writers (status, metrics, configuration) serialize on that
//!   agent's cell only and never contend with other agents
//! - registration takes the table write lock just long enough to insert a
//!   new cell; it never waits on an agent's cell
//! - snapshots lock every cell in registration order under the table read
//!   lock, copy, and release before any derived computation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard};
use tracing::{debug, info, warn};

use crate::error::{FleetError, Result};
use crate::metrics::{CircularBuffer, DEFAULT_HISTORY_CAPACITY};
use crate::types::{
    default_agent_configuration, Agent, AgentConfiguration, AgentDescriptor, AgentMetrics,
    AgentStatus, PerformanceSnapshot, StatusChange,
};

/// How status changes reported by producers are checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    /// Any status may follow any other
    #[default]
    Permissive,
    /// Only lifecycle-consistent changes are accepted
    Strict,
}

impl TransitionPolicy {
    pub fn allows(&self, from: AgentStatus, to: AgentStatus) -> bool {
        use AgentStatus::*;

        match self {
            TransitionPolicy::Permissive => true,
            TransitionPolicy::Strict => {
                from == to
                    || matches!(
                        (from, to),
                        (Offline, Starting)
                            | (Starting, Active | Idle | Error | Stopping | Offline)
                            | (Active | Idle | Busy, Active | Idle | Busy | Error | Stopping)
                            | (Error, Starting | Stopping | Offline | Active)
                            | (Stopping, Offline | Error)
                    )
            }
        }
    }
}

/// Exclusively-owned state for one agent
#[derive(Debug)]
pub(crate) struct AgentCell {
    pub(crate) agent: Agent,
    pub(crate) history: CircularBuffer<PerformanceSnapshot>,
}

#[derive(Default)]
struct AgentTable {
    /// Registration order, used for stable listing and lock ordering
    order: Vec<String>,
    cells: HashMap<String, Arc<Mutex<AgentCell>>>,
}

/// Registry of fleet members
pub struct AgentRegistry {
    table: RwLock<AgentTable>,
    history_capacity: usize,
    policy: TransitionPolicy,
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY, TransitionPolicy::default())
    }
}

impl AgentRegistry {
    pub fn new(history_capacity: usize, policy: TransitionPolicy) -> Self {
        Self {
            table: RwLock::new(AgentTable::default()),
            history_capacity,
            policy,
        }
    }

    fn read_table(&self) -> Result<RwLockReadGuard<'_, AgentTable>> {
        self.table
            .read()
            .map_err(|e| FleetError::Lock(format!("Failed to lock agent table: {}", e)))
    }

    fn lock_cell<'a>(id: &str, cell: &'a Mutex<AgentCell>) -> Result<MutexGuard<'a, AgentCell>> {
        cell.lock()
            .map_err(|e| FleetError::Lock(format!("Failed to lock agent {}: {}", id, e)))
    }

    /// Clone the cell handle so the table lock is released before the cell is locked
    fn cell(&self, agent_id: &str) -> Result<Arc<Mutex<AgentCell>>> {
        let table = self.read_table()?;
        table
            .cells
            .get(agent_id)
            .cloned()
            .ok_or_else(|| FleetError::NotFound(agent_id.to_string()))
    }

    /// Run `f` with exclusive access to one agent's cell
    pub(crate) fn with_cell<R>(
        &self,
        agent_id: &str,
        f: impl FnOnce(&mut AgentCell) -> R,
    ) -> Result<R> {
        let cell = self.cell(agent_id)?;
        let mut guard = Self::lock_cell(agent_id, &cell)?;
        Ok(f(&mut guard))
    }

    /// Register a new agent and return its initial record
    pub fn register(&self, descriptor: AgentDescriptor) -> Result<Agent> {
        self.register_at(descriptor, Utc::now())
    }

    pub fn register_at(&self, descriptor: AgentDescriptor, now: DateTime<Utc>) -> Result<Agent> {
        if descriptor.agent_id.trim().is_empty() {
            return Err(FleetError::InvalidInput(
                "agent id cannot be empty".to_string(),
            ));
        }

        let mut metrics = AgentMetrics::new(descriptor.agent_id.clone());
        metrics.last_activity = now;

        let agent = Agent {
            agent_id: descriptor.agent_id.clone(),
            agent_name: descriptor.agent_name,
            agent_type: descriptor.agent_type,
            status: descriptor.status.unwrap_or_default(),
            version: descriptor.version,
            capabilities: descriptor.capabilities,
            configuration: descriptor
                .configuration
                .unwrap_or_else(default_agent_configuration),
            metrics,
            health_score: 1.0,
            last_heartbeat: now,
            registered_at: now,
        };

        let cell = AgentCell {
            agent: agent.clone(),
            history: CircularBuffer::new(self.history_capacity),
        };

        let mut table = self
            .table
            .write()
            .map_err(|e| FleetError::Lock(format!("Failed to lock agent table: {}", e)))?;

        if table.cells.contains_key(&agent.agent_id) {
            return Err(FleetError::AlreadyExists(format!(
                "agent {}",
                agent.agent_id
            )));
        }

        table.order.push(agent.agent_id.clone());
        table
            .cells
            .insert(agent.agent_id.clone(), Arc::new(Mutex::new(cell)));

        info!(
            "Registered agent: {} (type: {})",
            agent.agent_id, agent.agent_type
        );
        Ok(agent)
    }

    /// Copy of one agent record
    pub fn get(&self, agent_id: &str) -> Result<Option<Agent>> {
        match self.with_cell(agent_id, |cell| cell.agent.clone()) {
            Ok(agent) => Ok(Some(agent)),
            Err(FleetError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Copies of all agents in registration order
    pub fn list(&self) -> Result<Vec<Agent>> {
        self.snapshot()
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read_table()?.order.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Consistent copy of every agent, taken with all cells held at once
    pub fn snapshot(&self) -> Result<Vec<Agent>> {
        let table = self.read_table()?;
        let guards = table
            .order
            .iter()
            .filter_map(|id| table.cells.get(id).map(|cell| (id, cell)))
            .map(|(id, cell)| Self::lock_cell(id, cell))
            .collect::<Result<Vec<_>>>()?;

        Ok(guards.iter().map(|guard| guard.agent.clone()).collect())
    }

    /// Set an agent's status and refresh its heartbeat
    pub fn update_status(&self, agent_id: &str, status: AgentStatus) -> Result<StatusChange> {
        self.update_status_at(agent_id, status, Utc::now())
    }

    pub fn update_status_at(
        &self,
        agent_id: &str,
        status: AgentStatus,
        now: DateTime<Utc>,
    ) -> Result<StatusChange> {
        let policy = self.policy;
        self.with_cell(agent_id, |cell| {
            let previous = cell.agent.status;
            if !policy.allows(previous, status) {
                warn!(
                    "Rejected status transition for {}: {} -> {}",
                    agent_id, previous, status
                );
                return Err(FleetError::InvalidTransition {
                    agent_id: agent_id.to_string(),
                    from: previous.to_string(),
                    to: status.to_string(),
                });
            }

            cell.agent.status = status;
            cell.agent.last_heartbeat = now;
            debug!("Agent {} status: {} -> {}", agent_id, previous, status);

            Ok(StatusChange {
                agent_id: agent_id.to_string(),
                previous,
                status,
                timestamp: now,
            })
        })?
    }

    /// Refresh an agent's heartbeat without touching its status
    pub fn heartbeat(&self, agent_id: &str) -> Result<DateTime<Utc>> {
        let now = Utc::now();
        self.with_cell(agent_id, |cell| {
            cell.agent.last_heartbeat = now;
            now
        })
    }

    /// Merge entries into an agent's configuration and return the result
    pub fn update_configuration(
        &self,
        agent_id: &str,
        entries: AgentConfiguration,
    ) -> Result<AgentConfiguration> {
        self.with_cell(agent_id, |cell| {
            cell.agent.configuration.extend(entries);
            cell.agent.configuration.clone()
        })
    }
}
