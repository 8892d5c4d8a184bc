//! Coordination event log
//!
//! Append-only, capacity-bounded record of inter-agent interactions. Appends
//! and head eviction happen under one write guard, so the log never holds more
//! than its capacity and concurrent appends never evict more than needed.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

use crate::error::{FleetError, Result};
use crate::metrics::CircularBuffer;
use crate::types::{CoordinationEvent, NewCoordinationEvent};

/// Default number of events retained
pub const DEFAULT_EVENT_LOG_CAPACITY: usize = 1000;

/// Largest lookback window a `chrono` duration can represent
pub const MAX_WINDOW_MINUTES: i64 = i64::MAX / 60_000;

/// Optional agent / transaction constraints for event retrieval
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    /// Matches events where the agent is the source or the target
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn transaction(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }

    pub fn matches(&self, event: &CoordinationEvent) -> bool {
        let agent_ok = self
            .agent_id
            .as_deref()
            .map_or(true, |agent_id| event.involves(agent_id));
        let transaction_ok = self
            .transaction_id
            .as_deref()
            .map_or(true, |tx| event.transaction_id.as_deref() == Some(tx));
        agent_ok && transaction_ok
    }
}

/// Directed interaction edge in a transaction workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowEdge {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub status: String,
    pub duration_ms: f64,
    pub timestamp: DateTime<Utc>,
}

/// Agent interaction graph reconstructed for one transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowGraph {
    pub transaction_id: String,
    /// Distinct agents in first-appearance order
    pub nodes: Vec<String>,
    pub edges: Vec<WorkflowEdge>,
    pub total_events: usize,
    /// Matching events, ascending by timestamp
    pub timeline: Vec<CoordinationEvent>,
}

impl WorkflowGraph {
    /// Build a graph from events already filtered to one transaction
    pub fn from_events(transaction_id: impl Into<String>, events: Vec<CoordinationEvent>) -> Self {
        let mut seen = HashSet::new();
        let mut nodes = Vec::new();
        let mut edges = Vec::new();

        for event in &events {
            if seen.insert(event.source_agent.clone()) {
                nodes.push(event.source_agent.clone());
            }
            if let Some(target) = &event.target_agent {
                if seen.insert(target.clone()) {
                    nodes.push(target.clone());
                }
                edges.push(WorkflowEdge {
                    from: event.source_agent.clone(),
                    to: target.clone(),
                    event_type: event.event_type.clone(),
                    status: event.status.clone(),
                    duration_ms: event.duration_ms,
                    timestamp: event.timestamp,
                });
            }
        }

        let mut timeline = events;
        timeline.sort_by_key(|event| event.timestamp);

        Self {
            transaction_id: transaction_id.into(),
            nodes,
            edges,
            total_events: timeline.len(),
            timeline,
        }
    }

    /// No events were recorded for the transaction
    pub fn is_empty(&self) -> bool {
        self.total_events == 0
    }
}

/// Bounded coordination event log
pub struct CoordinationEventLog {
    events: RwLock<CircularBuffer<CoordinationEvent>>,
}

impl Default for CoordinationEventLog {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_LOG_CAPACITY)
    }
}

impl CoordinationEventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: RwLock::new(CircularBuffer::new(capacity)),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, CircularBuffer<CoordinationEvent>>> {
        self.events
            .read()
            .map_err(|e| FleetError::Lock(format!("Failed to lock event log: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, CircularBuffer<CoordinationEvent>>> {
        self.events
            .write()
            .map_err(|e| FleetError::Lock(format!("Failed to lock event log: {}", e)))
    }

    /// Append an event, evicting the oldest when at capacity
    pub fn append(&self, event: CoordinationEvent) -> Result<()> {
        validate_duration(&event.source_agent, event.duration_ms)?;
        let mut events = self.write()?;
        Self::push(&mut events, event);
        Ok(())
    }

    /// Stamp and append a producer event, returning the stored copy
    ///
    /// The timestamp is taken under the write lock so log order matches time order.
    pub fn record(&self, new: NewCoordinationEvent) -> Result<CoordinationEvent> {
        validate_duration(&new.source_agent, new.duration_ms)?;
        let mut events = self.write()?;
        let event = CoordinationEvent::from_new(new);
        Self::push(&mut events, event.clone());
        Ok(event)
    }

    fn push(events: &mut CircularBuffer<CoordinationEvent>, event: CoordinationEvent) {
        if let Some(evicted) = events.push(event) {
            debug!("Evicted coordination event {}", evicted.event_id);
        }
    }

    /// Most recent `limit` matching events, oldest first
    pub fn query(&self, filter: &EventFilter, limit: usize) -> Result<Vec<CoordinationEvent>> {
        let events = self.read()?;
        let mut matched: Vec<CoordinationEvent> = events
            .iter()
            .rev()
            .filter(|event| filter.matches(event))
            .take(limit)
            .cloned()
            .collect();
        matched.reverse();
        Ok(matched)
    }

    /// Reconstruct the interaction graph for one transaction
    ///
    /// An unknown transaction yields an empty graph rather than an error.
    pub fn workflow(&self, transaction_id: &str) -> Result<WorkflowGraph> {
        let matching: Vec<CoordinationEvent> = {
            let events = self.read()?;
            events
                .iter()
                .filter(|event| event.transaction_id.as_deref() == Some(transaction_id))
                .cloned()
                .collect()
        };
        Ok(WorkflowGraph::from_events(transaction_id, matching))
    }

    /// Events newer than `window_minutes` ago
    pub fn recent(&self, window_minutes: i64) -> Result<Vec<CoordinationEvent>> {
        self.recent_at(Utc::now(), window_minutes)
    }

    pub fn recent_at(
        &self,
        now: DateTime<Utc>,
        window_minutes: i64,
    ) -> Result<Vec<CoordinationEvent>> {
        let window = lookback(window_minutes)?;
        let events = self.read()?;
        Ok(events
            .iter()
            .filter(|event| is_within(now, event.timestamp, window))
            .cloned()
            .collect())
    }

    /// Count of events newer than `window_minutes` ago, without copying them
    pub fn count_recent_at(&self, now: DateTime<Utc>, window_minutes: i64) -> Result<usize> {
        let window = lookback(window_minutes)?;
        let events = self.read()?;
        Ok(events
            .iter()
            .filter(|event| is_within(now, event.timestamp, window))
            .count())
    }

    /// Copy of the whole log, oldest first
    pub fn snapshot(&self) -> Result<Vec<CoordinationEvent>> {
        Ok(self.read()?.iter().cloned().collect())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn capacity(&self) -> Result<usize> {
        Ok(self.read()?.capacity())
    }
}

fn validate_duration(source_agent: &str, duration_ms: f64) -> Result<()> {
    if !duration_ms.is_finite() || duration_ms < 0.0 {
        let err = FleetError::InvalidInput(format!(
            "event duration from {} must be a non-negative number, got {}",
            source_agent, duration_ms
        ));
        warn!("Rejected coordination event: {}", err);
        return Err(err);
    }
    Ok(())
}

fn lookback(window_minutes: i64) -> Result<Duration> {
    Duration::try_minutes(window_minutes).ok_or_else(|| {
        FleetError::InvalidInput(format!(
            "window of {} minutes is out of range (max {})",
            window_minutes, MAX_WINDOW_MINUTES
        ))
    })
}

fn is_within(now: DateTime<Utc>, timestamp: DateTime<Utc>, window: Duration) -> bool {
    now - timestamp < window
}
