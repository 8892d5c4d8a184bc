//! Rolling per-agent metrics aggregation
//!
//! Performance samples are folded into each agent's [`AgentMetrics`] with a
//! cumulative-count rolling mean, then condensed into a composite health
//! score and appended to a bounded history ring.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{FleetError, Result};
use crate::registry::AgentRegistry;
use crate::types::{AgentMetrics, MetricsUpdate, PerformanceSnapshot};

/// Default number of snapshots kept per agent
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Response time at which the latency term of the health score reaches 0
const LATENCY_CEILING_MS: f64 = 1000.0;

const SUCCESS_WEIGHT: f64 = 0.4;
const RESPONSE_TIME_WEIGHT: f64 = 0.3;
const LOAD_WEIGHT: f64 = 0.2;
const ERROR_WEIGHT: f64 = 0.1;

/// Fixed-capacity ring that evicts its oldest entry on overflow
#[derive(Debug, Clone)]
pub struct CircularBuffer<T> {
    data: VecDeque<T>,
    capacity: usize,
}

impl<T> CircularBuffer<T> {
    /// Create new circular buffer with specified capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            data: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a value, returning the evicted oldest value if the buffer was full
    pub fn push(&mut self, value: T) -> Option<T> {
        if self.capacity == 0 {
            return Some(value);
        }
        let evicted = if self.data.len() >= self.capacity {
            self.data.pop_front()
        } else {
            None
        };
        self.data.push_back(value);
        evicted
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.data.iter()
    }
}

impl<T: Clone> CircularBuffer<T> {
    /// Copy of the newest `n` values, oldest first
    pub fn last_n(&self, n: usize) -> Vec<T> {
        let skip = self.data.len().saturating_sub(n);
        self.data.iter().skip(skip).cloned().collect()
    }
}

/// `(requests - errors) / requests`, defaulting to 1.0 with no requests
pub fn success_rate(requests_processed: u64, error_count: u64) -> f64 {
    if requests_processed == 0 {
        return 1.0;
    }
    let succeeded = requests_processed.saturating_sub(error_count);
    (succeeded as f64 / requests_processed as f64).clamp(0.0, 1.0)
}

/// Fold `sample` into a mean over `count` observations (count includes the sample)
pub fn rolling_average(previous: f64, count: u64, sample: f64) -> f64 {
    if count == 0 {
        return sample;
    }
    let n = count as f64;
    (previous * (n - 1.0) + sample) / n
}

/// Weighted health blend of success, latency, load and error terms
pub fn health_score(metrics: &AgentMetrics) -> f64 {
    let success_term = metrics.success_rate.clamp(0.0, 1.0);
    let latency_term =
        (1.0 - metrics.average_response_time_ms / LATENCY_CEILING_MS).clamp(0.0, 1.0);
    let load_term = (1.0 - metrics.current_load).clamp(0.0, 1.0);
    let error_rate = metrics.error_count as f64 / metrics.requests_processed.max(1) as f64;
    let error_term = (1.0 - error_rate).clamp(0.0, 1.0);

    let score = success_term * SUCCESS_WEIGHT
        + latency_term * RESPONSE_TIME_WEIGHT
        + load_term * LOAD_WEIGHT
        + error_term * ERROR_WEIGHT;

    round_to(score, 3).clamp(0.0, 1.0)
}

/// Round half away from zero to `decimals` places
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Reject out-of-range samples before anything is mutated
fn validate_update(agent_id: &str, update: &MetricsUpdate, metrics: &AgentMetrics) -> Result<()> {
    if let Some(load) = update.load {
        if !load.is_finite() || !(0.0..=1.0).contains(&load) {
            return Err(FleetError::InvalidInput(format!(
                "load for {} must be within [0, 1], got {}",
                agent_id, load
            )));
        }
    }

    if let Some(ms) = update.response_time_ms {
        if !ms.is_finite() || ms < 0.0 {
            return Err(FleetError::InvalidInput(format!(
                "response time for {} must be a non-negative number, got {}",
                agent_id, ms
            )));
        }
    }

    if let Some(cpu) = update.cpu_usage_percent {
        if !cpu.is_finite() || !(0.0..=100.0).contains(&cpu) {
            return Err(FleetError::InvalidInput(format!(
                "cpu usage for {} must be within [0, 100], got {}",
                agent_id, cpu
            )));
        }
    }

    if let Some(mb) = update.memory_usage_mb {
        if !mb.is_finite() || mb < 0.0 {
            return Err(FleetError::InvalidInput(format!(
                "memory usage for {} must be non-negative, got {}",
                agent_id, mb
            )));
        }
    }

    if update.success == Some(false) {
        let requests = metrics
            .requests_processed
            .saturating_add(update.requests.unwrap_or(0));
        if metrics.error_count + 1 > requests {
            return Err(FleetError::InvalidInput(format!(
                "failure reported for {} exceeds processed requests ({})",
                agent_id, requests
            )));
        }
    }

    Ok(())
}

/// Applies performance samples to registered agents
///
/// Each update runs under the target agent's own lock, so reporters for
/// different agents never wait on each other.
#[derive(Clone)]
pub struct MetricsAggregator {
    registry: Arc<AgentRegistry>,
}

impl MetricsAggregator {
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self { registry }
    }

    /// Fold a sample into the agent's metrics and return the new health score
    pub fn update_metrics(&self, agent_id: &str, update: MetricsUpdate) -> Result<f64> {
        self.update_metrics_at(agent_id, update, Utc::now())
    }

    pub fn update_metrics_at(
        &self,
        agent_id: &str,
        update: MetricsUpdate,
        now: DateTime<Utc>,
    ) -> Result<f64> {
        self.registry.with_cell(agent_id, |cell| {
            if let Err(e) = validate_update(agent_id, &update, &cell.agent.metrics) {
                warn!("Rejected metrics update: {}", e);
                return Err(e);
            }

            let registered_at = cell.agent.registered_at;
            let metrics = &mut cell.agent.metrics;

            if let Some(count) = update.requests {
                metrics.requests_processed = metrics.requests_processed.saturating_add(count);
            }

            if let Some(sample) = update.response_time_ms {
                metrics.average_response_time_ms = rolling_average(
                    metrics.average_response_time_ms,
                    metrics.requests_processed,
                    sample,
                );
            }

            if update.success == Some(false) {
                metrics.error_count += 1;
            }
            metrics.success_rate = success_rate(metrics.requests_processed, metrics.error_count);

            if let Some(load) = update.load {
                metrics.current_load = load;
            }
            if let Some(cpu) = update.cpu_usage_percent {
                metrics.cpu_usage_percent = cpu;
            }
            if let Some(mb) = update.memory_usage_mb {
                metrics.memory_usage_mb = mb;
            }

            metrics.last_activity = now;
            metrics.uptime_seconds = (now - registered_at).num_seconds().max(0) as u64;

            let health = health_score(metrics);
            let snapshot = PerformanceSnapshot {
                timestamp: now,
                response_time: metrics.average_response_time_ms,
                success_rate: metrics.success_rate,
                load: metrics.current_load,
                health_score: health,
            };
            cell.agent.health_score = health;
            cell.history.push(snapshot);

            debug!(agent_id, health, "Updated agent metrics");
            Ok(health)
        })?
    }

    /// Most recent `limit` snapshots (capped at ring capacity), oldest first
    pub fn history(&self, agent_id: &str, limit: usize) -> Result<Vec<PerformanceSnapshot>> {
        self.registry.with_cell(agent_id, |cell| {
            let limit = limit.min(cell.history.capacity());
            cell.history.last_n(limit)
        })
    }
}
