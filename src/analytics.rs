//! Fleet-wide derived views
//!
//! [`FleetAnalytics`] owns no state. Each view copies what it needs out of the
//! registry and the event log (see [`AgentRegistry::snapshot`]), releases the
//! locks, and only then aggregates. Every divisor is guarded: empty fleets and
//! quiet logs produce explicit defaults (0, or 1.0 where the absence of data
//! is no evidence of failure).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::config::AnalyticsSettings;
use crate::coordination::CoordinationEventLog;
use crate::error::Result;
use crate::metrics::round_to;
use crate::registry::AgentRegistry;
use crate::types::{Agent, AgentStatus, AgentType, CoordinationEvent, PerformanceSnapshot};

/// Average completed-event duration at which the speed term reaches 0
const COORDINATION_BASELINE_MS: f64 = 500.0;
const EFFICIENCY_SUCCESS_WEIGHT: f64 = 0.7;
const EFFICIENCY_SPEED_WEIGHT: f64 = 0.3;
/// Normalizer turning summed percentage variances into a [0, 1] penalty
const BALANCE_VARIANCE_SCALE: f64 = 200.0;

/// Agent counts per status
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub total: usize,
    pub starting: usize,
    pub active: usize,
    pub idle: usize,
    pub busy: usize,
    pub error: usize,
    pub stopping: usize,
    pub offline: usize,
}

impl StatusCounts {
    fn from_agents(agents: &[Agent]) -> Self {
        let mut counts = StatusCounts {
            total: agents.len(),
            ..Default::default()
        };
        for agent in agents {
            let slot = match agent.status {
                AgentStatus::Starting => &mut counts.starting,
                AgentStatus::Active => &mut counts.active,
                AgentStatus::Idle => &mut counts.idle,
                AgentStatus::Busy => &mut counts.busy,
                AgentStatus::Error => &mut counts.error,
                AgentStatus::Stopping => &mut counts.stopping,
                AgentStatus::Offline => &mut counts.offline,
            };
            *slot += 1;
        }
        counts
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceTotals {
    pub total_requests_processed: u64,
    pub total_errors: u64,
    pub overall_success_rate: f64,
    pub average_health_score: f64,
    pub average_response_time_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinationTotals {
    pub total_events: usize,
    pub recent_events: usize,
}

/// Top-level dashboard figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub timestamp: DateTime<Utc>,
    pub agents: StatusCounts,
    pub performance: PerformanceTotals,
    pub coordination: CoordinationTotals,
}

/// One agent's share of fleet work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentWorkload {
    pub agent_id: String,
    pub agent_name: String,
    pub agent_type: AgentType,
    pub requests_processed: u64,
    pub request_percentage: f64,
    pub current_load: f64,
    pub load_percentage: f64,
    pub avg_response_time_ms: f64,
    pub health_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceMetrics {
    /// 1.0 for a perfectly even spread, approaching 0 under monopoly
    pub balance_score: f64,
    pub total_requests: u64,
    pub total_load: f64,
    pub avg_load_per_agent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadDistribution {
    pub timestamp: DateTime<Utc>,
    pub distribution: Vec<AgentWorkload>,
    pub balance_metrics: BalanceMetrics,
}

/// Per event-type coordination statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventTypeStats {
    pub count: usize,
    pub completed: usize,
    pub total_duration_ms: f64,
    pub avg_duration_ms: f64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinationEfficiency {
    pub timestamp: DateTime<Utc>,
    pub total_events: usize,
    pub completed_events: usize,
    pub overall_success_rate: f64,
    /// Mean duration of completed events only
    pub avg_coordination_time_ms: f64,
    pub efficiency_score: f64,
    pub event_types: BTreeMap<String, EventTypeStats>,
    pub agents_involved: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentMetrics {
    pub load: f64,
    pub response_time_ms: f64,
    pub success_rate: f64,
    pub health_score: f64,
    pub requests_processed: u64,
    pub error_count: u64,
}

/// First-vs-last deltas over the trend window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trends {
    pub response_time_trend: f64,
    pub load_trend: f64,
    pub health_trend: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceTrend {
    pub agent_id: String,
    pub agent_name: String,
    pub status: AgentStatus,
    pub current_metrics: CurrentMetrics,
    pub trends: Trends,
    pub history: Vec<PerformanceSnapshot>,
}

/// One row of the fleet load view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentLoadRow {
    pub agent_id: String,
    pub agent_name: String,
    pub agent_type: AgentType,
    pub status: AgentStatus,
    pub health_score: f64,
    pub current_load: f64,
    pub requests_processed: u64,
    pub avg_response_time_ms: f64,
    pub success_rate: f64,
    pub error_count: u64,
    pub cpu_usage_percent: f64,
    pub memory_usage_mb: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadShare {
    pub agent_name: String,
    pub requests: u64,
    pub percentage: f64,
    pub load: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadSummary {
    pub total_agents: usize,
    pub healthy_agents: usize,
    pub avg_load: f64,
    pub avg_response_time: f64,
    pub total_requests: u64,
}

/// Whole-fleet view for watching agents under load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetLoadView {
    pub timestamp: DateTime<Utc>,
    pub agents: Vec<AgentLoadRow>,
    pub workload_distribution: BTreeMap<String, WorkloadShare>,
    pub coordination_efficiency: CoordinationEfficiency,
    pub summary: LoadSummary,
}

/// Population variance; 0 for an empty slice
pub fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

/// `1 - min(1, (var(request%) + var(load%)) / 200)`
pub fn balance_score(request_shares: &[f64], load_shares: &[f64]) -> f64 {
    let variance = population_variance(request_shares) + population_variance(load_shares);
    let penalty = variance / BALANCE_VARIANCE_SCALE;
    1.0 - penalty.min(1.0)
}

fn percentage(part: f64, total: f64) -> f64 {
    if total > 0.0 {
        part / total * 100.0
    } else {
        0.0
    }
}

fn mean_or_zero(total: f64, count: usize) -> f64 {
    if count > 0 {
        total / count as f64
    } else {
        0.0
    }
}

/// Read-only analytics over a registry and an event log
pub struct FleetAnalytics<'a> {
    registry: &'a AgentRegistry,
    log: &'a CoordinationEventLog,
    settings: &'a AnalyticsSettings,
}

impl<'a> FleetAnalytics<'a> {
    pub fn new(
        registry: &'a AgentRegistry,
        log: &'a CoordinationEventLog,
        settings: &'a AnalyticsSettings,
    ) -> Self {
        Self {
            registry,
            log,
            settings,
        }
    }

    pub fn dashboard_summary(&self) -> Result<DashboardSummary> {
        self.dashboard_summary_at(Utc::now())
    }

    pub fn dashboard_summary_at(&self, now: DateTime<Utc>) -> Result<DashboardSummary> {
        let agents = self.registry.snapshot()?;
        let total_events = self.log.len()?;
        let recent_events = self
            .log
            .count_recent_at(now, self.settings.summary_window_minutes)?;

        let total_requests: u64 = agents.iter().map(|a| a.metrics.requests_processed).sum();
        let total_errors: u64 = agents.iter().map(|a| a.metrics.error_count).sum();
        let overall_success_rate = if total_requests > 0 {
            total_requests.saturating_sub(total_errors) as f64 / total_requests as f64
        } else {
            1.0
        };
        let health_sum: f64 = agents.iter().map(|a| a.health_score).sum();
        let response_sum: f64 = agents
            .iter()
            .map(|a| a.metrics.average_response_time_ms)
            .sum();

        Ok(DashboardSummary {
            timestamp: now,
            agents: StatusCounts::from_agents(&agents),
            performance: PerformanceTotals {
                total_requests_processed: total_requests,
                total_errors,
                overall_success_rate,
                average_health_score: round_to(mean_or_zero(health_sum, agents.len()), 3),
                average_response_time_ms: round_to(mean_or_zero(response_sum, agents.len()), 2),
            },
            coordination: CoordinationTotals {
                total_events,
                recent_events,
            },
        })
    }

    pub fn workload_distribution(&self) -> Result<WorkloadDistribution> {
        self.workload_distribution_at(Utc::now())
    }

    pub fn workload_distribution_at(&self, now: DateTime<Utc>) -> Result<WorkloadDistribution> {
        let agents = self.registry.snapshot()?;

        let total_requests: u64 = agents.iter().map(|a| a.metrics.requests_processed).sum();
        let total_load: f64 = agents.iter().map(|a| a.metrics.current_load).sum();

        let mut request_shares = Vec::with_capacity(agents.len());
        let mut load_shares = Vec::with_capacity(agents.len());
        let mut distribution = Vec::with_capacity(agents.len());

        for agent in &agents {
            let request_share = percentage(
                agent.metrics.requests_processed as f64,
                total_requests as f64,
            );
            let load_share = percentage(agent.metrics.current_load, total_load);
            request_shares.push(request_share);
            load_shares.push(load_share);

            distribution.push(AgentWorkload {
                agent_id: agent.agent_id.clone(),
                agent_name: agent.agent_name.clone(),
                agent_type: agent.agent_type,
                requests_processed: agent.metrics.requests_processed,
                request_percentage: round_to(request_share, 2),
                current_load: agent.metrics.current_load,
                load_percentage: round_to(load_share, 2),
                avg_response_time_ms: agent.metrics.average_response_time_ms,
                health_score: agent.health_score,
            });
        }

        let balance = if agents.is_empty() {
            1.0
        } else {
            balance_score(&request_shares, &load_shares)
        };

        Ok(WorkloadDistribution {
            timestamp: now,
            distribution,
            balance_metrics: BalanceMetrics {
                balance_score: round_to(balance, 3),
                total_requests,
                total_load: round_to(total_load, 3),
                avg_load_per_agent: round_to(mean_or_zero(total_load, agents.len()), 3),
            },
        })
    }

    pub fn coordination_efficiency(&self) -> Result<CoordinationEfficiency> {
        self.coordination_efficiency_at(Utc::now())
    }

    pub fn coordination_efficiency_at(&self, now: DateTime<Utc>) -> Result<CoordinationEfficiency> {
        let recent = self
            .log
            .recent_at(now, self.settings.efficiency_window_minutes)?;
        Ok(efficiency_from_events(&recent, now))
    }

    /// Trend of one agent over its most recent history window
    pub fn performance_trend(&self, agent_id: &str) -> Result<PerformanceTrend> {
        let window = self.settings.trend_window;
        let (agent, history) = self
            .registry
            .with_cell(agent_id, |cell| (cell.agent.clone(), cell.history.last_n(window)))?;

        let trends = match (history.first(), history.last()) {
            (Some(first), Some(last)) if history.len() >= 2 => Trends {
                response_time_trend: round_to(last.response_time - first.response_time, 2),
                load_trend: round_to(last.load - first.load, 3),
                health_trend: round_to(last.health_score - first.health_score, 3),
            },
            _ => Trends::default(),
        };

        Ok(PerformanceTrend {
            current_metrics: CurrentMetrics::from(&agent),
            agent_id: agent.agent_id,
            agent_name: agent.agent_name,
            status: agent.status,
            trends,
            history,
        })
    }

    pub fn fleet_load_view(&self) -> Result<FleetLoadView> {
        self.fleet_load_view_at(Utc::now())
    }

    pub fn fleet_load_view_at(&self, now: DateTime<Utc>) -> Result<FleetLoadView> {
        let agents = self.registry.snapshot()?;
        let recent = self
            .log
            .recent_at(now, self.settings.summary_window_minutes)?;

        let total_requests: u64 = agents.iter().map(|a| a.metrics.requests_processed).sum();
        let load_sum: f64 = agents.iter().map(|a| a.metrics.current_load).sum();
        let response_sum: f64 = agents
            .iter()
            .map(|a| a.metrics.average_response_time_ms)
            .sum();
        let healthy_agents = agents
            .iter()
            .filter(|a| a.health_score >= self.settings.healthy_threshold)
            .count();

        let rows = agents
            .iter()
            .map(|agent| AgentLoadRow {
                agent_id: agent.agent_id.clone(),
                agent_name: agent.agent_name.clone(),
                agent_type: agent.agent_type,
                status: agent.status,
                health_score: agent.health_score,
                current_load: agent.metrics.current_load,
                requests_processed: agent.metrics.requests_processed,
                avg_response_time_ms: agent.metrics.average_response_time_ms,
                success_rate: agent.metrics.success_rate,
                error_count: agent.metrics.error_count,
                cpu_usage_percent: agent.metrics.cpu_usage_percent,
                memory_usage_mb: agent.metrics.memory_usage_mb,
            })
            .collect();

        let workload_distribution = agents
            .iter()
            .map(|agent| {
                let share = percentage(
                    agent.metrics.requests_processed as f64,
                    total_requests as f64,
                );
                (
                    agent.agent_id.clone(),
                    WorkloadShare {
                        agent_name: agent.agent_name.clone(),
                        requests: agent.metrics.requests_processed,
                        percentage: round_to(share, 2),
                        load: agent.metrics.current_load,
                    },
                )
            })
            .collect();

        Ok(FleetLoadView {
            timestamp: now,
            agents: rows,
            workload_distribution,
            coordination_efficiency: efficiency_from_events(&recent, now),
            summary: LoadSummary {
                total_agents: agents.len(),
                healthy_agents,
                avg_load: mean_or_zero(load_sum, agents.len()),
                avg_response_time: mean_or_zero(response_sum, agents.len()),
                total_requests,
            },
        })
    }
}

/// Coordination efficiency over an already windowed set of events
pub fn efficiency_from_events(
    events: &[CoordinationEvent],
    now: DateTime<Utc>,
) -> CoordinationEfficiency {
    let mut event_types: BTreeMap<String, EventTypeStats> = BTreeMap::new();
    let mut agents = HashSet::new();
    let mut completed = 0usize;
    let mut completed_duration = 0.0;

    for event in events {
        let stats = event_types.entry(event.event_type.clone()).or_default();
        stats.count += 1;
        stats.total_duration_ms += event.duration_ms;
        if event.is_completed() {
            stats.completed += 1;
            completed += 1;
            completed_duration += event.duration_ms;
        }

        agents.insert(event.source_agent.as_str());
        if let Some(target) = event.target_agent.as_deref() {
            agents.insert(target);
        }
    }

    for stats in event_types.values_mut() {
        stats.avg_duration_ms = round_to(mean_or_zero(stats.total_duration_ms, stats.count), 2);
        stats.success_rate = if stats.count > 0 {
            round_to(stats.completed as f64 / stats.count as f64, 3)
        } else {
            1.0
        };
    }

    let (overall_success_rate, avg_duration, efficiency_score) = if events.is_empty() {
        (1.0, 0.0, 1.0)
    } else {
        let success = completed as f64 / events.len() as f64;
        let avg_duration = mean_or_zero(completed_duration, completed);
        let speed = (1.0 - avg_duration / COORDINATION_BASELINE_MS).clamp(0.0, 1.0);
        let score = success * EFFICIENCY_SUCCESS_WEIGHT + speed * EFFICIENCY_SPEED_WEIGHT;
        (success, avg_duration, score)
    };

    CoordinationEfficiency {
        timestamp: now,
        total_events: events.len(),
        completed_events: completed,
        overall_success_rate: round_to(overall_success_rate, 3),
        avg_coordination_time_ms: round_to(avg_duration, 2),
        efficiency_score: round_to(efficiency_score.clamp(0.0, 1.0), 3),
        event_types,
        agents_involved: agents.len(),
    }
}

impl From<&Agent> for CurrentMetrics {
    fn from(agent: &Agent) -> Self {
        Self {
            load: agent.metrics.current_load,
            response_time_ms: agent.metrics.average_response_time_ms,
            success_rate: agent.metrics.success_rate,
            health_score: agent.health_score,
            requests_processed: agent.metrics.requests_processed,
            error_count: agent.metrics.error_count,
        }
    }
}
