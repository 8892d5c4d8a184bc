//! Fleet engine facade
//!
//! Owns the registry, the metrics aggregator and the coordination log, and is
//! the single handle external producers and readers share (typically behind
//! an `Arc`). All methods take `&self`; synchronization lives in the
//! components.

use std::sync::Arc;
use tracing::info;

use crate::analytics::{
    CoordinationEfficiency, DashboardSummary, FleetAnalytics, FleetLoadView, PerformanceTrend,
    WorkloadDistribution,
};
use crate::config::{AnalyticsSettings, EngineSettings, FleetConfig};
use crate::coordination::{CoordinationEventLog, EventFilter, WorkflowGraph};
use crate::error::Result;
use crate::metrics::MetricsAggregator;
use crate::registry::AgentRegistry;
use crate::types::{
    event_status, event_types, Agent, AgentConfiguration, AgentDescriptor, AgentStatus,
    CoordinationEvent, MetricsUpdate, NewCoordinationEvent, PerformanceSnapshot, StatusChange,
};

/// Duration recorded for configuration-change events
const CONFIGURATION_CHANGE_DURATION_MS: f64 = 5.0;

pub struct FleetEngine {
    registry: Arc<AgentRegistry>,
    aggregator: MetricsAggregator,
    log: CoordinationEventLog,
    analytics: AnalyticsSettings,
}

impl Default for FleetEngine {
    fn default() -> Self {
        Self::new(EngineSettings::default(), AnalyticsSettings::default())
    }
}

impl FleetEngine {
    /// Empty engine with the given settings
    pub fn new(engine: EngineSettings, analytics: AnalyticsSettings) -> Self {
        let registry = Arc::new(AgentRegistry::new(
            engine.history_capacity,
            engine.transition_policy,
        ));
        Self {
            aggregator: MetricsAggregator::new(registry.clone()),
            registry,
            log: CoordinationEventLog::new(engine.event_log_capacity),
            analytics,
        }
    }

    /// Validate the config, build the engine and register its seed agents
    pub fn from_config(config: &FleetConfig) -> Result<Self> {
        config.validate()?;
        let engine = Self::new(config.engine.clone(), config.analytics.clone());
        for descriptor in &config.agents {
            engine.register_agent(descriptor.clone())?;
        }
        info!("Fleet engine ready with {} agents", config.agents.len());
        Ok(engine)
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn aggregator(&self) -> &MetricsAggregator {
        &self.aggregator
    }

    pub fn event_log(&self) -> &CoordinationEventLog {
        &self.log
    }

    pub fn analytics(&self) -> FleetAnalytics<'_> {
        FleetAnalytics::new(&self.registry, &self.log, &self.analytics)
    }

    // Producers

    pub fn register_agent(&self, descriptor: AgentDescriptor) -> Result<Agent> {
        self.registry.register(descriptor)
    }

    pub fn update_status(&self, agent_id: &str, status: AgentStatus) -> Result<StatusChange> {
        self.registry.update_status(agent_id, status)
    }

    pub fn update_metrics(&self, agent_id: &str, update: MetricsUpdate) -> Result<f64> {
        self.aggregator.update_metrics(agent_id, update)
    }

    /// Merge configuration entries and record the change in the coordination log
    pub fn update_configuration(
        &self,
        agent_id: &str,
        entries: AgentConfiguration,
    ) -> Result<AgentConfiguration> {
        let merged = self.registry.update_configuration(agent_id, entries)?;
        self.log.record(
            NewCoordinationEvent::new(event_types::CONFIGURATION_CHANGE, agent_id)
                .status(event_status::COMPLETED)
                .duration_ms(CONFIGURATION_CHANGE_DURATION_MS),
        )?;
        Ok(merged)
    }

    pub fn log_event(&self, event: NewCoordinationEvent) -> Result<CoordinationEvent> {
        self.log.record(event)
    }

    // Readers

    pub fn get_agent(&self, agent_id: &str) -> Result<Option<Agent>> {
        self.registry.get(agent_id)
    }

    pub fn list_agents(&self) -> Result<Vec<Agent>> {
        self.registry.list()
    }

    pub fn metrics_history(
        &self,
        agent_id: &str,
        limit: usize,
    ) -> Result<Vec<PerformanceSnapshot>> {
        self.aggregator.history(agent_id, limit)
    }

    pub fn coordination_events(
        &self,
        filter: &EventFilter,
        limit: usize,
    ) -> Result<Vec<CoordinationEvent>> {
        self.log.query(filter, limit)
    }

    pub fn workflow(&self, transaction_id: &str) -> Result<WorkflowGraph> {
        self.log.workflow(transaction_id)
    }

    pub fn dashboard_summary(&self) -> Result<DashboardSummary> {
        self.analytics().dashboard_summary()
    }

    pub fn workload_distribution(&self) -> Result<WorkloadDistribution> {
        self.analytics().workload_distribution()
    }

    pub fn coordination_efficiency(&self) -> Result<CoordinationEfficiency> {
        self.analytics().coordination_efficiency()
    }

    pub fn performance_trend(&self, agent_id: &str) -> Result<PerformanceTrend> {
        self.analytics().performance_trend(agent_id)
    }

    pub fn fleet_load_view(&self) -> Result<FleetLoadView> {
        self.analytics().fleet_load_view()
    }
}
