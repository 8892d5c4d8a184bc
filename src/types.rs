//! Core data types for the fleetwatch engine
//!
//! These records are the stable, serializable shapes exchanged with external
//! producers and dashboards: agents with their embedded metrics, per-agent
//! performance snapshots, and coordination events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::FleetError;

/// Agent configuration mapping (string -> arbitrary JSON value)
pub type AgentConfiguration = BTreeMap<String, serde_json::Value>;

/// Specialized agent role within the fleet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    TransactionAnalyzer,
    PatternDetector,
    RiskAssessor,
    Compliance,
    Orchestrator,
}

impl AgentType {
    pub const ALL: [AgentType; 5] = [
        AgentType::TransactionAnalyzer,
        AgentType::PatternDetector,
        AgentType::RiskAssessor,
        AgentType::Compliance,
        AgentType::Orchestrator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::TransactionAnalyzer => "transaction_analyzer",
            AgentType::PatternDetector => "pattern_detector",
            AgentType::RiskAssessor => "risk_assessor",
            AgentType::Compliance => "compliance",
            AgentType::Orchestrator => "orchestrator",
        }
    }
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentType {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| FleetError::InvalidInput(format!("unknown agent type: {}", s)))
    }
}

/// Reported operational status of an agent
///
/// Status is a relayed tag: producers report it, the engine stores it. Whether
/// a change is legal is decided by [`crate::registry::TransitionPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Starting,
    #[default]
    Active,
    Idle,
    Busy,
    Error,
    Stopping,
    Offline,
}

impl AgentStatus {
    pub const ALL: [AgentStatus; 7] = [
        AgentStatus::Starting,
        AgentStatus::Active,
        AgentStatus::Idle,
        AgentStatus::Busy,
        AgentStatus::Error,
        AgentStatus::Stopping,
        AgentStatus::Offline,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Starting => "starting",
            AgentStatus::Active => "active",
            AgentStatus::Idle => "idle",
            AgentStatus::Busy => "busy",
            AgentStatus::Error => "error",
            AgentStatus::Stopping => "stopping",
            AgentStatus::Offline => "offline",
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentStatus {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| FleetError::InvalidInput(format!("unknown agent status: {}", s)))
    }
}

/// Performance metrics embedded in every agent record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMetrics {
    pub agent_id: String,
    /// Cumulative processed request count
    pub requests_processed: u64,
    /// Rolling mean of reported response times
    pub average_response_time_ms: f64,
    /// `(requests - errors) / requests`, or 1.0 before any request
    pub success_rate: f64,
    /// Cumulative failed request count
    pub error_count: u64,
    /// Latest reported load gauge in [0, 1]
    pub current_load: f64,
    /// Seconds since registration, refreshed on each metrics update
    pub uptime_seconds: u64,
    pub last_activity: DateTime<Utc>,
    pub memory_usage_mb: f64,
    pub cpu_usage_percent: f64,
}

impl AgentMetrics {
    /// Fresh metrics for a newly registered agent
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            requests_processed: 0,
            average_response_time_ms: 0.0,
            success_rate: 1.0,
            error_count: 0,
            current_load: 0.0,
            uptime_seconds: 0,
            last_activity: Utc::now(),
            memory_usage_mb: 0.0,
            cpu_usage_percent: 0.0,
        }
    }
}

/// Complete agent record as exposed to readers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub agent_id: String,
    pub agent_name: String,
    pub agent_type: AgentType,
    pub status: AgentStatus,
    pub version: String,
    pub capabilities: Vec<String>,
    pub configuration: AgentConfiguration,
    pub metrics: AgentMetrics,
    /// Composite health in [0, 1]
    pub health_score: f64,
    pub last_heartbeat: DateTime<Utc>,
    pub registered_at: DateTime<Utc>,
}

/// Registration input for a new agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub agent_id: String,
    pub agent_name: String,
    pub agent_type: AgentType,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AgentStatus>,
    /// Initial configuration; the stock agent configuration when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<AgentConfiguration>,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

impl AgentDescriptor {
    pub fn new(
        agent_id: impl Into<String>,
        agent_name: impl Into<String>,
        agent_type: AgentType,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            agent_name: agent_name.into(),
            agent_type,
            version: default_version(),
            capabilities: Vec::new(),
            status: None,
            configuration: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_status(mut self, status: AgentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_configuration(mut self, configuration: AgentConfiguration) -> Self {
        self.configuration = Some(configuration);
        self
    }
}

/// Stock configuration given to agents registered without one
pub fn default_agent_configuration() -> AgentConfiguration {
    let mut configuration = AgentConfiguration::new();
    configuration.insert("max_concurrent_requests".to_string(), 10.into());
    configuration.insert("timeout_seconds".to_string(), 30.into());
    configuration.insert("retry_attempts".to_string(), 3.into());
    configuration
}

/// One performance sample pushed by a metrics reporter
///
/// Every field is optional; only the supplied ones are folded into the agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsUpdate {
    #[serde(default)]
    pub requests: Option<u64>,
    #[serde(default)]
    pub response_time_ms: Option<f64>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub load: Option<f64>,
    #[serde(default)]
    pub cpu_usage_percent: Option<f64>,
    #[serde(default)]
    pub memory_usage_mb: Option<f64>,
}

impl MetricsUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(mut self, count: u64) -> Self {
        self.requests = Some(count);
        self
    }

    pub fn response_time_ms(mut self, ms: f64) -> Self {
        self.response_time_ms = Some(ms);
        self
    }

    pub fn success(mut self, success: bool) -> Self {
        self.success = Some(success);
        self
    }

    pub fn load(mut self, load: f64) -> Self {
        self.load = Some(load);
        self
    }

    pub fn cpu_usage_percent(mut self, percent: f64) -> Self {
        self.cpu_usage_percent = Some(percent);
        self
    }

    pub fn memory_usage_mb(mut self, mb: f64) -> Self {
        self.memory_usage_mb = Some(mb);
        self
    }
}

/// Point-in-time health sample kept in the per-agent history ring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub timestamp: DateTime<Utc>,
    pub response_time: f64,
    pub success_rate: f64,
    pub load: f64,
    pub health_score: f64,
}

/// Result of a status update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub agent_id: String,
    pub previous: AgentStatus,
    pub status: AgentStatus,
    pub timestamp: DateTime<Utc>,
}

/// Well-known coordination event type tags
pub mod event_types {
    pub const REQUEST: &str = "request";
    pub const RESPONSE: &str = "response";
    pub const COORDINATION: &str = "coordination";
    pub const ESCALATION: &str = "escalation";
    pub const CONFIGURATION_CHANGE: &str = "configuration_change";
}

/// Well-known coordination event status tags
pub mod event_status {
    /// The only status counted as a success by coordination analytics
    pub const COMPLETED: &str = "completed";
    pub const PENDING: &str = "pending";
    pub const FAILED: &str = "failed";
    pub const TIMEOUT: &str = "timeout";
}

/// Recorded interaction between agents, optionally tied to a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinationEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub source_agent: String,
    pub target_agent: Option<String>,
    pub transaction_id: Option<String>,
    pub status: String,
    pub duration_ms: f64,
}

impl CoordinationEvent {
    /// Stamp a producer-supplied event with a fresh id and the current time
    pub fn from_new(new: NewCoordinationEvent) -> Self {
        Self::from_new_at(new, Utc::now())
    }

    pub fn from_new_at(new: NewCoordinationEvent, timestamp: DateTime<Utc>) -> Self {
        Self {
            event_id: format!("evt_{}", Uuid::new_v4().simple()),
            timestamp,
            event_type: new.event_type,
            source_agent: new.source_agent,
            target_agent: new.target_agent,
            transaction_id: new.transaction_id,
            status: new.status,
            duration_ms: new.duration_ms,
        }
    }

    /// Whether `agent_id` is the source or the target of this event
    pub fn involves(&self, agent_id: &str) -> bool {
        self.source_agent == agent_id || self.target_agent.as_deref() == Some(agent_id)
    }

    pub fn is_completed(&self) -> bool {
        self.status == event_status::COMPLETED
    }
}

/// Coordination event as pushed by a producer, before id and timestamp are assigned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCoordinationEvent {
    pub event_type: String,
    pub source_agent: String,
    #[serde(default)]
    pub target_agent: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default = "default_event_status")]
    pub status: String,
    #[serde(default)]
    pub duration_ms: f64,
}

fn default_event_status() -> String {
    event_status::COMPLETED.to_string()
}

impl NewCoordinationEvent {
    pub fn new(event_type: impl Into<String>, source_agent: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            source_agent: source_agent.into(),
            target_agent: None,
            transaction_id: None,
            status: default_event_status(),
            duration_ms: 0.0,
        }
    }

    pub fn target(mut self, agent_id: impl Into<String>) -> Self {
        self.target_agent = Some(agent_id.into());
        self
    }

    pub fn transaction(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}
