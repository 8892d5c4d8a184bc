//! Engine configuration
//!
//! TOML format, typically in `fleetwatch.toml`:
//!
//! ```toml
//! [engine]
//! history_capacity = 100
//! event_log_capacity = 1000
//! transition_policy = "permissive"
//!
//! [analytics]
//! summary_window_minutes = 5
//! efficiency_window_minutes = 10
//! trend_window = 50
//! healthy_threshold = 0.8
//!
//! [[agents]]
//! agent_id = "txn_analyzer_001"
//! agent_name = "Transaction Analyzer"
//! agent_type = "transaction_analyzer"
//! version = "1.2.0"
//! capabilities = ["real_time_processing", "velocity_detection"]
//! ```
//!
//! A missing `[[agents]]` list seeds the stock five-agent fleet; `agents = []`
//! starts empty.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::coordination::{DEFAULT_EVENT_LOG_CAPACITY, MAX_WINDOW_MINUTES};
use crate::error::{FleetError, Result};
use crate::metrics::DEFAULT_HISTORY_CAPACITY;
use crate::registry::TransitionPolicy;
use crate::types::{AgentDescriptor, AgentType};

/// Complete fleet configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetConfig {
    #[serde(default)]
    pub engine: EngineSettings,

    #[serde(default)]
    pub analytics: AnalyticsSettings,

    /// Agents registered when the engine is built from this config
    #[serde(default = "default_fleet")]
    pub agents: Vec<AgentDescriptor>,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            engine: EngineSettings::default(),
            analytics: AnalyticsSettings::default(),
            agents: default_fleet(),
        }
    }
}

/// Capacities and status handling for the stateful components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Snapshots kept per agent
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Coordination events kept fleet-wide
    #[serde(default = "default_event_log_capacity")]
    pub event_log_capacity: usize,

    #[serde(default)]
    pub transition_policy: TransitionPolicy,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            event_log_capacity: DEFAULT_EVENT_LOG_CAPACITY,
            transition_policy: TransitionPolicy::default(),
        }
    }
}

/// Windows and thresholds for derived fleet views
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSettings {
    /// Lookback for the dashboard's recent event count
    #[serde(default = "default_summary_window")]
    pub summary_window_minutes: i64,

    /// Lookback for coordination efficiency
    #[serde(default = "default_efficiency_window")]
    pub efficiency_window_minutes: i64,

    /// Snapshots considered by per-agent performance trends
    #[serde(default = "default_trend_window")]
    pub trend_window: usize,

    /// Minimum health score counted as healthy
    #[serde(default = "default_healthy_threshold")]
    pub healthy_threshold: f64,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            summary_window_minutes: default_summary_window(),
            efficiency_window_minutes: default_efficiency_window(),
            trend_window: default_trend_window(),
            healthy_threshold: default_healthy_threshold(),
        }
    }
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

fn default_event_log_capacity() -> usize {
    DEFAULT_EVENT_LOG_CAPACITY
}

fn default_summary_window() -> i64 {
    5
}

fn default_efficiency_window() -> i64 {
    10
}

fn default_trend_window() -> usize {
    50
}

fn default_healthy_threshold() -> f64 {
    0.8
}

/// Stock demonstration fleet: one agent of each type
pub fn default_fleet() -> Vec<AgentDescriptor> {
    vec![
        AgentDescriptor::new(
            "txn_analyzer_001",
            "Transaction Analyzer",
            AgentType::TransactionAnalyzer,
        )
        .with_version("1.2.0")
        .with_capabilities([
            "real_time_processing",
            "velocity_detection",
            "amount_analysis",
        ]),
        AgentDescriptor::new(
            "pattern_detector_001",
            "Pattern Detector",
            AgentType::PatternDetector,
        )
        .with_version("1.1.5")
        .with_capabilities([
            "anomaly_detection",
            "behavioral_analysis",
            "trend_prediction",
        ]),
        AgentDescriptor::new("risk_assessor_001", "Risk Assessor", AgentType::RiskAssessor)
            .with_version("1.3.2")
            .with_capabilities([
                "multi_factor_scoring",
                "geographic_analysis",
                "temporal_analysis",
            ]),
        AgentDescriptor::new("compliance_001", "Compliance Agent", AgentType::Compliance)
            .with_version("1.0.0")
            .with_capabilities([
                "regulatory_checking",
                "audit_trail",
                "policy_enforcement",
            ]),
        AgentDescriptor::new(
            "orchestrator_001",
            "Agent Orchestrator",
            AgentType::Orchestrator,
        )
        .with_version("2.0.1")
        .with_capabilities([
            "coordination",
            "decision_aggregation",
            "workflow_management",
        ]),
    ]
}

impl FleetConfig {
    /// Configuration with no seeded agents
    pub fn empty_fleet() -> Self {
        Self {
            agents: Vec::new(),
            ..Self::default()
        }
    }

    /// Load configuration from file, falling back to defaults when it is absent
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("Config file not found, using defaults: {:?}", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            FleetError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config file: {}", e),
            ))
        })?;

        let config: FleetConfig = toml::from_str(&content)?;
        config.validate()?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                FleetError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to create config directory: {}", e),
                ))
            })?;
        }

        std::fs::write(path, content).map_err(|e| {
            FleetError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write config file: {}", e),
            ))
        })?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.engine.history_capacity == 0 {
            return Err(FleetError::Config(
                "engine.history_capacity must be at least 1".to_string(),
            ));
        }
        if self.engine.event_log_capacity == 0 {
            return Err(FleetError::Config(
                "engine.event_log_capacity must be at least 1".to_string(),
            ));
        }
        if self.analytics.summary_window_minutes <= 0
            || self.analytics.efficiency_window_minutes <= 0
        {
            return Err(FleetError::Config(
                "analytics windows must be positive".to_string(),
            ));
        }
        if self.analytics.summary_window_minutes > MAX_WINDOW_MINUTES
            || self.analytics.efficiency_window_minutes > MAX_WINDOW_MINUTES
        {
            return Err(FleetError::Config(format!(
                "analytics windows must be at most {} minutes",
                MAX_WINDOW_MINUTES
            )));
        }
        if self.analytics.trend_window == 0 {
            return Err(FleetError::Config(
                "analytics.trend_window must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.analytics.healthy_threshold) {
            return Err(FleetError::Config(
                "analytics.healthy_threshold must be within [0, 1]".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for agent in &self.agents {
            if !seen.insert(agent.agent_id.as_str()) {
                return Err(FleetError::Config(format!(
                    "duplicate agent id in config: {}",
                    agent.agent_id
                )));
            }
        }

        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        PathBuf::from("fleetwatch.toml")
    }
}
