//! Fleetwatch - Fleet Telemetry and Coordination-Graph Engine
//!
//! Tracks the live state of a fleet of cooperating worker agents and derives
//! fleet-wide analytics from it:
//! - Agent registry with per-agent exclusive cells
//! - Rolling latency / success / load aggregation with a composite health score
//! - Bounded coordination event log with per-transaction workflow graphs
//! - Dashboard summary, workload balance and coordination efficiency views
//!
//! # Architecture
//!
//! - **Types**: Stable serializable records (Agent, AgentMetrics, CoordinationEvent)
//! - **Registry**: Agent membership, status and configuration
//! - **Metrics**: Sample aggregation and bounded per-agent history
//! - **Coordination**: Event log, filtering and workflow reconstruction
//! - **Analytics**: Stateless snapshot-then-compute fleet views
//! - **Engine**: Facade owning all of the above
//!
//! # Example
//!
//! ```ignore
//! use fleetwatch_core::{FleetConfig, FleetEngine, MetricsUpdate, NewCoordinationEvent};
//!
//! let engine = FleetEngine::from_config(&FleetConfig::default())?;
//!
//! let health = engine.update_metrics(
//!     "risk_assessor_001",
//!     MetricsUpdate::new().requests(1).response_time_ms(120.0).success(true).load(0.3),
//! )?;
//!
//! engine.log_event(
//!     NewCoordinationEvent::new("request", "orchestrator_001")
//!         .target("risk_assessor_001")
//!         .transaction("txn-42")
//!         .duration_ms(35.0),
//! )?;
//!
//! let summary = engine.dashboard_summary()?;
//! let graph = engine.workflow("txn-42")?;
//! ```

pub mod analytics;
pub mod config;
pub mod coordination;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod types;

// Re-export commonly used types
pub use analytics::{
    CoordinationEfficiency, DashboardSummary, FleetAnalytics, FleetLoadView, PerformanceTrend,
    WorkloadDistribution,
};
pub use config::{AnalyticsSettings, EngineSettings, FleetConfig};
pub use coordination::{CoordinationEventLog, EventFilter, WorkflowEdge, WorkflowGraph};
pub use engine::FleetEngine;
pub use error::{FleetError, Result};
pub use metrics::{CircularBuffer, MetricsAggregator};
pub use registry::{AgentRegistry, TransitionPolicy};
pub use types::{
    Agent, AgentConfiguration, AgentDescriptor, AgentMetrics, AgentStatus, AgentType,
    CoordinationEvent, MetricsUpdate, NewCoordinationEvent, PerformanceSnapshot, StatusChange,
};
