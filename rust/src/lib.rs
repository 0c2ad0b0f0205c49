//! Deterministic project scheduling: critical path timing, float-bounded
//! start adjustments, budgeted activity crashing, and cost/cash-flow curves.
//!
//! Every analysis takes an explicit [`Project`] handle. Analyses are pure
//! functions of the project; only [`adjust_start`], [`crash`] and the
//! project's own edit methods mutate it.

pub mod config;
pub mod cost;
pub mod crashing;
pub mod diagram;
pub mod lanes;
pub mod logging;
pub mod models;
pub mod network;
pub mod timing;

#[cfg(feature = "python")]
mod python;

pub use config::EngineConfig;
pub use cost::{
    cash_flow, cash_flow_with, resource_profile, resource_profile_with, CashFlowReport, CostError,
    CostWarning, ResourceProfile, ResourceWarning,
};
pub use crashing::{
    crash, crash_activity, crash_within_budget, CrashError, CrashOutcome, CrashStep, SingleCrash,
};
pub use diagram::{arrow_diagram, node_edges, Arrow, ArrowDiagram, EventId};
pub use lanes::{
    adjust_start, assign_lanes, effective_start, revalidate_adjustments, AdjustError, GanttRow,
    LaneSchedule, StartAdjustment, CRITICAL_LANE,
};
pub use models::{Activity, ActivityRecord, Project, ProjectError, Time};
pub use network::{ActivityId, ActivityNetwork, NetworkError};
pub use timing::{analyze, analyze_network, ActivityTiming, TimingError, TimingResult};
