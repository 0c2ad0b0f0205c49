//! Timing analysis: forward and backward passes, floats, and the critical path.

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::log_debug;
use crate::models::{Project, Time};
use crate::network::{ActivityId, ActivityNetwork, NetworkError};

/// Error types for timing analysis.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimingError {
    #[error(transparent)]
    Network(#[from] NetworkError),
    /// The network was built from a different project state.
    #[error("Activity '{0}' is in the network but not in the project")]
    StaleNetwork(String),
    #[error("Deadline for '{activity}' cannot be met: total float is {total_float}")]
    InfeasibleDeadline { activity: String, total_float: Time },
}

/// Per-activity timing from the forward and backward passes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActivityTiming {
    pub earliest_start: Time,
    pub earliest_finish: Time,
    pub latest_start: Time,
    pub latest_finish: Time,
    /// latest_finish - earliest_finish. Negative when a deadline cannot be met.
    pub total_float: Time,
    /// Slack before any immediate successor's earliest start moves, capped
    /// at the total float.
    pub free_float: Time,
}

impl ActivityTiming {
    pub fn is_critical(&self) -> bool {
        self.earliest_start == self.latest_start
    }

    pub fn is_infeasible(&self) -> bool {
        self.total_float < 0
    }
}

/// Snapshot of the project schedule. Recompute it after any mutation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimingResult {
    timings: FxHashMap<String, ActivityTiming>,
    order: Vec<String>,
    critical_path: Vec<String>,
    project_finish: Time,
}

impl TimingResult {
    pub fn get(&self, name: &str) -> Option<&ActivityTiming> {
        self.timings.get(name)
    }

    pub fn timings(&self) -> &FxHashMap<String, ActivityTiming> {
        &self.timings
    }

    /// Activity names in topological order.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// `(name, timing)` pairs in topological order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ActivityTiming)> {
        self.order
            .iter()
            .filter_map(|name| self.timings.get(name).map(|t| (name.as_str(), t)))
    }

    /// Zero-float activities in topological order. Parallel critical chains
    /// are interleaved as they appear in that order.
    pub fn critical_path(&self) -> &[String] {
        &self.critical_path
    }

    /// Critical path joined as `"A -> C"`.
    pub fn critical_path_display(&self) -> String {
        self.critical_path.join(" -> ")
    }

    pub fn is_critical(&self, name: &str) -> bool {
        self.timings.get(name).is_some_and(ActivityTiming::is_critical)
    }

    /// Overall project finish: the largest earliest finish.
    pub fn project_finish(&self) -> Time {
        self.project_finish
    }

    /// Activities with negative total float, in topological order.
    pub fn infeasible(&self) -> Vec<(&str, Time)> {
        self.iter()
            .filter(|(_, t)| t.is_infeasible())
            .map(|(name, t)| (name, t.total_float))
            .collect()
    }

    /// Fail on the first activity whose deadline cannot be met.
    pub fn ensure_feasible(&self) -> Result<(), TimingError> {
        match self.infeasible().first() {
            Some(&(activity, total_float)) => Err(TimingError::InfeasibleDeadline {
                activity: activity.to_string(),
                total_float,
            }),
            None => Ok(()),
        }
    }
}

/// Build the network and analyze the project.
pub fn analyze(project: &Project) -> Result<TimingResult, TimingError> {
    let network = ActivityNetwork::build(project)?;
    analyze_network(&network, project)
}

/// Analyze a project against an already built network.
///
/// The network must come from this project's current dependency relation;
/// durations and deadlines are read fresh from the project.
pub fn analyze_network(
    network: &ActivityNetwork,
    project: &Project,
) -> Result<TimingResult, TimingError> {
    let verbosity = project.config().verbosity;
    let n = network.len();

    let mut durations: Vec<Time> = Vec::with_capacity(n);
    let mut deadlines: Vec<Option<Time>> = Vec::with_capacity(n);
    for id in 0..n as ActivityId {
        let name = network.name(id);
        let activity = project
            .activity(name)
            .ok_or_else(|| TimingError::StaleNetwork(name.to_string()))?;
        durations.push(Time::from(activity.duration()));
        deadlines.push(activity.deadline());
    }

    // Forward pass
    let mut earliest_start = vec![0; n];
    let mut earliest_finish = vec![0; n];
    for &id in network.topological_order() {
        let idx = id as usize;
        earliest_start[idx] = network
            .predecessors(id)
            .iter()
            .map(|&p| earliest_finish[p as usize])
            .max()
            .unwrap_or(0);
        earliest_finish[idx] = earliest_start[idx] + durations[idx];
    }

    let project_finish = earliest_finish.iter().copied().max().unwrap_or(0);
    log_debug!(verbosity, "Forward pass done: project finish {}", project_finish);

    // Backward pass
    let mut latest_start = vec![0; n];
    let mut latest_finish = vec![0; n];
    for &id in network.topological_order().iter().rev() {
        let idx = id as usize;
        let mut finish = network
            .successors(id)
            .iter()
            .map(|&s| latest_start[s as usize])
            .min()
            .unwrap_or(project_finish);
        if let Some(deadline) = deadlines[idx] {
            finish = finish.min(deadline);
        }
        latest_finish[idx] = finish;
        latest_start[idx] = finish - durations[idx];
    }

    let mut timings = FxHashMap::with_capacity_and_hasher(n, Default::default());
    let mut order = Vec::with_capacity(n);
    let mut critical_path = Vec::new();

    for &id in network.topological_order() {
        let idx = id as usize;
        let total_float = latest_finish[idx] - earliest_finish[idx];
        // A deadline can make total float the tighter bound; free float never exceeds it
        let free_float = network
            .successors(id)
            .iter()
            .map(|&s| earliest_start[s as usize] - earliest_finish[idx])
            .min()
            .map_or(total_float, |slack| slack.min(total_float));

        let timing = ActivityTiming {
            earliest_start: earliest_start[idx],
            earliest_finish: earliest_finish[idx],
            latest_start: latest_start[idx],
            latest_finish: latest_finish[idx],
            total_float,
            free_float,
        };
        log_debug!(verbosity, "  {}: {:?}", network.name(id), timing);

        let name = network.name(id).to_string();
        if timing.is_critical() {
            critical_path.push(name.clone());
        }
        order.push(name.clone());
        timings.insert(name, timing);
    }

    Ok(TimingResult {
        timings,
        order,
        critical_path,
        project_finish,
    })
}
