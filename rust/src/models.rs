//! Core data types: activities, their input records, and the project that owns them.

use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::config::EngineConfig;

/// A point on the project timeline, in whole time units from project start.
///
/// Signed so that infeasible deadlines can produce negative latest times.
pub type Time = i64;

/// Errors raised while populating a project.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectError {
    #[error("Activity '{0}' is defined more than once")]
    DuplicateActivity(String),
    #[error("Activity '{activity}' has crash duration {crash_duration} above its duration {duration}")]
    InvalidCrashDuration {
        activity: String,
        duration: u32,
        crash_duration: u32,
    },
    #[error("Activity '{activity}' has invalid crash cost per day {cost}")]
    InvalidCrashCost { activity: String, cost: f64 },
}

/// One activity as supplied by the ingestion layer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActivityRecord {
    pub name: String,
    pub duration: u32,
    /// Resource name -> quantity consumed per time unit while active.
    pub resources: BTreeMap<String, u32>,
    pub predecessors: Vec<String>,
    /// Resource name -> cost per unit. Resources missing here have no known cost.
    pub resource_unit_cost: FxHashMap<String, f64>,
    pub crash_duration: u32,
    pub crash_cost_per_day: f64,
    pub deadline: Option<Time>,
}

impl ActivityRecord {
    /// A record with no resources, predecessors, or crash room.
    pub fn new(name: impl Into<String>, duration: u32) -> Self {
        Self {
            name: name.into(),
            duration,
            crash_duration: duration,
            ..Default::default()
        }
    }

    pub fn with_predecessors<I, S>(mut self, predecessors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.predecessors = predecessors.into_iter().map(Into::into).collect();
        self
    }

    /// Add a resource requirement with an optional unit cost.
    pub fn with_resource(mut self, resource: &str, quantity: u32, unit_cost: Option<f64>) -> Self {
        self.resources.insert(resource.to_string(), quantity);
        if let Some(cost) = unit_cost {
            self.resource_unit_cost.insert(resource.to_string(), cost);
        }
        self
    }

    pub fn with_crash(mut self, crash_duration: u32, crash_cost_per_day: f64) -> Self {
        self.crash_duration = crash_duration;
        self.crash_cost_per_day = crash_cost_per_day;
        self
    }

    pub fn with_deadline(mut self, deadline: Time) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// An activity in the project network.
///
/// Only `duration` changes after creation, and only through crashing.
#[derive(Clone, Debug, PartialEq)]
pub struct Activity {
    name: String,
    duration: u32,
    resources: BTreeMap<String, u32>,
    resource_unit_cost: FxHashMap<String, f64>,
    predecessors: BTreeSet<String>,
    crash_duration: u32,
    crash_cost_per_day: f64,
    deadline: Option<Time>,
}

impl Activity {
    fn from_record(record: ActivityRecord) -> Result<Self, ProjectError> {
        if record.crash_duration > record.duration {
            return Err(ProjectError::InvalidCrashDuration {
                activity: record.name,
                duration: record.duration,
                crash_duration: record.crash_duration,
            });
        }
        let cost = record.crash_cost_per_day;
        if !cost.is_finite() || cost < 0.0 {
            return Err(ProjectError::InvalidCrashCost {
                activity: record.name,
                cost,
            });
        }
        Ok(Self {
            name: record.name,
            duration: record.duration,
            resources: record.resources,
            resource_unit_cost: record.resource_unit_cost,
            predecessors: record.predecessors.into_iter().collect(),
            crash_duration: record.crash_duration,
            crash_cost_per_day: record.crash_cost_per_day,
            deadline: record.deadline,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    pub fn resources(&self) -> &BTreeMap<String, u32> {
        &self.resources
    }

    /// Sum of all resource quantities consumed per time unit.
    pub fn resource_load(&self) -> u32 {
        self.resources.values().sum()
    }

    /// Unit cost of a resource, or `None` if the input never gave one.
    pub fn unit_cost(&self, resource: &str) -> Option<f64> {
        self.resource_unit_cost.get(resource).copied()
    }

    /// Resources this activity consumes that have no unit cost.
    pub fn resources_missing_cost(&self) -> impl Iterator<Item = &str> {
        self.resources
            .keys()
            .filter(|r| !self.resource_unit_cost.contains_key(r.as_str()))
            .map(|r| r.as_str())
    }

    /// Total cost: sum of quantity * unit cost, counting unknown unit costs as zero.
    pub fn total_cost(&self) -> f64 {
        self.resources
            .iter()
            .map(|(resource, &qty)| f64::from(qty) * self.unit_cost(resource).unwrap_or(0.0))
            .sum()
    }

    pub fn predecessors(&self) -> &BTreeSet<String> {
        &self.predecessors
    }

    pub fn crash_duration(&self) -> u32 {
        self.crash_duration
    }

    pub fn crash_cost_per_day(&self) -> f64 {
        self.crash_cost_per_day
    }

    /// Time units that can still be removed by crashing.
    pub fn crash_room(&self) -> u32 {
        self.duration.saturating_sub(self.crash_duration)
    }

    /// Cost of crashing this activity all the way to its crash duration.
    pub fn full_crash_cost(&self) -> f64 {
        self.crash_cost_per_day * f64::from(self.crash_room())
    }

    pub fn deadline(&self) -> Option<Time> {
        self.deadline
    }

    pub(crate) fn set_duration(&mut self, duration: u32) {
        self.duration = duration;
    }
}

/// The project: activities, their dependencies, and user overlays.
///
/// This is the single unit of mutation. Callers that share a project across
/// threads must serialize access to it (e.g. behind a `Mutex`).
#[derive(Clone, Debug, Default)]
pub struct Project {
    activities: FxHashMap<String, Activity>,
    adjusted_starts: FxHashMap<String, Time>,
    cash_injections: BTreeMap<Time, f64>,
    config: EngineConfig,
}

impl Project {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Build a project from a sequence of records.
    pub fn from_records<I>(config: EngineConfig, records: I) -> Result<Self, ProjectError>
    where
        I: IntoIterator<Item = ActivityRecord>,
    {
        let mut project = Self::new(config);
        for record in records {
            project.add_activity(record)?;
        }
        Ok(project)
    }

    pub fn add_activity(&mut self, record: ActivityRecord) -> Result<(), ProjectError> {
        if self.activities.contains_key(&record.name) {
            return Err(ProjectError::DuplicateActivity(record.name));
        }
        let activity = Activity::from_record(record)?;
        self.activities.insert(activity.name.clone(), activity);
        Ok(())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: EngineConfig) {
        self.config = config;
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    pub fn activity(&self, name: &str) -> Option<&Activity> {
        self.activities.get(name)
    }

    pub(crate) fn activity_mut(&mut self, name: &str) -> Option<&mut Activity> {
        self.activities.get_mut(name)
    }

    /// Activity names in ascending order.
    pub fn activity_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.activities.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn activities(&self) -> impl Iterator<Item = &Activity> {
        self.activities.values()
    }

    /// Manually adjusted start time of an activity, if one was recorded.
    pub fn adjusted_start(&self, name: &str) -> Option<Time> {
        self.adjusted_starts.get(name).copied()
    }

    pub fn adjusted_starts(&self) -> &FxHashMap<String, Time> {
        &self.adjusted_starts
    }

    pub(crate) fn set_adjusted_start(&mut self, name: &str, start: Time) {
        self.adjusted_starts.insert(name.to_string(), start);
    }

    /// Drop the override for one activity. Returns the removed start time.
    pub fn clear_adjustment(&mut self, name: &str) -> Option<Time> {
        self.adjusted_starts.remove(name)
    }

    pub fn clear_adjustments(&mut self) {
        self.adjusted_starts.clear();
    }

    pub fn cash_injections(&self) -> &BTreeMap<Time, f64> {
        &self.cash_injections
    }

    /// Add or replace the cash injection at `time`. Returns the replaced amount.
    pub fn set_cash_injection(&mut self, time: Time, amount: f64) -> Option<f64> {
        self.cash_injections.insert(time, amount)
    }

    pub fn remove_cash_injection(&mut self, time: Time) -> Option<f64> {
        self.cash_injections.remove(&time)
    }

    pub fn clear_cash_injections(&mut self) {
        self.cash_injections.clear();
    }

    /// Replace every cash injection with the given set.
    pub fn replace_cash_injections<I>(&mut self, injections: I)
    where
        I: IntoIterator<Item = (Time, f64)>,
    {
        self.cash_injections.clear();
        self.cash_injections.extend(injections);
    }
}
