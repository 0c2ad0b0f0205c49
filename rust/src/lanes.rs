//! Lane assignment for the Gantt view and bounded manual start adjustments.

use chrono::NaiveDate;
use std::fmt;
use thiserror::Error;

use crate::models::{Project, Time};
use crate::timing::{analyze, ActivityTiming, TimingError, TimingResult};
use crate::{log_changes, log_checks};

/// Lane reserved for the critical path.
pub const CRITICAL_LANE: usize = 0;

/// Error types for manual start-time adjustments.
///
/// None of these leave the project modified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdjustError {
    #[error(transparent)]
    Timing(#[from] TimingError),
    #[error("Invalid activity name: '{0}'")]
    UnknownActivity(String),
    #[error("Activity '{0}' is either on the critical path or has no free float")]
    NoFloat(String),
    #[error("New start time {requested} for '{activity}' exceeds the free float (latest allowed start is {latest})")]
    FloatExceeded {
        activity: String,
        requested: Time,
        latest: Time,
    },
    #[error("New start time {requested} for '{activity}' is before its earliest start {earliest}")]
    BeforeEarliestStart {
        activity: String,
        requested: Time,
        earliest: Time,
    },
}

/// Confirmation of a recorded start-time override.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StartAdjustment {
    pub activity: String,
    pub start: Time,
}

impl fmt::Display for StartAdjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "New start time for '{}' is set to {}", self.activity, self.start)
    }
}

/// One bar of the Gantt view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GanttRow {
    pub activity: String,
    pub lane: usize,
    /// Override if present, else the earliest start.
    pub start: Time,
    pub duration: u32,
    /// Room to draw a float bar after the activity.
    pub total_float: Time,
    pub critical: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl GanttRow {
    pub fn finish(&self) -> Time {
        self.start + Time::from(self.duration)
    }
}

/// Lane layout of the whole project.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LaneSchedule {
    /// Critical rows first (topological order), then non-critical rows in
    /// placement order. Bars sharing a non-critical lane never overlap at
    /// their effective times.
    pub rows: Vec<GanttRow>,
    /// Number of lanes including the critical lane.
    pub lane_count: usize,
}

impl LaneSchedule {
    pub fn row(&self, activity: &str) -> Option<&GanttRow> {
        self.rows.iter().find(|r| r.activity == activity)
    }

    pub fn lane(&self, lane: usize) -> impl Iterator<Item = &GanttRow> {
        self.rows.iter().filter(move |r| r.lane == lane)
    }
}

/// Effective start of an activity: its override if present, else its earliest start.
pub fn effective_start(project: &Project, timing: &TimingResult, name: &str) -> Option<Time> {
    project
        .adjusted_start(name)
        .or_else(|| timing.get(name).map(|t| t.earliest_start))
}

/// Place non-critical activities into lanes, greedily.
///
/// Candidates are taken by effective start (ties by name) and go into the
/// first lane whose last bar finishes no later than the candidate's effective
/// start; otherwise a new lane opens. Resource ceilings are not considered.
pub fn assign_lanes(project: &Project, timing: &TimingResult) -> LaneSchedule {
    let verbosity = project.config().verbosity;
    let mut rows = Vec::with_capacity(timing.order().len());

    for (name, t) in timing.iter().filter(|(_, t)| t.is_critical()) {
        rows.push(make_row(project, timing, name, t, CRITICAL_LANE));
    }

    let mut candidates: Vec<(&str, &ActivityTiming, Time)> = timing
        .iter()
        .filter(|(_, t)| !t.is_critical())
        .map(|(name, t)| {
            let start = effective_start(project, timing, name).unwrap_or(t.earliest_start);
            (name, t, start)
        })
        .collect();
    candidates.sort_by(|(a_name, _, a_start), (b_name, _, b_start)| {
        a_start.cmp(b_start).then_with(|| a_name.cmp(b_name))
    });

    // Last finish per non-critical lane; lane number is index + 1
    let mut lane_finishes: Vec<Time> = Vec::new();
    for (name, t, start) in candidates {
        let lane_idx = match lane_finishes.iter().position(|&finish| finish <= start) {
            Some(idx) => idx,
            None => {
                lane_finishes.push(start);
                lane_finishes.len() - 1
            }
        };
        lane_finishes[lane_idx] = start + (t.earliest_finish - t.earliest_start);
        log_checks!(verbosity, "Placed {} in lane {}", name, lane_idx + 1);
        rows.push(make_row(project, timing, name, t, lane_idx + 1));
    }

    LaneSchedule {
        rows,
        lane_count: lane_finishes.len() + 1,
    }
}

fn make_row(
    project: &Project,
    timing: &TimingResult,
    name: &str,
    t: &ActivityTiming,
    lane: usize,
) -> GanttRow {
    let start = effective_start(project, timing, name).unwrap_or(t.earliest_start);
    let duration = (t.earliest_finish - t.earliest_start) as u32;
    let config = project.config();
    GanttRow {
        activity: name.to_string(),
        lane,
        start,
        duration,
        total_float: t.total_float,
        critical: t.is_critical(),
        start_date: config.date_at(start),
        end_date: config.date_at(start + Time::from(duration)),
    }
}

/// Move a non-critical activity's start within its free float.
///
/// Only the override map changes; computed earliest/latest times do not.
pub fn adjust_start(
    project: &mut Project,
    name: &str,
    new_start: Time,
) -> Result<StartAdjustment, AdjustError> {
    if project.activity(name).is_none() {
        return Err(AdjustError::UnknownActivity(name.to_string()));
    }

    let timing = analyze(project)?;
    let t = timing
        .get(name)
        .ok_or_else(|| AdjustError::UnknownActivity(name.to_string()))?;

    if t.free_float <= 0 {
        return Err(AdjustError::NoFloat(name.to_string()));
    }

    let latest = t.earliest_start + t.free_float;
    if new_start > latest {
        return Err(AdjustError::FloatExceeded {
            activity: name.to_string(),
            requested: new_start,
            latest,
        });
    }
    if new_start < t.earliest_start {
        return Err(AdjustError::BeforeEarliestStart {
            activity: name.to_string(),
            requested: new_start,
            earliest: t.earliest_start,
        });
    }

    project.set_adjusted_start(name, new_start);
    log_changes!(
        project.config().verbosity,
        "Adjusted start of {} to {} (earliest {}, free float {})",
        name,
        new_start,
        t.earliest_start,
        t.free_float
    );

    Ok(StartAdjustment {
        activity: name.to_string(),
        start: new_start,
    })
}

/// Drop overrides that no longer fit `timing`: the activity is gone, has lost
/// its free float, or the override falls outside `[ES, ES + free float]`.
///
/// Returns the cleared activity names in name order.
pub fn revalidate_adjustments(project: &mut Project, timing: &TimingResult) -> Vec<String> {
    let mut stale: Vec<String> = project
        .adjusted_starts()
        .iter()
        .filter(|&(name, &start)| match timing.get(name) {
            Some(t) => {
                t.free_float <= 0
                    || start < t.earliest_start
                    || start > t.earliest_start + t.free_float
            }
            None => true,
        })
        .map(|(name, _)| name.clone())
        .collect();
    stale.sort_unstable();

    let verbosity = project.config().verbosity;
    for name in &stale {
        if let Some(start) = project.clear_adjustment(name) {
            log_changes!(verbosity, "Cleared start override {} of {}", start, name);
        }
    }
    stale
}
