//! Greedy time-cost tradeoff: crash the cheapest activities within a budget.

use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::lanes::revalidate_adjustments;
use crate::models::Project;
use crate::network::ActivityNetwork;
use crate::timing::{analyze_network, TimingError, TimingResult};
use crate::{log_changes, log_checks, log_debug};

/// Errors that can occur while crashing.
///
/// Running out of budget is not an error; it ends the optimizer normally.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CrashError {
    #[error(transparent)]
    Timing(#[from] TimingError),
    #[error("Activity '{0}' not found")]
    UnknownActivity(String),
    #[error("Invalid budget {0}: must be a positive number")]
    InvalidBudget(f64),
}

/// Result of crashing a single activity by hand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SingleCrash {
    Crashed { from: u32, to: u32 },
    AlreadyAtMinimum { duration: u32 },
}

/// One crash applied by the optimizer.
#[derive(Clone, Debug, PartialEq)]
pub struct CrashStep {
    pub activity: String,
    pub from: u32,
    pub to: u32,
    pub cost: f64,
    /// Budget left after this step.
    pub remaining_budget: f64,
}

/// Final state of a crash run.
#[derive(Clone, Debug, PartialEq)]
pub struct CrashOutcome {
    /// Timing after the last crash (or the initial timing if none applied).
    pub timing: TimingResult,
    pub steps: Vec<CrashStep>,
    pub remaining_budget: f64,
    /// Start overrides dropped because the new timing no longer allows them.
    pub cleared_adjustments: Vec<String>,
}

impl CrashOutcome {
    pub fn critical_path(&self) -> &[String] {
        self.timing.critical_path()
    }

    pub fn total_spent(&self) -> f64 {
        self.steps.iter().map(|s| s.cost).sum()
    }
}

/// Optimizer phases.
#[derive(Debug)]
enum Phase {
    Evaluate,
    SelectCandidate,
    Crash(Candidate),
    Recompute,
    Stop,
}

#[derive(Debug)]
struct Candidate {
    name: String,
    cost: f64,
}

/// Crash one activity to its crash duration, regardless of cost.
///
/// Start overrides invalidated by the shorter duration are cleared.
pub fn crash_activity(project: &mut Project, name: &str) -> Result<SingleCrash, CrashError> {
    if project.activity(name).is_none() {
        return Err(CrashError::UnknownActivity(name.to_string()));
    }
    let network = ActivityNetwork::build(project).map_err(TimingError::from)?;

    let outcome = apply_crash(project, name)?;
    if let SingleCrash::Crashed { .. } = outcome {
        let timing = analyze_network(&network, project)?;
        revalidate_adjustments(project, &timing);
    }
    Ok(outcome)
}

fn apply_crash(project: &mut Project, name: &str) -> Result<SingleCrash, CrashError> {
    let verbosity = project.config().verbosity;
    let activity = project
        .activity_mut(name)
        .ok_or_else(|| CrashError::UnknownActivity(name.to_string()))?;

    let from = activity.duration();
    let to = activity.crash_duration();
    if to >= from {
        log_checks!(verbosity, "{} already at its minimum duration {}", name, from);
        return Ok(SingleCrash::AlreadyAtMinimum { duration: from });
    }

    activity.set_duration(to);
    log_changes!(verbosity, "Crashed {} from {} to {}", name, from, to);
    Ok(SingleCrash::Crashed { from, to })
}

/// Validate a user-supplied budget and run the optimizer.
pub fn crash(project: &mut Project, budget: f64) -> Result<CrashOutcome, CrashError> {
    if !budget.is_finite() || budget <= 0.0 {
        return Err(CrashError::InvalidBudget(budget));
    }
    crash_within_budget(project, budget)
}

/// Repeatedly crash the cheapest-per-day affordable activity until none remains.
///
/// Each activity is crashed at most once, fully to its crash duration. The
/// candidate need not be on the current critical path. Stops as soon as the
/// budget is spent, even if some crash would cost nothing. The only errors
/// come from timing analysis of an invalid network.
pub fn crash_within_budget(project: &mut Project, budget: f64) -> Result<CrashOutcome, CrashError> {
    let verbosity = project.config().verbosity;
    let network = ActivityNetwork::build(project).map_err(TimingError::from)?;

    let mut timing = TimingResult::default();
    let mut crashed: FxHashSet<String> = FxHashSet::default();
    let mut steps = Vec::new();
    let mut remaining = budget;
    let mut phase = Phase::Evaluate;

    loop {
        phase = match phase {
            Phase::Evaluate => {
                timing = analyze_network(&network, project)?;
                log_debug!(
                    verbosity,
                    "Crash start: finish {}, path {}, budget {:.2}",
                    timing.project_finish(),
                    timing.critical_path_display(),
                    remaining
                );
                Phase::SelectCandidate
            }
            Phase::SelectCandidate => match select_candidate(project, &crashed, remaining) {
                Some(candidate) => Phase::Crash(candidate),
                None => Phase::Stop,
            },
            Phase::Crash(candidate) => {
                let outcome = apply_crash(project, &candidate.name)?;
                if let SingleCrash::Crashed { from, to } = outcome {
                    remaining -= candidate.cost;
                    steps.push(CrashStep {
                        activity: candidate.name.clone(),
                        from,
                        to,
                        cost: candidate.cost,
                        remaining_budget: remaining,
                    });
                }
                crashed.insert(candidate.name);
                Phase::Recompute
            }
            Phase::Recompute => {
                timing = analyze_network(&network, project)?;
                log_changes!(
                    verbosity,
                    "  Finish now {}, critical path {}, budget left {:.2}",
                    timing.project_finish(),
                    timing.critical_path_display(),
                    remaining
                );
                Phase::SelectCandidate
            }
            Phase::Stop => break,
        };
    }

    let cleared_adjustments = if steps.is_empty() {
        Vec::new()
    } else {
        revalidate_adjustments(project, &timing)
    };
    log_changes!(
        verbosity,
        "Crashing done after {} steps, remaining budget {:.2}",
        steps.len(),
        remaining
    );

    Ok(CrashOutcome {
        timing,
        steps,
        remaining_budget: remaining,
        cleared_adjustments,
    })
}

/// Cheapest per-day eligible activity, ties broken by name.
fn select_candidate(
    project: &Project,
    crashed: &FxHashSet<String>,
    remaining: f64,
) -> Option<Candidate> {
    let verbosity = project.config().verbosity;
    if remaining <= 0.0 {
        log_checks!(verbosity, "    Budget spent ({:.2}), stopping", remaining);
        return None;
    }
    let mut best: Option<(&str, f64, f64)> = None;

    for name in project.activity_names() {
        if crashed.contains(name) {
            continue;
        }
        let Some(activity) = project.activity(name) else {
            continue;
        };
        if activity.crash_room() == 0 {
            continue;
        }
        let cost = activity.full_crash_cost();
        if cost > remaining {
            log_checks!(
                verbosity,
                "    Skipping {}: crash cost {:.2} exceeds budget {:.2}",
                name,
                cost,
                remaining
            );
            continue;
        }
        let per_day = activity.crash_cost_per_day();
        if best.map_or(true, |(_, best_per_day, _)| per_day < best_per_day) {
            best = Some((name, per_day, cost));
        }
    }

    best.map(|(name, _, cost)| Candidate {
        name: name.to_string(),
        cost,
    })
}
