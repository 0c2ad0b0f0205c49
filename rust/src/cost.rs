//! Cumulative cost (S-curve), cash injections, and resource usage over time.

use thiserror::Error;

use crate::lanes::effective_start;
use crate::log_checks;
use crate::models::{Project, Time};
use crate::timing::{analyze, TimingError, TimingResult};

/// Error types for cost aggregation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CostError {
    #[error(transparent)]
    Timing(#[from] TimingError),
    #[error("Activity '{0}' has cost but zero duration; per-day cost is undefined")]
    ZeroDurationCost(String),
    #[error("Timeline would run to {horizon}, past the configured limit of {limit}")]
    HorizonTooLarge { horizon: Time, limit: Time },
}

/// Recoverable data issues found while costing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CostWarning {
    /// The resource has no unit cost; it was costed at zero.
    MissingUnitCost { activity: String, resource: String },
}

/// Resource usage issues.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceWarning {
    OverAllocated { time: Time, used: u32, limit: u32 },
}

/// Cumulative cost and cash injections on one shared timeline.
///
/// Both series have one point per time unit from 0 through `horizon()`, which
/// covers the project finish, every effective finish and the last injection.
/// They are kept separate; neither is rescaled to the other.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CashFlowReport {
    pub cumulative_cost: Vec<(Time, f64)>,
    pub cash_injections: Vec<(Time, f64)>,
    pub warnings: Vec<CostWarning>,
}

impl CashFlowReport {
    pub fn horizon(&self) -> Time {
        self.cumulative_cost.last().map_or(0, |&(t, _)| t)
    }

    pub fn total_cost(&self) -> f64 {
        self.cumulative_cost.last().map_or(0.0, |&(_, c)| c)
    }

    pub fn cost_at(&self, time: Time) -> Option<f64> {
        series_at(&self.cumulative_cost, time)
    }

    pub fn injection_at(&self, time: Time) -> Option<f64> {
        series_at(&self.cash_injections, time)
    }
}

/// Summed resource quantity in use at each time unit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceProfile {
    pub usage: Vec<(Time, u32)>,
    pub limit: u32,
    pub warnings: Vec<ResourceWarning>,
}

impl ResourceProfile {
    pub fn peak(&self) -> u32 {
        self.usage.iter().map(|&(_, u)| u).max().unwrap_or(0)
    }
}

fn series_at<T: Copy>(series: &[(Time, T)], time: Time) -> Option<T> {
    usize::try_from(time)
        .ok()
        .and_then(|idx| series.get(idx))
        .map(|&(_, v)| v)
}

/// Active window `[start, start + duration)` clipped to `0..=horizon`, as indices.
fn active_range(start: Time, duration: u32, horizon: Time) -> std::ops::Range<usize> {
    let end = horizon.saturating_add(1);
    let lo = start.clamp(0, end);
    let hi = start.saturating_add(Time::from(duration)).clamp(0, end);
    lo as usize..hi.max(lo) as usize
}

/// Last time unit of the timeline: the latest of the project finish, every
/// activity's effective finish, and `extra`. Never negative.
fn timeline_horizon(project: &Project, timing: &TimingResult, extra: Time) -> Result<Time, CostError> {
    let latest_finish = timing
        .iter()
        .filter_map(|(name, t)| {
            let duration = project.activity(name)?.duration();
            let start = effective_start(project, timing, name).unwrap_or(t.earliest_start);
            Some(start.saturating_add(Time::from(duration)))
        })
        .fold(timing.project_finish(), Time::max);
    let horizon = latest_finish.max(extra).max(0);

    let limit = project.config().max_horizon;
    if horizon > limit {
        return Err(CostError::HorizonTooLarge { horizon, limit });
    }
    Ok(horizon)
}

/// Build the S-curve data for the project's current state.
pub fn cash_flow(project: &Project) -> Result<CashFlowReport, CostError> {
    let timing = analyze(project)?;
    cash_flow_with(project, &timing)
}

/// Build the S-curve data against an existing timing snapshot.
///
/// Per-day cost of an activity is its total cost spread evenly over its
/// duration, charged at every time unit it is active from its effective start.
pub fn cash_flow_with(
    project: &Project,
    timing: &TimingResult,
) -> Result<CashFlowReport, CostError> {
    let verbosity = project.config().verbosity;
    let last_injection = project
        .cash_injections()
        .keys()
        .next_back()
        .copied()
        .unwrap_or(0);
    let horizon = timeline_horizon(project, timing, last_injection)?;

    let mut daily = vec![0.0; horizon as usize + 1];
    let mut warnings = Vec::new();

    for (name, t) in timing.iter() {
        let Some(activity) = project.activity(name) else {
            continue;
        };
        for resource in activity.resources_missing_cost() {
            log_checks!(verbosity, "Missing unit cost for {} in {}", resource, name);
            warnings.push(CostWarning::MissingUnitCost {
                activity: name.to_string(),
                resource: resource.to_string(),
            });
        }

        let total = activity.total_cost();
        let duration = activity.duration();
        if duration == 0 {
            if total != 0.0 {
                return Err(CostError::ZeroDurationCost(name.to_string()));
            }
            continue;
        }

        let per_day = total / f64::from(duration);
        let start = effective_start(project, timing, name).unwrap_or(t.earliest_start);
        for slot in &mut daily[active_range(start, duration, horizon)] {
            *slot += per_day;
        }
    }

    let mut running = 0.0;
    let cumulative_cost = daily
        .iter()
        .enumerate()
        .map(|(t, cost)| {
            running += cost;
            (t as Time, running)
        })
        .collect();

    let cash_injections = (0..=horizon)
        .map(|t| (t, project.cash_injections().get(&t).copied().unwrap_or(0.0)))
        .collect();

    Ok(CashFlowReport {
        cumulative_cost,
        cash_injections,
        warnings,
    })
}

/// Resource usage at each time unit from 0 through the latest finish.
///
/// Flags every time unit where usage exceeds the configured ceiling.
pub fn resource_profile(project: &Project) -> Result<ResourceProfile, CostError> {
    let timing = analyze(project)?;
    resource_profile_with(project, &timing)
}

pub fn resource_profile_with(
    project: &Project,
    timing: &TimingResult,
) -> Result<ResourceProfile, CostError> {
    let limit = project.config().max_resources;
    let horizon = timeline_horizon(project, timing, 0)?;
    let mut used = vec![0u32; horizon as usize + 1];

    for (name, t) in timing.iter() {
        let Some(activity) = project.activity(name) else {
            continue;
        };
        let load = activity.resource_load();
        let start = effective_start(project, timing, name).unwrap_or(t.earliest_start);
        for slot in &mut used[active_range(start, activity.duration(), horizon)] {
            *slot += load;
        }
    }

    let warnings = used
        .iter()
        .enumerate()
        .filter(|(_, &u)| u > limit)
        .map(|(t, &u)| ResourceWarning::OverAllocated {
            time: t as Time,
            used: u,
            limit,
        })
        .collect();

    Ok(ResourceProfile {
        usage: used
            .into_iter()
            .enumerate()
            .map(|(t, u)| (t as Time, u))
            .collect(),
        limit,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::lanes::adjust_start;
    use crate::models::ActivityRecord;

    fn make_activity(name: &str, duration: u32, preds: &[&str], labor: u32, rate: f64) -> ActivityRecord {
        ActivityRecord::new(name, duration)
            .with_predecessors(preds.iter().copied())
            .with_resource("labor", labor, Some(rate))
    }

    fn abc_project() -> Project {
        // A costs 300 over 3, B 100 over 2, C 400 over 4
        Project::from_records(
            EngineConfig::default(),
            vec![
                make_activity("A", 3, &[], 3, 100.0),
                make_activity("B", 2, &["A"], 2, 50.0),
                make_activity("C", 4, &["A"], 4, 100.0),
            ],
        )
        .unwrap()
    }

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.unwrap();
        assert!((actual - expected).abs() < 1e-9, "{} != {}", actual, expected);
    }

    #[test]
    fn test_cumulative_cost_curve() {
        let report = cash_flow(&abc_project()).unwrap();

        assert_eq!(report.horizon(), 7);
        assert_eq!(report.cumulative_cost.len(), 8);
        assert_close(report.cost_at(0), 100.0);
        assert_close(report.cost_at(2), 300.0);
        // t=3: B 50 + C 100
        assert_close(report.cost_at(3), 450.0);
        assert_close(report.cost_at(4), 600.0);
        assert_close(report.cost_at(5), 700.0);
        assert_close(report.cost_at(6), 800.0);
        assert_close(report.cost_at(7), 800.0);
        assert!((report.total_cost() - 800.0).abs() < 1e-9);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_cumulative_cost_is_monotonic() {
        let report = cash_flow(&abc_project()).unwrap();
        for pair in report.cumulative_cost.windows(2) {
            assert!(pair[1].1 >= pair[0].1);
        }
    }

    #[test]
    fn test_cash_injection_series() {
        let mut project = abc_project();
        project.set_cash_injection(2, 500.0);
        let report = cash_flow(&project).unwrap();

        assert_eq!(report.cash_injections.len(), report.cumulative_cost.len());
        for &(t, amount) in &report.cash_injections {
            if t == 2 {
                assert_eq!(amount, 500.0);
            } else {
                assert_eq!(amount, 0.0);
            }
        }
    }

    #[test]
    fn test_late_injection_extends_timeline() {
        let mut project = abc_project();
        project.set_cash_injection(10, 50.0);
        project.set_cash_injection(-1, 20.0);
        let report = cash_flow(&project).unwrap();

        assert_eq!(report.horizon(), 10);
        assert_close(report.injection_at(10), 50.0);
        assert_close(report.cost_at(10), 800.0);
        assert_eq!(report.injection_at(-1), None);
    }

    #[test]
    fn test_adjusted_start_shifts_spending() {
        let mut project = abc_project();
        adjust_start(&mut project, "B", 5).unwrap();
        let report = cash_flow(&project).unwrap();

        // B now spends at t=5,6 instead of 3,4
        assert_close(report.cost_at(3), 400.0);
        assert_close(report.cost_at(4), 500.0);
        assert_close(report.cost_at(5), 650.0);
        assert_close(report.cost_at(6), 800.0);
    }

    #[test]
    fn test_timeline_covers_effective_finish() {
        // A stale override pushes B past the computed project finish
        let mut project = abc_project();
        project.set_adjusted_start("B", 9);
        let report = cash_flow(&project).unwrap();

        assert_eq!(report.horizon(), 11);
        assert_close(report.cost_at(8), 700.0);
        assert_close(report.cost_at(10), 800.0);
        assert!((report.total_cost() - 800.0).abs() < 1e-9);
        assert_eq!(resource_profile(&project).unwrap().usage.len(), 12);
    }

    #[test]
    fn test_far_injection_exceeds_horizon_limit() {
        let mut project = abc_project();
        project.set_cash_injection(Time::MAX, 1.0);
        assert_eq!(
            cash_flow(&project),
            Err(CostError::HorizonTooLarge {
                horizon: Time::MAX,
                limit: EngineConfig::default().max_horizon,
            })
        );

        project.set_config(EngineConfig::default().with_max_horizon(5));
        assert!(matches!(
            resource_profile(&project),
            Err(CostError::HorizonTooLarge { horizon: 7, limit: 5 })
        ));
    }

    #[test]
    fn test_missing_unit_cost_warns_and_costs_zero() {
        let project = Project::from_records(
            EngineConfig::default(),
            vec![ActivityRecord::new("A", 2)
                .with_resource("crane", 1, Some(40.0))
                .with_resource("welder", 2, None)],
        )
        .unwrap();
        let report = cash_flow(&project).unwrap();

        assert_eq!(
            report.warnings,
            vec![CostWarning::MissingUnitCost {
                activity: "A".to_string(),
                resource: "welder".to_string(),
            }]
        );
        assert!((report.total_cost() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_duration_with_cost_is_an_error() {
        let project = Project::from_records(
            EngineConfig::default(),
            vec![make_activity("A", 2, &[], 1, 10.0), make_activity("M", 0, &["A"], 1, 10.0)],
        )
        .unwrap();
        assert_eq!(
            cash_flow(&project),
            Err(CostError::ZeroDurationCost("M".to_string()))
        );
    }

    #[test]
    fn test_zero_duration_milestone_costs_nothing() {
        let project = Project::from_records(
            EngineConfig::default(),
            vec![make_activity("A", 2, &[], 1, 10.0), ActivityRecord::new("done", 0).with_predecessors(["A"])],
        )
        .unwrap();
        let report = cash_flow(&project).unwrap();
        assert!((report.total_cost() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_resource_profile_flags_over_allocation() {
        let project = Project::from_records(
            EngineConfig::default().with_max_resources(5),
            vec![
                make_activity("A", 3, &[], 3, 1.0),
                make_activity("B", 2, &["A"], 2, 1.0),
                make_activity("C", 4, &["A"], 4, 1.0),
            ],
        )
        .unwrap();
        let profile = resource_profile(&project).unwrap();

        let usage: Vec<u32> = profile.usage.iter().map(|&(_, u)| u).collect();
        assert_eq!(usage, vec![3, 3, 3, 6, 6, 4, 4, 0]);
        assert_eq!(profile.peak(), 6);
        assert_eq!(
            profile.warnings,
            vec![
                ResourceWarning::OverAllocated { time: 3, used: 6, limit: 5 },
                ResourceWarning::OverAllocated { time: 4, used: 6, limit: 5 },
            ]
        );
    }
}
