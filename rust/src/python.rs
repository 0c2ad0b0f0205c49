//! Python bindings for the scheduling engine.
//!
//! Engine errors surface as `ValueError` carrying the engine's message.

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use chrono::NaiveDate;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use std::collections::HashMap;

use crate::{
    adjust_start, analyze, assign_lanes, cash_flow, crash, ActivityRecord, EngineConfig, Project,
    TimingResult,
};

fn value_error(err: impl std::fmt::Display) -> PyErr {
    PyValueError::new_err(err.to_string())
}

/// Timing snapshot keyed by activity name.
#[pyclass(name = "TimingReport")]
#[derive(Clone, Debug, Default)]
pub struct PyTimingReport {
    #[pyo3(get)]
    pub critical_path: String,
    #[pyo3(get)]
    pub early_start: HashMap<String, i64>,
    #[pyo3(get)]
    pub early_finish: HashMap<String, i64>,
    #[pyo3(get)]
    pub late_start: HashMap<String, i64>,
    #[pyo3(get)]
    pub late_finish: HashMap<String, i64>,
    #[pyo3(get)]
    pub total_float: HashMap<String, i64>,
    #[pyo3(get)]
    pub free_float: HashMap<String, i64>,
    #[pyo3(get)]
    pub project_finish: i64,
}

#[pymethods]
impl PyTimingReport {
    fn __repr__(&self) -> String {
        format!(
            "TimingReport(critical_path={:?}, project_finish={})",
            self.critical_path, self.project_finish
        )
    }
}

impl From<&TimingResult> for PyTimingReport {
    fn from(result: &TimingResult) -> Self {
        let mut report = Self {
            critical_path: result.critical_path_display(),
            project_finish: result.project_finish(),
            ..Default::default()
        };
        for (name, t) in result.iter() {
            report.early_start.insert(name.to_string(), t.earliest_start);
            report.early_finish.insert(name.to_string(), t.earliest_finish);
            report.late_start.insert(name.to_string(), t.latest_start);
            report.late_finish.insert(name.to_string(), t.latest_finish);
            report.total_float.insert(name.to_string(), t.total_float);
            report.free_float.insert(name.to_string(), t.free_float);
        }
        report
    }
}

/// A project handle. Each instance is independent; share one across threads
/// only behind the caller's own lock.
#[pyclass(name = "Project")]
pub struct PyProject {
    inner: Project,
}

#[pymethods]
impl PyProject {
    #[new]
    #[pyo3(signature = (verbosity=0, max_resources=10, start_date=None, max_horizon=100_000))]
    fn new(
        verbosity: u8,
        max_resources: u32,
        start_date: Option<NaiveDate>,
        max_horizon: i64,
    ) -> Self {
        let mut config = EngineConfig::default()
            .with_verbosity(verbosity)
            .with_max_resources(max_resources)
            .with_max_horizon(max_horizon);
        config.start_date = start_date;
        Self {
            inner: Project::new(config),
        }
    }

    #[pyo3(signature = (
        name,
        duration,
        resources,
        predecessors,
        resource_unit_cost,
        crash_duration,
        crash_cost_per_day,
        deadline=None
    ))]
    #[allow(clippy::too_many_arguments)]
    fn add_activity(
        &mut self,
        name: String,
        duration: u32,
        resources: HashMap<String, u32>,
        predecessors: Vec<String>,
        resource_unit_cost: HashMap<String, f64>,
        crash_duration: u32,
        crash_cost_per_day: f64,
        deadline: Option<i64>,
    ) -> PyResult<()> {
        let record = ActivityRecord {
            name,
            duration,
            resources: resources.into_iter().collect(),
            predecessors,
            resource_unit_cost: resource_unit_cost.into_iter().collect(),
            crash_duration,
            crash_cost_per_day,
            deadline,
        };
        self.inner.add_activity(record).map_err(value_error)
    }

    fn timing(&self) -> PyResult<PyTimingReport> {
        let result = analyze(&self.inner).map_err(value_error)?;
        Ok(PyTimingReport::from(&result))
    }

    /// Gantt rows as `(activity, lane, start, duration)`; lane 0 is critical.
    fn lanes(&self) -> PyResult<Vec<(String, usize, i64, u32)>> {
        let timing = analyze(&self.inner).map_err(value_error)?;
        Ok(assign_lanes(&self.inner, &timing)
            .rows
            .into_iter()
            .map(|r| (r.activity, r.lane, r.start, r.duration))
            .collect())
    }

    fn adjust_start(&mut self, activity: &str, new_start: i64) -> PyResult<String> {
        adjust_start(&mut self.inner, activity, new_start)
            .map(|confirmation| confirmation.to_string())
            .map_err(value_error)
    }

    /// Returns `(critical_path, remaining_budget)`.
    fn crash(&mut self, budget: f64) -> PyResult<(String, f64)> {
        let outcome = crash(&mut self.inner, budget).map_err(value_error)?;
        Ok((
            outcome.timing.critical_path_display(),
            outcome.remaining_budget,
        ))
    }

    fn set_cash_injection(&mut self, time: i64, amount: f64) {
        self.inner.set_cash_injection(time, amount);
    }

    fn remove_cash_injection(&mut self, time: i64) -> Option<f64> {
        self.inner.remove_cash_injection(time)
    }

    fn clear_cash_injections(&mut self) {
        self.inner.clear_cash_injections();
    }

    fn cash_injections(&self) -> HashMap<i64, f64> {
        self.inner
            .cash_injections()
            .iter()
            .map(|(&t, &amount)| (t, amount))
            .collect()
    }

    /// Returns `(cumulative_cost, cash_injections)` as aligned `(time, value)` lists.
    fn cash_flow(&self) -> PyResult<(Vec<(i64, f64)>, Vec<(i64, f64)>)> {
        let report = cash_flow(&self.inner).map_err(value_error)?;
        Ok((report.cumulative_cost, report.cash_injections))
    }

    fn __repr__(&self) -> String {
        format!(
            "Project(activities={}, adjustments={}, cash_injections={})",
            self.inner.len(),
            self.inner.adjusted_starts().len(),
            self.inner.cash_injections().len()
        )
    }
}

/// The cpm_rust Python module.
#[pymodule]
fn cpm_rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyProject>()?;
    m.add_class::<PyTimingReport>()?;
    Ok(())
}
