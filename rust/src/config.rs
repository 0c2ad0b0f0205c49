//! Configuration for the scheduling engine.

use chrono::{Days, NaiveDate};

use crate::models::Time;

/// Engine-wide settings shared by every analysis on a project.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Verbosity level: 0=silent, 1=changes, 2=checks, 3=debug.
    pub verbosity: u8,
    /// Resource ceiling per time unit. Only used to flag over-allocation in
    /// the resource profile; lane assignment never consults it.
    pub max_resources: u32,
    /// Calendar date of time unit 0. One time unit is one day.
    pub start_date: Option<NaiveDate>,
    /// Longest timeline the cost and resource series may allocate.
    pub max_horizon: Time,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            max_resources: 10,
            start_date: None,
            max_horizon: 100_000,
        }
    }
}

impl EngineConfig {
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_max_resources(mut self, max_resources: u32) -> Self {
        self.max_resources = max_resources;
        self
    }

    pub fn with_start_date(mut self, start_date: NaiveDate) -> Self {
        self.start_date = Some(start_date);
        self
    }

    pub fn with_max_horizon(mut self, max_horizon: Time) -> Self {
        self.max_horizon = max_horizon;
        self
    }

    /// Map a time-unit offset to a calendar date, if a start date is configured.
    ///
    /// Returns `None` for negative offsets or when the date would overflow.
    pub fn date_at(&self, time: Time) -> Option<NaiveDate> {
        let start = self.start_date?;
        let offset = u64::try_from(time).ok()?;
        start.checked_add_days(Days::new(offset))
    }
}
