use crate::config::Config;
use crate::error::SolarlogError;
use crate::store::WriteOutcome;
use chrono::NaiveDate;
use chrono_tz::Tz;
use std::fmt;
use std::time::Duration;

/// Scheduler lifecycle, published through a watch channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Authenticating,
    Polling,
    Backfilling(NaiveDate),
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerState::Idle => write!(f, "idle"),
            SchedulerState::Authenticating => write!(f, "authenticating"),
            SchedulerState::Polling => write!(f, "polling"),
            SchedulerState::Backfilling(date) => write!(f, "backfilling({})", date),
        }
    }
}

/// Timing and policy knobs taken from [`Config`]
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    pub poll_interval: Duration,
    pub login_backoff: Duration,
    pub backfill_spacing: Duration,
    pub max_catchup_days: u32,
    pub exit_on_auth_error: bool,
    pub aggregate: bool,
    pub install_date: Option<NaiveDate>,
    pub timezone: Tz,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for SchedulerOptions {
    fn from(config: &Config) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            login_backoff: Duration::from_secs(config.login_backoff_secs),
            backfill_spacing: Duration::from_millis(config.backfill_spacing_ms),
            max_catchup_days: config.max_catchup_days,
            exit_on_auth_error: config.exit_on_auth_error,
            aggregate: config.aggregate,
            install_date: config.install_date,
            timezone: config.tz(),
        }
    }
}

/// A non-fatal error recorded during a cycle or sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// Operation that failed, e.g. `fetch_daily_history(2024-01-02)`
    pub operation: String,
    /// [`SolarlogError::kind`] of the error
    pub kind: &'static str,
    pub message: String,
}

impl Failure {
    pub(crate) fn new(operation: impl Into<String>, err: &SolarlogError) -> Self {
        Self {
            operation: operation.into(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Outcome of one polling cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Status write result; `None` when nothing was stored
    pub status: Option<WriteOutcome>,
    /// The portal reported the system offline, so the reading was dropped
    pub offline: bool,
    /// Days fetched by the catch-up pass
    pub daily: Vec<(NaiveDate, WriteOutcome)>,
    pub failures: Vec<Failure>,
}

impl CycleReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Outcome of a backfill sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub stored: Vec<NaiveDate>,
    pub failed: Vec<(NaiveDate, Failure)>,
}

impl BackfillReport {
    pub fn attempted(&self) -> usize {
        self.stored.len() + self.failed.len()
    }
}
