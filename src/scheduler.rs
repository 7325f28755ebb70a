//! Polling and backfill orchestration
//!
//! The [`Scheduler`] owns the portal session and the database handle. It
//! polls on a fixed interval, catches up on finished days, refreshes the
//! rollups and decides which errors end the process.

mod backfill;
mod poll;
mod session;
mod types;

pub use types::{BackfillReport, CycleReport, Failure, SchedulerOptions, SchedulerState};

use crate::aggregate;
use crate::credentials::Credentials;
use crate::error::Result;
use crate::logging::{StructuredLogger, get_logger};
use crate::portal::PortalClient;
use crate::store::Store;
use chrono::{DateTime, NaiveDate, Utc};
use std::future::Future;
use std::time::Instant;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};

/// Drives a [`PortalClient`] and writes what it returns into a [`Store`]
pub struct Scheduler<C: PortalClient> {
    client: C,
    credentials: Credentials,
    store: Store,
    options: SchedulerOptions,
    session: Option<C::Session>,
    state: watch::Sender<SchedulerState>,
    last_failed_login: Option<Instant>,
    auth_attempts: u32,
    logger: StructuredLogger,
}

impl<C: PortalClient> Scheduler<C> {
    pub fn new(
        client: C,
        credentials: Credentials,
        store: Store,
        options: SchedulerOptions,
    ) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            client,
            credentials,
            store,
            options,
            session: None,
            state,
            last_failed_login: None,
            auth_attempts: 0,
            logger: get_logger("scheduler"),
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Receiver that observes every state change
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    pub(crate) fn set_state(&self, state: SchedulerState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            self.logger.trace(&format!("State {} -> {}", previous, state));
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    /// Number of login attempts made so far
    pub fn auth_attempts(&self) -> u32 {
        self.auth_attempts
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn into_store(self) -> Store {
        self.store
    }

    /// Calendar day of `now` in the configured timezone
    pub fn today_at(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.options.timezone).date_naive()
    }

    /// Poll once and refresh the rollups
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let now = Utc::now();
        let today = self.today_at(now);
        let report = self.poll_once(today).await?;

        if self.options.aggregate {
            match aggregate::run_all(&mut self.store, now, today) {
                Ok(done) if done.total() > 0 => self
                    .logger
                    .for_operation("aggregate")
                    .debug(&format!("Refreshed {} rollup slots", done.total())),
                Ok(_) => {}
                Err(e) => self
                    .logger
                    .for_operation("aggregate")
                    .error(&format!("Aggregation failed: {}", e)),
            }
        }
        Ok(report)
    }

    /// Poll every `poll_interval` until `shutdown` resolves
    ///
    /// A cycle in progress always finishes before shutdown is observed.
    /// Authentication failures end the loop unless `exit_on_auth_error` is
    /// off, in which case the next tick tries again.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut ticker = interval(self.options.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.logger.info(&format!(
            "Polling every {}s",
            self.options.poll_interval.as_secs()
        ));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.run_cycle().await {
                        Ok(report) => {
                            if let Some(outcome) = report.status {
                                self.logger.debug(&format!(
                                    "Cycle done: status {}, {} days, {} failures",
                                    outcome.as_str(),
                                    report.daily.len(),
                                    report.failures.len()
                                ));
                            }
                        }
                        Err(e) if self.options.exit_on_auth_error => {
                            self.logger.error(&format!("Stopping: {}", e));
                            self.set_state(SchedulerState::Idle);
                            return Err(e);
                        }
                        Err(e) => {
                            self.logger.error(&format!("Cycle failed, retrying next tick: {}", e));
                        }
                    }
                }
                _ = &mut shutdown => {
                    self.logger.info("Shutdown signal received");
                    break;
                }
            }
        }

        self.set_state(SchedulerState::Idle);
        Ok(())
    }
}
