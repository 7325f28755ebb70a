use super::{BackfillReport, Scheduler, SchedulerState};
use crate::error::{Result, SolarlogError};
use crate::portal::{PortalClient, PortalRequest};
use chrono::NaiveDate;

impl<C: PortalClient> Scheduler<C> {
    /// Fetch every day from `install_date` through `today`
    ///
    /// The sweep logs in up front and aborts if that fails or if any later
    /// login is rejected. Other per-day errors are recorded and the sweep
    /// moves on to the next date.
    pub async fn backfill(
        &mut self,
        install_date: NaiveDate,
        today: NaiveDate,
    ) -> Result<BackfillReport> {
        if install_date > today {
            return Err(SolarlogError::validation(
                "install_date".to_string(),
                format!("{} lies after today ({})", install_date, today),
            ));
        }

        let logger = self.logger.for_operation("backfill");
        logger.info(&format!("Backfilling {} ..= {}", install_date, today));
        self.authenticate().await?;

        let mut report = BackfillReport::default();
        let mut charts = None;
        for date in install_date.iter_days().take_while(|d| *d <= today) {
            if date > install_date && !self.options.backfill_spacing.is_zero() {
                tokio::time::sleep(self.options.backfill_spacing).await;
            }
            self.set_state(SchedulerState::Backfilling(date));

            match self.store_day(date, today, &mut charts).await {
                Ok(outcome) => {
                    logger
                        .with_field("date", date.to_string())
                        .debug(&format!("Day {}", outcome.as_str()));
                    report.stored.push(date);
                }
                Err(e) if e.is_fatal() => {
                    self.set_state(SchedulerState::Idle);
                    logger
                        .with_field("date", date.to_string())
                        .error(&format!("Backfill aborted: {}", e));
                    return Err(e);
                }
                Err(e) => {
                    let failure = self.record_failure(PortalRequest::DailyHistory(date), &e);
                    report.failed.push((date, failure));
                }
            }
        }

        self.set_state(SchedulerState::Idle);
        logger.info(&format!(
            "Backfill finished: {} stored, {} failed",
            report.stored.len(),
            report.failed.len()
        ));
        Ok(report)
    }
}
