use super::{CycleReport, Failure, Scheduler, SchedulerState};
use crate::error::{Result, SolarlogError};
use crate::normalize::{parse_daily, parse_status};
use crate::portal::{PortalClient, PortalRequest, RawPayload};
use crate::store::WriteOutcome;
use chrono::{Datelike, Days, NaiveDate, TimeDelta};

/// Daily-history payload of one month
pub(crate) struct MonthCharts {
    month: (i32, u32),
    payload: RawPayload,
}

impl<C: PortalClient> Scheduler<C> {
    /// One polling cycle: current status, then any missing finished days
    ///
    /// Non-fatal errors are recorded in the report and the cycle ends in
    /// `Idle`. A failed status poll skips the catch-up for this cycle. Only
    /// authentication failures are returned as `Err`.
    pub async fn poll_once(&mut self, today: NaiveDate) -> Result<CycleReport> {
        let mut report = CycleReport::default();
        self.set_state(SchedulerState::Polling);

        let request = PortalRequest::CurrentStatus;
        match self.poll_status(&mut report).await {
            Ok(()) => {}
            Err(e) if e.is_fatal() => {
                self.set_state(SchedulerState::Idle);
                return Err(e);
            }
            Err(e) => {
                report.failures.push(self.record_failure(request, &e));
                self.set_state(SchedulerState::Idle);
                return Ok(report);
            }
        }

        let dates = match self.catchup_dates(today) {
            Ok(dates) => dates,
            Err(e) => {
                let request = PortalRequest::DailyHistory(today);
                report.failures.push(self.record_failure(request, &e));
                Vec::new()
            }
        };
        let mut charts = None;
        for date in dates {
            let request = PortalRequest::DailyHistory(date);
            match self.store_day(date, today, &mut charts).await {
                Ok(outcome) => report.daily.push((date, outcome)),
                Err(e) if e.is_fatal() => {
                    self.set_state(SchedulerState::Idle);
                    return Err(e);
                }
                Err(e) => {
                    report.failures.push(self.record_failure(request, &e));
                    // Later days would likely fail the same way; next cycle resumes here
                    break;
                }
            }
        }

        self.set_state(SchedulerState::Idle);
        Ok(report)
    }

    async fn poll_status(&mut self, report: &mut CycleReport) -> Result<()> {
        let payload = self.fetch(PortalRequest::CurrentStatus).await?;
        let reading = parse_status(&payload)?;
        if !reading.is_online {
            report.offline = true;
            self.logger
                .for_operation("poll")
                .debug("PV system reported offline, reading not stored");
            return Ok(());
        }
        report.status = Some(self.store.write_status(&reading)?);
        Ok(())
    }

    /// Fetch, normalize and store one day
    ///
    /// Month charts cover every day of their month, so the last good payload
    /// is kept in `charts` and reused for later days of the same month. A
    /// day missing from the cached charts is fetched again.
    pub(crate) async fn store_day(
        &mut self,
        date: NaiveDate,
        today: NaiveDate,
        charts: &mut Option<MonthCharts>,
    ) -> Result<WriteOutcome> {
        let month = (date.year(), date.month());
        if let Some(cached) = charts.as_ref()
            && cached.month == month
            && let Ok(reading) = parse_daily(&cached.payload, date)
        {
            return self.store.write_daily(&reading.finalized_against(today));
        }

        let payload = self.fetch(PortalRequest::DailyHistory(date)).await?;
        let reading = parse_daily(&payload, date)?.finalized_against(today);
        *charts = Some(MonthCharts { month, payload });
        self.store.write_daily(&reading)
    }

    /// Finished days after the newest complete row, oldest first
    pub(crate) fn catchup_dates(&self, today: NaiveDate) -> Result<Vec<NaiveDate>> {
        let max_days = self.options.max_catchup_days;
        let Some(yesterday) = today.pred_opt() else {
            return Ok(Vec::new());
        };
        if max_days == 0 {
            return Ok(Vec::new());
        }

        let mut start = match self.store.latest_complete_daily_date()? {
            Some(latest) => latest + TimeDelta::days(1),
            None => yesterday,
        };
        let earliest = yesterday
            .checked_sub_days(Days::new(u64::from(max_days - 1)))
            .unwrap_or(NaiveDate::MIN);
        if start < earliest {
            start = earliest;
        }
        if let Some(install) = self.options.install_date
            && start < install
        {
            start = install;
        }

        Ok(start
            .iter_days()
            .take_while(|d| *d <= yesterday)
            .collect())
    }

    pub(crate) fn record_failure(
        &self,
        request: PortalRequest,
        err: &SolarlogError,
    ) -> Failure {
        let mut logger = self
            .logger
            .for_operation(&request.to_string())
            .with_field("kind", err.kind().to_string());
        if let PortalRequest::DailyHistory(date) = request {
            logger = logger.with_field("date", date.to_string());
        }
        logger.warn(&err.to_string());
        Failure::new(request.to_string(), err)
    }
}
