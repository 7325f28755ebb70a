#![allow(dead_code)]

use chrono::{Datelike, NaiveDate, Utc};
use serde_json::{Value, json};
use solarlog::portal::types::{CONSUMPTION_SECTION, PRODUCTION_SECTION, STATUS_SECTION};
use solarlog::portal::{PayloadBody, PortalClient, RawPayload};
use solarlog::{Credentials, Result, SchedulerOptions, SolarlogError, Store};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn status_json(pv: f64, grid: f64, load: f64, online: bool) -> Value {
    json!({
        "P_PV": pv,
        "P_Grid": grid,
        "P_Load": -load,
        "IsOnline": online,
        "E_Day": 12.5,
        "E_Total": 9876.0
    })
}

pub fn status_payload(body: Value) -> RawPayload {
    RawPayload::new(Utc::now()).with_section(STATUS_SECTION, PayloadBody::Json(body))
}

fn epoch_ms(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp_millis()
}

/// Month charts holding a single point for `date`
pub fn daily_payload(date: NaiveDate, feed_in: f64, direct: f64, grid: f64) -> RawPayload {
    let ms = epoch_ms(date);
    let production = json!({"settings": {"series": [
        {"name": "Energy to grid", "data": [[ms, feed_in]]},
        {"name": "Consumed directly", "data": [[ms, direct]]}
    ]}});
    let consumption = json!({"settings": {"series": [
        {"name": "Energy from grid", "data": [[ms, grid]]}
    ]}});
    RawPayload::new(Utc::now())
        .with_section(PRODUCTION_SECTION, PayloadBody::Json(production))
        .with_section(CONSUMPTION_SECTION, PayloadBody::Json(consumption))
}

/// Month charts with a point for each of `days` days from `first`
///
/// Values follow the scripted default: feed-in equals the day of month.
pub fn month_payload(first: NaiveDate, days: usize) -> RawPayload {
    let dates: Vec<NaiveDate> = first.iter_days().take(days).collect();
    let points = |value: &dyn Fn(NaiveDate) -> f64| -> Vec<Value> {
        dates.iter().map(|d| json!([epoch_ms(*d), value(*d)])).collect()
    };
    let production = json!({"settings": {"series": [
        {"name": "Energy to grid", "data": points(&|d| f64::from(d.day()))},
        {"name": "Consumed directly", "data": points(&|_| 2.0)}
    ]}});
    let consumption = json!({"settings": {"series": [
        {"name": "Energy from grid", "data": points(&|_| 4.0)}
    ]}});
    RawPayload::new(Utc::now())
        .with_section(PRODUCTION_SECTION, PayloadBody::Json(production))
        .with_section(CONSUMPTION_SECTION, PayloadBody::Json(consumption))
}

/// In-process portal answering from queued results
///
/// Empty queues fall back to a successful login, an online status reading
/// and a daily payload derived from the requested date.
#[derive(Default)]
pub struct ScriptedPortal {
    auth: Mutex<VecDeque<Result<()>>>,
    status: Mutex<VecDeque<Result<RawPayload>>>,
    daily: Mutex<HashMap<NaiveDate, VecDeque<Result<RawPayload>>>>,
    auth_calls: AtomicU32,
    status_calls: AtomicU32,
    daily_calls: AtomicU32,
}

impl ScriptedPortal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_auth(self, result: Result<()>) -> Self {
        self.auth.lock().unwrap().push_back(result);
        self
    }

    pub fn push_status(self, result: Result<RawPayload>) -> Self {
        self.status.lock().unwrap().push_back(result);
        self
    }

    pub fn push_daily(self, date: NaiveDate, result: Result<RawPayload>) -> Self {
        self.daily
            .lock()
            .unwrap()
            .entry(date)
            .or_default()
            .push_back(result);
        self
    }

    pub fn auth_calls(&self) -> u32 {
        self.auth_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn daily_calls(&self) -> u32 {
        self.daily_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PortalClient for ScriptedPortal {
    type Session = u32;

    async fn authenticate(&self, _credentials: &Credentials) -> Result<u32> {
        let n = self.auth_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let next = self.auth.lock().unwrap().pop_front();
        match next {
            Some(Err(e)) => Err(e),
            _ => Ok(n),
        }
    }

    async fn fetch_current_status(&self, _session: &u32) -> Result<RawPayload> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.status.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(status_payload(status_json(3.2, -0.5, 2.7, true))))
    }

    async fn fetch_daily_history(&self, _session: &u32, date: NaiveDate) -> Result<RawPayload> {
        self.daily_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self
            .daily
            .lock()
            .unwrap()
            .get_mut(&date)
            .and_then(VecDeque::pop_front);
        scripted.unwrap_or_else(|| {
            let day = f64::from(date.day0() + 1);
            Ok(daily_payload(date, day, 2.0, 4.0))
        })
    }
}

pub fn credentials() -> Credentials {
    Credentials::new("owner@example.com", "hunter2")
}

/// Options without delays so tests run instantly
pub fn fast_options() -> SchedulerOptions {
    SchedulerOptions {
        login_backoff: Duration::ZERO,
        backfill_spacing: Duration::ZERO,
        aggregate: false,
        ..SchedulerOptions::default()
    }
}

pub fn scheduler(portal: ScriptedPortal) -> solarlog::Scheduler<ScriptedPortal> {
    scheduler_with(portal, fast_options())
}

pub fn scheduler_with(
    portal: ScriptedPortal,
    options: SchedulerOptions,
) -> solarlog::Scheduler<ScriptedPortal> {
    solarlog::Scheduler::new(
        portal,
        credentials(),
        Store::open_in_memory().unwrap(),
        options,
    )
}

pub fn expired() -> SolarlogError {
    SolarlogError::session_expired("redirected to login")
}
