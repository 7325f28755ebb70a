//! Portal session client
//!
//! [`PortalClient`] is the seam between the scheduler and the remote
//! portal. The production implementation is [`SolarWebClient`]; tests drive
//! the scheduler with scripted clients.

pub mod html;
pub mod solarweb;
pub mod types;

pub use solarweb::{SolarWebClient, SolarWebSession};
pub use types::{PayloadBody, RawPayload};

use crate::credentials::Credentials;
use crate::error::Result;
use chrono::NaiveDate;
use std::fmt;

/// Authenticated access to the telemetry portal
#[async_trait::async_trait]
pub trait PortalClient: Send + Sync {
    /// Opaque authentication artifact returned by a successful login
    type Session: Send + Sync;

    /// Log in; `Auth` on rejected credentials or an unexpected login flow
    async fn authenticate(&self, credentials: &Credentials) -> Result<Self::Session>;

    /// Current status; `SessionExpired` when the portal wants a new login
    async fn fetch_current_status(&self, session: &Self::Session) -> Result<RawPayload>;

    /// Historical values covering `date`; same failure semantics
    async fn fetch_daily_history(
        &self,
        session: &Self::Session,
        date: NaiveDate,
    ) -> Result<RawPayload>;
}

/// A portal request the scheduler can replay after re-authenticating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalRequest {
    CurrentStatus,
    DailyHistory(NaiveDate),
}

impl PortalRequest {
    pub async fn send<C: PortalClient>(&self, client: &C, session: &C::Session) -> Result<RawPayload> {
        match self {
            PortalRequest::CurrentStatus => client.fetch_current_status(session).await,
            PortalRequest::DailyHistory(date) => client.fetch_daily_history(session, *date).await,
        }
    }
}

impl fmt::Display for PortalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortalRequest::CurrentStatus => write!(f, "fetch_current_status"),
            PortalRequest::DailyHistory(date) => write!(f, "fetch_daily_history({})", date),
        }
    }
}
