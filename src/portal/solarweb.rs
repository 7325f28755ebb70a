//! Fronius Solar.web client
//!
//! Login is a three step OpenID dance through the Fronius identity provider:
//! `ExternalLogin` hands out a `sessionDataKey`, the credentials are posted
//! to `commonauth`, and the auto-submitting form it returns is replayed to
//! `ExternalLoginCallback`, which redirects to a URL carrying `pvSystemId`.
//! The resulting cookie jar lives inside the session's HTTP client.

use super::html;
use super::types::{
    CONSUMPTION_SECTION, PRODUCTION_SECTION, PayloadBody, RawPayload, STATUS_SECTION,
};
use super::PortalClient;
use crate::config::{Config, PortalConfig};
use crate::credentials::Credentials;
use crate::error::{Result, SolarlogError};
use crate::logging::{StructuredLogger, get_logger};
use chrono::{Datelike, NaiveDate, Utc};
use reqwest::{StatusCode, Url};
use std::time::Duration;

/// Hidden fields replayed from the identity provider to Solar.web
const CALLBACK_FIELDS: [&str; 5] = [
    "code",
    "id_token",
    "state",
    "AuthenticatedIdPs",
    "session_state",
];

/// Paths that mean the portal bounced us back to the login flow
const LOGIN_PATH_MARKERS: [&str; 3] = ["/account/externallogin", "/account/login", "/commonauth"];

/// Authenticated Solar.web session
#[derive(Debug, Clone)]
pub struct SolarWebSession {
    http: reqwest::Client,
    pv_system_id: String,
}

impl SolarWebSession {
    pub fn pv_system_id(&self) -> &str {
        &self.pv_system_id
    }
}

/// Solar.web scraping client
pub struct SolarWebClient {
    portal: PortalConfig,
    timeout: Duration,
    logger: StructuredLogger,
}

impl SolarWebClient {
    /// Create new Solar.web client
    pub fn new(portal: PortalConfig, timeout: Duration) -> Self {
        Self {
            portal,
            timeout,
            logger: get_logger("portal"),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.portal.clone(), config.request_timeout())
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.portal.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn auth_host(&self) -> Option<String> {
        Url::parse(&self.portal.auth_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }

    /// Fresh HTTP client with its own cookie jar
    fn build_http(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(self.portal.user_agent.clone())
            .timeout(self.timeout)
            .build()
            .map_err(|e| SolarlogError::config(format!("Failed to build HTTP client: {}", e)))
    }

    async fn get_section(
        &self,
        session: &SolarWebSession,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<PayloadBody> {
        let resp = session.http.get(self.url(path)).query(query).send().await?;
        classify_response(resp.status(), resp.url(), self.auth_host().as_deref())?;

        let body = PayloadBody::from_text(resp.text().await?);
        if let PayloadBody::Html(ref page) = body
            && html::looks_like_login_page(page)
        {
            return Err(SolarlogError::session_expired(format!(
                "{} returned the login page",
                path
            )));
        }
        Ok(body)
    }

    async fn get_chart(
        &self,
        session: &SolarWebSession,
        date: NaiveDate,
        view: &str,
    ) -> Result<PayloadBody> {
        let query = [
            ("pvSystemId", session.pv_system_id.clone()),
            ("year", date.year().to_string()),
            ("month", date.month().to_string()),
            ("day", date.day().to_string()),
            ("interval", "month".to_string()),
            ("view", view.to_string()),
        ];
        self.get_section(session, "Chart/GetChartNew", &query).await
    }
}

#[async_trait::async_trait]
impl PortalClient for SolarWebClient {
    type Session = SolarWebSession;

    async fn authenticate(&self, credentials: &Credentials) -> Result<SolarWebSession> {
        let logger = self.logger.for_operation("authenticate");
        logger.info("Logging into Solar.web");
        let http = self.build_http()?;

        logger.debug("Getting initial session");
        let external_login = http.get(self.url("Account/ExternalLogin")).send().await?;
        check_login_step("ExternalLogin", external_login.status())?;
        let session_data_key = query_param(external_login.url(), "sessionDataKey")
            .ok_or_else(|| {
                SolarlogError::auth(format!(
                    "Couldn't parse sessionDataKey from {}",
                    display_url(external_login.url())
                ))
            })?;

        logger.debug("Posting credentials to the identity provider");
        let commonauth = http
            .post(&self.portal.auth_url)
            .form(&[
                ("sessionDataKey", session_data_key.as_str()),
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
                ("chkRemember", "on"),
            ])
            .send()
            .await?;
        check_login_step("commonauth", commonauth.status())?;
        let page = commonauth.text().await?;
        let callback_form = html::hidden_inputs(&page, &CALLBACK_FIELDS).map_err(|missing| {
            if html::looks_like_login_page(&page) {
                SolarlogError::auth("Login rejected by identity provider, check username and password")
            } else {
                SolarlogError::auth(format!(
                    "commonauth response is missing form fields: {}",
                    missing.join(", ")
                ))
            }
        })?;

        logger.debug("Posting to external login callback");
        let callback = http
            .post(self.url("Account/ExternalLoginCallback"))
            .form(&callback_form)
            .send()
            .await?;
        check_login_step("ExternalLoginCallback", callback.status())?;
        let pv_system_id = query_param(callback.url(), "pvSystemId").ok_or_else(|| {
            SolarlogError::auth(format!(
                "Couldn't parse pvSystemId from {}",
                display_url(callback.url())
            ))
        })?;

        logger.info("Logged into Solar.web");
        Ok(SolarWebSession { http, pv_system_id })
    }

    async fn fetch_current_status(&self, session: &SolarWebSession) -> Result<RawPayload> {
        let fetched_at = Utc::now();
        let query = [("pvSystemId", session.pv_system_id.clone())];
        let body = self
            .get_section(session, "ActualData/GetCompareDataForPvSystem", &query)
            .await?;
        Ok(RawPayload::new(fetched_at).with_section(STATUS_SECTION, body))
    }

    async fn fetch_daily_history(
        &self,
        session: &SolarWebSession,
        date: NaiveDate,
    ) -> Result<RawPayload> {
        let fetched_at = Utc::now();
        let production = self.get_chart(session, date, "production").await?;
        let consumption = self.get_chart(session, date, "consumption").await?;
        self.logger
            .for_operation("fetch_daily_history")
            .debug(&format!("Fetched charts for {}", date));
        Ok(RawPayload::new(fetched_at)
            .with_section(PRODUCTION_SECTION, production)
            .with_section(CONSUMPTION_SECTION, consumption))
    }
}

/// Map a login step's status code to the error taxonomy
fn check_login_step(step: &str, status: StatusCode) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        return Err(SolarlogError::transient(format!(
            "{} returned {}",
            step, status
        )));
    }
    Err(SolarlogError::auth(format!("{} returned {}", step, status)))
}

/// Map a data request's final status and URL to the error taxonomy
pub(crate) fn classify_response(
    status: StatusCode,
    final_url: &Url,
    auth_host: Option<&str>,
) -> Result<()> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(SolarlogError::session_expired(format!(
            "portal answered {}",
            status
        )));
    }

    let path = final_url.path().to_ascii_lowercase();
    let on_auth_host = matches!((final_url.host_str(), auth_host), (Some(a), Some(b)) if a.eq_ignore_ascii_case(b));
    if on_auth_host || LOGIN_PATH_MARKERS.iter().any(|m| path.contains(m)) {
        return Err(SolarlogError::session_expired(format!(
            "redirected to login at {}",
            display_url(final_url)
        )));
    }

    if !status.is_success() {
        return Err(SolarlogError::transient(format!(
            "portal answered {} for {}",
            status,
            display_url(final_url)
        )));
    }
    Ok(())
}

fn query_param(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

/// Host and path only; query strings carry session keys
fn display_url(url: &Url) -> String {
    format!("{}{}", url.host_str().unwrap_or(""), url.path())
}
