use super::{Scheduler, SchedulerState};
use crate::error::{Result, SolarlogError};
use crate::portal::{PortalClient, PortalRequest, RawPayload};
use std::time::Instant;

impl<C: PortalClient> Scheduler<C> {
    /// Log in and keep the session, honouring the failed-login backoff
    pub async fn authenticate(&mut self) -> Result<()> {
        if let Some(failed_at) = self.last_failed_login {
            let elapsed = failed_at.elapsed();
            if elapsed < self.options.login_backoff {
                let wait = self.options.login_backoff - elapsed;
                return Err(SolarlogError::transient(format!(
                    "login throttled after a failed attempt, next try in {}s",
                    wait.as_secs().max(1)
                )));
            }
        }

        let previous = self.state();
        self.set_state(SchedulerState::Authenticating);
        self.auth_attempts += 1;
        let result = self.client.authenticate(&self.credentials).await;
        self.set_state(previous);

        match result {
            Ok(session) => {
                self.session = Some(session);
                self.last_failed_login = None;
                Ok(())
            }
            Err(e) => {
                self.session = None;
                self.last_failed_login = Some(Instant::now());
                self.logger
                    .for_operation("authenticate")
                    .with_field("kind", e.kind().to_string())
                    .error(&format!("Login failed: {}", e));
                Err(e)
            }
        }
    }

    /// Send `request`, logging in first if needed
    ///
    /// A `SessionExpired` answer triggers one re-authentication and one retry
    /// of the same request. A second expiry in a row is reported as `Auth`.
    pub(crate) async fn fetch(&mut self, request: PortalRequest) -> Result<RawPayload> {
        if self.session.is_none() {
            self.authenticate().await?;
        }

        match self.send(request).await {
            Err(e) if e.is_session_expired() => {
                self.logger
                    .for_operation(&request.to_string())
                    .warn(&format!("{}; logging in again", e));
                self.session = None;
                self.authenticate().await?;
                match self.send(request).await {
                    Err(e) if e.is_session_expired() => {
                        self.session = None;
                        Err(SolarlogError::auth(format!(
                            "{} rejected right after a fresh login: {}",
                            request, e
                        )))
                    }
                    other => other,
                }
            }
            other => other,
        }
    }

    async fn send(&self, request: PortalRequest) -> Result<RawPayload> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| SolarlogError::session_expired("no active session"))?;
        request.send(&self.client, session).await
    }
}
