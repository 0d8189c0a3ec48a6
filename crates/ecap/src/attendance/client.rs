//! Client for fetching attendance from the ECAP portal.
//!
//! Handles the scrape sequence:
//! 1. GET the login page and collect hidden form fields
//! 2. POST credentials and classify the returned page
//! 3. GET the cumulative attendance page and parse it
//! 4. GET today's attendance page and parse it
//! 5. Render the summary
//!
//! Each `AttendanceClient` owns one session. A refresh builds a new client
//! and logs in again from scratch.

use super::config::PortalConfig;
use super::credentials::{CredentialStore, Credentials};
use super::cumulative::parse_attendance;
use super::error::{AttendanceError, LoginFailure};
use super::fetch::{fetch_cumulative, fetch_today};
use super::format::format_summary;
use super::login::login;
use super::session::Session;
use super::today::parse_today;
use super::types::{AttendanceRecord, LoginResult, TodaysAttendance};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{error, info, warn};

/// The operations the front-end needs, bound to one portal session.
pub struct AttendanceClient {
    session: Session,
}

impl AttendanceClient {
    /// Opens a fresh session against the configured portal.
    pub fn new(config: PortalConfig) -> Result<Self, AttendanceError> {
        Ok(Self {
            session: Session::open(config)?,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Logs in on this client's session.
    pub async fn login(&mut self, credentials: &Credentials) -> Result<LoginResult, AttendanceError> {
        login(&mut self.session, credentials).await
    }

    /// Fetches and parses the cumulative attendance page. Requires a prior successful login.
    pub async fn fetch_and_parse_cumulative(&self) -> Result<AttendanceRecord, AttendanceError> {
        let html = fetch_cumulative(&self.session).await?;
        let _entered = self.session.span().enter();
        parse_attendance(&html)
    }

    /// Fetches and parses today's attendance page. Requires a prior successful login.
    pub async fn fetch_and_parse_today(&self) -> Result<TodaysAttendance, AttendanceError> {
        let html = fetch_today(&self.session).await?;
        let _entered = self.session.span().enter();
        parse_today(&html)
    }
}

/// Result of one complete scrape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceReport {
    pub identifier: String,
    pub record: AttendanceRecord,
    /// `None` when today's page could not be fetched or parsed
    pub today: Option<TodaysAttendance>,
    pub fetched_at: DateTime<Utc>,
}

impl AttendanceReport {
    pub fn render(&self) -> String {
        format_summary(&self.record, &self.identifier, self.today.as_ref())
    }
}

/// Runs login → fetch → parse on a brand-new session.
///
/// A rejected login becomes `AttendanceError::Authentication`. The
/// cumulative page is required; today's page is best-effort and a failure
/// there only drops the `today` section.
pub async fn run_pipeline(
    config: &PortalConfig,
    credentials: &Credentials,
) -> Result<AttendanceReport, AttendanceError> {
    let start = Instant::now();
    let mut client = AttendanceClient::new(config.clone())?;
    let correlation_id = client.session().correlation_id().to_string();

    info!(
        correlation_id = %correlation_id,
        identifier = %credentials.identifier(),
        "Starting attendance retrieval"
    );

    let result = async {
        let outcome = client.login(credentials).await?;
        if !outcome.success {
            return Err(AttendanceError::Authentication {
                reason: outcome.failure.unwrap_or(LoginFailure::UnexpectedResponse),
                message: outcome.message,
            });
        }

        let record = client.fetch_and_parse_cumulative().await?;

        let today = match client.fetch_and_parse_today().await {
            Ok(today) => Some(today),
            Err(e) => {
                warn!(
                    correlation_id = %correlation_id,
                    error = %e,
                    "Today's attendance unavailable"
                );
                None
            }
        };

        Ok(AttendanceReport {
            identifier: credentials.identifier().to_string(),
            record,
            today,
            fetched_at: Utc::now(),
        })
    }
    .await;

    match &result {
        Ok(report) => info!(
            correlation_id = %correlation_id,
            subjects = report.record.subjects.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Attendance retrieval completed"
        ),
        Err(e) if e.needs_maintainer() => error!(
            correlation_id = %correlation_id,
            error = %e,
            duration_ms = start.elapsed().as_millis() as u64,
            "Attendance retrieval failed; portal layout may have changed"
        ),
        Err(e) => warn!(
            correlation_id = %correlation_id,
            error = %e,
            duration_ms = start.elapsed().as_millis() as u64,
            "Attendance retrieval failed"
        ),
    }

    result
}

/// Re-runs the pipeline with credentials remembered for `identifier`.
pub async fn refresh(
    store: &CredentialStore,
    config: &PortalConfig,
    identifier: &str,
) -> Result<AttendanceReport, AttendanceError> {
    let credentials = store
        .get(identifier)
        .ok_or_else(|| AttendanceError::NotAuthenticated {
            message: format!("Session expired for {identifier}"),
        })?;
    run_pipeline(config, &credentials).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_refresh_without_stored_credentials() {
        let store = CredentialStore::new();
        let err = refresh(&store, &PortalConfig::default(), "23L31A4391")
            .await
            .unwrap_err();
        assert!(matches!(err, AttendanceError::NotAuthenticated { .. }));
        assert!(err.user_message().contains("send your credentials again"));
    }

    #[tokio::test]
    async fn test_fetch_before_login_is_rejected() {
        let client = AttendanceClient::new(PortalConfig::default()).unwrap();
        assert!(matches!(
            client.fetch_and_parse_cumulative().await,
            Err(AttendanceError::NotAuthenticated { .. })
        ));
    }
}
