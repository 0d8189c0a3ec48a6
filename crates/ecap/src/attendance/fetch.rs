//! Authenticated page fetches.
//!
//! These never log in on their own: a session without a verified login is
//! rejected before any request is made.

use super::error::AttendanceError;
use super::session::{PortalResponse, Session};
use reqwest::Method;
use scraper::{Html, Selector};
use tracing::{info, warn, Instrument};

/// Fetches the cumulative attendance page.
pub async fn fetch_cumulative(session: &Session) -> Result<String, AttendanceError> {
    let path = session.config().cumulative.clone();
    fetch_page(session, &path, "cumulative").await
}

/// Fetches today's attendance page.
pub async fn fetch_today(session: &Session) -> Result<String, AttendanceError> {
    let path = session.config().today.clone();
    fetch_page(session, &path, "today").await
}

async fn fetch_page(
    session: &Session,
    path: &str,
    page: &'static str,
) -> Result<String, AttendanceError> {
    if !session.is_authenticated() {
        return Err(AttendanceError::NotAuthenticated {
            message: "No verified login on this session".to_string(),
        });
    }

    async {
        info!(page = page, "Fetching attendance page");
        let response = session.request(Method::GET, path, None).await?;
        check_still_authenticated(session, &response, page)?;
        info!(page = page, body_bytes = response.body.len(), "Fetched attendance page");
        Ok(response.body)
    }
    .instrument(session.span().clone())
    .await
}

/// Rejects responses that show the portal has dropped the login.
fn check_still_authenticated(
    session: &Session,
    response: &PortalResponse,
    page: &'static str,
) -> Result<(), AttendanceError> {
    let config = session.config();
    let login_page = config.resolve(&config.login_page)?;

    let reason = if response.body.trim().is_empty() {
        Some("empty page")
    } else if response.redirected && response.landed_on(&login_page) {
        Some("redirected to login page")
    } else if contains_login_form(&response.body, &config.form.secret) {
        Some("login form returned")
    } else {
        None
    };

    match reason {
        Some(reason) => {
            warn!(page = page, url = %response.url, reason = reason, "Session is not authenticated");
            Err(AttendanceError::NotAuthenticated {
                message: format!("Portal returned no content for the {page} page ({reason})"),
            })
        }
        None => Ok(()),
    }
}

fn contains_login_form(html: &str, secret_field: &str) -> bool {
    let selector = format!("input[name=\"{}\"]", secret_field.replace('"', "\\\""));
    let found = match Selector::parse(&selector) {
        Ok(selector) => Html::parse_document(html).select(&selector).next().is_some(),
        Err(_) => false,
    };
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::config::PortalConfig;

    #[tokio::test]
    async fn test_unauthenticated_session_is_rejected() {
        // Unroutable base URL: any request would fail with a network error.
        let config = PortalConfig::default().with_base_url("http://127.0.0.1:9/");
        let session = Session::open(config).unwrap();

        let err = fetch_cumulative(&session).await.unwrap_err();
        assert!(matches!(err, AttendanceError::NotAuthenticated { .. }));
        let err = fetch_today(&session).await.unwrap_err();
        assert!(matches!(err, AttendanceError::NotAuthenticated { .. }));
    }

    #[test]
    fn test_contains_login_form() {
        assert!(contains_login_form(
            r#"<form><input name="txtPwd2" type="password"></form>"#,
            "txtPwd2"
        ));
        assert!(!contains_login_form("<table></table>", "txtPwd2"));
        assert!(contains_login_form(
            r#"<input name='pw"d' type="password">"#,
            "pw\"d"
        ));
    }
}
