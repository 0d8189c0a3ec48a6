//! Cookie-bearing HTTP session against the portal.
//!
//! A `Session` owns its own cookie jar. Nothing is shared between sessions,
//! and dropping the session discards every cookie it collected.

use super::config::PortalConfig;
use super::error::AttendanceError;
use rand::Rng;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::{Client, Method, StatusCode};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info_span, warn, Instrument, Span};
use url::Url;

/// A response from the portal, fully read.
#[derive(Debug, Clone)]
pub struct PortalResponse {
    pub status: StatusCode,
    /// URL of the final response after redirects
    pub url: Url,
    /// True if at least one redirect was followed
    pub redirected: bool,
    pub body: String,
}

impl PortalResponse {
    /// Returns true if the final URL is the given page (query ignored).
    pub fn landed_on(&self, page: &Url) -> bool {
        self.url.host_str() == page.host_str()
            && self.url.port_or_known_default() == page.port_or_known_default()
            && self.url.path().eq_ignore_ascii_case(page.path())
    }
}

/// An HTTP session with the portal.
pub struct Session {
    client: Client,
    jar: Arc<Jar>,
    config: PortalConfig,
    authenticated: bool,
    correlation_id: String,
    span: Span,
}

impl Session {
    /// Opens a session with an empty cookie store.
    pub fn open(config: PortalConfig) -> Result<Self, AttendanceError> {
        let config = config.validate()?;
        let jar = Arc::new(Jar::default());

        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9"),
        );

        let client = Client::builder()
            .cookie_provider(jar.clone())
            .default_headers(headers)
            .redirect(Policy::limited(config.max_redirects))
            .user_agent(&config.user_agent)
            .connect_timeout(Duration::from_secs(10))
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AttendanceError::Network {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        let correlation_id = generate_correlation_id();
        let span = info_span!("portal_session", correlation_id = %correlation_id);

        Ok(Self {
            client,
            jar,
            config,
            authenticated: false,
            correlation_id,
            span,
        })
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// True once a login on this session has been verified.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub(crate) fn set_authenticated(&mut self, authenticated: bool) {
        self.authenticated = authenticated;
    }

    /// True if the cookie store holds any cookie for the portal.
    pub fn has_cookies(&self) -> bool {
        Url::parse(&self.config.base_url)
            .ok()
            .and_then(|url| self.jar.cookies(&url))
            .is_some()
    }

    /// Performs one request against a configured path.
    ///
    /// Cookies from `Set-Cookie` headers (including on redirects) are stored
    /// in the session. A final status outside 2xx/3xx is a network error.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        form: Option<&[(String, String)]>,
    ) -> Result<PortalResponse, AttendanceError> {
        let url = self.config.resolve(path)?;
        self.send(method, url, form).instrument(self.span.clone()).await
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        form: Option<&[(String, String)]>,
    ) -> Result<PortalResponse, AttendanceError> {
        let start = Instant::now();
        debug!(method = %method, url = %url, "Sending portal request");

        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(fields) = form {
            let referer = self.config.resolve(&self.config.login_page)?;
            request = request.header(header::REFERER, referer.as_str()).form(fields);
        }

        let response = request.send().await.map_err(|e| {
            warn!(method = %method, url = %url, error = %e, "Portal request failed");
            AttendanceError::from(e)
        })?;

        let status = response.status();
        let final_url = response.url().clone();
        let redirected = final_url != url;

        if !(status.is_success() || status.is_redirection()) {
            warn!(
                method = %method,
                url = %final_url,
                status = status.as_u16(),
                "Portal returned an error status"
            );
            return Err(AttendanceError::Network {
                message: format!("{} {} returned status {}", method, final_url.path(), status),
            });
        }

        let body = response.text().await?;

        debug!(
            method = %method,
            url = %final_url,
            status = status.as_u16(),
            redirected = redirected,
            body_bytes = body.len(),
            has_cookies = self.has_cookies(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Portal request completed"
        );

        Ok(PortalResponse {
            status,
            url: final_url,
            redirected,
            body,
        })
    }
}

/// Generates a unique correlation ID for request tracing.
fn generate_correlation_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros();
    let random: u32 = rand::thread_rng().gen();
    format!("{:x}-{:08x}", timestamp & 0xFFFFFFFF, random)
}
