//! Login handshake and response classification.
//!
//! The portal answers every login POST with an HTML page and no
//! machine-readable status, so the outcome is decided by looking for
//! failure markers. The markers are an ordered table of named heuristics,
//! most specific first; the first one that fires decides the outcome, and a
//! page on which none fires is a successful login.

use super::config::PortalConfig;
use super::credentials::Credentials;
use super::error::{AttendanceError, LoginFailure};
use super::session::{PortalResponse, Session};
use super::types::LoginResult;
use reqwest::Method;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::{debug, info, warn, Instrument};
use url::Url;

static HIDDEN_INPUT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input[type='hidden' i][name]").unwrap());
static PASSWORD_INPUT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input[type='password' i]").unwrap());
static BODY_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());

/// Elements whose text never shows on the page.
const HIDDEN_TEXT_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Longest banner text carried into a login message.
const MAX_MESSAGE_LEN: usize = 200;

/// Everything a heuristic may look at.
pub struct LoginProbe<'a> {
    pub response: &'a PortalResponse,
    pub document: &'a Html,
    /// Lowercased visible text of the page
    pub text: &'a str,
    pub config: &'a PortalConfig,
    pub login_page: &'a Url,
}

/// A named check over the login response.
pub struct LoginHeuristic {
    pub name: &'static str,
    pub check: fn(&LoginProbe<'_>) -> Option<(LoginFailure, String)>,
}

/// Login failure markers, most specific first.
pub static LOGIN_HEURISTICS: &[LoginHeuristic] = &[
    LoginHeuristic {
        name: "error-banner",
        check: error_banner,
    },
    LoginHeuristic {
        name: "failure-phrase",
        check: failure_phrase,
    },
    LoginHeuristic {
        name: "login-form-present",
        check: login_form_present,
    },
    LoginHeuristic {
        name: "redirected-to-login",
        check: redirected_to_login,
    },
    LoginHeuristic {
        name: "empty-response",
        check: empty_response,
    },
];

fn error_banner(probe: &LoginProbe<'_>) -> Option<(LoginFailure, String)> {
    probe
        .config
        .error_selectors()
        .iter()
        .flat_map(|selector| probe.document.select(selector))
        .map(|el| normalize_whitespace(&el.text().collect::<String>()))
        .find(|text| !text.is_empty())
        .map(|text| (LoginFailure::BadCredentials, truncate(&text)))
}

fn failure_phrase(probe: &LoginProbe<'_>) -> Option<(LoginFailure, String)> {
    probe
        .config
        .failure_phrases
        .iter()
        .find(|phrase| probe.text.contains(phrase.as_str()))
        .map(|phrase| {
            (
                LoginFailure::BadCredentials,
                format!("Portal reported \"{phrase}\""),
            )
        })
}

fn login_form_present(probe: &LoginProbe<'_>) -> Option<(LoginFailure, String)> {
    let named = Selector::parse(&format!(
        "input[name=\"{}\"]",
        probe.config.form.secret.replace('"', "\\\"")
    ))
    .ok();
    let has_named = named
        .map(|s| probe.document.select(&s).next().is_some())
        .unwrap_or(false);
    let has_password = probe
        .document
        .select(&PASSWORD_INPUT_SELECTOR)
        .next()
        .is_some();

    (has_named || has_password).then(|| {
        (
            LoginFailure::BadCredentials,
            "Invalid username or password".to_string(),
        )
    })
}

fn redirected_to_login(probe: &LoginProbe<'_>) -> Option<(LoginFailure, String)> {
    (probe.response.redirected && probe.response.landed_on(probe.login_page)).then(|| {
        (
            LoginFailure::BadCredentials,
            "Portal redirected back to the login page".to_string(),
        )
    })
}

fn empty_response(probe: &LoginProbe<'_>) -> Option<(LoginFailure, String)> {
    probe.response.body.trim().is_empty().then(|| {
        (
            LoginFailure::UnexpectedResponse,
            "Portal returned an empty page".to_string(),
        )
    })
}

/// Body text, without script and style contents.
fn visible_text(document: &Html) -> String {
    let Some(body) = document.select(&BODY_SELECTOR).next() else {
        return String::new();
    };
    body.descendants()
        .filter_map(|node| node.value().as_text().map(|text| (node, text)))
        .filter(|(node, _)| {
            !node
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|el| HIDDEN_TEXT_ELEMENTS.contains(&el.value().name()))
        })
        .map(|(_, text)| &**text)
        .collect()
}

/// Classifies the page returned by the login POST.
pub fn classify_login_response(
    response: &PortalResponse,
    config: &PortalConfig,
) -> Result<LoginResult, AttendanceError> {
    let login_page = config.resolve(&config.login_page)?;
    let document = Html::parse_document(&response.body);
    let text = visible_text(&document).to_lowercase();

    let probe = LoginProbe {
        response,
        document: &document,
        text: &text,
        config,
        login_page: &login_page,
    };

    for heuristic in LOGIN_HEURISTICS {
        if let Some((failure, message)) = (heuristic.check)(&probe) {
            debug!(heuristic = heuristic.name, failure = ?failure, "Login failure marker found");
            return Ok(LoginResult::failed(failure, message));
        }
    }

    Ok(LoginResult::succeeded())
}

/// Extracts hidden form fields (anti-forgery tokens, view state, ...).
///
/// Returns an empty list when the page has none.
pub fn extract_hidden_fields(html: &str) -> Vec<(String, String)> {
    let document = Html::parse_document(html);
    document
        .select(&HIDDEN_INPUT_SELECTOR)
        .filter_map(|input| {
            let name = input.value().attr("name")?.trim();
            if name.is_empty() {
                return None;
            }
            let value = input.value().attr("value").unwrap_or_default();
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

/// Builds the login POST body. Credential fields win over hidden fields of the same name.
fn build_login_form(
    config: &PortalConfig,
    hidden: Vec<(String, String)>,
    credentials: &Credentials,
) -> Vec<(String, String)> {
    let reserved = |name: &str| {
        name == config.form.identifier
            || name == config.form.secret
            || config.form.extra.contains_key(name)
    };

    let mut form: Vec<(String, String)> = hidden
        .into_iter()
        .filter(|(name, _)| !reserved(name))
        .collect();
    form.extend(
        config
            .form
            .extra
            .iter()
            .map(|(k, v)| (k.clone(), v.clone())),
    );
    form.push((
        config.form.identifier.clone(),
        credentials.identifier().to_string(),
    ));
    form.push((
        config.form.secret.clone(),
        credentials.secret().to_string(),
    ));
    form
}

/// Runs the login handshake on `session`.
///
/// Network failures are returned as errors. A rejected login is a
/// successful call returning `success = false`.
pub async fn login(
    session: &mut Session,
    credentials: &Credentials,
) -> Result<LoginResult, AttendanceError> {
    let span = session.span().clone();
    async {
        session.set_authenticated(false);
        info!(identifier = %credentials.identifier(), "Logging in");

        // Step 1: login page and hidden fields
        let login_page = session
            .request(Method::GET, &session.config().login_page.clone(), None)
            .await?;
        let hidden = extract_hidden_fields(&login_page.body);
        debug!(hidden_fields = hidden.len(), "Extracted hidden login fields");

        // Step 2: submit credentials
        let form = build_login_form(session.config(), hidden, credentials);
        let submit_path = session.config().login_submit.clone();
        let response = session
            .request(Method::POST, &submit_path, Some(&form))
            .await?;

        // Step 3: classify
        let result = classify_login_response(&response, session.config())?;
        if result.success {
            session.set_authenticated(true);
            info!(
                identifier = %credentials.identifier(),
                has_cookies = session.has_cookies(),
                "Login succeeded"
            );
        } else {
            warn!(
                identifier = %credentials.identifier(),
                failure = ?result.failure,
                detail = %result.message,
                "Login rejected"
            );
        }
        Ok(result)
    }
    .instrument(span)
    .await
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_MESSAGE_LEN {
        text.to_string()
    } else {
        let cut: String = text.chars().take(MAX_MESSAGE_LEN).collect();
        format!("{cut}...")
    }
}
