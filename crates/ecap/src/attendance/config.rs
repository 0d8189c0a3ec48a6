/// Portal endpoints, form field names and login markers
use super::error::AttendanceError;
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Base URL for the ECAP portal.
const ECAP_BASE_URL: &str = "https://webprosindia.com/vignanit/";

/// Everything the scraper needs to know about the portal.
///
/// Paths are relative to `base_url`. The defaults describe the ECAP portal;
/// a JSON file can override any subset of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub base_url: String,
    pub login_page: String,
    pub login_submit: String,
    pub cumulative: String,
    pub today: String,
    pub form: FormFields,
    /// CSS selectors for elements that carry a login error message
    pub error_selectors: Vec<String>,
    /// Lowercase phrases that mark a rejected login anywhere in the page text
    pub failure_phrases: Vec<String>,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub max_redirects: usize,
}

/// Form field names used by the login POST.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormFields {
    pub identifier: String,
    pub secret: String,
    /// Static fields always sent with the login POST (e.g. image button coordinates)
    pub extra: BTreeMap<String, String>,
}

impl Default for FormFields {
    fn default() -> Self {
        let mut extra = BTreeMap::new();
        extra.insert("imgBtn2.x".to_string(), "0".to_string());
        extra.insert("imgBtn2.y".to_string(), "0".to_string());
        Self {
            identifier: "txtId2".to_string(),
            secret: "txtPwd2".to_string(),
            extra,
        }
    }
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: ECAP_BASE_URL.to_string(),
            login_page: "Default.aspx".to_string(),
            login_submit: "Default.aspx".to_string(),
            cumulative: "Academics/StudentAttendance.aspx?scrid=3&showtype=SA".to_string(),
            today: "Academics/studentacadamicregister.aspx?scrid=2".to_string(),
            form: FormFields::default(),
            error_selectors: vec![
                "#lblMessage".to_string(),
                "#lblmsg".to_string(),
                ".alert-danger".to_string(),
                ".validation-summary-errors".to_string(),
            ],
            failure_phrases: vec![
                "invalid username".to_string(),
                "invalid password".to_string(),
                "invalid credentials".to_string(),
                "incorrect password".to_string(),
                "login failed".to_string(),
            ],
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            request_timeout_secs: 30,
            max_redirects: 10,
        }
    }
}

impl PortalConfig {
    /// Loads a configuration from a JSON file, falling back to defaults for
    /// missing keys, and validates it.
    pub fn load_from_file(path: &Path) -> Result<Self, AttendanceError> {
        let content = fs::read_to_string(path)?;
        let config: PortalConfig = serde_json::from_str(&content)?;
        config.validate()
    }

    /// Returns a copy pointing at another base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Checks the configuration and normalizes the base URL so relative
    /// paths join beneath it.
    pub fn validate(mut self) -> Result<Self, AttendanceError> {
        if !self.base_url.ends_with('/') {
            self.base_url.push('/');
        }
        let base = Url::parse(&self.base_url)?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(AttendanceError::config(format!(
                "base URL must be http(s), got {}",
                base.scheme()
            )));
        }

        let paths = [
            ("login_page", &self.login_page),
            ("login_submit", &self.login_submit),
            ("cumulative", &self.cumulative),
            ("today", &self.today),
            ("form.identifier", &self.form.identifier),
            ("form.secret", &self.form.secret),
        ];
        for (name, value) in paths {
            if value.trim().is_empty() {
                return Err(AttendanceError::config(format!("{name} must not be empty")));
            }
        }

        for selector in &self.error_selectors {
            Selector::parse(selector).map_err(|e| {
                AttendanceError::config(format!("invalid error selector {selector:?}: {e}"))
            })?;
        }

        if self.request_timeout_secs == 0 {
            return Err(AttendanceError::config("request_timeout_secs must be positive"));
        }

        self.failure_phrases = self
            .failure_phrases
            .into_iter()
            .map(|p| p.to_lowercase())
            .collect();

        Ok(self)
    }

    /// Resolves a configured path against the base URL.
    pub fn resolve(&self, path: &str) -> Result<Url, AttendanceError> {
        Ok(Url::parse(&self.base_url)?.join(path)?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Parsed error selectors. Invalid ones are dropped; `validate` rejects them earlier.
    pub(crate) fn error_selectors(&self) -> Vec<Selector> {
        self.error_selectors
            .iter()
            .filter_map(|s| Selector::parse(s).ok())
            .collect()
    }
}
