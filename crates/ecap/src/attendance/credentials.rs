//! Portal credentials and the front-end's per-identifier credential store.

use dashmap::DashMap;
use std::fmt;

/// Minimum length of a plausible roll number.
const MIN_IDENTIFIER_LEN: usize = 5;

/// An identifier (roll number) and its password.
///
/// `Debug` never prints the password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    identifier: String,
    secret: String,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }

    /// Parses a `"<roll> <password>"` message.
    ///
    /// The line is split on the first space; the password may itself contain
    /// spaces. Returns `None` for anything that doesn't look like credentials
    /// (no password, or a roll number that isn't alphanumeric and at least
    /// five characters long).
    pub fn parse_line(line: &str) -> Option<Self> {
        let (identifier, secret) = line.trim().split_once(' ')?;
        if secret.is_empty()
            || identifier.chars().count() < MIN_IDENTIFIER_LEN
            || !identifier.chars().all(char::is_alphanumeric)
        {
            return None;
        }
        Some(Self::new(identifier, secret))
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Credentials remembered for "refresh", keyed by identifier.
///
/// Owned by the front-end; the scraping core never reads it.
#[derive(Default)]
pub struct CredentialStore {
    entries: DashMap<String, Credentials>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remembers credentials, replacing any earlier entry for the identifier.
    pub fn insert(&self, credentials: Credentials) {
        self.entries
            .insert(credentials.identifier().to_string(), credentials);
    }

    pub fn get(&self, identifier: &str) -> Option<Credentials> {
        self.entries.get(identifier).map(|entry| entry.clone())
    }

    pub fn remove(&self, identifier: &str) -> Option<Credentials> {
        self.entries.remove(identifier).map(|(_, c)| c)
    }

    /// Forgets everything and returns how many entries were removed.
    pub fn clear(&self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored identifiers, sorted.
    pub fn identifiers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        let creds = Credentials::parse_line("23l31a4391 my pass word").unwrap();
        assert_eq!(creds.identifier(), "23l31a4391");
        assert_eq!(creds.secret(), "my pass word");
    }

    #[test]
    fn test_parse_line_rejects_non_credentials() {
        assert!(Credentials::parse_line("hello").is_none());
        assert!(Credentials::parse_line("abc password").is_none());
        assert!(Credentials::parse_line("23l-31a4391 password").is_none());
        assert!(Credentials::parse_line("23l31a4391 ").is_none());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = Credentials::new("23l31a4391", "hunter2");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("23l31a4391"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_store_insert_replace_clear() {
        let store = CredentialStore::new();
        store.insert(Credentials::new("23l31a4391", "old"));
        store.insert(Credentials::new("23l31a4391", "new"));
        store.insert(Credentials::new("23l31a4392", "other"));

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("23l31a4391").unwrap().secret(), "new");
        assert_eq!(store.identifiers(), vec!["23l31a4391", "23l31a4392"]);

        assert!(store.remove("23l31a4392").is_some());
        assert_eq!(store.clear(), 1);
        assert!(store.is_empty());
        assert!(store.get("23l31a4391").is_none());
    }
}
