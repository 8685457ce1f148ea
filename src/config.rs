//! Engine configuration.
//!
//! All values are fixed at construction and shared read-only across
//! concurrent requests. There is no ambient/global configuration.

/// Default authorization lifetime: one day.
pub const DEFAULT_EXPIRY: i64 = 86_400;

const AUTHZ_PATH: &str = "/acme/authz/";
const ACCT_PATH: &str = "/acme/acct/";
const CHALL_PATH: &str = "/acme/chall/";

/// Immutable engine configuration.
#[derive(Debug, Clone)]
pub struct Config {
    server_name: String,
    expiry: i64,
    authz_path: String,
    acct_path: String,
    chall_path: String,
}

impl Config {
    /// Configuration for a server reachable under `server_name`, e.g.
    /// `https://ca.example`, with the default one-day authorization expiry.
    pub fn new(server_name: &str) -> Self {
        Config {
            server_name: server_name.trim_end_matches('/').to_string(),
            expiry: DEFAULT_EXPIRY,
            authz_path: AUTHZ_PATH.into(),
            acct_path: ACCT_PATH.into(),
            chall_path: CHALL_PATH.into(),
        }
    }

    /// Override the authorization expiry (seconds).
    pub fn with_expiry(mut self, expiry: i64) -> Self {
        self.expiry = expiry;
        self
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn expiry(&self) -> i64 {
        self.expiry
    }

    /// Base URL of authorization resources, e.g.
    /// `https://ca.example/acme/authz/`.
    pub fn authz_url(&self) -> String {
        format!("{}{}", self.server_name, self.authz_path)
    }

    pub fn acct_url(&self) -> String {
        format!("{}{}", self.server_name, self.acct_path)
    }

    pub fn chall_url(&self) -> String {
        format!("{}{}", self.server_name, self.chall_path)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = Config::new("https://ca.example");
        assert_eq!(c.expiry(), 86_400);
        assert_eq!(c.authz_url(), "https://ca.example/acme/authz/");
        assert_eq!(c.acct_url(), "https://ca.example/acme/acct/");
        assert_eq!(c.chall_url(), "https://ca.example/acme/chall/");
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let c = Config::new("https://ca.example/");
        assert_eq!(c.authz_url(), "https://ca.example/acme/authz/");
    }

    #[test]
    fn test_with_expiry() {
        let c = Config::new("https://ca.example").with_expiry(600);
        assert_eq!(c.expiry(), 600);
    }
}
