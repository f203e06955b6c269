//! `Credential` — opaque bearer token plus expiry.

use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone)]
pub struct Credential {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Credential {
            token: token.into(),
            expires_at,
        }
    }

    /// A credential with no reported expiry is assumed valid for one hour.
    pub fn with_assumed_expiry(token: impl Into<String>) -> Self {
        Credential::new(token, Utc::now() + Duration::hours(1))
    }

    pub fn needs_refresh(&self, now: DateTime<Utc>, refresh_window: Duration) -> bool {
        self.expires_at - now <= refresh_window
    }

    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needs_refresh_within_window() {
        let now = Utc::now();
        let cred = Credential::new("tok", now + Duration::minutes(3));
        assert!(cred.needs_refresh(now, Duration::minutes(5)));
    }

    #[test]
    fn does_not_need_refresh_outside_window() {
        let now = Utc::now();
        let cred = Credential::new("tok", now + Duration::minutes(10));
        assert!(!cred.needs_refresh(now, Duration::minutes(5)));
    }

    #[test]
    fn authorization_header_uses_bearer_scheme() {
        let cred = Credential::with_assumed_expiry("abc123");
        assert_eq!(cred.authorization_header(), "Bearer abc123");
    }
}
