use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use spaceapps_types::schema::TOKEN_EXPIRY_BUFFER_SECS;

/// Body of a successful `POST login`.
#[derive(Debug, Deserialize)]
pub(super) struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub expiration: Option<String>,
}

/// Bearer token with the instant after which it is refreshed.
#[derive(Clone)]
pub(super) struct AuthToken {
    pub value: String,
    pub refresh_after: Option<DateTime<Utc>>,
}

impl AuthToken {
    pub fn from_login(login: LoginResponse) -> Self {
        let refresh_after = login
            .expiration
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|expiration| {
                expiration.with_timezone(&Utc) - Duration::seconds(TOKEN_EXPIRY_BUFFER_SECS)
            });
        Self {
            value: login.token,
            refresh_after,
        }
    }

    /// Tokens without a usable expiration stay valid until the service rejects them.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.refresh_after.is_none_or(|refresh_after| now < refresh_after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login(expiration: Option<&str>) -> LoginResponse {
        LoginResponse {
            token: "abc".to_string(),
            expiration: expiration.map(str::to_string),
        }
    }

    #[test]
    fn refresh_happens_five_minutes_before_expiration() {
        let token = AuthToken::from_login(login(Some("2024-05-01T12:00:00Z")));
        let before = DateTime::parse_from_rfc3339("2024-05-01T11:54:59Z")
            .expect("valid timestamp")
            .with_timezone(&Utc);
        let inside_buffer = DateTime::parse_from_rfc3339("2024-05-01T11:56:00Z")
            .expect("valid timestamp")
            .with_timezone(&Utc);
        assert!(token.is_fresh(before));
        assert!(!token.is_fresh(inside_buffer));
    }

    #[test]
    fn unparseable_expiration_keeps_the_token() {
        let token = AuthToken::from_login(login(Some("next tuesday")));
        assert!(token.refresh_after.is_none());
        assert!(token.is_fresh(Utc::now()));
        assert!(AuthToken::from_login(login(None)).is_fresh(Utc::now()));
    }
}
