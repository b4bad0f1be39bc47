//! # ERP Session
//!
//! Token state for the TOTVS MODA API.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   ┌─────────────────┐  login ok   ┌─────────────────┐                   │
//! │   │ Unauthenticated │────────────►│  Authenticated  │                   │
//! │   └─────────────────┘             └────────┬────────┘                   │
//! │        ▲      ▲                            │ now >= expires_at          │
//! │        │      │ 401 / invalidate           ▼                            │
//! │        │      └─────────────────  ┌─────────────────┐                   │
//! │        │                          │     Expired     │                   │
//! │        └──────────────────────────┴─────────────────┘                   │
//! │                  next call re-authenticates                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Expiry is evaluated against a caller-supplied `now`, so the session holds
//! no clock of its own.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

/// Bearer token returned by `POST /auth/login`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErpToken {
    pub access_token: String,
    /// `None` when the ERP did not send `expiresIn`; such a token is kept
    /// until the ERP rejects it.
    pub expires_at: Option<DateTime<Utc>>,
}

impl ErpToken {
    /// Builds a token from the login response's `expiresIn` (seconds).
    ///
    /// An `expiresIn` too large to represent as a timestamp is treated as
    /// no expiry.
    pub fn issued(access_token: String, expires_in_secs: Option<i64>, now: DateTime<Utc>) -> Self {
        let expires_at = expires_in_secs
            .and_then(|secs| TimeDelta::try_seconds(secs.max(0)))
            .and_then(|ttl| now.checked_add_signed(ttl));
        ErpToken {
            access_token,
            expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Observable session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
    Expired,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Unauthenticated => write!(f, "unauthenticated"),
            SessionState::Authenticated => write!(f, "authenticated"),
            SessionState::Expired => write!(f, "expired"),
        }
    }
}

/// Holder of the current token, if any.
#[derive(Debug, Clone, Default)]
pub struct ErpSession {
    token: Option<ErpToken>,
}

impl ErpSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, now: DateTime<Utc>) -> SessionState {
        match &self.token {
            None => SessionState::Unauthenticated,
            Some(token) if token.is_expired(now) => SessionState::Expired,
            Some(_) => SessionState::Authenticated,
        }
    }

    /// Returns the bearer token when the session is usable at `now`.
    pub fn valid_token(&self, now: DateTime<Utc>) -> Option<&str> {
        self.token
            .as_ref()
            .filter(|t| !t.is_expired(now))
            .map(|t| t.access_token.as_str())
    }

    pub fn authenticated(&mut self, token: ErpToken) {
        self.token = Some(token);
    }

    /// Drops the token, e.g. after the ERP answered 401.
    pub fn invalidate(&mut self) {
        self.token = None;
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.token.as_ref().and_then(|t| t.expires_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions_over_time() {
        let t0 = Utc::now();
        let mut session = ErpSession::new();
        assert_eq!(session.state(t0), SessionState::Unauthenticated);
        assert!(session.valid_token(t0).is_none());

        session.authenticated(ErpToken::issued("abc".into(), Some(3600), t0));
        assert_eq!(session.state(t0), SessionState::Authenticated);
        assert_eq!(session.valid_token(t0), Some("abc"));

        let later = t0 + TimeDelta::seconds(3600);
        assert_eq!(session.state(later), SessionState::Expired);
        assert!(session.valid_token(later).is_none());

        session.invalidate();
        assert_eq!(session.state(later), SessionState::Unauthenticated);
    }

    #[test]
    fn test_token_without_expiry_never_expires() {
        let t0 = Utc::now();
        let token = ErpToken::issued("abc".into(), None, t0);
        assert!(!token.is_expired(t0 + TimeDelta::days(365)));
    }

    #[test]
    fn test_huge_expiry_is_kept_without_deadline() {
        let t0 = Utc::now();
        let token = ErpToken::issued("abc".into(), Some(10_000_000_000_000), t0);
        assert!(token.expires_at.is_none());

        let token = ErpToken::issued("abc".into(), Some(i64::MAX), t0);
        assert!(token.expires_at.is_none());
        assert!(!token.is_expired(t0));
    }

    #[test]
    fn test_zero_expiry_is_immediately_expired() {
        let t0 = Utc::now();
        let token = ErpToken::issued("abc".into(), Some(0), t0);
        assert!(token.is_expired(t0));
    }
}
