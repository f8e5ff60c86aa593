//! Error types for the LostFilm tracker client
//!
//! Only transport problems and authentication failures are hard errors.
//! Parsing problems surface as `None`/empty results from the parsers.
//! TrackerError implements Serialize so the scheduler can report it as text.

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Why a login attempt did not produce a usable session.
///
/// Every outcome carries the numeric code callers use to decide whether
/// a retry makes sense: remote statuses are passed through, `-1` means the
/// login flow was redirected off the catalog site and `-2` means the
/// protocol broke down (no redirect, missing cookies, transport failure).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginFailure {
    /// The authentication service rejected the credentials.
    Rejected {
        code: i32,
        text: Option<String>,
        message: Option<String>,
    },
    /// The flow ended on a page outside the catalog site.
    RedirectedOffSite,
    /// No finalization form, no redirect or no session cookies.
    NoRedirect,
    /// The settings page did not expose a `usess` token.
    SessionTokenMissing,
}

impl LoginFailure {
    pub fn code(&self) -> i32 {
        match self {
            LoginFailure::Rejected { code, .. } => *code,
            LoginFailure::RedirectedOffSite => -1,
            LoginFailure::NoRedirect | LoginFailure::SessionTokenMissing => -2,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            LoginFailure::Rejected { text, .. } => text.as_deref(),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            LoginFailure::Rejected { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

impl std::fmt::Display for LoginFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoginFailure::Rejected { code, text, .. } => match text {
                Some(text) => write!(f, "rejected with code {}: {}", code, text),
                None => write!(f, "rejected with code {}", code),
            },
            LoginFailure::RedirectedOffSite => write!(f, "redirected off site (code -1)"),
            LoginFailure::NoRedirect => write!(f, "no redirect or cookies (code -2)"),
            LoginFailure::SessionTokenMissing => write!(f, "session token missing (code -2)"),
        }
    }
}

/// Error type for tracker operations
#[derive(Error, Debug)]
pub enum TrackerError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Failed to parse HTML content
    #[error("Failed to parse HTML: {0}")]
    ParseError(String),

    /// Invalid URL or settings value
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A settings value is out of range or unsupported
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// Rate limited by the server (HTTP 429)
    #[error("Rate limited - too many requests")]
    RateLimited,

    /// Requested page was not found (HTTP 404)
    #[error("Page not found: {0}")]
    NotFound(String),

    /// The site answered with a status we cannot use
    #[error("Unexpected HTTP status {status} for {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// Operation needs a session but the tracker has no credentials
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Login protocol failed
    #[error("Login failed: {0}")]
    LoginFailed(LoginFailure),
}

impl TrackerError {
    /// Login failure code, if this is a login error.
    pub fn login_code(&self) -> Option<i32> {
        match self {
            TrackerError::LoginFailed(failure) => Some(failure.code()),
            _ => None,
        }
    }
}

impl From<LoginFailure> for TrackerError {
    fn from(failure: LoginFailure) -> Self {
        TrackerError::LoginFailed(failure)
    }
}

/// Serialize TrackerError as its display string
impl Serialize for TrackerError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Result type alias for tracker operations
pub type Result<T> = std::result::Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_failure_codes() {
        let rejected = LoginFailure::Rejected {
            code: 3,
            text: Some("incorrect login/password".to_string()),
            message: Some("Неверный логин или пароль".to_string()),
        };
        assert_eq!(rejected.code(), 3);
        assert_eq!(rejected.text(), Some("incorrect login/password"));
        assert_eq!(rejected.message(), Some("Неверный логин или пароль"));

        assert_eq!(LoginFailure::RedirectedOffSite.code(), -1);
        assert_eq!(LoginFailure::NoRedirect.code(), -2);
        assert_eq!(LoginFailure::SessionTokenMissing.code(), -2);
    }

    #[test]
    fn test_negative_codes_have_no_text() {
        for failure in [
            LoginFailure::RedirectedOffSite,
            LoginFailure::NoRedirect,
            LoginFailure::SessionTokenMissing,
        ] {
            assert!(failure.text().is_none());
            assert!(failure.message().is_none());
        }
    }

    #[test]
    fn test_tracker_error_display_login_failed() {
        let error = TrackerError::from(LoginFailure::RedirectedOffSite);
        assert_eq!(error.to_string(), "Login failed: redirected off site (code -1)");
        assert_eq!(error.login_code(), Some(-1));
    }

    #[test]
    fn test_tracker_error_display_rejected() {
        let error = TrackerError::from(LoginFailure::Rejected {
            code: 6,
            text: Some("incorrect login/password".to_string()),
            message: None,
        });
        assert_eq!(
            error.to_string(),
            "Login failed: rejected with code 6: incorrect login/password"
        );
    }

    #[test]
    fn test_tracker_error_display_not_found() {
        let error = TrackerError::NotFound("/series/Grimm/season_9/episode_1".to_string());
        assert_eq!(
            error.to_string(),
            "Page not found: /series/Grimm/season_9/episode_1"
        );
        assert_eq!(error.login_code(), None);
    }

    #[test]
    fn test_tracker_error_display_unexpected_status() {
        let error = TrackerError::UnexpectedStatus {
            status: 502,
            url: "https://www.lostfilm.tv/my.php".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Unexpected HTTP status 502 for https://www.lostfilm.tv/my.php"
        );
    }

    #[test]
    fn test_tracker_error_display_invalid_settings() {
        let error = TrackerError::InvalidSettings("requests_per_second out of range: 0".to_string());
        assert_eq!(
            error.to_string(),
            "Invalid settings: requests_per_second out of range: 0"
        );
    }

    #[test]
    fn test_tracker_error_serialize() {
        let error = TrackerError::ParseError("test error".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert_eq!(json, "\"Failed to parse HTML: test error\"");
    }

    #[test]
    fn test_tracker_error_serialize_not_authenticated() {
        let json = serde_json::to_string(&TrackerError::NotAuthenticated).unwrap();
        assert_eq!(json, "\"Not authenticated\"");
    }
}
