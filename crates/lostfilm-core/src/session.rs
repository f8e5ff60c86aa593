//! Login protocol and session state
//!
//! Logging in takes three hops:
//! 1. the credentials are posted to the cross-domain authentication service,
//!    which answers with an auto-submit form back to the catalog site;
//! 2. that form is posted to the catalog, which redirects and sets the
//!    `uid` and `pass` cookies;
//! 3. the settings page is fetched with those cookies to read the `usess`
//!    token embedded in it.
//!
//! The three cookies together are the authenticated session. Each hop has
//! its own failure outcome so the code reported to the caller says where
//! the flow broke.

use reqwest::Url;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

use crate::client::TrackerClient;
use crate::error::{LoginFailure, Result};

/// The cookie triple of an authenticated session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookies {
    pub uid: String,
    pub pass: String,
    pub usess: String,
}

impl SessionCookies {
    pub fn new(uid: impl Into<String>, pass: impl Into<String>, usess: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            pass: pass.into(),
            usess: usess.into(),
        }
    }

    /// A session is usable only when all three values are present.
    pub fn is_complete(&self) -> bool {
        !self.uid.is_empty() && !self.pass.is_empty() && !self.usess.is_empty()
    }

    pub fn as_pairs(&self) -> [(&str, &str); 3] {
        [
            ("uid", self.uid.as_str()),
            ("pass", self.pass.as_str()),
            ("usess", self.usess.as_str()),
        ]
    }
}

/// What a tracker can be constructed with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Credentials {
    /// Account login; the protocol runs on first use
    Password { login: String, password: String },
    /// A session established earlier; no login needed
    Session(SessionCookies),
}

/// Auto-submit form returned by the authentication service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizationForm {
    pub action: Url,
    pub fields: Vec<(String, String)>,
}

/// Where a tracker stands in the login sequence
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    /// Credentials accepted, catalog cookies not issued yet
    PendingFinalization(FinalizationForm),
    Authenticated(SessionCookies),
}

impl SessionState {
    pub fn cookies(&self) -> Option<&SessionCookies> {
        match self {
            SessionState::Authenticated(cookies) if cookies.is_complete() => Some(cookies),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.cookies().is_some()
    }

    /// Perform the next hop of the login sequence.
    ///
    /// An authenticated state is returned unchanged.
    pub async fn advance(
        self,
        client: &TrackerClient,
        login: &str,
        password: &str,
    ) -> std::result::Result<SessionState, LoginFailure> {
        match self {
            SessionState::Unauthenticated => {
                let form = authenticate(client, login, password).await?;
                Ok(SessionState::PendingFinalization(form))
            }
            SessionState::PendingFinalization(form) => {
                let (uid, pass) = finalize(client, &form).await?;
                let usess = fetch_session_token(client, &uid, &pass).await?;
                Ok(SessionState::Authenticated(SessionCookies { uid, pass, usess }))
            }
            authenticated @ SessionState::Authenticated(_) => Ok(authenticated),
        }
    }
}

/// Run the full login sequence from scratch.
///
/// # Errors
/// `TrackerError::LoginFailed` with the outcome of the hop that failed.
pub async fn login(client: &TrackerClient, login: &str, password: &str) -> Result<SessionCookies> {
    let mut state = SessionState::Unauthenticated;
    loop {
        state = match state.advance(client, login, password).await {
            Ok(SessionState::Authenticated(cookies)) => {
                tracing::info!(uid = %cookies.uid, "logged in");
                return Ok(cookies);
            }
            Ok(next) => next,
            Err(failure) => {
                tracing::warn!(code = failure.code(), "login failed: {}", failure);
                return Err(failure.into());
            }
        };
    }
}

/// Check that the site still accepts `cookies`. Never fails.
pub async fn verify(client: &TrackerClient, cookies: &SessionCookies) -> bool {
    if !cookies.is_complete() {
        return false;
    }
    let Ok(url) = client.profile_url() else {
        return false;
    };

    match client.get(&url, &cookies.as_pairs()).await {
        Ok(response) => response.is_success() && extract_session_token(&response.body).is_some(),
        Err(e) => {
            tracing::debug!(error = %e, "session verification request failed");
            false
        }
    }
}

async fn authenticate(
    client: &TrackerClient,
    login: &str,
    password: &str,
) -> std::result::Result<FinalizationForm, LoginFailure> {
    let form = vec![
        ("login".to_string(), login.to_string()),
        ("password".to_string(), password.to_string()),
    ];
    let referer = client.base_url().to_string();

    let response = client
        .post_form(client.login_url(), &form, Some(&referer), true)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "authentication request failed");
            LoginFailure::NoRedirect
        })?;

    let final_url = Url::parse(&response.url).map_err(|_| LoginFailure::NoRedirect)?;
    if final_url != *client.login_url() {
        // The service reports errors by redirecting back to the catalog
        // with `code` and `text` in the query.
        if !client.is_catalog_host(&final_url) {
            return Err(LoginFailure::RedirectedOffSite);
        }

        let code = query_value(&final_url, "code")
            .and_then(|c| c.parse::<i32>().ok())
            .unwrap_or(-1);
        if code != 0 {
            let message = response.body.trim();
            return Err(LoginFailure::Rejected {
                code,
                text: query_value(&final_url, "text"),
                message: (!message.is_empty()).then(|| message.to_string()),
            });
        }
    }

    parse_finalization_form(&response.body, client).ok_or(LoginFailure::NoRedirect)
}

async fn finalize(
    client: &TrackerClient,
    form: &FinalizationForm,
) -> std::result::Result<(String, String), LoginFailure> {
    let referer = client.login_url().to_string();
    let response = client
        .post_form(&form.action, &form.fields, Some(&referer), false)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "login finalization request failed");
            LoginFailure::NoRedirect
        })?;

    if !response.is_redirect() {
        tracing::warn!(status = response.status, "login finalization did not redirect");
        return Err(LoginFailure::NoRedirect);
    }

    if let Some(target) = response
        .location
        .as_deref()
        .and_then(|location| form.action.join(location).ok())
    {
        if !client.is_catalog_host(&target) {
            return Err(LoginFailure::RedirectedOffSite);
        }
    }

    match (response.cookie("uid"), response.cookie("pass")) {
        (Some(uid), Some(pass)) if !uid.is_empty() && !pass.is_empty() => {
            Ok((uid.to_string(), pass.to_string()))
        }
        _ => Err(LoginFailure::NoRedirect),
    }
}

async fn fetch_session_token(
    client: &TrackerClient,
    uid: &str,
    pass: &str,
) -> std::result::Result<String, LoginFailure> {
    let url = client.profile_url().map_err(|_| LoginFailure::NoRedirect)?;
    let response = client
        .get(&url, &[("uid", uid), ("pass", pass)])
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "settings page request failed");
            LoginFailure::NoRedirect
        })?;

    extract_session_token(&response.body).ok_or(LoginFailure::SessionTokenMissing)
}

/// Read the hidden form the authentication service answers with.
///
/// Only inputs carrying both a name and a value are submitted.
fn parse_finalization_form(html: &str, client: &TrackerClient) -> Option<FinalizationForm> {
    let document = Html::parse_document(html);
    let form_selector = Selector::parse("form[action]").ok()?;
    let input_selector = Selector::parse("input[name][value]").ok()?;

    let form = document.select(&form_selector).next()?;
    let action = client.catalog_url(form.value().attr("action")?.trim()).ok()?;
    let fields = form
        .select(&input_selector)
        .filter_map(|input| {
            let name = input.value().attr("name")?;
            let value = input.value().attr("value")?;
            Some((name.to_string(), value.to_string()))
        })
        .collect();

    Some(FinalizationForm { action, fields })
}

/// Extract the session token from `usess=<token>` in a page body.
pub fn extract_session_token(body: &str) -> Option<String> {
    let re = regex_lite::Regex::new(r"usess=([0-9A-Za-z]+)").ok()?;
    Some(re.captures(body)?.get(1)?.as_str().to_string())
}

fn query_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}
