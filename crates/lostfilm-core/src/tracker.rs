//! Main LostFilm.TV tracker API
//!
//! This module combines the HTTP client, the login flow and the parsers
//! into the interface the scheduler talks to: resolving catalog URLs,
//! checking the session and listing downloadable releases.

use crate::client::TrackerClient;
use crate::error::{Result, TrackerError};
use crate::parser::url::{browse_path, episode_path, seasons_path, show_path};
use crate::parser::{
    is_series_url, parse_download_info, parse_seasons, parse_show, parse_special_entry,
    parse_special_releases, CatalogUrl,
};
use crate::session::{self, Credentials, SessionCookies, SessionState};
use crate::types::{CatalogEntry, DownloadInfo, ParsedUrl};

/// Tracker client for LostFilm.TV
///
/// One instance holds one session. Instances share nothing, so several can
/// run side by side with different accounts.
///
/// # Example
/// ```no_run
/// use lostfilm_core::{LostFilmTracker, ParsedUrl};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let tracker = LostFilmTracker::new()?;
///
///     if let Some(ParsedUrl::Entry(entry)) = tracker
///         .parse_url("https://www.lostfilm.tv/series/Grimm/seasons", true)
///         .await?
///     {
///         println!("{} ({})", entry.name(), entry.catalog_id());
///     }
///
///     Ok(())
/// }
/// ```
pub struct LostFilmTracker {
    client: TrackerClient,
    state: SessionState,
    credentials: Option<Credentials>,
}

impl LostFilmTracker {
    /// Create a tracker with default settings and no credentials.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(TrackerClient::new()?))
    }

    /// Create a tracker over a pre-configured client.
    ///
    /// # Arguments
    /// * `client` - client built from custom `TrackerSettings`
    pub fn with_client(client: TrackerClient) -> Self {
        Self {
            client,
            state: SessionState::Unauthenticated,
            credentials: None,
        }
    }

    /// Attach credentials.
    ///
    /// A complete cookie triple makes the tracker authenticated right away;
    /// a login/password pair is used on the first operation needing a session.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.state = match &credentials {
            Credentials::Session(cookies) if cookies.is_complete() => {
                SessionState::Authenticated(cookies.clone())
            }
            _ => SessionState::Unauthenticated,
        };
        self.credentials = Some(credentials);
        self
    }

    pub fn client(&self) -> &TrackerClient {
        &self.client
    }

    /// Log in and keep the resulting session.
    ///
    /// Any previous session is dropped first; after a failure the tracker is
    /// unauthenticated and a retry has to start over.
    ///
    /// # Errors
    /// `TrackerError::LoginFailed` carrying the failure code.
    pub async fn login(&mut self, login: &str, password: &str) -> Result<SessionCookies> {
        self.state = SessionState::Unauthenticated;

        let cookies = session::login(&self.client, login, password).await?;
        self.state = SessionState::Authenticated(cookies.clone());
        self.credentials = Some(Credentials::Password {
            login: login.to_string(),
            password: password.to_string(),
        });

        Ok(cookies)
    }

    /// Whether the site still accepts the current session. Never fails.
    pub async fn verify(&self) -> bool {
        match self.state.cookies() {
            Some(cookies) => session::verify(&self.client, cookies).await,
            None => false,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    /// The current cookie triple, if authenticated.
    pub fn session(&self) -> Option<&SessionCookies> {
        self.state.cookies()
    }

    /// Whether `url` is a show page, a seasons page or an episode page.
    ///
    /// `/browse.php?cat=` URLs are rejected here even though
    /// [`parse_url`](Self::parse_url) understands them.
    pub fn can_parse_url(&self, url: &str) -> bool {
        is_series_url(url, self.client.base_url())
    }

    /// Resolve a catalog URL into a catalog entry.
    ///
    /// # Arguments
    /// * `url` - `/series/<slug>[/...]` or `/browse.php?cat=<id>` URL
    /// * `fetch_seasons` - also load seasons and episodes (or, for special
    ///   entries, the release list)
    ///
    /// # Returns
    /// * `Ok(Some(ParsedUrl::Entry(_)))` with the parsed entry
    /// * `Ok(Some(ParsedUrl::Unavailable(_)))` if the site answered non-200
    /// * `Ok(None)` for foreign URLs and pages without a catalog entry
    ///
    /// # Errors
    /// Transport failures only.
    pub async fn parse_url(&self, url: &str, fetch_seasons: bool) -> Result<Option<ParsedUrl>> {
        let Some(target) = CatalogUrl::parse(url, self.client.base_url()) else {
            tracing::debug!(url = %url, "not a catalog URL");
            return Ok(None);
        };

        match target {
            CatalogUrl::Series { slug } => self.parse_series(&slug, fetch_seasons).await,
            CatalogUrl::Browse { cat } => self.parse_browse(cat, fetch_seasons).await,
        }
    }

    /// List the downloadable quality variants of one episode.
    ///
    /// Logs in first if the tracker holds a login/password but no session.
    ///
    /// # Returns
    /// * `Ok(Some(vec))` - possibly empty when nothing is published yet
    /// * `Ok(None)` if `url` is not a show URL
    ///
    /// # Errors
    /// - `TrackerError::NotAuthenticated` - no session and no credentials
    /// - `TrackerError::LoginFailed` - the lazy login failed
    /// - `TrackerError::NotFound` - the episode page does not exist
    pub async fn get_download_info(
        &mut self,
        url: &str,
        season: u32,
        episode: u32,
    ) -> Result<Option<Vec<DownloadInfo>>> {
        let Some(CatalogUrl::Series { slug }) = CatalogUrl::parse(url, self.client.base_url())
        else {
            return Ok(None);
        };

        let cookies = self.ensure_session().await?;
        let page = self
            .client
            .catalog_url(&episode_path(&slug, season, episode))?;
        let html = self.client.fetch(&page, &cookies.as_pairs()).await?;

        let downloads = parse_download_info(&html, season, episode);
        tracing::debug!(
            slug = %slug,
            season,
            episode,
            count = downloads.len(),
            "download variants parsed"
        );

        Ok(Some(downloads))
    }

    async fn parse_series(&self, slug: &str, fetch_seasons: bool) -> Result<Option<ParsedUrl>> {
        let cookies = self.session_pairs();

        let url = self.client.catalog_url(&show_path(slug))?;
        let response = self.client.get_with_retry(&url, &cookies).await?;
        if !response.is_success() {
            tracing::warn!(url = %url, status = response.status, "show page unavailable");
            return Ok(Some(ParsedUrl::Unavailable(response)));
        }

        let Some(mut show) = parse_show(&response.body, slug) else {
            tracing::debug!(url = %url, "no show on page");
            return Ok(None);
        };

        if fetch_seasons {
            let url = self.client.catalog_url(&seasons_path(slug))?;
            let response = self.client.get_with_retry(&url, &cookies).await?;
            if !response.is_success() {
                tracing::warn!(url = %url, status = response.status, "seasons page unavailable");
                return Ok(Some(ParsedUrl::Unavailable(response)));
            }
            show.seasons = parse_seasons(&response.body);
        }

        Ok(Some(ParsedUrl::Entry(CatalogEntry::Show(show))))
    }

    async fn parse_browse(&self, cat: u32, fetch_seasons: bool) -> Result<Option<ParsedUrl>> {
        let cookies = self.session_pairs();

        let url = self.client.catalog_url(&browse_path(cat))?;
        let response = self.client.get_with_retry(&url, &cookies).await?;
        if !response.is_success() {
            tracing::warn!(url = %url, status = response.status, "catalog entry unavailable");
            return Ok(Some(ParsedUrl::Unavailable(response)));
        }

        let Some(mut entry) = parse_special_entry(&response.body, cat) else {
            tracing::debug!(url = %url, "no catalog entry on page");
            return Ok(None);
        };

        if fetch_seasons {
            let (episodes, complete_seasons) = parse_special_releases(&response.body);
            entry.episodes = episodes;
            entry.complete_seasons = complete_seasons;
        }

        Ok(Some(ParsedUrl::Entry(CatalogEntry::Special(entry))))
    }

    async fn ensure_session(&mut self) -> Result<SessionCookies> {
        if let Some(cookies) = self.state.cookies() {
            return Ok(cookies.clone());
        }

        match self.credentials.clone() {
            Some(Credentials::Password { login, password }) => {
                self.login(&login, &password).await
            }
            _ => Err(TrackerError::NotAuthenticated),
        }
    }

    fn session_pairs(&self) -> Vec<(&str, &str)> {
        self.state
            .cookies()
            .map(|cookies| cookies.as_pairs().to_vec())
            .unwrap_or_default()
    }
}
