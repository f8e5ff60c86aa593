//! Release announcement title parser
//!
//! Announcements in the site's feed look like
//! `Люди (Humans). Эпизод 8 [MP4]. (S01E08)`: localized and original show
//! names, localized and (optionally) original episode titles, an optional
//! quality tag and the episode token. The feed is noisy, so anything that
//! does not have this shape yields `None`.

use std::sync::LazyLock;

use regex_lite::Regex;

use crate::types::{ParsedTitle, Quality};

/// Episode number the site uses for a full-season bundle
pub const COMPLETE_SEASON_EPISODE: u32 = 99;

static RSS_TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?P<name>[^(]+)\s+\((?P<original_name>[^(]+)\)\.\s+",
        r"(?P<title>[^(\[]+)(?:\s+\((?P<original_title>[^(]+)\))?",
        r"(?:\s+\[(?P<quality>[^\]]+)\])?\.\s+\((?P<episode_info>[^)]+)\)\s*$",
    ))
    .unwrap()
});

static EPISODE_INFO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^S(\d{1,3})E(\d{1,3})(?:E(\d{1,3}))?$").unwrap());

static EPISODE_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bS(\d{1,3})E(\d{1,3})(?:E(\d{1,3}))?\b").unwrap());

/// Season and episode numbers named by an `SxxEyy[Ezz]` token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeInfo {
    pub season: u32,
    /// One number, or two for a combined release
    pub episodes: Vec<u32>,
}

impl EpisodeInfo {
    fn from_captures(caps: &regex_lite::Captures<'_>) -> Option<Self> {
        let season = caps.get(1)?.as_str().parse().ok()?;
        let mut episodes = vec![caps.get(2)?.as_str().parse().ok()?];
        if let Some(second) = caps.get(3) {
            episodes.push(second.as_str().parse().ok()?);
        }
        Some(Self { season, episodes })
    }

    /// The number surfaced as "the" episode: the last one of the token.
    pub fn episode(&self) -> u32 {
        self.episodes.last().copied().unwrap_or_default()
    }

    pub fn covers(&self, season: u32, episode: u32) -> bool {
        self.season == season && self.episodes.contains(&episode)
    }
}

/// Parse a whole episode token such as `S01E05` or `S03E01E02`.
///
/// # Examples
/// ```
/// use lostfilm_core::parser::parse_episode_info;
///
/// let info = parse_episode_info("S03E01E02").unwrap();
/// assert_eq!(info.season, 3);
/// assert_eq!(info.episodes, vec![1, 2]);
/// assert!(parse_episode_info("S01E").is_none());
/// ```
pub fn parse_episode_info(token: &str) -> Option<EpisodeInfo> {
    let caps = EPISODE_INFO_RE.captures(token.trim())?;
    EpisodeInfo::from_captures(&caps)
}

/// Find every episode token embedded in free text.
pub fn find_episode_tokens(text: &str) -> Vec<EpisodeInfo> {
    EPISODE_TOKEN_RE
        .captures_iter(text)
        .filter_map(|caps| EpisodeInfo::from_captures(&caps))
        .collect()
}

/// Parse a release announcement title.
///
/// Returns `None` for anything that does not have the announcement shape.
///
/// # Examples
/// ```
/// use lostfilm_core::{parse_rss_title, Quality};
///
/// let parsed = parse_rss_title("Люди (Humans). Эпизод 8 [MP4]. (S01E08)").unwrap();
/// assert_eq!(parsed.original_name, "Humans");
/// assert_eq!(parsed.quality, Quality::Hd720);
/// assert_eq!((parsed.season, parsed.episode), (1, 8));
///
/// assert!(parse_rss_title("Люди (Humans). Эпизод 8. (S01E)").is_none());
/// ```
pub fn parse_rss_title(text: &str) -> Option<ParsedTitle> {
    let caps = RSS_TITLE_RE.captures(text.trim())?;

    let episode_info = caps.name("episode_info")?.as_str().trim().to_string();
    let info = parse_episode_info(&episode_info)?;

    let quality = caps
        .name("quality")
        .map(|tag| Quality::from_tag(tag.as_str()))
        .unwrap_or(Quality::Sd);

    Some(ParsedTitle {
        name: caps.name("name")?.as_str().trim().to_string(),
        original_name: caps.name("original_name")?.as_str().trim().to_string(),
        title: caps.name("title")?.as_str().trim().to_string(),
        original_title: caps
            .name("original_title")
            .map(|m| m.as_str().trim().to_string()),
        quality,
        season: info.season,
        episode: info.episode(),
        episode_info,
    })
}
