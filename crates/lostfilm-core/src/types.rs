//! Data types for the LostFilm tracker client
//!
//! Everything here is built fresh by the parsers on every call.
//! All types implement Serialize and Deserialize so the scheduler can
//! persist or forward them as JSON.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Video quality of a release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quality {
    #[serde(rename = "SD")]
    Sd,
    #[serde(rename = "720p")]
    Hd720,
    #[serde(rename = "1080p")]
    Hd1080,
    #[serde(rename = "unknown")]
    Unknown,
}

impl Quality {
    /// Map a quality tag as written by the site (`MP4`, `1080p`, `SD` ...).
    ///
    /// # Examples
    /// ```
    /// use lostfilm_core::Quality;
    ///
    /// assert_eq!(Quality::from_tag("MP4"), Quality::Hd720);
    /// assert_eq!(Quality::from_tag("1080p"), Quality::Hd1080);
    /// assert_eq!(Quality::from_tag("WEBRip"), Quality::Unknown);
    /// ```
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "sd" => Quality::Sd,
            "mp4" | "hd" | "720" | "720p" => Quality::Hd720,
            "1080" | "1080p" | "fullhd" => Quality::Hd1080,
            _ => Quality::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Sd => "SD",
            Quality::Hd720 => "720p",
            Quality::Hd1080 => "1080p",
            Quality::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key of a season inside a show.
///
/// Ordinal seasons sort before the bonus season. Serialized as a plain
/// string (`"3"`, `"additional"`) so it can be used as a JSON map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SeasonKey {
    Number(u32),
    Additional,
}

impl fmt::Display for SeasonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeasonKey::Number(n) => write!(f, "{}", n),
            SeasonKey::Additional => f.write_str("additional"),
        }
    }
}

impl FromStr for SeasonKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("additional") {
            return Ok(SeasonKey::Additional);
        }
        s.parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .map(SeasonKey::Number)
            .ok_or_else(|| format!("invalid season key: {}", s))
    }
}

impl Serialize for SeasonKey {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SeasonKey {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A released episode.
///
/// Combined-file releases carry a `second_episode_number`; the owning
/// season then stores the same `Arc<Episode>` under both numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub episode_number: u32,
    pub second_episode_number: Option<u32>,
    /// Localized (Russian) title
    pub title: String,
    pub original_title: Option<String>,
    /// Site-relative path of the episode page
    pub url: Option<String>,
}

/// Released episodes of one season, keyed by episode number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    pub key: SeasonKey,
    pub episodes: BTreeMap<u32, Arc<Episode>>,
}

impl Season {
    pub fn new(key: SeasonKey) -> Self {
        Self {
            key,
            episodes: BTreeMap::new(),
        }
    }

    /// Record an episode under every number it covers.
    pub fn insert(&mut self, episode: Episode) {
        let episode = Arc::new(episode);
        self.episodes
            .insert(episode.episode_number, Arc::clone(&episode));
        if let Some(second) = episode.second_episode_number {
            self.episodes.insert(second, episode);
        }
    }
}

/// A regular show with a season/episode hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Show {
    /// Numeric catalog identifier (`cat`)
    pub catalog_id: u32,
    /// Slug used in `/series/<slug>` URLs
    pub url_fragment: String,
    /// Localized (Russian) name
    pub name: String,
    pub original_name: String,
    /// Empty unless seasons were requested
    pub seasons: BTreeMap<SeasonKey, Season>,
}

/// One release of a special entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialEpisode {
    pub season_number: u32,
    pub episode_number: u32,
    pub title: String,
    pub original_title: Option<String>,
}

/// A catalog entry published as a flat release list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialEntry {
    pub catalog_id: u32,
    pub name: String,
    pub original_name: String,
    pub episodes: Vec<SpecialEpisode>,
    /// Seasons released as a single full-season bundle
    pub complete_seasons: BTreeSet<u32>,
}

/// Result shape of a catalog lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalogEntry {
    Show(Show),
    Special(SpecialEntry),
}

impl CatalogEntry {
    pub fn catalog_id(&self) -> u32 {
        match self {
            CatalogEntry::Show(show) => show.catalog_id,
            CatalogEntry::Special(special) => special.catalog_id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CatalogEntry::Show(show) => &show.name,
            CatalogEntry::Special(special) => &special.name,
        }
    }

    pub fn original_name(&self) -> &str {
        match self {
            CatalogEntry::Show(show) => &show.original_name,
            CatalogEntry::Special(special) => &special.original_name,
        }
    }
}

/// Raw HTTP response, kept when the site answered with something other
/// than a page we can parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamResponse {
    pub status: u16,
    /// Final URL of the request (after redirects, if any were followed)
    pub url: String,
    /// `Location` header of a redirect
    pub location: Option<String>,
    /// Cookies set by this response, in header order
    pub cookies: Vec<(String, String)>,
    pub body: String,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Outcome of `parse_url` for a URL of the right shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ParsedUrl {
    Entry(CatalogEntry),
    /// The site answered with a non-200 status
    Unavailable(UpstreamResponse),
}

/// Structured form of a release announcement title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedTitle {
    pub name: String,
    pub original_name: String,
    pub title: String,
    pub original_title: Option<String>,
    pub quality: Quality,
    /// Raw episode token, e.g. `S03E01E02`
    pub episode_info: String,
    pub season: u32,
    /// Last episode number of the token
    pub episode: u32,
}

impl ParsedTitle {
    /// All episode numbers named by the episode token.
    pub fn episode_numbers(&self) -> Vec<u32> {
        crate::parser::parse_episode_info(&self.episode_info)
            .map(|info| info.episodes)
            .unwrap_or_else(|| vec![self.episode])
    }

    /// Episode 99 is how the site announces a full-season bundle.
    pub fn is_complete_season(&self) -> bool {
        self.episode == crate::parser::COMPLETE_SEASON_EPISODE
    }
}

/// One downloadable quality variant of an episode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadInfo {
    pub quality: Quality,
    pub download_url: String,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode(number: u32, second: Option<u32>) -> Episode {
        Episode {
            episode_number: number,
            second_episode_number: second,
            title: "Идите дальше".to_string(),
            original_title: Some("Move On".to_string()),
            url: None,
        }
    }

    #[test]
    fn test_quality_serialization() {
        assert_eq!(serde_json::to_string(&Quality::Sd).unwrap(), "\"SD\"");
        assert_eq!(serde_json::to_string(&Quality::Hd720).unwrap(), "\"720p\"");
        assert_eq!(serde_json::to_string(&Quality::Hd1080).unwrap(), "\"1080p\"");
        assert_eq!(
            serde_json::to_string(&Quality::Unknown).unwrap(),
            "\"unknown\""
        );
    }

    #[test]
    fn test_quality_from_tag() {
        assert_eq!(Quality::from_tag("SD"), Quality::Sd);
        assert_eq!(Quality::from_tag("mp4"), Quality::Hd720);
        assert_eq!(Quality::from_tag(" 720p "), Quality::Hd720);
        assert_eq!(Quality::from_tag("1080"), Quality::Hd1080);
        assert_eq!(Quality::from_tag("WEBRip"), Quality::Unknown);
        assert_eq!(Quality::Hd1080.to_string(), "1080p");
    }

    #[test]
    fn test_season_key_ordering() {
        let mut keys = vec![
            SeasonKey::Additional,
            SeasonKey::Number(10),
            SeasonKey::Number(2),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                SeasonKey::Number(2),
                SeasonKey::Number(10),
                SeasonKey::Additional
            ]
        );
    }

    #[test]
    fn test_season_key_parse() {
        assert_eq!("4".parse::<SeasonKey>(), Ok(SeasonKey::Number(4)));
        assert_eq!("additional".parse::<SeasonKey>(), Ok(SeasonKey::Additional));
        assert!("0".parse::<SeasonKey>().is_err());
        assert!("bonus".parse::<SeasonKey>().is_err());
    }

    #[test]
    fn test_season_map_serializes_with_string_keys() {
        let mut seasons = BTreeMap::new();
        seasons.insert(SeasonKey::Number(1), Season::new(SeasonKey::Number(1)));
        seasons.insert(SeasonKey::Additional, Season::new(SeasonKey::Additional));

        let json = serde_json::to_value(&seasons).unwrap();
        assert!(json.get("1").is_some());
        assert!(json.get("additional").is_some());

        let back: BTreeMap<SeasonKey, Season> = serde_json::from_value(json).unwrap();
        assert_eq!(back, seasons);
    }

    #[test]
    fn test_season_insert_double_episode_shares_entry() {
        let mut season = Season::new(SeasonKey::Number(3));
        season.insert(episode(1, Some(2)));
        season.insert(episode(3, None));

        assert_eq!(season.episodes.len(), 3);
        assert!(Arc::ptr_eq(&season.episodes[&1], &season.episodes[&2]));
        assert_eq!(season.episodes[&3].episode_number, 3);
    }

    #[test]
    fn test_catalog_entry_accessors() {
        let entry = CatalogEntry::Special(SpecialEntry {
            catalog_id: 112,
            name: "Доктор Кто".to_string(),
            original_name: "Doctor Who".to_string(),
            episodes: Vec::new(),
            complete_seasons: BTreeSet::new(),
        });
        assert_eq!(entry.catalog_id(), 112);
        assert_eq!(entry.name(), "Доктор Кто");
        assert_eq!(entry.original_name(), "Doctor Who");

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["kind"], "special");
    }

    #[test]
    fn test_upstream_response_helpers() {
        let response = UpstreamResponse {
            status: 302,
            url: "https://www.lostfilm.tv/blg.php?ref=random".to_string(),
            location: Some("/".to_string()),
            cookies: vec![
                ("uid".to_string(), "151548".to_string()),
                ("pass".to_string(), "dd770c24".to_string()),
            ],
            body: String::new(),
        };
        assert!(response.is_redirect());
        assert!(!response.is_success());
        assert_eq!(response.cookie("pass"), Some("dd770c24"));
        assert_eq!(response.cookie("usess"), None);
    }

    #[test]
    fn test_parsed_title_episode_numbers() {
        let parsed = ParsedTitle {
            name: "Под куполом".to_string(),
            original_name: "Under the Dome".to_string(),
            title: "Идите дальше".to_string(),
            original_title: None,
            quality: Quality::Hd1080,
            episode_info: "S03E01E02".to_string(),
            season: 3,
            episode: 2,
        };
        assert_eq!(parsed.episode_numbers(), vec![1, 2]);
        assert!(!parsed.is_complete_season());
    }
}
