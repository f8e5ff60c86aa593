//! Parser for catalog entries addressed as `/browse.php?cat=<id>`
//!
//! These pages list releases as flat rows (`div.t_row`) rather than a
//! season table. Each row is numbered `<season>.<episode>`; the episode
//! number 99 marks a full-season bundle.

use std::collections::{BTreeSet, HashSet};

use scraper::{Html, Selector};

use crate::types::{SpecialEntry, SpecialEpisode};

use super::title::COMPLETE_SEASON_EPISODE;

/// Parse the entry header.
///
/// # Returns
/// * `Some(SpecialEntry)` without releases
/// * `None` if the page has no entry header
pub fn parse_special_entry(html: &str, catalog_id: u32) -> Option<SpecialEntry> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("div.mid h1").ok()?;
    let header = document
        .select(&selector)
        .next()?
        .text()
        .collect::<String>();

    let (name, original_name) = split_bilingual(&header)?;

    Some(SpecialEntry {
        catalog_id,
        original_name: original_name.unwrap_or_else(|| name.clone()),
        name,
        episodes: Vec::new(),
        complete_seasons: BTreeSet::new(),
    })
}

/// Parse the release rows into episodes and complete-season bundles.
///
/// The same episode listed once per quality is reported once.
pub fn parse_special_releases(html: &str) -> (Vec<SpecialEpisode>, BTreeSet<u32>) {
    let document = Html::parse_document(html);
    let mut episodes = Vec::new();
    let mut complete_seasons = BTreeSet::new();
    let mut seen = HashSet::new();

    let (Ok(row_selector), Ok(number_selector), Ok(title_selector)) = (
        Selector::parse("div.t_row"),
        Selector::parse(".t_episode_num"),
        Selector::parse(".torrent_title"),
    ) else {
        return (episodes, complete_seasons);
    };

    for row in document.select(&row_selector) {
        let Some((season, episode)) = row
            .select(&number_selector)
            .next()
            .and_then(|el| parse_release_number(&el.text().collect::<String>()))
        else {
            continue;
        };

        if episode == COMPLETE_SEASON_EPISODE {
            complete_seasons.insert(season);
            continue;
        }

        if !seen.insert((season, episode)) {
            continue;
        }

        let title_text = row
            .select(&title_selector)
            .next()
            .map(|el| el.text().collect::<String>())
            .unwrap_or_default();
        let (title, original_title) = split_bilingual(&title_text).unwrap_or_default();

        episodes.push(SpecialEpisode {
            season_number: season,
            episode_number: episode,
            title,
            original_title,
        });
    }

    (episodes, complete_seasons)
}

/// `"3.05"` -> `(3, 5)`
fn parse_release_number(text: &str) -> Option<(u32, u32)> {
    let re = regex_lite::Regex::new(r"(\d+)\s*\.\s*(\d+)").ok()?;
    let caps = re.captures(text)?;
    let season: u32 = caps.get(1)?.as_str().parse().ok()?;
    let episode: u32 = caps.get(2)?.as_str().parse().ok()?;
    Some((season, episode))
}

/// Split `"Доктор Кто (Doctor Who)"` into the localized and original parts.
fn split_bilingual(text: &str) -> Option<(String, Option<String>)> {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return None;
    }

    if let Some(stripped) = text.strip_suffix(')') {
        if let Some(idx) = stripped.rfind(" (") {
            let local = stripped[..idx].trim().to_string();
            let original = stripped[idx + 2..].trim().to_string();
            if !local.is_empty() && !original.is_empty() {
                return Some((local, Some(original)));
            }
        }
    }

    Some((text, None))
}
