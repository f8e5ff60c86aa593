//! Show page and seasons page parser for LostFilm.TV
//!
//! The show header (names and catalog id) lives in a stable block present on
//! both `/series/<slug>/` and `/series/<slug>/seasons/`. The seasons page
//! lists one `div.serie-block` per season with a table of episode rows.

use std::collections::BTreeMap;

use scraper::{ElementRef, Html, Selector};

use crate::types::{Episode, Season, SeasonKey, Show};

/// Parse the show header.
///
/// # Returns
/// * `Some(Show)` with an empty season map
/// * `None` if the page carries no show header (the site's "not found" page)
pub fn parse_show(html: &str, slug: &str) -> Option<Show> {
    let document = Html::parse_document(html);

    let block_selector = Selector::parse("div.title-block").ok()?;
    let block = document.select(&block_selector).next()?;

    let name = first_text(&block, ".title-ru")?;
    let original_name = first_text(&block, ".title-en").unwrap_or_else(|| name.clone());
    let catalog_id = extract_catalog_id(html)?;

    Some(Show {
        catalog_id,
        url_fragment: slug.to_string(),
        name,
        original_name,
        seasons: BTreeMap::new(),
    })
}

/// Extract the catalog id from the follow button (`FollowSerial(160)`).
pub fn extract_catalog_id(html: &str) -> Option<u32> {
    let re = regex_lite::Regex::new(r"FollowSerial\((\d+)").ok()?;
    let caps = re.captures(html)?;
    caps.get(1)?.as_str().parse::<u32>().ok().filter(|id| *id > 0)
}

/// Parse the seasons page into released seasons and episodes.
///
/// Rows marked `not-available` are skipped and seasons without a single
/// released episode are left out.
pub fn parse_seasons(html: &str) -> BTreeMap<SeasonKey, Season> {
    let document = Html::parse_document(html);
    let mut seasons: BTreeMap<SeasonKey, Season> = BTreeMap::new();

    let (Ok(block_selector), Ok(header_selector), Ok(row_selector)) = (
        Selector::parse("div.serie-block"),
        Selector::parse("h2"),
        Selector::parse("table.movie-parts-list tr"),
    ) else {
        return seasons;
    };

    for block in document.select(&block_selector) {
        let header = block
            .select(&header_selector)
            .next()
            .map(|h| h.text().collect::<String>())
            .unwrap_or_default();
        let key = parse_season_key(&header);

        for row in block.select(&row_selector) {
            if row.value().classes().any(|c| c == "not-available") {
                continue;
            }
            if let Some(episode) = parse_episode_row(&row) {
                seasons
                    .entry(key)
                    .or_insert_with(|| Season::new(key))
                    .insert(episode);
            }
        }
    }

    seasons
}

/// Map a season header to its key: `"6 сезон"` is season 6, anything
/// without a season number is the bonus season.
pub fn parse_season_key(header: &str) -> SeasonKey {
    let text = header.to_lowercase();
    regex_lite::Regex::new(r"(?:(\d+)\s*сезон|сезон\s*(\d+))")
        .ok()
        .and_then(|re| {
            let caps = re.captures(&text)?;
            caps.get(1).or_else(|| caps.get(2))?.as_str().parse::<u32>().ok()
        })
        .filter(|n| *n > 0)
        .map(SeasonKey::Number)
        .unwrap_or(SeasonKey::Additional)
}

fn parse_episode_row(row: &ElementRef) -> Option<Episode> {
    let beta_selector = Selector::parse("td.beta").ok()?;
    let beta = row.select(&beta_selector).next();

    let onclick = beta
        .and_then(|b| b.value().attr("onclick"))
        .or_else(|| row.value().attr("onclick"));
    let url = onclick.and_then(extract_goto_path);

    let beta_text = beta
        .map(|b| b.text().collect::<String>())
        .unwrap_or_default();
    let (episode_number, second_episode_number) = parse_episode_numbers(&beta_text)
        .or_else(|| url.as_deref().and_then(episode_number_from_path).map(|n| (n, None)))?;

    let (title, original_title) = extract_titles(row);

    Some(Episode {
        episode_number,
        second_episode_number,
        title,
        original_title,
        url,
    })
}

/// Episode number(s) from row text like `"6 сезон 13 серия"` or `"3 сезон 1-2 серия"`.
fn parse_episode_numbers(text: &str) -> Option<(u32, Option<u32>)> {
    let text = text.to_lowercase();
    let re = regex_lite::Regex::new(r"(\d+)(?:\s*-\s*(\d+))?\s*серия").ok()?;
    let caps = re.captures(&text)?;
    let first: u32 = caps.get(1)?.as_str().parse().ok()?;
    let second = caps
        .get(2)
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .filter(|n| *n != first);
    Some((first, second))
}

/// Path from `goTo('/series/Grimm/season_6/episode_13/',false)`.
fn extract_goto_path(onclick: &str) -> Option<String> {
    let re = regex_lite::Regex::new(r"goTo\('([^']+)'").ok()?;
    Some(re.captures(onclick)?.get(1)?.as_str().to_string())
}

fn episode_number_from_path(path: &str) -> Option<u32> {
    let re = regex_lite::Regex::new(r"episode_(\d+)").ok()?;
    re.captures(path)?.get(1)?.as_str().parse().ok()
}

/// Localized title is the first text of the cell, the original sits in a span.
fn extract_titles(row: &ElementRef) -> (String, Option<String>) {
    let Ok(gamma_selector) = Selector::parse("td.gamma") else {
        return (String::new(), None);
    };
    let Some(gamma) = row.select(&gamma_selector).next() else {
        return (String::new(), None);
    };

    let title = gamma
        .text()
        .map(str::trim)
        .find(|t| !t.is_empty())
        .unwrap_or_default()
        .to_string();
    let original_title = first_text(&gamma, "span").filter(|t| *t != title);

    (title, original_title)
}

fn first_text(element: &ElementRef, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    let text = element
        .select(&selector)
        .next()?
        .text()
        .collect::<String>()
        .trim()
        .to_string();
    (!text.is_empty()).then_some(text)
}
