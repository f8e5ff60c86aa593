//! Download micro-page parser
//!
//! The per-episode page lists one `div.inner-box--item` per quality. Each
//! block names its release (`... (S04E22)`), a quality label and a link.

use scraper::{Html, Selector};

use crate::types::{DownloadInfo, Quality};

use super::title::find_episode_tokens;

/// Parse the quality variants of `season`/`episode` from a download page.
///
/// Blocks for other episodes and blocks with an unrecognized quality label
/// are ignored; an empty vector means nothing is published yet.
pub fn parse_download_info(html: &str, season: u32, episode: u32) -> Vec<DownloadInfo> {
    let document = Html::parse_document(html);
    let mut downloads = Vec::new();

    let (Ok(item_selector), Ok(label_selector), Ok(link_selector), Ok(desc_selector)) = (
        Selector::parse("div.inner-box--item"),
        Selector::parse(".inner-box--label"),
        Selector::parse(".inner-box--link a[href]"),
        Selector::parse(".inner-box--desc"),
    ) else {
        return downloads;
    };

    for item in document.select(&item_selector) {
        let text = item.text().collect::<String>();
        if !find_episode_tokens(&text)
            .iter()
            .any(|info| info.covers(season, episode))
        {
            continue;
        }

        let label = item
            .select(&label_selector)
            .next()
            .map(|el| el.text().collect::<String>())
            .unwrap_or_default();
        let quality = Quality::from_tag(&label);
        if quality == Quality::Unknown {
            tracing::debug!(label = %label.trim(), "skipping download block with unknown quality");
            continue;
        }

        let Some(download_url) = item
            .select(&link_selector)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(|href| href.trim().to_string())
            .filter(|href| !href.is_empty())
        else {
            continue;
        };

        let description = item
            .select(&desc_selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|d| !d.is_empty());

        downloads.push(DownloadInfo {
            quality,
            download_url,
            description,
        });
    }

    downloads
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(label: &str, token: &str, href: &str) -> String {
        format!(
            r#"<div class="inner-box--item">
                <div class="inner-box--label">{label}</div>
                <div class="inner-box--link main"><a href="{href}">Гримм (Grimm). Серия ({token})</a></div>
                <div class="inner-box--desc">Видео: {label}</div>
            </div>"#
        )
    }

    fn page(items: &[String]) -> String {
        format!("<html><body>{}</body></html>", items.join("\n"))
    }

    #[test]
    fn test_parse_all_qualities() {
        let html = page(&[
            item("SD", "S04E22", "http://tracktor.in/td.php?s=sd"),
            item("1080", "S04E22", "http://tracktor.in/td.php?s=1080"),
            item("MP4", "S04E22", "http://tracktor.in/td.php?s=mp4"),
        ]);

        let downloads = parse_download_info(&html, 4, 22);
        assert_eq!(downloads.len(), 3);

        let mut qualities: Vec<&str> = downloads.iter().map(|d| d.quality.as_str()).collect();
        qualities.sort();
        assert_eq!(qualities, vec!["1080p", "720p", "SD"]);
        assert_eq!(downloads[0].download_url, "http://tracktor.in/td.php?s=sd");
        assert_eq!(downloads[0].description.as_deref(), Some("Видео: SD"));
    }

    #[test]
    fn test_parse_ignores_other_episodes() {
        let html = page(&[
            item("SD", "S04E09", "http://tracktor.in/td.php?s=9sd"),
            item("SD", "S04E10", "http://tracktor.in/td.php?s=10sd"),
            item("MP4", "S04E10", "http://tracktor.in/td.php?s=10mp4"),
        ]);

        let early = parse_download_info(&html, 4, 9);
        assert_eq!(early.len(), 1);
        assert_eq!(early[0].quality, Quality::Sd);

        let later = parse_download_info(&html, 4, 10);
        assert_eq!(later.len(), 2);
        assert!(later.iter().any(|d| d.quality == Quality::Sd));
        assert!(later.iter().any(|d| d.quality == Quality::Hd720));
    }

    #[test]
    fn test_parse_combined_release_block() {
        let html = page(&[item("1080", "S03E01E02", "http://tracktor.in/td.php?s=x")]);
        assert_eq!(parse_download_info(&html, 3, 1).len(), 1);
        assert_eq!(parse_download_info(&html, 3, 2).len(), 1);
        assert!(parse_download_info(&html, 3, 3).is_empty());
    }

    #[test]
    fn test_parse_skips_unknown_quality_and_missing_link() {
        let no_link = r#"<div class="inner-box--item">
            <div class="inner-box--label">SD</div>
            <div class="inner-box--link">(S04E22)</div>
        </div>"#;
        let html = page(&[
            item("WEBRip", "S04E22", "http://tracktor.in/td.php?s=web"),
            no_link.to_string(),
        ]);
        assert!(parse_download_info(&html, 4, 22).is_empty());
    }

    #[test]
    fn test_parse_empty_page() {
        assert!(parse_download_info("<html><body></body></html>", 1, 1).is_empty());
    }
}
