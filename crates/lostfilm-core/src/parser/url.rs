//! Catalog URL recognition
//!
//! Two URL families lead to catalog entries:
//! - `/series/<slug>[/...]` for regular shows (also the seasons page and
//!   the per-episode pages below it)
//! - `/browse.php?cat=<id>` for entries only reachable by category id

use reqwest::Url;

use crate::client::same_site;

/// A recognized catalog URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogUrl {
    Series { slug: String },
    Browse { cat: u32 },
}

impl CatalogUrl {
    /// Recognize `url` as a catalog URL on the site rooted at `base`.
    ///
    /// # Examples
    /// ```
    /// use lostfilm_core::parser::CatalogUrl;
    /// use reqwest::Url;
    ///
    /// let base = Url::parse("https://www.lostfilm.tv").unwrap();
    /// assert_eq!(
    ///     CatalogUrl::parse("http://www.lostfilm.tv/series/Grimm/seasons", &base),
    ///     Some(CatalogUrl::Series { slug: "Grimm".to_string() })
    /// );
    /// assert_eq!(CatalogUrl::parse("http://www.lostfilm.tv/my.php", &base), None);
    /// ```
    pub fn parse(url: &str, base: &Url) -> Option<Self> {
        let url = Url::parse(url.trim()).ok()?;
        if !matches!(url.scheme(), "http" | "https") || !same_site(base, &url) {
            return None;
        }

        let mut segments = url.path_segments()?;
        match segments.next()? {
            "series" => {
                let slug = segments.next().filter(|s| !s.is_empty())?;
                Some(CatalogUrl::Series {
                    slug: slug.to_string(),
                })
            }
            "browse.php" => {
                let cat = url
                    .query_pairs()
                    .find(|(key, _)| key == "cat")
                    .and_then(|(_, value)| value.parse::<u32>().ok())?;
                Some(CatalogUrl::Browse { cat })
            }
            _ => None,
        }
    }

    pub fn slug(&self) -> Option<&str> {
        match self {
            CatalogUrl::Series { slug } => Some(slug),
            CatalogUrl::Browse { .. } => None,
        }
    }
}

/// Whether `url` is a show page (or a page below it) on the site at `base`.
pub fn is_series_url(url: &str, base: &Url) -> bool {
    matches!(CatalogUrl::parse(url, base), Some(CatalogUrl::Series { .. }))
}

pub fn show_path(slug: &str) -> String {
    format!("/series/{}/", slug)
}

pub fn seasons_path(slug: &str) -> String {
    format!("/series/{}/seasons/", slug)
}

pub fn episode_path(slug: &str, season: u32, episode: u32) -> String {
    format!("/series/{}/season_{}/episode_{}/", slug, season, episode)
}

pub fn browse_path(cat: u32) -> String {
    format!("/browse.php?cat={}", cat)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.lostfilm.tv").unwrap()
    }

    #[test]
    fn test_series_urls() {
        let base = base();
        for url in [
            "http://www.lostfilm.tv/series/12_Monkeys/seasons",
            "http://www.lostfilm.tv/series/12_Monkeys/bombolaya",
            "http://www.lostfilm.tv/series/12_Monkeys",
            "https://www.lostfilm.tv/series/12_Monkeys/",
            "https://www.lostfilm.tv/series/12_Monkeys/season_3/episode_10/",
        ] {
            assert_eq!(
                CatalogUrl::parse(url, &base),
                Some(CatalogUrl::Series {
                    slug: "12_Monkeys".to_string()
                }),
                "{}",
                url
            );
            assert!(is_series_url(url, &base));
        }
    }

    #[test]
    fn test_browse_url() {
        let base = base();
        assert_eq!(
            CatalogUrl::parse("http://www.lostfilm.tv/browse.php?cat=112", &base),
            Some(CatalogUrl::Browse { cat: 112 })
        );
        assert!(!is_series_url(
            "http://www.lostfilm.tv/browse.php?cat=112",
            &base
        ));
        assert_eq!(
            CatalogUrl::parse("http://www.lostfilm.tv/browse.php?cat=abc", &base),
            None
        );
    }

    #[test]
    fn test_rejected_urls() {
        let base = base();
        for url in [
            "http://www.lostfilm.tv/my.php",
            "http://www.lostfilm.tv/not_a_series/SuperSeries",
            "http://www.lostfilm.tv/browse_wrong.php?cat=2",
            "http://www.lostfilm.tv/series/",
            "http://www.example.com/series/Grimm",
            "ftp://www.lostfilm.tv/series/Grimm",
            "not a url",
        ] {
            assert_eq!(CatalogUrl::parse(url, &base), None, "{}", url);
        }
    }

    #[test]
    fn test_paths() {
        assert_eq!(show_path("Grimm"), "/series/Grimm/");
        assert_eq!(seasons_path("Grimm"), "/series/Grimm/seasons/");
        assert_eq!(
            episode_path("Grimm", 4, 22),
            "/series/Grimm/season_4/episode_22/"
        );
        assert_eq!(browse_path(112), "/browse.php?cat=112");
    }

    #[test]
    fn test_slug_accessor() {
        let series = CatalogUrl::Series {
            slug: "Sherlock".to_string(),
        };
        assert_eq!(series.slug(), Some("Sherlock"));
        assert_eq!(CatalogUrl::Browse { cat: 1 }.slug(), None);
    }
}
