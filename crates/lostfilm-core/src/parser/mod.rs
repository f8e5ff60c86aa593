//! Parsers for LostFilm.TV pages and feed titles
//!
//! - `url`: recognize catalog URLs
//! - `show`: show header and seasons page
//! - `special`: flat `/browse.php?cat=` entries
//! - `download`: per-episode download page
//! - `title`: release announcement titles

pub mod download;
pub mod show;
pub mod special;
pub mod title;
pub mod url;

// Re-export main parsing functions
pub use download::parse_download_info;
pub use show::{extract_catalog_id, parse_season_key, parse_seasons, parse_show};
pub use special::{parse_special_entry, parse_special_releases};
pub use title::{
    find_episode_tokens, parse_episode_info, parse_rss_title, EpisodeInfo,
    COMPLETE_SEASON_EPISODE,
};
pub use url::{is_series_url, CatalogUrl};
