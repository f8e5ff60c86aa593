//! LostFilm.TV Tracker Core Library
//!
//! This crate provides the tracker client for LostFilm.TV used by an
//! automated release monitor.
//!
//! # Features
//! - Cross-domain login producing the `uid`/`pass`/`usess` cookie triple
//! - Resolve catalog URLs into shows with seasons and episodes
//! - Per-episode download variants by quality
//! - Parse release announcement titles from the RSS feed
//! - Rate-limited HTTP client with configurable proxies and TLS checks

pub mod client;
pub mod error;
pub mod parser;
pub mod session;
pub mod tracker;
pub mod types;

// Re-export main types for convenience
pub use client::{RateLimiter, TrackerClient, TrackerSettings};
pub use error::{LoginFailure, Result, TrackerError};
pub use parser::parse_rss_title;
pub use session::{Credentials, SessionCookies, SessionState};
pub use tracker::LostFilmTracker;
pub use types::{
    CatalogEntry, DownloadInfo, Episode, ParsedTitle, ParsedUrl, Quality, Season, SeasonKey,
    Show, SpecialEntry, SpecialEpisode, UpstreamResponse,
};
