use lostfilm_core::{CatalogEntry, Credentials, LostFilmTracker, ParsedUrl, SeasonKey};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lostfilm_core=debug")),
        )
        .init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://www.lostfilm.tv/series/Grimm/seasons".to_string());

    let mut tracker = LostFilmTracker::new()?;
    if let (Ok(login), Ok(password)) = (
        std::env::var("LOSTFILM_LOGIN"),
        std::env::var("LOSTFILM_PASSWORD"),
    ) {
        tracker = tracker.with_credentials(Credentials::Password {
            login: login.clone(),
            password: password.clone(),
        });
        let cookies = tracker.login(&login, &password).await?;
        println!("Logged in as uid {}", cookies.uid);
        println!("Session valid: {}", tracker.verify().await);
    }

    println!("\nResolving {}\n", url);
    let entry = match tracker.parse_url(&url, true).await? {
        Some(ParsedUrl::Entry(entry)) => entry,
        Some(ParsedUrl::Unavailable(response)) => {
            println!("Site answered {} for {}", response.status, response.url);
            return Ok(());
        }
        None => {
            println!("Not a catalog entry");
            return Ok(());
        }
    };

    println!("{} / {} (cat {})", entry.name(), entry.original_name(), entry.catalog_id());

    match &entry {
        CatalogEntry::Show(show) => {
            for (key, season) in &show.seasons {
                println!("  season {}: {} episodes", key, season.episodes.len());
            }

            let latest = show.seasons.iter().rev().find_map(|(key, season)| match key {
                SeasonKey::Number(n) => season.episodes.keys().next_back().map(|e| (*n, *e)),
                SeasonKey::Additional => None,
            });

            if let (Some((season, episode)), true) = (latest, tracker.is_authenticated()) {
                println!("\nDownloads for S{:02}E{:02}:", season, episode);
                if let Some(downloads) = tracker.get_download_info(&url, season, episode).await? {
                    for download in downloads {
                        println!("  [{}] {}", download.quality, download.download_url);
                    }
                }
            }
        }
        CatalogEntry::Special(special) => {
            println!("  {} releases", special.episodes.len());
            println!("  complete seasons: {:?}", special.complete_seasons);
        }
    }

    Ok(())
}
