//! Dataset download with an on-disk cache

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::FETCH_TIMEOUT_SECS;
use crate::logic::error::{Error, Result};

/// File name a URL is cached under (last path segment, query stripped)
pub fn cache_file_name(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty() && !s.contains(':'))
        .unwrap_or("download.csv")
        .to_string()
}

/// Download `url` into `cache_dir`, reusing the cached copy unless `refresh`
pub fn download(url: &str, cache_dir: &Path, refresh: bool) -> Result<PathBuf> {
    let target = cache_dir.join(cache_file_name(url));

    if target.exists() && !refresh {
        log::debug!("Using cached {}", target.display());
        return Ok(target);
    }

    fs::create_dir_all(cache_dir)?;
    log::info!("Downloading {}", url);

    // Fetch content (blocking)
    let response = ureq::get(url)
        .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
        .call()?;

    if !(200..300).contains(&response.status()) {
        return Err(Error::Fetch(format!("HTTP {} from {}", response.status(), url)));
    }

    // .part until complete
    let partial = target.with_extension("part");
    {
        let mut reader = response.into_reader();
        let mut file = fs::File::create(&partial)?;
        let bytes = io::copy(&mut reader, &mut file)?;
        log::info!("Downloaded {} bytes to {}", bytes, target.display());
    }
    fs::rename(&partial, &target)?;

    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_file_name() {
        assert_eq!(
            cache_file_name("https://example.com/data/art_daily_jumpsup.csv"),
            "art_daily_jumpsup.csv"
        );
        assert_eq!(
            cache_file_name("https://example.com/a/b.csv?token=1"),
            "b.csv"
        );
        assert_eq!(cache_file_name("https://"), "download.csv");
    }

    #[test]
    fn test_cached_file_skips_request() {
        let dir = tempfile::tempdir().unwrap();
        let cached = dir.path().join("series.csv");
        fs::write(&cached, "timestamp,value\n").unwrap();

        // Unroutable host: only succeeds because the cache is hit
        let path = download("http://invalid.invalid/series.csv", dir.path(), false).unwrap();
        assert_eq!(path, cached);
    }
}
