use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::fetch;
use super::record::{Sample, Series};
use crate::logic::error::{Error, Result};

/// Where a series comes from
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Url(String),
    File(PathBuf),
}

impl DataSource {
    pub fn parse(source: &str) -> Self {
        let trimmed = source.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            DataSource::Url(trimmed.to_string())
        } else {
            DataSource::File(PathBuf::from(trimmed))
        }
    }

    /// Short name used in logs and reports
    pub fn name(&self) -> String {
        match self {
            DataSource::Url(url) => fetch::cache_file_name(url),
            DataSource::File(path) => path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("series")
                .to_string(),
        }
    }
}

/// Resolve the source to a local file and parse it
pub fn load_series(source: &DataSource, cache_dir: &Path, refresh: bool) -> Result<Series> {
    let path = match source {
        DataSource::Url(url) => fetch::download(url, cache_dir, refresh)?,
        DataSource::File(path) => path.clone(),
    };

    let file = File::open(&path).map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to open CSV '{}': {}", path.display(), e),
        ))
    })?;

    let series = parse_csv(file, &source.name())?;
    log::info!("Loaded {} samples from {}", series.len(), path.display());
    Ok(series)
}

/// Parse `timestamp,value` rows
pub fn parse_csv<R: Read>(reader: R, name: &str) -> Result<Series> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut samples = Vec::new();
    for (idx, row) in reader.deserialize::<Sample>().enumerate() {
        // +2: header line and 1-based numbering
        let line = idx + 2;
        let sample = row.map_err(|e| Error::Csv {
            row: line,
            message: e.to_string(),
        })?;

        if !sample.value.is_finite() {
            return Err(Error::InvalidValue {
                row: line,
                reason: format!("non-finite value {}", sample.value),
            });
        }
        samples.push(sample);
    }

    if samples.is_empty() {
        return Err(Error::EmptySeries(name.to_string()));
    }

    Ok(Series::new(name, samples))
}
