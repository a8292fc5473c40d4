use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};

use crate::predict::directory::TleDirectory;
use crate::predict::error::PredictError;
use crate::predict::tle::TwoLineElementSet;

pub const DEFAULT_FETCH_TIMEOUT_SECONDS: i64 = 10;

/// Where live element sets come from.
#[derive(Debug, Clone)]
pub enum TleSource {
    Directory(TleDirectory),
    File(PathBuf),
}

impl TleSource {
    pub fn describe(&self) -> String {
        match self {
            TleSource::Directory(directory) => directory.base_url().to_string(),
            TleSource::File(path) => path.display().to_string(),
        }
    }
}

struct CachedTle {
    tle: TwoLineElementSet,
    fetched_at: DateTime<Utc>,
}

/// Keeps the "live" element set of one satellite, refetched once it gets older
/// than the refresh interval.
pub struct TleLoader {
    source: TleSource,
    norad_id: u64,
    refresh: Duration,
    fetch_timeout: Duration,
    cached: Option<CachedTle>,
}

impl TleLoader {
    pub fn new(source: TleSource, norad_id: u64, refresh: Duration) -> Self {
        Self {
            source,
            norad_id,
            refresh,
            fetch_timeout: Duration::seconds(DEFAULT_FETCH_TIMEOUT_SECONDS),
            cached: None,
        }
    }

    /// Upper bound on a single fetch; a source slower than this counts as unavailable.
    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub fn source(&self) -> &TleSource {
        &self.source
    }

    pub fn cached(&self) -> Option<&TwoLineElementSet> {
        self.cached.as_ref().map(|c| &c.tle)
    }

    /// Cached TLE, only while it is younger than the refresh interval.
    pub fn fresh(&self) -> Option<TwoLineElementSet> {
        self.fresh_at(Utc::now())
    }

    fn fresh_at(&self, now: DateTime<Utc>) -> Option<TwoLineElementSet> {
        self.cached
            .as_ref()
            .filter(|cached| now - cached.fetched_at < self.refresh)
            .map(|cached| cached.tle.clone())
    }

    /// Cached TLE if fresh enough, otherwise a refetch.
    ///
    /// When the refetch fails the previous TLE is served, however old.
    pub async fn current(&mut self) -> Result<TwoLineElementSet, PredictError> {
        self.current_at(Utc::now()).await
    }

    async fn current_at(&mut self, now: DateTime<Utc>) -> Result<TwoLineElementSet, PredictError> {
        if let Some(tle) = self.fresh_at(now) {
            return Ok(tle);
        }

        match self.fetch().await {
            Ok(tle) => Ok(self.store(tle, now)),
            Err(e @ (PredictError::TleUnavailable(_) | PredictError::FileRead(_))) => {
                match &self.cached {
                    Some(cached) => {
                        log::warn!(
                            "TLE refresh for NORAD {} failed ({}), keeping TLE fetched at {}",
                            self.norad_id,
                            e,
                            cached.fetched_at
                        );
                        Ok(cached.tle.clone())
                    }
                    None => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Refetch regardless of the cache age.
    pub async fn reload(&mut self) -> Result<TwoLineElementSet, PredictError> {
        let tle = self.fetch().await?;
        Ok(self.store(tle, Utc::now()))
    }

    async fn fetch(&self) -> Result<TwoLineElementSet, PredictError> {
        let limit = self.fetch_timeout.to_std().map_err(|_| {
            PredictError::InvalidInput(format!("negative fetch timeout {}", self.fetch_timeout))
        })?;
        let tle = match tokio::time::timeout(limit, self.fetch_from_source()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(PredictError::TleUnavailable(format!(
                    "{} did not answer within {}",
                    self.source.describe(),
                    humantime::format_duration(limit)
                )))
            }
        };
        log::info!(
            "Loaded TLE for {} from {} (epoch {})",
            tle.display_name(),
            self.source.describe(),
            tle.epoch
        );
        Ok(tle)
    }

    async fn fetch_from_source(&self) -> Result<TwoLineElementSet, PredictError> {
        match &self.source {
            TleSource::Directory(directory) => directory.lookup(self.norad_id).await,
            TleSource::File(path) => load_tle_file(path, self.norad_id),
        }
    }

    fn store(&mut self, tle: TwoLineElementSet, fetched_at: DateTime<Utc>) -> TwoLineElementSet {
        self.cached = Some(CachedTle {
            tle: tle.clone(),
            fetched_at,
        });
        tle
    }
}

/// Read a multi-satellite TLE file and pick out `norad_id`.
pub fn load_tle_file(path: &Path, norad_id: u64) -> Result<TwoLineElementSet, PredictError> {
    let content = fs::read_to_string(path)?;

    for (name, line1, line2) in parse_multi_tle(&content) {
        match TwoLineElementSet::from_lines(name, &line1, &line2) {
            Ok(tle) if tle.norad_id == norad_id => return Ok(tle),
            Ok(_) => {}
            Err(e) => {
                log::warn!("Skipping TLE entry in {}: {}", path.display(), e);
                // Continue with other entries
            }
        }
    }

    Err(PredictError::TleUnavailable(format!(
        "NORAD {} not found in {}",
        norad_id,
        path.display()
    )))
}

/// Parse multi-satellite TLE content
fn parse_multi_tle(content: &str) -> Vec<(Option<String>, String, String)> {
    let lines: Vec<&str> = content
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    let mut result = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if lines[i].starts_with("1 ") && i + 1 < lines.len() && lines[i + 1].starts_with("2 ") {
            // 2-line TLE (no name)
            result.push((None, lines[i].to_string(), lines[i + 1].to_string()));
            i += 2;
        } else if i + 2 < lines.len()
            && lines[i + 1].starts_with("1 ")
            && lines[i + 2].starts_with("2 ")
        {
            // 3-line TLE (with name)
            result.push((
                Some(lines[i].to_string()),
                lines[i + 1].to_string(),
                lines[i + 2].to_string(),
            ));
            i += 3;
        } else {
            i += 1; // Skip unknown line
        }
    }

    result
}
