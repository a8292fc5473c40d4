use chrono::Duration;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::predict::{
    Landmark, MissionPlan, Observer, PassFinder, PredictError, Sgp4EventFinder, Sgp4Propagator,
    StepStrategy, TleDirectory, TleLoader, TleSource, TwoLineElementSet, DEFAULT_DIRECTORY_URL,
    DEFAULT_FETCH_TIMEOUT_SECONDS, DEFAULT_FOOTPRINT_POINTS,
};

pub const DEFAULT_CONFIG_PATH: &str = "pass-o-mat.yaml";

/// Longest span, in seconds, a mission replay may cover on either side of its epoch
const MAX_MISSION_SPAN_S: f64 = 100.0 * 365.25 * 86_400.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub observer: ObserverConfig,
    pub tle: TleConfig,
    pub prediction: PredictionConfig,
    pub web: WebConfig,
    pub mission: Option<MissionConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObserverConfig {
    /// "lat, lon" in degrees
    pub coordinates: String,
    /// Height of the observer above the ellipsoid
    pub altitude_m: f64,
    /// Lowest culmination a pass must reach to be reported
    pub min_elevation_deg: f64,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            coordinates: "48.8566, 2.3522".to_string(),
            altitude_m: 0.0,
            min_elevation_deg: 10.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TleConfig {
    pub norad_id: u64,
    pub directory_url: String,
    /// Local TLE file used instead of the directory
    pub file: Option<PathBuf>,
    #[serde(deserialize_with = "deserialize_duration")]
    pub refresh: Duration,
    /// Give up on a directory or file that takes longer than this
    #[serde(deserialize_with = "deserialize_duration")]
    pub fetch_timeout: Duration,
}

impl Default for TleConfig {
    fn default() -> Self {
        Self {
            norad_id: 60239,
            directory_url: DEFAULT_DIRECTORY_URL.to_string(),
            file: None,
            refresh: Duration::hours(1),
            fetch_timeout: Duration::seconds(DEFAULT_FETCH_TIMEOUT_SECONDS),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    #[serde(deserialize_with = "deserialize_duration")]
    pub search_horizon: Duration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub retry_offset: Duration,
    pub footprint_points: usize,
    pub track_points: usize,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            search_horizon: Duration::hours(72),
            retry_offset: Duration::minutes(30),
            footprint_points: DEFAULT_FOOTPRINT_POINTS,
            track_points: 50,
        }
    }
}

impl PredictionConfig {
    pub fn pass_finder(
        &self,
        tle: &TwoLineElementSet,
    ) -> Result<PassFinder<Sgp4EventFinder<Sgp4Propagator>>, PredictError> {
        Ok(PassFinder::new(Sgp4EventFinder::new(Sgp4Propagator::new(tle)?))
            .with_horizon(self.search_horizon)
            .with_retry_offset(self.retry_offset))
    }

    pub fn track_step(&self) -> StepStrategy {
        StepStrategy::Count(self.track_points)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

/// A past flight replayed on the map
#[derive(Debug, Clone, Deserialize)]
pub struct MissionConfig {
    pub name: String,
    /// 2- or 3-line element set, pinned at the flight
    pub tle: String,
    pub track_duration_s: f64,
    #[serde(default)]
    pub calibration_lag_s: f64,
    #[serde(default)]
    pub photo_offsets_s: Vec<f64>,
    #[serde(default)]
    pub landmarks: Vec<Landmark>,
}

impl MissionConfig {
    fn check_times(&self) -> Result<(), ConfigError> {
        let within_span = |seconds: f64| seconds.abs() <= MAX_MISSION_SPAN_S;

        if !(self.track_duration_s >= 0.0 && within_span(self.track_duration_s)) {
            return Err(ConfigError::Invalid(format!(
                "mission {}: track_duration_s {} must be between 0 and {}",
                self.name, self.track_duration_s, MAX_MISSION_SPAN_S
            )));
        }
        if !within_span(self.calibration_lag_s) {
            return Err(ConfigError::Invalid(format!(
                "mission {}: calibration_lag_s {} out of range",
                self.name, self.calibration_lag_s
            )));
        }
        if let Some(offset) = self
            .photo_offsets_s
            .iter()
            .find(|&&offset| !within_span(offset - self.calibration_lag_s))
        {
            return Err(ConfigError::Invalid(format!(
                "mission {}: photo offset {} out of range",
                self.name, offset
            )));
        }
        Ok(())
    }

    pub fn plan(&self) -> Result<MissionPlan, ConfigError> {
        self.check_times()?;
        let tle = TwoLineElementSet::parse(&self.tle)
            .map_err(|e| ConfigError::Invalid(format!("mission {}: {}", self.name, e)))?;
        Ok(MissionPlan {
            name: self.name.clone(),
            tle,
            track_duration_s: self.track_duration_s,
            calibration_lag_s: self.calibration_lag_s,
            photo_offsets_s: self.photo_offsets_s.clone(),
            landmarks: self.landmarks.clone(),
        })
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Reads `path`, falling back to defaults when the default file is absent.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    Self::from_file(path)
                } else {
                    log::info!("No {} found, using default configuration", DEFAULT_CONFIG_PATH);
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = if content.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(content)?
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.observer()?;
        let min_el = self.observer.min_elevation_deg;
        if !(0.0..=90.0).contains(&min_el) {
            return Err(ConfigError::Invalid(format!(
                "observer.min_elevation_deg {} outside [0, 90]",
                min_el
            )));
        }
        if self.tle.fetch_timeout <= Duration::zero() {
            return Err(ConfigError::Invalid(
                "tle.fetch_timeout must be positive".into(),
            ));
        }
        if self.prediction.search_horizon <= Duration::zero() {
            return Err(ConfigError::Invalid(
                "prediction.search_horizon must be positive".into(),
            ));
        }
        if self.prediction.footprint_points == 0 || self.prediction.track_points == 0 {
            return Err(ConfigError::Invalid(
                "prediction.footprint_points and track_points must be positive".into(),
            ));
        }
        if let Some(mission) = &self.mission {
            mission.plan()?;
        }
        Ok(())
    }

    pub fn observer(&self) -> Result<Observer, ConfigError> {
        Observer::from_coordinates(&self.observer.coordinates, Some(self.observer.altitude_m))
            .map_err(|e| ConfigError::Invalid(format!("observer: {}", e)))
    }

    pub fn tle_source(&self) -> TleSource {
        match &self.tle.file {
            Some(path) => TleSource::File(path.clone()),
            None => TleSource::Directory(TleDirectory::new(self.tle.directory_url.clone())),
        }
    }

    pub fn tle_loader(&self) -> TleLoader {
        TleLoader::new(self.tle_source(), self.tle.norad_id, self.tle.refresh)
            .with_fetch_timeout(self.tle.fetch_timeout)
    }

    pub fn mission_plan(&self) -> Result<Option<MissionPlan>, ConfigError> {
        self.mission.as_ref().map(MissionConfig::plan).transpose()
    }
}

pub fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime::parse_duration(s.trim())
        .map_err(|e| e.to_string())
        .and_then(|d| Duration::from_std(d).map_err(|e| e.to_string()))
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(serde::de::Error::custom)
}
