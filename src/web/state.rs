use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::predict::{MissionPlan, Observer, PredictError, TleLoader, TwoLineElementSet};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub tle_loader: Arc<RwLock<TleLoader>>,
    pub mission: Option<Arc<MissionPlan>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let mission = match config.mission_plan() {
            Ok(plan) => plan.map(Arc::new),
            Err(e) => {
                log::warn!("Ignoring mission: {}", e);
                None
            }
        };
        let tle_loader = config.tle_loader();

        Self {
            config: Arc::new(config),
            tle_loader: Arc::new(RwLock::new(tle_loader)),
            mission,
        }
    }

    /// Fresh cache hits only take the read lock; a refetch holds the write lock
    /// for at most the loader's fetch timeout.
    pub async fn current_tle(&self) -> Result<TwoLineElementSet, PredictError> {
        if let Some(tle) = self.tle_loader.read().await.fresh() {
            return Ok(tle);
        }
        self.tle_loader.write().await.current().await
    }

    /// Observer from query coordinates, or the configured one when none are given.
    pub fn observer(
        &self,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<Observer, PredictError> {
        match (latitude, longitude) {
            (Some(lat), Some(lon)) => {
                Observer::with_altitude(lat, lon, self.config.observer.altitude_m)
            }
            (None, None) => self
                .config
                .observer()
                .map_err(|e| PredictError::InvalidInput(e.to_string())),
            _ => Err(PredictError::InvalidInput(
                "latitude and longitude must be given together".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::fixtures::{ISS_LINE1, ISS_LINE2};
    use std::time::Duration;

    #[tokio::test]
    async fn test_fresh_tle_is_served_under_a_read_lock() {
        let path = std::env::temp_dir().join(format!("pass-o-mat-{}-state.tle", std::process::id()));
        std::fs::write(&path, format!("{}\n{}\n", ISS_LINE1, ISS_LINE2)).unwrap();
        let config =
            Config::from_yaml(&format!("tle:\n  norad_id: 25544\n  file: {}\n", path.display())).unwrap();
        let state = AppState::new(config);
        let first = state.current_tle().await.unwrap();
        std::fs::remove_file(&path).unwrap();

        // A long-running reader must not block requests that hit the cache
        let _reader = state.tle_loader.read().await;
        let again = tokio::time::timeout(Duration::from_secs(1), state.current_tle())
            .await
            .expect("cache hit waited for the write lock")
            .unwrap();
        assert_eq!(again, first);
    }
}
