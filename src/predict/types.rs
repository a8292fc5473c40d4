use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Highest point of a pass, as seen by the observer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct Culmination {
    pub time: DateTime<Utc>,
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub range_km: u32,
}

/// A predicted pass that reached the requested minimum elevation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct PassWindow {
    pub rise: DateTime<Utc>,
    pub culmination: Culmination,
    pub set: DateTime<Utc>,
    pub duration_seconds: i64,
}

impl PassWindow {
    pub fn new(rise: DateTime<Utc>, culmination: Culmination, set: DateTime<Utc>) -> Self {
        Self {
            rise,
            culmination,
            set,
            duration_seconds: (set - rise).num_seconds(),
        }
    }
}
