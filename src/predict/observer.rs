use serde::Serialize;
use utoipa::ToSchema;

use crate::predict::error::PredictError;
use crate::predict::geodetic::GeodeticPosition;

/// A fixed point on the ground the sky is seen from.
///
/// `altitude_m` is the observer's height above the ellipsoid. It has nothing
/// to do with the minimum elevation a pass must reach.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct Observer {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
}

impl Observer {
    pub fn new(latitude_deg: f64, longitude_deg: f64) -> Result<Self, PredictError> {
        Self::with_altitude(latitude_deg, longitude_deg, 0.0)
    }

    pub fn with_altitude(
        latitude_deg: f64,
        longitude_deg: f64,
        altitude_m: f64,
    ) -> Result<Self, PredictError> {
        if !(-90.0..=90.0).contains(&latitude_deg) {
            return Err(PredictError::InvalidInput(format!(
                "latitude {} outside [-90, 90]",
                latitude_deg
            )));
        }
        if !(-180.0..=180.0).contains(&longitude_deg) {
            return Err(PredictError::InvalidInput(format!(
                "longitude {} outside [-180, 180]",
                longitude_deg
            )));
        }
        if !altitude_m.is_finite() {
            return Err(PredictError::InvalidInput("altitude must be finite".into()));
        }
        Ok(Self {
            latitude_deg,
            longitude_deg,
            altitude_m,
        })
    }

    /// Parse "lat, lon" as written in the configuration file.
    pub fn from_coordinates(coordinates: &str, altitude_m: Option<f64>) -> Result<Self, PredictError> {
        let parts: Vec<_> = coordinates.split(',').map(|s| s.trim()).collect();
        if parts.len() != 2 {
            return Err(PredictError::InvalidInput(format!(
                "expected \"lat, lon\", got \"{}\"",
                coordinates
            )));
        }
        let parse = |s: &str| {
            s.parse::<f64>()
                .map_err(|e| PredictError::InvalidInput(format!("{}: {}", s, e)))
        };
        Self::with_altitude(parse(parts[0])?, parse(parts[1])?, altitude_m.unwrap_or(0.0))
    }

    pub fn position(&self) -> GeodeticPosition {
        GeodeticPosition::new(self.latitude_deg, self.longitude_deg)
    }

    pub fn lat_rad(&self) -> f64 {
        self.latitude_deg.to_radians()
    }

    pub fn lon_rad(&self) -> f64 {
        self.longitude_deg.to_radians()
    }

    pub fn position_ecef_km(&self) -> [f64; 3] {
        // WGS-84 constants
        let a = 6378.137;
        let e2 = 0.00669437999014;
        let lat = self.lat_rad();
        let lon = self.lon_rad();
        let sin_lat = lat.sin();
        let cos_lat = lat.cos();
        let n = a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        let alt_km = self.altitude_m / 1000.0;
        [
            (n + alt_km) * cos_lat * lon.cos(),
            (n + alt_km) * cos_lat * lon.sin(),
            (n * (1.0 - e2) + alt_km) * sin_lat,
        ]
    }
}
