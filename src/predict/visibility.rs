use serde::Serialize;
use std::f64::consts::TAU;
use utoipa::ToSchema;

use crate::predict::error::PredictError;
use crate::predict::geodetic::{altitude_km, to_geodetic, GeodeticPosition, MEAN_EARTH_RADIUS_KM};
use crate::predict::propagation::OrbitalState;

pub const DEFAULT_FOOTPRINT_POINTS: usize = 100;

/// Distance to the horizon from `altitude_km` above a sphere of mean Earth radius.
///
/// NaN for negative altitudes; callers must reject those.
pub fn visibility_radius_km(altitude_km: f64) -> f64 {
    let r = MEAN_EARTH_RADIUS_KM;
    ((r + altitude_km).powi(2) - r * r).sqrt()
}

/// Small-angle equirectangular circle of `radius_km` around `center`.
///
/// The longitude offset is divided by cos(latitude), so the ring blows up as
/// the center approaches a pole.
pub fn footprint_circle(
    center: GeodeticPosition,
    radius_km: f64,
    num_points: usize,
) -> Vec<GeodeticPosition> {
    let angular_radius = radius_km / MEAN_EARTH_RADIUS_KM;
    let cos_lat = center.lat_rad().cos();

    (0..num_points)
        .map(|i| {
            let angle = TAU * i as f64 / num_points as f64;
            let d_lat = angular_radius * angle.cos();
            let d_lon = angular_radius * angle.sin() / cos_lat;
            GeodeticPosition {
                latitude_deg: center.latitude_deg + d_lat.to_degrees(),
                longitude_deg: center.longitude_deg + d_lon.to_degrees(),
            }
        })
        .collect()
}

/// Ground area from which the satellite is above the horizon.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct VisibilityFootprint {
    pub center: GeodeticPosition,
    pub radius_km: f64,
    pub boundary: Vec<GeodeticPosition>,
}

impl VisibilityFootprint {
    pub fn new(
        center: GeodeticPosition,
        altitude_km: f64,
        num_points: usize,
    ) -> Result<Self, PredictError> {
        if !(altitude_km >= 0.0) {
            return Err(PredictError::PropagationDegenerate(format!(
                "satellite altitude {:.1} km is below the surface",
                altitude_km
            )));
        }
        let radius_km = visibility_radius_km(altitude_km);
        Ok(Self {
            center,
            radius_km,
            boundary: footprint_circle(center, radius_km, num_points),
        })
    }

    pub fn from_state(state: &OrbitalState, num_points: usize) -> Result<Self, PredictError> {
        Self::new(to_geodetic(state), altitude_km(state), num_points)
    }
}
