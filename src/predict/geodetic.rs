use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::predict::propagation::OrbitalState;

pub const EARTH_ROTATION_RAD_S: f64 = 7.292_115e-5;
/// Mean Earth radius used by the visibility geometry.
pub const MEAN_EARTH_RADIUS_KM: f64 = 6371.0;

/// Latitude in [-90, 90] and longitude in (-180, 180], degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeodeticPosition {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
}

impl GeodeticPosition {
    pub fn new(latitude_deg: f64, longitude_deg: f64) -> Self {
        Self {
            latitude_deg,
            longitude_deg,
        }
    }

    pub fn lat_rad(&self) -> f64 {
        self.latitude_deg.to_radians()
    }

    pub fn lon_rad(&self) -> f64 {
        self.longitude_deg.to_radians()
    }
}

/// Greenwich sidereal angle (radians) at `instant`.
pub fn sidereal_angle(instant: DateTime<Utc>) -> f64 {
    sgp4::iau_epoch_to_sidereal_time(sgp4::julian_years_since_j2000(&instant.naive_utc()))
}

pub fn teme_to_ecef_position(pos_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let cos_gmst = gmst.cos();
    let sin_gmst = gmst.sin();
    [
        pos_teme[0] * cos_gmst + pos_teme[1] * sin_gmst,
        -pos_teme[0] * sin_gmst + pos_teme[1] * cos_gmst,
        pos_teme[2],
    ]
}

pub fn teme_to_ecef_velocity(pos_teme: [f64; 3], vel_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let pos = teme_to_ecef_position(pos_teme, gmst);
    let rotated = teme_to_ecef_position(vel_teme, gmst);
    [
        rotated[0] + EARTH_ROTATION_RAD_S * pos[1],
        rotated[1] - EARTH_ROTATION_RAD_S * pos[0],
        rotated[2],
    ]
}

/// Sub-satellite point of an inertial state.
///
/// The state's epoch fixes the Earth rotation angle, so the same inertial
/// position maps to different longitudes at different instants. Latitude is
/// geocentric (spherical Earth), matching the visibility geometry.
pub fn to_geodetic(state: &OrbitalState) -> GeodeticPosition {
    let ecef = teme_to_ecef_position(state.position_km, sidereal_angle(state.epoch));
    let horizontal = (ecef[0] * ecef[0] + ecef[1] * ecef[1]).sqrt();
    GeodeticPosition {
        latitude_deg: ecef[2].atan2(horizontal).to_degrees(),
        longitude_deg: ecef[1].atan2(ecef[0]).to_degrees(),
    }
}

/// Height above the mean-radius sphere.
pub fn altitude_km(state: &OrbitalState) -> f64 {
    state.radius_km() - MEAN_EARTH_RADIUS_KM
}
