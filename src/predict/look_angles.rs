use serde::Serialize;
use utoipa::ToSchema;

use crate::predict::geodetic::{sidereal_angle, teme_to_ecef_position, teme_to_ecef_velocity};
use crate::predict::observer::Observer;
use crate::predict::propagation::OrbitalState;

/// Where the satellite appears in the observer's sky.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct LookAngles {
    /// Clockwise from north, [0, 360).
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub range_km: f64,
    /// Positive when the satellite moves away from the observer.
    pub range_rate_km_s: f64,
}

pub fn look_angles(observer: &Observer, state: &OrbitalState) -> LookAngles {
    let gmst = sidereal_angle(state.epoch);
    let sat_ecef = teme_to_ecef_position(state.position_km, gmst);
    let sat_vel_ecef = teme_to_ecef_velocity(state.position_km, state.velocity_km_s, gmst);
    let sta_ecef = observer.position_ecef_km();

    let dr = [
        sat_ecef[0] - sta_ecef[0],
        sat_ecef[1] - sta_ecef[1],
        sat_ecef[2] - sta_ecef[2],
    ];
    let range_km = (dr[0] * dr[0] + dr[1] * dr[1] + dr[2] * dr[2]).sqrt();

    let (east, north, up) = ecef_to_enu(dr, observer.lat_rad(), observer.lon_rad());
    let azimuth_deg = east.atan2(north).to_degrees().rem_euclid(360.0);
    let elevation_deg = if range_km > 0.0 {
        (up / range_km).asin().to_degrees()
    } else {
        90.0
    };

    let range_rate_km_s = if range_km > 0.0 {
        (sat_vel_ecef[0] * dr[0] + sat_vel_ecef[1] * dr[1] + sat_vel_ecef[2] * dr[2]) / range_km
    } else {
        0.0
    };

    LookAngles {
        azimuth_deg,
        elevation_deg,
        range_km,
        range_rate_km_s,
    }
}

pub fn ecef_to_enu(dr: [f64; 3], lat_rad: f64, lon_rad: f64) -> (f64, f64, f64) {
    let sin_lat = lat_rad.sin();
    let cos_lat = lat_rad.cos();
    let sin_lon = lon_rad.sin();
    let cos_lon = lon_rad.cos();

    let east = -sin_lon * dr[0] + cos_lon * dr[1];
    let north = -sin_lat * cos_lon * dr[0] - sin_lat * sin_lon * dr[1] + cos_lat * dr[2];
    let up = cos_lat * cos_lon * dr[0] + cos_lat * sin_lon * dr[1] + sin_lat * dr[2];
    (east, north, up)
}
