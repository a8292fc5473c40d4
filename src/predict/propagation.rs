use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sgp4::{Constants, Elements};
use utoipa::ToSchema;

use crate::predict::error::PredictError;
use crate::predict::tle::TwoLineElementSet;

/// Position and velocity in the Earth-centered inertial (TEME) frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct OrbitalState {
    pub epoch: DateTime<Utc>,
    #[schema(value_type = Vec<f64>)]
    pub position_km: [f64; 3],
    #[schema(value_type = Vec<f64>)]
    pub velocity_km_s: [f64; 3],
}

impl OrbitalState {
    pub fn radius_km(&self) -> f64 {
        let [x, y, z] = self.position_km;
        (x * x + y * y + z * z).sqrt()
    }
}

pub trait Propagator {
    fn propagate(&self, instant: DateTime<Utc>) -> Result<OrbitalState, PredictError>;
}

pub struct Sgp4Propagator {
    elements: Elements,
    constants: Constants,
}

impl Sgp4Propagator {
    pub fn new(tle: &TwoLineElementSet) -> Result<Self, PredictError> {
        let elements = tle.elements()?;
        let constants = Constants::from_elements(&elements)
            .map_err(|e| PredictError::MalformedTle(e.to_string()))?;
        Ok(Self {
            elements,
            constants,
        })
    }

    pub fn epoch(&self) -> DateTime<Utc> {
        self.elements.datetime.and_utc()
    }

    /// Orbital period derived from the mean motion (revolutions per day).
    pub fn orbital_period(&self) -> Duration {
        let minutes = 1440.0 / self.elements.mean_motion;
        Duration::milliseconds((minutes * 60_000.0).round() as i64)
    }
}

impl Propagator for Sgp4Propagator {
    fn propagate(&self, instant: DateTime<Utc>) -> Result<OrbitalState, PredictError> {
        let minutes = self
            .elements
            .datetime_to_minutes_since_epoch(&instant.naive_utc())
            .map_err(|e| PredictError::PropagationDegenerate(e.to_string()))?;

        let prediction = self
            .constants
            .propagate(minutes)
            .map_err(|e| PredictError::PropagationDegenerate(e.to_string()))?;

        Ok(OrbitalState {
            epoch: instant,
            position_km: prediction.position,
            velocity_km_s: prediction.velocity,
        })
    }
}

pub fn propagate(
    tle: &TwoLineElementSet,
    instant: DateTime<Utc>,
) -> Result<OrbitalState, PredictError> {
    Sgp4Propagator::new(tle)?.propagate(instant)
}
