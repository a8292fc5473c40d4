use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::predict::error::PredictError;
use crate::predict::geodetic::{altitude_km, to_geodetic, GeodeticPosition};
use crate::predict::propagation::{OrbitalState, Propagator, Sgp4Propagator};
use crate::predict::tle::TwoLineElementSet;
use crate::predict::visibility::VisibilityFootprint;

/// How the instants of a ground track are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStrategy {
    /// One sample every `step`, from start to end inclusive.
    Fixed(Duration),
    /// `n` evenly spaced samples including both ends.
    Count(usize),
}

impl StepStrategy {
    pub fn instants(
        &self,
        start: DateTime<Utc>,
        duration: Duration,
    ) -> Result<Vec<DateTime<Utc>>, PredictError> {
        if duration < Duration::zero() {
            return Err(PredictError::InvalidInput(format!(
                "negative track duration {}",
                duration
            )));
        }
        let end = start.checked_add_signed(duration).ok_or_else(|| {
            PredictError::InvalidInput(format!("track duration {} out of range", duration))
        })?;

        match *self {
            StepStrategy::Fixed(step) => {
                if step <= Duration::zero() {
                    return Err(PredictError::InvalidInput(format!(
                        "track step must be positive, got {}",
                        step
                    )));
                }
                let mut instants = Vec::new();
                let mut cursor = start;
                while cursor <= end {
                    instants.push(cursor);
                    match cursor.checked_add_signed(step) {
                        Some(next) => cursor = next,
                        None => break,
                    }
                }
                Ok(instants)
            }
            StepStrategy::Count(0) => Err(PredictError::InvalidInput(
                "track needs at least one point".into(),
            )),
            StepStrategy::Count(1) => Ok(vec![start]),
            StepStrategy::Count(n) => {
                let total_ms = i128::from(duration.num_milliseconds());
                let last = (n - 1) as i128;
                Ok((0..n as i128)
                    .map(|i| start + Duration::milliseconds((total_ms * i / last) as i64))
                    .collect())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct TrackPoint {
    pub time: DateTime<Utc>,
    pub position: GeodeticPosition,
    pub altitude_km: f64,
}

impl TrackPoint {
    fn from_state(state: &OrbitalState) -> Self {
        Self {
            time: state.epoch,
            position: to_geodetic(state),
            altitude_km: altitude_km(state),
        }
    }
}

/// Sub-satellite points from `start` over `duration`.
pub fn sample_with<P: Propagator + ?Sized>(
    propagator: &P,
    start: DateTime<Utc>,
    duration: Duration,
    step: StepStrategy,
) -> Result<Vec<TrackPoint>, PredictError> {
    step.instants(start, duration)?
        .into_iter()
        .map(|t| propagator.propagate(t).map(|state| TrackPoint::from_state(&state)))
        .collect()
}

pub fn sample(
    tle: &TwoLineElementSet,
    start: DateTime<Utc>,
    duration: Duration,
    step: StepStrategy,
) -> Result<Vec<TrackPoint>, PredictError> {
    sample_with(&Sgp4Propagator::new(tle)?, start, duration, step)
}

/// A mission-elapsed instant worth marking on the map, e.g. when a photo was taken.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PointOfInterest {
    /// 1-based, in the order the offsets were given
    pub index: usize,
    pub offset_s: f64,
    pub time: DateTime<Utc>,
    pub position: GeodeticPosition,
    pub footprint: VisibilityFootprint,
}

/// Propagates to `epoch + offset - calibration_lag` for every offset.
pub fn points_of_interest<P: Propagator + ?Sized>(
    propagator: &P,
    epoch: DateTime<Utc>,
    offsets_s: &[f64],
    calibration_lag_s: f64,
    footprint_points: usize,
) -> Result<Vec<PointOfInterest>, PredictError> {
    offsets_s
        .iter()
        .enumerate()
        .map(|(i, &offset_s)| -> Result<PointOfInterest, PredictError> {
            let time = shifted(epoch, offset_s - calibration_lag_s)?;
            let state = propagator.propagate(time)?;
            let footprint = VisibilityFootprint::from_state(&state, footprint_points)?;
            Ok(PointOfInterest {
                index: i + 1,
                offset_s,
                time,
                position: footprint.center,
                footprint,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Landmark {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
}

/// A past flight replayed from a pinned element set.
#[derive(Debug, Clone)]
pub struct MissionPlan {
    pub name: String,
    pub tle: TwoLineElementSet,
    pub track_duration_s: f64,
    pub calibration_lag_s: f64,
    pub photo_offsets_s: Vec<f64>,
    pub landmarks: Vec<Landmark>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FlightTrajectory {
    pub mission: String,
    pub epoch: DateTime<Utc>,
    pub track: Vec<TrackPoint>,
    /// Footprint at the element set epoch, where the replay starts
    pub initial_footprint: VisibilityFootprint,
    pub points_of_interest: Vec<PointOfInterest>,
    pub landmarks: Vec<Landmark>,
}

impl FlightTrajectory {
    /// Point of interest carrying the 1-based `index`, if any.
    pub fn highlighted(&self, index: usize) -> Option<&PointOfInterest> {
        self.points_of_interest.iter().find(|p| p.index == index)
    }
}

pub fn historical_flight<P: Propagator + ?Sized>(
    propagator: &P,
    plan: &MissionPlan,
    step: StepStrategy,
    footprint_points: usize,
) -> Result<FlightTrajectory, PredictError> {
    let epoch = plan.tle.epoch;
    let track_end = shifted(epoch, plan.track_duration_s)?;
    let track = sample_with(propagator, epoch, track_end - epoch, step)?;
    let initial_footprint =
        VisibilityFootprint::from_state(&propagator.propagate(epoch)?, footprint_points)?;
    let points_of_interest = points_of_interest(
        propagator,
        epoch,
        &plan.photo_offsets_s,
        plan.calibration_lag_s,
        footprint_points,
    )?;

    Ok(FlightTrajectory {
        mission: plan.name.clone(),
        epoch,
        track,
        initial_footprint,
        points_of_interest,
        landmarks: plan.landmarks.clone(),
    })
}

/// Where the satellite is right now, and where it goes next.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LiveSnapshot {
    pub time: DateTime<Utc>,
    pub state: OrbitalState,
    pub position: GeodeticPosition,
    pub altitude_km: f64,
    pub footprint: VisibilityFootprint,
    pub track: Vec<TrackPoint>,
}

pub fn live_snapshot<P: Propagator + ?Sized>(
    propagator: &P,
    now: DateTime<Utc>,
    window: Duration,
    step: StepStrategy,
    footprint_points: usize,
) -> Result<LiveSnapshot, PredictError> {
    let state = propagator.propagate(now)?;
    let footprint = VisibilityFootprint::from_state(&state, footprint_points)?;
    let track = sample_with(propagator, now, window, step)?;

    Ok(LiveSnapshot {
        time: now,
        state,
        position: footprint.center,
        altitude_km: altitude_km(&state),
        footprint,
        track,
    })
}

/// `instant` moved by `seconds`, to the millisecond.
fn shifted(instant: DateTime<Utc>, seconds: f64) -> Result<DateTime<Utc>, PredictError> {
    let moved = if seconds.is_finite() {
        Duration::try_milliseconds((seconds * 1000.0).round() as i64)
            .and_then(|delta| instant.checked_add_signed(delta))
    } else {
        None
    };
    moved.ok_or_else(|| PredictError::InvalidInput(format!("time offset of {} s out of range", seconds)))
}
