mod directory;
mod error;
mod events;
mod geodetic;
mod ground_track;
mod look_angles;
mod observer;
mod pass_finder;
mod propagation;
mod tle;
mod tle_loader;
mod types;
mod visibility;

pub use directory::{parse_directory_response, TleDirectory, DEFAULT_DIRECTORY_URL};
pub use error::PredictError;
pub use events::{EventKind, EventSource, RawEvent, Sgp4EventFinder};
pub use geodetic::{altitude_km, to_geodetic, GeodeticPosition, MEAN_EARTH_RADIUS_KM};
pub use ground_track::{
    historical_flight, live_snapshot, points_of_interest, sample, sample_with, FlightTrajectory,
    Landmark, LiveSnapshot, MissionPlan, PointOfInterest, StepStrategy, TrackPoint,
};
pub use look_angles::{look_angles, LookAngles};
pub use observer::Observer;
pub use pass_finder::{find_next_pass, PassFinder, RETRY_OFFSET_MINUTES, SEARCH_HORIZON_HOURS};
pub use propagation::{propagate, OrbitalState, Propagator, Sgp4Propagator};
pub use tle::TwoLineElementSet;
#[cfg(test)]
pub(crate) use tle::fixtures;
pub use tle_loader::{load_tle_file, TleLoader, TleSource, DEFAULT_FETCH_TIMEOUT_SECONDS};
pub use types::{Culmination, PassWindow};
pub use visibility::{
    footprint_circle, visibility_radius_km, VisibilityFootprint, DEFAULT_FOOTPRINT_POINTS,
};
