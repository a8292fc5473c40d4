use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::predict::{live_snapshot, look_angles, LiveSnapshot, LookAngles, Observer, Sgp4Propagator};
use crate::web::api::error::{ApiResult, ErrorResponse};
use crate::web::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LiveQuery {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LiveResponse {
    pub satellite: String,
    pub norad_id: u64,
    pub observer: Observer,
    /// Where to point from the observer right now
    pub look_angles: LookAngles,
    pub snapshot: LiveSnapshot,
}

#[utoipa::path(
    get,
    path = "/api/live",
    tag = "track",
    params(
        ("latitude" = Option<f64>, Query, description = "Observer latitude (degrees), defaults to the configured observer"),
        ("longitude" = Option<f64>, Query, description = "Observer longitude (degrees)")
    ),
    responses(
        (status = 200, description = "Current position, footprint and one orbit of ground track", body = LiveResponse),
        (status = 400, description = "Invalid parameters", body = ErrorResponse),
        (status = 503, description = "No TLE available", body = ErrorResponse)
    )
)]
pub async fn live(
    State(state): State<AppState>,
    Query(query): Query<LiveQuery>,
) -> ApiResult<Json<LiveResponse>> {
    let observer = state.observer(query.latitude, query.longitude)?;
    let tle = state.current_tle().await?;
    let propagator = Sgp4Propagator::new(&tle)?;
    let prediction = &state.config.prediction;

    let snapshot = live_snapshot(
        &propagator,
        Utc::now(),
        propagator.orbital_period(),
        prediction.track_step(),
        prediction.footprint_points,
    )?;

    Ok(Json(LiveResponse {
        satellite: tle.display_name(),
        norad_id: tle.norad_id,
        look_angles: look_angles(&observer, &snapshot.state),
        observer,
        snapshot,
    }))
}
