use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::predict::{historical_flight, FlightTrajectory, PointOfInterest, Sgp4Propagator};
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FlightQuery {
    pub highlight: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FlightResponse {
    pub trajectory: FlightTrajectory,
    /// The point of interest picked by `highlight`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlighted: Option<PointOfInterest>,
}

#[utoipa::path(
    get,
    path = "/api/flight",
    tag = "track",
    params(
        ("highlight" = Option<usize>, Query, description = "1-based point of interest to highlight")
    ),
    responses(
        (status = 200, description = "Replayed mission ground track", body = FlightResponse),
        (status = 400, description = "Unknown point of interest", body = ErrorResponse),
        (status = 404, description = "No mission configured", body = ErrorResponse)
    )
)]
pub async fn flight(
    State(state): State<AppState>,
    Query(query): Query<FlightQuery>,
) -> ApiResult<Json<FlightResponse>> {
    let plan = state
        .mission
        .as_ref()
        .ok_or(ApiError::NotFound("mission_not_configured"))?;
    let prediction = &state.config.prediction;

    let propagator = Sgp4Propagator::new(&plan.tle)?;
    let trajectory = historical_flight(
        &propagator,
        plan,
        prediction.track_step(),
        prediction.footprint_points,
    )?;

    let highlighted = match query.highlight {
        Some(index) => Some(trajectory.highlighted(index).cloned().ok_or_else(|| {
            ApiError::Validation(format!(
                "no point of interest {} (mission has {})",
                index,
                trajectory.points_of_interest.len()
            ))
        })?),
        None => None,
    };

    Ok(Json(FlightResponse {
        trajectory,
        highlighted,
    }))
}
