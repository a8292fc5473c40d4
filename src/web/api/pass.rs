use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::predict::{Observer, PassWindow, PredictError};
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PassQuery {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub min_elevation: Option<f64>,
    pub at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PassResponse {
    pub satellite: String,
    pub norad_id: u64,
    pub observer: Observer,
    pub min_elevation_deg: f64,
    pub search_start: DateTime<Utc>,
    pub search_horizon_hours: i64,
    /// Absent when no pass reaches the minimum elevation within the horizon
    pub pass: Option<PassWindow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/pass",
    tag = "predict",
    params(
        ("latitude" = Option<f64>, Query, description = "Observer latitude (degrees), defaults to the configured observer"),
        ("longitude" = Option<f64>, Query, description = "Observer longitude (degrees)"),
        ("min_elevation" = Option<f64>, Query, description = "Minimum culmination elevation (degrees)"),
        ("at" = Option<String>, Query, description = "Search start (RFC3339), defaults to now")
    ),
    responses(
        (status = 200, description = "Next pass, or null when none is found", body = PassResponse),
        (status = 400, description = "Invalid parameters", body = ErrorResponse),
        (status = 422, description = "TLE rejected by the propagator", body = ErrorResponse),
        (status = 503, description = "No TLE available", body = ErrorResponse)
    )
)]
pub async fn next_pass(
    State(state): State<AppState>,
    Query(query): Query<PassQuery>,
) -> ApiResult<Json<PassResponse>> {
    let observer = state.observer(query.latitude, query.longitude)?;
    let min_elevation_deg = query
        .min_elevation
        .unwrap_or(state.config.observer.min_elevation_deg);
    let search_start = query.at.unwrap_or_else(Utc::now);

    let tle = state.current_tle().await?;
    let finder = state.config.prediction.pass_finder(&tle)?;
    let search_horizon_hours = finder.horizon().num_hours();

    let (pass, message) = match finder.next_pass(&observer, min_elevation_deg, search_start) {
        Ok(pass) => (Some(pass), None),
        Err(e @ PredictError::NoPassInHorizon { .. }) => {
            log::info!("{} for {}", e, tle.display_name());
            (None, Some(e.to_string()))
        }
        Err(e) => return Err(ApiError::from(e)),
    };

    Ok(Json(PassResponse {
        satellite: tle.display_name(),
        norad_id: tle.norad_id,
        observer,
        min_elevation_deg,
        search_start,
        search_horizon_hours,
        pass,
        message,
    }))
}
