use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::predict::TwoLineElementSet;
use crate::web::api::error::{ApiResult, ErrorResponse};
use crate::web::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct TleResponse {
    pub source: String,
    pub tle: TwoLineElementSet,
}

#[utoipa::path(
    get,
    path = "/api/tle",
    tag = "tle",
    responses(
        (status = 200, description = "Element set currently used for live predictions", body = TleResponse),
        (status = 503, description = "No TLE available", body = ErrorResponse)
    )
)]
pub async fn current_tle(State(state): State<AppState>) -> ApiResult<Json<TleResponse>> {
    let tle = state.current_tle().await?;
    let source = state.tle_loader.read().await.source().describe();

    Ok(Json(TleResponse { source, tle }))
}
