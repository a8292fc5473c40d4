use utoipa::OpenApi;

use super::api::error::ErrorResponse;
use super::api::flight::FlightResponse;
use super::api::live::LiveResponse;
use super::api::pass::PassResponse;
use super::api::tle::TleResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        super::api::tle::current_tle,
        super::api::pass::next_pass,
        super::api::live::live,
        super::api::flight::flight,
    ),
    components(
        schemas(
            TleResponse,
            PassResponse,
            LiveResponse,
            FlightResponse,
            ErrorResponse,
            crate::predict::PassWindow,
            crate::predict::Culmination,
            crate::predict::VisibilityFootprint,
            crate::predict::TrackPoint,
        )
    ),
    info(
        title = "Pass-O-Mat API",
        description = "Satellite pass prediction, live ground track and mission replay",
        version = "0.1.0"
    ),
    tags(
        (name = "tle", description = "Element sets"),
        (name = "predict", description = "Pass prediction"),
        (name = "track", description = "Ground tracks and visibility footprints")
    )
)]
pub struct ApiDoc;
