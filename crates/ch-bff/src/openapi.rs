//! OpenAPI document served at `/api-docs/openapi.json`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::availability::{
    AvailabilityResponse, AvailabilitySummary, ConflictRef, CourtAvailability, Money,
    PromotionApplication, TimeRange, TimeSlot,
};
use crate::dashboard::{
    DashboardMetrics, DashboardOverview, DashboardPeriod, HeatmapCell, TopCourt,
    UpcomingReservation,
};
use crate::error::ErrorResponse;
use crate::fallback::ResponseMeta;
use crate::model::{
    ChartPoint, ClubProfile, CustomerMetrics, DateRange, OccupancyMetrics, ReservationStatus,
    RevenueMetrics, TimeOfDay,
};
use crate::routes::availability::{AvailabilityRequest, TimeRangeRequest};
use crate::routes::health::{HealthStatus, LivenessResponse, ReadinessResponse};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ClubHub BFF",
        description = "Aggregated, tenant-scoped views for the club-management UI"
    ),
    paths(
        crate::routes::dashboard::get_dashboard_overview,
        crate::routes::availability::get_availability,
        crate::routes::availability::post_availability,
        crate::routes::health::liveness,
        crate::routes::health::readiness,
    ),
    components(schemas(
        AvailabilityRequest,
        TimeRangeRequest,
        AvailabilityResponse,
        AvailabilitySummary,
        CourtAvailability,
        TimeSlot,
        Money,
        PromotionApplication,
        ConflictRef,
        TimeRange,
        DashboardOverview,
        DashboardMetrics,
        DashboardPeriod,
        HeatmapCell,
        UpcomingReservation,
        TopCourt,
        ClubProfile,
        RevenueMetrics,
        OccupancyMetrics,
        CustomerMetrics,
        ChartPoint,
        DateRange,
        ReservationStatus,
        TimeOfDay,
        ResponseMeta,
        ErrorResponse,
        HealthStatus,
        LivenessResponse,
        ReadinessResponse,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "bff", description = "Aggregation endpoints"),
        (name = "health", description = "Probes")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
