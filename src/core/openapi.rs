use utoipa::{Modify, OpenApi};

use crate::features::health::handlers as health_handlers;
use crate::features::reports::{dtos as reports_dtos, handlers as reports_handlers};
use crate::shared::types::Meta;

#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health_handlers::health_check,
        // Reports
        reports_handlers::report_handler::create_report,
        reports_handlers::report_handler::list_reports,
    ),
    components(
        schemas(
            // Shared
            Meta,
            // Reports
            reports_dtos::CreateReportForm,
            reports_dtos::CreateReportResponseDto,
            reports_dtos::ReportListItemDto,
            reports_dtos::ReportPageDto,
            reports_dtos::ReportPageResponseDto,
            reports_dtos::PageSource,
            // Health
            health_handlers::HealthResponseDto,
        )
    ),
    tags(
        (name = "reports", description = "Citizen report intake and listing"),
        (name = "health", description = "Liveness probe")
    )
)]
pub struct ApiDoc;

/// Overrides title/version/description from runtime configuration
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
