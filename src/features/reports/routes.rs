use std::sync::Arc;

use axum::{routing::get, Router};

use crate::core::config::UploadConfig;
use crate::features::reports::handlers::{self, ReportState};
use crate::features::reports::services::ReportService;

/// Create routes for the reports feature
pub fn routes(report_service: Arc<ReportService>, limits: UploadConfig) -> Router {
    let state = ReportState {
        report_service,
        limits,
    };

    Router::new()
        .route(
            "/api/reports",
            get(handlers::report_handler::list_reports)
                .post(handlers::report_handler::create_report),
        )
        .with_state(state)
}
