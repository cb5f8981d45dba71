use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::debug;
use validator::Validate;

use crate::core::config::UploadConfig;
use crate::core::error::{AppError, Result};
use crate::features::reports::dtos::{
    is_mime_type_allowed, CreateReportDto, CreateReportForm, CreateReportResponseDto, PhotoUpload,
    ReportPageResponseDto, ALLOWED_MIME_TYPES,
};
use crate::features::reports::services::ReportService;
use crate::shared::types::PaginationQuery;

/// State for report handlers
#[derive(Clone)]
pub struct ReportState {
    pub report_service: Arc<ReportService>,
    pub limits: UploadConfig,
}

/// Create a report with photo attachments
///
/// Accepts multipart/form-data with:
/// - `title`, `description`, `category`: required text fields
/// - `location`: optional text field
/// - `photos`: the photo files (repeatable, max 4, JPEG/PNG/WEBP, 5MB each)
#[utoipa::path(
    post,
    path = "/api/reports",
    tag = "reports",
    request_body(
        content = CreateReportForm,
        content_type = "multipart/form-data",
        description = "Report fields plus one or more photo files",
    ),
    responses(
        (status = 201, description = "Report created", body = CreateReportResponseDto),
        (status = 400, description = "Missing fields, no photos, oversize or disallowed file"),
        (status = 500, description = "A backing store failed; partial work was compensated"),
        (status = 504, description = "Creation exceeded its time budget")
    )
)]
pub async fn create_report(
    State(state): State<ReportState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<CreateReportResponseDto>)> {
    let mut title: Option<String> = None;
    let mut description: Option<String> = None;
    let mut category: Option<String> = None;
    let mut location: Option<String> = None;
    let mut photos: Vec<PhotoUpload> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "title" => title = Some(read_text(field, "title").await?),
            "description" => description = Some(read_text(field, "description").await?),
            "category" => category = Some(read_text(field, "category").await?),
            "location" => {
                let text = read_text(field, "location").await?;
                if !text.is_empty() {
                    location = Some(text);
                }
            }
            "photos" => {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());

                let file_name = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unnamed".to_string());

                let data = field.bytes().await.map_err(|e| {
                    debug!("Failed to read photo bytes: {}", e);
                    AppError::BadRequest(format!("Failed to read photo data: {}", e))
                })?;

                photos.push(PhotoUpload {
                    data: data.to_vec(),
                    file_name,
                    content_type,
                });
            }
            _ => {
                // Ignore unknown fields
                debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    let dto = CreateReportDto {
        title: title.unwrap_or_default(),
        description: description.unwrap_or_default(),
        category: category.unwrap_or_default(),
        location,
    };
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    // The photo batch is rejected here, before any store is touched, so a
    // bad request can never leave metadata or blobs behind
    check_photo_batch(&photos, &state.limits)?;

    let created = state
        .report_service
        .create_report(dto.into(), photos)
        .await?;

    let response = CreateReportResponseDto {
        message: "Report created".to_string(),
        report_id: created.report_id,
        total_photos: created.photo_keys.len() as i64,
        photos: created.photo_keys,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

async fn read_text(field: axum::extract::multipart::Field<'_>, name: &str) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read {} field: {}", name, e)))
}

fn check_photo_batch(photos: &[PhotoUpload], limits: &UploadConfig) -> Result<()> {
    if photos.is_empty() {
        return Err(AppError::Validation(
            "At least one photo must be uploaded".to_string(),
        ));
    }

    if photos.len() > limits.max_files {
        return Err(AppError::Validation(format!(
            "At most {} photos are allowed",
            limits.max_files
        )));
    }

    for photo in photos {
        if photo.data.len() > limits.max_file_size {
            return Err(AppError::Validation(format!(
                "Photo '{}' is too large, maximum size is {} MB",
                photo.file_name,
                limits.max_file_size / 1024 / 1024
            )));
        }
        if !is_mime_type_allowed(&photo.content_type) {
            return Err(AppError::Validation(format!(
                "Photo type '{}' is not allowed. Allowed types: {}",
                photo.content_type,
                ALLOWED_MIME_TYPES.join(", ")
            )));
        }
    }

    Ok(())
}

/// List reports, newest first, with their photo keys aggregated
#[utoipa::path(
    get,
    path = "/api/reports",
    tag = "reports",
    params(PaginationQuery),
    responses(
        (status = 200, description = "One page of reports", body = ReportPageResponseDto),
        (status = 400, description = "Invalid pagination parameters")
    )
)]
pub async fn list_reports(
    State(state): State<ReportState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ReportPageResponseDto>> {
    let page = state.report_service.list_reports(&query).await?;
    Ok(Json(page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::reports::dtos::PageSource;
    use crate::features::reports::routes;
    use crate::shared::test_helpers::{test_harness, upload_limits, TestHarness};
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;
    use std::collections::HashSet;

    fn test_server(harness: &TestHarness) -> TestServer {
        let router = routes::routes(Arc::clone(&harness.service), upload_limits());
        TestServer::new(router).unwrap()
    }

    fn jpeg_part(bytes: Vec<u8>, file_name: &str) -> Part {
        Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_type("image/jpeg")
    }

    fn pothole_form() -> MultipartForm {
        MultipartForm::new()
            .add_text("title", "Pothole")
            .add_text("description", "Large pothole")
            .add_text("category", "infrastructure")
    }

    #[tokio::test]
    async fn create_with_two_photos_returns_201_and_is_listed() {
        let harness = test_harness();
        let server = test_server(&harness);

        let form = pothole_form()
            .add_part("photos", jpeg_part(vec![0xFF, 0xD8, 0xFF, 0xE0], "road.jpg"))
            .add_part("photos", jpeg_part(vec![0xFF, 0xD8, 0xFF, 0xE1], "road.jpg"));

        let response = server.post("/api/reports").multipart(form).await;
        response.assert_status(StatusCode::CREATED);

        let body: CreateReportResponseDto = response.json();
        assert_eq!(body.message, "Report created");
        assert_eq!(body.total_photos, 2);
        let distinct: HashSet<&String> = body.photos.iter().collect();
        assert_eq!(distinct.len(), 2);

        let listing = server.get("/api/reports").await;
        listing.assert_status_ok();

        let page: ReportPageResponseDto = listing.json();
        assert_eq!(page.body.total_data, 1);
        assert_eq!(page.body.data[0].id, body.report_id);
        assert_eq!(page.body.data[0].title, "Pothole");
        assert_eq!(page.body.data[0].photos.len(), 2);
    }

    #[tokio::test]
    async fn oversize_third_photo_is_rejected_with_no_side_effects() {
        let harness = test_harness();
        let server = test_server(&harness);

        let form = pothole_form()
            .add_part("photos", jpeg_part(vec![0xFF, 0xD8], "one.jpg"))
            .add_part("photos", jpeg_part(vec![0xFF, 0xD8], "two.jpg"))
            .add_part("photos", jpeg_part(vec![0u8; 6 * 1024 * 1024], "three.jpg"));

        let response = server.post("/api/reports").multipart(form).await;
        response.assert_status(StatusCode::BAD_REQUEST);

        assert_eq!(harness.store.report_count(), 0);
        assert!(harness.storage.is_empty());
    }

    #[tokio::test]
    async fn missing_fields_are_rejected() {
        let harness = test_harness();
        let server = test_server(&harness);

        let form = MultipartForm::new()
            .add_text("title", "Pothole")
            .add_part("photos", jpeg_part(vec![0xFF, 0xD8], "road.jpg"));

        let response = server.post("/api/reports").multipart(form).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(harness.store.report_count(), 0);
    }

    #[tokio::test]
    async fn missing_photos_are_rejected() {
        let harness = test_harness();
        let server = test_server(&harness);

        let response = server.post("/api/reports").multipart(pothole_form()).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(harness.store.report_count(), 0);
    }

    #[tokio::test]
    async fn disallowed_file_type_is_rejected() {
        let harness = test_harness();
        let server = test_server(&harness);

        let form = pothole_form().add_part(
            "photos",
            Part::bytes(vec![0x25, 0x50, 0x44, 0x46])
                .file_name("document.pdf")
                .mime_type("application/pdf"),
        );

        let response = server.post("/api/reports").multipart(form).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(harness.store.report_count(), 0);
        assert!(harness.storage.is_empty());
    }

    #[tokio::test]
    async fn store_failure_returns_500_and_compensates() {
        let harness = test_harness();
        harness.storage.fail_puts();
        let server = test_server(&harness);

        let form = pothole_form()
            .add_part("photos", jpeg_part(vec![0xFF, 0xD8], "one.jpg"))
            .add_part("photos", jpeg_part(vec![0xFF, 0xD8], "two.jpg"));

        let response = server.post("/api/reports").multipart(form).await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

        // Compensation removed the provisional metadata and any blobs
        assert_eq!(harness.store.report_count(), 0);
        assert!(harness.storage.is_empty());
    }

    #[tokio::test]
    async fn listing_defaults_to_first_page_of_ten() {
        let harness = test_harness();
        let server = test_server(&harness);

        let response = server.get("/api/reports").await;
        response.assert_status_ok();

        let page: ReportPageResponseDto = response.json();
        assert_eq!(page.source, PageSource::Database);
        assert_eq!(page.body.page, 1);
        assert_eq!(page.body.limit, 10);
        assert_eq!(page.body.total_data, 0);
        assert_eq!(page.body.total_page, 0);
        assert!(page.body.data.is_empty());
    }

    #[tokio::test]
    async fn invalid_pagination_is_a_client_error() {
        let harness = test_harness();
        let server = test_server(&harness);

        for query in ["page=0", "limit=0", "limit=101"] {
            let response = server.get(&format!("/api/reports?{}", query)).await;
            response.assert_status(StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn second_listing_is_served_from_cache() {
        let harness = test_harness();
        let server = test_server(&harness);

        let first: ReportPageResponseDto = server.get("/api/reports").await.json();
        assert_eq!(first.source, PageSource::Database);

        let second: ReportPageResponseDto = server.get("/api/reports").await.json();
        assert_eq!(second.source, PageSource::Cache);
    }
}
