use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::features::reports::models::NewReport;

/// Allowed MIME types for photo uploads
pub const ALLOWED_MIME_TYPES: &[&str] =
    &["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// Check if a MIME type is allowed
pub fn is_mime_type_allowed(content_type: &str) -> bool {
    ALLOWED_MIME_TYPES.contains(&content_type)
}

/// One photo pulled out of the multipart request, held in memory until it is
/// written to the object store
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub data: Vec<u8>,
    pub file_name: String,
    pub content_type: String,
}

/// Create report request DTO for OpenAPI documentation
/// Note: This struct is for Swagger UI documentation only.
/// The actual handler uses axum's Multipart extractor directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct CreateReportForm {
    /// Short title of the reported problem
    #[schema(example = "Pothole on Jalan Merdeka")]
    pub title: String,
    /// Full description of the problem
    pub description: String,
    /// Category slug
    #[schema(example = "infrastructure")]
    pub category: String,
    /// Optional free-form location
    pub location: Option<String>,
    /// Photo attachments (repeatable, max 4, JPEG/PNG/WEBP)
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub photos: String,
}

/// Text fields of a create-report request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateReportDto {
    #[validate(length(min = 1, max = 200, message = "title is required (max 200 chars)"))]
    pub title: String,

    #[validate(length(
        min = 1,
        max = 5000,
        message = "description is required (max 5000 chars)"
    ))]
    pub description: String,

    #[validate(
        length(min = 1, max = 100, message = "category is required (max 100 chars)"),
        regex(
            path = "*crate::shared::validation::CATEGORY_REGEX",
            message = "category must be a lowercase slug like infrastructure or public-safety"
        )
    )]
    pub category: String,

    #[validate(length(max = 500, message = "location must be at most 500 chars"))]
    pub location: Option<String>,
}

impl From<CreateReportDto> for NewReport {
    fn from(dto: CreateReportDto) -> Self {
        NewReport {
            title: dto.title,
            description: dto.description,
            category: dto.category,
            location: dto.location,
        }
    }
}

/// Response body of a successful report creation
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateReportResponseDto {
    pub message: String,
    pub report_id: Uuid,
    pub total_photos: i64,
    /// Object-store keys of the committed photo blobs
    pub photos: Vec<String>,
}

/// One report in a listing, with its aggregated photo keys
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportListItemDto {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub photos: Vec<String>,
}

/// A full list page. This is also the cache payload: the page is stored
/// verbatim and only the `source` tag differs between a hit and a miss.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportPageDto {
    pub page: i64,
    pub limit: i64,
    #[serde(rename = "totalData")]
    pub total_data: i64,
    #[serde(rename = "totalPage")]
    pub total_page: i64,
    pub data: Vec<ReportListItemDto>,
}

/// Where a list page came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PageSource {
    Cache,
    Database,
}

/// Response body of the paginated listing
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportPageResponseDto {
    pub source: PageSource,
    #[serde(flatten)]
    pub body: ReportPageDto,
}
