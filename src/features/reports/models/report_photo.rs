use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for a photo link row. Each row ties one object-store blob
/// to its owning report; the blob itself lives under `photo_key`.
#[derive(Debug, Clone, FromRow)]
#[allow(dead_code)]
pub struct ReportPhoto {
    pub id: Uuid,
    pub report_id: Uuid,
    pub photo_key: String,
    pub created_at: DateTime<Utc>,
}
