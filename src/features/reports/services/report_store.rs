use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::reports::models::{NewReport, Report, ReportPhoto};

/// Relational-store operations behind the report feature.
///
/// The seam exists so the creation saga and the read path can be exercised
/// against an injected store; `PgReportStore` is the production
/// implementation. `delete_report` must stay idempotent, it is the
/// compensation path and may run against a row that was never committed.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Insert and commit the metadata row, returning it with its
    /// store-assigned id and timestamp.
    async fn insert_report(&self, data: &NewReport) -> Result<Report>;

    /// Link the given blob keys to a report as one batch.
    async fn insert_photos(&self, report_id: Uuid, keys: &[String]) -> Result<()>;

    /// Remove a report row and, through it, its photo links.
    async fn delete_report(&self, report_id: Uuid) -> Result<()>;

    async fn count_reports(&self) -> Result<i64>;

    /// One page of reports, newest first.
    async fn list_page(&self, limit: i64, offset: i64) -> Result<Vec<Report>>;

    /// Photo link rows for a set of reports.
    async fn photos_for_reports(&self, report_ids: &[Uuid]) -> Result<Vec<ReportPhoto>>;
}

/// Postgres-backed report store
pub struct PgReportStore {
    pool: PgPool,
}

impl PgReportStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportStore for PgReportStore {
    async fn insert_report(&self, data: &NewReport) -> Result<Report> {
        let report = sqlx::query_as::<_, Report>(
            r#"
            INSERT INTO reports (title, description, category, location)
            VALUES ($1, $2, $3, $4)
            RETURNING id, title, description, category, location, created_at
            "#,
        )
        .bind(&data.title)
        .bind(&data.description)
        .bind(&data.category)
        .bind(&data.location)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert report: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(report)
    }

    async fn insert_photos(&self, report_id: Uuid, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO report_photos (report_id, photo_key)
            SELECT $1, UNNEST($2::TEXT[])
            "#,
        )
        .bind(report_id)
        .bind(keys)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to link photos for report {}: {:?}", report_id, e);
            AppError::Database(e)
        })?;

        Ok(())
    }

    async fn delete_report(&self, report_id: Uuid) -> Result<()> {
        // Cascades to report_photos; deleting an absent row is a no-op
        sqlx::query("DELETE FROM reports WHERE id = $1")
            .bind(report_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete report {}: {:?}", report_id, e);
                AppError::Database(e)
            })?;

        Ok(())
    }

    async fn count_reports(&self) -> Result<i64> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reports")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to count reports: {:?}", e);
                AppError::Database(e)
            })?;

        Ok(total)
    }

    async fn list_page(&self, limit: i64, offset: i64) -> Result<Vec<Report>> {
        let reports = sqlx::query_as::<_, Report>(
            r#"
            SELECT id, title, description, category, location, created_at
            FROM reports
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list reports: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(reports)
    }

    async fn photos_for_reports(&self, report_ids: &[Uuid]) -> Result<Vec<ReportPhoto>> {
        if report_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, ReportPhoto>(
            r#"
            SELECT id, report_id, photo_key, created_at
            FROM report_photos
            WHERE report_id = ANY($1)
            ORDER BY created_at ASC
            "#,
        )
        .bind(report_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch photo links: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(rows)
    }
}
