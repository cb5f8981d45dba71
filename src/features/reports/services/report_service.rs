use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::core::config::UploadConfig;
use crate::core::deadline::with_deadline;
use crate::core::error::{AppError, Result};
use crate::features::reports::dtos::{
    is_mime_type_allowed, PageSource, PhotoUpload, ReportListItemDto, ReportPageDto,
    ReportPageResponseDto, ALLOWED_MIME_TYPES,
};
use crate::features::reports::models::NewReport;
use crate::features::reports::services::ReportStore;
use crate::modules::cache::Cache;
use crate::modules::storage::ObjectStorage;
use crate::shared::constants::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE, REPORTS_CACHE_PREFIX};
use crate::shared::types::{total_pages, PaginationQuery};

/// Outcome of a committed report creation
#[derive(Debug, Clone)]
pub struct CreatedReport {
    pub report_id: Uuid,
    pub photo_keys: Vec<String>,
}

/// Shared progress record for one creation.
///
/// Upload tasks are detached from the request future, so after a failure or
/// deadline expiry the compensator and late-finishing uploads race. The
/// ledger arbitrates that race under one lock: once `begin_compensation` has
/// run, `record` refuses further keys and the uploader removes its own blob.
#[derive(Default)]
struct UploadLedger {
    inner: Mutex<LedgerInner>,
}

#[derive(Default)]
struct LedgerInner {
    report_id: Option<Uuid>,
    uploaded: Vec<String>,
    compensating: bool,
}

impl UploadLedger {
    fn new() -> Self {
        Self::default()
    }

    fn set_report_id(&self, id: Uuid) {
        self.inner.lock().unwrap().report_id = Some(id);
    }

    /// Record a finished upload. Returns false if compensation already
    /// started, in which case the caller owns the cleanup of its blob.
    fn record(&self, key: String) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.compensating {
            return false;
        }
        inner.uploaded.push(key);
        true
    }

    /// Close the ledger and take everything recorded so far.
    fn begin_compensation(&self) -> (Option<Uuid>, Vec<String>) {
        let mut inner = self.inner.lock().unwrap();
        inner.compensating = true;
        (inner.report_id.take(), std::mem::take(&mut inner.uploaded))
    }
}

/// Generate a globally unique blob key for an uploaded photo.
///
/// The UUIDv4 nonce carries 122 random bits, so two uploads of the same
/// filename from any number of instances cannot realistically collide; the
/// timestamp and pid prefix keep keys sortable and attributable.
pub(crate) fn object_key(original_filename: &str) -> String {
    format!(
        "{}-{}-{}-{}",
        Utc::now().timestamp_millis(),
        std::process::id(),
        Uuid::new_v4(),
        sanitize_filename(original_filename)
    )
}

fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned
    }
}

fn page_cache_key(page: i64, limit: i64) -> String {
    format!("{}:{}:{}", REPORTS_CACHE_PREFIX, page, limit)
}

fn first_page_cache_key() -> String {
    page_cache_key(DEFAULT_PAGE, DEFAULT_PAGE_SIZE)
}

/// Service for report operations: the write-path creation saga and the
/// cached, paginated read path.
pub struct ReportService {
    store: Arc<dyn ReportStore>,
    storage: Arc<dyn ObjectStorage>,
    cache: Arc<dyn Cache>,
    upload: UploadConfig,
    cache_ttl_secs: u64,
}

impl ReportService {
    pub fn new(
        store: Arc<dyn ReportStore>,
        storage: Arc<dyn ObjectStorage>,
        cache: Arc<dyn Cache>,
        upload: UploadConfig,
        cache_ttl_secs: u64,
    ) -> Self {
        Self {
            store,
            storage,
            cache,
            upload,
            cache_ttl_secs,
        }
    }

    /// Create a report with its photo attachments.
    ///
    /// The metadata row is committed first, photos are uploaded in parallel,
    /// link rows are inserted as one batch, and the first list page is
    /// invalidated. All photos must make it or none do: any failure after the
    /// metadata insert, including running out of the wall-clock budget,
    /// removes the uploaded blobs and the metadata row before the error is
    /// returned.
    pub async fn create_report(
        &self,
        data: NewReport,
        photos: Vec<PhotoUpload>,
    ) -> Result<CreatedReport> {
        self.check_input(&data, &photos)?;

        let ledger = Arc::new(UploadLedger::new());
        let budget = Duration::from_secs(self.upload.timeout_secs);

        match with_deadline(budget, self.run_creation(data, photos, Arc::clone(&ledger))).await {
            Ok(created) => Ok(created),
            Err(error) => {
                if error.is_store_error() {
                    tracing::error!("Creation failed on a backing store: {}", error);
                }
                self.compensate(&ledger).await;
                Err(error)
            }
        }
    }

    /// Defense-in-depth re-check of the upstream multipart contract.
    fn check_input(&self, data: &NewReport, photos: &[PhotoUpload]) -> Result<()> {
        if data.title.trim().is_empty()
            || data.description.trim().is_empty()
            || data.category.trim().is_empty()
        {
            return Err(AppError::Validation(
                "title, description and category are required".to_string(),
            ));
        }

        if photos.is_empty() {
            return Err(AppError::Validation(
                "at least one photo is required".to_string(),
            ));
        }

        if photos.len() > self.upload.max_files {
            return Err(AppError::Validation(format!(
                "at most {} photos are allowed",
                self.upload.max_files
            )));
        }

        for photo in photos {
            if photo.data.len() > self.upload.max_file_size {
                return Err(AppError::Validation(format!(
                    "photo '{}' exceeds the {} byte limit",
                    photo.file_name, self.upload.max_file_size
                )));
            }
            if !is_mime_type_allowed(&photo.content_type) {
                return Err(AppError::Validation(format!(
                    "photo type '{}' is not allowed. Allowed types: {}",
                    photo.content_type,
                    ALLOWED_MIME_TYPES.join(", ")
                )));
            }
        }

        Ok(())
    }

    async fn run_creation(
        &self,
        data: NewReport,
        photos: Vec<PhotoUpload>,
        ledger: Arc<UploadLedger>,
    ) -> Result<CreatedReport> {
        let report = self.store.insert_report(&data).await?;
        ledger.set_report_id(report.id);
        tracing::info!("Report row committed: id={}", report.id);

        // One detached task per photo: losing the deadline race must not
        // cancel in-flight puts, it only stops us waiting for them.
        let mut handles = Vec::with_capacity(photos.len());
        for photo in photos {
            let storage = Arc::clone(&self.storage);
            let ledger = Arc::clone(&ledger);
            let key = object_key(&photo.file_name);

            handles.push(tokio::spawn(async move {
                storage
                    .put_object(&key, photo.data, &photo.content_type)
                    .await?;

                if !ledger.record(key.clone()) {
                    // Compensation already ran; this upload owns its cleanup
                    if let Err(e) = storage.delete_object(&key).await {
                        tracing::warn!("Failed to remove blob '{}' after abort: {}", key, e);
                    }
                    return Err(AppError::Storage(format!(
                        "upload of '{}' finished after the request was abandoned",
                        key
                    )));
                }

                tracing::debug!("Photo uploaded: key={}", key);
                Ok(key)
            }));
        }

        // Strict completion policy: the first failed upload fails the
        // whole creation.
        let mut keys = Vec::with_capacity(handles.len());
        for handle in handles {
            let key = handle
                .await
                .map_err(|e| AppError::Internal(format!("upload task failed: {}", e)))??;
            keys.push(key);
        }

        self.store.insert_photos(report.id, &keys).await?;
        tracing::info!(
            "Photos linked: report_id={}, total={}",
            report.id,
            keys.len()
        );

        self.invalidate_first_page().await;

        Ok(CreatedReport {
            report_id: report.id,
            photo_keys: keys,
        })
    }

    /// Drop only the cache key whose page changed; concurrent readers of
    /// other pages keep their cache.
    async fn invalidate_first_page(&self) {
        let key = first_page_cache_key();
        if let Err(e) = self.cache.del(&key).await {
            tracing::warn!("Cache invalidation failed for '{}': {}", key, e);
        }
    }

    /// Undo whatever the ledger recorded: delete uploaded blobs in parallel,
    /// then the metadata row. Every step is best-effort and logged; the
    /// original error stays the one the caller sees.
    async fn compensate(&self, ledger: &UploadLedger) {
        let (report_id, keys) = ledger.begin_compensation();
        if report_id.is_none() && keys.is_empty() {
            return;
        }

        tracing::warn!(
            "Compensating failed creation: report_id={:?}, uploaded_blobs={}",
            report_id,
            keys.len()
        );

        let deletes = keys.into_iter().map(|key| {
            let storage = Arc::clone(&self.storage);
            async move {
                match storage.delete_object(&key).await {
                    Ok(()) => tracing::info!("Compensation removed blob '{}'", key),
                    Err(e) => tracing::error!("Compensation failed for blob '{}': {}", key, e),
                }
            }
        });
        futures::future::join_all(deletes).await;

        if let Some(id) = report_id {
            match self.store.delete_report(id).await {
                Ok(()) => tracing::info!("Compensation removed report row {}", id),
                Err(e) => tracing::error!("Compensation failed for report row {}: {}", id, e),
            }
        }
    }

    /// Serve one listing page, from the cache when possible.
    ///
    /// Cache trouble of any kind degrades to a database read; a page that
    /// cannot be cached is still served.
    pub async fn list_reports(&self, query: &PaginationQuery) -> Result<ReportPageResponseDto> {
        query.validate().map_err(AppError::Validation)?;

        let cache_key = page_cache_key(query.page, query.limit);

        match self.cache.get(&cache_key).await {
            Ok(Some(cached)) => match serde_json::from_str::<ReportPageDto>(&cached) {
                Ok(body) => {
                    tracing::debug!("Cache hit: {}", cache_key);
                    return Ok(ReportPageResponseDto {
                        source: PageSource::Cache,
                        body,
                    });
                }
                Err(e) => {
                    tracing::warn!("Discarding undecodable cache entry '{}': {}", cache_key, e)
                }
            },
            Ok(None) => {}
            Err(e) => tracing::warn!("Cache read failed for '{}': {}", cache_key, e),
        }

        let total = self.store.count_reports().await?;
        let reports = self.store.list_page(query.limit, query.offset()).await?;

        let ids: Vec<Uuid> = reports.iter().map(|r| r.id).collect();
        let mut photos_by_report: HashMap<Uuid, Vec<String>> = HashMap::new();
        for photo in self.store.photos_for_reports(&ids).await? {
            photos_by_report
                .entry(photo.report_id)
                .or_default()
                .push(photo.photo_key);
        }

        let data = reports
            .into_iter()
            .map(|report| ReportListItemDto {
                photos: photos_by_report.remove(&report.id).unwrap_or_default(),
                id: report.id,
                title: report.title,
                description: report.description,
                category: report.category,
                location: report.location,
                created_at: report.created_at,
            })
            .collect();

        let body = ReportPageDto {
            page: query.page,
            limit: query.limit,
            total_data: total,
            total_page: total_pages(total, query.limit),
            data,
        };

        match serde_json::to_string(&body) {
            Ok(payload) => {
                if let Err(e) = self
                    .cache
                    .set_ex(&cache_key, &payload, self.cache_ttl_secs)
                    .await
                {
                    tracing::warn!("Cache population failed for '{}': {}", cache_key, e);
                }
            }
            Err(e) => tracing::warn!("Failed to serialize page for caching: {}", e),
        }

        Ok(ReportPageResponseDto {
            source: PageSource::Database,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::{jpeg_photo, photo_with, test_harness};
    use std::collections::HashSet;

    fn pothole_report() -> NewReport {
        NewReport {
            title: "Pothole".to_string(),
            description: "Large pothole".to_string(),
            category: "infrastructure".to_string(),
            location: Some("Jalan Merdeka".to_string()),
        }
    }

    #[test]
    fn object_keys_are_distinct_for_identical_filenames() {
        let keys: HashSet<String> = (0..200).map(|_| object_key("photo.jpg")).collect();
        assert_eq!(keys.len(), 200);
    }

    #[test]
    fn object_keys_sanitize_hostile_filenames() {
        let key = object_key("../../etc/passwd #1.png");
        assert!(!key.contains('/'));
        assert!(!key.contains(' '));
        assert!(key.ends_with(".._.._etc_passwd__1.png"));
    }

    #[test]
    fn ledger_refuses_records_after_compensation() {
        let ledger = UploadLedger::new();
        assert!(ledger.record("a".to_string()));

        let (report_id, keys) = ledger.begin_compensation();
        assert!(report_id.is_none());
        assert_eq!(keys, vec!["a".to_string()]);

        // Late-finishing uploads must be told to clean up after themselves
        assert!(!ledger.record("b".to_string()));
        let (_, drained) = ledger.begin_compensation();
        assert!(drained.is_empty());
    }

    #[tokio::test]
    async fn create_commits_metadata_links_and_blobs() {
        let h = test_harness();

        let created = h
            .service
            .create_report(
                pothole_report(),
                vec![jpeg_photo("first.jpg"), jpeg_photo("second.jpg")],
            )
            .await
            .unwrap();

        // Attachment count conservation
        assert_eq!(created.photo_keys.len(), 2);
        let distinct: HashSet<&String> = created.photo_keys.iter().collect();
        assert_eq!(distinct.len(), 2);

        assert_eq!(h.store.report_count(), 1);
        let mut linked = h.store.photo_keys_for(created.report_id);
        let mut returned = created.photo_keys.clone();
        linked.sort();
        returned.sort();
        assert_eq!(linked, returned);

        for key in &created.photo_keys {
            assert!(h.storage.contains(key));
        }
    }

    #[tokio::test]
    async fn create_invalidates_only_the_first_page_key() {
        let h = test_harness();
        h.cache.seed("reports:1:10", "{\"stale\":true}");
        h.cache.seed("reports:2:10", "{\"other\":true}");

        h.service
            .create_report(pothole_report(), vec![jpeg_photo("a.jpg")])
            .await
            .unwrap();

        assert!(!h.cache.contains("reports:1:10"));
        assert!(h.cache.contains("reports:2:10"));
    }

    #[tokio::test]
    async fn concurrent_creations_with_same_filename_never_collide() {
        let h = test_harness();

        let (first, second) = tokio::join!(
            h.service
                .create_report(pothole_report(), vec![jpeg_photo("same.jpg")]),
            h.service
                .create_report(pothole_report(), vec![jpeg_photo("same.jpg")]),
        );

        let mut all_keys = first.unwrap().photo_keys;
        all_keys.extend(second.unwrap().photo_keys);
        let distinct: HashSet<&String> = all_keys.iter().collect();
        assert_eq!(distinct.len(), all_keys.len());
    }

    #[tokio::test]
    async fn upload_failure_removes_metadata_and_blobs() {
        let h = test_harness();
        h.storage.fail_puts();

        let result = h
            .service
            .create_report(
                pothole_report(),
                vec![jpeg_photo("a.jpg"), jpeg_photo("b.jpg")],
            )
            .await;

        assert!(matches!(result, Err(ref e) if e.is_store_error()));
        assert_eq!(h.store.report_count(), 0);
        assert!(h.storage.is_empty());
    }

    #[tokio::test]
    async fn link_failure_removes_metadata_and_blobs() {
        let h = test_harness();
        h.store.fail_insert_photos();

        let result = h
            .service
            .create_report(pothole_report(), vec![jpeg_photo("a.jpg")])
            .await;

        assert!(matches!(result, Err(ref e) if e.is_store_error()));
        assert_eq!(h.store.report_count(), 0);
        assert!(h.storage.is_empty());
    }

    #[tokio::test]
    async fn metadata_failure_needs_no_compensation() {
        let h = test_harness();
        h.store.fail_insert_report();

        let result = h
            .service
            .create_report(pothole_report(), vec![jpeg_photo("a.jpg")])
            .await;

        assert!(matches!(result, Err(ref e) if e.is_store_error()));
        assert!(h.storage.is_empty());
        assert_eq!(h.store.delete_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_expiry_times_out_and_compensates() {
        let h = test_harness();
        h.storage.delay_puts(Duration::from_secs(60));

        let result = h
            .service
            .create_report(
                pothole_report(),
                vec![jpeg_photo("slow-1.jpg"), jpeg_photo("slow-2.jpg")],
            )
            .await;

        assert!(matches!(result, Err(AppError::Timeout(_))));
        assert_eq!(h.store.report_count(), 0);

        // The detached uploads finish long after the 504 went out; they must
        // observe the closed ledger and remove their own blobs.
        tokio::time::sleep(Duration::from_secs(120)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(h.storage.is_empty());
        assert_eq!(h.store.report_count(), 0);
    }

    #[tokio::test]
    async fn validation_failures_touch_no_store() {
        let h = test_harness();

        let no_title = NewReport {
            title: "  ".to_string(),
            ..pothole_report()
        };
        let cases: Vec<(NewReport, Vec<PhotoUpload>)> = vec![
            (no_title, vec![jpeg_photo("a.jpg")]),
            (pothole_report(), vec![]),
            (
                pothole_report(),
                (0..5).map(|i| jpeg_photo(&format!("{}.jpg", i))).collect(),
            ),
            (
                pothole_report(),
                vec![photo_with("big.jpg", "image/jpeg", 6 * 1024 * 1024)],
            ),
            (
                pothole_report(),
                vec![photo_with("notes.pdf", "application/pdf", 128)],
            ),
        ];

        for (data, photos) in cases {
            let result = h.service.create_report(data, photos).await;
            assert!(matches!(result, Err(AppError::Validation(_))));
        }

        assert_eq!(h.store.report_count(), 0);
        assert!(h.storage.is_empty());
    }

    #[tokio::test]
    async fn list_miss_reads_database_and_populates_cache() {
        let h = test_harness();
        let created = h
            .service
            .create_report(pothole_report(), vec![jpeg_photo("a.jpg")])
            .await
            .unwrap();

        let query = PaginationQuery { page: 1, limit: 10 };
        let first = h.service.list_reports(&query).await.unwrap();

        assert_eq!(first.source, PageSource::Database);
        assert_eq!(first.body.total_data, 1);
        assert_eq!(first.body.total_page, 1);
        assert_eq!(first.body.data.len(), 1);
        assert_eq!(first.body.data[0].title, "Pothole");
        assert_eq!(first.body.data[0].photos, created.photo_keys);

        // Second read is served from the freshly populated cache
        let second = h.service.list_reports(&query).await.unwrap();
        assert_eq!(second.source, PageSource::Cache);
        assert_eq!(second.body.total_data, 1);
        assert_eq!(second.body.data[0].id, first.body.data[0].id);
    }

    #[tokio::test]
    async fn listing_after_create_never_serves_the_stale_first_page() {
        let h = test_harness();
        let query = PaginationQuery { page: 1, limit: 10 };

        // Warm the first-page cache entry while the listing is empty
        let warmup = h.service.list_reports(&query).await.unwrap();
        assert_eq!(warmup.source, PageSource::Database);
        assert!(h.cache.contains("reports:1:10"));

        let created = h
            .service
            .create_report(pothole_report(), vec![jpeg_photo("a.jpg")])
            .await
            .unwrap();

        let listing = h.service.list_reports(&query).await.unwrap();
        assert_eq!(listing.source, PageSource::Database);
        assert!(listing
            .body
            .data
            .iter()
            .any(|item| item.id == created.report_id));
    }

    #[tokio::test]
    async fn pagination_arithmetic_spans_pages() {
        let h = test_harness();
        for i in 0..25 {
            let report = NewReport {
                title: format!("Report {}", i),
                ..pothole_report()
            };
            h.store.insert_plain(report);
        }

        let page = h
            .service
            .list_reports(&PaginationQuery { page: 3, limit: 10 })
            .await
            .unwrap();

        assert_eq!(page.body.total_data, 25);
        assert_eq!(page.body.total_page, 3);
        assert_eq!(page.body.data.len(), 5);
    }

    #[tokio::test]
    async fn cache_trouble_degrades_to_database_reads() {
        let h = test_harness();
        h.cache.fail_reads();
        h.cache.fail_writes();
        h.store.insert_plain(pothole_report());

        let listing = h
            .service
            .list_reports(&PaginationQuery { page: 1, limit: 10 })
            .await
            .unwrap();

        assert_eq!(listing.source, PageSource::Database);
        assert_eq!(listing.body.total_data, 1);
    }

    #[tokio::test]
    async fn list_rejects_out_of_range_pagination() {
        let h = test_harness();

        for query in [
            PaginationQuery { page: 0, limit: 10 },
            PaginationQuery { page: 1, limit: 0 },
            PaginationQuery {
                page: 1,
                limit: 101,
            },
        ] {
            let result = h.service.list_reports(&query).await;
            assert!(matches!(result, Err(AppError::Validation(_))));
        }
    }
}
