//! In-memory store, storage and cache fakes for exercising the report
//! feature without Postgres, MinIO or Redis. Fault and latency injection is
//! flag-based so tests can flip behavior per scenario.

#![cfg(test)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::core::config::UploadConfig;
use crate::core::error::{AppError, Result};
use crate::features::reports::dtos::PhotoUpload;
use crate::features::reports::models::{NewReport, Report, ReportPhoto};
use crate::features::reports::services::{ReportService, ReportStore};
use crate::modules::cache::{Cache, CacheError};
use crate::modules::storage::ObjectStorage;

#[derive(Default)]
pub struct MemoryReportStore {
    reports: Mutex<Vec<Report>>,
    photos: Mutex<Vec<ReportPhoto>>,
    fail_insert_report: AtomicBool,
    fail_insert_photos: AtomicBool,
    delete_calls: AtomicUsize,
}

impl MemoryReportStore {
    pub fn fail_insert_report(&self) {
        self.fail_insert_report.store(true, Ordering::SeqCst);
    }

    pub fn fail_insert_photos(&self) {
        self.fail_insert_photos.store(true, Ordering::SeqCst);
    }

    pub fn report_count(&self) -> usize {
        self.reports.lock().unwrap().len()
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn photo_keys_for(&self, report_id: Uuid) -> Vec<String> {
        self.photos
            .lock()
            .unwrap()
            .iter()
            .filter(|photo| photo.report_id == report_id)
            .map(|photo| photo.photo_key.clone())
            .collect()
    }

    /// Seed a committed report directly, bypassing the creation saga
    pub fn insert_plain(&self, data: NewReport) -> Report {
        let report = Report {
            id: Uuid::new_v4(),
            title: data.title,
            description: data.description,
            category: data.category,
            location: data.location,
            created_at: Utc::now(),
        };
        self.reports.lock().unwrap().push(report.clone());
        report
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn insert_report(&self, data: &NewReport) -> Result<Report> {
        if self.fail_insert_report.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self.insert_plain(data.clone()))
    }

    async fn insert_photos(&self, report_id: Uuid, keys: &[String]) -> Result<()> {
        if self.fail_insert_photos.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut photos = self.photos.lock().unwrap();
        for key in keys {
            photos.push(ReportPhoto {
                id: Uuid::new_v4(),
                report_id,
                photo_key: key.clone(),
                created_at: Utc::now(),
            });
        }
        Ok(())
    }

    async fn delete_report(&self, report_id: Uuid) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.reports.lock().unwrap().retain(|r| r.id != report_id);
        self.photos
            .lock()
            .unwrap()
            .retain(|photo| photo.report_id != report_id);
        Ok(())
    }

    async fn count_reports(&self) -> Result<i64> {
        Ok(self.reports.lock().unwrap().len() as i64)
    }

    async fn list_page(&self, limit: i64, offset: i64) -> Result<Vec<Report>> {
        let reports = self.reports.lock().unwrap();
        Ok(reports
            .iter()
            .rev() // newest first, like the ORDER BY created_at DESC
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn photos_for_reports(&self, report_ids: &[Uuid]) -> Result<Vec<ReportPhoto>> {
        Ok(self
            .photos
            .lock()
            .unwrap()
            .iter()
            .filter(|photo| report_ids.contains(&photo.report_id))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryObjectStorage {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    fail_puts: AtomicBool,
    put_delay_ms: AtomicU64,
}

impl MemoryObjectStorage {
    pub fn fail_puts(&self) {
        self.fail_puts.store(true, Ordering::SeqCst);
    }

    pub fn delay_puts(&self, delay: Duration) {
        self.put_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs.lock().unwrap().contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn put_object(&self, key: &str, data: Vec<u8>, _content_type: &str) -> Result<()> {
        let delay_ms = self.put_delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(AppError::Storage(format!("injected put failure for '{}'", key)));
        }
        self.blobs.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        // Idempotent like the real store: deleting an absent key succeeds
        self.blobs.lock().unwrap().remove(key);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryCache {
    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn seed(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> std::result::Result<Option<String>, CacheError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("injected read failure".to_string()));
        }
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set_ex(
        &self,
        key: &str,
        value: &str,
        _ttl_secs: u64,
    ) -> std::result::Result<(), CacheError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("injected write failure".to_string()));
        }
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn del(&self, key: &str) -> std::result::Result<(), CacheError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("injected del failure".to_string()));
        }
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

pub struct TestHarness {
    pub store: Arc<MemoryReportStore>,
    pub storage: Arc<MemoryObjectStorage>,
    pub cache: Arc<MemoryCache>,
    pub service: Arc<ReportService>,
}

pub fn upload_limits() -> UploadConfig {
    UploadConfig {
        max_files: 4,
        max_file_size: 5 * 1024 * 1024,
        timeout_secs: 9,
    }
}

pub fn test_harness() -> TestHarness {
    let store = Arc::new(MemoryReportStore::default());
    let storage = Arc::new(MemoryObjectStorage::default());
    let cache = Arc::new(MemoryCache::default());

    let service = Arc::new(ReportService::new(
        store.clone(),
        storage.clone(),
        cache.clone(),
        upload_limits(),
        60,
    ));

    TestHarness {
        store,
        storage,
        cache,
        service,
    }
}

pub fn jpeg_photo(file_name: &str) -> PhotoUpload {
    PhotoUpload {
        data: vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10],
        file_name: file_name.to_string(),
        content_type: "image/jpeg".to_string(),
    }
}

pub fn photo_with(file_name: &str, content_type: &str, size: usize) -> PhotoUpload {
    PhotoUpload {
        data: vec![0u8; size],
        file_name: file_name.to_string(),
        content_type: content_type.to_string(),
    }
}
