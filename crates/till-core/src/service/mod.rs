//! Receipt lifecycle: ingestion, lookup, listing and deletion.
//!
//! Confirmation lives in [`review`].

mod review;

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Result, StoreError, TillError};
use crate::extraction::TextExtractor;
use crate::models::config::{ReviewConfig, TillConfig};
use crate::models::receipt::{ReceiptRecord, ReceiptStatus, SourceFile, StoredFile};
use crate::receipt::ReceiptParser;
use crate::storage::FileStorage;
use crate::store::{ReceiptStore, TransactionLedger};

/// Result of ingesting one upload.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub record: ReceiptRecord,
    /// Whether a person should check the extracted fields before confirming.
    pub needs_review: bool,
}

/// Offset pagination summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub pages: usize,
}

impl Pagination {
    fn new(page: usize, limit: usize, total: usize) -> Self {
        Self {
            page,
            limit,
            total,
            pages: total.div_ceil(limit),
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

/// Coordinates storage, extraction, parsing and persistence of receipts.
pub struct ReceiptService {
    receipts: Arc<dyn ReceiptStore>,
    ledger: Arc<dyn TransactionLedger>,
    files: FileStorage,
    extractor: TextExtractor,
    parser: ReceiptParser,
    review: ReviewConfig,
    confirm_lock: Mutex<()>,
}

impl ReceiptService {
    pub fn new(
        receipts: Arc<dyn ReceiptStore>,
        ledger: Arc<dyn TransactionLedger>,
        files: FileStorage,
        extractor: TextExtractor,
        config: &TillConfig,
    ) -> Self {
        Self {
            receipts,
            ledger,
            files,
            extractor,
            parser: ReceiptParser::new(),
            review: config.review.clone(),
            confirm_lock: Mutex::new(()),
        }
    }

    pub fn files(&self) -> &FileStorage {
        &self.files
    }

    /// Store raw upload bytes and ingest them.
    ///
    /// Uploads with an unsupported MIME type are removed again before the
    /// error is returned.
    pub async fn upload(
        &self,
        owner_id: &str,
        bytes: &[u8],
        original_name: &str,
        mime_type: &str,
    ) -> Result<IngestOutcome> {
        let stored = self.files.store(bytes, original_name, mime_type).await?;
        let stored_path = stored.stored_path.clone();

        match self.ingest(owner_id, stored).await {
            Err(e @ TillError::UnsupportedFileType(_)) => {
                self.files.remove_best_effort(&stored_path).await;
                Err(e)
            }
            other => other,
        }
    }

    /// Create a receipt record for a stored file and run extraction on it.
    ///
    /// Extraction failures leave the record `failed` and are reported through
    /// the returned outcome; only store errors are returned as `Err`.
    pub async fn ingest(&self, owner_id: &str, file: StoredFile) -> Result<IngestOutcome> {
        let source = SourceFile::try_from(file)?;
        let mut record = ReceiptRecord::new(owner_id, source);

        record.begin_processing()?;
        self.receipts.save(&record).await?;
        info!(
            "Processing receipt {} ({}, {})",
            record.id, record.source_file.original_name, record.source_file.mime_type
        );

        let processing = record.clone();

        match self.extractor.extract_text(&record.source_file).await {
            Ok(text) => {
                let parsed = self.parser.parse(&text);
                debug!(
                    "Receipt {}: merchant={:?} amount={} confidence={}",
                    record.id, parsed.merchant_name, parsed.amount, parsed.confidence
                );
                record.complete(parsed)?;
            }
            Err(e) => {
                warn!("Extraction failed for receipt {}: {}", record.id, e);
                record.fail(e.to_string())?;
                self.files
                    .remove_best_effort(&record.source_file.stored_path)
                    .await;
            }
        }

        if let Err(e) = self.receipts.save(&record).await {
            self.record_save_failure(processing, &e).await;
            return Err(e.into());
        }

        let needs_review = record.status() == ReceiptStatus::Failed
            || record.confidence_score() < self.review.needs_review_threshold;
        info!(
            "Receipt {} {} (confidence {}{})",
            record.id,
            record.status(),
            record.confidence_score(),
            if needs_review { ", needs review" } else { "" }
        );

        Ok(IngestOutcome {
            record,
            needs_review,
        })
    }

    /// Move a record whose result could not be saved from `processing` to
    /// `failed`, best-effort. Its file goes too.
    async fn record_save_failure(&self, mut record: ReceiptRecord, error: &StoreError) {
        warn!("Failed to save result for receipt {}: {}", record.id, error);

        if record.fail(format!("failed to save extraction result: {}", error)).is_err() {
            return;
        }
        self.files
            .remove_best_effort(&record.source_file.stored_path)
            .await;

        if let Err(e) = self.receipts.save(&record).await {
            warn!("Receipt {} left in processing: {}", record.id, e);
        }
    }

    /// Look up a receipt owned by `owner_id`.
    pub async fn get(&self, owner_id: &str, id: Uuid) -> Result<ReceiptRecord> {
        self.receipts
            .find_by_id(id)
            .await?
            .filter(|r| r.is_owned_by(owner_id))
            .ok_or(TillError::NotFound(id))
    }

    /// List an owner's receipts, newest first. Pages are 1-based; page 0 is
    /// treated as page 1 and a zero page size uses the configured default.
    pub async fn list(
        &self,
        owner_id: &str,
        page: usize,
        page_size: usize,
    ) -> Result<Page<ReceiptRecord>> {
        let page = page.max(1);
        let limit = match page_size {
            0 => self.review.default_page_size.max(1),
            n => n,
        };
        let offset = (page - 1).saturating_mul(limit);

        let (items, total) = self.receipts.list_by_owner(owner_id, offset, limit).await?;
        Ok(Page {
            items,
            pagination: Pagination::new(page, limit, total),
        })
    }

    /// Delete a receipt and its file. The file goes first, best-effort.
    pub async fn delete(&self, owner_id: &str, id: Uuid) -> Result<()> {
        let record = self.get(owner_id, id).await?;

        self.files
            .remove_best_effort(&record.source_file.stored_path)
            .await;

        if !self.receipts.delete_by_id(id).await? {
            return Err(TillError::NotFound(id));
        }
        info!("Deleted receipt {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testing::{FakeOcr, FakeRasterizer, Harness};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    const COFFEE: &str = "CoffeeShop\n01/02/2024\nLatte 4.50\nTotal $4.50";

    /// Memory store whose `n`th receipt save fails.
    struct FailingSave {
        inner: MemoryStore,
        saves: AtomicUsize,
        fail_on: usize,
    }

    impl FailingSave {
        fn new(fail_on: usize) -> Self {
            Self {
                inner: MemoryStore::new(),
                saves: AtomicUsize::new(0),
                fail_on,
            }
        }
    }

    #[async_trait]
    impl ReceiptStore for FailingSave {
        async fn find_by_id(&self, id: Uuid) -> crate::store::Result<Option<ReceiptRecord>> {
            ReceiptStore::find_by_id(&self.inner, id).await
        }

        async fn save(&self, record: &ReceiptRecord) -> crate::store::Result<()> {
            if self.saves.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_on {
                return Err(StoreError::Io(std::io::Error::other("disk full")));
            }
            self.inner.save(record).await
        }

        async fn delete_by_id(&self, id: Uuid) -> crate::store::Result<bool> {
            self.inner.delete_by_id(id).await
        }

        async fn list_by_owner(
            &self,
            owner_id: &str,
            offset: usize,
            limit: usize,
        ) -> crate::store::Result<(Vec<ReceiptRecord>, usize)> {
            self.inner.list_by_owner(owner_id, offset, limit).await
        }
    }

    #[tokio::test]
    async fn test_ingest_coffee_receipt() {
        let harness = Harness::new(FakeOcr::text(COFFEE));
        let stored = harness.stored("latte.png", "image/png").await;
        let stored_path = stored.stored_path.clone();

        let outcome = harness.service.ingest("alice", stored).await.unwrap();
        let record = &outcome.record;

        assert_eq!(record.status(), ReceiptStatus::Completed);
        assert!(!outcome.needs_review);
        assert_eq!(record.confidence_score(), 100);

        let extracted = record.extracted().unwrap();
        assert_eq!(extracted.merchant_name, "CoffeeShop");
        assert_eq!(extracted.amount, Decimal::new(450, 2));
        assert_eq!(
            extracted.date,
            Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(extracted.items.len(), 1);
        assert_eq!(extracted.items[0].name, "Latte");
        assert_eq!(extracted.items[0].price, Decimal::new(450, 2));
        assert_eq!(extracted.items[0].quantity, 1);

        assert!(stored_path.exists());
        let persisted = harness.service.get("alice", record.id).await.unwrap();
        assert_eq!(&persisted, record);
    }

    #[tokio::test]
    async fn test_low_confidence_needs_review() {
        let harness = Harness::new(FakeOcr::text("Acme Store\nthank you"));
        let stored = harness.stored("r.jpg", "image/jpeg").await;

        let outcome = harness.service.ingest("alice", stored).await.unwrap();
        assert_eq!(outcome.record.status(), ReceiptStatus::Completed);
        assert_eq!(outcome.record.confidence_score(), 30);
        assert!(outcome.needs_review);
    }

    #[tokio::test]
    async fn test_ocr_failure_marks_failed_and_removes_file() {
        let harness = Harness::new(FakeOcr::failing("engine crashed"));
        let stored = harness.stored("r.png", "image/png").await;
        let stored_path = stored.stored_path.clone();

        let outcome = harness.service.ingest("alice", stored).await.unwrap();
        let record = &outcome.record;

        assert_eq!(record.status(), ReceiptStatus::Failed);
        assert!(outcome.needs_review);
        assert!(record.extracted().is_none());
        assert_eq!(record.confidence_score(), 0);
        assert_eq!(record.errors.len(), 1);
        assert!(record.errors[0].message.contains("engine crashed"));
        assert!(!stored_path.exists());

        let persisted = harness.service.get("alice", record.id).await.unwrap();
        assert_eq!(persisted.status(), ReceiptStatus::Failed);
    }

    #[tokio::test]
    async fn test_unsupported_type_rejected_before_ocr() {
        let harness = Harness::new(FakeOcr::text(COFFEE));
        let stored = harness.stored("r.webp", "image/webp").await;

        let err = harness.service.ingest("alice", stored).await.unwrap_err();
        assert!(matches!(err, TillError::UnsupportedFileType(t) if t == "image/webp"));
        assert_eq!(harness.ocr.calls(), 0);
        assert_eq!(harness.store.receipt_count().await, 0);
    }

    #[tokio::test]
    async fn test_upload_discards_unsupported_file() {
        let harness = Harness::new(FakeOcr::text(COFFEE));

        let err = harness
            .service
            .upload("alice", b"RIFF", "r.webp", "image/webp")
            .await
            .unwrap_err();
        assert!(matches!(err, TillError::UnsupportedFileType(_)));

        let upload_dir = harness.service.files().upload_dir();
        assert_eq!(std::fs::read_dir(upload_dir).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_ownership_isolation() {
        let harness = Harness::new(FakeOcr::text(COFFEE));
        let stored = harness.stored("r.png", "image/png").await;
        let id = harness.service.ingest("alice", stored).await.unwrap().record.id;

        assert!(matches!(
            harness.service.get("bob", id).await,
            Err(TillError::NotFound(missing)) if missing == id
        ));
        assert!(matches!(
            harness.service.delete("bob", id).await,
            Err(TillError::NotFound(_))
        ));
        assert_eq!(harness.service.list("bob", 1, 10).await.unwrap().pagination.total, 0);
        assert!(harness.service.get("alice", id).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_twice() {
        let harness = Harness::new(FakeOcr::text(COFFEE));
        let stored = harness.stored("r.png", "image/png").await;
        let stored_path = stored.stored_path.clone();
        let id = harness.service.ingest("alice", stored).await.unwrap().record.id;

        harness.service.delete("alice", id).await.unwrap();
        assert!(!stored_path.exists());
        assert!(matches!(
            harness.service.delete("alice", id).await,
            Err(TillError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_pagination() {
        let harness = Harness::new(FakeOcr::text(COFFEE));
        let mut ids = Vec::new();
        for i in 0..5 {
            let stored = harness.stored(&format!("r{}.png", i), "image/png").await;
            ids.push(harness.service.ingest("alice", stored).await.unwrap().record.id);
        }

        let first = harness.service.list("alice", 1, 2).await.unwrap();
        assert_eq!(
            first.pagination,
            Pagination {
                page: 1,
                limit: 2,
                total: 5,
                pages: 3
            }
        );
        assert_eq!(first.items.len(), 2);

        let last = harness.service.list("alice", 3, 2).await.unwrap();
        assert_eq!(last.items.len(), 1);

        let beyond = harness.service.list("alice", 4, 2).await.unwrap();
        assert!(beyond.items.is_empty());

        // Page 0 is page 1; page size 0 is the configured default (10)
        let defaults = harness.service.list("alice", 0, 0).await.unwrap();
        assert_eq!(defaults.pagination.page, 1);
        assert_eq!(defaults.pagination.limit, 10);
        assert_eq!(defaults.items.len(), 5);

        for pair in defaults.items.windows(2) {
            assert!(pair[0].uploaded_at >= pair[1].uploaded_at);
        }
        let mut listed: Vec<_> = defaults.items.iter().map(|r| r.id).collect();
        listed.sort();
        ids.sort();
        assert_eq!(listed, ids);
    }

    #[tokio::test]
    async fn test_confidence_at_threshold_skips_review() {
        let harness = Harness::new(FakeOcr::text("Acme Store\nTotal $12.00"));
        let stored = harness.stored("r.png", "image/png").await;

        let outcome = harness.service.ingest("alice", stored).await.unwrap();
        assert_eq!(outcome.record.confidence_score(), 70);
        assert!(!outcome.needs_review);
    }

    #[tokio::test]
    async fn test_confidence_below_threshold_needs_review() {
        let harness = Harness::new(FakeOcr::text("Acme Store\n01/02/2024"));
        let stored = harness.stored("r.png", "image/png").await;

        let outcome = harness.service.ingest("alice", stored).await.unwrap();
        assert_eq!(outcome.record.status(), ReceiptStatus::Completed);
        assert_eq!(outcome.record.confidence_score(), 60);
        assert!(outcome.needs_review);
    }

    #[tokio::test]
    async fn test_failed_result_save_marks_record_failed() {
        let dir = tempfile::tempdir().unwrap();
        let config = TillConfig::default();
        let store = Arc::new(FailingSave::new(2));
        let extractor = TextExtractor::new(
            Arc::new(FakeOcr::text(COFFEE)),
            Arc::new(FakeRasterizer::new()),
            &config,
        );
        let files = FileStorage::new(dir.path().join("uploads"));
        let ledger = Arc::new(MemoryStore::new());
        let service = ReceiptService::new(store.clone(), ledger, files, extractor, &config);

        let stored = service
            .files()
            .store(b"receipt bytes", "r.png", "image/png")
            .await
            .unwrap();
        let stored_path = stored.stored_path.clone();

        let err = service.ingest("alice", stored).await.unwrap_err();
        assert!(matches!(err, TillError::Store(StoreError::Io(_))));

        let (records, total) = store.list_by_owner("alice", 0, 10).await.unwrap();
        assert_eq!(total, 1);
        let record = &records[0];
        assert_eq!(record.status(), ReceiptStatus::Failed);
        assert_eq!(record.errors.len(), 1);
        assert!(record.errors[0].message.contains("disk full"));
        assert!(!stored_path.exists());
    }

    #[test]
    fn test_pagination_math() {
        assert_eq!(Pagination::new(1, 10, 0).pages, 0);
        assert_eq!(Pagination::new(1, 10, 10).pages, 1);
        assert_eq!(Pagination::new(1, 10, 11).pages, 2);
    }
}
