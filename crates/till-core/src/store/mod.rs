//! Persistence for receipt and transaction records.

mod json;
mod memory;

pub use json::JsonStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::receipt::ReceiptRecord;
use crate::models::transaction::{NewTransaction, TransactionRecord};

pub type Result<T> = std::result::Result<T, StoreError>;

/// Receipt record persistence.
#[async_trait]
pub trait ReceiptStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ReceiptRecord>>;

    /// Insert or replace a record.
    async fn save(&self, record: &ReceiptRecord) -> Result<()>;

    /// Remove a record, returning whether it existed.
    async fn delete_by_id(&self, id: Uuid) -> Result<bool>;

    /// One page of an owner's records, newest upload first, together with the
    /// owner's total record count.
    async fn list_by_owner(
        &self,
        owner_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<ReceiptRecord>, usize)>;
}

/// The slice of the transaction ledger the receipt pipeline writes to.
#[async_trait]
pub trait TransactionLedger: Send + Sync {
    async fn create(&self, transaction: NewTransaction) -> Result<TransactionRecord>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TransactionRecord>>;

    /// Transactions created from a given receipt.
    async fn list_by_receipt(&self, receipt_id: Uuid) -> Result<Vec<TransactionRecord>>;
}

/// Sort newest upload first (ties broken by id) and cut one page out.
pub(crate) fn page_newest_first(
    mut records: Vec<ReceiptRecord>,
    offset: usize,
    limit: usize,
) -> (Vec<ReceiptRecord>, usize) {
    records.sort_by(|a, b| {
        b.uploaded_at
            .cmp(&a.uploaded_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    let total = records.len();
    let page = records.into_iter().skip(offset).take(limit).collect();
    (page, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::receipt::{MimeType, SourceFile};
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;

    fn record_at(minutes_ago: i64) -> ReceiptRecord {
        let mut record = ReceiptRecord::new(
            "user-1",
            SourceFile {
                original_name: "r.png".to_string(),
                stored_path: "r.png".into(),
                mime_type: MimeType::Png,
                size_bytes: 1,
            },
        );
        record.uploaded_at = Utc::now() - Duration::minutes(minutes_ago);
        record
    }

    #[test]
    fn test_page_newest_first() {
        let records: Vec<_> = [5, 1, 3, 2, 4].into_iter().map(record_at).collect();
        let mut expected = records.clone();
        expected.sort_by_key(|r| std::cmp::Reverse(r.uploaded_at));

        let (page, total) = page_newest_first(records.clone(), 0, 2);
        assert_eq!(total, 5);
        assert_eq!(page, expected[..2].to_vec());

        let (page, _) = page_newest_first(records.clone(), 4, 2);
        assert_eq!(page, expected[4..].to_vec());

        let (page, total) = page_newest_first(records, 10, 2);
        assert!(page.is_empty());
        assert_eq!(total, 5);
    }

    #[test]
    fn test_ties_broken_by_id() {
        let a = record_at(0);
        let mut b = record_at(0);
        b.uploaded_at = a.uploaded_at;

        let (page, _) = page_newest_first(vec![a.clone(), b.clone()], 0, 10);
        let (reversed, _) = page_newest_first(vec![b, a], 0, 10);
        assert_eq!(page, reversed);
        assert!(page[0].id < page[1].id);
    }
}
