//! Record store backed by a directory of JSON documents.
//!
//! Layout: `<root>/receipts/<id>.json` and `<root>/transactions/<id>.json`.
//! Every write goes to a `.tmp` sibling first and is renamed into place.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use super::{page_newest_first, ReceiptStore, Result, TransactionLedger};
use crate::error::StoreError;
use crate::models::receipt::ReceiptRecord;
use crate::models::transaction::{NewTransaction, TransactionRecord};

const RECEIPTS: &str = "receipts";
const TRANSACTIONS: &str = "transactions";

#[derive(Debug, Clone)]
pub struct JsonStore {
    root: PathBuf,
}

impl JsonStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(RECEIPTS)).await?;
        fs::create_dir_all(root.join(TRANSACTIONS)).await?;
        debug!("Opened JSON store at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, collection: &str, id: Uuid) -> PathBuf {
        self.root.join(collection).join(format!("{}.json", id))
    }

    async fn write_document<T: Serialize>(&self, collection: &str, id: Uuid, value: &T) -> Result<()> {
        let path = self.document_path(collection, id);
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, serde_json::to_vec_pretty(value)?).await?;
        fs::rename(&temp_path, &path).await?;
        Ok(())
    }

    async fn read_document<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    async fn read_collection<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>> {
        let mut entries = fs::read_dir(self.root.join(collection)).await?;
        let mut documents = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            // Removed between listing and reading
            if let Some(document) = self.read_document(&path).await? {
                documents.push(document);
            }
        }
        Ok(documents)
    }
}

#[async_trait]
impl ReceiptStore for JsonStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ReceiptRecord>> {
        self.read_document(&self.document_path(RECEIPTS, id)).await
    }

    async fn save(&self, record: &ReceiptRecord) -> Result<()> {
        self.write_document(RECEIPTS, record.id, record).await
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool> {
        match fs::remove_file(self.document_path(RECEIPTS, id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_by_owner(
        &self,
        owner_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<ReceiptRecord>, usize)> {
        let owned = self
            .read_collection::<ReceiptRecord>(RECEIPTS)
            .await?
            .into_iter()
            .filter(|r| r.is_owned_by(owner_id))
            .collect();
        Ok(page_newest_first(owned, offset, limit))
    }
}

#[async_trait]
impl TransactionLedger for JsonStore {
    async fn create(&self, transaction: NewTransaction) -> Result<TransactionRecord> {
        let record = TransactionRecord::from_new(transaction);
        self.write_document(TRANSACTIONS, record.id, &record).await?;
        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TransactionRecord>> {
        self.read_document(&self.document_path(TRANSACTIONS, id)).await
    }

    async fn list_by_receipt(&self, receipt_id: Uuid) -> Result<Vec<TransactionRecord>> {
        Ok(self
            .read_collection::<TransactionRecord>(TRANSACTIONS)
            .await?
            .into_iter()
            .filter(|t| t.receipt_id == Some(receipt_id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::receipt::{MimeType, ParsedReceipt, SourceFile};
    use crate::models::transaction::{TransactionKind, TransactionSource};
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn completed_record(owner: &str) -> ReceiptRecord {
        let mut record = ReceiptRecord::new(
            owner,
            SourceFile {
                original_name: "r.pdf".to_string(),
                stored_path: "uploads/receipt-1.pdf".into(),
                mime_type: MimeType::Pdf,
                size_bytes: 2048,
            },
        );
        record.begin_processing().unwrap();
        record
            .complete(ParsedReceipt {
                merchant_name: "Acme Store".to_string(),
                amount: Decimal::new(1200, 2),
                date: Utc::now(),
                items: Vec::new(),
                raw_text: "Acme Store\nTotal $12.00".to_string(),
                confidence: 70,
            })
            .unwrap();
        record
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let record = completed_record("alice");

        {
            let store = JsonStore::open(dir.path()).await.unwrap();
            store.save(&record).await.unwrap();
        }

        let store = JsonStore::open(dir.path()).await.unwrap();
        let loaded = ReceiptStore::find_by_id(&store, record.id).await.unwrap();
        assert_eq!(loaded, Some(record.clone()));

        let (page, total) = store.list_by_owner("alice", 0, 10).await.unwrap();
        assert_eq!((page, total), (vec![record.clone()], 1));
        assert_eq!(store.list_by_owner("bob", 0, 10).await.unwrap().1, 0);

        assert!(ReceiptStore::delete_by_id(&store, record.id).await.unwrap());
        assert!(ReceiptStore::find_by_id(&store, record.id).await.unwrap().is_none());
        assert!(!ReceiptStore::delete_by_id(&store, record.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path()).await.unwrap();

        let mut record = completed_record("alice");
        store.save(&record).await.unwrap();
        record.link(Uuid::new_v4()).unwrap();
        store.save(&record).await.unwrap();

        let (page, total) = store.list_by_owner("alice", 0, 10).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(page[0].linked_transaction_id(), record.linked_transaction_id());
    }

    #[tokio::test]
    async fn test_corrupt_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path()).await.unwrap();

        let id = Uuid::new_v4();
        std::fs::write(store.document_path(RECEIPTS, id), "{ not json").unwrap();

        assert!(matches!(
            ReceiptStore::find_by_id(&store, id).await,
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[tokio::test]
    async fn test_transactions_persist() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path()).await.unwrap();
        let receipt_id = Uuid::new_v4();

        let created = store
            .create(NewTransaction {
                owner_id: "alice".to_string(),
                amount: Decimal::new(1200, 2),
                description: "Acme Store".to_string(),
                category: "Groceries".to_string(),
                date: Utc::now(),
                kind: TransactionKind::Expense,
                source: TransactionSource::ReceiptUpload,
                receipt_id: Some(receipt_id),
                notes: "weekly shop".to_string(),
            })
            .await
            .unwrap();

        let reopened = JsonStore::open(dir.path()).await.unwrap();
        assert_eq!(
            TransactionLedger::find_by_id(&reopened, created.id).await.unwrap(),
            Some(created.clone())
        );
        assert_eq!(reopened.list_by_receipt(receipt_id).await.unwrap(), vec![created]);
    }
}
