//! In-memory record store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{page_newest_first, ReceiptStore, Result, TransactionLedger};
use crate::models::receipt::ReceiptRecord;
use crate::models::transaction::{NewTransaction, TransactionRecord};

/// Keeps receipts and transactions in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    receipts: RwLock<HashMap<Uuid, ReceiptRecord>>,
    transactions: RwLock<HashMap<Uuid, TransactionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn receipt_count(&self) -> usize {
        self.receipts.read().await.len()
    }

    pub async fn transaction_count(&self) -> usize {
        self.transactions.read().await.len()
    }
}

#[async_trait]
impl ReceiptStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ReceiptRecord>> {
        Ok(self.receipts.read().await.get(&id).cloned())
    }

    async fn save(&self, record: &ReceiptRecord) -> Result<()> {
        self.receipts
            .write()
            .await
            .insert(record.id, record.clone());
        Ok(())
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool> {
        Ok(self.receipts.write().await.remove(&id).is_some())
    }

    async fn list_by_owner(
        &self,
        owner_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<ReceiptRecord>, usize)> {
        let owned = self
            .receipts
            .read()
            .await
            .values()
            .filter(|r| r.is_owned_by(owner_id))
            .cloned()
            .collect();
        Ok(page_newest_first(owned, offset, limit))
    }
}

#[async_trait]
impl TransactionLedger for MemoryStore {
    async fn create(&self, transaction: NewTransaction) -> Result<TransactionRecord> {
        let record = TransactionRecord::from_new(transaction);
        self.transactions
            .write()
            .await
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TransactionRecord>> {
        Ok(self.transactions.read().await.get(&id).cloned())
    }

    async fn list_by_receipt(&self, receipt_id: Uuid) -> Result<Vec<TransactionRecord>> {
        Ok(self
            .transactions
            .read()
            .await
            .values()
            .filter(|t| t.receipt_id == Some(receipt_id))
            .cloned()
            .collect())
    }
}
