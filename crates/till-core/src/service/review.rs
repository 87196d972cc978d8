//! Review/confirm: turning a completed receipt into a ledger transaction.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::ReceiptService;
use crate::error::{Result, TillError};
use crate::models::receipt::ReceiptStatus;
use crate::models::transaction::{
    ConfirmedFields, NewTransaction, TransactionKind, TransactionRef, TransactionSource,
};

impl ReceiptService {
    /// Create an expense from reviewed fields and link it to the receipt.
    ///
    /// Only `completed` receipts can be confirmed, so confirming the same
    /// receipt twice fails with [`TillError::Conflict`].
    pub async fn confirm(
        &self,
        owner_id: &str,
        receipt_id: Uuid,
        fields: ConfirmedFields,
    ) -> Result<TransactionRef> {
        let (amount, merchant_name) = fields.validate()?;

        let _guard = self.confirm_lock.lock().await;

        let mut record = self.get(owner_id, receipt_id).await?;
        let status = record.status();
        if status != ReceiptStatus::Completed {
            return Err(TillError::Conflict {
                id: receipt_id,
                status,
            });
        }

        let date = fields
            .date
            .or_else(|| record.extracted().map(|e| e.date))
            .unwrap_or_else(Utc::now);
        let category = fields
            .category
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| self.review.default_category.clone());

        let transaction = self
            .ledger
            .create(NewTransaction {
                owner_id: owner_id.to_string(),
                amount,
                description: merchant_name,
                category,
                date,
                kind: TransactionKind::Expense,
                source: TransactionSource::ReceiptUpload,
                receipt_id: Some(receipt_id),
                notes: fields.description.unwrap_or_default(),
            })
            .await?;

        record.link(transaction.id)?;
        self.receipts.save(&record).await?;

        info!("Linked receipt {} to transaction {}", receipt_id, transaction.id);
        Ok(TransactionRef {
            transaction_id: transaction.id,
        })
    }
}
