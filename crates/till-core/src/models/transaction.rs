//! Ledger transaction models and the confirmation payload.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, TillError};

/// Direction of money flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

/// Where a transaction came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransactionSource {
    #[default]
    Manual,
    ReceiptUpload,
    BankImport,
    Api,
}

/// Transaction to be written to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub owner_id: String,
    pub amount: Decimal,
    pub description: String,
    pub category: String,
    pub date: DateTime<Utc>,
    pub kind: TransactionKind,
    pub source: TransactionSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_id: Option<Uuid>,
    #[serde(default)]
    pub notes: String,
}

/// Transaction as stored in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub owner_id: String,
    pub amount: Decimal,
    pub description: String,
    pub category: String,
    pub date: DateTime<Utc>,
    pub kind: TransactionKind,
    pub source: TransactionSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_id: Option<Uuid>,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// Assign an id and creation time to a new transaction.
    pub fn from_new(tx: NewTransaction) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: tx.owner_id,
            amount: tx.amount,
            description: tx.description,
            category: tx.category,
            date: tx.date,
            kind: tx.kind,
            source: tx.source,
            receipt_id: tx.receipt_id,
            notes: tx.notes,
            created_at: Utc::now(),
        }
    }
}

/// Reference returned after confirming a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRef {
    pub transaction_id: Uuid,
}

/// Fields reviewed (and possibly corrected) by the user before a receipt
/// becomes a transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmedFields {
    pub amount: Option<Decimal>,
    pub merchant_name: Option<String>,
    pub category: Option<String>,
    pub date: Option<DateTime<Utc>>,
    /// Free-text notes stored on the transaction.
    pub description: Option<String>,
}

impl ConfirmedFields {
    pub fn new(amount: Decimal, merchant_name: impl Into<String>) -> Self {
        Self {
            amount: Some(amount),
            merchant_name: Some(merchant_name.into()),
            ..Self::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check the required fields, returning the amount and trimmed merchant.
    pub fn validate(&self) -> Result<(Decimal, String)> {
        let amount = self
            .amount
            .ok_or_else(|| TillError::validation("amount", "is required"))?;
        if amount <= Decimal::ZERO {
            return Err(TillError::validation("amount", "must be positive"));
        }

        let merchant = self
            .merchant_name
            .as_deref()
            .map(str::trim)
            .unwrap_or_default();
        if merchant.is_empty() {
            return Err(TillError::validation("merchant_name", "is required"));
        }

        Ok((amount, merchant.to_string()))
    }
}
