//! Data models for receipts, transactions and configuration.

pub mod config;
pub mod receipt;
pub mod transaction;
