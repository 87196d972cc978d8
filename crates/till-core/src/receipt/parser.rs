//! Heuristic receipt parser with confidence scoring.

use chrono::{DateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use crate::models::receipt::ParsedReceipt;

use super::rules::{
    extract_items, extract_merchant, split_lines, AmountExtractor, DateExtractor,
    UNKNOWN_MERCHANT,
};

const MERCHANT_BONUS: u8 = 30;
const AMOUNT_BONUS: u8 = 40;
const DATE_BONUS: u8 = 30;

/// Turns raw OCR text into a [`ParsedReceipt`].
///
/// Parsing never fails: anything that cannot be found falls back to a
/// default (unknown merchant, zero amount, current time) and lowers the
/// confidence score instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReceiptParser;

impl ReceiptParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse receipt text, defaulting the date to now.
    pub fn parse(&self, text: &str) -> ParsedReceipt {
        self.parse_at(text, Utc::now())
    }

    /// Parse receipt text, defaulting the date to `now`.
    pub fn parse_at(&self, text: &str, now: DateTime<Utc>) -> ParsedReceipt {
        let lines = split_lines(text);

        let amount = AmountExtractor::new().extract_total(&lines);
        let date = DateExtractor::new().extract_first(&lines);
        let merchant = extract_merchant(&lines);
        let items = extract_items(&lines);

        let confidence = score_confidence(merchant.is_some(), amount.is_some(), date.is_some());

        debug!(
            "Parsed {} lines: merchant={:?} amount={:?} date={:?} items={} confidence={}",
            lines.len(),
            merchant,
            amount,
            date,
            items.len(),
            confidence
        );

        ParsedReceipt {
            merchant_name: merchant.unwrap_or_else(|| UNKNOWN_MERCHANT.to_string()),
            amount: amount.unwrap_or(Decimal::ZERO),
            date: date
                .map(|d| d.and_time(NaiveTime::MIN).and_utc())
                .unwrap_or(now),
            items,
            raw_text: text.to_string(),
            confidence,
        }
    }
}

/// Sum of the independent field bonuses: 30 merchant, 40 amount, 30 date.
pub fn score_confidence(merchant_found: bool, amount_found: bool, date_found: bool) -> u8 {
    let mut score = 0;
    if merchant_found {
        score += MERCHANT_BONUS;
    }
    if amount_found {
        score += AMOUNT_BONUS;
    }
    if date_found {
        score += DATE_BONUS;
    }
    score
}
