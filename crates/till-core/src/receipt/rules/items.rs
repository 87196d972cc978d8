//! Line item extraction for receipts.

use rust_decimal::Decimal;

use crate::models::receipt::ReceiptItem;

use super::amounts::parse_amount;
use super::patterns::LINE_ITEM;

/// Every `<name> <price>` line that is not a total.
pub fn extract_items(lines: &[&str]) -> Vec<ReceiptItem> {
    lines
        .iter()
        .filter(|line| !line.to_lowercase().contains("total"))
        .filter_map(|line| {
            let caps = LINE_ITEM.captures(line)?;
            let price: Decimal = parse_amount(&caps[2])?;
            Some(ReceiptItem {
                name: caps[1].trim().to_string(),
                price,
                quantity: 1,
            })
        })
        .collect()
}
