//! Merchant name detection from the receipt header.

use super::patterns::DIGIT_RUN;

/// Merchant name used when the header yields nothing usable.
pub const UNKNOWN_MERCHANT: &str = "Unknown Merchant";

/// Number of leading lines treated as the receipt header.
const HEADER_LINES: usize = 3;

/// First header line that reads like a name: no run of three or more digits
/// and strictly between 2 and 50 characters long.
pub fn extract_merchant(lines: &[&str]) -> Option<String> {
    lines
        .iter()
        .take(HEADER_LINES)
        .find(|line| {
            let len = line.chars().count();
            !DIGIT_RUN.is_match(line) && len > 2 && len < 50
        })
        .map(|line| line.to_string())
}
