//! Amount extraction for receipts.

use rust_decimal::Decimal;
use std::str::FromStr;

use super::patterns::AMOUNT_PATTERN;
use super::FieldExtractor;

/// Amount field extractor.
///
/// Only the first monetary token of a line counts.
pub struct AmountExtractor;

impl AmountExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Largest amount found on any line, used as the receipt total.
    pub fn extract_total(&self, lines: &[&str]) -> Option<Decimal> {
        self.extract_all(lines).into_iter().map(|m| m.value).max()
    }
}

impl Default for AmountExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for AmountExtractor {
    type Output = Decimal;

    fn extract(&self, line: &str) -> Option<Decimal> {
        AMOUNT_PATTERN
            .captures(line)
            .and_then(|caps| parse_amount(&caps[1]))
    }
}

/// Parse a matched amount token, accepting `,` as the decimal separator.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    Decimal::from_str(&s.trim().replace(',', ".")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("45,67"), Some(dec("45.67")));
        assert_eq!(parse_amount("12.34"), Some(dec("12.34")));
        assert_eq!(parse_amount("abc"), None);
    }

    #[test]
    fn test_extract_labeled_and_bare() {
        let extractor = AmountExtractor::new();
        assert_eq!(extractor.extract("Total $12.34"), Some(dec("12.34")));
        assert_eq!(extractor.extract("AMOUNT 9,99"), Some(dec("9.99")));
        assert_eq!(extractor.extract("45,67"), Some(dec("45.67")));
        assert_eq!(extractor.extract("123456 Main St"), None);
        assert_eq!(extractor.extract("Qty 3"), None);
    }

    #[test]
    fn test_first_token_per_line() {
        let extractor = AmountExtractor::new();
        assert_eq!(extractor.extract("2 x 1.50 = 3.00"), Some(dec("1.50")));
    }

    #[test]
    fn test_non_ascii_digits_are_skipped() {
        let extractor = AmountExtractor::new();
        // Arabic-Indic "12.34" ahead of an ASCII amount
        assert_eq!(
            extractor.extract("\u{661}\u{662}.\u{663}\u{664} Total 9.99"),
            Some(dec("9.99"))
        );
    }

    #[test]
    fn test_total_is_maximum() {
        let extractor = AmountExtractor::new();
        let lines = vec!["Burger 8.50", "Fries 3.20", "Total $11.70", "Cash 20.00"];
        assert_eq!(extractor.extract_total(&lines), Some(dec("20.00")));
        assert_eq!(extractor.extract_total(&["no numbers here"]), None);
    }
}
