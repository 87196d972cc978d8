//! Common regex patterns for receipt extraction.

use lazy_static::lazy_static;
use regex::Regex;

// Digits are spelled `[0-9]`: `\d` would also match non-ASCII digits that
// `str::parse` then rejects.
lazy_static! {
    // Optional label, optional dollar sign, digits, separator, two fraction digits
    pub static ref AMOUNT_PATTERN: Regex = Regex::new(
        r"(?i)(?:total|amount|sum)?\s*\$?([0-9]+[.,][0-9]{2})"
    ).unwrap();

    // D[D]/M[M]/YY[YY] or YYYY/M[M]/D[D], with '/' or '-' separators
    pub static ref DATE_PATTERN: Regex = Regex::new(
        r"(?:(?P<day>[0-9]{1,2})[/\-](?P<month>[0-9]{1,2})[/\-](?P<year>[0-9]{2,4}))|(?:(?P<iso_year>[0-9]{4})[/\-](?P<iso_month>[0-9]{1,2})[/\-](?P<iso_day>[0-9]{1,2}))"
    ).unwrap();

    // Street numbers, phone numbers, receipt ids
    pub static ref DIGIT_RUN: Regex = Regex::new(
        r"[0-9]{3,}"
    ).unwrap();

    // "<description> <price>" with the price closing the line
    pub static ref LINE_ITEM: Regex = Regex::new(
        r"^(.+?)\s+\$?([0-9]+[.,][0-9]{2})$"
    ).unwrap();
}
