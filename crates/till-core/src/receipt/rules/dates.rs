//! Date extraction for receipts.

use chrono::NaiveDate;

use super::patterns::DATE_PATTERN;
use super::FieldExtractor;

/// Date field extractor.
///
/// Looks at the first date-shaped token of a line and yields it only when it
/// is a real calendar date.
pub struct DateExtractor;

impl DateExtractor {
    pub fn new() -> Self {
        Self
    }

    /// First valid date in line order.
    pub fn extract_first(&self, lines: &[&str]) -> Option<NaiveDate> {
        lines.iter().find_map(|line| self.extract(line))
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for DateExtractor {
    type Output = NaiveDate;

    fn extract(&self, line: &str) -> Option<NaiveDate> {
        let caps = DATE_PATTERN.captures(line)?;

        let (year, month, day) = if let Some(year) = caps.name("year") {
            // DD/MM/YYYY or DD-MM-YY
            (parse_year(year.as_str())?, &caps["month"], &caps["day"])
        } else {
            // YYYY-MM-DD or YYYY/MM/DD
            (
                caps["iso_year"].parse().ok()?,
                &caps["iso_month"],
                &caps["iso_day"],
            )
        };

        let month: u32 = month.parse().ok()?;
        let day: u32 = day.parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    }
}

fn parse_year(s: &str) -> Option<i32> {
    let year: i32 = s.parse().ok()?;
    if s.len() == 2 {
        // Two-digit year: assume 2000s for 00-50, 1900s for 51-99
        if year <= 50 {
            Some(2000 + year)
        } else {
            Some(1900 + year)
        }
    } else {
        Some(year)
    }
}
