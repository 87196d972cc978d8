//! Rule-based field extractors for receipt text.
//!
//! Every extractor works on the trimmed, non-empty lines of the OCR output.

pub mod amounts;
pub mod dates;
pub mod items;
pub mod merchant;
pub mod patterns;

pub use amounts::{parse_amount, AmountExtractor};
pub use dates::DateExtractor;
pub use items::extract_items;
pub use merchant::{extract_merchant, UNKNOWN_MERCHANT};
pub use patterns::*;

/// Trait for single-line field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from one line.
    fn extract(&self, line: &str) -> Option<Self::Output>;

    /// Extract the field from every line that carries it, in line order.
    fn extract_all(&self, lines: &[&str]) -> Vec<ExtractionMatch<Self::Output>> {
        lines
            .iter()
            .enumerate()
            .filter_map(|(index, line)| {
                self.extract(line)
                    .map(|value| ExtractionMatch::new(value, index, *line))
            })
            .collect()
    }
}

/// A value found on a specific line.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Index of the source line.
    pub line: usize,
    /// Source line that was matched.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, line: usize, source: impl Into<String>) -> Self {
        Self {
            value,
            line,
            source: source.into(),
        }
    }
}

/// Split OCR output into trimmed, non-empty lines.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_lines() {
        let lines = split_lines("  Acme  \r\n\n\t\nTotal 1.00\n");
        assert_eq!(lines, vec!["Acme", "Total 1.00"]);
    }

    #[test]
    fn test_extract_all_keeps_line_index() {
        let lines = vec!["Acme", "Milk 1.20", "Bread 2,40"];
        let matches = AmountExtractor::new().extract_all(&lines);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].line, 1);
        assert_eq!(matches[1].source, "Bread 2,40");
    }
}
