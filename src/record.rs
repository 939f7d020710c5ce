// Conflict Records - normalized rows shared by every source

use serde::{Deserialize, Serialize};

/// One country's conflict deaths for one year, after normalization.
///
/// Both input schemas collapse into this shape. `country` never carries
/// leading or trailing whitespace once it leaves the parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictRecord {
    pub year: i32,
    pub country: String,
    pub total_deaths: i64,
}

impl ConflictRecord {
    pub fn new(year: i32, country: impl Into<String>, total_deaths: i64) -> Self {
        ConflictRecord {
            year,
            country: country.into(),
            total_deaths,
        }
    }
}

/// Sum of `total_deaths` across all retained countries for one year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearlyTotal {
    pub year: i32,
    pub total_deaths: i64,
}

impl YearlyTotal {
    pub fn new(year: i32, total_deaths: i64) -> Self {
        YearlyTotal { year, total_deaths }
    }
}

/// Largest yearly total in a series, `None` when the series is empty.
pub fn max_total(totals: &[YearlyTotal]) -> Option<i64> {
    totals.iter().map(|t| t.total_deaths).max()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_total() {
        let totals = vec![
            YearlyTotal::new(2001, 150),
            YearlyTotal::new(2002, 900),
            YearlyTotal::new(2003, 20),
        ];
        assert_eq!(max_total(&totals), Some(900));
    }

    #[test]
    fn test_max_total_empty() {
        assert_eq!(max_total(&[]), None);
    }

    #[test]
    fn test_record_serializes_with_field_names() {
        let record = ConflictRecord::new(2024, "USA", 20);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["year"], 2024);
        assert_eq!(json["country"], "USA");
        assert_eq!(json["total_deaths"], 20);
    }
}
