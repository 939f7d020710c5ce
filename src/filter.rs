// Filtering & Aggregation - year range, exclusion set, group-by-sum

use crate::error::{PipelineError, Result};
use crate::record::{ConflictRecord, YearlyTotal};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

// ============================================================================
// YEAR RANGE
// ============================================================================

/// Inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    pub fn new(start: i32, end: i32) -> Result<Self> {
        if start > end {
            return Err(PipelineError::InvalidConfig(format!(
                "year range start {} is after end {}",
                start, end
            )));
        }
        Ok(YearRange { start, end })
    }

    pub fn contains(&self, year: i32) -> bool {
        self.start <= year && year <= self.end
    }
}

// ============================================================================
// EXCLUSION SET
// ============================================================================

/// Country names dropped before aggregation.
///
/// Matching is exact and case-sensitive: "Nigeria" excludes "Nigeria" but not
/// "nigeria" or "Nigeria " (the parser already trims the latter).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    names: HashSet<String>,
}

impl ExclusionSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ExclusionSet {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn empty() -> Self {
        ExclusionSet::default()
    }

    pub fn contains(&self, country: &str) -> bool {
        self.names.contains(country)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names in sorted order, for reports.
    pub fn sorted_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.names.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

// ============================================================================
// FILTER
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterStats {
    pub rows_in: usize,
    pub dropped_out_of_range: usize,
    pub dropped_excluded: usize,
    pub rows_kept: usize,
}

/// Keep a record iff its year is in `range` and its country is not excluded.
pub fn filter_records(
    records: &[ConflictRecord],
    range: &YearRange,
    exclusions: &ExclusionSet,
) -> Vec<ConflictRecord> {
    filter_with_stats(records, range, exclusions).0
}

/// Same as `filter_records`, also counting why rows were dropped.
///
/// A row both out of range and excluded counts as out of range.
pub fn filter_with_stats(
    records: &[ConflictRecord],
    range: &YearRange,
    exclusions: &ExclusionSet,
) -> (Vec<ConflictRecord>, FilterStats) {
    let mut stats = FilterStats {
        rows_in: records.len(),
        ..FilterStats::default()
    };

    let kept: Vec<ConflictRecord> = records
        .iter()
        .filter(|r| {
            if !range.contains(r.year) {
                stats.dropped_out_of_range += 1;
                return false;
            }
            if exclusions.contains(&r.country) {
                stats.dropped_excluded += 1;
                return false;
            }
            true
        })
        .cloned()
        .collect();

    stats.rows_kept = kept.len();
    debug!(?stats, "filtered records");
    (kept, stats)
}

// ============================================================================
// AGGREGATION
// ============================================================================

/// Sum deaths per year, ascending by year. Years without rows are absent.
pub fn aggregate_by_year(records: &[ConflictRecord]) -> Result<Vec<YearlyTotal>> {
    let mut by_year: BTreeMap<i32, i64> = BTreeMap::new();

    for record in records {
        let entry = by_year.entry(record.year).or_insert(0);
        *entry = entry
            .checked_add(record.total_deaths)
            .ok_or(PipelineError::Overflow(record.year))?;
    }

    Ok(by_year
        .into_iter()
        .map(|(year, total_deaths)| YearlyTotal { year, total_deaths })
        .collect())
}

// ============================================================================
// TESTS
// ============================================================================
