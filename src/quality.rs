// ✅ Input Audit - flags exclusion-list spelling hazards and summarizes a run
//
// Exclusion matching is exact, so a spelling variant in the data silently slips
// through. The audit reports such cases; it never changes what gets filtered.

use crate::error::{PipelineError, Result};
use crate::filter::FilterStats;
use crate::parser::{SourceBatch, SourceKind};
use crate::record::{ConflictRecord, YearlyTotal};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::warn;

// ============================================================================
// ALIAS KEYS
// ============================================================================

fn fold_char(ch: char) -> char {
    match ch {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        _ => ch,
    }
}

/// Loose comparison key: case-folded, accents and punctuation dropped, "the" removed.
///
/// "Democratic Republic of the Congo" and "Democratic Republic of Congo" share a key.
pub fn alias_key(name: &str) -> String {
    let cleaned: String = name
        .to_lowercase()
        .chars()
        .map(fold_char)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    cleaned
        .split_whitespace()
        .filter(|w| *w != "the")
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// EXCLUSION AUDIT
// ============================================================================

/// A data country that escapes exclusion only because of its spelling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NearMiss {
    pub country: String,
    pub excluded_spelling: String,
    pub rows: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionAudit {
    /// Entries listed more than once verbatim
    pub duplicate_entries: Vec<String>,

    /// Distinct entries that share an alias key
    pub alias_groups: Vec<Vec<String>>,

    /// Data countries that are not excluded but match an excluded name loosely
    pub near_misses: Vec<NearMiss>,
}

impl ExclusionAudit {
    /// Inspect the configured exclusion list against the loaded records.
    pub fn run(excluded: &[String], records: &[ConflictRecord]) -> Self {
        let mut seen = HashSet::new();
        let mut duplicates = BTreeSet::new();
        for name in excluded {
            if !seen.insert(name.as_str()) {
                duplicates.insert(name.clone());
            }
        }

        let mut by_key: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for name in excluded {
            by_key.entry(alias_key(name)).or_default().insert(name.clone());
        }

        let alias_groups: Vec<Vec<String>> = by_key
            .values()
            .filter(|names| names.len() > 1)
            .map(|names| names.iter().cloned().collect())
            .collect();

        let mut row_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for record in records {
            *row_counts.entry(record.country.as_str()).or_insert(0) += 1;
        }

        let near_misses = row_counts
            .into_iter()
            .filter(|(country, _)| !seen.contains(country))
            .filter_map(|(country, rows)| {
                let spelling = by_key.get(&alias_key(country))?.iter().next()?;
                Some(NearMiss {
                    country: country.to_string(),
                    excluded_spelling: spelling.clone(),
                    rows,
                })
            })
            .collect();

        ExclusionAudit {
            duplicate_entries: duplicates.into_iter().collect(),
            alias_groups,
            near_misses,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.duplicate_entries.is_empty() && self.alias_groups.is_empty() && self.near_misses.is_empty()
    }

    /// Emit one warning per finding.
    pub fn log_findings(&self) {
        for name in &self.duplicate_entries {
            warn!(country = %name, "exclusion list repeats an entry");
        }
        for group in &self.alias_groups {
            warn!(spellings = ?group, "exclusion list holds several spellings of one country");
        }
        for miss in &self.near_misses {
            warn!(
                country = %miss.country,
                excluded_spelling = %miss.excluded_spelling,
                rows = miss.rows,
                "country kept only because its spelling differs from an excluded name"
            );
        }
    }

    /// Plain-language lines for the report's methodology notes.
    pub fn notes(&self) -> Vec<String> {
        let mut notes = Vec::new();
        for name in &self.duplicate_entries {
            notes.push(format!("The exclusion list names \"{}\" more than once.", name));
        }
        for group in &self.alias_groups {
            notes.push(format!(
                "The exclusion list spells one country several ways: {}.",
                group.join(", ")
            ));
        }
        for miss in &self.near_misses {
            notes.push(format!(
                "\"{}\" ({} rows) is included although \"{}\" is excluded.",
                miss.country, miss.rows, miss.excluded_spelling
            ));
        }
        notes
    }
}

// ============================================================================
// PIPELINE SUMMARY
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceCount {
    pub kind: SourceKind,
    pub file: String,
    pub rows: usize,
}

impl SourceCount {
    pub fn from_batch(batch: &SourceBatch) -> Self {
        SourceCount {
            kind: batch.kind,
            file: batch.file_path.display().to_string(),
            rows: batch.records.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub sources: Vec<SourceCount>,
    pub filter: FilterStats,
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
    pub peak: Option<YearlyTotal>,
    pub grand_total: i64,
}

impl PipelineSummary {
    pub fn new(
        sources: Vec<SourceCount>,
        filter: FilterStats,
        totals: &[YearlyTotal],
    ) -> Result<Self> {
        let grand_total = totals.iter().try_fold(0i64, |acc, t| {
            acc.checked_add(t.total_deaths)
                .ok_or(PipelineError::Overflow(t.year))
        })?;

        Ok(PipelineSummary {
            sources,
            filter,
            first_year: totals.first().map(|t| t.year),
            last_year: totals.last().map(|t| t.year),
            peak: totals.iter().copied().max_by_key(|t| t.total_deaths),
            grand_total,
        })
    }

    pub fn has_data(&self) -> bool {
        self.filter.rows_kept > 0
    }

    pub fn summary(&self) -> String {
        let span = match (self.first_year, self.last_year) {
            (Some(first), Some(last)) => format!("{}-{}", first, last),
            _ => "no years".to_string(),
        };
        format!(
            "Rows: {} in, {} out of range, {} excluded, {} kept; Years: {}; Total deaths: {}",
            self.filter.rows_in,
            self.filter.dropped_out_of_range,
            self.filter.dropped_excluded,
            self.filter.rows_kept,
            span,
            self.grand_total
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_EXCLUDED_COUNTRIES;
    use std::path::PathBuf;

    fn default_exclusions() -> Vec<String> {
        DEFAULT_EXCLUDED_COUNTRIES.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_alias_key() {
        assert_eq!(
            alias_key("Democratic Republic of the Congo"),
            alias_key("Democratic Republic of Congo")
        );
        assert_eq!(alias_key("Côte d'Ivoire"), alias_key("Cote d'Ivoire"));
        assert_eq!(alias_key("  NIGERIA "), "nigeria");
        assert_ne!(alias_key("Niger"), alias_key("Nigeria"));
    }

    #[test]
    fn test_default_list_flags_congo_spellings() {
        let audit = ExclusionAudit::run(&default_exclusions(), &[]);

        assert!(audit.duplicate_entries.is_empty());
        assert_eq!(audit.alias_groups.len(), 1);
        assert_eq!(
            audit.alias_groups[0],
            vec![
                "Democratic Republic of Congo".to_string(),
                "Democratic Republic of the Congo".to_string(),
            ]
        );
        assert!(!audit.is_clean());
    }

    #[test]
    fn test_near_miss_reported_not_fixed() {
        let records = vec![
            ConflictRecord::new(2010, "Côte d'Ivoire", 40),
            ConflictRecord::new(2011, "Côte d'Ivoire", 10),
            ConflictRecord::new(2011, "Cote d'Ivoire", 10),
            ConflictRecord::new(2011, "Iraq", 10),
        ];
        let audit = ExclusionAudit::run(&["Cote d'Ivoire".to_string()], &records);

        assert_eq!(
            audit.near_misses,
            vec![NearMiss {
                country: "Côte d'Ivoire".to_string(),
                excluded_spelling: "Cote d'Ivoire".to_string(),
                rows: 2,
            }]
        );
        assert_eq!(audit.notes().len(), 1);
    }

    #[test]
    fn test_duplicate_entries() {
        let list = vec!["Mali".to_string(), "Chad".to_string(), "Mali".to_string()];
        let audit = ExclusionAudit::run(&list, &[]);
        assert_eq!(audit.duplicate_entries, vec!["Mali".to_string()]);
        // Verbatim duplicates are not alias groups
        assert!(audit.alias_groups.is_empty());
    }

    #[test]
    fn test_clean_audit() {
        let audit = ExclusionAudit::run(
            &["Mali".to_string()],
            &[ConflictRecord::new(2001, "Iraq", 1)],
        );
        assert!(audit.is_clean());
        assert!(audit.notes().is_empty());
    }

    #[test]
    fn test_summary() {
        let batches = vec![SourceBatch {
            kind: SourceKind::SingleYearFatalities,
            file_path: PathBuf::from("data/fatalities-2024.csv"),
            records: vec![ConflictRecord::new(2024, "USA", 20)],
        }];
        let stats = FilterStats {
            rows_in: 1,
            dropped_out_of_range: 0,
            dropped_excluded: 0,
            rows_kept: 1,
        };
        let totals = vec![YearlyTotal::new(2023, 5), YearlyTotal::new(2024, 20)];
        let sources = batches.iter().map(SourceCount::from_batch).collect();
        let summary = PipelineSummary::new(sources, stats, &totals).unwrap();

        assert!(summary.has_data());
        assert_eq!(summary.sources[0].rows, 1);
        assert_eq!(summary.peak, Some(YearlyTotal::new(2024, 20)));
        assert_eq!(summary.grand_total, 25);
        assert!(summary.summary().contains("Years: 2023-2024"));
    }

    #[test]
    fn test_summary_empty() {
        let summary = PipelineSummary::new(Vec::new(), FilterStats::default(), &[]).unwrap();
        assert!(!summary.has_data());
        assert_eq!(summary.peak, None);
        assert!(summary.summary().contains("no years"));
    }

    #[test]
    fn test_summary_grand_total_overflow() {
        let totals = [
            YearlyTotal::new(2001, 5_000_000_000_000_000_000),
            YearlyTotal::new(2002, 5_000_000_000_000_000_000),
        ];
        let result = PipelineSummary::new(Vec::new(), FilterStats::default(), &totals);
        assert!(matches!(result, Err(PipelineError::Overflow(2002))));
    }
}
