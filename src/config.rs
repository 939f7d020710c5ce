// ⚙️ Pipeline Configuration - static constants, optionally overridden from JSON
//
// Everything the run depends on lives here as an explicit value so tests can
// swap any piece (exclusion list, constant year, bands) without touching globals.

use crate::chart::{ChartOptions, IntervalBand};
use crate::document::{Figure, Narrative};
use crate::error::{PipelineError, Result};
use crate::filter::YearRange;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// CONSTANTS
// ============================================================================

pub const DEFAULT_TIMESERIES_PATH: &str = "data/deaths-in-armed-conflicts.csv";
pub const DEFAULT_SINGLE_YEAR_PATH: &str = "data/fatalities-2024.csv";
pub const DEFAULT_OUTPUT_PATH: &str = "output/report.html";

/// Best-estimate deaths column of the multi-year source.
pub const DEFAULT_DEATHS_COLUMN: &str =
    "Deaths in ongoing conflicts in a country (best estimate) - Conflict type: all";

/// Year attached to every row of the single-year source.
pub const DEFAULT_SINGLE_YEAR: i32 = 2024;

pub const DEFAULT_YEAR_START: i32 = 2001;
pub const DEFAULT_YEAR_END: i32 = 2024;

/// Country names removed before aggregation (exact, case-sensitive match).
///
/// The Democratic Republic of the Congo appears under three spellings. They
/// are kept as-is; `quality::ExclusionAudit` reports the overlap instead of
/// collapsing it.
pub const DEFAULT_EXCLUDED_COUNTRIES: &[&str] = &[
    "Algeria",
    "Angola",
    "Benin",
    "Botswana",
    "Burkina Faso",
    "Burundi",
    "Cameroon",
    "Cape Verde",
    "Central African Republic",
    "Chad",
    "Comoros",
    "Congo",
    "Democratic Republic of Congo",
    "Democratic Republic of the Congo",
    "DR Congo",
    "Djibouti",
    "Egypt",
    "Equatorial Guinea",
    "Eritrea",
    "Eswatini",
    "Ethiopia",
    "Gabon",
    "Gambia",
    "Ghana",
    "Guinea",
    "Guinea-Bissau",
    "Cote d'Ivoire",
    "Kenya",
    "Lesotho",
    "Liberia",
    "Libya",
    "Madagascar",
    "Malawi",
    "Mali",
    "Mauritania",
    "Mauritius",
    "Morocco",
    "Mozambique",
    "Namibia",
    "Niger",
    "Nigeria",
    "Rwanda",
    "Sao Tome and Principe",
    "Senegal",
    "Seychelles",
    "Sierra Leone",
    "Somalia",
    "South Africa",
    "South Sudan",
    "Sudan",
    "Tanzania",
    "Togo",
    "Tunisia",
    "Uganda",
    "Western Sahara",
    "Zambia",
    "Zimbabwe",
];

// ============================================================================
// PIPELINE CONFIG
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Multi-year source (`Entity`, `Code`, `Year`, deaths column)
    pub timeseries_path: PathBuf,

    /// Single-year source (`Country`, `Fatalities`)
    pub single_year_path: PathBuf,

    pub deaths_column: String,

    /// Year stamped onto every row of `single_year_path`
    pub single_year: i32,

    pub year_range: YearRange,

    pub excluded_countries: Vec<String>,

    pub bands: Vec<IntervalBand>,

    pub output_path: PathBuf,

    pub chart: ChartOptions,

    pub narrative: Narrative,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            timeseries_path: PathBuf::from(DEFAULT_TIMESERIES_PATH),
            single_year_path: PathBuf::from(DEFAULT_SINGLE_YEAR_PATH),
            deaths_column: DEFAULT_DEATHS_COLUMN.to_string(),
            single_year: DEFAULT_SINGLE_YEAR,
            year_range: YearRange {
                start: DEFAULT_YEAR_START,
                end: DEFAULT_YEAR_END,
            },
            excluded_countries: DEFAULT_EXCLUDED_COUNTRIES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            bands: IntervalBand::presidential_terms(),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            chart: ChartOptions::default(),
            narrative: default_narrative(),
        }
    }
}

impl PipelineConfig {
    /// Load overrides from a JSON file; absent fields keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: PipelineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.year_range.start > self.year_range.end {
            return Err(PipelineError::InvalidConfig(format!(
                "year range start {} is after end {}",
                self.year_range.start, self.year_range.end
            )));
        }

        if self.deaths_column.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "deaths column name is empty".to_string(),
            ));
        }

        for band in &self.bands {
            if band.label.trim().is_empty() {
                return Err(PipelineError::InvalidConfig(format!(
                    "band {}-{} has an empty label",
                    band.start, band.end
                )));
            }
            if band.start > band.end {
                return Err(PipelineError::InvalidConfig(format!(
                    "band '{}' starts after it ends",
                    band.label
                )));
            }
        }

        if self.chart.width == 0 || self.chart.height == 0 {
            return Err(PipelineError::InvalidConfig(
                "chart dimensions must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn default_narrative() -> Narrative {
    Narrative {
        title: "Conflict Deaths Outside Africa, 2001-2024".to_string(),
        introduction: vec![
            "This report follows the number of people killed in armed conflict each year \
             since 2001, the year the United States began its global campaign against \
             terrorism."
                .to_string(),
            "Deaths are taken from country-level best estimates of fatalities in ongoing \
             conflicts. The final year is completed with a separate country-level tally of \
             fatalities recorded in 2024."
                .to_string(),
        ],
        figures: vec![
            Figure {
                src: "images/conflict-map.png".to_string(),
                alt: "Map of countries with recorded conflict deaths".to_string(),
                caption: Some("Countries with at least one recorded conflict death.".to_string()),
            },
        ],
        analysis: vec![
            "The shaded bands mark the four presidential terms of the period. They are there \
             to help read the line against political context, not to imply cause."
                .to_string(),
            "African countries are left out of the totals so the series tracks the theatres \
             most directly tied to U.S. foreign policy over the period."
                .to_string(),
        ],
        closing_figures: vec![Figure {
            src: "images/sources.png".to_string(),
            alt: "Data sources".to_string(),
            caption: None,
        }],
    }
}

// ============================================================================
// TESTS
// ============================================================================
