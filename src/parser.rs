// 🏗️ Source Parsers - two input schemas, one record shape
//
// Each source gets its own parser; all of them emit `ConflictRecord`.
// Columns are located by header name so reordered files still load.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::record::ConflictRecord;
use csv::{ReaderBuilder, StringRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// ============================================================================
// CORE TYPES
// ============================================================================

/// SourceKind - which of the two input schemas a file follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    /// `Entity`, `Code`, `Year`, best-estimate deaths
    ConflictTimeSeries,
    /// `Country`, `Fatalities`, year supplied externally
    SingleYearFatalities,
}

impl SourceKind {
    /// Human-readable name for display
    pub fn name(&self) -> &str {
        match self {
            SourceKind::ConflictTimeSeries => "Conflict deaths time series",
            SourceKind::SingleYearFatalities => "Single-year fatalities",
        }
    }

    /// Short code for logs
    pub fn code(&self) -> &str {
        match self {
            SourceKind::ConflictTimeSeries => "timeseries",
            SourceKind::SingleYearFatalities => "single-year",
        }
    }
}

/// Records read from one file, kept with their provenance until merged.
#[derive(Debug, Clone)]
pub struct SourceBatch {
    pub kind: SourceKind,
    pub file_path: PathBuf,
    pub records: Vec<ConflictRecord>,
}

// ============================================================================
// PARSER TRAIT
// ============================================================================

/// SourceParser - one implementation per input schema
pub trait SourceParser: Send + Sync {
    /// Parse a file into normalized records.
    ///
    /// Any value that cannot be coerced to an integer aborts the whole parse.
    fn parse(&self, file_path: &Path) -> Result<Vec<ConflictRecord>>;

    fn source_kind(&self) -> SourceKind;

    /// Parser version (for provenance)
    fn version(&self) -> &str {
        "1.0.0"
    }
}

// ============================================================================
// NORMALIZATION HELPERS
// ============================================================================

static EDGE_WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s+|\s+$").expect("edge whitespace pattern is valid"));

/// Strip leading and trailing whitespace from a country name.
pub fn normalize_country(raw: &str) -> String {
    EDGE_WHITESPACE.replace_all(raw, "").into_owned()
}

/// Coerce a cell to an integer.
///
/// Accepts plain integers and integral decimals ("12.0"); anything else,
/// including an empty cell, is a fatal `Coercion` error.
pub fn coerce_integer(value: &str, file: &str, line: usize, column: &str) -> Result<i64> {
    let trimmed = value.trim();
    let coercion_error = || PipelineError::Coercion {
        file: file.to_string(),
        line,
        column: column.to_string(),
        value: value.to_string(),
    };

    if let Ok(n) = trimmed.parse::<i64>() {
        return Ok(n);
    }

    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
        _ => Err(coercion_error()),
    }
}

fn coerce_year(value: &str, file: &str, line: usize, column: &str) -> Result<i32> {
    let n = coerce_integer(value, file, line, column)?;
    i32::try_from(n).map_err(|_| PipelineError::Coercion {
        file: file.to_string(),
        line,
        column: column.to_string(),
        value: value.to_string(),
    })
}

fn column_index(headers: &StringRecord, column: &str, file: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| PipelineError::MissingColumn {
            file: file.to_string(),
            column: column.to_string(),
        })
}

fn display_name(file_path: &Path) -> String {
    file_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown.csv")
        .to_string()
}

fn open_reader(file_path: &Path) -> Result<csv::Reader<std::fs::File>> {
    let reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_path(file_path)?;
    Ok(reader)
}

// ============================================================================
// FACTORY FUNCTIONS
// ============================================================================

/// Detect the schema of a file by peeking at its header row.
pub fn detect_source(file_path: &Path) -> Result<Option<SourceKind>> {
    let mut reader = open_reader(file_path)?;
    let headers = reader.headers()?;
    let has = |name: &str| headers.iter().any(|h| h.trim() == name);

    if has("Entity") && has("Year") {
        return Ok(Some(SourceKind::ConflictTimeSeries));
    }
    if has("Country") && has("Fatalities") {
        return Ok(Some(SourceKind::SingleYearFatalities));
    }
    Ok(None)
}

/// Get the parser for a source kind, configured from the pipeline config.
pub fn get_parser(kind: SourceKind, config: &PipelineConfig) -> Box<dyn SourceParser> {
    match kind {
        SourceKind::ConflictTimeSeries => {
            Box::new(TimeSeriesParser::new(config.deaths_column.clone()))
        }
        SourceKind::SingleYearFatalities => Box::new(SingleYearParser::new(config.single_year)),
    }
}

// ============================================================================
// TIME SERIES PARSER (Entity, Code, Year, deaths)
// ============================================================================

pub struct TimeSeriesParser {
    deaths_column: String,
}

impl TimeSeriesParser {
    pub const ENTITY: &'static str = "Entity";
    pub const CODE: &'static str = "Code";
    pub const YEAR: &'static str = "Year";

    pub fn new(deaths_column: impl Into<String>) -> Self {
        TimeSeriesParser {
            deaths_column: deaths_column.into(),
        }
    }
}

impl SourceParser for TimeSeriesParser {
    fn parse(&self, file_path: &Path) -> Result<Vec<ConflictRecord>> {
        let filename = display_name(file_path);
        let mut reader = open_reader(file_path)?;
        let headers = reader.headers()?.clone();

        let entity_idx = column_index(&headers, Self::ENTITY, &filename)?;
        // Code is part of the schema but not carried into the record
        column_index(&headers, Self::CODE, &filename)?;
        let year_idx = column_index(&headers, Self::YEAR, &filename)?;
        let deaths_idx = column_index(&headers, &self.deaths_column, &filename)?;

        let mut records = Vec::new();
        for (line_num, result) in reader.records().enumerate() {
            let row = result?;
            let line = line_num + 2; // 1-indexed + header row

            let country = normalize_country(row.get(entity_idx).unwrap_or(""));
            let year = coerce_year(row.get(year_idx).unwrap_or(""), &filename, line, Self::YEAR)?;
            let total_deaths = coerce_integer(
                row.get(deaths_idx).unwrap_or(""),
                &filename,
                line,
                &self.deaths_column,
            )?;

            records.push(ConflictRecord::new(year, country, total_deaths));
        }

        debug!(file = %filename, rows = records.len(), "parsed time series");
        Ok(records)
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::ConflictTimeSeries
    }
}

// ============================================================================
// SINGLE YEAR PARSER (Country, Fatalities + constant year)
// ============================================================================

pub struct SingleYearParser {
    year: i32,
}

impl SingleYearParser {
    pub const COUNTRY: &'static str = "Country";
    pub const FATALITIES: &'static str = "Fatalities";

    /// `year` is attached to every row; the file itself carries no year.
    pub fn new(year: i32) -> Self {
        SingleYearParser { year }
    }

    pub fn year(&self) -> i32 {
        self.year
    }
}

impl SourceParser for SingleYearParser {
    fn parse(&self, file_path: &Path) -> Result<Vec<ConflictRecord>> {
        let filename = display_name(file_path);
        let mut reader = open_reader(file_path)?;
        let headers = reader.headers()?.clone();

        let country_idx = column_index(&headers, Self::COUNTRY, &filename)?;
        let fatalities_idx = column_index(&headers, Self::FATALITIES, &filename)?;

        let mut records = Vec::new();
        for (line_num, result) in reader.records().enumerate() {
            let row = result?;
            let line = line_num + 2;

            let country = normalize_country(row.get(country_idx).unwrap_or(""));
            let total_deaths = coerce_integer(
                row.get(fatalities_idx).unwrap_or(""),
                &filename,
                line,
                Self::FATALITIES,
            )?;

            records.push(ConflictRecord::new(self.year, country, total_deaths));
        }

        debug!(file = %filename, rows = records.len(), year = self.year, "parsed single-year source");
        Ok(records)
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::SingleYearFatalities
    }
}

// ============================================================================
// LOADING & MERGING
// ============================================================================

/// Concatenate sources in the order given.
pub fn merge_sources<I>(sources: I) -> Vec<ConflictRecord>
where
    I: IntoIterator<Item = Vec<ConflictRecord>>,
{
    sources.into_iter().flatten().collect()
}

fn load_one(kind: SourceKind, file_path: &Path, config: &PipelineConfig) -> Result<SourceBatch> {
    if let Some(detected) = detect_source(file_path)? {
        if detected != kind {
            return Err(PipelineError::InvalidConfig(format!(
                "{} was configured as '{}' but its headers match '{}'",
                file_path.display(),
                kind.name(),
                detected.name()
            )));
        }
    }

    let parser = get_parser(kind, config);
    let records = parser.parse(file_path)?;
    info!(
        source = kind.code(),
        parser_version = parser.version(),
        file = %file_path.display(),
        rows = records.len(),
        "loaded source"
    );

    Ok(SourceBatch {
        kind,
        file_path: file_path.to_path_buf(),
        records,
    })
}

/// Read the time series, then the single-year file, sequentially.
pub fn load_sources(config: &PipelineConfig) -> Result<Vec<SourceBatch>> {
    let timeseries = load_one(
        SourceKind::ConflictTimeSeries,
        &config.timeseries_path,
        config,
    )?;
    let single_year = load_one(
        SourceKind::SingleYearFatalities,
        &config.single_year_path,
        config,
    )?;
    Ok(vec![timeseries, single_year])
}

// ============================================================================
// TESTS
// ============================================================================
