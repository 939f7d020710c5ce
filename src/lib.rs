// Conflict Report - Core Library
// Exposes the pipeline stages for the CLI and tests

pub mod error;
pub mod record;
pub mod config;
pub mod parser;
pub mod filter;
pub mod quality;
pub mod chart;
pub mod document;
pub mod pipeline;
pub mod logging;

// Re-export commonly used types
pub use error::{PipelineError, Result};
pub use record::{ConflictRecord, YearlyTotal};
pub use config::PipelineConfig;
pub use parser::{
    SourceParser, SourceKind, SourceBatch,
    TimeSeriesParser, SingleYearParser,
    detect_source, get_parser, load_sources, merge_sources, normalize_country,
};
pub use filter::{
    YearRange, ExclusionSet, FilterStats,
    filter_records, filter_with_stats, aggregate_by_year,
};
pub use quality::{ExclusionAudit, NearMiss, PipelineSummary, SourceCount};
pub use chart::{ChartOptions, IntervalBand, render_svg, format_thousands, label_offset};
pub use document::{Figure, Narrative, ReportDocument, OutputPaths, InputDigest};
pub use pipeline::{build_report, PipelineOutcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
