// 🔁 Report Pipeline - load → merge → audit → filter → aggregate → render
//
// One synchronous pass. Any error aborts the run; nothing partial is written.

use crate::chart::render_svg;
use crate::config::PipelineConfig;
use crate::document::{digest_file, ReportDocument};
use crate::error::Result;
use crate::filter::{aggregate_by_year, filter_with_stats, ExclusionSet};
use crate::parser::{load_sources, merge_sources};
use crate::quality::{ExclusionAudit, PipelineSummary, SourceCount};
use chrono::Utc;
use tracing::{info, warn};

/// Everything produced by one run, before it is written anywhere.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub document: ReportDocument,
    pub audit: ExclusionAudit,
}

pub fn build_report(config: &PipelineConfig) -> Result<PipelineOutcome> {
    config.validate()?;

    let batches = load_sources(config)?;
    let inputs = batches
        .iter()
        .map(|b| digest_file(&b.file_path))
        .collect::<Result<Vec<_>>>()?;
    let sources: Vec<SourceCount> = batches.iter().map(SourceCount::from_batch).collect();

    let records = merge_sources(batches.into_iter().map(|b| b.records));
    info!(rows = records.len(), "merged sources");

    let audit = ExclusionAudit::run(&config.excluded_countries, &records);
    audit.log_findings();

    let exclusions = ExclusionSet::new(config.excluded_countries.iter().cloned());
    let (kept, stats) = filter_with_stats(&records, &config.year_range, &exclusions);
    let totals = aggregate_by_year(&kept)?;

    if totals.is_empty() {
        warn!(
            start = config.year_range.start,
            end = config.year_range.end,
            "no data in range; chart will be empty"
        );
    }

    let summary = PipelineSummary::new(sources, stats, &totals)?;
    info!("{}", summary.summary());

    let chart_svg = render_svg(&totals, &config.bands, &config.chart);

    let document = ReportDocument {
        narrative: config.narrative.clone(),
        chart_svg,
        totals,
        summary,
        year_range: config.year_range,
        excluded_count: exclusions.len(),
        audit_notes: audit.notes(),
        inputs,
        generated_at: Utc::now(),
    };

    Ok(PipelineOutcome { document, audit })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_DEATHS_COLUMN;
    use crate::error::PipelineError;
    use crate::record::YearlyTotal;
    use std::fs;
    use tempfile::TempDir;

    fn fixture(timeseries_rows: &str, single_year_rows: &str) -> (TempDir, PipelineConfig) {
        let dir = tempfile::tempdir().unwrap();
        let ts = dir.path().join("timeseries.csv");
        let sy = dir.path().join("single.csv");
        fs::write(
            &ts,
            format!("Entity,Code,Year,{}\n{}", DEFAULT_DEATHS_COLUMN, timeseries_rows),
        )
        .unwrap();
        fs::write(&sy, format!("Country,Fatalities\n{}", single_year_rows)).unwrap();

        let config = PipelineConfig {
            timeseries_path: ts,
            single_year_path: sy,
            output_path: dir.path().join("out/report.html"),
            ..PipelineConfig::default()
        };
        (dir, config)
    }

    #[test]
    fn test_end_to_end_totals() {
        let (_dir, config) = fixture(
            "Afghanistan,AFG,2001,100\nIraq,IRQ,2001,50\nNigeria,NGA,2001,30\n\
             Iraq,IRQ,2000,999\nSyria,SYR,2024,7\n",
            "USA,20\n Nigeria ,500\n",
        );

        let outcome = build_report(&config).unwrap();
        assert_eq!(
            outcome.document.totals,
            vec![YearlyTotal::new(2001, 150), YearlyTotal::new(2024, 27)]
        );

        let stats = outcome.document.summary.filter;
        assert_eq!(stats.rows_in, 7);
        assert_eq!(stats.dropped_out_of_range, 1);
        assert_eq!(stats.dropped_excluded, 2);
        assert_eq!(stats.rows_kept, 4);
        assert_eq!(outcome.document.inputs.len(), 2);
    }

    #[test]
    fn test_default_exclusions_flag_congo_spellings() {
        let (_dir, config) = fixture("Iraq,IRQ,2001,1\n", "USA,1\n");
        let outcome = build_report(&config).unwrap();
        assert_eq!(outcome.audit.alias_groups.len(), 1);
        assert!(outcome
            .document
            .audit_notes
            .iter()
            .any(|n| n.contains("Democratic Republic of the Congo")));
    }

    #[test]
    fn test_everything_filtered_still_renders() {
        let (_dir, config) = fixture("Nigeria,NGA,2001,30\nIraq,IRQ,1990,4\n", "Mali,3\n");
        let outcome = build_report(&config).unwrap();

        assert!(outcome.document.totals.is_empty());
        assert!(!outcome.document.summary.has_data());
        assert!(outcome.document.chart_svg.contains("No data in range"));
    }

    #[test]
    fn test_coercion_failure_aborts() {
        let (_dir, config) = fixture("Iraq,IRQ,2001,many\n", "USA,1\n");
        assert!(matches!(
            build_report(&config),
            Err(PipelineError::Coercion { .. })
        ));
    }

    #[test]
    fn test_grand_total_overflow_aborts() {
        let (_dir, config) = fixture(
            "Iraq,IRQ,2001,5000000000000000000\nIraq,IRQ,2002,5000000000000000000\n",
            "USA,1\n",
        );
        assert!(matches!(
            build_report(&config),
            Err(PipelineError::Overflow(2002))
        ));
        assert!(!config.output_path.exists());
    }

    #[test]
    fn test_writes_all_outputs() {
        let (_dir, config) = fixture("Iraq,IRQ,2001,1234\n", "USA,20\n");
        let outcome = build_report(&config).unwrap();
        let paths = outcome.document.write_outputs(&config.output_path).unwrap();

        let html = fs::read_to_string(&paths.html).unwrap();
        assert!(html.contains("<svg"));
        assert!(html.contains("1,234"));
        assert!(paths.svg.exists());
        assert!(paths.json.exists());
    }
}
