// 📄 Report Document - narrative, figures, embedded chart, provenance
//
// Output is a single self-contained HTML page with the SVG inlined. Images
// stay external and are referenced by path relative to the page.

use crate::chart::format_thousands;
use crate::error::Result;
use crate::filter::{FilterStats, YearRange};
use crate::quality::PipelineSummary;
use crate::record::YearlyTotal;
use askama::Template;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// ============================================================================
// NARRATIVE CONTENT
// ============================================================================

/// Static image placed in the text flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    /// Path relative to the generated page
    pub src: String,
    pub alt: String,
    #[serde(default)]
    pub caption: Option<String>,
}

/// Prose around the chart: introduction and figures before it, analysis and
/// closing figures after it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Narrative {
    pub title: String,
    pub introduction: Vec<String>,
    pub figures: Vec<Figure>,
    pub analysis: Vec<String>,
    pub closing_figures: Vec<Figure>,
}

impl Narrative {
    /// Figures whose file does not exist relative to `base_dir`.
    pub fn missing_figures(&self, base_dir: &Path) -> Vec<&Figure> {
        self.figures
            .iter()
            .chain(self.closing_figures.iter())
            .filter(|f| !base_dir.join(&f.src).exists())
            .collect()
    }
}

// ============================================================================
// PROVENANCE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDigest {
    pub file: String,
    pub sha256: String,
}

/// SHA-256 of a file's bytes, lowercase hex.
pub fn digest_file(path: &Path) -> Result<InputDigest> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(InputDigest {
        file: path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string(),
        sha256: format!("{:x}", hasher.finalize()),
    })
}

// ============================================================================
// REPORT DOCUMENT
// ============================================================================

#[derive(Debug, Clone)]
pub struct ReportDocument {
    pub narrative: Narrative,
    pub chart_svg: String,
    pub totals: Vec<YearlyTotal>,
    pub summary: PipelineSummary,
    pub year_range: YearRange,
    pub excluded_count: usize,
    pub audit_notes: Vec<String>,
    pub inputs: Vec<InputDigest>,
    pub generated_at: DateTime<Utc>,
}

/// Machine-readable companion written next to the HTML.
#[derive(Debug, Serialize)]
struct ReportExport<'a> {
    generated_at: DateTime<Utc>,
    year_range: YearRange,
    excluded_count: usize,
    totals: &'a [YearlyTotal],
    summary: &'a PipelineSummary,
    inputs: &'a [InputDigest],
}

/// Where `write_outputs` put each artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub html: PathBuf,
    pub svg: PathBuf,
    pub json: PathBuf,
}

/// Page layout lives in `templates/report.html`; askama escapes every field
/// except the pre-rendered chart.
#[derive(Template)]
#[template(path = "report.html")]
struct ReportTemplate<'a> {
    title: &'a str,
    introduction: &'a [String],
    figures: &'a [Figure],
    chart_svg: &'a str,
    analysis: &'a [String],
    rows: Vec<TotalRow>,
    year_start: i32,
    year_end: i32,
    excluded_count: usize,
    filter: FilterStats,
    audit_notes: &'a [String],
    closing_figures: &'a [Figure],
    inputs: &'a [InputDigest],
    generated_at: String,
}

struct TotalRow {
    year: i32,
    total: String,
}

impl ReportDocument {
    pub fn render_html(&self) -> Result<String> {
        let template = ReportTemplate {
            title: &self.narrative.title,
            introduction: &self.narrative.introduction,
            figures: &self.narrative.figures,
            chart_svg: &self.chart_svg,
            analysis: &self.narrative.analysis,
            rows: self
                .totals
                .iter()
                .map(|t| TotalRow {
                    year: t.year,
                    total: format_thousands(t.total_deaths),
                })
                .collect(),
            year_start: self.year_range.start,
            year_end: self.year_range.end,
            excluded_count: self.excluded_count,
            filter: self.summary.filter,
            audit_notes: &self.audit_notes,
            closing_figures: &self.narrative.closing_figures,
            inputs: &self.inputs,
            generated_at: self.generated_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        };
        Ok(template.render()?)
    }

    fn export_json(&self) -> Result<String> {
        let export = ReportExport {
            generated_at: self.generated_at,
            year_range: self.year_range,
            excluded_count: self.excluded_count,
            totals: &self.totals,
            summary: &self.summary,
            inputs: &self.inputs,
        };
        Ok(serde_json::to_string_pretty(&export)?)
    }

    /// Write the HTML page plus `<stem>.svg` and `<stem>.json` beside it.
    /// Nothing touches the disk until all three artifacts have rendered.
    pub fn write_outputs(&self, html_path: &Path) -> Result<OutputPaths> {
        let html = self.render_html()?;
        let json = self.export_json()?;

        if let Some(parent) = html_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let paths = OutputPaths {
            html: html_path.to_path_buf(),
            svg: html_path.with_extension("svg"),
            json: html_path.with_extension("json"),
        };

        fs::write(&paths.html, html)?;
        fs::write(&paths.svg, &self.chart_svg)?;
        fs::write(&paths.json, json)?;

        let base_dir = html_path.parent().unwrap_or_else(|| Path::new("."));
        for figure in self.narrative.missing_figures(base_dir) {
            warn!(src = %figure.src, "figure referenced by the report does not exist yet");
        }

        info!(html = %paths.html.display(), "report written");
        Ok(paths)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_document(totals: Vec<YearlyTotal>) -> ReportDocument {
        let stats = FilterStats {
            rows_in: 4,
            dropped_out_of_range: 1,
            dropped_excluded: 1,
            rows_kept: 2,
        };
        ReportDocument {
            narrative: Narrative {
                title: "Deaths & Terms".to_string(),
                introduction: vec!["Intro <paragraph>.".to_string()],
                figures: vec![Figure {
                    src: "images/map.png".to_string(),
                    alt: "Map".to_string(),
                    caption: Some("A map".to_string()),
                }],
                analysis: vec!["Analysis.".to_string()],
                closing_figures: vec![],
            },
            chart_svg: "<svg id=\"chart\"></svg>\n".to_string(),
            summary: PipelineSummary::new(Vec::new(), stats, &totals).unwrap(),
            totals,
            year_range: YearRange { start: 2001, end: 2024 },
            excluded_count: 57,
            audit_notes: vec!["Spelled <twice> & more.".to_string()],
            inputs: vec![InputDigest {
                file: "a.csv".to_string(),
                sha256: "abc123".to_string(),
            }],
            generated_at: DateTime::parse_from_rfc3339("2025-01-02T03:04:05Z")
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    #[test]
    fn test_render_html_sections_in_order() {
        let doc = sample_document(vec![YearlyTotal::new(2001, 150), YearlyTotal::new(2024, 2_500)]);
        let html = doc.render_html().unwrap();

        let intro = html.find("Intro &lt;paragraph&gt;.").unwrap();
        let image = html.find("<img src=").unwrap();
        let chart = html.find("<svg id=\"chart\">").unwrap();
        let analysis = html.find("Analysis.").unwrap();
        assert!(intro < image && image < chart && chart < analysis);

        assert!(html.contains("<title>Deaths &amp; Terms</title>"));
        assert!(html.contains("<td>2,500</td>"));
        assert!(html.contains("Years 2001 to 2024 inclusive."));
        assert!(html.contains("57 country names excluded"));
        assert!(html.contains("Spelled &lt;twice&gt; &amp; more."));
        assert!(html.contains("sha256:abc123"));
        assert!(html.contains("Generated 2025-01-02 03:04 UTC"));
    }

    #[test]
    fn test_render_html_empty_totals() {
        let doc = sample_document(vec![]);
        let html = doc.render_html().unwrap();
        assert!(html.contains("No data in range."));
        assert!(!html.contains("<table>"));
    }

    #[test]
    fn test_render_html_escapes_narrative_but_not_chart() {
        let mut doc = sample_document(vec![YearlyTotal::new(2001, 150)]);
        doc.narrative.figures[0].caption = Some("<b>bold</b>".to_string());
        doc.narrative.analysis = vec!["<script>alert(1)</script>".to_string()];
        doc.inputs[0].file = "a&b.csv".to_string();
        let html = doc.render_html().unwrap();

        assert!(html.contains("<figcaption>&lt;b&gt;bold"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("a&amp;b.csv"));
        assert!(html.contains("<svg id=\"chart\"></svg>"));
    }

    #[test]
    fn test_digest_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"abc").unwrap();
        let digest = digest_file(file.path()).unwrap();
        assert_eq!(
            digest.sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_missing_figures() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("images")).unwrap();
        fs::write(dir.path().join("images/present.png"), b"png").unwrap();

        let narrative = Narrative {
            figures: vec![
                Figure {
                    src: "images/present.png".to_string(),
                    alt: String::new(),
                    caption: None,
                },
                Figure {
                    src: "images/absent.png".to_string(),
                    alt: String::new(),
                    caption: None,
                },
            ],
            ..Narrative::default()
        };

        let missing = narrative.missing_figures(dir.path());
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].src, "images/absent.png");
    }

    #[test]
    fn test_write_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let html_path = dir.path().join("out/report.html");
        let doc = sample_document(vec![YearlyTotal::new(2001, 150)]);

        let paths = doc.write_outputs(&html_path).unwrap();

        assert_eq!(paths.svg, dir.path().join("out/report.svg"));
        assert!(fs::read_to_string(&paths.html).unwrap().contains("<!DOCTYPE html>"));
        assert_eq!(fs::read_to_string(&paths.svg).unwrap(), doc.chart_svg);

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&paths.json).unwrap()).unwrap();
        assert_eq!(json["totals"][0]["year"], 2001);
        assert_eq!(json["totals"][0]["total_deaths"], 150);
        assert_eq!(json["year_range"]["start"], 2001);
    }

    #[test]
    fn test_write_outputs_leaves_existing_files_when_parent_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("out");
        fs::write(&blocker, b"not a directory").unwrap();
        let doc = sample_document(vec![YearlyTotal::new(2001, 150)]);

        assert!(doc.write_outputs(&blocker.join("report.html")).is_err());
        assert_eq!(fs::read(&blocker).unwrap(), b"not a directory");
    }

    #[test]
    fn test_write_outputs_html_matches_render() {
        let dir = tempfile::tempdir().unwrap();
        let doc = sample_document(vec![YearlyTotal::new(2001, 150)]);
        let paths = doc.write_outputs(&dir.path().join("report.html")).unwrap();
        assert_eq!(fs::read_to_string(&paths.html).unwrap(), doc.render_html().unwrap());
        assert_eq!(paths.json, dir.path().join("report.json"));
    }
}
