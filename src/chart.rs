// 📈 Chart Rendering - yearly totals as an annotated SVG line chart
//
// Layers, back to front: interval bands, grid + axes, line, markers, labels,
// legend. Only the bands get legend entries.

use crate::record::{max_total, YearlyTotal};
use aho_corasick::AhoCorasick;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Fraction of the series maximum used to lift data labels above points.
pub const LABEL_OFFSET_FRACTION: f64 = 0.02;

const MARGIN_LEFT: f64 = 100.0;
const MARGIN_RIGHT: f64 = 230.0;
const MARGIN_TOP: f64 = 70.0;
const MARGIN_BOTTOM: f64 = 90.0;
const Y_TICKS: i64 = 6;

// ============================================================================
// OPTIONS & BANDS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartOptions {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub width: u32,
    pub height: u32,
    pub line_color: String,
}

impl Default for ChartOptions {
    fn default() -> Self {
        ChartOptions {
            title: "Yearly conflict deaths (excluding Africa)".to_string(),
            x_label: "Year".to_string(),
            y_label: "Total deaths".to_string(),
            width: 1200,
            height: 680,
            line_color: "#222222".to_string(),
        }
    }
}

/// Shaded background span over `[start, end]`; appears in the legend only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalBand {
    pub start: i32,
    pub end: i32,
    pub label: String,
    pub color: String,
    pub opacity: f64,
}

impl IntervalBand {
    pub fn new(start: i32, end: i32, label: &str, color: &str, opacity: f64) -> Self {
        IntervalBand {
            start,
            end,
            label: label.to_string(),
            color: color.to_string(),
            opacity,
        }
    }

    /// The four U.S. presidential terms covering 2001-2024.
    pub fn presidential_terms() -> Vec<IntervalBand> {
        vec![
            IntervalBand::new(2001, 2008, "George W. Bush (2001-2008)", "#d62728", 0.12),
            IntervalBand::new(2008, 2016, "Barack Obama (2008-2016)", "#1f77b4", 0.12),
            IntervalBand::new(2016, 2020, "Donald Trump (2016-2020)", "#ff7f0e", 0.18),
            IntervalBand::new(2020, 2024, "Joe Biden (2020-2024)", "#2ca02c", 0.18),
        ]
    }
}

// ============================================================================
// FORMATTING HELPERS
// ============================================================================

/// `1234567` -> `"1,234,567"`
pub fn format_thousands(value: impl Into<i128>) -> String {
    let value: i128 = value.into();
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    if value < 0 {
        format!("-{}", out)
    } else {
        out
    }
}

/// Vertical lift for data labels: 2% of the series maximum.
///
/// `None` for an empty series; a series whose maximum is not positive gets no lift.
pub fn label_offset(totals: &[YearlyTotal]) -> Option<f64> {
    let max = max_total(totals)?;
    if max <= 0 {
        return Some(0.0);
    }
    Some(max as f64 * LABEL_OFFSET_FRACTION)
}

static XML_ESCAPER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .build(["&", "<", ">", "\"", "'"])
        .expect("Failed to build XML escaper")
});

/// Escape text placed inside SVG elements and attributes.
fn escape_xml(text: &str) -> String {
    XML_ESCAPER.replace_all(text, &["&amp;", "&lt;", "&gt;", "&quot;", "&apos;"])
}

/// Round a tick step to 1, 2 or 5 times a power of ten (never below 1).
fn nice_step(raw: f64) -> i64 {
    if raw <= 1.0 {
        return 1;
    }
    let magnitude = 10f64.powf(raw.log10().floor());
    let fraction = raw / magnitude;
    let nice = if fraction <= 1.0 {
        1.0
    } else if fraction <= 2.0 {
        2.0
    } else if fraction <= 5.0 {
        5.0
    } else {
        10.0
    };
    (nice * magnitude) as i64
}

// ============================================================================
// SCALES
// ============================================================================

struct Scales {
    x_min: f64,
    x_max: f64,
    y_max: f64,
    y_step: i64,
    y_steps: i64,
    left: f64,
    right: f64,
    top: f64,
    bottom: f64,
}

impl Scales {
    fn new(totals: &[YearlyTotal], bands: &[IntervalBand], options: &ChartOptions) -> Self {
        let years = totals
            .iter()
            .map(|t| t.year)
            .chain(bands.iter().flat_map(|b| [b.start, b.end]));
        let (mut x_min, mut x_max) = years.fold((i32::MAX, i32::MIN), |(lo, hi), y| {
            (lo.min(y), hi.max(y))
        });
        if x_min > x_max {
            x_min = 0;
            x_max = 1;
        } else if x_min == x_max {
            x_min -= 1;
            x_max += 1;
        }

        // Headroom so the top label clears the plot edge
        let peak = max_total(totals).unwrap_or(0).max(0) as f64;
        let lifted = peak * (1.0 + 3.0 * LABEL_OFFSET_FRACTION);
        let y_step = nice_step(lifted / Y_TICKS as f64);
        let steps = (lifted / y_step as f64).ceil().max(1.0);

        Scales {
            x_min: x_min as f64,
            x_max: x_max as f64,
            y_max: steps * y_step as f64,
            y_step,
            y_steps: steps as i64,
            left: MARGIN_LEFT,
            right: options.width as f64 - MARGIN_RIGHT,
            top: MARGIN_TOP,
            bottom: options.height as f64 - MARGIN_BOTTOM,
        }
    }

    fn x(&self, year: f64) -> f64 {
        self.left + (year - self.x_min) / (self.x_max - self.x_min) * (self.right - self.left)
    }

    fn y(&self, value: f64) -> f64 {
        self.bottom - value / self.y_max * (self.bottom - self.top)
    }
}

// ============================================================================
// RENDERER
// ============================================================================

/// Render the full chart as a standalone SVG document.
pub fn render_svg(totals: &[YearlyTotal], bands: &[IntervalBand], options: &ChartOptions) -> String {
    let scales = Scales::new(totals, bands, options);
    let mut svg = String::new();

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" \
         viewBox=\"0 0 {w} {h}\" font-family=\"Helvetica, Arial, sans-serif\" font-size=\"12\">\n",
        w = options.width,
        h = options.height
    ));
    svg.push_str(&format!(
        "<rect x=\"0\" y=\"0\" width=\"{}\" height=\"{}\" fill=\"#ffffff\"/>\n",
        options.width, options.height
    ));

    render_bands(&mut svg, bands, &scales);
    render_y_axis(&mut svg, &scales, options);
    render_x_axis(&mut svg, totals, &scales, options);

    if totals.is_empty() {
        svg.push_str(&format!(
            "<text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\" font-size=\"18\" fill=\"#666666\">No data in range</text>\n",
            (scales.left + scales.right) / 2.0,
            (scales.top + scales.bottom) / 2.0
        ));
    } else {
        render_series(&mut svg, totals, &scales, options);
    }

    render_legend(&mut svg, bands, &scales);

    svg.push_str(&format!(
        "<text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\" font-size=\"20\" font-weight=\"bold\">{}</text>\n",
        options.width as f64 / 2.0,
        MARGIN_TOP / 2.0,
        escape_xml(&options.title)
    ));

    svg.push_str("</svg>\n");
    svg
}

fn render_bands(svg: &mut String, bands: &[IntervalBand], scales: &Scales) {
    svg.push_str("<g class=\"bands\">\n");
    for band in bands {
        let x0 = scales.x(band.start as f64);
        let x1 = scales.x(band.end as f64);
        svg.push_str(&format!(
            "<rect x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" fill=\"{}\" fill-opacity=\"{}\"/>\n",
            x0,
            scales.top,
            (x1 - x0).max(0.0),
            scales.bottom - scales.top,
            escape_xml(&band.color),
            band.opacity
        ));
    }
    svg.push_str("</g>\n");
}

fn render_y_axis(svg: &mut String, scales: &Scales, options: &ChartOptions) {
    svg.push_str("<g class=\"y-axis\">\n");
    // The top tick can exceed i64 when the peak is near i64::MAX
    for i in 0..=scales.y_steps {
        let tick = i as i128 * scales.y_step as i128;
        let y = scales.y(tick as f64);
        svg.push_str(&format!(
            "<line x1=\"{:.1}\" y1=\"{y:.1}\" x2=\"{:.1}\" y2=\"{y:.1}\" stroke=\"#dddddd\"/>\n",
            scales.left, scales.right
        ));
        svg.push_str(&format!(
            "<text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"end\">{}</text>\n",
            scales.left - 8.0,
            y + 4.0,
            format_thousands(tick)
        ));
    }
    svg.push_str(&format!(
        "<line x1=\"{l:.1}\" y1=\"{:.1}\" x2=\"{l:.1}\" y2=\"{:.1}\" stroke=\"#333333\"/>\n",
        scales.top,
        scales.bottom,
        l = scales.left
    ));
    let mid = (scales.top + scales.bottom) / 2.0;
    svg.push_str(&format!(
        "<text x=\"{x:.1}\" y=\"{mid:.1}\" text-anchor=\"middle\" font-size=\"14\" transform=\"rotate(-90 {x:.1} {mid:.1})\">{}</text>\n",
        escape_xml(&options.y_label),
        x = 24.0
    ));
    svg.push_str("</g>\n");
}

fn render_x_axis(svg: &mut String, totals: &[YearlyTotal], scales: &Scales, options: &ChartOptions) {
    svg.push_str("<g class=\"x-axis\">\n");
    svg.push_str(&format!(
        "<line x1=\"{:.1}\" y1=\"{b:.1}\" x2=\"{:.1}\" y2=\"{b:.1}\" stroke=\"#333333\"/>\n",
        scales.left,
        scales.right,
        b = scales.bottom
    ));
    for total in totals {
        let x = scales.x(total.year as f64);
        let y = scales.bottom + 16.0;
        svg.push_str(&format!(
            "<line x1=\"{x:.1}\" y1=\"{:.1}\" x2=\"{x:.1}\" y2=\"{:.1}\" stroke=\"#333333\"/>\n",
            scales.bottom,
            scales.bottom + 5.0
        ));
        svg.push_str(&format!(
            "<text x=\"{x:.1}\" y=\"{y:.1}\" text-anchor=\"end\" transform=\"rotate(-45 {x:.1} {y:.1})\">{}</text>\n",
            total.year
        ));
    }
    svg.push_str(&format!(
        "<text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\" font-size=\"14\">{}</text>\n",
        (scales.left + scales.right) / 2.0,
        options.height as f64 - 20.0,
        escape_xml(&options.x_label)
    ));
    svg.push_str("</g>\n");
}

fn render_series(svg: &mut String, totals: &[YearlyTotal], scales: &Scales, options: &ChartOptions) {
    let offset = label_offset(totals).unwrap_or(0.0);

    let points: Vec<String> = totals
        .iter()
        .map(|t| {
            format!(
                "{:.1},{:.1}",
                scales.x(t.year as f64),
                scales.y(t.total_deaths as f64)
            )
        })
        .collect();

    svg.push_str("<g class=\"series\">\n");
    svg.push_str(&format!(
        "<polyline points=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"2\"/>\n",
        points.join(" "),
        escape_xml(&options.line_color)
    ));
    for total in totals {
        let x = scales.x(total.year as f64);
        svg.push_str(&format!(
            "<circle cx=\"{x:.1}\" cy=\"{:.1}\" r=\"4\" fill=\"{}\"/>\n",
            scales.y(total.total_deaths as f64),
            escape_xml(&options.line_color)
        ));
        svg.push_str(&format!(
            "<text class=\"data-label\" x=\"{x:.1}\" y=\"{:.1}\" text-anchor=\"middle\" font-size=\"10\">{}</text>\n",
            scales.y(total.total_deaths as f64 + offset) - 4.0,
            format_thousands(total.total_deaths)
        ));
    }
    svg.push_str("</g>\n");
}

fn render_legend(svg: &mut String, bands: &[IntervalBand], scales: &Scales) {
    if bands.is_empty() {
        return;
    }
    let x = scales.right + 20.0;
    svg.push_str("<g class=\"legend\">\n");
    for (i, band) in bands.iter().enumerate() {
        let y = scales.top + i as f64 * 24.0;
        svg.push_str(&format!(
            "<rect x=\"{x:.1}\" y=\"{y:.1}\" width=\"16\" height=\"16\" fill=\"{}\" fill-opacity=\"{}\" stroke=\"#999999\"/>\n",
            escape_xml(&band.color),
            band.opacity
        ));
        svg.push_str(&format!(
            "<text x=\"{:.1}\" y=\"{:.1}\">{}</text>\n",
            x + 22.0,
            y + 12.0,
            escape_xml(&band.label)
        ));
    }
    svg.push_str("</g>\n");
}

// ============================================================================
// TESTS
// ============================================================================
