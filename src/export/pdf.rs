//! Printable summary: title, metrics table, and a bar chart with reference bands.

use std::io::BufWriter;
use std::path::Path;

use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Polygon, Rgb,
};

use crate::analysis::{bar_chart_data, status_color, BarDatum, BAND_COLOR};
use crate::models::{format_number, MetricRecord};

use super::ExportError;

pub const PDF_TITLE: &str = "Clinical Report Summary";
const CHART_TITLE: &str = "Metric Values vs Reference Ranges";

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const LEFT: f32 = 20.0;
const TOP: f32 = 280.0;
const BOTTOM: f32 = 20.0;
const ROW: f32 = 6.0;
const COLUMNS: [(&str, f32); 4] = [("Metric", 20.0), ("Value", 80.0), ("Reference", 125.0), ("Status", 165.0)];

const CHART_LEFT: f32 = 20.0;
const CHART_RIGHT: f32 = 190.0;
const CHART_BASE: f32 = 60.0;
const CHART_HEIGHT: f32 = 180.0;

const BLACK: (u8, u8, u8) = (0, 0, 0);
const BAND_OUTLINE: (u8, u8, u8) = (0x41, 0x69, 0xE1);

fn pdf_err(e: impl std::fmt::Display) -> ExportError {
    ExportError::Pdf(e.to_string())
}

/// Render the summary PDF and return its bytes.
pub fn render_pdf(records: &[MetricRecord]) -> Result<Vec<u8>, ExportError> {
    let (doc, page1, layer1) = PdfDocument::new(PDF_TITLE, Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
    let font = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_err)?;

    let mut layer = doc.get_page(page1).get_layer(layer1);
    let mut y = TOP;

    layer.use_text(PDF_TITLE, 16.0, Mm(LEFT), Mm(y), &bold);
    y -= 12.0;

    if records.is_empty() {
        layer.use_text("No metrics were extracted from this report.", 10.0, Mm(LEFT), Mm(y), &font);
    } else {
        table_header(&layer, y, &bold);
        y -= ROW;
        for record in records {
            if y < BOTTOM {
                layer = new_page(&doc);
                y = TOP;
                table_header(&layer, y, &bold);
                y -= ROW;
            }
            let cells = [
                record.metric().to_string(),
                value_cell(record),
                record
                    .reference_range()
                    .map(|r| r.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                record.status().to_string(),
            ];
            for ((_, x), cell) in COLUMNS.iter().zip(cells.iter()) {
                layer.use_text(truncate(cell, 26), 9.0, Mm(*x), Mm(y), &font);
            }
            y -= ROW;
        }
    }

    let bars = bar_chart_data(records);
    if !bars.is_empty() {
        let chart = new_page(&doc);
        draw_bar_chart(&chart, &bars, &font, &bold);
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf).map_err(pdf_err)?;
    buf.into_inner().map_err(pdf_err)
}

pub fn write_pdf_file(path: &Path, records: &[MetricRecord]) -> Result<(), ExportError> {
    let bytes = render_pdf(records)?;
    std::fs::write(path, bytes)?;
    tracing::info!(path = %path.display(), metrics = records.len(), "Wrote PDF report");
    Ok(())
}

fn new_page(doc: &PdfDocumentReference) -> PdfLayerReference {
    let (page, layer) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
    doc.get_page(page).get_layer(layer)
}

fn table_header(layer: &PdfLayerReference, y: f32, bold: &IndirectFontRef) {
    for (label, x) in COLUMNS {
        layer.use_text(label, 10.0, Mm(x), Mm(y), bold);
    }
}

fn value_cell(record: &MetricRecord) -> String {
    let value = record.value().to_string();
    if value.is_empty() {
        return "-".to_string();
    }
    match record.unit() {
        Some(unit) => format!("{value} {unit}"),
        None => value,
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

/// Bars share one chart but each is scaled to its own slot maximum
/// (the larger of the value and the band's upper bound), so metrics of very
/// different magnitude stay comparable against their own range.
fn draw_bar_chart(layer: &PdfLayerReference, bars: &[BarDatum], font: &IndirectFontRef, bold: &IndirectFontRef) {
    layer.use_text(CHART_TITLE, 14.0, Mm(LEFT), Mm(TOP), bold);
    layer.use_text(
        "Bars are colored by status; shaded boxes mark the reference range.",
        8.0,
        Mm(LEFT),
        Mm(TOP - 6.0),
        font,
    );

    let slot = (CHART_RIGHT - CHART_LEFT) / bars.len() as f32;
    let label_chars = ((slot / 1.6) as usize).clamp(3, 14);

    for (i, bar) in bars.iter().enumerate() {
        let center = CHART_LEFT + slot * (i as f32 + 0.5);
        let scale_max = bar
            .band
            .map_or(bar.value, |(_, high)| high.max(bar.value))
            .max(f64::EPSILON)
            * 1.1;
        let to_y = |v: f64| CHART_BASE + (v.max(0.0) / scale_max) as f32 * CHART_HEIGHT;

        if let Some((low, high)) = bar.band {
            fill_rect(layer, center - 0.4 * slot, to_y(low), center + 0.4 * slot, to_y(high), BAND_COLOR);
        }
        fill_rect(
            layer,
            center - 0.25 * slot,
            CHART_BASE,
            center + 0.25 * slot,
            to_y(bar.value),
            status_color(bar.status),
        );
        if let Some((low, high)) = bar.band {
            outline_rect(layer, center - 0.4 * slot, to_y(low), center + 0.4 * slot, to_y(high), BAND_OUTLINE);
        }

        layer.set_fill_color(rgb(BLACK));
        layer.use_text(
            truncate(&format_number(bar.value), label_chars),
            6.0,
            Mm(center - 0.25 * slot),
            Mm(to_y(bar.value) + 2.0),
            font,
        );
        layer.use_text(
            truncate(&bar.metric, label_chars),
            6.0,
            Mm(center - 0.4 * slot),
            Mm(CHART_BASE - 5.0),
            font,
        );
    }

    layer.set_outline_color(rgb(BLACK));
    layer.set_outline_thickness(0.8);
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(CHART_LEFT), Mm(CHART_BASE)), false),
            (Point::new(Mm(CHART_RIGHT), Mm(CHART_BASE)), false),
        ],
        is_closed: false,
    });
}

fn rgb((r, g, b): (u8, u8, u8)) -> Color {
    Color::Rgb(Rgb::new(
        f32::from(r) / 255.0,
        f32::from(g) / 255.0,
        f32::from(b) / 255.0,
        None,
    ))
}

fn rect_points(x0: f32, y0: f32, x1: f32, y1: f32) -> Vec<(Point, bool)> {
    vec![
        (Point::new(Mm(x0), Mm(y0)), false),
        (Point::new(Mm(x1), Mm(y0)), false),
        (Point::new(Mm(x1), Mm(y1)), false),
        (Point::new(Mm(x0), Mm(y1)), false),
    ]
}

fn fill_rect(layer: &PdfLayerReference, x0: f32, y0: f32, x1: f32, y1: f32, color: (u8, u8, u8)) {
    layer.set_fill_color(rgb(color));
    layer.add_polygon(Polygon {
        rings: vec![rect_points(x0, y0, x1, y1)],
        mode: PaintMode::Fill,
        winding_order: WindingOrder::NonZero,
    });
}

fn outline_rect(layer: &PdfLayerReference, x0: f32, y0: f32, x1: f32, y1: f32, color: (u8, u8, u8)) {
    layer.set_outline_color(rgb(color));
    layer.set_outline_thickness(0.5);
    layer.add_line(Line {
        points: rect_points(x0, y0, x1, y1),
        is_closed: true,
    });
}
