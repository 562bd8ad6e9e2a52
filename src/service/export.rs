use std::io::BufWriter;

use printpdf::{BuiltinFont, Color, IndirectFontRef, Line, LineDashPattern, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference, Point, Rect, Rgb};
use tracing::{debug, instrument};

use crate::{
    metrics::charts::{Bar, ChartPoint, HorizontalBar},
    model::apperror::{ApplicationError, ErrorType},
    service::report::Report,
};

/**
 * File name offered when the report is downloaded.
 */
pub const EXPORT_FILE_NAME: &str = "YSO-Registration-Report.pdf";

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 10.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const CHART_HEIGHT: f32 = 50.0;
const LABEL_WIDTH: f32 = 45.0;
const BAR_AREA_WIDTH: f32 = 120.0;
const ROW_HEIGHT: f32 = 6.0;
const TEXT_COLOR: &str = "#111827";
const MUTED_COLOR: &str = "#6b7280";
const AVERAGE_LINE_COLOR: &str = "#dc2626";

/**
 * Converts "#rrggbb" to a PDF colour. Anything else is drawn black.
 */
fn color(hex: &str) -> Color {
    let channel = |range: std::ops::Range<usize>| hex.trim_start_matches('#').get(range).and_then(|value| u8::from_str_radix(value, 16).ok()).map_or(0.0, |value| f32::from(value) / 255.0);
    Color::Rgb(Rgb::new(channel(0..2), channel(2..4), channel(4..6), None))
}

/**
 * Text the builtin fonts can encode: the clock separator becomes a hyphen and other non-ASCII characters a
 * question mark.
 */
fn pdf_text(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '•' => '-',
            c if c.is_ascii() => c,
            _ => '?',
        })
        .collect()
}

/**
 * Writes top to bottom on A4 pages, starting a new page when the next block does not fit.
 */
struct PdfWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    bold: IndirectFontRef,
    /**
     * Distance of the cursor from the bottom of the page in mm.
     */
    y: f32,
    pages: usize,
}

impl PdfWriter {
    fn new(title: &str) -> Result<Self, ApplicationError> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let layer = doc.get_page(page).get_layer(layer);
        let font = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(|err| ApplicationError::new(ErrorType::Application, format!("Failed to load font: {err}")))?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(|err| ApplicationError::new(ErrorType::Application, format!("Failed to load font: {err}")))?;
        Ok(PdfWriter { doc, layer, font, bold, y: PAGE_HEIGHT - MARGIN, pages: 1 })
    }

    fn reserve(&mut self, height: f32) {
        if self.y - height >= MARGIN {
            return;
        }
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
        self.pages += 1;
    }

    fn text(&self, text: &str, size: f32, x: f32, y: f32, bold: bool, hex: &str) {
        self.layer.set_fill_color(color(hex));
        self.layer.use_text(pdf_text(text), size, Mm(x), Mm(y), if bold { &self.bold } else { &self.font });
    }

    fn line(&mut self, text: &str, size: f32, bold: bool, hex: &str) {
        let height = size * 0.3528 + 2.0;
        self.reserve(height);
        self.y -= height;
        self.text(text, size, MARGIN, self.y, bold, hex);
    }

    fn rect(&self, x: f32, y: f32, width: f32, height: f32, hex: &str) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        self.layer.set_fill_color(color(hex));
        self.layer.add_rect(Rect::new(Mm(x), Mm(y), Mm(x + width), Mm(y + height)));
    }

    fn section(&mut self, title: &str) {
        self.y -= 3.0;
        self.line(title, 12.0, true, TEXT_COLOR);
        self.y -= 1.0;
    }

    fn save(self) -> Result<(Vec<u8>, usize), ApplicationError> {
        let pages = self.pages;
        let mut writer = BufWriter::new(Vec::new());
        self.doc.save(&mut writer).map_err(|err| ApplicationError::new(ErrorType::Application, format!("Failed to write pdf: {err}")))?;
        let bytes = writer.into_inner().map_err(|err| ApplicationError::new(ErrorType::Application, format!("Failed to flush pdf: {err}")))?;
        Ok((bytes, pages))
    }
}

/**
 * Renders the report as an A4 portrait PDF with 10 mm margins.
 *
 * # Arguments
 * `report`: The composed report.
 *
 * # Returns
 * The PDF bytes, or an `ApplicationError` if the document could not be produced.
 */
#[instrument(skip(report), fields(result))]
pub fn export_pdf(report: &Report) -> Result<Vec<u8>, ApplicationError> {
    let mut pdf = PdfWriter::new(&report.title)?;

    pdf.line(&report.organisation, 16.0, true, TEXT_COLOR);
    pdf.line(&report.title, 14.0, true, TEXT_COLOR);
    pdf.line(&report.tagline, 10.0, false, MUTED_COLOR);
    pdf.line(&report.generated_at, 9.0, false, MUTED_COLOR);

    write_tiles(&mut pdf, report);

    pdf.section("Monthly Registrations");
    write_vertical_bars(&mut pdf, &report.monthly_chart.bars, report.monthly_chart.view_box_width, report.monthly_chart.view_box_height, &[]);

    pdf.section("Weekly Registrations");
    write_vertical_bars(&mut pdf, &report.weekly_chart.bars, report.weekly_chart.view_box_width, report.weekly_chart.view_box_height, &report.weekly_chart.moving_average);

    pdf.section("Top Counties");
    write_horizontal_bars(&mut pdf, &report.county_chart);

    pdf.section("Weekly Growth");
    match &report.latest_growth {
        Some(growth) => {
            let rows = [
                ("Date range", growth.date_range.clone().unwrap_or_default()),
                ("Previous total", growth.previous_number.to_string()),
                ("Current total", growth.current_number.to_string()),
                ("Weekly growth", growth.weekly_growth.to_string()),
                ("Growth percentage", format!("{}%", growth.weekly_growth_percentage)),
            ];
            for (label, value) in rows {
                pdf.reserve(ROW_HEIGHT);
                pdf.y -= ROW_HEIGHT;
                pdf.text(label, 10.0, MARGIN, pdf.y, true, TEXT_COLOR);
                pdf.text(&value, 10.0, MARGIN + 60.0, pdf.y, false, TEXT_COLOR);
            }
        }
        None => pdf.line("No growth data", 10.0, false, MUTED_COLOR),
    }

    pdf.section("Sector Working Groups");
    write_horizontal_bars(&mut pdf, &report.sector_chart);

    pdf.y -= 4.0;
    pdf.line(&format!("{} - {}", report.organisation, report.tagline), 9.0, false, MUTED_COLOR);

    let (bytes, pages) = pdf.save()?;
    debug!("Exported report: {} pages, {} bytes", pages, bytes.len());
    tracing::Span::current().record("result", pages);
    Ok(bytes)
}

fn write_tiles(pdf: &mut PdfWriter, report: &Report) {
    let tiles = [
        ("Weekly Registrations", report.tiles.weekly_registrations.to_string()),
        ("Current Total", report.tiles.current_total.to_string()),
        ("Growth", report.tiles.growth_trend.clone().unwrap_or_else(|| "-".to_string())),
        ("Active Counties", report.tiles.active_counties.to_string()),
        ("Sector Working Groups", report.tiles.sector_working_groups.to_string()),
        ("Total Registrations", report.tiles.total_registrations.to_string()),
    ];
    let tile_width = CONTENT_WIDTH / 3.0;
    let tile_height = 16.0;
    for row in tiles.chunks(3) {
        pdf.reserve(tile_height + 2.0);
        pdf.y -= tile_height + 2.0;
        for (column, (label, value)) in row.iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let x = MARGIN + column as f32 * tile_width;
            pdf.rect(x, pdf.y, tile_width - 2.0, tile_height, "#f3f4f6");
            pdf.text(label, 8.0, x + 2.0, pdf.y + tile_height - 5.0, false, MUTED_COLOR);
            pdf.text(value, 14.0, x + 2.0, pdf.y + 3.0, true, TEXT_COLOR);
        }
    }
}

/**
 * Draws a vertical bar chart scaled from its view box into the content width, with an optional dashed
 * line through `points`.
 */
#[allow(clippy::cast_possible_truncation)]
fn write_vertical_bars(pdf: &mut PdfWriter, bars: &[Bar], view_box_width: f64, view_box_height: f64, points: &[ChartPoint]) {
    if bars.is_empty() {
        pdf.line("No data", 10.0, false, MUTED_COLOR);
        return;
    }
    let label_height = 5.0;
    pdf.reserve(CHART_HEIGHT + label_height);
    let top = pdf.y;
    let x_scale = (f64::from(CONTENT_WIDTH) / view_box_width).min(0.5) as f32;
    let y_scale = CHART_HEIGHT / view_box_height as f32;
    let to_y = |svg_y: f64| top - svg_y as f32 * y_scale;

    for bar in bars {
        let x = MARGIN + bar.x as f32 * x_scale;
        let width = bar.width as f32 * x_scale;
        pdf.rect(x, to_y(bar.y + bar.height), width, bar.height as f32 * y_scale, &bar.color);
        pdf.text(&bar.value.to_string(), 7.0, x, to_y(bar.y) + 1.0, false, TEXT_COLOR);
        pdf.text(&bar.label, 7.0, x, top - CHART_HEIGHT - 4.0, false, MUTED_COLOR);
    }

    if points.len() > 1 {
        pdf.layer.set_outline_color(color(AVERAGE_LINE_COLOR));
        pdf.layer.set_outline_thickness(1.0);
        pdf.layer.set_line_dash_pattern(LineDashPattern { dash_1: Some(3), gap_1: Some(2), ..LineDashPattern::default() });
        pdf.layer.add_line(Line { points: points.iter().map(|point| (Point::new(Mm(MARGIN + point.x as f32 * x_scale), Mm(to_y(point.y))), false)).collect(), is_closed: false });
        pdf.layer.set_line_dash_pattern(LineDashPattern::default());
    }
    pdf.y = top - CHART_HEIGHT - label_height;
}

#[allow(clippy::cast_possible_truncation)]
fn write_horizontal_bars(pdf: &mut PdfWriter, bars: &[HorizontalBar]) {
    if bars.is_empty() {
        pdf.line("No data", 10.0, false, MUTED_COLOR);
        return;
    }
    for bar in bars {
        pdf.reserve(ROW_HEIGHT);
        pdf.y -= ROW_HEIGHT;
        pdf.text(&bar.label, 9.0, MARGIN, pdf.y + 1.0, false, TEXT_COLOR);
        let width = BAR_AREA_WIDTH * bar.width_percent as f32 / 100.0;
        pdf.rect(MARGIN + LABEL_WIDTH, pdf.y, width, ROW_HEIGHT - 2.0, &bar.color);
        pdf.text(&bar.value.to_string(), 9.0, MARGIN + LABEL_WIDTH + width + 2.0, pdf.y + 1.0, false, TEXT_COLOR);
    }
}
