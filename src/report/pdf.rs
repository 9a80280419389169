//! A4 report layout rendered with `printpdf` and the bundled DejaVu Sans faces.

use printpdf::image_crate::codecs::png::PngDecoder;
use printpdf::path::PaintMode;
use printpdf::{
    Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Point, Rect, Rgb, TextMatrix,
};
use std::io::Cursor;
use thiserror::Error;
use ttf_parser::Face;

use crate::model::Status;
use crate::predict::recommendations;

const REGULAR_TTF: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");
const BOLD_TTF: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf");

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const LOGO_SIZE: f32 = 21.0;
const PT_TO_MM: f32 = 0.3528;
const WATERMARK_ANGLE: f32 = 30.0;

const GREEN: u32 = 0x2E7D32;
const LABEL_GREEN: u32 = 0x388E3C;
const DIVIDER: u32 = 0xE0F2E0;
const WATERMARK: u32 = 0xEAF2EA;
const GREY: u32 = 0x757575;
const BLACK: u32 = 0x212121;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("PDF rendering failed: {0}")]
    Pdf(String),

    #[error("Report font is unreadable: {0}")]
    Font(String),
}

/// Everything printed on the report, already formatted for display.
#[derive(Debug, Clone)]
pub struct ReportData {
    pub patient_id: String,
    pub patient_name: String,
    pub age: String,
    pub blood_sugar: String,
    pub systolic_bp: String,
    pub diastolic_bp: String,
    pub status: Status,
    pub probability: String,
    pub generated_at: String,
}

fn rgb(hex: u32) -> Color {
    let channel = |shift: u32| ((hex >> shift) & 0xFF) as f32 / 255.0;
    Color::Rgb(Rgb::new(channel(16), channel(8), channel(0), None))
}

fn pdf_error(e: impl std::fmt::Display) -> ReportError {
    ReportError::Pdf(e.to_string())
}

/// Greedy word wrap. A word wider than a whole line is broken between characters.
pub fn wrap_text(text: &str, fits: impl Fn(&str) -> bool) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if fits(&candidate) {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        for c in word.chars() {
            let mut next = current.clone();
            next.push(c);
            if !current.is_empty() && !fits(&next) {
                lines.push(std::mem::take(&mut current));
                current.push(c);
            } else {
                current = next;
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Cuts `text` down to what fits, marking the cut with an ellipsis.
pub fn ellipsize(text: &str, fits: impl Fn(&str) -> bool) -> String {
    if fits(text) {
        return text.to_string();
    }
    let mut kept: Vec<char> = text.chars().collect();
    while !kept.is_empty() {
        kept.pop();
        let candidate: String = kept.iter().chain(std::iter::once(&'…')).collect();
        if fits(&candidate) {
            return candidate;
        }
    }
    "…".to_string()
}

/// An embedded font plus the parsed face used for glyph coverage and advance widths.
struct Typeface {
    face: Face<'static>,
    font: IndirectFontRef,
}

impl Typeface {
    fn load(doc: &PdfDocumentReference, bytes: &'static [u8]) -> Result<Self, ReportError> {
        let face = Face::parse(bytes, 0).map_err(|e| ReportError::Font(e.to_string()))?;
        let font = doc.add_external_font(bytes).map_err(pdf_error)?;
        Ok(Typeface { face, font })
    }

    fn width(&self, text: &str, size: f32) -> f32 {
        let units: u32 = text
            .chars()
            .filter_map(|c| self.face.glyph_index(c).or_else(|| self.face.glyph_index('?')))
            .filter_map(|glyph| self.face.glyph_hor_advance(glyph))
            .map(u32::from)
            .sum();
        units as f32 / f32::from(self.face.units_per_em()) * size * PT_TO_MM
    }

    /// The PDF writer drops characters without a glyph; substitute `?` so the gap is visible.
    fn printable(&self, text: &str) -> String {
        let mut missing = Vec::new();
        let printable = text
            .chars()
            .map(|c| {
                if c.is_control() {
                    ' '
                } else if self.face.glyph_index(c).is_some() {
                    c
                } else {
                    missing.push(c);
                    '?'
                }
            })
            .collect();
        if !missing.is_empty() {
            tracing::warn!(
                "Report font has no glyph for {:?}; printed as '?'",
                missing.iter().collect::<String>()
            );
        }
        printable
    }
}

struct Canvas {
    layer: PdfLayerReference,
    regular: Typeface,
    bold: Typeface,
    // distance from the bottom edge, in mm
    cursor: f32,
}

impl Canvas {
    fn face(&self, bold: bool) -> &Typeface {
        if bold { &self.bold } else { &self.regular }
    }

    fn text(&self, text: &str, size: f32, x: f32, bold: bool, color: u32) {
        let face = self.face(bold);
        self.layer.set_fill_color(rgb(color));
        self.layer
            .use_text(face.printable(text), size, Mm(x), Mm(self.cursor), &face.font);
    }

    fn centered(&self, text: &str, size: f32, bold: bool, color: u32) {
        let width = self.face(bold).width(text, size);
        let x = ((PAGE_WIDTH - width) / 2.0).max(MARGIN);
        self.text(text, size, x, bold, color);
    }

    /// Centers `text`, wrapping onto as many lines as the content width needs.
    fn centered_wrapped(&mut self, text: &str, size: f32, bold: bool, color: u32, leading: f32) {
        let face = self.face(bold);
        let lines = wrap_text(text, |line| face.width(line, size) <= CONTENT_WIDTH);
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                self.advance(leading);
            }
            self.centered(line, size, bold, color);
        }
    }

    fn advance(&mut self, mm: f32) {
        self.cursor -= mm;
    }

    fn rule(&self, color: u32, thickness: f32) {
        self.layer.set_outline_color(rgb(color));
        self.layer.set_outline_thickness(thickness);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(MARGIN), Mm(self.cursor)), false),
                (Point::new(Mm(PAGE_WIDTH - MARGIN), Mm(self.cursor)), false),
            ],
            is_closed: false,
        });
    }

    fn section_title(&mut self, title: &str) {
        self.advance(10.0);
        self.text(title, 14.0, MARGIN, true, GREEN);
        self.advance(3.0);
        self.rule(DIVIDER, 1.5);
        self.advance(7.0);
    }

    /// Label and value on one line within `max_width`; long values are ellipsized.
    fn labelled(&self, label: &str, value: &str, x: f32, max_width: f32) {
        self.text(label, 10.0, x, true, LABEL_GREEN);
        let offset = self.bold.width(label, 10.0) + 2.0;
        let room = max_width - offset;
        let value = ellipsize(value, |v| self.regular.width(v, 11.0) <= room);
        self.text(&value, 11.0, x + offset, false, BLACK);
    }

    fn badge(&mut self, status: Status) {
        let (fill, ink) = match status {
            Status::Diabetic => (0xFFCDD2, 0xB71C1C),
            Status::NonDiabetic => (0xC8E6C9, 0x1B5E20),
        };
        let label = status.label();
        let width = self.bold.width(label, 14.0) + 10.0;
        let left = (PAGE_WIDTH - width) / 2.0;

        self.layer.set_fill_color(rgb(fill));
        self.layer.add_rect(
            Rect::new(Mm(left), Mm(self.cursor - 3.0), Mm(left + width), Mm(self.cursor + 7.0))
                .with_mode(PaintMode::Fill),
        );
        self.centered(label, 14.0, true, ink);
    }

    /// Large pale text across the middle of the page, rotated counter-clockwise.
    fn watermark(&self, text: &str) {
        let size = 48.0;
        let width = self.bold.width(text, size);
        let angle = WATERMARK_ANGLE.to_radians();
        let x = (PAGE_WIDTH - width * angle.cos()) / 2.0;
        let y = (PAGE_HEIGHT - width * angle.sin()) / 2.0;

        self.layer.set_fill_color(rgb(WATERMARK));
        self.layer.begin_text_section();
        self.layer.set_font(&self.bold.font, size);
        self.layer.set_text_matrix(TextMatrix::TranslateRotate(
            Mm(x).into(),
            Mm(y).into(),
            WATERMARK_ANGLE,
        ));
        self.layer.write_text(self.bold.printable(text), &self.bold.font);
        self.layer.end_text_section();
    }

    /// Draws the logo centered at the cursor. Returns false if the image could not be decoded.
    fn logo(&mut self, bytes: &[u8]) -> bool {
        let decoder = match PngDecoder::new(Cursor::new(bytes)) {
            Ok(decoder) => decoder,
            Err(e) => {
                tracing::warn!("Logo is not a readable PNG, proceeding without it: {}", e);
                return false;
            }
        };
        let image = match Image::try_from(decoder) {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!("Logo could not be embedded, proceeding without it: {}", e);
                return false;
            }
        };

        let width_px = image.image.width.0.max(1) as f32;
        let height_px = image.image.height.0.max(1) as f32;
        let dpi = width_px * 25.4 / LOGO_SIZE;
        let height = height_px * 25.4 / dpi;

        self.advance(height);
        image.add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm((PAGE_WIDTH - LOGO_SIZE) / 2.0)),
                translate_y: Some(Mm(self.cursor)),
                dpi: Some(dpi),
                ..Default::default()
            },
        );
        self.advance(4.0);
        true
    }
}

pub fn render_report(data: &ReportData, logo: Option<&[u8]>) -> Result<Vec<u8>, ReportError> {
    let title = format!("Diabetes Report - {}", data.patient_id);
    let (doc, page, layer) = PdfDocument::new(&title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Report");
    let regular = Typeface::load(&doc, REGULAR_TTF)?;
    let bold = Typeface::load(&doc, BOLD_TTF)?;

    let mut canvas = Canvas {
        layer: doc.get_page(page).get_layer(layer),
        regular,
        bold,
        cursor: PAGE_HEIGHT - MARGIN,
    };

    // Drawn first so everything else paints over it
    canvas.watermark("DIABETES REPORT");

    // Header
    canvas.rule(GREEN, 6.0);
    canvas.advance(6.0);
    if let Some(bytes) = logo {
        canvas.logo(bytes);
    }
    canvas.advance(6.0);
    canvas.centered("Diabetes AI Clinic", 18.0, true, GREEN);
    canvas.advance(6.0);
    canvas.centered("Advanced Predictive Healthcare Solutions", 11.0, false, BLACK);

    // Patient name
    canvas.advance(14.0);
    let name = if data.patient_name.trim().is_empty() {
        "Patient Name"
    } else {
        data.patient_name.trim()
    };
    canvas.centered_wrapped(name, 20.0, true, GREEN, 8.0);
    canvas.advance(4.0);
    canvas.rule(DIVIDER, 1.5);

    canvas.section_title("Patient Information");
    let right_column = PAGE_WIDTH / 2.0 + 5.0;
    let left_width = right_column - MARGIN - 5.0;
    let right_width = PAGE_WIDTH - MARGIN - right_column;
    canvas.labelled("Patient ID:", &data.patient_id, MARGIN, left_width);
    canvas.labelled(
        "Age:",
        &format!("{} years", data.age),
        right_column,
        right_width,
    );
    canvas.advance(8.0);
    canvas.labelled(
        "Blood Sugar:",
        &format!("{} mg/dL", data.blood_sugar),
        MARGIN,
        left_width,
    );
    canvas.labelled(
        "Blood Pressure:",
        &format!("{}/{} mmHg", data.systolic_bp, data.diastolic_bp),
        right_column,
        right_width,
    );

    canvas.section_title("Diagnostic Results");
    canvas.centered("Prediction Status:", 11.0, false, BLACK);
    canvas.advance(9.0);
    canvas.badge(data.status);
    canvas.advance(11.0);
    let probability = format!("Probability: {}", data.probability);
    canvas.centered(&probability, 11.0, false, BLACK);
    canvas.advance(6.0);
    let analysed = format!("Analysis Date: {}", data.generated_at);
    canvas.centered(&analysed, 11.0, false, BLACK);

    canvas.section_title("Medical Recommendations");
    let indent = MARGIN + 7.0;
    for (i, recommendation) in recommendations::for_status(data.status).iter().enumerate() {
        let number = format!("{}.", i + 1);
        canvas.text(&number, 11.0, MARGIN, true, LABEL_GREEN);
        let lines = wrap_text(recommendation, |line| {
            canvas.regular.width(line, 11.0) <= PAGE_WIDTH - MARGIN - indent
        });
        for line in lines {
            canvas.text(&line, 11.0, indent, false, BLACK);
            canvas.advance(5.5);
        }
        canvas.advance(1.5);
    }

    // Footer
    canvas.cursor = MARGIN + 14.0;
    canvas.rule(DIVIDER, 1.0);
    canvas.advance(5.0);
    canvas.centered(
        "This report was generated by Diabetes AI Clinic's predictive analysis system",
        9.0,
        false,
        GREY,
    );
    canvas.advance(4.5);
    canvas.centered(
        "For questions or concerns, please contact: clinic@diabetesai.com",
        9.0,
        false,
        GREY,
    );
    canvas.advance(4.5);
    let generated = format!("Report generated on: {}", data.generated_at);
    canvas.centered(&generated, 9.0, false, GREY);

    doc.save_to_bytes().map_err(pdf_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use printpdf::lopdf::{Document, Object, content::Content};

    fn sample(status: Status) -> ReportData {
        ReportData {
            patient_id: "P-001".to_string(),
            patient_name: "Jane Doe".to_string(),
            age: "45".to_string(),
            blood_sugar: "180.5".to_string(),
            systolic_bp: "130".to_string(),
            diastolic_bp: "85".to_string(),
            status,
            probability: "0.8123".to_string(),
            generated_at: "2024-05-01 09:30".to_string(),
        }
    }

    /// Operands of every `Tj` operator on the first page.
    fn shown_strings(pdf: &[u8]) -> Vec<Vec<u8>> {
        let doc = Document::load_mem(pdf).expect("output should parse as PDF");
        let (_, page_id) = doc.get_pages().into_iter().next().expect("one page");
        let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
        content
            .operations
            .into_iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| match op.operands.into_iter().next() {
                Some(Object::String(bytes, _)) => Some(bytes),
                _ => None,
            })
            .collect()
    }

    /// Two-byte glyph ids, the way the embedded font encodes `text`.
    fn glyphs(font: &'static [u8], text: &str) -> Vec<u8> {
        let face = Face::parse(font, 0).unwrap();
        text.chars()
            .flat_map(|c| face.glyph_index(c).expect("glyph in font").0.to_be_bytes())
            .collect()
    }

    fn shows(pdf: &[u8], font: &'static [u8], text: &str) -> bool {
        let needle = glyphs(font, text);
        shown_strings(pdf)
            .iter()
            .any(|s| s.windows(needle.len()).any(|w| w == needle.as_slice()))
    }

    #[test]
    fn test_report_content_for_diabetic() {
        let pdf = render_report(&sample(Status::Diabetic), None).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
        assert!(shows(&pdf, BOLD_TTF, "Jane Doe"));
        assert!(shows(&pdf, BOLD_TTF, "Diabetic"));
        assert!(shows(&pdf, REGULAR_TTF, "Probability: 0.8123"));
        assert!(shows(&pdf, REGULAR_TTF, "Analysis Date: 2024-05-01 09:30"));
        assert!(shows(&pdf, REGULAR_TTF, "Schedule an appointment with an"));
        assert!(shows(&pdf, REGULAR_TTF, "clinic@diabetesai.com"));
        assert!(shows(&pdf, BOLD_TTF, "DIABETES REPORT"));
    }

    #[test]
    fn test_report_content_for_non_diabetic() {
        let pdf = render_report(&sample(Status::NonDiabetic), None).unwrap();
        assert!(shows(&pdf, BOLD_TTF, "Non-Diabetic"));
        assert!(shows(&pdf, REGULAR_TTF, "Continue annual preventive"));
        assert!(!shows(&pdf, REGULAR_TTF, "endocrinologist"));
    }

    #[test]
    fn test_blank_name_uses_placeholder() {
        let mut data = sample(Status::Diabetic);
        data.patient_name = "   ".to_string();
        let pdf = render_report(&data, None).unwrap();
        assert!(shows(&pdf, BOLD_TTF, "Patient Name"));
    }

    #[test]
    fn test_non_latin_name_is_kept() {
        let mut data = sample(Status::Diabetic);
        data.patient_name = "Zoë Ωmega Αλέξης".to_string();
        let pdf = render_report(&data, None).unwrap();
        assert!(shows(&pdf, BOLD_TTF, "Zoë Ωmega Αλέξης"));
    }

    #[test]
    fn test_glyphless_characters_are_marked() {
        let mut data = sample(Status::Diabetic);
        data.patient_name = "Zoë 张伟 Ωmega".to_string();
        let pdf = render_report(&data, None).unwrap();
        assert!(shows(&pdf, BOLD_TTF, "Zoë ?? Ωmega"));
    }

    #[test]
    fn test_long_name_wraps_onto_lines_that_fit() {
        let mut data = sample(Status::Diabetic);
        data.patient_name = "Maximiliana Theodora Wilhelmina von Hohenzollern-Sigmaringen".to_string();
        let pdf = render_report(&data, None).unwrap();
        assert!(shows(&pdf, BOLD_TTF, "Maximiliana"));
        assert!(shows(&pdf, BOLD_TTF, "Hohenzollern-Sigmaringen"));
        assert!(!shows(&pdf, BOLD_TTF, data.patient_name.as_str()));
    }

    #[test]
    fn test_renders_pdf_with_bundled_logo() {
        let logo = std::fs::read(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/assets/diabetes-icon1.png"
        ))
        .unwrap();
        let bytes = render_report(&sample(Status::NonDiabetic), Some(&logo)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_undecodable_logo_is_skipped() {
        let bytes = render_report(&sample(Status::NonDiabetic), Some(b"garbage")).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_wrap_text() {
        let fits = |line: &str| line.chars().count() <= 20;
        let lines = wrap_text("Begin moderate exercise regimen (30 mins/day, 5 days/week)", fits);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| fits(l)));
        assert_eq!(
            lines.join(" "),
            "Begin moderate exercise regimen (30 mins/day, 5 days/week)"
        );
        assert!(wrap_text("", fits).is_empty());
    }

    #[test]
    fn test_wrap_text_breaks_long_words() {
        let fits = |line: &str| line.chars().count() <= 4;
        assert_eq!(wrap_text("abcdefghij xy", fits), vec!["abcd", "efgh", "ij", "xy"]);
    }

    #[test]
    fn test_ellipsize() {
        let fits = |s: &str| s.chars().count() <= 6;
        assert_eq!(ellipsize("short", fits), "short");
        assert_eq!(ellipsize("much too long", fits), "much …");
    }

    #[test]
    fn test_long_id_is_ellipsized_on_page() {
        let mut data = sample(Status::Diabetic);
        data.patient_id = "ID-".repeat(40);
        let pdf = render_report(&data, None).unwrap();
        assert!(shows(&pdf, REGULAR_TTF, "…"));
        assert!(!shows(&pdf, REGULAR_TTF, data.patient_id.as_str()));
    }

    #[test]
    fn test_measured_width_grows_with_text() {
        let face = Face::parse(REGULAR_TTF, 0).unwrap();
        let units = |t: &str| -> u32 {
            t.chars()
                .filter_map(|c| face.glyph_index(c))
                .filter_map(|g| face.glyph_hor_advance(g))
                .map(u32::from)
                .sum()
        };
        assert!(units("WWWW") > units("iiii"));
    }
}
