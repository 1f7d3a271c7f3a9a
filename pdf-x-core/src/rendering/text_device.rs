//! A [`Device`] implementation that records positioned glyphs instead of
//! painting them, feeding a [`crate::text::TextExtractor`].
//!
//! Per-glyph metrics (advance widths, embedded font programs) are the Font
//! Service's concern and out of scope here; `draw_text` falls back to the
//! same flat per-character advance [`TestDevice`] uses (500/1000 em) when no
//! font metrics are available, and decodes each byte as one Latin-1-ish
//! character. A real deployment swaps this glyph-splitting for the Font
//! Service's actual code-to-Unicode and code-to-width tables.

use crate::core::error::PDFResult;
use crate::core::parser::PDFObject;
use crate::text::{Glyph, LinkRecord, TextExtractor, UnderlineRecord};

use super::device::{Device, ImageData, Paint, PathDrawMode};
use super::graphics_state::{FillRule, StrokeProps};

/// Applies a 2D affine matrix `[a, b, c, d, e, f]` to a point, PDF-style:
/// `x' = a*x + c*y + e`, `y' = b*x + d*y + f`.
fn apply_matrix(m: &[f64; 6], x: f64, y: f64) -> (f64, f64) {
    (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
}

/// `a * b`, in the same left-multiplication convention as
/// [`crate::rendering::GraphicsState::concat_matrix`]: applying the
/// product to a point is equivalent to applying `a` then `b`.
fn matrix_multiply(a: &[f64; 6], b: &[f64; 6]) -> [f64; 6] {
    let [a0, a1, a2, a3, a4, a5] = *a;
    let [b0, b1, b2, b3, b4, b5] = *b;
    [
        a0 * b0 + a1 * b2,
        a0 * b1 + a1 * b3,
        a2 * b0 + a3 * b2,
        a2 * b1 + a3 * b3,
        a4 * b0 + a5 * b2 + b4,
        a4 * b1 + a5 * b3 + b5,
    ]
}

const IDENTITY: [f64; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Accumulates the device-space extent covered by glyphs shown while a
/// `BDC /Span << /ActualText >>` window is open.
struct ActualTextWindow {
    text: String,
    extent: Option<[f64; 4]>,
    font_ref: String,
    size: f64,
    rotation: u8,
}

pub struct TextExtractionDevice {
    extractor: TextExtractor,
    rotation: u8,
    page_width: f64,
    page_height: f64,
    clip_bbox: Option<[f64; 4]>,
    ctm: [f64; 6],
    ctm_stack: Vec<[f64; 6]>,
    actual_text: Option<ActualTextWindow>,
}

impl TextExtractionDevice {
    pub fn new(page_width: f64, page_height: f64, rotation: u8) -> Self {
        TextExtractionDevice {
            extractor: TextExtractor::new(page_width, page_height),
            rotation: rotation % 4,
            page_width,
            page_height,
            clip_bbox: None,
            ctm: IDENTITY,
            ctm_stack: Vec::new(),
            actual_text: None,
        }
    }

    pub fn into_extractor(self) -> TextExtractor {
        self.extractor
    }

    pub fn extractor(&self) -> &TextExtractor {
        &self.extractor
    }

    pub fn push_underline(&mut self, bbox: [f64; 4]) {
        self.extractor.push_underline(UnderlineRecord { bbox });
    }

    pub fn push_link(&mut self, bbox: [f64; 4], uri: Option<String>) {
        self.extractor.push_link(LinkRecord { bbox, uri });
    }
}

impl Device for TextExtractionDevice {
    fn begin_path(&mut self) {}
    fn move_to(&mut self, _x: f64, _y: f64) {}
    fn line_to(&mut self, _x: f64, _y: f64) {}
    fn curve_to(&mut self, _cp1x: f64, _cp1y: f64, _cp2x: f64, _cp2y: f64, _x: f64, _y: f64) {}
    fn rect(&mut self, _x: f64, _y: f64, _width: f64, _height: f64) {}
    fn close_path(&mut self) {}

    fn draw_path(&mut self, _mode: PathDrawMode, _paint: &Paint, _stroke_props: &StrokeProps) -> PDFResult<()> {
        Ok(())
    }

    fn clip_path(&mut self, _rule: FillRule) -> PDFResult<()> {
        Ok(())
    }

    fn save_state(&mut self) {
        self.ctm_stack.push(self.ctm);
    }

    fn restore_state(&mut self) {
        if let Some(m) = self.ctm_stack.pop() {
            self.ctm = m;
        }
    }

    fn concat_matrix(&mut self, matrix: &[f64; 6]) {
        self.ctm = matrix_multiply(matrix, &self.ctm);
    }

    fn set_matrix(&mut self, matrix: &[f64; 6]) {
        self.ctm = *matrix;
    }

    fn draw_text(
        &mut self,
        text_bytes: &[u8],
        font_name: &str,
        font_size: f64,
        _paint: &Paint,
        text_matrix: &[f64; 6],
        horizontal_scaling: f64,
        char_spacing: f64,
        word_spacing: f64,
        text_rise: f64,
    ) -> PDFResult<f64> {
        let scale = horizontal_scaling / 100.0;
        let ascent = 0.718 * font_size;
        let descent = -0.207 * font_size;
        let mut pen_x = 0.0f64;
        let glyph_matrix = matrix_multiply(text_matrix, &self.ctm);

        for (i, &byte) in text_bytes.iter().enumerate() {
            let unicode = byte as char;
            let glyph_width = 0.5 * font_size;
            let mut advance = (glyph_width + char_spacing) * scale;
            if byte == 0x20 {
                advance += word_spacing * scale;
            }

            let (x0, y0) = apply_matrix(&glyph_matrix, pen_x, descent + text_rise);
            let (x1, y1) = apply_matrix(&glyph_matrix, pen_x + glyph_width * scale, ascent + text_rise);
            let bbox = [x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)];

            let clipped = match self.clip_bbox {
                Some(c) => !overlaps(&c, &bbox),
                None => false,
            };

            if let Some(window) = self.actual_text.as_mut() {
                window.extent = Some(match window.extent {
                    Some(e) => union_bbox(e, bbox),
                    None => bbox,
                });
                window.font_ref = font_name.to_string();
                window.size = font_size;
                window.rotation = self.rotation;
            } else {
                self.extractor.push_glyph(Glyph {
                    font_ref: font_name.to_string(),
                    size: font_size,
                    bbox,
                    unicode,
                    char_pos_in_stream: i,
                    n_bytes: 1,
                    rotation: self.rotation,
                    clipped,
                    invisible: false,
                });
            }

            pen_x += advance;
        }

        Ok(pen_x)
    }

    fn draw_image(&mut self, _image: ImageData, _transform: &[f64; 6]) -> PDFResult<()> {
        Ok(())
    }

    fn page_bounds(&self) -> (f64, f64) {
        (self.page_width, self.page_height)
    }

    fn load_font_data(&mut self, _name: &str, _data: Vec<u8>, _encoding: Option<&PDFObject>) -> PDFResult<()> {
        Ok(())
    }

    fn need_non_text(&self) -> bool {
        false
    }

    fn begin_actual_text(&mut self, text: &str) {
        self.actual_text = Some(ActualTextWindow {
            text: text.to_string(),
            extent: None,
            font_ref: String::new(),
            size: 0.0,
            rotation: self.rotation,
        });
    }

    fn end_actual_text(&mut self) {
        let window = match self.actual_text.take() {
            Some(w) => w,
            None => return,
        };
        let codepoints: Vec<char> = window.text.chars().collect();
        if codepoints.is_empty() {
            return;
        }
        let extent = window.extent.unwrap_or([0.0, 0.0, 0.0, 0.0]);
        let total_width = (extent[2] - extent[0]).max(0.0);
        let step = total_width / codepoints.len() as f64;
        for (i, &ch) in codepoints.iter().enumerate() {
            let x0 = extent[0] + step * i as f64;
            let x1 = x0 + step;
            self.extractor.push_glyph(Glyph {
                font_ref: window.font_ref.clone(),
                size: window.size,
                bbox: [x0, extent[1], x1, extent[3]],
                unicode: ch,
                char_pos_in_stream: i,
                n_bytes: ch.len_utf8(),
                rotation: window.rotation,
                clipped: false,
                invisible: false,
            });
        }
    }
}

fn overlaps(a: &[f64; 4], b: &[f64; 4]) -> bool {
    a[0] < b[2] && b[0] < a[2] && a[1] < b[3] && b[1] < a[3]
}

fn union_bbox(a: [f64; 4], b: [f64; 4]) -> [f64; 4] {
    [a[0].min(b[0]), a[1].min(b[1]), a[2].max(b[2]), a[3].max(b[3])]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::TextLayoutOptions;

    #[test]
    fn draw_text_produces_glyphs_in_order() {
        let mut device = TextExtractionDevice::new(612.0, 792.0, 0);
        let identity = [1.0, 0.0, 0.0, 1.0, 0.0, 700.0];
        let paint = Paint::black();
        device.draw_text(b"hi", "F1", 12.0, &paint, &identity, 100.0, 0.0, 0.0, 0.0).unwrap();
        let extracted = device.into_extractor().extract(&TextLayoutOptions::default());
        assert_eq!(extracted.text(), "hi");
    }

    #[test]
    fn actual_text_window_emits_substitute_codepoints() {
        let mut device = TextExtractionDevice::new(612.0, 792.0, 0);
        let identity = [1.0, 0.0, 0.0, 1.0, 0.0, 700.0];
        let paint = Paint::black();
        device.begin_actual_text("fi");
        // A single "fi" ligature glyph drawn as one raw byte.
        device.draw_text(b"\x01", "F1", 12.0, &paint, &identity, 100.0, 0.0, 0.0, 0.0).unwrap();
        device.end_actual_text();
        let extracted = device.into_extractor().extract(&TextLayoutOptions::default());
        assert_eq!(extracted.text(), "fi");
    }
}
