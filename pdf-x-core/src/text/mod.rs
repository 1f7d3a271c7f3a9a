//! Text-layout reconstruction: turns the flat, paint-order
//! stream of positioned glyphs a [`crate::rendering::Device`] records into
//! rotation-normalized, deduplicated reading-order paragraphs, with an
//! optional fixed-pitch physical layout and regex-based search over the
//! result.

pub mod block;
pub mod glyph;
pub mod layout;
pub mod search;

pub use block::{BlockTag, TextBlock};
pub use glyph::{Glyph, LinkRecord, UnderlineRecord};
pub use layout::{Line, Paragraph, TextLayoutOptions, Word};
pub use search::{SearchMatch, SearchStart};

use block::{build_split_tree, classify_tags};
use layout::{group_paragraphs, lines_from_leaf, physical_layout, reading_order_lines};

/// Accumulates glyphs and decorations painted while interpreting a page's
/// content stream, then reconstructs reading-order text on demand.
#[derive(Debug, Clone)]
pub struct TextExtractor {
    glyphs: Vec<Glyph>,
    underlines: Vec<UnderlineRecord>,
    links: Vec<LinkRecord>,
    page_width: f64,
    page_height: f64,
}

/// The result of [`TextExtractor::extract`].
#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub paragraphs: Vec<Paragraph>,
    pub physical: Option<String>,
}

impl ExtractedText {
    pub fn text(&self) -> String {
        self.paragraphs.iter().map(|p| p.text()).collect::<Vec<_>>().join("\n\n")
    }
}

impl TextExtractor {
    pub fn new(page_width: f64, page_height: f64) -> Self {
        TextExtractor { glyphs: Vec::new(), underlines: Vec::new(), links: Vec::new(), page_width, page_height }
    }

    pub fn push_glyph(&mut self, glyph: Glyph) {
        self.glyphs.push(glyph);
    }

    pub fn push_underline(&mut self, underline: UnderlineRecord) {
        self.underlines.push(underline);
    }

    pub fn push_link(&mut self, link: LinkRecord) {
        self.links.push(link);
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// The rotation (quarter turns, `0..=3`) most glyphs were recorded
    /// under -- used to decide which bucket drives the reading-order
    /// reconstruction.
    fn dominant_rotation(&self) -> u8 {
        let mut counts = [0usize; 4];
        for g in &self.glyphs {
            counts[(g.rotation % 4) as usize] += 1;
        }
        counts
            .iter()
            .enumerate()
            .max_by_key(|(_, count)| **count)
            .map(|(rot, _)| rot as u8)
            .unwrap_or(0)
    }

    /// Drop glyphs that are exact duplicates of one already kept (same
    /// codepoint, left edge within `0.1·size` and top edge within `0.2·size`
    /// on the glyph's primary axis, swapped on the secondary axis), which
    /// content streams sometimes emit for fake-bold or fake-shadow text
    /// effects.
    fn dedup(glyphs: Vec<Glyph>) -> Vec<Glyph> {
        let mut out: Vec<Glyph> = Vec::with_capacity(glyphs.len());
        for g in glyphs {
            let (x_tolerance, y_tolerance) =
                if g.rotation % 2 == 1 { (0.2 * g.size, 0.1 * g.size) } else { (0.1 * g.size, 0.2 * g.size) };
            let is_dup = out.iter().any(|k: &Glyph| {
                k.unicode == g.unicode
                    && (k.bbox[0] - g.bbox[0]).abs() < x_tolerance
                    && (k.bbox[3] - g.bbox[3]).abs() < y_tolerance
            });
            if !is_dup {
                out.push(g);
            }
        }
        out
    }

    fn attach_decorations(&self, mut lines: Vec<Line>) -> Vec<Line> {
        for line in &mut lines {
            for word in &mut line.words {
                if self.underlines.iter().any(|u| overlaps(&u.bbox, &word.bbox)) {
                    word.underlined = true;
                }
                if let Some(link) = self.links.iter().find(|l| overlaps(&l.bbox, &word.bbox)) {
                    word.link = link.uri.clone();
                }
            }
        }
        lines
    }

    /// Reconstruct reading-order paragraphs.
    pub fn extract(&self, options: &TextLayoutOptions) -> ExtractedText {
        let dominant = self.dominant_rotation();

        let mut by_rotation: [Vec<Glyph>; 4] = Default::default();
        let mut clipped_glyphs = Vec::new();
        for g in &self.glyphs {
            if g.invisible {
                continue;
            }
            if g.clipped {
                if options.keep_tiny_chars && g.rotation == dominant {
                    clipped_glyphs.push(g.rotated(dominant, self.page_width, self.page_height));
                }
                continue;
            }
            let normalized = g.rotated(dominant, self.page_width, self.page_height);
            by_rotation[(g.rotation % 4) as usize].push(normalized);
        }
        for bucket in by_rotation.iter_mut() {
            let taken = std::mem::take(bucket);
            *bucket = Self::dedup(taken);
        }

        let mut all_lines = Vec::new();

        let dominant_glyphs = std::mem::take(&mut by_rotation[dominant as usize]);
        if !dominant_glyphs.is_empty() {
            let mut tree = build_split_tree(dominant_glyphs, dominant);
            classify_tags(&mut tree);
            if !clipped_glyphs.is_empty() {
                block::insert_clipped_chars(&mut tree, clipped_glyphs);
            }
            all_lines.extend(reading_order_lines(&tree));
        }

        // Minority rotations (sideways captions, stamps) get a flat,
        // un-nested line grouping rather than a full partition tree.
        for bucket in by_rotation.into_iter() {
            if !bucket.is_empty() {
                all_lines.extend(lines_from_leaf(&bucket));
            }
        }

        let all_lines = self.attach_decorations(all_lines);
        let paragraphs = group_paragraphs(all_lines);

        let physical = if options.physical_layout {
            Some(physical_layout(&paragraphs, self.page_width, self.page_height, options.physical_layout_width))
        } else {
            None
        };

        ExtractedText { paragraphs, physical }
    }

    pub fn search(&self, text: &ExtractedText, pattern: &str, start: SearchStart, anchor: Option<(usize, usize)>) -> Result<Vec<SearchMatch>, regex::Error> {
        search::search(&text.paragraphs, pattern, start, anchor)
    }
}

fn overlaps(a: &[f64; 4], b: &[f64; 4]) -> bool {
    a[0] < b[2] && b[0] < a[2] && a[1] < b[3] && b[1] < a[3]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glyph(x: f64, y: f64, size: f64, ch: char) -> Glyph {
        Glyph {
            font_ref: "F1".into(),
            size,
            bbox: [x, y, x + size * 0.6, y + size],
            unicode: ch,
            char_pos_in_stream: 0,
            n_bytes: 1,
            rotation: 0,
            clipped: false,
            invisible: false,
        }
    }

    #[test]
    fn extracts_a_single_word() {
        let mut extractor = TextExtractor::new(612.0, 792.0);
        extractor.push_glyph(glyph(0.0, 700.0, 12.0, 'h'));
        extractor.push_glyph(glyph(8.0, 700.0, 12.0, 'i'));
        let text = extractor.extract(&TextLayoutOptions::default());
        assert_eq!(text.text(), "hi");
    }

    #[test]
    fn duplicate_glyphs_are_dropped() {
        let mut extractor = TextExtractor::new(612.0, 792.0);
        extractor.push_glyph(glyph(0.0, 700.0, 12.0, 'x'));
        extractor.push_glyph(glyph(0.0, 700.0, 12.0, 'x'));
        let text = extractor.extract(&TextLayoutOptions::default());
        assert_eq!(text.text(), "x");
    }

    #[test]
    fn invisible_glyphs_are_skipped() {
        let mut extractor = TextExtractor::new(612.0, 792.0);
        let mut g = glyph(0.0, 700.0, 12.0, 'y');
        g.invisible = true;
        extractor.push_glyph(g);
        let text = extractor.extract(&TextLayoutOptions::default());
        assert!(text.paragraphs.is_empty());
    }

    #[test]
    fn clipped_glyphs_are_dropped_by_default() {
        let mut extractor = TextExtractor::new(612.0, 792.0);
        extractor.push_glyph(glyph(0.0, 700.0, 12.0, 'h'));
        let mut clipped = glyph(8.0, 700.0, 12.0, 'i');
        clipped.clipped = true;
        extractor.push_glyph(clipped);
        let text = extractor.extract(&TextLayoutOptions::default());
        assert_eq!(text.text(), "h");
    }

    #[test]
    fn clipped_glyphs_are_reinserted_when_kept() {
        let mut extractor = TextExtractor::new(612.0, 792.0);
        extractor.push_glyph(glyph(0.0, 700.0, 12.0, 'h'));
        let mut clipped = glyph(8.0, 700.0, 12.0, 'i');
        clipped.clipped = true;
        extractor.push_glyph(clipped);
        let options = TextLayoutOptions { keep_tiny_chars: true, ..TextLayoutOptions::default() };
        let text = extractor.extract(&options);
        assert_eq!(text.text(), "hi");
    }

    #[test]
    fn underline_attaches_to_overlapping_word() {
        let mut extractor = TextExtractor::new(612.0, 792.0);
        extractor.push_glyph(glyph(0.0, 700.0, 12.0, 'a'));
        extractor.push_underline(UnderlineRecord { bbox: [0.0, 698.0, 10.0, 700.5] });
        let text = extractor.extract(&TextLayoutOptions::default());
        assert!(text.paragraphs[0].lines[0].words[0].underlined);
    }
}
